//! Content-type resolver trait definition.

use async_trait::async_trait;

use crate::errors::ResolveError;
use content_index_shared::ContentType;

/// Resolves a node's schema from its content-type id.
///
/// Implementations must be idempotent and free of side effects: resolving the
/// same id twice returns equal values.
#[async_trait]
pub trait ContentTypeResolver: Send + Sync {
    /// Resolve a content type.
    ///
    /// # Returns
    ///
    /// * `Ok(ContentType)` - The schema for `type_id`
    /// * `Err(ResolveError::UnknownType)` - If no schema exists for the id
    async fn resolve(&self, type_id: i32) -> Result<ContentType, ResolveError>;
}
