//! User directory trait definition.

use async_trait::async_trait;

use crate::errors::SourceError;

/// Looks up display names of the users that created nodes.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Display name of a user profile, `None` when the user does not exist.
    async fn profile_name(&self, user_id: i32) -> Result<Option<String>, SourceError>;
}
