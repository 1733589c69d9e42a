//! Content source trait definition.
//!
//! This module defines the abstract interface for reading a content or media
//! tree, allowing for different backends (relational store, legacy export,
//! in-memory trees).

use async_trait::async_trait;

use crate::errors::SourceError;
use content_index_shared::{ContentNode, DescendantsQuery, LegacyExportQuery, Page};

/// Read-only access to one content or media tree.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` so that a page can be prefetched
/// on a background task.
///
/// # Ordering
///
/// Implementations must be deterministic: for an unchanged tree, the same
/// query always yields the same nodes in the same order.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch every node below the query's root from a whole-tree export.
    ///
    /// # Arguments
    ///
    /// * `query` - Selects the subtree; `ROOT_ID` selects the whole tree
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ContentNode>)` - The nodes in export order (depth-first, pre-order)
    /// * `Err(SourceError::Unavailable)` - If the store cannot be reached
    /// * `Err(SourceError::Parse)` - If the export is malformed
    async fn fetch_all_by_legacy_export(
        &self,
        query: &LegacyExportQuery,
    ) -> Result<Vec<ContentNode>, SourceError>;

    /// Fetch one page of a subtree's descendants.
    ///
    /// Successive page indexes return disjoint, order-stable pages whose union
    /// is the full descendant set. A page index past the last page returns an
    /// empty page carrying the real total.
    ///
    /// # Arguments
    ///
    /// * `query` - Root, cursor, ordering and filters
    ///
    /// # Returns
    ///
    /// * `Ok(Page)` - The page and the total number of matching records
    /// * `Err(SourceError::InvalidCursor)` - If the page size is zero or the offset overflows
    /// * `Err(SourceError::Unavailable)` - If the store cannot be reached
    async fn fetch_descendants(&self, query: &DescendantsQuery) -> Result<Page, SourceError>;
}
