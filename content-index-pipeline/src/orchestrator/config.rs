use std::time::Duration;

use crate::loader::LoaderConfig;
use content_index_shared::{IndexCriteria, IndexType};

/// Default number of nodes per descendants page.
pub const DEFAULT_PAGE_SIZE: usize = 10_000;

/// Configuration for the content indexer, fixed at construction.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Index unpublished content. Media is always indexed.
    pub support_unpublished_content: bool,
    /// Field policy and node selection.
    pub criteria: IndexCriteria,
    /// Index location written for content nodes.
    pub content_location: String,
    /// Index location written for media nodes.
    pub media_location: String,
    /// Fetch the next page while the current one is processed.
    pub prefetch_pages: bool,
    /// Maximum time a source fetch or a type resolution may take.
    pub fetch_timeout: Duration,
    pub loader: LoaderConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            support_unpublished_content: false,
            criteria: IndexCriteria::default(),
            content_location: "content".to_string(),
            media_location: "media".to_string(),
            prefetch_pages: false,
            fetch_timeout: Duration::from_secs(30),
            loader: LoaderConfig::default(),
        }
    }
}

impl IndexerConfig {
    pub fn location(&self, index_type: IndexType) -> &str {
        match index_type {
            IndexType::Content => &self.content_location,
            IndexType::Media => &self.media_location,
        }
    }
}
