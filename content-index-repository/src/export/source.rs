use std::path::Path;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::errors::SourceError;
use crate::export::parser::parse_export;
use crate::interfaces::ContentSource;
use crate::memory::InMemoryContentSource;
use content_index_shared::{
    ContentNode, ContentType, DescendantsQuery, IndexType, LegacyExportQuery, Page,
};

/// A content source backed by a legacy XML export.
///
/// The export is parsed once; both fetch modes are then served from the parsed
/// tree in export order.
#[derive(Debug)]
pub struct XmlExportSource {
    index_type: IndexType,
    tree: InMemoryContentSource,
    content_types: Vec<ContentType>,
}

impl XmlExportSource {
    pub fn from_xml(xml: &str, index_type: IndexType) -> Result<Self, SourceError> {
        let export = parse_export(xml, index_type)?;
        Ok(Self {
            index_type,
            tree: InMemoryContentSource::from_export_order(index_type.as_str(), export.nodes),
            content_types: export.content_types,
        })
    }

    /// Read and parse an export file.
    #[instrument]
    pub async fn from_file(path: &Path, index_type: IndexType) -> Result<Self, SourceError> {
        let xml = tokio::fs::read_to_string(path).await.map_err(|e| {
            SourceError::unavailable(format!("{}: {}", path.display(), e))
        })?;
        let source = Self::from_xml(&xml, index_type)?;

        info!(
            path = %path.display(),
            nodes = source.len(),
            content_types = source.content_types.len(),
            "Loaded legacy export"
        );
        Ok(source)
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Content types referenced by the export, ordered by id.
    pub fn content_types(&self) -> &[ContentType] {
        &self.content_types
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

#[async_trait]
impl ContentSource for XmlExportSource {
    async fn fetch_all_by_legacy_export(
        &self,
        query: &LegacyExportQuery,
    ) -> Result<Vec<ContentNode>, SourceError> {
        self.tree.fetch_all_by_legacy_export(query).await
    }

    async fn fetch_descendants(&self, query: &DescendantsQuery) -> Result<Page, SourceError> {
        self.tree.fetch_descendants(query).await
    }
}
