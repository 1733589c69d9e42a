//! Dependency initialization and wiring for the content indexer.

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::IndexingError;
use content_index_pipeline::{ContentIndexer, LogAndContinue};
use content_index_repository::{InMemoryContentTypeResolver, JsonFileIndexStore, XmlExportSource};
use content_index_shared::{ContentType, IndexCriteria, IndexType};

/// Index file written for content, relative to the index directory.
pub const CONTENT_INDEX_FILE: &str = "content.json";

/// Index file written for media, relative to the index directory.
pub const MEDIA_INDEX_FILE: &str = "media.json";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured indexer ready to run.
    pub indexer: ContentIndexer,
    pub settings: Settings,
}

impl Dependencies {
    /// Load the exports and the field policy, then assemble the indexer.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If an export or the policy cannot be loaded
    pub async fn new(settings: Settings) -> Result<Self, IndexingError> {
        info!(
            content_export = ?settings.content_export_path,
            media_export = ?settings.media_export_path,
            index_path = %settings.index_path.display(),
            "Initializing dependencies"
        );

        let criteria = match &settings.field_policy_path {
            Some(path) => load_criteria(path).await?,
            None => IndexCriteria::default(),
        };

        let mut types: Vec<ContentType> = Vec::new();
        let mut builder = ContentIndexer::builder();

        if let Some(path) = &settings.content_export_path {
            let source = XmlExportSource::from_file(path, IndexType::Content).await?;
            types.extend(source.content_types().iter().cloned());
            builder = builder.content_source(Arc::new(source));
        }
        if let Some(path) = &settings.media_export_path {
            let source = XmlExportSource::from_file(path, IndexType::Media).await?;
            types.extend(source.content_types().iter().cloned());
            builder = builder.media_source(Arc::new(source));
        }

        info!(content_types = types.len(), "Content types derived from exports");

        let indexer = builder
            .resolver(Arc::new(InMemoryContentTypeResolver::from_types(types)))
            .store(Arc::new(JsonFileIndexStore::new(&settings.index_path)))
            .error_handler(Arc::new(LogAndContinue))
            .config(settings.indexer_config(criteria))
            .build()?;

        Ok(Self { indexer, settings })
    }
}

async fn load_criteria(path: &Path) -> Result<IndexCriteria, IndexingError> {
    let bytes = tokio::fs::read(path).await?;
    let criteria: IndexCriteria = serde_json::from_slice(&bytes)?;

    info!(
        path = %path.display(),
        user_fields = criteria.user_fields.len(),
        type_fields = criteria.type_fields.len(),
        "Loaded field policy"
    );
    Ok(criteria)
}
