//! Orchestrator module for the content indexer pipeline.
//!
//! Coordinates the traversal, mapper, and loader components over the content
//! and media sources.

mod config;
mod summary;

pub use config::{IndexerConfig, DEFAULT_PAGE_SIZE};
pub use summary::{IndexerState, RunMode, RunSummary};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::PipelineError;
use crate::events::{dispatch, ErrorHandler, IndexingErrorEvent, LogAndContinue};
use crate::loader::IndexLoader;
use crate::mapper::{FieldMapper, FieldPlan};
use crate::traversal::{fetch_export, PagedTraversal};
use content_index_repository::{ContentSource, ContentTypeResolver, IndexStore, UserDirectory};
use content_index_shared::{
    ContentNode, DescendantsQuery, IndexType, LegacyExportQuery, PageIndex,
};

/// State that lives for one run only.
struct RunContext {
    summary: RunSummary,
    /// Resolutions by content-type id, failures included.
    plans: HashMap<i32, Result<Arc<FieldPlan>, PipelineError>>,
    creators: HashMap<i32, Option<String>>,
}

impl RunContext {
    fn new(mode: RunMode) -> Self {
        Self {
            summary: RunSummary::new(mode),
            plans: HashMap::new(),
            creators: HashMap::new(),
        }
    }
}

/// Indexer that syncs content and media trees into their indexes.
///
/// The indexer:
/// - Reads each source through the legacy export or page by page
/// - Filters, resolves and maps every node
/// - Writes documents through one writer per index location
/// - Reports per-node failures to the error handler and aborts on fatal ones
pub struct ContentIndexer {
    sources: Vec<(IndexType, Arc<dyn ContentSource>)>,
    resolver: Arc<dyn ContentTypeResolver>,
    store: Arc<dyn IndexStore>,
    users: Option<Arc<dyn UserDirectory>>,
    handler: Arc<dyn ErrorHandler>,
    mapper: FieldMapper,
    config: IndexerConfig,
    state: IndexerState,
}

impl ContentIndexer {
    pub fn builder() -> ContentIndexerBuilder {
        ContentIndexerBuilder::default()
    }

    pub fn state(&self) -> IndexerState {
        self.state
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Index every source from its legacy whole-tree export.
    ///
    /// Each index is committed once, after all of its nodes were attempted.
    #[instrument(skip(self))]
    pub async fn run_full(&mut self) -> Result<RunSummary, PipelineError> {
        self.run(RunMode::Full, LegacyExportQuery::all().root_id, 0).await
    }

    /// Index the descendants of `root_id` page by page.
    ///
    /// Each page is committed before the next one is processed.
    #[instrument(skip(self))]
    pub async fn run_incremental_paged(
        &mut self,
        root_id: i32,
        page_size: usize,
    ) -> Result<RunSummary, PipelineError> {
        self.run(RunMode::Paged, root_id, page_size).await
    }

    async fn run(
        &mut self,
        mode: RunMode,
        root_id: i32,
        page_size: usize,
    ) -> Result<RunSummary, PipelineError> {
        self.state = IndexerState::Running;
        info!(mode = %mode, sources = self.sources.len(), "Starting content indexing run");

        let mut run = RunContext::new(mode);
        let sources = self.sources.clone();

        for (index_type, source) in sources {
            if let Err(e) = self
                .index_source(&mut run, index_type, source, root_id, page_size)
                .await
            {
                return Err(self.abort(e, index_type));
            }
        }

        self.state = IndexerState::Completed;
        let summary = run.summary;
        info!(
            mode = %summary.mode,
            attempted = summary.attempted,
            indexed = summary.indexed,
            skipped = summary.skipped,
            failed = summary.failed,
            warnings = summary.warnings,
            pages = summary.pages,
            "Content indexing run completed"
        );
        Ok(summary)
    }

    /// Move to `Aborted` and raise the fatal event.
    fn abort(&mut self, error: PipelineError, index_type: IndexType) -> PipelineError {
        self.state = IndexerState::Aborted;
        error!(index_type = %index_type, error = %error, "Content indexing run aborted");

        let event = IndexingErrorEvent::aborted(error.clone(), Some(index_type));
        if let Err(e) = dispatch(self.handler.as_ref(), &event) {
            warn!(error = %e, "Error handler failed on abort event");
        }
        error
    }

    /// Record that a run was stopped from outside, e.g. on a shutdown signal.
    ///
    /// Call after dropping the run future. Dropping it already discarded
    /// anything not yet committed and released the index locations; this
    /// moves a `Running` indexer to `Aborted` and raises the fatal event.
    /// An indexer that is not running is left as is.
    pub fn interrupt(&mut self) -> Option<PipelineError> {
        if self.state != IndexerState::Running {
            return None;
        }
        self.state = IndexerState::Aborted;
        warn!("Content indexing run interrupted");

        let error = PipelineError::Interrupted;
        let event = IndexingErrorEvent::aborted(error.clone(), None);
        if let Err(e) = dispatch(self.handler.as_ref(), &event) {
            warn!(error = %e, "Error handler failed on abort event");
        }
        Some(error)
    }

    /// Index one source into its location.
    ///
    /// The writer is always closed; on failure anything not yet committed is
    /// discarded.
    async fn index_source(
        &self,
        run: &mut RunContext,
        index_type: IndexType,
        source: Arc<dyn ContentSource>,
        root_id: i32,
        page_size: usize,
    ) -> Result<(), PipelineError> {
        let location = self.config.location(index_type);
        let mut loader =
            IndexLoader::open(self.store.as_ref(), location, self.config.loader.clone()).await?;

        let outcome = match run.summary.mode {
            RunMode::Full => {
                self.index_export(run, &mut loader, index_type, source.as_ref())
                    .await
            }
            RunMode::Paged => {
                self.index_pages(run, &mut loader, index_type, source, root_id, page_size)
                    .await
            }
        };

        let closed = loader.close().await;
        match outcome {
            Ok(()) => closed,
            Err(e) => {
                if let Err(close_error) = closed {
                    warn!(location = %location, error = %close_error, "Failed to close index writer");
                }
                Err(e)
            }
        }
    }

    async fn index_export(
        &self,
        run: &mut RunContext,
        loader: &mut IndexLoader,
        index_type: IndexType,
        source: &dyn ContentSource,
    ) -> Result<(), PipelineError> {
        let nodes = fetch_export(source, &LegacyExportQuery::all(), self.config.fetch_timeout).await?;
        run.summary.pages += 1;
        info!(index_type = %index_type, nodes = nodes.len(), "Fetched legacy export");

        for node in nodes {
            self.process_node(run, loader, index_type, node).await?;
        }
        loader.commit().await
    }

    async fn index_pages(
        &self,
        run: &mut RunContext,
        loader: &mut IndexLoader,
        index_type: IndexType,
        source: Arc<dyn ContentSource>,
        root_id: i32,
        page_size: usize,
    ) -> Result<(), PipelineError> {
        // Publish state only exists on content.
        let published_only =
            index_type == IndexType::Content && !self.config.support_unpublished_content;
        let query = DescendantsQuery::new(root_id, PageIndex::FIRST, page_size)
            .published_only(published_only);

        let mut traversal = PagedTraversal::new(
            source,
            query,
            self.config.fetch_timeout,
            self.config.prefetch_pages,
        );

        while let Some(page) = traversal.next_page().await? {
            run.summary.pages += 1;
            for node in page.nodes {
                self.process_node(run, loader, index_type, node).await?;
            }
            loader.commit().await?;
        }
        Ok(())
    }

    /// Filter, resolve, map and write one node.
    ///
    /// Returns an error only when the run must abort.
    async fn process_node(
        &self,
        run: &mut RunContext,
        loader: &mut IndexLoader,
        index_type: IndexType,
        node: ContentNode,
    ) -> Result<(), PipelineError> {
        run.summary.attempted += 1;

        if let Some(reason) = self.filter_reason(&node) {
            debug!(node_id = node.id, reason = reason, "Skipping node");
            run.summary.skipped += 1;
            return Ok(());
        }

        let plan = match self.resolve_plan(run, node.content_type_id).await {
            Ok(plan) => plan,
            Err(e) => return self.fail_node(run, e, &node, index_type),
        };

        if !self.mapper.criteria().accepts_type(plan.alias()) {
            debug!(node_id = node.id, alias = %plan.alias(), "Skipping excluded node type");
            run.summary.skipped += 1;
            return Ok(());
        }

        let creator = self.creator_name(run, node.creator_id).await;
        let mapped = self
            .mapper
            .map_to_document(&node, &plan, creator.as_deref());

        for warning in &mapped.warnings {
            warn!(
                node_id = warning.node_id,
                field = %warning.field,
                reason = %warning.reason,
                "Field left out of document"
            );
        }
        run.summary.warnings += mapped.warnings.len() as u64;

        match loader.add(&mapped.document).await {
            Ok(()) => {
                run.summary.indexed += 1;
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => self.fail_node(run, e, &node, index_type),
        }
    }

    fn filter_reason(&self, node: &ContentNode) -> Option<&'static str> {
        if node.published() == Some(false) && !self.config.support_unpublished_content {
            return Some("unpublished");
        }
        if let Some(parent_id) = self.mapper.criteria().parent_node_id {
            if !node.is_descendant_of(parent_id) {
                return Some("outside parent node");
            }
        }
        None
    }

    /// Report a per-node failure. Fails only if the handler refuses the event.
    fn fail_node(
        &self,
        run: &mut RunContext,
        error: PipelineError,
        node: &ContentNode,
        index_type: IndexType,
    ) -> Result<(), PipelineError> {
        run.summary.failed += 1;
        let event = IndexingErrorEvent::for_node(error, node.id, index_type);
        dispatch(self.handler.as_ref(), &event)
    }

    async fn resolve_plan(
        &self,
        run: &mut RunContext,
        type_id: i32,
    ) -> Result<Arc<FieldPlan>, PipelineError> {
        if let Some(resolution) = run.plans.get(&type_id) {
            return resolution.clone();
        }

        let timeout = self.config.fetch_timeout;
        let resolution = match tokio::time::timeout(timeout, self.resolver.resolve(type_id)).await
        {
            Ok(Ok(content_type)) => Ok(Arc::new(self.mapper.plan_for(content_type))),
            Ok(Err(e)) => Err(PipelineError::from(e)),
            Err(_) => Err(PipelineError::ResolveTimeout {
                type_id,
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        run.plans.insert(type_id, resolution.clone());
        resolution
    }

    async fn creator_name(&self, run: &mut RunContext, user_id: i32) -> Option<String> {
        let users = self.users.as_ref()?;
        if let Some(name) = run.creators.get(&user_id) {
            return name.clone();
        }

        let name = match tokio::time::timeout(self.config.fetch_timeout, users.profile_name(user_id))
            .await
        {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                warn!(user_id = user_id, error = %e, "User lookup failed");
                None
            }
            Err(_) => {
                warn!(user_id = user_id, "User lookup timed out");
                None
            }
        };

        run.creators.insert(user_id, name.clone());
        name
    }
}

/// Assembles a [`ContentIndexer`].
///
/// A resolver, a store and at least one source are required. The error
/// handler defaults to [`LogAndContinue`].
pub struct ContentIndexerBuilder {
    content_source: Option<Arc<dyn ContentSource>>,
    media_source: Option<Arc<dyn ContentSource>>,
    resolver: Option<Arc<dyn ContentTypeResolver>>,
    store: Option<Arc<dyn IndexStore>>,
    users: Option<Arc<dyn UserDirectory>>,
    handler: Arc<dyn ErrorHandler>,
    config: IndexerConfig,
}

impl Default for ContentIndexerBuilder {
    fn default() -> Self {
        Self {
            content_source: None,
            media_source: None,
            resolver: None,
            store: None,
            users: None,
            handler: Arc::new(LogAndContinue),
            config: IndexerConfig::default(),
        }
    }
}

impl ContentIndexerBuilder {
    pub fn content_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.content_source = Some(source);
        self
    }

    pub fn media_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.media_source = Some(source);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ContentTypeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn store(mut self, store: Arc<dyn IndexStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn user_directory(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn config(mut self, config: IndexerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ContentIndexer, PipelineError> {
        let resolver = self
            .resolver
            .ok_or_else(|| PipelineError::config("a content-type resolver is required"))?;
        let store = self
            .store
            .ok_or_else(|| PipelineError::config("an index store is required"))?;

        // Content is indexed before media.
        let sources: Vec<(IndexType, Arc<dyn ContentSource>)> = [
            (IndexType::Content, self.content_source),
            (IndexType::Media, self.media_source),
        ]
        .into_iter()
        .filter_map(|(index_type, source)| source.map(|s| (index_type, s)))
        .collect();

        if sources.is_empty() {
            return Err(PipelineError::config("at least one content source is required"));
        }

        Ok(ContentIndexer {
            sources,
            resolver,
            store,
            users: self.users,
            handler: self.handler,
            mapper: FieldMapper::new(self.config.criteria.clone()),
            config: self.config,
            state: IndexerState::Idle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{FailFast, RecordingHandler};
    use content_index_repository::{
        InMemoryContentSource, InMemoryContentTypeResolver, InMemoryIndexStore, ResolveError,
    };
    use content_index_shared::{ContentType, ROOT_ID};
    use std::time::Duration;

    fn media() -> Arc<InMemoryContentSource> {
        let folder = ContentNode::media(1031, "Folder", 1031);
        let image = ContentNode::media(1032, "Image", 1032).under(&folder);
        let orphan_type = ContentNode::media(1033, "Mystery", 9999).under(&folder);
        let second = ContentNode::media(1034, "Second Image", 1032)
            .under(&folder)
            .with_sort_order(1);
        Arc::new(InMemoryContentSource::new(
            "media",
            vec![folder, image, orphan_type, second],
        ))
    }

    fn resolver() -> Arc<InMemoryContentTypeResolver> {
        Arc::new(InMemoryContentTypeResolver::from_types(vec![
            ContentType::new(1031, "Folder", IndexType::Media),
            ContentType::new(1032, "Image", IndexType::Media),
        ]))
    }

    #[test]
    fn test_build_requires_components() {
        let missing_store = ContentIndexer::builder()
            .media_source(media())
            .resolver(resolver())
            .build();
        assert!(matches!(missing_store, Err(PipelineError::ConfigError(_))));

        let missing_sources = ContentIndexer::builder()
            .resolver(resolver())
            .store(Arc::new(InMemoryIndexStore::new()))
            .build();
        assert!(matches!(missing_sources, Err(PipelineError::ConfigError(_))));

        let indexer = ContentIndexer::builder()
            .media_source(media())
            .resolver(resolver())
            .store(Arc::new(InMemoryIndexStore::new()))
            .build()
            .unwrap();
        assert_eq!(indexer.state(), IndexerState::Idle);
    }

    #[tokio::test]
    async fn test_unknown_type_raises_one_event_and_continues() {
        let store = InMemoryIndexStore::new();
        let handler = Arc::new(RecordingHandler::new());
        let types = resolver();

        let mut indexer = ContentIndexer::builder()
            .media_source(media())
            .resolver(types.clone())
            .store(Arc::new(store.clone()))
            .error_handler(handler.clone())
            .build()
            .unwrap();

        let summary = indexer.run_incremental_paged(ROOT_ID, 1).await.unwrap();

        assert_eq!(indexer.state(), IndexerState::Completed);
        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.indexed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pages, 4);

        let events = handler.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].node_id, Some(1033));
        assert!(!events[0].fatal);
        assert!(matches!(
            events[0].inner.as_deref(),
            Some(PipelineError::ResolveError(ResolveError::UnknownType(9999)))
        ));

        let snapshot = store.snapshot("media");
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.document("1033").is_none());
        assert!(snapshot.document("1034").is_some());
        // Folder, Image and the unknown type, each resolved once.
        assert_eq!(types.lookup_count(), 3);
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_on_first_event() {
        let store = InMemoryIndexStore::new();

        let mut indexer = ContentIndexer::builder()
            .media_source(media())
            .resolver(resolver())
            .store(Arc::new(store.clone()))
            .error_handler(Arc::new(FailFast))
            .build()
            .unwrap();

        let result = indexer.run_full().await;

        assert!(matches!(result, Err(PipelineError::HandlerError(_))));
        assert_eq!(indexer.state(), IndexerState::Aborted);
        // Nothing was committed and the location is free again.
        assert!(store.snapshot("media").is_empty());
        assert!(!store.is_locked("media"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_marks_dropped_run_aborted() {
        let store = InMemoryIndexStore::new();
        let handler = Arc::new(RecordingHandler::new());
        let nodes = media().nodes().to_vec();
        let slow = InMemoryContentSource::from_export_order("media", nodes)
            .with_latency(Duration::from_secs(10));

        let mut indexer = ContentIndexer::builder()
            .media_source(Arc::new(slow))
            .resolver(resolver())
            .store(Arc::new(store.clone()))
            .error_handler(handler.clone())
            .build()
            .unwrap();

        // Stops while the second page is being fetched.
        let stopped = tokio::time::timeout(
            Duration::from_secs(15),
            indexer.run_incremental_paged(ROOT_ID, 1),
        )
        .await;
        assert!(stopped.is_err());
        assert_eq!(indexer.state(), IndexerState::Running);

        assert!(matches!(indexer.interrupt(), Some(PipelineError::Interrupted)));
        assert_eq!(indexer.state(), IndexerState::Aborted);

        let events = handler.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].fatal);
        assert_eq!(events[0].node_id, None);
        assert!(matches!(events[0].inner.as_deref(), Some(PipelineError::Interrupted)));

        // The first page stays committed and the location is free again.
        let snapshot = store.snapshot("media");
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.document("1031").is_some());
        assert!(!store.is_locked("media"));

        // A second call, or one on an idle indexer, changes nothing.
        assert!(indexer.interrupt().is_none());
        assert_eq!(handler.len(), 1);
    }

    #[tokio::test]
    async fn test_indexer_can_run_again() {
        let store = InMemoryIndexStore::new();
        let mut indexer = ContentIndexer::builder()
            .media_source(media())
            .resolver(resolver())
            .store(Arc::new(store.clone()))
            .build()
            .unwrap();

        let first = indexer.run_full().await.unwrap();
        let before = store.snapshot("media");
        let second = indexer.run_full().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(before, store.snapshot("media"));
        assert_eq!(indexer.state(), IndexerState::Completed);
    }
}
