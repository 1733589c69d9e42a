//! End-to-end indexing runs over exported trees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use content_index_pipeline::{
    ContentIndexer, IndexerConfig, IndexerState, PipelineError, RecordingHandler, RunMode,
};
use content_index_repository::{
    ContentSource, InMemoryContentSource, SourceError, InMemoryContentTypeResolver, InMemoryIndexStore,
    InMemoryUserDirectory, JsonFileIndexStore, XmlExportSource,
};
use content_index_shared::{
    ContentNode, ContentType, DescendantsQuery, FieldRule, IndexCriteria, IndexType,
    LegacyExportQuery, Page, ROOT_ID,
};

const CONTENT: &str = r#"<root id="-1">
  <Home id="1111" parentID="-1" level="1" creatorID="5" sortOrder="0" nodeType="1044"
        createDate="2012-01-01T00:00:00" updateDate="2012-01-02T00:00:00"
        nodeName="Home" path="-1,1111" isDoc="">
    <bodyText><![CDATA[<p>Welcome to the harbour</p>]]></bodyText>
    <TextPage id="1112" parentID="1111" level="2" creatorID="5" sortOrder="0" nodeType="1045"
              createDate="2012-01-03T00:00:00" updateDate="2012-01-03T00:00:00"
              nodeName="Draft" path="-1,1111,1112" isDoc="" published="false">
      <bodyText>Not yet written</bodyText>
    </TextPage>
    <TextPage id="1113" parentID="1111" level="2" creatorID="7" sortOrder="1" nodeType="1045"
              createDate="2012-01-04T00:00:00" updateDate="2012-01-05T00:00:00"
              nodeName="Opening Hours" path="-1,1111,1113" isDoc="">
      <bodyText>Open daily from nine</bodyText>
    </TextPage>
  </Home>
</root>"#;

const MEDIA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<media>
  <node id="1031" parentID="-1" level="1" writerID="0" nodeType="1031" sortOrder="0"
        createDate="2010-10-29T10:20:33" updateDate="2010-10-29T10:20:33"
        nodeName="Folder" nodeTypeAlias="Folder" path="-1,1031">
    <node id="1032" parentID="1031" level="2" writerID="0" nodeType="1032" sortOrder="0"
          createDate="2010-10-29T10:21:33" updateDate="2010-10-29T10:21:33"
          nodeName="Sunset Photo" nodeTypeAlias="Image" path="-1,1031,1032">
      <data alias="umbracoFile">/media/1/sunset.jpg</data>
      <data alias="umbracoWidth">640</data>
    </node>
  </node>
</media>"#;

struct Fixture {
    content: Arc<XmlExportSource>,
    media: Arc<XmlExportSource>,
    resolver: Arc<InMemoryContentTypeResolver>,
}

fn fixture() -> Fixture {
    let content = XmlExportSource::from_xml(CONTENT, IndexType::Content).unwrap();
    let media = XmlExportSource::from_xml(MEDIA, IndexType::Media).unwrap();
    let types: Vec<ContentType> = content
        .content_types()
        .iter()
        .chain(media.content_types())
        .cloned()
        .collect();

    Fixture {
        content: Arc::new(content),
        media: Arc::new(media),
        resolver: Arc::new(InMemoryContentTypeResolver::from_types(types)),
    }
}

fn criteria() -> IndexCriteria {
    IndexCriteria::default()
        .with_user_field(FieldRule::text("bodyText"))
        .with_type_field("Image", FieldRule::text("umbracoFile"))
        .with_type_field("Image", FieldRule::integer("umbracoWidth"))
}

fn config(support_unpublished_content: bool) -> IndexerConfig {
    IndexerConfig {
        support_unpublished_content,
        criteria: criteria(),
        ..IndexerConfig::default()
    }
}

fn indexer(fixture: &Fixture, store: &InMemoryIndexStore, config: IndexerConfig) -> ContentIndexer {
    ContentIndexer::builder()
        .content_source(fixture.content.clone())
        .media_source(fixture.media.clone())
        .resolver(fixture.resolver.clone())
        .store(Arc::new(store.clone()))
        .config(config)
        .build()
        .unwrap()
}

/// Source that goes away after a number of successful fetches.
struct FailingAfter {
    inner: Arc<dyn ContentSource>,
    healthy_fetches: usize,
    fetches: AtomicUsize,
}

impl FailingAfter {
    fn new(inner: Arc<dyn ContentSource>, healthy_fetches: usize) -> Self {
        Self {
            inner,
            healthy_fetches,
            fetches: AtomicUsize::new(0),
        }
    }

    fn check(&self) -> Result<(), SourceError> {
        if self.fetches.fetch_add(1, Ordering::SeqCst) >= self.healthy_fetches {
            return Err(SourceError::unavailable("connection dropped"));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentSource for FailingAfter {
    async fn fetch_all_by_legacy_export(
        &self,
        query: &LegacyExportQuery,
    ) -> Result<Vec<ContentNode>, SourceError> {
        self.check()?;
        self.inner.fetch_all_by_legacy_export(query).await
    }

    async fn fetch_descendants(&self, query: &DescendantsQuery) -> Result<Page, SourceError> {
        self.check()?;
        self.inner.fetch_descendants(query).await
    }
}

fn ids(store: &InMemoryIndexStore, location: &str) -> Vec<i32> {
    store
        .snapshot(location)
        .documents()
        .map(|doc| doc.node_id)
        .collect()
}

#[tokio::test]
async fn test_full_run_indexes_published_content_and_all_media() {
    let fixture = fixture();
    let store = InMemoryIndexStore::new();
    let mut indexer = indexer(&fixture, &store, config(false));

    let summary = indexer.run_full().await.unwrap();

    assert_eq!(indexer.state(), IndexerState::Completed);
    assert_eq!(summary.mode, RunMode::Full);
    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.indexed, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.pages, 2);

    assert_eq!(ids(&store, "content"), vec![1111, 1113]);
    assert_eq!(ids(&store, "media"), vec![1031, 1032]);

    let content = store.snapshot("content");
    let hits: Vec<i32> = content.search("harbour").iter().map(|d| d.node_id).collect();
    assert_eq!(hits, vec![1111]);
    assert!(content.search("written").is_empty());

    let media = store.snapshot("media");
    let image = media.document("1032").unwrap();
    assert_eq!(image.first("umbracoWidth").and_then(|v| v.as_integer()), Some(640));
    assert_eq!(image.first("__IndexType").and_then(|v| v.as_text()), Some("media"));
}

#[tokio::test]
async fn test_unpublished_content_is_indexed_when_supported() {
    let fixture = fixture();
    let store = InMemoryIndexStore::new();
    let mut full = indexer(&fixture, &store, config(true));

    let summary = full.run_full().await.unwrap();
    assert_eq!(summary.skipped, 0);
    assert_eq!(ids(&store, "content"), vec![1111, 1112, 1113]);

    let paged_store = InMemoryIndexStore::new();
    let mut paged = indexer(&fixture, &paged_store, config(true));
    paged.run_incremental_paged(ROOT_ID, 2).await.unwrap();
    assert_eq!(ids(&paged_store, "content"), vec![1111, 1112, 1113]);
}

#[tokio::test]
async fn test_paged_runs_match_full_run() {
    let fixture = fixture();
    let full_store = InMemoryIndexStore::new();
    indexer(&fixture, &full_store, config(false))
        .run_full()
        .await
        .unwrap();

    for page_size in 1..=4 {
        for prefetch in [false, true] {
            let store = InMemoryIndexStore::new();
            let mut paged = indexer(
                &fixture,
                &store,
                IndexerConfig {
                    prefetch_pages: prefetch,
                    ..config(false)
                },
            );

            let summary = paged.run_incremental_paged(ROOT_ID, page_size).await.unwrap();

            assert_eq!(summary.mode, RunMode::Paged);
            assert_eq!(summary.failed, 0);
            for location in ["content", "media"] {
                assert_eq!(
                    store.snapshot(location),
                    full_store.snapshot(location),
                    "page size {} prefetch {} differs on {}",
                    page_size,
                    prefetch,
                    location
                );
            }
        }
    }
}

#[tokio::test]
async fn test_paged_ids_match_legacy_export() {
    let fixture = fixture();
    let source: Arc<dyn ContentSource> = fixture.content.clone();
    let export: Vec<i32> = source
        .fetch_all_by_legacy_export(&LegacyExportQuery::all())
        .await
        .unwrap()
        .iter()
        .map(|n| n.id)
        .collect();

    for page_size in 1..=5 {
        let mut query = DescendantsQuery::new(ROOT_ID, 0u32, page_size);
        let mut paged = Vec::new();
        loop {
            let page = source.fetch_descendants(&query).await.unwrap();
            paged.extend(page.nodes.iter().map(|n| n.id));
            if !page.has_next(&query) {
                break;
            }
            query = query.next_page();
        }
        assert_eq!(paged, export, "page size {}", page_size);
    }
}

#[tokio::test]
async fn test_folder_and_image_pages() {
    let fixture = fixture();
    let source: Arc<dyn ContentSource> = fixture.media.clone();

    let first = DescendantsQuery::new(ROOT_ID, 0u32, 1);
    let page = source.fetch_descendants(&first).await.unwrap();
    assert_eq!(page.total_records, 2);
    assert_eq!(page.nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1031]);
    assert_eq!(page.nodes[0].level, 1);

    let second = first.next_page();
    let page = source.fetch_descendants(&second).await.unwrap();
    assert_eq!(page.nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1032]);
    assert_eq!(page.nodes[0].level, 2);
    assert!(!page.has_next(&second));

    let beyond = source
        .fetch_descendants(&DescendantsQuery::new(ROOT_ID, 5u32, 1))
        .await
        .unwrap();
    assert!(beyond.is_empty());
    assert_eq!(beyond.total_records, 2);

    let export = source
        .fetch_all_by_legacy_export(&LegacyExportQuery::all())
        .await
        .unwrap();
    assert_eq!(export.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1031, 1032]);
}

#[tokio::test]
async fn test_rerun_writes_identical_files() {
    let fixture = fixture();
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileIndexStore::new(dir.path());

    let mut indexer = ContentIndexer::builder()
        .content_source(fixture.content.clone())
        .media_source(fixture.media.clone())
        .resolver(fixture.resolver.clone())
        .store(Arc::new(store.clone()))
        .config(IndexerConfig {
            content_location: "content.json".to_string(),
            media_location: "media.json".to_string(),
            ..config(false)
        })
        .build()
        .unwrap();

    indexer.run_full().await.unwrap();
    let content = std::fs::read(dir.path().join("content.json")).unwrap();
    let media = std::fs::read(dir.path().join("media.json")).unwrap();

    indexer.run_incremental_paged(ROOT_ID, 1).await.unwrap();
    assert_eq!(std::fs::read(dir.path().join("content.json")).unwrap(), content);
    assert_eq!(std::fs::read(dir.path().join("media.json")).unwrap(), media);

    let loaded = store.load("content.json").await.unwrap();
    assert_eq!(loaded.len(), 2);
}

#[tokio::test]
async fn test_creator_names_are_resolved() {
    let fixture = fixture();
    let store = InMemoryIndexStore::new();
    let users = InMemoryUserDirectory::new().with_profile(5, "Editor");

    let mut indexer = ContentIndexer::builder()
        .content_source(fixture.content.clone())
        .resolver(fixture.resolver.clone())
        .store(Arc::new(store.clone()))
        .user_directory(Arc::new(users))
        .config(config(false))
        .build()
        .unwrap();
    indexer.run_full().await.unwrap();

    let snapshot = store.snapshot("content");
    let home = snapshot.document("1111").unwrap();
    assert_eq!(home.first("creatorName").and_then(|v| v.as_text()), Some("Editor"));
    let hours = snapshot.document("1113").unwrap();
    assert!(!hours.contains_field("creatorName"));
}

#[tokio::test]
async fn test_criteria_select_nodes() {
    let fixture = fixture();

    let store = InMemoryIndexStore::new();
    let summary = indexer(
        &fixture,
        &store,
        IndexerConfig {
            criteria: criteria().excluding("Image"),
            ..config(false)
        },
    )
    .run_full()
    .await
    .unwrap();
    assert_eq!(ids(&store, "media"), vec![1031]);
    assert_eq!(summary.skipped, 2);

    let store = InMemoryIndexStore::new();
    indexer(
        &fixture,
        &store,
        IndexerConfig {
            criteria: criteria().below(1031),
            ..config(true)
        },
    )
    .run_full()
    .await
    .unwrap();
    assert!(ids(&store, "content").is_empty());
    assert_eq!(ids(&store, "media"), vec![1032]);
}

#[tokio::test]
async fn test_commit_failure_aborts_run() {
    let fixture = fixture();
    let store = InMemoryIndexStore::new();
    store.fail_commits(true);
    let handler = Arc::new(RecordingHandler::new());

    let mut indexer = ContentIndexer::builder()
        .content_source(fixture.content.clone())
        .media_source(fixture.media.clone())
        .resolver(fixture.resolver.clone())
        .store(Arc::new(store.clone()))
        .error_handler(handler.clone())
        .config(config(false))
        .build()
        .unwrap();

    let err = indexer.run_full().await.unwrap_err();

    assert!(matches!(err, PipelineError::CommitError(_)));
    assert_eq!(indexer.state(), IndexerState::Aborted);
    let events = handler.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].fatal);
    assert_eq!(events[0].index_type, Some(IndexType::Content));

    // Media was never opened and nothing is left locked.
    assert!(store.snapshot("content").is_empty());
    assert!(store.snapshot("media").is_empty());
    assert!(!store.is_locked("content"));
    assert!(!store.is_locked("media"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_source_aborts_run() {
    let source = InMemoryContentSource::new(
        "media",
        vec![ContentNode::media(1031, "Folder", 1031)],
    )
    .with_latency(Duration::from_secs(60));
    let store = InMemoryIndexStore::new();
    let handler = Arc::new(RecordingHandler::new());

    let mut indexer = ContentIndexer::builder()
        .media_source(Arc::new(source))
        .resolver(Arc::new(InMemoryContentTypeResolver::from_types(vec![
            ContentType::new(1031, "Folder", IndexType::Media),
        ])))
        .store(Arc::new(store.clone()))
        .error_handler(handler.clone())
        .config(IndexerConfig {
            fetch_timeout: Duration::from_secs(1),
            prefetch_pages: true,
            ..IndexerConfig::default()
        })
        .build()
        .unwrap();

    let err = indexer.run_incremental_paged(ROOT_ID, 10).await.unwrap_err();

    assert!(matches!(err, PipelineError::FetchTimeout { .. }));
    assert_eq!(indexer.state(), IndexerState::Aborted);
    assert_eq!(handler.len(), 1);
    assert!(handler.events()[0].fatal);
    assert!(!store.is_locked("media"));
}

#[tokio::test]
async fn test_resolver_outage_fails_nodes_not_run() {
    let fixture = fixture();
    fixture.resolver.set_available(false);
    let store = InMemoryIndexStore::new();
    let handler = Arc::new(RecordingHandler::new());

    let mut indexer = ContentIndexer::builder()
        .media_source(fixture.media.clone())
        .resolver(fixture.resolver.clone())
        .store(Arc::new(store.clone()))
        .error_handler(handler.clone())
        .build()
        .unwrap();

    let summary = indexer.run_full().await.unwrap();

    assert_eq!(summary.failed, 2);
    assert_eq!(handler.len(), 2);
    assert!(handler.events().iter().all(|e| !e.fatal));
    assert!(store.snapshot("media").is_empty());
}

#[tokio::test]
async fn test_rejected_document_fails_only_that_node() {
    let fixture = fixture();
    let store = InMemoryIndexStore::new();
    store.fail_node(1031);
    let handler = Arc::new(RecordingHandler::new());

    let mut indexer = ContentIndexer::builder()
        .media_source(fixture.media.clone())
        .resolver(fixture.resolver.clone())
        .store(Arc::new(store.clone()))
        .error_handler(handler.clone())
        .config(config(false))
        .build()
        .unwrap();

    let summary = indexer.run_full().await.unwrap();

    assert_eq!(indexer.state(), IndexerState::Completed);
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.indexed, 1);
    assert_eq!(summary.failed, 1);

    let events = handler.events();
    assert_eq!(events.len(), 1);
    assert!(!events[0].fatal);
    assert_eq!(events[0].node_id, Some(1031));
    assert_eq!(events[0].index_type, Some(IndexType::Media));
    assert!(matches!(events[0].inner.as_deref(), Some(PipelineError::WriteError(_))));

    assert_eq!(ids(&store, "media"), vec![1032]);
    assert!(!store.is_locked("media"));
}

#[tokio::test]
async fn test_source_outage_after_first_page_keeps_committed_page() {
    let fixture = fixture();
    let store = InMemoryIndexStore::new();
    let handler = Arc::new(RecordingHandler::new());
    let source = FailingAfter::new(fixture.media.clone(), 1);

    let mut indexer = ContentIndexer::builder()
        .media_source(Arc::new(source))
        .resolver(fixture.resolver.clone())
        .store(Arc::new(store.clone()))
        .error_handler(handler.clone())
        .config(IndexerConfig {
            prefetch_pages: true,
            ..config(false)
        })
        .build()
        .unwrap();

    let err = indexer.run_incremental_paged(ROOT_ID, 1).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::SourceError(SourceError::Unavailable(_))
    ));
    assert_eq!(indexer.state(), IndexerState::Aborted);

    let events = handler.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].fatal);
    assert_eq!(events[0].index_type, Some(IndexType::Media));

    // The Folder page was committed before the outage; the Image never arrived.
    assert_eq!(ids(&store, "media"), vec![1031]);
    assert_eq!(store.commit_count(), 1);
    assert!(!store.is_locked("media"));
}
