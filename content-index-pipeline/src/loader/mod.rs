//! Loader module for the content indexer pipeline.
//!
//! Writes mapped documents to an index location through an [`IndexWriter`].

use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::errors::PipelineError;
use content_index_repository::{IndexStore, IndexWriter, WriteError};
use content_index_shared::IndexDocument;

/// Configuration for the index loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum time a single write or commit may take.
    pub write_timeout: Duration,
    /// Maximum number of retry attempts for a failed document write.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

/// Loader holding the writer of one index location for the length of a run.
///
/// The loader is responsible for:
/// - Bounding every writer call by the write timeout
/// - Retrying transient document failures with exponential backoff
/// - Committing or discarding staged documents
pub struct IndexLoader {
    writer: Box<dyn IndexWriter>,
    location: String,
    config: LoaderConfig,
    staged: usize,
}

impl IndexLoader {
    /// Open a writer on `location`.
    #[instrument(skip(store, config))]
    pub async fn open(
        store: &dyn IndexStore,
        location: &str,
        config: LoaderConfig,
    ) -> Result<Self, PipelineError> {
        let open_error = |source: WriteError| PipelineError::OpenError {
            location: location.to_string(),
            source,
        };

        let writer = match tokio::time::timeout(config.write_timeout, store.open(location)).await {
            Ok(result) => result.map_err(open_error)?,
            Err(_) => {
                return Err(open_error(WriteError::failure(format!(
                    "open timed out after {}ms",
                    config.write_timeout.as_millis()
                ))))
            }
        };

        debug!(location = %location, "Opened index writer");
        Ok(Self {
            writer,
            location: location.to_string(),
            config,
            staged: 0,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Documents staged since the last commit.
    pub fn staged(&self) -> usize {
        self.staged
    }

    /// Stage one document, retrying transient failures.
    pub async fn add(&mut self, document: &IndexDocument) -> Result<(), PipelineError> {
        let mut delay_ms = self.config.initial_retry_delay_ms;
        let mut attempt = 0;

        loop {
            match self.try_add(document).await {
                Ok(()) => {
                    if attempt > 0 {
                        debug!(
                            attempt = attempt,
                            node_id = document.node_id,
                            "Document write succeeded after retry"
                        );
                    }
                    self.staged += 1;
                    return Ok(());
                }
                Err(e) => {
                    // Don't retry permanent failures or past the last attempt
                    if !Self::is_retryable_error(&e) || attempt >= self.config.max_retries {
                        return Err(e);
                    }
                    attempt += 1;

                    debug!(
                        attempt = attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay_ms,
                        node_id = document.node_id,
                        error = %e,
                        "Document write failed, retrying"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                    // Exponential backoff
                    delay_ms = std::cmp::min(delay_ms * 2, self.config.max_retry_delay_ms);
                }
            }
        }
    }

    async fn try_add(&mut self, document: &IndexDocument) -> Result<(), PipelineError> {
        let timeout = self.config.write_timeout;
        match tokio::time::timeout(timeout, self.writer.add_or_update(document)).await {
            Ok(result) => result.map_err(PipelineError::from),
            Err(_) => Err(PipelineError::WriteTimeout {
                node_id: document.node_id,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Make every staged document visible. Any failure here is fatal.
    #[instrument(skip(self), fields(location = %self.location, staged = self.staged))]
    pub async fn commit(&mut self) -> Result<(), PipelineError> {
        let timeout = self.config.write_timeout;
        match tokio::time::timeout(timeout, self.writer.commit()).await {
            Ok(Ok(())) => {
                if self.staged > 0 {
                    info!(count = self.staged, "Committed documents");
                }
                self.staged = 0;
                Ok(())
            }
            Ok(Err(e)) => Err(PipelineError::CommitError(e)),
            Err(_) => Err(PipelineError::CommitTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Release the location, discarding anything not committed.
    pub async fn close(&mut self) -> Result<(), PipelineError> {
        if self.staged > 0 {
            warn!(
                location = %self.location,
                discarded = self.staged,
                "Closing index writer with uncommitted documents"
            );
        }
        self.staged = 0;

        match tokio::time::timeout(self.config.write_timeout, self.writer.close()).await {
            Ok(result) => result.map_err(PipelineError::from),
            Err(_) => Err(PipelineError::from(WriteError::failure(format!(
                "closing {} timed out",
                self.location
            )))),
        }
    }

    /// Determine if an error is retryable (transient failures).
    fn is_retryable_error(error: &PipelineError) -> bool {
        match error {
            // Timeouts are retryable
            PipelineError::WriteTimeout { .. } => true,
            // Single-document failures might be transient (e.g., a busy backend)
            PipelineError::WriteError(WriteError::Failure(msg)) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("busy")
                    || msg_lower.contains("temporarily")
                    || msg_lower.contains("connection")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use content_index_repository::InMemoryIndexStore;
    use content_index_shared::IndexType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Writer rejecting the first `failures` writes with a transient error.
    struct FlakyWriter {
        failures: usize,
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl IndexWriter for FlakyWriter {
        async fn add_or_update(&mut self, _document: &IndexDocument) -> Result<(), WriteError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                Err(WriteError::failure("backend busy"))
            } else {
                Ok(())
            }
        }

        async fn commit(&mut self) -> Result<(), WriteError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), WriteError> {
            Ok(())
        }
    }

    struct FlakyStore {
        failures: usize,
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl IndexStore for FlakyStore {
        async fn open(&self, _location: &str) -> Result<Box<dyn IndexWriter>, WriteError> {
            Ok(Box::new(FlakyWriter {
                failures: self.failures,
                attempts: self.attempts.clone(),
            }))
        }
    }

    fn doc(id: i32) -> IndexDocument {
        IndexDocument::new(id, IndexType::Media)
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let store = FlakyStore {
            failures: 2,
            attempts: attempts.clone(),
        };

        let mut loader = IndexLoader::open(&store, "media", LoaderConfig::default())
            .await
            .unwrap();
        loader.add(&doc(1031)).await.unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(loader.staged(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let store = FlakyStore {
            failures: usize::MAX,
            attempts: attempts.clone(),
        };
        let config = LoaderConfig {
            max_retries: 2,
            ..LoaderConfig::default()
        };

        let mut loader = IndexLoader::open(&store, "media", config).await.unwrap();
        let err = loader.add(&doc(1031)).await.unwrap_err();

        assert!(!err.is_fatal());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejected_document_is_not_retried() {
        let store = InMemoryIndexStore::new();
        store.fail_node(1032);

        let mut loader = IndexLoader::open(&store, "media", LoaderConfig::default())
            .await
            .unwrap();
        loader.add(&doc(1031)).await.unwrap();
        assert!(matches!(
            loader.add(&doc(1032)).await,
            Err(PipelineError::WriteError(WriteError::Failure(_)))
        ));

        loader.commit().await.unwrap();
        loader.close().await.unwrap();
        assert_eq!(store.snapshot("media").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_timeout_is_fatal() {
        let store = InMemoryIndexStore::new();
        let config = LoaderConfig {
            write_timeout: Duration::from_millis(50),
            max_retries: 0,
            ..LoaderConfig::default()
        };
        let mut loader = IndexLoader::open(&store, "media", config).await.unwrap();

        store.set_write_latency(Some(Duration::from_secs(5)));
        let add = loader.add(&doc(1031)).await.unwrap_err();
        assert!(matches!(add, PipelineError::WriteTimeout { node_id: 1031, .. }));
        assert!(!add.is_fatal());

        let commit = loader.commit().await.unwrap_err();
        assert!(matches!(commit, PipelineError::CommitTimeout { .. }));
        assert!(commit.is_fatal());
    }

    #[tokio::test]
    async fn test_open_on_locked_location_fails() {
        let store = InMemoryIndexStore::new();
        let _first = IndexLoader::open(&store, "content", LoaderConfig::default())
            .await
            .unwrap();

        let second = IndexLoader::open(&store, "content", LoaderConfig::default()).await;
        assert!(matches!(
            second,
            Err(PipelineError::OpenError {
                source: WriteError::Locked(_),
                ..
            })
        ));
    }
}
