//! Traversal module for the content indexer pipeline.
//!
//! Reads nodes from a content source, either as one legacy export or page by
//! page, bounding every fetch by a timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::errors::PipelineError;
use content_index_repository::ContentSource;
use content_index_shared::{ContentNode, DescendantsQuery, LegacyExportQuery, Page};

/// Fetch a whole subtree through the legacy export.
#[instrument(skip(source))]
pub async fn fetch_export(
    source: &dyn ContentSource,
    query: &LegacyExportQuery,
    fetch_timeout: Duration,
) -> Result<Vec<ContentNode>, PipelineError> {
    match tokio::time::timeout(fetch_timeout, source.fetch_all_by_legacy_export(query)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(PipelineError::FetchTimeout {
            what: format!("legacy export below {}", query.root_id),
            timeout_ms: fetch_timeout.as_millis() as u64,
        }),
    }
}

async fn fetch_page(
    source: Arc<dyn ContentSource>,
    query: DescendantsQuery,
    fetch_timeout: Duration,
) -> Result<Page, PipelineError> {
    match tokio::time::timeout(fetch_timeout, source.fetch_descendants(&query)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(PipelineError::FetchTimeout {
            what: format!("page {} below {}", query.page_index, query.root_id),
            timeout_ms: fetch_timeout.as_millis() as u64,
        }),
    }
}

/// Walks the descendants of a root one page at a time.
///
/// Pages are yielded strictly in order. With prefetch enabled the fetch of
/// the following page runs on a background task while the caller processes
/// the current one, so at most two pages are held. The background task is
/// aborted when the traversal is dropped.
pub struct PagedTraversal {
    source: Arc<dyn ContentSource>,
    query: DescendantsQuery,
    fetch_timeout: Duration,
    prefetch: bool,
    pending: Option<JoinHandle<Result<Page, PipelineError>>>,
    finished: bool,
    pages: u64,
}

impl PagedTraversal {
    pub fn new(
        source: Arc<dyn ContentSource>,
        query: DescendantsQuery,
        fetch_timeout: Duration,
        prefetch: bool,
    ) -> Self {
        Self {
            source,
            query,
            fetch_timeout,
            prefetch,
            pending: None,
            finished: false,
            pages: 0,
        }
    }

    /// Pages yielded so far.
    pub fn pages(&self) -> u64 {
        self.pages
    }

    /// The next page, `None` once `page_index * page_size` reaches the total.
    ///
    /// The first page is always fetched, so an empty tree yields one empty page.
    pub async fn next_page(&mut self) -> Result<Option<Page>, PipelineError> {
        if self.finished {
            return Ok(None);
        }

        let current = self.query.clone();
        let page = match self.pending.take() {
            Some(handle) => handle.await.map_err(|e| PipelineError::PrefetchError {
                page_index: current.page_index,
                message: e.to_string(),
            })??,
            None => fetch_page(self.source.clone(), current.clone(), self.fetch_timeout).await?,
        };

        self.pages += 1;
        debug!(
            page_index = %current.page_index,
            returned = page.len(),
            total = page.total_records,
            "Fetched page"
        );

        if page.has_next(&current) {
            self.query = current.next_page();
            if self.prefetch {
                self.pending = Some(tokio::spawn(fetch_page(
                    self.source.clone(),
                    self.query.clone(),
                    self.fetch_timeout,
                )));
            }
        } else {
            self.finished = true;
        }

        Ok(Some(page))
    }

    /// Abort any outstanding prefetch and stop yielding pages.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
            debug!(page_index = %self.query.page_index, "Cancelled prefetch");
        }
        self.finished = true;
    }
}

impl Drop for PagedTraversal {
    fn drop(&mut self) {
        self.cancel();
    }
}
