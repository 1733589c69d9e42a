//! In-memory index store with fault injection for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::WriteError;
use crate::index::{IndexSnapshot, LocationGuard, LocationLocks};
use crate::interfaces::{IndexStore, IndexWriter};
use content_index_shared::IndexDocument;

#[derive(Debug, Clone, Default)]
struct Faults {
    failing_nodes: HashSet<i32>,
    fail_commits: bool,
    write_latency: Option<Duration>,
}

/// Index store keeping every location's snapshot in memory.
///
/// Clones share the same indexes, so a test can hand one clone to the
/// pipeline and inspect committed state through another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndexStore {
    indexes: Arc<Mutex<HashMap<String, IndexSnapshot>>>,
    locks: LocationLocks,
    faults: Arc<Mutex<Faults>>,
    commits: Arc<AtomicUsize>,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed state of a location, empty if nothing was committed.
    pub fn snapshot(&self, location: &str) -> IndexSnapshot {
        self.indexes
            .lock()
            .ok()
            .and_then(|indexes| indexes.get(location).cloned())
            .unwrap_or_default()
    }

    pub fn is_locked(&self, location: &str) -> bool {
        self.locks.is_held(location)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Make `add_or_update` fail for one node id.
    pub fn fail_node(&self, node_id: i32) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.failing_nodes.insert(node_id);
        }
    }

    pub fn fail_commits(&self, fail: bool) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.fail_commits = fail;
        }
    }

    /// Delay every `add_or_update` and `commit`.
    pub fn set_write_latency(&self, latency: Option<Duration>) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.write_latency = latency;
        }
    }

    fn faults(&self) -> Faults {
        self.faults
            .lock()
            .map(|faults| faults.clone())
            .unwrap_or_default()
    }

    fn indexes(&self) -> Result<MutexGuard<'_, HashMap<String, IndexSnapshot>>, WriteError> {
        self.indexes
            .lock()
            .map_err(|e| WriteError::corrupted(format!("Index table poisoned: {}", e)))
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn open(&self, location: &str) -> Result<Box<dyn IndexWriter>, WriteError> {
        let guard = self.locks.acquire(location)?;
        self.indexes()?.entry(location.to_string()).or_default();

        Ok(Box::new(InMemoryIndexWriter {
            store: self.clone(),
            staged: Vec::new(),
            guard: Some(guard),
        }))
    }
}

struct InMemoryIndexWriter {
    store: InMemoryIndexStore,
    staged: Vec<IndexDocument>,
    guard: Option<LocationGuard>,
}

impl InMemoryIndexWriter {
    fn location(&self) -> Result<String, WriteError> {
        self.guard
            .as_ref()
            .map(|g| g.location().to_string())
            .ok_or_else(|| WriteError::closed("in-memory writer"))
    }
}

#[async_trait]
impl IndexWriter for InMemoryIndexWriter {
    async fn add_or_update(&mut self, document: &IndexDocument) -> Result<(), WriteError> {
        self.location()?;
        let faults = self.store.faults();
        if let Some(latency) = faults.write_latency {
            tokio::time::sleep(latency).await;
        }
        if faults.failing_nodes.contains(&document.node_id) {
            return Err(WriteError::failure(format!(
                "document {} rejected",
                document.node_id
            )));
        }

        self.staged.push(document.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), WriteError> {
        let location = self.location()?;
        let faults = self.store.faults();
        if let Some(latency) = faults.write_latency {
            tokio::time::sleep(latency).await;
        }
        if faults.fail_commits {
            return Err(WriteError::corrupted(format!("commit to {} failed", location)));
        }

        let mut indexes = self.store.indexes()?;
        let snapshot = indexes.entry(location.clone()).or_default();
        for document in self.staged.drain(..) {
            snapshot.upsert(document);
        }
        self.store.commits.fetch_add(1, Ordering::SeqCst);

        debug!(location = %location, documents = snapshot.len(), "Committed in-memory index");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        self.staged.clear();
        self.guard.take();
        Ok(())
    }
}
