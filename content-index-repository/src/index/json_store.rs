//! File-backed index store.
//!
//! Each location is a JSON file holding an [`IndexSnapshot`]. Commits write
//! the whole snapshot to a sibling temporary file and rename it into place,
//! so readers never observe a partially written index.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::errors::WriteError;
use crate::index::locks::{LocationGuard, LocationLocks};
use crate::index::snapshot::{IndexSnapshot, INDEX_FORMAT_VERSION};
use crate::interfaces::{IndexStore, IndexWriter};
use content_index_shared::IndexDocument;

/// Index store writing one JSON snapshot file per location.
///
/// Locations are file paths, relative ones are resolved against `base_dir`.
#[derive(Debug, Clone)]
pub struct JsonFileIndexStore {
    base_dir: PathBuf,
    locks: LocationLocks,
}

impl JsonFileIndexStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            locks: LocationLocks::new(),
        }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Read the committed snapshot of a location.
    pub async fn load(&self, location: &str) -> Result<IndexSnapshot, WriteError> {
        read_snapshot(&self.resolve(location)).await
    }
}

async fn read_snapshot(path: &Path) -> Result<IndexSnapshot, WriteError> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(IndexSnapshot::default());
    }

    let bytes = tokio::fs::read(path).await?;
    let snapshot: IndexSnapshot = serde_json::from_slice(&bytes)
        .map_err(|e| WriteError::corrupted(format!("{}: {}", path.display(), e)))?;

    if snapshot.version != INDEX_FORMAT_VERSION {
        return Err(WriteError::corrupted(format!(
            "{}: unsupported index version {}",
            path.display(),
            snapshot.version
        )));
    }
    Ok(snapshot)
}

#[async_trait]
impl IndexStore for JsonFileIndexStore {
    #[instrument(skip(self))]
    async fn open(&self, location: &str) -> Result<Box<dyn IndexWriter>, WriteError> {
        let guard = self.locks.acquire(location)?;
        let path = self.resolve(location);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let snapshot = read_snapshot(&path).await?;

        info!(path = %path.display(), documents = snapshot.len(), "Opened JSON index");

        Ok(Box::new(JsonFileIndexWriter {
            path,
            snapshot,
            staged: Vec::new(),
            guard: Some(guard),
        }))
    }
}

struct JsonFileIndexWriter {
    path: PathBuf,
    snapshot: IndexSnapshot,
    staged: Vec<IndexDocument>,
    guard: Option<LocationGuard>,
}

impl JsonFileIndexWriter {
    fn ensure_open(&self) -> Result<(), WriteError> {
        match self.guard {
            Some(_) => Ok(()),
            None => Err(WriteError::closed(self.path.display().to_string())),
        }
    }
}

#[async_trait]
impl IndexWriter for JsonFileIndexWriter {
    async fn add_or_update(&mut self, document: &IndexDocument) -> Result<(), WriteError> {
        self.ensure_open()?;
        self.staged.push(document.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), WriteError> {
        self.ensure_open()?;
        if self.staged.is_empty() {
            return Ok(());
        }

        let mut next = self.snapshot.clone();
        for document in &self.staged {
            next.upsert(document.clone());
        }

        let bytes = serde_json::to_vec_pretty(&next)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!(
            path = %self.path.display(),
            committed = self.staged.len(),
            documents = next.len(),
            "Committed JSON index"
        );

        self.snapshot = next;
        self.staged.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WriteError> {
        if let Some(guard) = self.guard.take() {
            if !self.staged.is_empty() {
                debug!(
                    location = %guard.location(),
                    discarded = self.staged.len(),
                    "Discarding uncommitted documents"
                );
            }
            self.staged.clear();
        }
        Ok(())
    }
}
