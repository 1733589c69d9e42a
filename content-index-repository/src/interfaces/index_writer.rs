//! Index writer trait definitions.
//!
//! This module defines the abstract interface for index storage, allowing for
//! different backend implementations (in-memory, JSON file, a full-text engine).

use async_trait::async_trait;

use crate::errors::WriteError;
use content_index_shared::IndexDocument;

/// Opens writers on index locations.
///
/// A location accepts one open writer at a time; a second `open` on the same
/// location fails with `WriteError::Locked` until the first writer is closed.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Open a writer on an index location, creating the index if needed.
    ///
    /// # Arguments
    ///
    /// * `location` - Backend-specific name of the index (a key or a file path)
    ///
    /// # Returns
    ///
    /// * `Ok(Box<dyn IndexWriter>)` - A writer holding the location
    /// * `Err(WriteError::Locked)` - If another writer holds the location
    /// * `Err(WriteError)` - If the index cannot be opened
    async fn open(&self, location: &str) -> Result<Box<dyn IndexWriter>, WriteError>;
}

/// A single writer on an index location.
///
/// Documents are upserted by `IndexDocument::document_id`. Writes become
/// visible to readers only after `commit`; `close` discards anything not yet
/// committed and releases the location.
#[async_trait]
pub trait IndexWriter: Send {
    /// Stage a document, replacing any document with the same id on commit.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was staged
    /// * `Err(WriteError::Failure)` - If this document cannot be written
    /// * `Err(WriteError::Closed)` - If the writer is closed
    async fn add_or_update(&mut self, document: &IndexDocument) -> Result<(), WriteError>;

    /// Make all staged documents visible.
    async fn commit(&mut self) -> Result<(), WriteError>;

    /// Release the location. Uncommitted documents are discarded.
    ///
    /// Closing an already closed writer is a no-op.
    async fn close(&mut self) -> Result<(), WriteError>;
}
