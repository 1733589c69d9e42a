//! Index writer error types.
//!
//! This module defines the errors that can occur while writing documents to
//! an index location.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during index writer operations.
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    /// A single document could not be written.
    #[error("Write failure: {0}")]
    Failure(String),

    /// The writer was closed, no further writes are possible.
    #[error("Index writer closed: {0}")]
    Closed(String),

    /// The index location is damaged and cannot be written.
    #[error("Index corrupted: {0}")]
    Corrupted(String),

    /// Another writer holds the index location.
    #[error("Index location locked: {0}")]
    Locked(String),

    /// I/O error from a file-backed index.
    #[error("I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// The index file could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[source] Arc<serde_json::Error>),
}

impl From<std::io::Error> for WriteError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for WriteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(Arc::new(err))
    }
}

impl WriteError {
    /// Create a write failure.
    pub fn failure(msg: impl Into<String>) -> Self {
        Self::Failure(msg.into())
    }

    /// Create a closed error.
    pub fn closed(msg: impl Into<String>) -> Self {
        Self::Closed(msg.into())
    }

    /// Create a corrupted error.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Create a locked error.
    pub fn locked(location: impl Into<String>) -> Self {
        Self::Locked(location.into())
    }

    /// Whether the writer itself is unusable, as opposed to one document failing.
    pub fn is_fatal(&self) -> bool {
        match self {
            WriteError::Failure(_) | WriteError::Serialization(_) => false,
            WriteError::Closed(_)
            | WriteError::Corrupted(_)
            | WriteError::Locked(_)
            | WriteError::Io(_) => true,
        }
    }
}
