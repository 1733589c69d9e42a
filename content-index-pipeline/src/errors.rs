//! Error types for the content indexer pipeline.

use content_index_repository::{ResolveError, SourceError, WriteError};
use content_index_shared::PageIndex;
use thiserror::Error;

/// Errors that can occur in the content indexer pipeline.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// Error from a content source.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// A source fetch did not complete in time.
    #[error("Fetch of {what} timed out after {timeout_ms}ms")]
    FetchTimeout { what: String, timeout_ms: u64 },

    /// Error from the content-type resolver.
    #[error("Resolve error: {0}")]
    ResolveError(#[from] ResolveError),

    /// A content type could not be resolved in time.
    #[error("Resolving content type {type_id} timed out after {timeout_ms}ms")]
    ResolveTimeout { type_id: i32, timeout_ms: u64 },

    /// Error from the index writer.
    #[error("Write error: {0}")]
    WriteError(#[from] WriteError),

    /// A document write did not complete in time.
    #[error("Write of document {node_id} timed out after {timeout_ms}ms")]
    WriteTimeout { node_id: i32, timeout_ms: u64 },

    /// The index location could not be opened.
    #[error("Failed to open index {location}: {source}")]
    OpenError {
        location: String,
        #[source]
        source: WriteError,
    },

    /// Staged documents could not be committed.
    #[error("Commit failed: {0}")]
    CommitError(#[source] WriteError),

    /// A commit did not complete in time.
    #[error("Commit timed out after {timeout_ms}ms")]
    CommitTimeout { timeout_ms: u64 },

    /// The error handler refused an event or panicked.
    #[error("Error handler failed: {0}")]
    HandlerError(String),

    /// A background prefetch task failed to complete.
    #[error("Prefetch of page {page_index} failed: {message}")]
    PrefetchError { page_index: PageIndex, message: String },

    /// The run was stopped from outside before it finished.
    #[error("Run interrupted")]
    Interrupted,

    /// The indexer was assembled without a required component.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PipelineError {
    /// Create a handler error.
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::HandlerError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether the error aborts the run, as opposed to failing a single node.
    pub fn is_fatal(&self) -> bool {
        match self {
            PipelineError::ResolveError(_)
            | PipelineError::ResolveTimeout { .. }
            | PipelineError::WriteTimeout { .. } => false,
            PipelineError::WriteError(e) => e.is_fatal(),
            PipelineError::SourceError(_)
            | PipelineError::FetchTimeout { .. }
            | PipelineError::OpenError { .. }
            | PipelineError::CommitError(_)
            | PipelineError::CommitTimeout { .. }
            | PipelineError::HandlerError(_)
            | PipelineError::PrefetchError { .. }
            | PipelineError::Interrupted
            | PipelineError::ConfigError(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(!PipelineError::from(ResolveError::UnknownType(1045)).is_fatal());
        assert!(!PipelineError::from(WriteError::failure("rejected")).is_fatal());
        assert!(!PipelineError::WriteTimeout { node_id: 1, timeout_ms: 10 }.is_fatal());

        assert!(PipelineError::from(WriteError::closed("content")).is_fatal());
        assert!(PipelineError::from(SourceError::unavailable("down")).is_fatal());
        assert!(PipelineError::from(SourceError::invalid_cursor("size 0")).is_fatal());
        assert!(PipelineError::CommitError(WriteError::failure("disk full")).is_fatal());
        assert!(PipelineError::CommitTimeout { timeout_ms: 10 }.is_fatal());
        assert!(PipelineError::handler("refused").is_fatal());
        assert!(PipelineError::Interrupted.is_fatal());
    }
}
