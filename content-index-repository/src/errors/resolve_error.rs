//! Content-type resolution error types.

use thiserror::Error;

/// Errors that can occur while resolving a node's content type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No schema exists for the type id.
    #[error("Unknown content type: {0}")]
    UnknownType(i32),

    /// The schema store could not be reached.
    #[error("Resolver unavailable: {0}")]
    Unavailable(String),
}

impl ResolveError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
