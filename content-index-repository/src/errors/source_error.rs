//! Content source error types.
//!
//! This module defines the errors a content source can report while
//! exporting or paging through a content tree.

use content_index_shared::CursorError;
use thiserror::Error;

/// Errors that can occur while fetching nodes from a content source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The backing store could not be reached, or did not answer in time.
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// Page index or page size cannot address the requested records.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// The legacy export could not be read.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl SourceError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid cursor error.
    pub fn invalid_cursor(msg: impl Into<String>) -> Self {
        Self::InvalidCursor(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

impl From<CursorError> for SourceError {
    fn from(err: CursorError) -> Self {
        Self::InvalidCursor(err.to_string())
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
