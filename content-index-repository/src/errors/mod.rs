//! Error types for the content indexer repository.

mod resolve_error;
mod source_error;
mod write_error;

pub use resolve_error::ResolveError;
pub use source_error::SourceError;
pub use write_error::WriteError;
