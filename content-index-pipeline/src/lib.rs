//! # Content Index Pipeline
//!
//! This crate provides the pipeline components for syncing a content tree
//! into its search indexes.
//!
//! ## Architecture
//!
//! The pipeline follows the Traversal-Mapper-Loader pattern:
//!
//! 1. **Traversal**: Reads nodes from a content source, whole or page by page
//! 2. **Mapper**: Transforms nodes into index documents
//! 3. **Loader**: Writes documents into an index location
//! 4. **Orchestrator**: Coordinates the pipeline flow and its error events

pub mod errors;
pub mod events;
pub mod loader;
pub mod mapper;
pub mod orchestrator;
pub mod traversal;

pub use errors::PipelineError;
pub use events::{
    ErrorHandler, FailFast, HandlerError, IndexingErrorEvent, LogAndContinue, RecordingHandler,
};
pub use loader::{IndexLoader, LoaderConfig};
pub use mapper::{FieldCoercionWarning, FieldMapper, FieldPlan, MappedDocument, WarningReason};
pub use orchestrator::{
    ContentIndexer, ContentIndexerBuilder, IndexerConfig, IndexerState, RunMode, RunSummary,
    DEFAULT_PAGE_SIZE,
};
pub use traversal::PagedTraversal;
