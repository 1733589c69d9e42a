//! Interface definitions for the content indexer boundaries.
//!
//! This module defines the abstract capability traits the pipeline is built
//! against, allowing for dependency injection and swappable backends
//! (relational store, legacy export, in-memory fakes).

mod content_source;
mod content_type_resolver;
mod index_writer;
mod user_directory;

pub use content_source::ContentSource;
pub use content_type_resolver::ContentTypeResolver;
pub use index_writer::{IndexStore, IndexWriter};
pub use user_directory::UserDirectory;
