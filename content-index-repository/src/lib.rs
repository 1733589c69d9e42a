//! # Content Index Repository
//!
//! This crate provides the boundary traits of the content indexer and their
//! implementations. It includes definitions for errors, the capability
//! interfaces (content source, content-type resolver, user directory, index
//! store), a legacy XML export reader, a file-backed index store and
//! in-memory implementations of every boundary.

pub mod errors;
pub mod export;
pub mod index;
pub mod interfaces;
pub mod memory;

pub use errors::{ResolveError, SourceError, WriteError};
pub use export::XmlExportSource;
pub use index::{IndexSnapshot, JsonFileIndexStore};
pub use interfaces::{ContentSource, ContentTypeResolver, IndexStore, IndexWriter, UserDirectory};
pub use memory::{
    InMemoryContentSource, InMemoryContentTypeResolver, InMemoryIndexStore, InMemoryUserDirectory,
};
