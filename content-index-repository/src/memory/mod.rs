//! In-memory implementations of every boundary.

mod content_source;
mod index_store;
mod type_resolver;
mod user_directory;

pub use content_source::InMemoryContentSource;
pub use index_store::InMemoryIndexStore;
pub use type_resolver::InMemoryContentTypeResolver;
pub use user_directory::InMemoryUserDirectory;
