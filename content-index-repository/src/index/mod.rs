//! Index storage: the snapshot format and a file-backed store.

mod json_store;
mod locks;
mod snapshot;

pub use json_store::JsonFileIndexStore;
pub use locks::{LocationGuard, LocationLocks};
pub use snapshot::{tokenize, IndexSnapshot, INDEX_FORMAT_VERSION};
