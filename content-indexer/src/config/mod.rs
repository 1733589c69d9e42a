//! Configuration and dependency wiring for the content indexer.

mod dependencies;
mod settings;

pub use dependencies::{Dependencies, CONTENT_INDEX_FILE, MEDIA_INDEX_FILE};
pub use settings::{IndexMode, LogFormat, Settings};
