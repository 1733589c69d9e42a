//! # Content Indexer
//!
//! Main library for the content indexer.
//!
//! This crate provides the settings, the dependency wiring and the run entry
//! point for syncing exported content and media trees into their indexes.

pub mod config;

pub use config::{Dependencies, IndexMode, LogFormat, Settings};

use std::future::Future;

use content_index_pipeline::RunSummary;
use thiserror::Error;
use tracing::info;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] content_index_pipeline::PipelineError),

    /// An export could not be loaded.
    #[error("Source error: {0}")]
    SourceError(#[from] content_index_repository::SourceError),

    /// The field policy file is not valid JSON.
    #[error("Field policy error: {0}")]
    PolicyError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The run was interrupted before it finished.
    #[error("Interrupted")]
    Interrupted,
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Run the configured mode once, stopping early on Ctrl-C.
///
/// An interrupted run commits nothing further: dropping the run releases the
/// index locations and discards staged documents, and the indexer is left
/// `Aborted` with one fatal event raised.
pub async fn run(dependencies: &mut Dependencies) -> Result<RunSummary, IndexingError> {
    run_until(dependencies, tokio::signal::ctrl_c()).await
}

/// Run the configured mode until it finishes or `shutdown` resolves.
async fn run_until<F>(
    dependencies: &mut Dependencies,
    shutdown: F,
) -> Result<RunSummary, IndexingError>
where
    F: Future,
{
    let settings = dependencies.settings.clone();
    let indexer = &mut dependencies.indexer;

    let run = async {
        match settings.mode {
            IndexMode::Full => indexer.run_full().await,
            IndexMode::Paged => {
                indexer
                    .run_incremental_paged(settings.root_id, settings.page_size)
                    .await
            }
        }
    };

    let finished = tokio::select! {
        result = run => Some(result),
        _ = shutdown => None,
    };

    match finished {
        Some(result) => Ok(result?),
        None => {
            info!("Received shutdown signal");
            dependencies.indexer.interrupt();
            Err(IndexingError::Interrupted)
        }
    }
}
