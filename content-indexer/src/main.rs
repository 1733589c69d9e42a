//! Content Indexer
//!
//! Entry point: syncs the exported content and media trees into their index
//! files and exits.

use content_indexer::{run, Dependencies, IndexingError, LogFormat, Settings};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;
    init_logging(settings.log_format);

    info!(mode = ?settings.mode, "Starting content indexer");

    let mut dependencies = Dependencies::new(settings).await?;
    match run(&mut dependencies).await {
        Ok(summary) => {
            info!(
                summary = %serde_json::to_string(&summary).unwrap_or_default(),
                "Content indexer finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Content indexer failed");
            Err(e)
        }
    }
}
