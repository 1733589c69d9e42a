//! Settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::IndexingError;
use content_index_pipeline::{IndexerConfig, LoaderConfig, DEFAULT_PAGE_SIZE};
use content_index_shared::{IndexCriteria, ROOT_ID};

/// Default directory holding the index files.
const DEFAULT_INDEX_PATH: &str = "./index";

/// Default fetch and resolve timeout in milliseconds.
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Default write and commit timeout in milliseconds.
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 30_000;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_RETRY_DELAY_MS: u64 = 100;
const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 5_000;

/// Which run the binary performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    Full,
    Paged,
}

impl FromStr for IndexMode {
    type Err = IndexingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(IndexMode::Full),
            "paged" | "incremental" => Ok(IndexMode::Paged),
            other => Err(IndexingError::config(format!(
                "INDEX_MODE must be full or paged, got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = IndexingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(IndexingError::config(format!(
                "LOG_FORMAT must be text or json, got {:?}",
                other
            ))),
        }
    }
}

/// Everything the binary needs to know before wiring dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub content_export_path: Option<PathBuf>,
    pub media_export_path: Option<PathBuf>,
    pub index_path: PathBuf,
    /// JSON file holding the [`IndexCriteria`]; the default criteria index
    /// system fields only.
    pub field_policy_path: Option<PathBuf>,
    pub mode: IndexMode,
    pub root_id: i32,
    pub page_size: usize,
    pub support_unpublished_content: bool,
    pub prefetch_pages: bool,
    pub fetch_timeout: Duration,
    pub write_timeout: Duration,
    pub max_retries: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub log_format: LogFormat,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CONTENT_EXPORT_PATH`: Legacy XML export of the content tree
    /// - `MEDIA_EXPORT_PATH`: Legacy XML export of the media tree
    /// - `INDEX_PATH`: Directory of the index files (default: ./index)
    /// - `FIELD_POLICY_PATH`: JSON field policy
    /// - `INDEX_MODE`: `full` or `paged` (default: full)
    /// - `ROOT_ID`: Root of a paged run (default: -1)
    /// - `PAGE_SIZE`: Nodes per page (default: 10000)
    /// - `SUPPORT_UNPUBLISHED_CONTENT`: Index unpublished content (default: false)
    /// - `PREFETCH_PAGES`: Fetch the next page in the background (default: false)
    /// - `FETCH_TIMEOUT_MS`, `WRITE_TIMEOUT_MS`: Timeouts (default: 30000)
    /// - `MAX_RETRIES`, `INITIAL_RETRY_DELAY_MS`, `MAX_RETRY_DELAY_MS`: Write retries
    /// - `LOG_FORMAT`: `text` or `json` (default: text)
    ///
    /// At least one export path is required.
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let settings = Self {
            content_export_path: get("CONTENT_EXPORT_PATH").map(PathBuf::from),
            media_export_path: get("MEDIA_EXPORT_PATH").map(PathBuf::from),
            index_path: get("INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH)),
            field_policy_path: get("FIELD_POLICY_PATH").map(PathBuf::from),
            mode: parse_or(get("INDEX_MODE"), "INDEX_MODE", IndexMode::Full)?,
            root_id: parse_or(get("ROOT_ID"), "ROOT_ID", ROOT_ID)?,
            page_size: parse_or(get("PAGE_SIZE"), "PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            support_unpublished_content: parse_flag(
                get("SUPPORT_UNPUBLISHED_CONTENT"),
                "SUPPORT_UNPUBLISHED_CONTENT",
            )?,
            prefetch_pages: parse_flag(get("PREFETCH_PAGES"), "PREFETCH_PAGES")?,
            fetch_timeout: Duration::from_millis(parse_or(
                get("FETCH_TIMEOUT_MS"),
                "FETCH_TIMEOUT_MS",
                DEFAULT_FETCH_TIMEOUT_MS,
            )?),
            write_timeout: Duration::from_millis(parse_or(
                get("WRITE_TIMEOUT_MS"),
                "WRITE_TIMEOUT_MS",
                DEFAULT_WRITE_TIMEOUT_MS,
            )?),
            max_retries: parse_or(get("MAX_RETRIES"), "MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            initial_retry_delay_ms: parse_or(
                get("INITIAL_RETRY_DELAY_MS"),
                "INITIAL_RETRY_DELAY_MS",
                DEFAULT_INITIAL_RETRY_DELAY_MS,
            )?,
            max_retry_delay_ms: parse_or(
                get("MAX_RETRY_DELAY_MS"),
                "MAX_RETRY_DELAY_MS",
                DEFAULT_MAX_RETRY_DELAY_MS,
            )?,
            log_format: parse_or(get("LOG_FORMAT"), "LOG_FORMAT", LogFormat::Text)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), IndexingError> {
        if self.content_export_path.is_none() && self.media_export_path.is_none() {
            return Err(IndexingError::config(
                "set CONTENT_EXPORT_PATH or MEDIA_EXPORT_PATH",
            ));
        }
        if self.page_size == 0 {
            return Err(IndexingError::config("PAGE_SIZE must be positive"));
        }
        if self.fetch_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(IndexingError::config("timeouts must be positive"));
        }
        Ok(())
    }

    /// Pipeline configuration for these settings and the loaded criteria.
    pub fn indexer_config(&self, criteria: IndexCriteria) -> IndexerConfig {
        IndexerConfig {
            support_unpublished_content: self.support_unpublished_content,
            criteria,
            content_location: super::CONTENT_INDEX_FILE.to_string(),
            media_location: super::MEDIA_INDEX_FILE.to_string(),
            prefetch_pages: self.prefetch_pages,
            fetch_timeout: self.fetch_timeout,
            loader: LoaderConfig {
                write_timeout: self.write_timeout,
                max_retries: self.max_retries,
                initial_retry_delay_ms: self.initial_retry_delay_ms,
                max_retry_delay_ms: self.max_retry_delay_ms,
            },
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, IndexingError>
where
    T: FromStr,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| IndexingError::config(format!("{} has invalid value {:?}", key, raw))),
        None => Ok(default),
    }
}

fn parse_flag(raw: Option<String>, key: &str) -> Result<bool, IndexingError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no") => Ok(false),
        Some(v) => Err(IndexingError::config(format!(
            "{} must be true or false, got {:?}",
            key, v
        ))),
    }
}
