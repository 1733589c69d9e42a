use std::fmt;

use serde::Serialize;

/// Lifecycle of an indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexerState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// Which traversal a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Whole-tree legacy export, one commit per index.
    Full,
    /// Paged descendants, one commit per page.
    Paged,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Full => f.write_str("full"),
            RunMode::Paged => f.write_str("paged"),
        }
    }
}

/// Counters of a completed run.
///
/// Every fetched node is counted once in `attempted` and once in exactly one
/// of `indexed`, `skipped` or `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub attempted: u64,
    pub indexed: u64,
    /// Filtered out by publish state, parent restriction or node type.
    pub skipped: u64,
    /// Reported to the error handler.
    pub failed: u64,
    /// Policy fields left out of otherwise indexed documents.
    pub warnings: u64,
    /// Source fetches: pages in paged mode, exports in full mode.
    pub pages: u64,
}

impl RunSummary {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            attempted: 0,
            indexed: 0,
            skipped: 0,
            failed: 0,
            warnings: 0,
            pages: 0,
        }
    }
}
