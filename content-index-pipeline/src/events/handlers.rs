use std::sync::Mutex;

use thiserror::Error;
use tracing::{error, warn};

use super::IndexingErrorEvent;

/// Returned by a handler that wants the run to stop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Receives indexing error events.
///
/// Called synchronously on the indexing task; implementations must not block.
/// Returning an error, or panicking, aborts the run.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, event: &IndexingErrorEvent) -> Result<(), HandlerError>;
}

/// Logs every event and lets the run continue. The production default.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAndContinue;

impl ErrorHandler for LogAndContinue {
    fn handle(&self, event: &IndexingErrorEvent) -> Result<(), HandlerError> {
        let index_type = event.index_type.map(|t| t.as_str()).unwrap_or("-");
        if event.fatal {
            error!(index_type = %index_type, error = %event.message, "Indexing aborted");
        } else {
            warn!(
                node_id = ?event.node_id,
                index_type = %index_type,
                error = %event.message,
                "Node not indexed"
            );
        }
        Ok(())
    }
}

/// Turns every event into a run failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailFast;

impl ErrorHandler for FailFast {
    fn handle(&self, event: &IndexingErrorEvent) -> Result<(), HandlerError> {
        Err(HandlerError::new(event.message.clone()))
    }
}

/// Collects events for later inspection.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<IndexingErrorEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in order.
    pub fn events(&self) -> Vec<IndexingErrorEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorHandler for RecordingHandler {
    fn handle(&self, event: &IndexingErrorEvent) -> Result<(), HandlerError> {
        self.events
            .lock()
            .map_err(|e| HandlerError::new(format!("event log poisoned: {}", e)))?
            .push(event.clone());
        Ok(())
    }
}
