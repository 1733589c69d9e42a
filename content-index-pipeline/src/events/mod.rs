//! Error events raised by the pipeline and the handlers that receive them.

mod handlers;

pub use handlers::{ErrorHandler, FailFast, HandlerError, LogAndContinue, RecordingHandler};

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::errors::PipelineError;
use content_index_shared::IndexType;

/// A failure reported to the caller's [`ErrorHandler`].
///
/// Per-node failures carry the node id and are not fatal; a fatal event is
/// raised once when a run aborts.
#[derive(Debug, Clone)]
pub struct IndexingErrorEvent {
    pub message: String,
    pub node_id: Option<i32>,
    pub index_type: Option<IndexType>,
    pub fatal: bool,
    pub inner: Option<Arc<PipelineError>>,
}

impl IndexingErrorEvent {
    /// Event for a single node that could not be indexed.
    pub fn for_node(error: PipelineError, node_id: i32, index_type: IndexType) -> Self {
        Self {
            message: format!("Failed to index node {}: {}", node_id, error),
            node_id: Some(node_id),
            index_type: Some(index_type),
            fatal: false,
            inner: Some(Arc::new(error)),
        }
    }

    /// Event for a run that is aborting.
    pub fn aborted(error: PipelineError, index_type: Option<IndexType>) -> Self {
        Self {
            message: format!("Indexing aborted: {}", error),
            node_id: None,
            index_type,
            fatal: true,
            inner: Some(Arc::new(error)),
        }
    }
}

impl fmt::Display for IndexingErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Deliver an event, turning a refusal or a panic into a fatal pipeline error.
pub(crate) fn dispatch(
    handler: &dyn ErrorHandler,
    event: &IndexingErrorEvent,
) -> Result<(), PipelineError> {
    match catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(PipelineError::handler(e.to_string())),
        Err(payload) => Err(PipelineError::handler(format!(
            "handler panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_index_repository::ResolveError;

    struct PanickingHandler;

    impl ErrorHandler for PanickingHandler {
        fn handle(&self, _event: &IndexingErrorEvent) -> Result<(), HandlerError> {
            panic!("boom");
        }
    }

    fn unknown_type_event() -> IndexingErrorEvent {
        IndexingErrorEvent::for_node(
            PipelineError::from(ResolveError::UnknownType(1045)),
            1112,
            IndexType::Content,
        )
    }

    #[test]
    fn test_node_event_fields() {
        let event = unknown_type_event();

        assert_eq!(event.node_id, Some(1112));
        assert!(!event.fatal);
        assert!(event.message.contains("1112"));
        assert!(matches!(
            event.inner.as_deref(),
            Some(PipelineError::ResolveError(ResolveError::UnknownType(1045)))
        ));
    }

    #[test]
    fn test_dispatch_outcomes() {
        let event = unknown_type_event();

        assert!(dispatch(&LogAndContinue, &event).is_ok());
        assert!(matches!(
            dispatch(&FailFast, &event),
            Err(PipelineError::HandlerError(_))
        ));

        match dispatch(&PanickingHandler, &event) {
            Err(PipelineError::HandlerError(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected dispatch result: {:?}", other),
        }
    }
}
