//! Typed errors for queue waits and pipeline runs. Everything else travels as `anyhow::Error`.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A bounded wait on a [`ClosableQueue`](crate::queue::ClosableQueue) ran out of time.
#[derive(Error)]
pub enum QueueError<T> {
    /// The queue stayed full. The item was not enqueued and is handed back.
    #[error("put timed out after {waited:?}: queue still full")]
    PutTimeout { item: T, waited: Duration },
    /// The queue stayed full, so the close marker was not enqueued.
    #[error("close timed out after {0:?}: queue still full")]
    CloseTimeout(Duration),
    #[error("get timed out after {0:?}: queue still empty")]
    GetTimeout(Duration),
    #[error("join timed out after {waited:?} with {unfinished} unfinished item(s)")]
    JoinTimeout { waited: Duration, unfinished: usize },
}

impl<T> QueueError<T> {
    /// Recover the item a failed `put_timeout` did not enqueue.
    pub fn into_item(self) -> Option<T> {
        match self {
            QueueError::PutTimeout { item, .. } => Some(item),
            _ => None,
        }
    }
}

// Manual impl so payloads need not be Debug.
impl<T> fmt::Debug for QueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::PutTimeout { waited, .. } => f
                .debug_struct("PutTimeout")
                .field("waited", waited)
                .finish_non_exhaustive(),
            QueueError::CloseTimeout(waited) => {
                f.debug_tuple("CloseTimeout").field(waited).finish()
            }
            QueueError::GetTimeout(waited) => f.debug_tuple("GetTimeout").field(waited).finish(),
            QueueError::JoinTimeout { waited, unfinished } => f
                .debug_struct("JoinTimeout")
                .field("waited", waited)
                .field("unfinished", unfinished)
                .finish(),
        }
    }
}

/// Pipeline-level failures returned by [`run_pipeline`](crate::run_pipeline) and friends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("pipeline needs at least one stage")]
    NoStages,
    #[error("stage '{stage}' needs at least one worker")]
    NoWorkers { stage: String },
    #[error("stage '{stage}' worker {worker} failed: {reason}")]
    TransformFailed {
        stage: String,
        worker: usize,
        reason: String,
    },
    #[error("stage '{stage}' did not drain within {waited:?} ({unfinished} unfinished item(s))")]
    Stalled {
        stage: String,
        waited: Duration,
        unfinished: usize,
    },
    #[error("stage '{stage}' worker {worker} panicked outside its transform")]
    WorkerPanicked { stage: String, worker: usize },
}
