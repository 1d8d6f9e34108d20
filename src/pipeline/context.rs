//! Pipeline context and handles: shared failure/halt state passed into every worker, and what
//! `start_pipeline` hands back to the caller.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::PipelineOpts;
use crate::error::PipelineError;
use crate::queue::ClosableQueue;
use crate::types::{FailureRecord, StageEvent, StageEventKind, WorkerStats};

/// Shared state for one pipeline run. Cloned into every worker; clones share the same flags and
/// failure lists.
#[derive(Clone)]
pub struct PipelineContext {
    pub strict: bool,
    /// Set by the first failure in strict mode. Workers then discard instead of transforming.
    pub halted: Arc<AtomicBool>,
    /// Set from outside (Ctrl-C). Only stops feeding; in-flight items still drain.
    pub cancel_requested: Arc<AtomicBool>,
    pub first_error: Arc<Mutex<Option<PipelineError>>>,
    pub failures: Arc<Mutex<Vec<FailureRecord>>>,
    pub events: Option<Sender<StageEvent>>,
}

impl PipelineContext {
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::Relaxed)
    }

    /// Whether the feeder should stop putting new items on the head queue.
    pub fn stop_feeding(&self) -> bool {
        self.is_halted() || self.is_cancelled()
    }

    /// Record a transform failure. In strict mode the first one is kept as the run's error and
    /// the pipeline halts.
    pub fn record_failure(&self, stage: &str, worker: usize, reason: String) {
        if self.strict {
            let mut first = self
                .first_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if first.is_none() {
                *first = Some(PipelineError::TransformFailed {
                    stage: stage.to_string(),
                    worker,
                    reason: reason.clone(),
                });
                self.halted.store(true, Ordering::Release);
                log::error!("halting pipeline: stage '{}' failed: {}", stage, reason);
            }
        } else {
            log::warn!("skipping item in stage '{}': {}", stage, reason);
        }
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FailureRecord {
                stage: stage.to_string(),
                worker,
                reason,
            });
    }

    pub fn emit(&self, stage: usize, worker: usize, kind: StageEventKind) {
        if let Some(tx) = &self.events {
            let _ = tx.send(StageEvent {
                stage,
                worker,
                kind,
            });
        }
    }

    pub fn take_first_error(&self) -> Option<PipelineError> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn failures_snapshot(&self) -> Vec<FailureRecord> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Build the shared context; the receiver is `Some` only when progress reporting is on.
pub fn create_pipeline_context(
    opts: &PipelineOpts,
) -> (PipelineContext, Option<Receiver<StageEvent>>) {
    let (events, events_rx) = if opts.report_progress {
        let (tx, rx) = unbounded::<StageEvent>();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };
    let ctx = PipelineContext {
        strict: opts.strict,
        halted: Arc::new(AtomicBool::new(false)),
        cancel_requested: Arc::new(AtomicBool::new(false)),
        first_error: Arc::new(Mutex::new(None)),
        failures: Arc::new(Mutex::new(Vec::new())),
        events,
    };
    (ctx, events_rx)
}

/// Worker threads of one stage plus the queue they consume.
pub struct StageGroup<T> {
    pub name: String,
    pub input: Arc<ClosableQueue<T>>,
    pub workers: Vec<JoinHandle<WorkerStats>>,
}

/// Handles returned by [`start_pipeline`](super::start_pipeline): feed the head queue, optionally
/// consume `output` and `events`, then pass to [`shutdown_pipeline`](super::shutdown_pipeline).
/// Dropping them without shutting down leaves the workers blocked on their queues.
pub struct PipelineHandles<T> {
    /// Head queue; [`feed`](Self::feed) puts here.
    pub input: Arc<ClosableQueue<T>>,
    /// Last stage's output. Closed once by shutdown, so `output.iter()` ends. When bounded,
    /// something must consume it (see [`spawn_collector`](super::spawn_collector)).
    pub output: Arc<ClosableQueue<T>>,
    pub stages: Vec<StageGroup<T>>,
    pub ctx: PipelineContext,
    /// Per-item outcomes when [`PipelineOpts::report_progress`] is set. Ends after shutdown.
    pub events: Option<Receiver<StageEvent>>,
    pub drain_timeout: Option<Duration>,
    pub started: Instant,
    /// Items fed so far.
    pub fed: usize,
}
