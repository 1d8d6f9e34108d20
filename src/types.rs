//! Public and internal types for the queuepipe API and pipeline.

use serde::Serialize;
use std::time::Duration;

use crate::utils::config::{DEFAULT_CAPACITY, DEFAULT_ITEM_COUNT, DEFAULT_STAGE_WORKERS};

/// Lib-only options for [`run_pipeline`](crate::run_pipeline) and
/// [`start_pipeline`](crate::pipeline::start_pipeline).
#[derive(Clone, Debug, Default)]
pub struct PipelineOpts {
    /// Depth limit of every queue between stages. 0 means unbounded.
    pub capacity: usize,
    /// Strict mode: halt the whole pipeline on the first transform failure and return it as an error.
    /// Otherwise failed items are skipped, logged and listed in the report.
    pub strict: bool,
    /// Upper bound on each stage's drain during shutdown. `None` waits forever.
    pub drain_timeout: Option<Duration>,
    /// Emit a [`StageEvent`] per item outcome on the handles' event channel.
    pub report_progress: bool,
}

impl From<&Opts> for PipelineOpts {
    fn from(o: &Opts) -> Self {
        PipelineOpts {
            capacity: o.capacity,
            strict: o.strict,
            drain_timeout: o.drain_timeout_secs.map(Duration::from_secs),
            report_progress: o.verbose,
        }
    }
}

/// Full options for the CLI demo run. Use [`PipelineOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Number of synthetic photos fed to the head queue.
    pub items: usize,
    /// Queue depth limit (0 = unbounded).
    pub capacity: usize,
    /// Worker count for download, resize and upload, in that order.
    pub workers: Vec<usize>,
    /// Simulated I/O latency per transform call, in milliseconds.
    pub delay_ms: u64,
    /// Make every Nth upload fail, to exercise the failure policy.
    pub fail_every: Option<usize>,
    /// Strict mode: halt on first failure.
    pub strict: bool,
    /// Debug logging and progress bar.
    pub verbose: bool,
    /// Print the run report as JSON instead of the colored summary.
    pub json: bool,
    /// Per-stage drain timeout in seconds.
    pub drain_timeout_secs: Option<u64>,
}

impl Default for Opts {
    fn default() -> Self {
        Opts {
            items: DEFAULT_ITEM_COUNT,
            capacity: DEFAULT_CAPACITY,
            workers: DEFAULT_STAGE_WORKERS.to_vec(),
            delay_ms: 0,
            fail_every: None,
            strict: false,
            verbose: false,
            json: false,
            drain_timeout_secs: None,
        }
    }
}

/// What happened to one item inside a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageEventKind {
    Processed,
    Failed,
    /// Taken off the input queue after a halt and dropped untransformed.
    Discarded,
}

/// Per-item notification sent by workers when progress reporting is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageEvent {
    pub stage: usize,
    pub worker: usize,
    pub kind: StageEventKind,
}

/// Counters a single worker thread returns when it exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: usize,
    pub processed: usize,
    pub failed: usize,
    pub discarded: usize,
}

impl WorkerStats {
    pub fn merge(&mut self, other: &WorkerStats) {
        self.received += other.received;
        self.processed += other.processed;
        self.failed += other.failed;
        self.discarded += other.discarded;
    }
}

/// One transform failure, as recorded by the worker that hit it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub stage: String,
    pub worker: usize,
    pub reason: String,
}

/// Totals for one stage after its workers were joined.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub name: String,
    pub workers: usize,
    pub received: usize,
    pub processed: usize,
    pub failed: usize,
    pub discarded: usize,
}

/// Summary of a whole run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    /// Items put on the head queue.
    pub fed: usize,
    /// Items that came out of the last stage.
    pub outputs: usize,
    pub failures: Vec<FailureRecord>,
    /// Feeding stopped early on Ctrl-C.
    pub cancelled: bool,
    /// Strict mode stopped the pipeline after a failure.
    pub halted: bool,
    pub elapsed_ms: u64,
}

impl PipelineReport {
    pub fn total_workers(&self) -> usize {
        self.stages.iter().map(|s| s.workers).sum()
    }
}

/// Result of [`run_pipeline`](crate::run_pipeline): every output item plus the run report.
/// Output order is unspecified when any stage has more than one worker.
#[derive(Debug)]
pub struct PipelineRun<T> {
    pub outputs: Vec<T>,
    pub report: PipelineReport,
}
