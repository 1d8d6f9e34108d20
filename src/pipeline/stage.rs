use anyhow::{Context, Result};
use log::debug;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::queue::ClosableQueue;
use crate::types::{StageEventKind, WorkerStats};

use super::context::PipelineContext;

/// Item transform shared by every worker of a stage.
pub type Transform<T> = Arc<dyn Fn(T) -> Result<T> + Send + Sync>;

/// One pipeline step: a name, how many worker threads run it, and what they do to each item.
pub struct Stage<T> {
    name: String,
    workers: usize,
    transform: Transform<T>,
}

impl<T> Clone for Stage<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            workers: self.workers,
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<T> Stage<T> {
    /// Stage with an infallible transform.
    pub fn new<F>(name: impl Into<String>, workers: usize, f: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Self::fallible(name, workers, move |item| Ok(f(item)))
    }

    /// Stage whose transform may fail; what a failure does depends on strict mode.
    pub fn fallible<F>(name: impl Into<String>, workers: usize, f: F) -> Self
    where
        F: Fn(T) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            workers,
            transform: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Same stage with a different fan-out.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

struct StageWorker<T> {
    stage_index: usize,
    stage_name: String,
    worker: usize,
    transform: Transform<T>,
    input: Arc<ClosableQueue<T>>,
    output: Arc<ClosableQueue<T>>,
    ctx: PipelineContext,
}

/// Run the transform, turning a panic into an ordinary failure so the item still gets acknowledged.
fn apply_transform<T>(transform: &Transform<T>, item: T) -> std::result::Result<T, String> {
    match catch_unwind(AssertUnwindSafe(|| transform(item))) {
        Ok(Ok(out)) => Ok(out),
        Ok(Err(err)) => Err(format!("{:#}", err)),
        Err(payload) => Err(format!("transform panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Single stage worker: take items until the close marker, transform, put on the output queue.
/// Never closes the output queue; other workers may still be feeding it.
fn stage_worker_loop<T>(w: StageWorker<T>) -> WorkerStats {
    let mut stats = WorkerStats::default();
    for item in w.input.iter() {
        stats.received += 1;
        if w.ctx.is_halted() {
            stats.discarded += 1;
            w.ctx.emit(w.stage_index, w.worker, StageEventKind::Discarded);
            continue;
        }
        match apply_transform(&w.transform, item) {
            Ok(out) => {
                w.output.put(out);
                stats.processed += 1;
                w.ctx.emit(w.stage_index, w.worker, StageEventKind::Processed);
            }
            Err(reason) => {
                stats.failed += 1;
                w.ctx.record_failure(&w.stage_name, w.worker, reason);
                w.ctx.emit(w.stage_index, w.worker, StageEventKind::Failed);
            }
        }
    }
    debug!(
        "{}-{}: close marker seen, exiting ({} received, {} processed)",
        w.stage_name, w.worker, stats.received, stats.processed
    );
    stats
}

/// Spawn `stage.workers()` threads named `<stage>-<n>` reading `input` and writing `output`.
/// If a spawn fails, the threads already started are sent a close marker each so they exit.
pub fn spawn_stage_workers<T: Send + 'static>(
    stage_index: usize,
    stage: &Stage<T>,
    input: &Arc<ClosableQueue<T>>,
    output: &Arc<ClosableQueue<T>>,
    ctx: &PipelineContext,
) -> Result<Vec<JoinHandle<WorkerStats>>> {
    let mut handles = Vec::with_capacity(stage.workers);
    for worker in 0..stage.workers {
        let w = StageWorker {
            stage_index,
            stage_name: stage.name.clone(),
            worker,
            transform: Arc::clone(&stage.transform),
            input: Arc::clone(input),
            output: Arc::clone(output),
            ctx: ctx.clone(),
        };
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", stage.name, worker))
            .spawn(move || stage_worker_loop(w))
            .with_context(|| format!("spawn worker {} of stage '{}'", worker, stage.name));
        match spawned {
            Ok(h) => handles.push(h),
            Err(e) => {
                for _ in &handles {
                    input.close();
                }
                return Err(e);
            }
        }
    }
    Ok(handles)
}
