use anyhow::{Context, Result};
use log::{debug, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use std::time::Instant;

use crate::error::{PipelineError, QueueError};
use crate::queue::ClosableQueue;
use crate::types::{PipelineOpts, PipelineReport, PipelineRun, StageReport, WorkerStats};

use super::context::{PipelineHandles, StageGroup, create_pipeline_context};
use super::error_handler::check_for_first_error_or_skipped_items;
use super::stage::{Stage, spawn_stage_workers};

fn validate_stages<T>(stages: &[Stage<T>]) -> Result<(), PipelineError> {
    if stages.is_empty() {
        return Err(PipelineError::NoStages);
    }
    if let Some(s) = stages.iter().find(|s| s.workers() == 0) {
        return Err(PipelineError::NoWorkers {
            stage: s.name().to_string(),
        });
    }
    Ok(())
}

/// Send every started worker its close marker so it exits. Used when startup fails part way.
fn abort_started_groups<T>(groups: &[StageGroup<T>]) {
    for group in groups {
        for _ in &group.workers {
            group.input.close();
        }
    }
}

/// Start the pipeline: one queue per stage input plus the final output queue, and every stage's
/// workers. Caller feeds with [`PipelineHandles::feed`] and must finish with [`shutdown_pipeline`].
pub fn start_pipeline<T: Send + 'static>(
    stages: Vec<Stage<T>>,
    opts: &PipelineOpts,
) -> Result<PipelineHandles<T>> {
    validate_stages(&stages)?;

    let queues: Vec<Arc<ClosableQueue<T>>> = (0..=stages.len())
        .map(|_| Arc::new(ClosableQueue::new(opts.capacity)))
        .collect();
    let (ctx, events) = create_pipeline_context(opts);

    let mut groups: Vec<StageGroup<T>> = Vec::with_capacity(stages.len());
    for (i, stage) in stages.iter().enumerate() {
        match spawn_stage_workers(i, stage, &queues[i], &queues[i + 1], &ctx) {
            Ok(workers) => groups.push(StageGroup {
                name: stage.name().to_string(),
                input: Arc::clone(&queues[i]),
                workers,
            }),
            Err(e) => {
                abort_started_groups(&groups);
                return Err(e);
            }
        }
    }
    debug!(
        "started {} stage(s): {}; queue capacity {}",
        stages.len(),
        stages
            .iter()
            .map(|s| format!("{} x{}", s.name(), s.workers()))
            .collect::<Vec<_>>()
            .join(" -> "),
        if opts.capacity == 0 {
            "unbounded".to_string()
        } else {
            opts.capacity.to_string()
        }
    );

    Ok(PipelineHandles {
        input: Arc::clone(&queues[0]),
        output: Arc::clone(&queues[stages.len()]),
        stages: groups,
        ctx,
        events,
        drain_timeout: opts.drain_timeout,
        started: Instant::now(),
        fed: 0,
    })
}

impl<T> PipelineHandles<T> {
    /// Put items on the head queue, blocking while it is full. Stops early once cancel or halt is
    /// requested. Returns how many items this call fed.
    pub fn feed<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut count = 0_usize;
        for item in items {
            if self.ctx.stop_feeding() {
                debug!("feed stopped after {} item(s)", self.fed + count);
                break;
            }
            self.input.put(item);
            count += 1;
        }
        self.fed += count;
        count
    }

    /// Flag that stops [`feed`](Self::feed) when set, e.g. from a Ctrl-C handler.
    pub fn cancel_flag(&self) -> Arc<std::sync::atomic::AtomicBool> {
        Arc::clone(&self.ctx.cancel_requested)
    }
}

/// Close one stage's input once per worker, wait for the queue to drain, then join the workers.
/// With a drain timeout, one deadline covers the closes and the join.
fn stop_stage<T>(group: StageGroup<T>, drain_timeout: Option<Duration>) -> Result<StageReport> {
    let StageGroup {
        name,
        input,
        workers,
    } = group;
    let deadline = drain_timeout.and_then(|t| Instant::now().checked_add(t).map(|d| (t, d)));
    match deadline {
        Some((timeout, deadline)) => {
            let stalled = |e: QueueError<T>| match e {
                QueueError::JoinTimeout { unfinished, .. } => PipelineError::Stalled {
                    stage: name.clone(),
                    waited: timeout,
                    unfinished,
                },
                _ => PipelineError::Stalled {
                    stage: name.clone(),
                    waited: timeout,
                    unfinished: input.unfinished(),
                },
            };
            for _ in &workers {
                input
                    .close_timeout(deadline.saturating_duration_since(Instant::now()))
                    .map_err(stalled)?;
            }
            input
                .join_timeout(deadline.saturating_duration_since(Instant::now()))
                .map_err(stalled)?;
        }
        None => {
            for _ in &workers {
                input.close();
            }
            input.join();
        }
    }

    let worker_count = workers.len();
    let mut totals = WorkerStats::default();
    for (worker, h) in workers.into_iter().enumerate() {
        let stats = h.join().map_err(|_| PipelineError::WorkerPanicked {
            stage: name.clone(),
            worker,
        })?;
        totals.merge(&stats);
    }
    debug!(
        "stage '{}' drained: {} received, {} processed, {} failed, {} discarded",
        name, totals.received, totals.processed, totals.failed, totals.discarded
    );
    Ok(StageReport {
        name,
        workers: worker_count,
        received: totals.received,
        processed: totals.processed,
        failed: totals.failed,
        discarded: totals.discarded,
    })
}

/// After a stage failed to stop, shut down the stages behind it and close the output queue on a
/// background thread, so their workers and any output consumer still finish. The failed stage's
/// own threads are left detached.
fn release_downstream<T: Send + 'static>(groups: Vec<StageGroup<T>>, output: &Arc<ClosableQueue<T>>) {
    let output = Arc::clone(output);
    let spawned = thread::Builder::new()
        .name("teardown".to_string())
        .spawn(move || {
            for group in groups {
                for _ in &group.workers {
                    group.input.close();
                }
                for h in group.workers {
                    if h.join().is_err() {
                        warn!("worker of stage '{}' panicked during teardown", group.name);
                    }
                }
                debug!("stage '{}' released after upstream stall", group.name);
            }
            output.close();
        });
    if let Err(e) = spawned {
        warn!("could not spawn teardown thread: {}", e);
    }
}

/// Shut the pipeline down stage by stage, then close the output queue once.
///
/// Stage *i+1*'s input is only closed after every stage *i* worker has exited, which in turn only
/// happens after stage *i*'s input drained. In strict mode the first failure is returned after the
/// drain completes. If a stage stalls past the drain timeout, later stages and the output queue
/// are still closed in the background; the stalled stage's threads are left running.
pub fn shutdown_pipeline<T: Send + 'static>(handles: PipelineHandles<T>) -> Result<PipelineReport> {
    let PipelineHandles {
        output,
        stages,
        mut ctx,
        drain_timeout,
        started,
        fed,
        ..
    } = handles;

    let mut reports = Vec::with_capacity(stages.len());
    let mut groups = stages.into_iter();
    while let Some(group) = groups.next() {
        match stop_stage(group, drain_timeout) {
            Ok(report) => reports.push(report),
            Err(e) => {
                release_downstream(groups.collect(), &output);
                return Err(e);
            }
        }
    }
    output.close();
    // Last sender outside the (now exited) workers; lets an event consumer finish.
    drop(ctx.events.take());

    check_for_first_error_or_skipped_items(&ctx)?;

    let outputs = reports.last().map(|r| r.processed).unwrap_or(0);
    Ok(PipelineReport {
        stages: reports,
        fed,
        outputs,
        failures: ctx.failures_snapshot(),
        cancelled: ctx.is_cancelled(),
        halted: ctx.is_halted(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

/// Drain the output queue on its own thread so a bounded final queue never stalls the last stage.
pub fn spawn_collector<T: Send + 'static>(
    output: &Arc<ClosableQueue<T>>,
) -> Result<JoinHandle<Vec<T>>> {
    let output = Arc::clone(output);
    thread::Builder::new()
        .name("collector".to_string())
        .spawn(move || output.iter().collect::<Vec<T>>())
        .context("spawn collector thread")
}

/// Main orchestrator: feed `items` through `stages` and collect every output.
/// Start workers → feed head queue → close/drain stage by stage → join collector.
pub fn run_pipeline<T, I>(items: I, stages: Vec<Stage<T>>, opts: &PipelineOpts) -> Result<PipelineRun<T>>
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
{
    let mut handles = start_pipeline(stages, opts)?;
    let collector = match spawn_collector(&handles.output) {
        Ok(c) => c,
        Err(e) => {
            abort_started_groups(&handles.stages);
            return Err(e);
        }
    };

    let fed = handles.feed(items);
    debug!("fed {} item(s); closing head queue", fed);

    let report = shutdown_pipeline(handles)?;
    let outputs = collector
        .join()
        .map_err(|_| anyhow::anyhow!("collector thread panicked"))?;
    debug!(
        "collected {} output(s) in {} ms",
        outputs.len(),
        report.elapsed_ms
    );
    Ok(PipelineRun { outputs, report })
}
