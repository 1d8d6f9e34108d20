//! queuepipe: bounded, closable FIFO queues and a staged worker-thread pipeline.
//!
//! Each stage is a group of threads reading one [`ClosableQueue`] and writing the next. Shutdown
//! follows a close-and-drain protocol: close a stage's input once per worker, wait for the queue to
//! drain, join the workers, then move on to the next stage.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::{PipelineError, QueueError};
pub use pipeline::{PipelineHandles, Stage, shutdown_pipeline, start_pipeline};
pub use queue::{ClosableQueue, Message, QueueIter};
pub use types::*;

use log::debug;

/// Result alias used by public queuepipe API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: run `items` through `stages` and return every output plus a report.
///
/// Each stage gets its own input queue of `opts.capacity`; the last stage's output is drained by a
/// collector thread. With `opts.strict` the first transform failure halts the pipeline and is
/// returned as [`PipelineError::TransformFailed`] once everything has drained; otherwise failed
/// items are skipped and listed in [`PipelineReport::failures`].
///
/// ```
/// use queuepipe::{PipelineOpts, Stage, run_pipeline};
///
/// let stages = vec![
///     Stage::new("add", 2, |x: u32| x + 1),
///     Stage::new("double", 2, |x: u32| x * 2),
/// ];
/// let opts = PipelineOpts { capacity: 4, ..Default::default() };
/// let run = run_pipeline(0..10, stages, &opts)?;
/// let mut out = run.outputs;
/// out.sort();
/// assert_eq!(out, (1..=10).map(|x| x * 2).collect::<Vec<_>>());
/// # Ok::<(), queuepipe::Error>(())
/// ```
pub fn run_pipeline<T, I>(items: I, stages: Vec<Stage<T>>, opts: &PipelineOpts) -> Result<PipelineRun<T>>
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
{
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    pipeline::run_pipeline(items, stages, opts)
}
