//! Application configuration constants.
//! Defaults and limits in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    env_filename: &'static str,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                env_filename: ".env",
            }
        })
    }

    /// Config file looked up in the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    pub fn env_filename(&self) -> &str {
        self.env_filename
    }
}

// ---- Worker threads ----

/// Caps on per-stage fan-out.
/// Use [`WorkerThreadLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available hardware threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Stage workers mostly wait on I/O, so allow this many per hardware thread.
    pub per_thread: usize,
    /// Hard ceiling per stage regardless of core count.
    pub stage_max: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            per_thread: Self::IO_WORKERS_PER_THREAD,
            stage_max: Self::STAGE_MAX_WORKERS,
        }
    }
}

impl WorkerThreadLimits {
    pub const IO_WORKERS_PER_THREAD: usize = 4;
    pub const STAGE_MAX_WORKERS: usize = 256;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Largest worker count a single stage may use.
    pub fn max_per_stage(&self) -> usize {
        (self.all_threads.max(1) * self.per_thread).min(self.stage_max)
    }

    /// Clamp a requested worker count into `1..=max_per_stage()`.
    pub fn clamp(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_per_stage())
    }
}

// ---- Demo pipeline defaults ----

/// Items fed through the demo pipeline when nothing else is configured.
pub const DEFAULT_ITEM_COUNT: usize = 1000;

/// Queue depth limit for the demo pipeline.
pub const DEFAULT_CAPACITY: usize = 64;

/// Fan-out for download, resize, upload.
pub const DEFAULT_STAGE_WORKERS: [usize; 3] = [3, 4, 5];

/// Names of the demo stages, in pipeline order.
pub const DEMO_STAGE_NAMES: [&str; 3] = ["download", "resize", "upload"];

/// Longest edge of a resized photo, in pixels.
pub const RESIZE_MAX_EDGE: u32 = 1024;

// ---- Progress ----

/// Progress bar batching.
pub struct ProgressConsts;

impl ProgressConsts {
    /// Outputs counted before the bar is touched (reduce lock contention).
    pub const UPDATE_BATCH_SIZE: usize = 25;
}
