use clap::Parser;
use std::path::PathBuf;

use crate::utils::config::PackagePaths;

/// Bounded queue pipeline demo: download -> resize -> upload.
#[derive(Clone, Debug, Default, Parser)]
#[command(name = "queuepipe")]
#[command(about = "Run synthetic photos through a download -> resize -> upload queue pipeline.")]
pub struct Cli {
    /// Number of photos to feed. Default: 1000.
    #[arg(long, short = 'n')]
    pub items: Option<usize>,

    /// Depth limit of every queue between stages (0 = unbounded). Default: 64.
    #[arg(long, short = 'c')]
    pub capacity: Option<usize>,

    /// Workers per stage as DOWNLOAD,RESIZE,UPLOAD (missing entries keep defaults 3,4,5).
    #[arg(long, short = 'w', value_delimiter = ',', num_args = 1..)]
    pub workers: Vec<usize>,

    /// Simulated I/O latency of download and upload, in milliseconds.
    #[arg(long, short = 'd')]
    pub delay_ms: Option<u64>,

    /// Reject every Nth upload to exercise failure handling (0 = never).
    #[arg(long)]
    pub fail_every: Option<usize>,

    /// Strict mode: halt the pipeline on the first failed item instead of skipping it.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub strict: Option<bool>,

    /// Give up if a stage does not drain within this many seconds.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub drain_timeout: Option<u64>,

    /// Print the run report as JSON.
    #[arg(long, short = 'j', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,

    /// Verbose output (debug logs and progress bar).
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Config file. Default: `.queuepipe.toml` in the current directory.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Get the config path, defaulting to the package config filename in the working directory.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(PackagePaths::get().config_filename()))
    }
}
