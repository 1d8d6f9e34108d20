//! CLI command handler: build opts (file, then flags), run the demo pipeline, report.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::atomic::Ordering;

use crate::engine::arg_parser::Cli;
use crate::engine::demo::{demo_stages, raw_photo};
use crate::engine::progress::spawn_progress;
use crate::pipeline::{shutdown_pipeline, spawn_collector, start_pipeline};
use crate::utils::{Colors, apply_file_to_opts, load_queuepipe_toml, setup_logging};
use crate::{Opts, PipelineOpts, PipelineReport};

/// Overwrite opts with every flag given on the command line.
pub fn apply_cli_to_opts(cli: &Cli, opts: &mut Opts) {
    if let Some(n) = cli.items {
        opts.items = n;
    }
    if let Some(c) = cli.capacity {
        opts.capacity = c;
    }
    if !cli.workers.is_empty() {
        opts.workers = cli.workers.clone();
    }
    if let Some(d) = cli.delay_ms {
        opts.delay_ms = d;
    }
    if let Some(n) = cli.fail_every {
        opts.fail_every = (n > 0).then_some(n);
    }
    if let Some(s) = cli.strict {
        opts.strict = s;
    }
    if let Some(t) = cli.drain_timeout {
        opts.drain_timeout_secs = Some(t);
    }
    if let Some(j) = cli.json {
        opts.json = j;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
}

/// Defaults, then config file, then flags. Sets up logging once verbosity is known.
pub fn setup_opts(cli: &Cli) -> Result<Opts> {
    let mut opts = Opts::default();
    let config_path = cli.config_path();
    let file = load_queuepipe_toml(&config_path)?;
    if let Some(ref file) = file {
        apply_file_to_opts(file, &mut opts);
    }
    apply_cli_to_opts(cli, &mut opts);
    setup_logging(opts.verbose, Path::new("."));
    if file.is_some() {
        debug!("loaded {}", config_path.display());
    }
    debug!("{} CONFIG:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), opts);
    Ok(opts)
}

/// Run the demo pipeline with `cli` settings and print the report.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli)?;
    let stages = demo_stages(&opts);
    let last_stage = stages.len() - 1;

    let mut handles = start_pipeline(stages, &PipelineOpts::from(&opts))?;
    let cancel_requested = handles.cancel_flag();
    ctrlc::set_handler(move || {
        cancel_requested.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let progress = handles
        .events
        .take()
        .map(|events| spawn_progress(events, opts.items, last_stage));
    let collector = spawn_collector(&handles.output)?;

    handles.feed((0..opts.items).map(raw_photo));
    let report = shutdown_pipeline(handles);

    // A stalled stage keeps its workers (and their event senders) alive; don't wait on the bar then.
    if let (Some(p), true) = (progress, report.is_ok()) {
        let _ = p.join();
    }
    let report = report?;
    let photos = collector
        .join()
        .map_err(|_| anyhow::anyhow!("collector thread panicked"))?;
    debug!(
        "{} photo(s) published, first: {:?}",
        photos.len(),
        photos.first().and_then(|p| p.url.as_deref())
    );

    if report.cancelled {
        warn!("Cancelled by user after feeding {} item(s)", report.fed);
    }
    print_report(&report, opts.json)?;
    Ok(())
}

/// Print the run report: JSON, or a colored per-stage summary.
pub fn print_report(report: &PipelineReport, json: bool) -> Result<()> {
    if json {
        let s = serde_json::to_string_pretty(report).context("serialize report")?;
        println!("{}", s);
        return Ok(());
    }
    info!(
        "{} of {} item(s) made it through {} stage(s) ({} workers) in {} ms",
        report.outputs,
        report.fed,
        report.stages.len(),
        report.total_workers(),
        report.elapsed_ms
    );
    for s in &report.stages {
        println!(
            "  {:<10} x{:<3} {} | {} | {}",
            s.name,
            s.workers,
            Colors::colorize(Colors::OK, &format!("processed: {}", s.processed)),
            Colors::colorize(Colors::FAILED, &format!("failed: {}", s.failed)),
            Colors::colorize(Colors::DISCARDED, &format!("discarded: {}", s.discarded)),
        );
    }
    Ok(())
}
