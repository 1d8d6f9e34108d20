use queuepipe::engine::{
    Cli, apply_cli_to_opts, demo_stages, download, is_settled, print_report, raw_photo, resize,
    resolve_stage_workers, upload,
};
use queuepipe::utils::config::{DEFAULT_STAGE_WORKERS, RESIZE_MAX_EDGE, WorkerThreadLimits};
use queuepipe::utils::{Colors, apply_file_to_opts, load_queuepipe_toml};
use queuepipe::{Opts, PipelineOpts, StageEvent, StageEventKind, run_pipeline};
use std::time::Duration;

// --- demo transforms ---

#[test]
fn test_download_fills_in_bytes() {
    let p = download(raw_photo(3), Duration::ZERO);
    assert_eq!(p.bytes, u64::from(p.width) * u64::from(p.height) * 3);
    assert!(p.url.is_none());
}

#[test]
fn test_resize_caps_longest_edge_and_keeps_aspect() {
    let p = resize(download(raw_photo(0), Duration::ZERO), RESIZE_MAX_EDGE);
    // raw_photo(0) is 3000x2000.
    assert_eq!((p.width, p.height), (1024, 682));
    assert_eq!(p.bytes, 1024 * 682 * 3);
}

#[test]
fn test_resize_leaves_small_photo_alone() {
    let mut small = raw_photo(1);
    small.width = 640;
    small.height = 480;
    assert_eq!(resize(small.clone(), RESIZE_MAX_EDGE), small);
}

#[test]
fn test_upload_sets_url() {
    let p = upload(raw_photo(9), Duration::ZERO, None).unwrap();
    assert_eq!(p.url.as_deref(), Some("https://gallery.invalid/photos/9.jpg"));
}

#[test]
fn test_upload_fail_every_rejects_nth() {
    assert!(upload(raw_photo(2), Duration::ZERO, Some(3)).is_err());
    assert!(upload(raw_photo(3), Duration::ZERO, Some(3)).is_ok());
    assert!(upload(raw_photo(2), Duration::ZERO, Some(0)).is_ok());
}

#[test]
fn test_demo_pipeline_end_to_end() {
    let opts = Opts {
        items: 40,
        workers: vec![2, 2, 2],
        fail_every: Some(10),
        ..Opts::default()
    };
    let run = run_pipeline(
        (0..opts.items).map(raw_photo),
        demo_stages(&opts),
        &PipelineOpts::from(&opts),
    )
    .unwrap();
    assert_eq!(run.outputs.len(), 36);
    assert_eq!(run.report.failures.len(), 4);
    for p in &run.outputs {
        assert!(p.width.max(p.height) <= RESIZE_MAX_EDGE);
        assert!(p.url.is_some());
    }
}

// --- worker resolution ---

#[test]
fn test_resolve_stage_workers_pads_with_defaults() {
    assert_eq!(resolve_stage_workers(&[]), DEFAULT_STAGE_WORKERS.to_vec());
    assert_eq!(
        resolve_stage_workers(&[1]),
        vec![1, DEFAULT_STAGE_WORKERS[1], DEFAULT_STAGE_WORKERS[2]]
    );
}

#[test]
fn test_resolve_stage_workers_clamps() {
    let max = WorkerThreadLimits::current().max_per_stage();
    assert_eq!(resolve_stage_workers(&[0, 2, usize::MAX]), vec![1, 2, max]);
}

#[test]
fn test_worker_limits_never_below_one() {
    let limits = WorkerThreadLimits::default();
    assert!(limits.max_per_stage() >= 1);
    assert_eq!(limits.clamp(0), 1);
}

// --- config file / CLI precedence ---

#[test]
fn test_missing_config_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(
        load_queuepipe_toml(&dir.path().join(".queuepipe.toml"))
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_broken_config_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".queuepipe.toml");
    std::fs::write(&path, "[settings\nitems = ").unwrap();
    assert!(load_queuepipe_toml(&path).is_err());
}

#[test]
fn test_cli_flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".queuepipe.toml");
    std::fs::write(
        &path,
        "[settings]\nitems = 50\ncapacity = 8\nworkers = [1, 1, 1]\nstrict = true\ndrain_timeout = 30\n",
    )
    .unwrap();

    let mut opts = Opts::default();
    let file = load_queuepipe_toml(&path).unwrap().unwrap();
    apply_file_to_opts(&file, &mut opts);
    assert_eq!(opts.items, 50);
    assert_eq!(opts.capacity, 8);
    assert_eq!(opts.workers, vec![1, 1, 1]);
    assert!(opts.strict);

    let cli = Cli {
        capacity: Some(2),
        strict: Some(false),
        workers: vec![4, 4],
        ..Cli::default()
    };
    apply_cli_to_opts(&cli, &mut opts);
    assert_eq!(opts.items, 50);
    assert_eq!(opts.capacity, 2);
    assert_eq!(opts.workers, vec![4, 4]);
    assert!(!opts.strict);

    let lib = PipelineOpts::from(&opts);
    assert_eq!(lib.capacity, 2);
    assert_eq!(lib.drain_timeout, Some(Duration::from_secs(30)));
    assert!(!lib.report_progress);
}

#[test]
fn test_cli_config_path_default() {
    let cli = Cli::default();
    assert_eq!(cli.config_path().to_str(), Some(".queuepipe.toml"));
}

// --- progress / report ---

#[test]
fn test_is_settled_counts_exits_only() {
    let ev = |stage, kind| StageEvent {
        stage,
        worker: 0,
        kind,
    };
    assert!(!is_settled(&ev(0, StageEventKind::Processed), 2));
    assert!(is_settled(&ev(2, StageEventKind::Processed), 2));
    assert!(is_settled(&ev(0, StageEventKind::Failed), 2));
    assert!(is_settled(&ev(1, StageEventKind::Discarded), 2));
}

#[test]
fn test_colorize_keeps_text() {
    let s = Colors::colorize(Colors::FAILED, "failed: 2");
    assert!(s.contains("failed: 2"));
}

#[test]
fn test_report_serializes_to_json() {
    let opts = Opts {
        items: 5,
        workers: vec![1, 1, 1],
        ..Opts::default()
    };
    let run = run_pipeline(
        (0..opts.items).map(raw_photo),
        demo_stages(&opts),
        &PipelineOpts::from(&opts),
    )
    .unwrap();
    let json = serde_json::to_value(&run.report).unwrap();
    assert_eq!(json["fed"], 5);
    assert_eq!(json["outputs"], 5);
    assert_eq!(json["stages"][2]["name"], "upload");
    assert!(print_report(&run.report, true).is_ok());
}
