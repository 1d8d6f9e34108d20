//! CLI side: argument parsing, the photo demo stages, progress display and run handling.

pub mod arg_parser;
pub mod cli;
pub mod demo;
pub mod progress;

pub use arg_parser::Cli;
pub use cli::{apply_cli_to_opts, handle_run, print_report, setup_opts};
pub use demo::{Photo, demo_stages, download, raw_photo, resize, resolve_stage_workers, upload};
pub use progress::{is_settled, spawn_progress};
