use colored::{Color, Colorize};
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;
use std::path::Path;

use crate::utils::config::PackagePaths;

/// Load `.env` from `dir` (if any) so `RUST_LOG` can live there, then install the logger.
/// Safe to call more than once; later calls keep the first logger.
pub fn setup_logging(verbose: bool, dir: &Path) {
    let env_path = dir.join(PackagePaths::get().env_filename());
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
    }

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level) // Our crate: use requested level
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            // Stage workers are named `<stage>-<index>`; show which one is talking.
            let thread = std::thread::current()
                .name()
                .filter(|n| *n != "main")
                .map(|n| format!(" {}", n.dimmed()))
                .unwrap_or_default();
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        _ => "ERROR".red(),
                    };
                    format!(
                        "[{} {}{}] {}",
                        name.cyan(),
                        level_str,
                        thread,
                        record.args()
                    )
                }
                Level::Debug | Level::Trace => {
                    format!("[{}{}] {}", name.cyan(), thread, record.args().to_string().dimmed())
                }
                Level::Info => format!("[{}{}] {}", name.cyan(), thread, record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}

/// Colors for the run summary.
pub struct Colors;

impl Colors {
    pub const OK: Color = Color::Green;
    pub const FAILED: Color = Color::Red;
    pub const DISCARDED: Color = Color::Yellow;

    pub fn colorize(color: Color, text: &str) -> String {
        text.color(color).to_string()
    }
}
