pub mod config;
pub mod logger;
pub mod queuepipe_toml;

pub use config::*;
pub use logger::{Colors, setup_logging};
pub use queuepipe_toml::{QueuepipeToml, apply_file_to_opts, load_queuepipe_toml};
