//! queuepipe CLI: run the download -> resize -> upload demo pipeline.

use anyhow::Result;
use clap::Parser;
use queuepipe::engine::arg_parser::Cli;
use queuepipe::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
