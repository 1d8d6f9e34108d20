//! Load `.queuepipe.toml` (CLI only). Lib callers pass [`PipelineOpts`](crate::PipelineOpts) directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::Opts;

#[derive(Debug, Default, Deserialize)]
pub struct QueuepipeToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    items: Option<usize>,
    capacity: Option<usize>,
    workers: Option<Vec<usize>>,
    delay_ms: Option<u64>,
    fail_every: Option<usize>,
    strict: Option<bool>,
    verbose: Option<bool>,
    json: Option<bool>,
    /// Seconds.
    drain_timeout: Option<u64>,
}

/// Load the config file at `path`. Missing file is `Ok(None)`; a file that does not parse is an error.
pub fn load_queuepipe_toml(path: &Path) -> Result<Option<QueuepipeToml>> {
    if !path.is_file() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let parsed = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(parsed))
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_opts(file: &QueuepipeToml, opts: &mut Opts) {
    let sec = &file.settings;
    apply_file_opt!(sec, opts, items => items);
    apply_file_opt!(sec, opts, capacity => capacity);
    if let Some(ref w) = sec.workers {
        opts.workers = w.clone();
    }
    apply_file_opt!(sec, opts, delay_ms => delay_ms);
    apply_file_opt!(sec, opts, strict => strict);
    apply_file_opt!(sec, opts, verbose => verbose);
    apply_file_opt!(sec, opts, json => json);
    // 0 in the file means "no injected failures".
    if let Some(n) = sec.fail_every {
        opts.fail_every = (n > 0).then_some(n);
    }
    if let Some(secs) = sec.drain_timeout {
        opts.drain_timeout_secs = Some(secs);
    }
}
