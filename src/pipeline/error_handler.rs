//! End-of-run failure policy: surface the strict-mode error or report skipped items.

use anyhow::Result;

use super::context::PipelineContext;

/// Check the run's outcome: if strict and a first failure was recorded, return it; otherwise log
/// how many items were skipped. Call after every worker has been joined.
pub fn check_for_first_error_or_skipped_items(ctx: &PipelineContext) -> Result<()> {
    if ctx.strict
        && let Some(err) = ctx.take_first_error()
    {
        return Err(err.into());
    }
    let failures = ctx.failures_snapshot();
    if !failures.is_empty() && !ctx.strict {
        log::warn!(
            "Skipped {} item(s) due to transform failures",
            failures.len()
        );
        for f in &failures {
            log::debug!("  skipped in {}-{}: {}", f.stage, f.worker, f.reason);
        }
    }
    Ok(())
}
