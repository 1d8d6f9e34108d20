//! Progress bar driven by the pipeline's stage event stream

use crossbeam_channel::Receiver;
use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::types::{StageEvent, StageEventKind};
use crate::utils::config::ProgressConsts;

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a progress bar with a known total
pub fn create_progress_bar(total: usize, desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = total,
        desc = desc,
        animation = Animation::Classic,
        unit = " photos"
    )))
}

/// Update progress bar if available
/// Uses try_lock to avoid blocking if mutex is contended (non-blocking)
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Force the final count onto the bar, waiting for the lock this time.
fn finish_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut bar) = pb.lock() {
        if n > 0 {
            let _ = bar.update(n);
        }
        let _ = bar.refresh();
        eprintln!();
    }
}

/// Whether this event means an item has left the pipeline for good.
pub fn is_settled(event: &StageEvent, last_stage: usize) -> bool {
    match event.kind {
        StageEventKind::Processed => event.stage == last_stage,
        StageEventKind::Failed | StageEventKind::Discarded => true,
    }
}

/// Consume `events` on a background thread and advance a bar once per item that left the
/// pipeline (delivered by the last stage, failed, or discarded). The thread ends when the event
/// channel closes, i.e. after shutdown. Returns the number of settled items.
pub fn spawn_progress(
    events: Receiver<StageEvent>,
    total: usize,
    last_stage: usize,
) -> JoinHandle<usize> {
    let bar = create_progress_bar(total, "Processing");
    thread::spawn(move || {
        let mut settled = 0_usize;
        let mut unreported = 0_usize;
        while let Ok(event) = events.recv() {
            if !is_settled(&event, last_stage) {
                continue;
            }
            settled += 1;
            unreported += 1;
            if unreported >= ProgressConsts::UPDATE_BATCH_SIZE {
                update_progress_bar(&bar, unreported);
                unreported = 0;
            }
        }
        finish_progress_bar(&bar, unreported);
        settled
    })
}
