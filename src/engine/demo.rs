//! The photo pipeline the CLI runs: download -> resize -> upload over synthetic photos.

use anyhow::{Result, bail};
use log::debug;
use serde::Serialize;
use std::thread;
use std::time::Duration;

use crate::Opts;
use crate::pipeline::Stage;
use crate::utils::config::{
    DEFAULT_STAGE_WORKERS, DEMO_STAGE_NAMES, RESIZE_MAX_EDGE, WorkerThreadLimits,
};

/// Stand-in for an image moving through the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Photo {
    pub id: usize,
    pub width: u32,
    pub height: u32,
    /// Uncompressed RGB size; 0 until downloaded.
    pub bytes: u64,
    pub url: Option<String>,
}

/// What the camera hands over: an id and sensor dimensions, no data yet.
pub fn raw_photo(id: usize) -> Photo {
    Photo {
        id,
        width: 3000 + (id % 7) as u32 * 256,
        height: 2000 + (id % 5) as u32 * 128,
        bytes: 0,
        url: None,
    }
}

fn rgb_bytes(width: u32, height: u32) -> u64 {
    u64::from(width) * u64::from(height) * 3
}

fn simulate_io(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

pub fn download(mut photo: Photo, delay: Duration) -> Photo {
    simulate_io(delay);
    photo.bytes = rgb_bytes(photo.width, photo.height);
    photo
}

/// Scale so the longest edge is at most `max_edge`, keeping the aspect ratio. Smaller photos pass through.
pub fn resize(mut photo: Photo, max_edge: u32) -> Photo {
    let longest = photo.width.max(photo.height);
    if longest > max_edge {
        let scale = |v: u32| ((u64::from(v) * u64::from(max_edge)) / u64::from(longest)).max(1) as u32;
        photo.width = scale(photo.width);
        photo.height = scale(photo.height);
        photo.bytes = rgb_bytes(photo.width, photo.height);
    }
    photo
}

/// Publish the photo. With `fail_every = Some(n)` every nth photo (by id, 1-based) is rejected.
pub fn upload(mut photo: Photo, delay: Duration, fail_every: Option<usize>) -> Result<Photo> {
    simulate_io(delay);
    if let Some(n) = fail_every
        && n > 0
        && (photo.id + 1).is_multiple_of(n)
    {
        bail!("gallery rejected photo {}", photo.id);
    }
    photo.url = Some(format!("https://gallery.invalid/photos/{}.jpg", photo.id));
    Ok(photo)
}

/// Pad/trim requested fan-out to one entry per demo stage and clamp each into the allowed range.
pub fn resolve_stage_workers(requested: &[usize]) -> Vec<usize> {
    let limits = WorkerThreadLimits::current();
    DEFAULT_STAGE_WORKERS
        .iter()
        .enumerate()
        .map(|(i, default)| {
            let want = requested.get(i).copied().unwrap_or(*default);
            let got = limits.clamp(want);
            if got != want {
                log::warn!(
                    "{} workers for '{}' out of range, using {}",
                    want,
                    DEMO_STAGE_NAMES[i],
                    got
                );
            }
            got
        })
        .collect()
}

/// Build the three demo stages from `opts`.
pub fn demo_stages(opts: &Opts) -> Vec<Stage<Photo>> {
    let workers = resolve_stage_workers(&opts.workers);
    let delay = Duration::from_millis(opts.delay_ms);
    let fail_every = opts.fail_every;
    debug!(
        "demo stages: {:?} workers, {:?} latency, fail_every {:?}",
        workers, delay, fail_every
    );
    vec![
        Stage::new(DEMO_STAGE_NAMES[0], workers[0], move |p: Photo| download(p, delay)),
        Stage::new(DEMO_STAGE_NAMES[1], workers[1], |p: Photo| resize(p, RESIZE_MAX_EDGE)),
        Stage::fallible(DEMO_STAGE_NAMES[2], workers[2], move |p: Photo| {
            upload(p, delay, fail_every)
        }),
    ]
}
