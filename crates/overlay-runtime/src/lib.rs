//! Double-buffered background building of overlay geometry and the per-frame driver.
#![forbid(unsafe_code)]

mod build;
mod clock;
mod driver;
mod scheduler;

use std::sync::{Mutex, MutexGuard, PoisonError};

use overlay_geom::Point;
use overlay_regions::Geometry;

pub use build::{BuildContext, BuildError, BuildJob, TargetSlot, render_deferred, run_build};
pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::FrameDriver;
pub use scheduler::{BuildScheduler, DEFAULT_BUILD_COOLDOWN_MS, SchedulerSettings};

/// Camera placement for the frame being drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewTransform {
    pub camera: Point,
}

impl ViewTransform {
    pub fn new(camera: Point) -> Self {
        Self { camera }
    }
}

/// Consumer of finished geometry. Coordinates in `geometry` are relative to
/// `geometry.origin`; the sink translates by `origin - camera`.
pub trait DrawSink {
    fn draw(&mut self, view: &ViewTransform, geometry: Geometry<'_>);
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
