use std::time::Instant;

use overlay_geom::{Coords, DimensionId};
use overlay_regions::RenderTarget;

use crate::build::{BuildJob, TargetSlot, render_deferred, run_build};
use crate::scheduler::BuildScheduler;
use crate::{DrawSink, ViewTransform};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LastDrawn {
    Nothing,
    Async(usize),
    Default,
}

/// Per-frame entry point: picks async or synchronous building, draws the
/// result and handles the overlay being hidden.
pub struct FrameDriver {
    scheduler: BuildScheduler,
    default_target: RenderTarget,
    active: bool,
    was_active: bool,
    async_mode: bool,
    cleanup_pending: bool,
    last_build_nanos: u64,
    last_drawn: LastDrawn,
}

impl FrameDriver {
    pub fn new(scheduler: BuildScheduler, async_mode: bool) -> Self {
        Self {
            scheduler,
            default_target: RenderTarget::new(),
            active: true,
            was_active: false,
            async_mode,
            cleanup_pending: false,
            last_build_nanos: 0,
            last_drawn: LastDrawn::Nothing,
        }
    }

    pub fn per_frame(
        &mut self,
        view: &ViewTransform,
        dimension: &DimensionId,
        sink: &mut dyn DrawSink,
    ) {
        let origin = view.camera.floor();
        if !self.active {
            self.frame_inactive(dimension, origin);
            return;
        }
        self.was_active = true;
        self.cleanup_pending = false;

        let started = Instant::now();
        if self.async_mode {
            self.frame_async(view, dimension, origin, sink);
        } else {
            self.scheduler.discard();
            self.build_default(dimension, origin);
            self.draw_default(view, sink);
            self.last_drawn = LastDrawn::Default;
        }
        self.last_build_nanos = started.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64;
    }

    fn frame_inactive(&mut self, dimension: &DimensionId, origin: Coords) {
        if self.was_active {
            self.was_active = false;
            self.scheduler.discard();
            self.default_target.hard_reset();
            self.last_drawn = LastDrawn::Nothing;
            self.cleanup_pending = true;
            log::info!(target: "overlay", "overlay hidden; releasing buffers");
        }
        self.scheduler.tick(dimension, false, origin);
        // a worker may still be writing into an async target
        if self.cleanup_pending && self.scheduler.release_targets() {
            self.scheduler.context().sources.clear_caches();
            self.cleanup_pending = false;
        }
    }

    fn frame_async(
        &mut self,
        view: &ViewTransform,
        dimension: &DimensionId,
        origin: Coords,
        sink: &mut dyn DrawSink,
    ) {
        let switching = self.scheduler.is_pending()
            && self
                .scheduler
                .last_dimension()
                .is_some_and(|d| d != dimension);
        let ready = self.scheduler.tick(dimension, true, origin);

        if switching {
            log::debug!("build for the previous dimension dropped; drawing synchronously");
            self.build_default(dimension, origin);
            self.draw_default(view, sink);
            self.last_drawn = LastDrawn::Default;
            return;
        }

        match ready {
            Some(index) => {
                self.scheduler.draw_target(index, view, sink);
                // deferred items can change every frame, so they are rebuilt every frame
                render_deferred(
                    self.scheduler.context(),
                    &mut self.default_target,
                    origin,
                    self.scheduler.deferred(),
                );
                self.draw_default(view, sink);
                self.last_drawn = LastDrawn::Async(index);
            }
            None => self.last_drawn = LastDrawn::Nothing,
        }
    }

    fn build_default(&mut self, dimension: &DimensionId, origin: Coords) {
        let job = BuildJob {
            dimension: dimension.clone(),
            target: TargetSlot::Default,
            run_sync_inline: true,
            origin,
        };
        if let Err(e) = run_build(self.scheduler.context(), &mut self.default_target, &job) {
            log::error!("synchronous overlay build failed: {}", e);
        }
    }

    fn draw_default(&self, view: &ViewTransform, sink: &mut dyn DrawSink) {
        if let Some(geometry) = self.default_target.geometry() {
            sink.draw(view, geometry);
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_async(&mut self, enabled: bool) {
        if self.async_mode && !enabled {
            self.scheduler.discard();
        }
        self.async_mode = enabled;
    }

    pub fn is_async(&self) -> bool {
        self.async_mode
    }

    pub fn scheduler(&self) -> &BuildScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut BuildScheduler {
        &mut self.scheduler
    }

    pub fn default_target(&self) -> &RenderTarget {
        &self.default_target
    }

    /// Wall time of the last active frame's build and draw work.
    pub fn last_build_duration_nanos(&self) -> u64 {
        self.last_build_nanos
    }

    pub fn status_strings(&self) -> Vec<String> {
        match self.last_drawn {
            LastDrawn::Nothing => vec!["Preparing rendering...".to_string()],
            LastDrawn::Async(index) => vec![
                format!("Async: {}", self.scheduler.target_debug_string(index)),
                format!("Sync: {}", self.default_target.debug_string()),
            ],
            LastDrawn::Default => vec![self.default_target.debug_string()],
        }
    }
}
