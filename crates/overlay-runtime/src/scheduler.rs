use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError, bounded};
use overlay_geom::{Coords, DimensionId};
use overlay_regions::{Notice, Notices, Region, RenderTarget};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::build::{BuildContext, BuildError, BuildJob, TargetSlot, run_build};
use crate::clock::Clock;
use crate::{DrawSink, ViewTransform, lock};

pub const DEFAULT_BUILD_COOLDOWN_MS: u64 = 2000;
const ASYNC_TARGETS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Minimum time between two build launches.
    pub cooldown_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_BUILD_COOLDOWN_MS,
        }
    }
}

type Outcome = Result<Vec<Region>, BuildError>;

struct PendingBuild {
    target: usize,
    rx: Receiver<Outcome>,
    /// Outcome taken off the channel early by `wait_for_pending`.
    received: Option<Outcome>,
}

/// Frame-thread state of the async pipeline.
#[derive(Default)]
struct AsyncBuildState {
    ready_index: Option<usize>,
    pending: Option<PendingBuild>,
    discard_pending: bool,
    last_build_start: Option<u64>,
    last_dimension: Option<DimensionId>,
    /// Regions of the ready build whose synchronous half runs every frame.
    deferred: Vec<Region>,
    launches: u64,
}

struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Builds overlay geometry on one background worker into a pair of targets
/// used in strict rotation.
///
/// All state is owned by the frame thread; the worker only reports back
/// through a one-shot channel polled from [`BuildScheduler::tick`].
pub struct BuildScheduler {
    ctx: BuildContext,
    pool: ThreadPool,
    targets: [Arc<Mutex<RenderTarget>>; ASYNC_TARGETS],
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    in_flight: Arc<AtomicUsize>,
    notices: Notices,
    state: AsyncBuildState,
}

impl BuildScheduler {
    pub fn new(
        ctx: BuildContext,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
        notices: Notices,
    ) -> Result<Self, BuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(1)
            .thread_name(|i| format!("overlay-build-{i}"))
            .build()
            .map_err(|e| BuildError::Spawn(e.to_string()))?;
        Ok(Self {
            ctx,
            pool,
            targets: [
                Arc::new(Mutex::new(RenderTarget::new())),
                Arc::new(Mutex::new(RenderTarget::new())),
            ],
            clock,
            settings,
            in_flight: Arc::new(AtomicUsize::new(0)),
            notices,
            state: AsyncBuildState::default(),
        })
    }

    /// Advances the pipeline by one frame and returns the target safe to draw.
    pub fn tick(
        &mut self,
        dimension: &DimensionId,
        viewer_active: bool,
        origin: Coords,
    ) -> Option<usize> {
        if !viewer_active {
            self.discard();
            self.poll();
            return None;
        }
        if self.state.last_dimension.as_ref() != Some(dimension) {
            if let Some(previous) = self.state.last_dimension.replace(dimension.clone()) {
                log::info!(
                    target: "overlay",
                    "dimension changed {} -> {}; dropping async buffers",
                    previous,
                    dimension
                );
                self.discard();
            }
        }
        self.poll();
        if self.state.pending.is_none() && self.cooldown_elapsed() {
            self.launch(dimension, origin);
        }
        self.state.ready_index
    }

    /// Drops the ready buffer and marks any outstanding build for discard.
    /// Returns whether a build was outstanding.
    pub fn discard(&mut self) -> bool {
        self.state.ready_index = None;
        self.state.deferred.clear();
        let outstanding = self.state.pending.is_some();
        if outstanding && !self.state.discard_pending {
            log::debug!("outstanding overlay build will be discarded");
            self.state.discard_pending = true;
        }
        outstanding
    }

    fn cooldown_elapsed(&self) -> bool {
        let now = self.clock.now_ms();
        self.state
            .last_build_start
            .is_none_or(|start| now.saturating_sub(start) >= self.settings.cooldown_ms)
    }

    fn poll(&mut self) {
        let Some(pending) = self.state.pending.as_mut() else {
            return;
        };
        let outcome = match pending.received.take() {
            Some(outcome) => outcome,
            None => match pending.rx.try_recv() {
                Ok(outcome) => outcome,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => Err(BuildError::WorkerGone),
            },
        };
        let target = pending.target;
        self.state.pending = None;
        self.complete(target, outcome);
    }

    fn complete(&mut self, target: usize, outcome: Outcome) {
        let discard = std::mem::take(&mut self.state.discard_pending);
        match outcome {
            Ok(deferred) if !discard => {
                log::debug!("overlay build into target {} ready", target);
                self.state.ready_index = Some(target);
                self.state.deferred = deferred;
            }
            Ok(_) => log::debug!("dropped finished overlay build in target {}", target),
            Err(e) => {
                log::error!("overlay build into target {} failed: {}", target, e);
                self.notices.push(Notice::error(
                    "Overlay build failed",
                    format!("{e}; check the log and re-enable the overlay"),
                ));
                self.state.ready_index = None;
                self.state.deferred.clear();
            }
        }
    }

    fn launch(&mut self, dimension: &DimensionId, origin: Coords) {
        let index = self.state.ready_index.map_or(0, |i| (i + 1) % ASYNC_TARGETS);
        let job = BuildJob {
            dimension: dimension.clone(),
            target: TargetSlot::Async(index),
            run_sync_inline: false,
            origin,
        };
        let (tx, rx) = bounded(1);
        let target = Arc::clone(&self.targets[index]);
        let ctx = self.ctx.clone();
        let guard = InFlightGuard::enter(&self.in_flight);

        self.state.last_build_start = Some(self.clock.now_ms());
        self.state.launches += 1;
        self.state.pending = Some(PendingBuild {
            target: index,
            rx,
            received: None,
        });
        log::debug!("launching overlay build #{} into target {}", self.state.launches, index);

        self.pool.spawn(move || {
            let _guard = guard;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut target = lock(&target);
                run_build(&ctx, &mut target, &job)
            }))
            .unwrap_or_else(|payload| Err(BuildError::Panicked(panic_message(payload.as_ref()))));
            let _ = tx.send(outcome);
        });
    }

    /// Blocks until the outstanding build reports back or `timeout` passes.
    /// The outcome is applied on the next `tick`.
    pub fn wait_for_pending(&mut self, timeout: Duration) -> bool {
        let Some(pending) = self.state.pending.as_mut() else {
            return true;
        };
        if pending.received.is_some() {
            return true;
        }
        match pending.rx.recv_timeout(timeout) {
            Ok(outcome) => {
                pending.received = Some(outcome);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                pending.received = Some(Err(BuildError::WorkerGone));
                true
            }
        }
    }

    /// Draws async target `index` if it holds a finished build.
    ///
    /// Never waits on the worker: a target it is writing is simply skipped.
    pub fn draw_target(&self, index: usize, view: &ViewTransform, sink: &mut dyn DrawSink) -> bool {
        let Some(slot) = self.targets.get(index) else {
            return false;
        };
        let target = match slot.try_lock() {
            Ok(t) => t,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        match target.geometry() {
            Some(geometry) => {
                sink.draw(view, geometry);
                true
            }
            None => false,
        }
    }

    /// Frees both async targets, but only once no build is running.
    pub fn release_targets(&self) -> bool {
        if self.in_flight() != 0 {
            return false;
        }
        for target in &self.targets {
            lock(target).hard_reset();
        }
        log::debug!("released async overlay targets");
        true
    }

    pub fn target_debug_string(&self, index: usize) -> String {
        match self.targets.get(index).map(|t| t.try_lock()) {
            Some(Ok(t)) => t.debug_string(),
            Some(Err(TryLockError::Poisoned(p))) => p.into_inner().debug_string(),
            Some(Err(TryLockError::WouldBlock)) => "building".to_string(),
            None => "none".to_string(),
        }
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn deferred(&self) -> &[Region] {
        &self.state.deferred
    }

    pub fn ready_index(&self) -> Option<usize> {
        self.state.ready_index
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending.is_some()
    }

    pub fn pending_target(&self) -> Option<usize> {
        self.state.pending.as_ref().map(|p| p.target)
    }

    pub fn last_dimension(&self) -> Option<&DimensionId> {
        self.state.last_dimension.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Number of builds launched so far.
    pub fn launches(&self) -> u64 {
        self.state.launches
    }
}
