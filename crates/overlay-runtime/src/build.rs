use std::fmt;
use std::sync::Arc;

use overlay_geom::{Coords, DimensionId};
use overlay_regions::{CapabilityTable, Region, RenderError, RenderTarget, SourceSet};

/// Everything a build pass reads; cheap to clone into the worker.
#[derive(Clone)]
pub struct BuildContext {
    pub sources: SourceSet,
    pub capabilities: Arc<CapabilityTable>,
}

impl BuildContext {
    pub fn new(sources: SourceSet, capabilities: CapabilityTable) -> Self {
        Self {
            sources,
            capabilities: Arc::new(capabilities),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetSlot {
    Async(usize),
    Default,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildJob {
    pub dimension: DimensionId,
    pub target: TargetSlot,
    /// Render synchronous halves immediately instead of deferring them.
    pub run_sync_inline: bool,
    /// Block position geometry is translated against.
    pub origin: Coords,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    Render { category: String, source: RenderError },
    Panicked(String),
    WorkerGone,
    Spawn(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Render { category, source } => {
                write!(f, "rendering {} failed: {}", category, source)
            }
            BuildError::Panicked(msg) => write!(f, "build panicked: {}", msg),
            BuildError::WorkerGone => write!(f, "build worker exited without a result"),
            BuildError::Spawn(msg) => write!(f, "could not start build worker: {}", msg),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Render { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One full pass over the current regions into `target`.
///
/// Returns the regions whose synchronous half still has to run on the
/// frame thread (always empty with `run_sync_inline`).
pub fn run_build(
    ctx: &BuildContext,
    target: &mut RenderTarget,
    job: &BuildJob,
) -> Result<Vec<Region>, BuildError> {
    log::trace!("building {:?} for {} at {:?}", job.target, job.dimension, job.origin);
    target.reset(job.origin);
    target.begin_batch();
    let result = render_regions(ctx, target, job);
    target.end_batch();
    result
}

fn render_regions(
    ctx: &BuildContext,
    target: &mut RenderTarget,
    job: &BuildJob,
) -> Result<Vec<Region>, BuildError> {
    let mut deferred = Vec::new();
    for region in ctx.sources.collect(&job.dimension) {
        // unregistered categories are skipped
        let Some(cap) = ctx.capabilities.get(&region.category) else {
            continue;
        };
        let failed = |source| BuildError::Render {
            category: region.category.to_string(),
            source,
        };
        cap.render(target, &region).map_err(failed)?;
        if region.needs_sync && cap.has_sync() {
            if job.run_sync_inline {
                cap.render_sync(target, &region).map_err(failed)?;
            } else {
                deferred.push(region);
            }
        }
    }
    Ok(deferred)
}

/// Rebuilds the synchronous halves of `deferred` into `target`.
///
/// Failures are logged and skipped; the frame still draws what succeeded.
pub fn render_deferred(
    ctx: &BuildContext,
    target: &mut RenderTarget,
    origin: Coords,
    deferred: &[Region],
) {
    target.reset(origin);
    target.begin_batch();
    for region in deferred {
        let Some(cap) = ctx.capabilities.get(&region.category) else {
            continue;
        };
        if let Err(e) = cap.render_sync(target, region) {
            log::warn!("sync render of {} failed: {}", region.category, e);
        }
    }
    target.end_batch();
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_geom::Bounds;
    use overlay_regions::custom::WorldSpawnMarker;
    use overlay_regions::shapes::{ShapeStyle, SharedHeight, default_capabilities};
    use overlay_regions::{Capability, Category, TargetState};

    fn context(fail_spawn: bool) -> (BuildContext, Arc<WorldSpawnMarker>) {
        let marker = Arc::new(WorldSpawnMarker::new());
        let dim = DimensionId::new("overworld");
        marker.set(dim, Bounds::new(Coords::new(0, 0, 0), Coords::new(3, 0, 3)));
        let mut sources = SourceSet::new();
        sources.push(marker.clone());
        let mut caps = default_capabilities(ShapeStyle::default(), SharedHeight::new(64));
        if fail_spawn {
            caps.register(
                Category::WorldSpawn,
                Capability::new(|_, _| Err(RenderError::Failed("boom".into()))),
            );
        }
        (BuildContext::new(sources, caps), marker)
    }

    fn job(inline: bool) -> BuildJob {
        BuildJob {
            dimension: DimensionId::new("overworld"),
            target: TargetSlot::Default,
            run_sync_inline: inline,
            origin: Coords::new(0, 64, 0),
        }
    }

    #[test]
    fn deferred_regions_are_returned_not_drawn() {
        let (ctx, _marker) = context(false);
        let mut target = RenderTarget::new();
        let deferred = run_build(&ctx, &mut target, &job(false)).unwrap();
        assert_eq!(deferred.len(), 1);
        assert_eq!(target.state(), TargetState::Built);
        assert_eq!(target.primitive_count(), 0);

        let mut sync = RenderTarget::new();
        render_deferred(&ctx, &mut sync, Coords::new(0, 64, 0), &deferred);
        assert_eq!(sync.geometry().map(|g| g.lines.len()), Some(4));
    }

    #[test]
    fn inline_builds_render_sync_halves() {
        let (ctx, _marker) = context(false);
        let mut target = RenderTarget::new();
        assert!(run_build(&ctx, &mut target, &job(true)).unwrap().is_empty());
        assert_eq!(target.primitive_count(), 4);
    }

    #[test]
    fn render_errors_fail_the_build_but_close_the_batch() {
        let (ctx, _marker) = context(true);
        let mut target = RenderTarget::new();
        let err = run_build(&ctx, &mut target, &job(false)).unwrap_err();
        assert!(matches!(err, BuildError::Render { .. }));
        assert_eq!(err.to_string(), "rendering world_spawn failed: render failed: boom");
        assert_ne!(target.state(), TargetState::Building);
    }
}
