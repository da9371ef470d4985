//! Regions of interest, the sources that supply them, and the targets they render into.
#![forbid(unsafe_code)]

pub mod capability;
pub mod custom;
pub mod notice;
pub mod remote;
pub mod shapes;
pub mod target;

use std::fmt;
use std::sync::Arc;

use overlay_geom::{Bounds, DimensionId, Point};

pub use capability::{Capability, CapabilityTable, RenderError};
pub use notice::{Notice, NoticeLevel, Notices};
pub use target::{Geometry, LineSeg, Quad, RenderTarget, TargetState};

/// Overlay category; the capability table is keyed by it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Custom,
    SpawnableBlocks,
    WorldSpawn,
    Structure(Arc<str>),
}

impl Category {
    pub fn structure(id: &str) -> Self {
        Category::Structure(Arc::from(id))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Custom => f.write_str("custom"),
            Category::SpawnableBlocks => f.write_str("spawnable_blocks"),
            Category::WorldSpawn => f.write_str("world_spawn"),
            Category::Structure(id) => write!(f, "structure:{}", id),
        }
    }
}

/// Spawnable y levels of one block column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnColumn {
    pub x: i32,
    pub z: i32,
    pub ys: Arc<[i32]>,
}

impl SpawnColumn {
    pub fn new(x: i32, z: i32, ys: Vec<i32>) -> Self {
        Self {
            x,
            z,
            ys: ys.into(),
        }
    }

    pub fn empty(x: i32, z: i32) -> Self {
        Self::new(x, z, Vec::new())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RegionShape {
    Cuboid(Bounds),
    Line { from: Point, to: Point },
    Sphere { center: Point, radius: f64 },
    Column(SpawnColumn),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub category: Category,
    pub shape: RegionShape,
    /// Part of this region depends on frame-thread state and must be
    /// finalized there.
    pub needs_sync: bool,
}

impl Region {
    pub fn new(category: Category, shape: RegionShape) -> Self {
        Self {
            category,
            shape,
            needs_sync: false,
        }
    }

    pub fn with_sync(mut self) -> Self {
        self.needs_sync = true;
        self
    }
}

/// One provider of regions, usually one per overlay category.
///
/// `get` may be called from the background build worker.
pub trait RegionSource: Send + Sync {
    fn name(&self) -> &str;

    fn can_provide(&self, _dimension: &DimensionId) -> bool {
        true
    }

    fn get(&self, dimension: &DimensionId) -> Vec<Region>;

    /// Drops cached state; called once the overlay is torn down.
    fn clear_cache(&self) {}
}

#[derive(Clone, Default)]
pub struct SourceSet {
    sources: Vec<Arc<dyn RegionSource>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: Arc<dyn RegionSource>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Current regions of every source able to serve `dimension`, in source order.
    pub fn collect(&self, dimension: &DimensionId) -> Vec<Region> {
        let mut out = Vec::new();
        for source in &self.sources {
            if source.can_provide(dimension) {
                out.extend(source.get(dimension));
            }
        }
        out
    }

    pub fn clear_caches(&self) {
        for source in &self.sources {
            log::debug!("clearing region source cache: {}", source.name());
            source.clear_cache();
        }
    }
}
