use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use overlay_geom::{DimensionId, Point};
use overlay_regions::{Category, Region, RegionShape, RegionSource};

use crate::ChunkPos;
use crate::cache::SpatialChunkCache;

/// Serves cached spawnable columns around the viewer as regions.
pub struct SpawnableSource {
    cache: Arc<SpatialChunkCache>,
    enabled: AtomicBool,
    render_distance: AtomicU32,
    viewer_cx: AtomicI32,
    viewer_cz: AtomicI32,
}

impl SpawnableSource {
    pub fn new(cache: Arc<SpatialChunkCache>, render_distance: u32) -> Self {
        Self {
            cache,
            enabled: AtomicBool::new(true),
            render_distance: AtomicU32::new(render_distance),
            viewer_cx: AtomicI32::new(0),
            viewer_cz: AtomicI32::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<SpatialChunkCache> {
        &self.cache
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_render_distance(&self, chunks: u32) {
        self.render_distance.store(chunks, Ordering::Relaxed);
    }

    pub fn set_viewer(&self, position: Point) {
        let c = position.floor();
        let chunk = ChunkPos::from_block(c.x, c.z);
        self.viewer_cx.store(chunk.x, Ordering::Relaxed);
        self.viewer_cz.store(chunk.z, Ordering::Relaxed);
    }

    /// Per-tick maintenance: recompute at most one chunk while the overlay is shown.
    pub fn tick(&self) -> bool {
        self.is_enabled() && self.cache.process_one()
    }
}

impl RegionSource for SpawnableSource {
    fn name(&self) -> &str {
        "spawnable_blocks"
    }

    fn can_provide(&self, _dimension: &DimensionId) -> bool {
        self.is_enabled()
    }

    fn get(&self, dimension: &DimensionId) -> Vec<Region> {
        let columns = self.cache.query(
            dimension,
            self.viewer_cx.load(Ordering::Relaxed),
            self.viewer_cz.load(Ordering::Relaxed),
            self.render_distance.load(Ordering::Relaxed),
        );
        columns
            .into_iter()
            .filter(|c| !c.ys.is_empty())
            .map(|c| Region::new(Category::SpawnableBlocks, RegionShape::Column(c)))
            .collect()
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}
