//! User-placed regions and the world spawn marker.

use std::sync::{Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use overlay_geom::{Bounds, Coords, DimensionId, Point};

use crate::{Category, Region, RegionShape, RegionSource};

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum CustomKey {
    Cuboid(Bounds),
    Line([u64; 3], [u64; 3]),
    Sphere([u64; 3]),
}

/// Boxes, lines and spheres added by the user, kept per dimension.
///
/// Adding the same shape twice replaces it; spheres are identified by their
/// center alone.
#[derive(Default)]
pub struct CustomRegions {
    by_dim: Mutex<HashMap<DimensionId, HashMap<CustomKey, Region>>>,
}

impl CustomRegions {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, dim: &DimensionId, key: CustomKey, shape: RegionShape) {
        let mut by_dim = lock(&self.by_dim);
        by_dim
            .entry(dim.clone())
            .or_default()
            .insert(key, Region::new(Category::Custom, shape));
    }

    fn remove(&self, dim: &DimensionId, key: &CustomKey) -> bool {
        let mut by_dim = lock(&self.by_dim);
        by_dim
            .get_mut(dim)
            .map(|m| m.remove(key).is_some())
            .unwrap_or(false)
    }

    pub fn add_box(&self, dim: &DimensionId, a: Coords, b: Coords) {
        let bounds = Bounds::new(a, b);
        self.insert(dim, CustomKey::Cuboid(bounds), RegionShape::Cuboid(bounds));
    }

    pub fn remove_box(&self, dim: &DimensionId, a: Coords, b: Coords) -> bool {
        self.remove(dim, &CustomKey::Cuboid(Bounds::new(a, b)))
    }

    pub fn add_line(&self, dim: &DimensionId, from: Point, to: Point) {
        let key = CustomKey::Line(from.to_bits(), to.to_bits());
        self.insert(dim, key, RegionShape::Line { from, to });
    }

    pub fn remove_line(&self, dim: &DimensionId, from: Point, to: Point) -> bool {
        self.remove(dim, &CustomKey::Line(from.to_bits(), to.to_bits()))
    }

    pub fn add_sphere(&self, dim: &DimensionId, center: Point, radius: f64) {
        let key = CustomKey::Sphere(center.to_bits());
        self.insert(dim, key, RegionShape::Sphere { center, radius });
    }

    pub fn remove_sphere(&self, dim: &DimensionId, center: Point) -> bool {
        self.remove(dim, &CustomKey::Sphere(center.to_bits()))
    }

    pub fn len(&self, dim: &DimensionId) -> usize {
        lock(&self.by_dim).get(dim).map(|m| m.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        for regions in lock(&self.by_dim).values_mut() {
            regions.clear();
        }
    }
}

impl RegionSource for CustomRegions {
    fn name(&self) -> &str {
        "custom"
    }

    fn get(&self, dimension: &DimensionId) -> Vec<Region> {
        lock(&self.by_dim)
            .get(dimension)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    fn clear_cache(&self) {
        self.clear();
    }
}

/// The world spawn area of the current world, if known.
#[derive(Default)]
pub struct WorldSpawnMarker {
    spawn: Mutex<Option<(DimensionId, Bounds)>>,
}

impl WorldSpawnMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, dim: DimensionId, bounds: Bounds) {
        *lock(&self.spawn) = Some((dim, bounds));
    }

    pub fn clear(&self) {
        *lock(&self.spawn) = None;
    }
}

impl RegionSource for WorldSpawnMarker {
    fn name(&self) -> &str {
        "world_spawn"
    }

    fn can_provide(&self, dimension: &DimensionId) -> bool {
        matches!(&*lock(&self.spawn), Some((d, _)) if d == dimension)
    }

    fn get(&self, dimension: &DimensionId) -> Vec<Region> {
        match &*lock(&self.spawn) {
            Some((d, bounds)) if d == dimension => {
                vec![Region::new(Category::WorldSpawn, RegionShape::Cuboid(*bounds)).with_sync()]
            }
            _ => Vec::new(),
        }
    }

    fn clear_cache(&self) {
        self.clear();
    }
}
