use std::sync::Arc;

/// What the spawnability rule needs to know about one block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockSample {
    /// A mob can stand on top of this block.
    pub spawn_surface: bool,
    /// The block occupies the space a mob would spawn in.
    pub obstructs: bool,
    pub block_light: u8,
}

impl BlockSample {
    pub const AIR: BlockSample = BlockSample {
        spawn_surface: false,
        obstructs: false,
        block_light: 0,
    };

    pub const SOLID: BlockSample = BlockSample {
        spawn_surface: true,
        obstructs: true,
        block_light: 0,
    };
}

/// Read access to the loaded world, implemented by the host.
pub trait WorldView: Send + Sync {
    fn bottom_y(&self) -> i32;

    /// Highest non-air block of the column, or `None` if its chunk is not loaded.
    fn surface_height(&self, x: i32, z: i32) -> Option<i32>;

    fn block(&self, x: i32, y: i32, z: i32) -> BlockSample;
}

/// Produces the spawnable y levels of one world column.
pub trait ColumnSampler: Send + Sync {
    /// `None` when the column cannot be sampled yet; the slot stays missing.
    fn sample(&self, x: i32, z: i32) -> Option<Vec<i32>>;
}

/// A y level is spawnable when the block below is a spawn surface and the
/// block at y neither obstructs nor is lit above `max_block_light`.
pub struct SpawnRule<W: ?Sized> {
    world: Arc<W>,
    max_block_light: u8,
}

impl<W: WorldView + ?Sized> SpawnRule<W> {
    pub fn new(world: Arc<W>, max_block_light: u8) -> Self {
        Self {
            world,
            max_block_light,
        }
    }

    pub fn max_block_light(&self) -> u8 {
        self.max_block_light
    }

    #[inline]
    pub fn is_spawnable(&self, below: BlockSample, at: BlockSample) -> bool {
        below.spawn_surface && !at.obstructs && at.block_light <= self.max_block_light
    }
}

impl<W: WorldView + ?Sized> ColumnSampler for SpawnRule<W> {
    fn sample(&self, x: i32, z: i32) -> Option<Vec<i32>> {
        let top = self.world.surface_height(x, z)?;
        let bottom = self.world.bottom_y();
        let mut ys = Vec::new();
        let mut above = self.world.block(x, bottom, z);
        for y in bottom + 1..=top + 1 {
            let below = above;
            above = self.world.block(x, y, z);
            if self.is_spawnable(below, above) {
                ys.push(y);
            }
        }
        Some(ys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stone up to `ground`, a torch at `torch`, air above.
    struct Pillar {
        ground: i32,
        torch: Option<i32>,
    }

    impl WorldView for Pillar {
        fn bottom_y(&self) -> i32 {
            0
        }

        fn surface_height(&self, x: i32, _z: i32) -> Option<i32> {
            (x >= 0).then_some(self.ground)
        }

        fn block(&self, _x: i32, y: i32, _z: i32) -> BlockSample {
            if Some(y) == self.torch {
                BlockSample {
                    spawn_surface: false,
                    obstructs: false,
                    block_light: 14,
                }
            } else if y <= self.ground {
                BlockSample::SOLID
            } else {
                BlockSample::AIR
            }
        }
    }

    #[test]
    fn only_the_surface_is_spawnable_in_a_solid_column() {
        let rule = SpawnRule::new(Arc::new(Pillar { ground: 5, torch: None }), 0);
        assert_eq!(rule.sample(0, 0), Some(vec![6]));
    }

    #[test]
    fn lit_blocks_are_excluded() {
        let world = Arc::new(Pillar {
            ground: 5,
            torch: Some(6),
        });
        assert_eq!(SpawnRule::new(world.clone(), 0).sample(3, 3), Some(vec![]));
        assert_eq!(SpawnRule::new(world, 15).sample(3, 3), Some(vec![6]));
    }

    #[test]
    fn unloaded_columns_are_not_sampled() {
        let rule = SpawnRule::new(Arc::new(Pillar { ground: 5, torch: None }), 0);
        assert_eq!(rule.sample(-1, 0), None);
    }
}
