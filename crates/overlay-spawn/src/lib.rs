//! Spawnable-block columns, cached per chunk and recomputed incrementally.
#![forbid(unsafe_code)]

pub mod cache;
pub mod rule;
pub mod source;

pub use cache::{CacheStats, ChunkEntry, SpatialChunkCache};
pub use rule::{BlockSample, ColumnSampler, SpawnRule, WorldView};
pub use source::SpawnableSource;

/// Chunk width in blocks.
pub const CHUNK_SIZE: i32 = 16;
pub const COLUMNS_PER_CHUNK: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;
/// Largest query radius in chunks; bigger requests are clamped.
pub const MAX_QUERY_RADIUS: u32 = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    #[inline]
    pub fn from_block(x: i32, z: i32) -> Self {
        Self::new(x >> 4, z >> 4)
    }

    /// `x` in the low 32 bits, `z` in the high 32 bits.
    #[inline]
    pub fn pack(self) -> i64 {
        ((self.x as u32 as u64) | ((self.z as u32 as u64) << 32)) as i64
    }

    #[inline]
    pub fn from_packed(packed: i64) -> Self {
        Self::new(packed as i32, (packed >> 32) as i32)
    }

    #[inline]
    pub fn chebyshev(self, other: ChunkPos) -> u32 {
        self.x.abs_diff(other.x).max(self.z.abs_diff(other.z))
    }

    #[inline]
    pub fn start_x(self) -> i32 {
        self.x * CHUNK_SIZE
    }

    #[inline]
    pub fn start_z(self) -> i32 {
        self.z * CHUNK_SIZE
    }
}

/// Slot of world column `(x, z)` inside its chunk.
#[inline]
pub fn column_index(x: i32, z: i32) -> usize {
    (((z & 15) << 4) | (x & 15)) as usize
}
