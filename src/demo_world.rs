//! Noise height field standing in for a live world.

use std::sync::{Mutex, PoisonError};

use fastnoise_lite::{FastNoiseLite, NoiseType};
use hashbrown::HashSet;
use overlay_spawn::{BlockSample, CHUNK_SIZE, WorldView};

const TORCH: BlockSample = BlockSample {
    spawn_surface: false,
    obstructs: false,
    block_light: 14,
};

pub struct DemoWorld {
    terrain: FastNoiseLite,
    base_height: i32,
    amplitude: f32,
    /// Columns farther than this many chunks from the origin are unloaded.
    loaded_chunks: i32,
    torches: Mutex<HashSet<(i32, i32)>>,
}

impl DemoWorld {
    pub fn new(seed: i32, loaded_chunks: i32) -> Self {
        let mut terrain = FastNoiseLite::with_seed(seed);
        terrain.set_noise_type(Some(NoiseType::OpenSimplex2));
        terrain.set_frequency(Some(0.02));
        Self {
            terrain,
            base_height: 64,
            amplitude: 12.0,
            loaded_chunks,
            torches: Mutex::new(HashSet::new()),
        }
    }

    fn is_loaded(&self, x: i32, z: i32) -> bool {
        let limit = self.loaded_chunks * CHUNK_SIZE;
        x.abs() < limit && z.abs() < limit
    }

    fn height(&self, x: i32, z: i32) -> i32 {
        let n = self.terrain.get_noise_2d(x as f32, z as f32);
        self.base_height + (n * self.amplitude).round() as i32
    }

    /// Places or removes a torch on top of column `(x, z)`; returns whether it is now lit.
    pub fn toggle_torch(&self, x: i32, z: i32) -> bool {
        let mut torches = self.torches.lock().unwrap_or_else(PoisonError::into_inner);
        if torches.remove(&(x, z)) {
            false
        } else {
            torches.insert((x, z));
            true
        }
    }
}

impl WorldView for DemoWorld {
    fn bottom_y(&self) -> i32 {
        self.base_height - 16
    }

    fn surface_height(&self, x: i32, z: i32) -> Option<i32> {
        self.is_loaded(x, z).then(|| self.height(x, z))
    }

    fn block(&self, x: i32, y: i32, z: i32) -> BlockSample {
        let h = self.height(x, z);
        if y <= h {
            return BlockSample::SOLID;
        }
        let lit = y == h + 1
            && self
                .torches
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&(x, z));
        if lit { TORCH } else { BlockSample::AIR }
    }
}
