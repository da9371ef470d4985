//! Per-chunk cache of spawnable columns.
//!
//! World notifications only mark chunks dirty; work is queued by `query`
//! (closest chunks first) and drained one chunk at a time by `process_one`.
//! Queries keep serving the previous columns of a dirty chunk until its
//! recompute lands.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use hashbrown::{HashMap, HashSet};
use overlay_geom::DimensionId;
use overlay_regions::SpawnColumn;

use crate::rule::ColumnSampler;
use crate::{CHUNK_SIZE, COLUMNS_PER_CHUNK, ChunkPos, MAX_QUERY_RADIUS, column_index};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub dirty: usize,
    pub pending: usize,
    pub recomputed: u64,
}

/// Columns of one chunk; a slot stays `None` until its column could be sampled.
#[derive(Clone, Debug)]
pub struct ChunkEntry {
    pos: ChunkPos,
    columns: Vec<Option<SpawnColumn>>,
}

impl ChunkEntry {
    fn build(pos: ChunkPos, sampler: &dyn ColumnSampler) -> Self {
        let mut entry = Self {
            pos,
            columns: vec![None; COLUMNS_PER_CHUNK],
        };
        entry.fill(sampler, true);
        entry
    }

    fn recomputed(&self, sampler: &dyn ColumnSampler, all: bool) -> Self {
        let mut entry = self.clone();
        entry.fill(sampler, all);
        entry
    }

    fn fill(&mut self, sampler: &dyn ColumnSampler, all: bool) {
        let (x0, z0) = (self.pos.start_x(), self.pos.start_z());
        for dz in 0..CHUNK_SIZE {
            for dx in 0..CHUNK_SIZE {
                let (x, z) = (x0 + dx, z0 + dz);
                let slot = &mut self.columns[column_index(x, z)];
                if !all && slot.is_some() {
                    continue;
                }
                // an unsampleable column keeps whatever it had
                if let Some(ys) = sampler.sample(x, z) {
                    *slot = Some(SpawnColumn::new(x, z, ys));
                }
            }
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Column at world coordinates `(x, z)`, which must lie in this chunk.
    pub fn column(&self, x: i32, z: i32) -> Option<&SpawnColumn> {
        debug_assert_eq!(ChunkPos::from_block(x, z), self.pos);
        self.columns[column_index(x, z)].as_ref()
    }

    pub fn columns(&self) -> impl Iterator<Item = &SpawnColumn> {
        self.columns.iter().flatten()
    }

    pub fn populated(&self) -> usize {
        self.columns.iter().filter(|c| c.is_some()).count()
    }
}

struct Slot {
    entry: Arc<ChunkEntry>,
    /// Every column is recomputed on the next pass, not only missing ones.
    invalid: bool,
}

struct InFlight {
    pos: ChunkPos,
    cancelled: bool,
}

#[derive(Default)]
struct CacheState {
    dimension: Option<DimensionId>,
    entries: HashMap<i64, Slot>,
    dirty: HashSet<ChunkPos>,
    pending: VecDeque<ChunkPos>,
    queued: HashSet<ChunkPos>,
    in_flight: Option<InFlight>,
}

impl CacheState {
    fn enqueue(&mut self, pos: ChunkPos) {
        if self.queued.insert(pos) {
            self.pending.push_back(pos);
        }
    }

    fn pop_pending(&mut self) -> Option<ChunkPos> {
        let pos = self.pending.pop_front()?;
        self.queued.remove(&pos);
        Some(pos)
    }

    fn remove(&mut self, pos: ChunkPos) {
        self.entries.remove(&pos.pack());
        self.dirty.remove(&pos);
        if self.queued.remove(&pos) {
            self.pending.retain(|p| *p != pos);
        }
        if let Some(f) = self.in_flight.as_mut().filter(|f| f.pos == pos) {
            f.cancelled = true;
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.dirty.clear();
        self.pending.clear();
        self.queued.clear();
        if let Some(f) = self.in_flight.as_mut() {
            f.cancelled = true;
        }
    }
}

pub struct SpatialChunkCache {
    sampler: Arc<dyn ColumnSampler>,
    state: Mutex<CacheState>,
    recompute_gate: Mutex<()>,
    recomputed: AtomicU64,
}

impl SpatialChunkCache {
    pub fn new(sampler: Arc<dyn ColumnSampler>) -> Self {
        Self {
            sampler,
            state: Mutex::new(CacheState::default()),
            recompute_gate: Mutex::new(()),
            recomputed: AtomicU64::new(0),
        }
    }

    /// Cached columns of every chunk within Chebyshev `radius` of the viewer.
    /// `radius` is clamped to [`MAX_QUERY_RADIUS`].
    ///
    /// Absent chunks contribute nothing; dirty chunks contribute their stale
    /// columns. Both are queued for recompute, closest first.
    pub fn query(
        &self,
        dimension: &DimensionId,
        viewer_cx: i32,
        viewer_cz: i32,
        radius: u32,
    ) -> Vec<SpawnColumn> {
        let viewer = ChunkPos::new(viewer_cx, viewer_cz);
        let r = radius.min(MAX_QUERY_RADIUS) as i32;
        let mut out = Vec::new();
        let mut staged = Vec::new();

        let mut guard = lock(&self.state);
        let state = &mut *guard;
        if state.dimension.as_ref() != Some(dimension) {
            if let Some(previous) = &state.dimension {
                log::debug!("spawnable cache switching {} -> {}", previous, dimension);
            }
            state.clear();
            state.dimension = Some(dimension.clone());
        }

        for cx in viewer.x.saturating_sub(r)..=viewer.x.saturating_add(r) {
            for cz in viewer.z.saturating_sub(r)..=viewer.z.saturating_add(r) {
                let pos = ChunkPos::new(cx, cz);
                let Some(slot) = state.entries.get_mut(&pos.pack()) else {
                    if !state.queued.contains(&pos) {
                        staged.push(pos);
                    }
                    continue;
                };
                if state.dirty.remove(&pos) {
                    slot.invalid = true;
                    if !state.queued.contains(&pos) {
                        staged.push(pos);
                    }
                }
                out.extend(slot.entry.columns().cloned());
            }
        }

        if !staged.is_empty() {
            staged.sort_unstable_by_key(|p| p.chebyshev(viewer));
            for pos in staged {
                state.enqueue(pos);
            }
        }
        out
    }

    /// Recomputes the front of the queue. Returns whether a chunk was taken.
    ///
    /// Only one recompute runs at a time; a concurrent call returns `false`.
    pub fn process_one(&self) -> bool {
        let _gate = match self.recompute_gate.try_lock() {
            Ok(g) => g,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };

        let (pos, previous) = {
            let mut state = lock(&self.state);
            let Some(pos) = state.pop_pending() else {
                return false;
            };
            let previous = state
                .entries
                .get(&pos.pack())
                .map(|s| (s.entry.clone(), s.invalid));
            state.in_flight = Some(InFlight {
                pos,
                cancelled: false,
            });
            (pos, previous)
        };

        let sampler = &*self.sampler;
        let entry = match previous {
            Some((entry, invalid)) => entry.recomputed(sampler, invalid),
            None => ChunkEntry::build(pos, sampler),
        };

        let mut state = lock(&self.state);
        let cancelled = state.in_flight.take().is_none_or(|f| f.cancelled);
        if cancelled {
            log::debug!("dropped recompute of chunk ({}, {})", pos.x, pos.z);
            return true;
        }
        // queued again while we worked: a newer mark must not be lost
        let invalid = state.queued.contains(&pos);
        state.entries.insert(
            pos.pack(),
            Slot {
                entry: Arc::new(entry),
                invalid,
            },
        );
        self.recomputed.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Marks every cached chunk dirty without dropping its columns.
    pub fn recompute_all(&self) {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        for key in state.entries.keys() {
            state.dirty.insert(ChunkPos::from_packed(*key));
        }
    }

    pub fn chunk_loaded(&self, cx: i32, cz: i32) {
        lock(&self.state).dirty.insert(ChunkPos::new(cx, cz));
    }

    pub fn lighting_changed(&self, cx: i32, cz: i32) {
        lock(&self.state).dirty.insert(ChunkPos::new(cx, cz));
    }

    /// A block at world `(x, z)` changed; its chunk and the eight around it go dirty.
    pub fn block_changed(&self, x: i32, z: i32) {
        let center = ChunkPos::from_block(x, z);
        let mut state = lock(&self.state);
        for dx in -1..=1 {
            for dz in -1..=1 {
                state.dirty.insert(ChunkPos::new(center.x + dx, center.z + dz));
            }
        }
    }

    pub fn chunk_unloaded(&self, cx: i32, cz: i32) {
        lock(&self.state).remove(ChunkPos::new(cx, cz));
    }

    pub fn world_reset(&self) {
        let mut state = lock(&self.state);
        state.clear();
        state.dimension = None;
    }

    /// Drops cached columns and queued work but keeps dirty marks.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.entries.clear();
        state.pending.clear();
        state.queued.clear();
        if let Some(f) = state.in_flight.as_mut() {
            f.cancelled = true;
        }
    }

    pub fn pending_recompute_count(&self) -> usize {
        lock(&self.state).pending.len()
    }

    pub fn pending_order(&self) -> Vec<ChunkPos> {
        lock(&self.state).pending.iter().copied().collect()
    }

    pub fn dirty_chunks(&self) -> Vec<ChunkPos> {
        let mut dirty: Vec<_> = lock(&self.state).dirty.iter().copied().collect();
        dirty.sort_unstable();
        dirty
    }

    pub fn entry(&self, cx: i32, cz: i32) -> Option<Arc<ChunkEntry>> {
        lock(&self.state)
            .entries
            .get(&ChunkPos::new(cx, cz).pack())
            .map(|s| s.entry.clone())
    }

    pub fn stats(&self) -> CacheStats {
        let state = lock(&self.state);
        CacheStats {
            entries: state.entries.len(),
            dirty: state.dirty.len(),
            pending: state.pending.len(),
            recomputed: self.recomputed.load(Ordering::Relaxed),
        }
    }
}
