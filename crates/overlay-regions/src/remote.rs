//! Structure outlines pushed by a server over the structures channel.
//!
//! Records arrive already decoded from the host's wire format; this module
//! validates the handshake, turns records into outlines and keeps them per
//! dimension.

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use hashbrown::{HashMap, HashSet};
use overlay_geom::{Bounds, DimensionId};

use crate::custom::lock;
use crate::notice::{Notice, Notices};
use crate::{Category, Region, RegionShape, RegionSource};

pub const PROTOCOL_VERSION: i32 = 1;
pub const DEFAULT_CHANNEL: &str = "servux:structures";
/// Padding applied to structures that adapt the surrounding terrain.
pub const TERRAIN_ADAPT_MARGIN: i32 = 12;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructureRecord {
    pub id: String,
    /// Piece bounds as `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    pub children: Vec<Vec<i32>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructureMessage {
    Metadata {
        version: i32,
        channel: String,
        timeout: i32,
    },
    StructureData(Vec<StructureRecord>),
    Unknown(i32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StructureInfo {
    pub adapts_terrain: bool,
}

/// Looks up structure definitions by id in the host's registries.
pub trait StructureResolver: Send + Sync {
    fn resolve(&self, id: &str) -> Option<StructureInfo>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    NotRegistered,
    NoWorld,
    UnknownMessage(i32),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::NotRegistered => write!(f, "structure data received before registration"),
            FeedError::NoWorld => write!(f, "structure data received outside of a world"),
            FeedError::UnknownMessage(id) => write!(f, "unknown structure message id {}", id),
        }
    }
}

impl std::error::Error for FeedError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteStructure {
    pub category: Category,
    pub outer: Bounds,
    pub pieces: Vec<Bounds>,
}

pub struct RemoteStructures {
    channel: String,
    registered: AtomicBool,
    timeout: AtomicI32,
    resolver: Arc<dyn StructureResolver>,
    notices: Notices,
    resolve_failures: Mutex<HashSet<String>>,
    by_dim: Mutex<HashMap<DimensionId, HashMap<(Category, Bounds), RemoteStructure>>>,
}

impl RemoteStructures {
    pub fn new(resolver: Arc<dyn StructureResolver>, notices: Notices) -> Self {
        Self::with_channel(DEFAULT_CHANNEL, resolver, notices)
    }

    pub fn with_channel(
        channel: &str,
        resolver: Arc<dyn StructureResolver>,
        notices: Notices,
    ) -> Self {
        Self {
            channel: channel.to_string(),
            registered: AtomicBool::new(false),
            timeout: AtomicI32::new(i32::MAX),
            resolver,
            notices,
            resolve_failures: Mutex::new(HashSet::new()),
            by_dim: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub fn timeout(&self) -> i32 {
        self.timeout.load(Ordering::Relaxed)
    }

    /// Forgets the handshake and the set of already-reported failures.
    pub fn mark_unregistered(&self) {
        self.registered.store(false, Ordering::Release);
        lock(&self.resolve_failures).clear();
    }

    /// Applies one message; returns how many structures were stored.
    pub fn handle(
        &self,
        message: StructureMessage,
        world: Option<&DimensionId>,
    ) -> Result<usize, FeedError> {
        match message {
            StructureMessage::Metadata {
                version,
                channel,
                timeout,
            } => {
                let ok = version == PROTOCOL_VERSION && channel == self.channel;
                self.registered.store(ok, Ordering::Release);
                if ok {
                    self.timeout.store(timeout, Ordering::Relaxed);
                    log::info!("structure channel {} registered (timeout {})", channel, timeout);
                } else {
                    log::warn!(
                        "structure channel handshake rejected: version={} channel={}",
                        version,
                        channel
                    );
                }
                Ok(0)
            }
            StructureMessage::StructureData(records) => {
                if !self.is_registered() {
                    return Err(FeedError::NotRegistered);
                }
                let dim = world.ok_or(FeedError::NoWorld)?;
                let parsed: Vec<RemoteStructure> =
                    records.iter().filter_map(|r| self.parse_record(r)).collect();
                let added = parsed.len();
                let mut by_dim = lock(&self.by_dim);
                let slot = by_dim.entry(dim.clone()).or_default();
                for s in parsed {
                    slot.insert((s.category.clone(), s.outer), s);
                }
                log::debug!("stored {} remote structures for {}", added, dim);
                Ok(added)
            }
            StructureMessage::Unknown(id) => Err(FeedError::UnknownMessage(id)),
        }
    }

    fn parse_record(&self, record: &StructureRecord) -> Option<RemoteStructure> {
        let info = self.resolver.resolve(&record.id);
        if info.is_none() {
            if lock(&self.resolve_failures).insert(record.id.clone()) {
                self.notices.push(Notice::warning(
                    "Structure resolve failure",
                    format!("could not resolve structure {}", record.id),
                ));
            }
            log::warn!(
                "failed to resolve structure {}; outer box may be inaccurate",
                record.id
            );
        }

        let pieces: Vec<Bounds> = record
            .children
            .iter()
            .map(|fields| Bounds::from_int_array(fields))
            .collect();
        let (first, rest) = pieces.split_first()?;
        let mut outer = *first;
        for piece in rest {
            outer.encompass(piece);
        }
        if info.is_some_and(|i| i.adapts_terrain) {
            outer = outer.expanded(TERRAIN_ADAPT_MARGIN);
        }
        Some(RemoteStructure {
            category: Category::structure(&record.id),
            outer,
            pieces,
        })
    }

    pub fn structure_count(&self, dim: &DimensionId) -> usize {
        lock(&self.by_dim).get(dim).map(|m| m.len()).unwrap_or(0)
    }
}

impl RegionSource for RemoteStructures {
    fn name(&self) -> &str {
        "remote_structures"
    }

    fn get(&self, dimension: &DimensionId) -> Vec<Region> {
        let by_dim = lock(&self.by_dim);
        let Some(structures) = by_dim.get(dimension) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for s in structures.values() {
            out.push(Region::new(s.category.clone(), RegionShape::Cuboid(s.outer)));
            for piece in &s.pieces {
                out.push(Region::new(s.category.clone(), RegionShape::Cuboid(*piece)));
            }
        }
        out
    }

    fn clear_cache(&self) {
        lock(&self.by_dim).clear();
    }
}
