use std::sync::Arc;

use overlay_geom::{Bounds, Coords, DimensionId};
use overlay_regions::remote::{
    DEFAULT_CHANNEL, FeedError, PROTOCOL_VERSION, RemoteStructures, StructureInfo,
    StructureMessage, StructureRecord, StructureResolver, TERRAIN_ADAPT_MARGIN,
};
use overlay_regions::{Category, Notices, RegionShape, RegionSource};

struct Known;

impl StructureResolver for Known {
    fn resolve(&self, id: &str) -> Option<StructureInfo> {
        match id {
            "village" => Some(StructureInfo {
                adapts_terrain: true,
            }),
            "fortress" => Some(StructureInfo::default()),
            _ => None,
        }
    }
}

fn registered_feed() -> (RemoteStructures, Notices) {
    let notices = Notices::new();
    let feed = RemoteStructures::new(Arc::new(Known), notices.clone());
    feed.handle(
        StructureMessage::Metadata {
            version: PROTOCOL_VERSION,
            channel: DEFAULT_CHANNEL.to_string(),
            timeout: 600,
        },
        None,
    )
    .expect("metadata");
    (feed, notices)
}

fn record(id: &str, children: Vec<Vec<i32>>) -> StructureRecord {
    StructureRecord {
        id: id.to_string(),
        children,
    }
}

#[test]
fn data_before_handshake_is_rejected() {
    let feed = RemoteStructures::new(Arc::new(Known), Notices::new());
    let dim = DimensionId::new("overworld");
    let res = feed.handle(
        StructureMessage::StructureData(vec![record("fortress", vec![vec![0, 0, 0, 1, 1, 1]])]),
        Some(&dim),
    );
    assert_eq!(res, Err(FeedError::NotRegistered));
    assert_eq!(feed.structure_count(&dim), 0);
}

#[test]
fn wrong_version_does_not_register() {
    let feed = RemoteStructures::new(Arc::new(Known), Notices::new());
    feed.handle(
        StructureMessage::Metadata {
            version: PROTOCOL_VERSION + 1,
            channel: DEFAULT_CHANNEL.to_string(),
            timeout: 1,
        },
        None,
    )
    .unwrap();
    assert!(!feed.is_registered());
    assert_eq!(feed.timeout(), i32::MAX);
}

#[test]
fn outer_box_is_union_of_pieces() {
    let (feed, notices) = registered_feed();
    assert_eq!(feed.timeout(), 600);
    let dim = DimensionId::new("nether");
    let added = feed
        .handle(
            StructureMessage::StructureData(vec![record(
                "fortress",
                vec![vec![0, 10, 0, 4, 12, 4], vec![-8, 5, 2, -2, 20, 3]],
            )]),
            Some(&dim),
        )
        .unwrap();
    assert_eq!(added, 1);
    assert!(notices.is_empty());

    let regions = feed.get(&dim);
    assert_eq!(regions.len(), 3);
    assert!(regions.iter().all(|r| r.category == Category::structure("fortress")));
    let expected = Bounds::new(Coords::new(-8, 5, 0), Coords::new(4, 20, 4));
    assert_eq!(regions[0].shape, RegionShape::Cuboid(expected));
}

#[test]
fn terrain_adapting_structures_are_padded() {
    let (feed, _) = registered_feed();
    let dim = DimensionId::new("overworld");
    feed.handle(
        StructureMessage::StructureData(vec![record("village", vec![vec![0, 0, 0, 1, 1, 1]])]),
        Some(&dim),
    )
    .unwrap();
    let regions = feed.get(&dim);
    let m = TERRAIN_ADAPT_MARGIN;
    assert_eq!(
        regions[0].shape,
        RegionShape::Cuboid(Bounds::new(Coords::new(-m, -m, -m), Coords::new(1 + m, 1 + m, 1 + m)))
    );
}

#[test]
fn malformed_piece_bounds_degrade_to_zero_extent() {
    let (feed, _) = registered_feed();
    let dim = DimensionId::new("overworld");
    let added = feed
        .handle(
            StructureMessage::StructureData(vec![record(
                "fortress",
                vec![vec![1, 2, 3], vec![5, 5, 5, 6, 6, 6]],
            )]),
            Some(&dim),
        )
        .unwrap();
    assert_eq!(added, 1);
    let regions = feed.get(&dim);
    assert!(regions.contains(&overlay_regions::Region::new(
        Category::structure("fortress"),
        RegionShape::Cuboid(Bounds::ZERO)
    )));
}

#[test]
fn unresolved_ids_are_reported_once() {
    let (feed, notices) = registered_feed();
    let dim = DimensionId::new("overworld");
    for _ in 0..3 {
        feed.handle(
            StructureMessage::StructureData(vec![
                record("mystery", vec![vec![0, 0, 0, 2, 2, 2]]),
                record("mystery", vec![vec![9, 9, 9, 10, 10, 10]]),
            ]),
            Some(&dim),
        )
        .unwrap();
    }
    assert_eq!(notices.drain().len(), 1);
    // best-effort bounds are still stored
    assert_eq!(feed.structure_count(&dim), 2);

    feed.mark_unregistered();
    assert!(!feed.is_registered());
}

#[test]
fn records_without_pieces_are_skipped() {
    let (feed, _) = registered_feed();
    let dim = DimensionId::new("overworld");
    let added = feed
        .handle(
            StructureMessage::StructureData(vec![record("fortress", Vec::new())]),
            Some(&dim),
        )
        .unwrap();
    assert_eq!(added, 0);
}

#[test]
fn no_world_and_unknown_messages_error() {
    let (feed, _) = registered_feed();
    assert_eq!(
        feed.handle(StructureMessage::StructureData(Vec::new()), None),
        Err(FeedError::NoWorld)
    );
    assert_eq!(
        feed.handle(StructureMessage::Unknown(7), None),
        Err(FeedError::UnknownMessage(7))
    );
}
