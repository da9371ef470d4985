use std::sync::Arc;

use overlay_geom::{Bounds, Coords, DimensionId, Point};
use overlay_regions::custom::{CustomRegions, WorldSpawnMarker};
use overlay_regions::shapes::{SharedHeight, ShapeStyle, default_capabilities};
use overlay_regions::{
    Capability, CapabilityTable, Category, Region, RegionShape, RegionSource, RenderError,
    RenderTarget, SourceSet, SpawnColumn,
};

#[test]
fn custom_regions_are_per_dimension_and_keyed_by_shape() {
    let store = CustomRegions::new();
    let ow = DimensionId::new("overworld");
    let nether = DimensionId::new("nether");

    store.add_box(&ow, Coords::new(0, 0, 0), Coords::new(3, 3, 3));
    store.add_box(&ow, Coords::new(3, 3, 3), Coords::new(0, 0, 0));
    store.add_line(&ow, Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0));
    store.add_sphere(&nether, Point::new(0.5, 64.0, 0.5), 8.0);
    store.add_sphere(&nether, Point::new(0.5, 64.0, 0.5), 16.0);

    assert_eq!(store.len(&ow), 2);
    assert_eq!(store.len(&nether), 1);
    assert_eq!(store.get(&nether)[0].shape, RegionShape::Sphere {
        center: Point::new(0.5, 64.0, 0.5),
        radius: 16.0,
    });

    assert!(store.remove_box(&ow, Coords::new(0, 0, 0), Coords::new(3, 3, 3)));
    assert!(!store.remove_box(&ow, Coords::new(0, 0, 0), Coords::new(3, 3, 3)));
    assert!(store.remove_sphere(&nether, Point::new(0.5, 64.0, 0.5)));

    store.clear_cache();
    assert_eq!(store.len(&ow), 0);
}

#[test]
fn source_set_skips_sources_that_cannot_provide() {
    let marker = Arc::new(WorldSpawnMarker::new());
    let custom = Arc::new(CustomRegions::new());
    let ow = DimensionId::new("overworld");
    let end = DimensionId::new("end");
    marker.set(ow.clone(), Bounds::new(Coords::new(-10, 0, -10), Coords::new(10, 0, 10)));
    custom.add_box(&end, Coords::new(0, 0, 0), Coords::new(1, 1, 1));

    let mut set = SourceSet::new();
    set.push(marker.clone());
    set.push(custom.clone());
    assert_eq!(set.len(), 2);

    let ow_regions = set.collect(&ow);
    assert_eq!(ow_regions.len(), 1);
    assert!(ow_regions[0].needs_sync);
    assert_eq!(ow_regions[0].category, Category::WorldSpawn);

    let end_regions = set.collect(&end);
    assert_eq!(end_regions.len(), 1);
    assert_eq!(end_regions[0].category, Category::Custom);

    set.clear_caches();
    assert!(set.collect(&ow).is_empty());
    assert!(set.collect(&end).is_empty());
}

#[test]
fn default_table_draws_builtin_shapes() {
    let table = default_capabilities(ShapeStyle::default(), SharedHeight::new(70));
    let mut target = RenderTarget::new();
    target.reset(Coords::new(0, 64, 0));
    target.begin_batch();

    let cuboid = Region::new(
        Category::Custom,
        RegionShape::Cuboid(Bounds::new(Coords::new(0, 64, 0), Coords::new(1, 65, 1))),
    );
    table.get(&cuboid.category).unwrap().render(&mut target, &cuboid).unwrap();

    let column = Region::new(
        Category::SpawnableBlocks,
        RegionShape::Column(SpawnColumn::new(3, 4, vec![64, 70])),
    );
    table.get(&column.category).unwrap().render(&mut target, &column).unwrap();

    let structure = Region::new(
        Category::structure("anything"),
        RegionShape::Line {
            from: Point::new(0.0, 64.0, 0.0),
            to: Point::new(0.0, 80.0, 0.0),
        },
    );
    table.get(&structure.category).expect("structure fallback").render(&mut target, &structure).unwrap();
    target.end_batch();

    let g = target.geometry().unwrap();
    // 12 cuboid edges + 2 crosses of 2 lines + 1 line
    assert_eq!(g.lines.len(), 12 + 4 + 1);
    assert_eq!(g.quads.len(), 6);
}

#[test]
fn world_spawn_renders_only_in_sync_half() {
    let height = SharedHeight::new(64);
    let table = default_capabilities(ShapeStyle::default(), height.clone());
    let cap = table.get(&Category::WorldSpawn).unwrap();
    assert!(cap.has_sync());

    let region = Region::new(
        Category::WorldSpawn,
        RegionShape::Cuboid(Bounds::new(Coords::new(0, 0, 0), Coords::new(15, 0, 15))),
    )
    .with_sync();

    let mut target = RenderTarget::new();
    target.begin_batch();
    cap.render(&mut target, &region).unwrap();
    assert_eq!(target.primitive_count(), 0);
    height.set(100);
    cap.render_sync(&mut target, &region).unwrap();
    target.end_batch();

    let g = target.geometry().unwrap();
    assert_eq!(g.lines.len(), 4);
    assert!(g.lines.iter().all(|l| (l.a.y - 100.01).abs() < 1e-3));

    let bad = Region::new(Category::WorldSpawn, RegionShape::Sphere {
        center: Point::default(),
        radius: 1.0,
    });
    let mut t2 = RenderTarget::new();
    t2.begin_batch();
    assert!(matches!(cap.render_sync(&mut t2, &bad), Err(RenderError::UnsupportedShape(_))));
}

#[test]
fn unregistered_categories_have_no_capability() {
    let mut table = CapabilityTable::new();
    assert!(table.get(&Category::structure("x")).is_none());
    table.register(Category::Custom, Capability::new(|_, _| Ok(())));
    assert!(table.get(&Category::Custom).is_some());
    assert!(table.get(&Category::SpawnableBlocks).is_none());
    assert!(!table.get(&Category::Custom).unwrap().has_sync());
    assert_eq!(table.len(), 1);
}
