use overlay_geom::{Bounds, Coords, DimensionId, Point, Vec3};

#[test]
fn bounds_from_six_fields() {
    let b = Bounds::from_int_array(&[4, 5, 6, 1, 2, 3]);
    assert_eq!(b.min, Coords::new(1, 2, 3));
    assert_eq!(b.max, Coords::new(4, 5, 6));
}

#[test]
fn bounds_wrong_field_count_degrades_to_zero() {
    assert_eq!(Bounds::from_int_array(&[]), Bounds::ZERO);
    assert_eq!(Bounds::from_int_array(&[1, 2, 3, 4, 5]), Bounds::ZERO);
    assert_eq!(Bounds::from_int_array(&[1, 2, 3, 4, 5, 6, 7]), Bounds::ZERO);
    assert!(Bounds::from_int_array(&[9; 4]).is_zero());
}

#[test]
fn bounds_encompass_and_expand() {
    let mut a = Bounds::new(Coords::new(0, 0, 0), Coords::new(2, 2, 2));
    let b = Bounds::new(Coords::new(-3, 1, 1), Coords::new(1, 8, 1));
    a.encompass(&b);
    assert_eq!(a.min, Coords::new(-3, 0, 0));
    assert_eq!(a.max, Coords::new(2, 8, 2));

    let e = a.expanded(12);
    assert_eq!(e.min, Coords::new(-15, -12, -12));
    assert_eq!(e.max, Coords::new(14, 20, 14));
}

#[test]
fn point_floor_and_relative() {
    let p = Point::new(-0.5, 64.9, 10.0);
    assert_eq!(p.floor(), Coords::new(-1, 64, 10));

    let rel = Point::new(101.5, 70.0, -4.25).relative_to(Coords::new(100, 64, -4));
    assert_eq!(rel, Vec3::new(1.5, 6.0, -0.25));
}

#[test]
fn dimension_ids_compare_by_name() {
    let a = DimensionId::new("overworld");
    let b: DimensionId = "overworld".into();
    assert_eq!(a, b);
    assert_ne!(a, DimensionId::new("nether"));
    assert_eq!(a.to_string(), "overworld");
}
