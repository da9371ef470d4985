//! Minimal geometry and identity types shared by the overlay crates.
#![forbid(unsafe_code)]

use core::fmt;
use std::sync::Arc;

/// Render-space vector, always relative to some origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// World-space position with double precision (camera, sphere centers, line ends).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Block coordinates containing this point.
    #[inline]
    pub fn floor(self) -> Coords {
        Coords::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }

    /// Offset of `self` from `origin`, narrowed to render precision.
    #[inline]
    pub fn relative_to(self, origin: Coords) -> Vec3 {
        Vec3::new(
            (self.x - f64::from(origin.x)) as f32,
            (self.y - f64::from(origin.y)) as f32,
            (self.z - f64::from(origin.z)) as f32,
        )
    }

    /// Bit-exact key, used where points identify stored shapes.
    #[inline]
    pub fn to_bits(self) -> [u64; 3] {
        [self.x.to_bits(), self.y.to_bits(), self.z.to_bits()]
    }
}

/// Integer block coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Coords {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coords {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn to_point(self) -> Point {
        Point::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }
}

impl From<(i32, i32, i32)> for Coords {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

/// Inclusive integer box, the shape of every structure piece.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub min: Coords,
    pub max: Coords,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds {
        min: Coords::new(0, 0, 0),
        max: Coords::new(0, 0, 0),
    };

    /// Builds a box from two corners in any order.
    pub fn new(a: Coords, b: Coords) -> Self {
        Self {
            min: Coords::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Coords::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Reads `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    ///
    /// Any other field count yields `Bounds::ZERO` so a single bad record
    /// cannot abort the batch it arrived in.
    pub fn from_int_array(fields: &[i32]) -> Self {
        match fields {
            [x0, y0, z0, x1, y1, z1] => {
                Self::new(Coords::new(*x0, *y0, *z0), Coords::new(*x1, *y1, *z1))
            }
            _ => Self::ZERO,
        }
    }

    /// Grows `self` to also cover `other`.
    pub fn encompass(&mut self, other: &Bounds) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.min.z = self.min.z.min(other.min.z);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
        self.max.z = self.max.z.max(other.max.z);
    }

    /// Pads every face outward by `margin` blocks.
    pub fn expanded(&self, margin: i32) -> Bounds {
        Bounds {
            min: Coords::new(self.min.x - margin, self.min.y - margin, self.min.z - margin),
            max: Coords::new(self.max.x + margin, self.max.y + margin, self.max.z + margin),
        }
    }

    #[inline]
    pub fn contains(&self, c: Coords) -> bool {
        c.x >= self.min.x
            && c.x <= self.max.x
            && c.y >= self.min.y
            && c.y <= self.max.y
            && c.z >= self.min.z
            && c.z <= self.max.z
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        *self == Bounds::ZERO
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const RED: Color = Color::rgba(255, 64, 64, 255);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// Identifies one world/dimension; cheap to clone and compare.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimensionId(Arc<str>);

impl DimensionId {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DimensionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn bounds_new_orders_corners(a: Coords, b: Coords) {
            let bb = Bounds::new(a, b);
            prop_assert!(bb.min.x <= bb.max.x);
            prop_assert!(bb.min.y <= bb.max.y);
            prop_assert!(bb.min.z <= bb.max.z);
            prop_assert!(bb.contains(bb.min));
            prop_assert!(bb.contains(bb.max));
        }

        #[test]
        fn coords_round_trip_through_point(c: Coords) {
            prop_assert_eq!(c.to_point().floor(), c);
            prop_assert_eq!(c.to_point().relative_to(c), Vec3::ZERO);
        }
    }
}
