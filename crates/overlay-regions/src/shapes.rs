//! Default renderers for the built-in region shapes.
//!
//! These are deliberately plain outlines; hosts with real shape math register
//! their own capabilities over these.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use hashbrown::HashMap;
use overlay_geom::{Bounds, Color, Point};

use crate::capability::{Capability, CapabilityTable, RenderError};
use crate::target::RenderTarget;
use crate::{Category, RegionShape, SpawnColumn};

#[derive(Clone, Debug)]
pub struct ShapeStyle {
    pub palette: HashMap<Category, Color>,
    pub fallback: Color,
    /// Alpha of cuboid faces; 0 draws edges only.
    pub fill_alpha: u8,
    pub sphere_segments: usize,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        let mut palette = HashMap::new();
        palette.insert(Category::Custom, Color::WHITE);
        palette.insert(Category::SpawnableBlocks, Color::RED);
        palette.insert(Category::WorldSpawn, Color::rgba(64, 255, 64, 255));
        Self {
            palette,
            fallback: Color::rgba(255, 200, 64, 255),
            fill_alpha: 30,
            sphere_segments: 48,
        }
    }
}

impl ShapeStyle {
    pub fn color(&self, category: &Category) -> Color {
        self.palette.get(category).copied().unwrap_or(self.fallback)
    }
}

/// Y level shared between the frame thread and the world-spawn renderer.
#[derive(Clone, Debug, Default)]
pub struct SharedHeight(Arc<AtomicI32>);

impl SharedHeight {
    pub fn new(y: i32) -> Self {
        Self(Arc::new(AtomicI32::new(y)))
    }

    pub fn set(&self, y: i32) {
        self.0.store(y, Ordering::Relaxed);
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }
}

pub fn render_cuboid(target: &mut RenderTarget, bounds: &Bounds, color: Color, fill_alpha: u8) {
    let lo = bounds.min.to_point();
    let hi = Point::new(
        f64::from(bounds.max.x) + 1.0,
        f64::from(bounds.max.y) + 1.0,
        f64::from(bounds.max.z) + 1.0,
    );
    let c = |x: bool, y: bool, z: bool| {
        Point::new(
            if x { hi.x } else { lo.x },
            if y { hi.y } else { lo.y },
            if z { hi.z } else { lo.z },
        )
    };
    for &(y, z) in &[(false, false), (true, false), (false, true), (true, true)] {
        target.push_line(c(false, y, z), c(true, y, z), color);
    }
    for &(x, z) in &[(false, false), (true, false), (false, true), (true, true)] {
        target.push_line(c(x, false, z), c(x, true, z), color);
    }
    for &(x, y) in &[(false, false), (true, false), (false, true), (true, true)] {
        target.push_line(c(x, y, false), c(x, y, true), color);
    }
    if fill_alpha == 0 {
        return;
    }
    let fill = color.with_alpha(fill_alpha);
    for side in [false, true] {
        target.push_quad(
            [c(side, false, false), c(side, true, false), c(side, true, true), c(side, false, true)],
            fill,
        );
        target.push_quad(
            [c(false, side, false), c(true, side, false), c(true, side, true), c(false, side, true)],
            fill,
        );
        target.push_quad(
            [c(false, false, side), c(true, false, side), c(true, true, side), c(false, true, side)],
            fill,
        );
    }
}

pub fn render_sphere(
    target: &mut RenderTarget,
    center: Point,
    radius: f64,
    segments: usize,
    color: Color,
) {
    let n = segments.max(3);
    let ring = |i: usize, axis: usize| {
        let t = TAU * (i % n) as f64 / n as f64;
        let (s, c) = t.sin_cos();
        let (a, b) = (radius * c, radius * s);
        match axis {
            0 => Point::new(center.x + a, center.y + b, center.z),
            1 => Point::new(center.x + a, center.y, center.z + b),
            _ => Point::new(center.x, center.y + a, center.z + b),
        }
    };
    for axis in 0..3 {
        for i in 0..n {
            target.push_line(ring(i, axis), ring(i + 1, axis), color);
        }
    }
}

/// Marks each spawnable block top with a small cross.
pub fn render_column(target: &mut RenderTarget, column: &SpawnColumn, color: Color) {
    let (x0, z0) = (f64::from(column.x), f64::from(column.z));
    for &y in column.ys.iter() {
        let y = f64::from(y) + 0.01;
        target.push_line(Point::new(x0, y, z0), Point::new(x0 + 1.0, y, z0 + 1.0), color);
        target.push_line(Point::new(x0 + 1.0, y, z0), Point::new(x0, y, z0 + 1.0), color);
    }
}

/// Flat outline of `bounds` projected onto the plane `y`.
pub fn render_flat_rect(target: &mut RenderTarget, bounds: &Bounds, y: f64, color: Color) {
    let (x0, z0) = (f64::from(bounds.min.x), f64::from(bounds.min.z));
    let (x1, z1) = (f64::from(bounds.max.x) + 1.0, f64::from(bounds.max.z) + 1.0);
    let corners = [
        Point::new(x0, y, z0),
        Point::new(x1, y, z0),
        Point::new(x1, y, z1),
        Point::new(x0, y, z1),
    ];
    for i in 0..4 {
        target.push_line(corners[i], corners[(i + 1) % 4], color);
    }
}

/// Dispatches on the region's shape, coloured by its category.
pub fn shape_capability(style: Arc<ShapeStyle>) -> Capability {
    Capability::new(move |target, region| {
        let color = style.color(&region.category);
        match &region.shape {
            RegionShape::Cuboid(bounds) => render_cuboid(target, bounds, color, style.fill_alpha),
            RegionShape::Line { from, to } => target.push_line(*from, *to, color),
            RegionShape::Sphere { center, radius } => {
                render_sphere(target, *center, *radius, style.sphere_segments, color)
            }
            RegionShape::Column(column) => render_column(target, column, color),
        }
        Ok(())
    })
}

/// World spawn is drawn at a height only the frame thread knows, so all of
/// its geometry comes from the synchronous half.
pub fn world_spawn_capability(style: Arc<ShapeStyle>, height: SharedHeight) -> Capability {
    Capability::new(|_, _| Ok(())).with_sync(move |target, region| {
        let RegionShape::Cuboid(bounds) = &region.shape else {
            return Err(RenderError::UnsupportedShape("world spawn"));
        };
        let color = style.color(&region.category);
        render_flat_rect(target, bounds, f64::from(height.get()) + 0.01, color);
        Ok(())
    })
}

/// Table covering every built-in category; structure categories share one entry.
pub fn default_capabilities(style: ShapeStyle, spawn_height: SharedHeight) -> CapabilityTable {
    let style = Arc::new(style);
    let mut table = CapabilityTable::new();
    table.register(Category::Custom, shape_capability(style.clone()));
    table.register(Category::SpawnableBlocks, shape_capability(style.clone()));
    table.register(
        Category::WorldSpawn,
        world_spawn_capability(style.clone(), spawn_height),
    );
    table.set_structure_fallback(shape_capability(style));
    table
}
