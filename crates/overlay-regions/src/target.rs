use overlay_geom::{Color, Coords, Point, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetState {
    Empty,
    Building,
    Built,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSeg {
    pub a: Vec3,
    pub b: Vec3,
    pub color: Color,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub corners: [Vec3; 4],
    pub color: Color,
}

/// Read-only view of a finished build.
#[derive(Clone, Copy, Debug)]
pub struct Geometry<'a> {
    pub origin: Coords,
    pub lines: &'a [LineSeg],
    pub quads: &'a [Quad],
}

/// Accumulates geometry for one build pass, translated relative to `origin`.
///
/// Only the thread running the build writes to it; readers go through
/// [`RenderTarget::geometry`], which refuses while a build is open.
#[derive(Debug)]
pub struct RenderTarget {
    origin: Coords,
    state: TargetState,
    lines: Vec<LineSeg>,
    quads: Vec<Quad>,
    batches: u64,
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTarget {
    pub fn new() -> Self {
        Self {
            origin: Coords::default(),
            state: TargetState::Empty,
            lines: Vec::new(),
            quads: Vec::new(),
            batches: 0,
        }
    }

    /// Clears geometry but keeps allocations for the next build.
    pub fn reset(&mut self, origin: Coords) {
        self.origin = origin;
        self.lines.clear();
        self.quads.clear();
        self.state = TargetState::Empty;
    }

    /// Clears geometry and releases its memory.
    pub fn hard_reset(&mut self) {
        self.origin = Coords::default();
        self.lines = Vec::new();
        self.quads = Vec::new();
        self.state = TargetState::Empty;
    }

    pub fn begin_batch(&mut self) {
        debug_assert_ne!(self.state, TargetState::Building, "batch already open");
        if self.state == TargetState::Built {
            let origin = self.origin;
            self.reset(origin);
        }
        self.state = TargetState::Building;
    }

    pub fn end_batch(&mut self) {
        if self.state == TargetState::Building {
            self.state = TargetState::Built;
            self.batches += 1;
        }
    }

    #[inline]
    pub fn state(&self) -> TargetState {
        self.state
    }

    #[inline]
    pub fn origin(&self) -> Coords {
        self.origin
    }

    /// Number of batches completed since creation.
    #[inline]
    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn push_line(&mut self, from: Point, to: Point, color: Color) {
        if self.state != TargetState::Building {
            log::warn!("line pushed outside of a batch; dropped");
            return;
        }
        self.lines.push(LineSeg {
            a: from.relative_to(self.origin),
            b: to.relative_to(self.origin),
            color,
        });
    }

    pub fn push_quad(&mut self, corners: [Point; 4], color: Color) {
        if self.state != TargetState::Building {
            log::warn!("quad pushed outside of a batch; dropped");
            return;
        }
        let o = self.origin;
        self.quads.push(Quad {
            corners: corners.map(|p| p.relative_to(o)),
            color,
        });
    }

    /// Geometry of the last finished build; `None` unless the target is `Built`.
    pub fn geometry(&self) -> Option<Geometry<'_>> {
        if self.state != TargetState::Built {
            return None;
        }
        Some(Geometry {
            origin: self.origin,
            lines: &self.lines,
            quads: &self.quads,
        })
    }

    pub fn primitive_count(&self) -> usize {
        self.lines.len() + self.quads.len()
    }

    pub fn debug_string(&self) -> String {
        match self.state {
            TargetState::Empty => "empty".to_string(),
            TargetState::Building => "building".to_string(),
            TargetState::Built => format!("{} lines, {} quads", self.lines.len(), self.quads.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_hidden_until_built() {
        let mut t = RenderTarget::new();
        assert!(t.geometry().is_none());
        t.reset(Coords::new(10, 0, 10));
        t.begin_batch();
        t.push_line(Point::new(10.0, 0.0, 10.0), Point::new(11.0, 0.0, 10.0), Color::WHITE);
        assert_eq!(t.state(), TargetState::Building);
        assert!(t.geometry().is_none());
        t.end_batch();
        let g = t.geometry().expect("built");
        assert_eq!(g.lines.len(), 1);
        assert_eq!(g.lines[0].a, Vec3::ZERO);
        assert_eq!(g.lines[0].b, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(t.batches(), 1);
    }

    #[test]
    fn pushes_outside_batch_are_dropped() {
        let mut t = RenderTarget::new();
        t.push_quad([Point::default(); 4], Color::WHITE);
        assert_eq!(t.primitive_count(), 0);
    }

    #[test]
    fn reset_and_hard_reset_empty_the_target() {
        let mut t = RenderTarget::new();
        t.begin_batch();
        t.push_line(Point::default(), Point::new(0.0, 1.0, 0.0), Color::WHITE);
        t.end_batch();
        assert_eq!(t.debug_string(), "1 lines, 0 quads");

        t.reset(Coords::new(1, 2, 3));
        assert_eq!(t.state(), TargetState::Empty);
        assert_eq!(t.primitive_count(), 0);
        assert_eq!(t.origin(), Coords::new(1, 2, 3));

        t.begin_batch();
        t.end_batch();
        t.hard_reset();
        assert_eq!(t.origin(), Coords::default());
        assert_eq!(t.debug_string(), "empty");
    }
}
