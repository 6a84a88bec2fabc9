//! Debug drawing primitives and recording sink

use crate::foundation::math::{Vec3, Vec4};

/// Common debug colors (RGBA)
pub mod colors {
    use crate::foundation::math::Vec4;

    /// Misses, rejected tests
    pub fn red() -> Vec4 {
        Vec4::new(1.0, 0.0, 0.0, 1.0)
    }
    /// Hits, leaves
    pub fn green() -> Vec4 {
        Vec4::new(0.0, 1.0, 0.0, 1.0)
    }
    /// Normals
    pub fn blue() -> Vec4 {
        Vec4::new(0.0, 0.0, 1.0, 1.0)
    }
    /// Internal nodes
    pub fn yellow() -> Vec4 {
        Vec4::new(1.0, 1.0, 0.0, 1.0)
    }
    /// Dynamic proxies
    pub fn cyan() -> Vec4 {
        Vec4::new(0.0, 1.0, 1.0, 1.0)
    }
    /// Geometry
    pub fn white() -> Vec4 {
        Vec4::new(1.0, 1.0, 1.0, 1.0)
    }
}

/// Sink for debug shapes
pub trait DebugDraw {
    /// Wireframe box from center and half extents
    fn draw_box(&mut self, center: Vec3, half_size: Vec3, color: Vec4);

    /// Line segment
    fn draw_line(&mut self, start: Vec3, end: Vec3, color: Vec4);

    /// RGB axis tripod at `origin`
    fn draw_axis(&mut self, origin: Vec3, size: f32) {
        self.draw_line(origin, origin + Vec3::x() * size, colors::red());
        self.draw_line(origin, origin + Vec3::y() * size, colors::green());
        self.draw_line(origin, origin + Vec3::z() * size, colors::blue());
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDebugDraw;

impl DebugDraw for NullDebugDraw {
    fn draw_box(&mut self, _center: Vec3, _half_size: Vec3, _color: Vec4) {}
    fn draw_line(&mut self, _start: Vec3, _end: Vec3, _color: Vec4) {}
}

/// Recorded debug shape
#[derive(Clone, Debug, PartialEq)]
pub enum DebugShape {
    /// Line segment from start to end
    Line {
        /// Start point
        start: Vec3,
        /// End point
        end: Vec3,
        /// RGBA color
        color: Vec4,
        /// Remaining lifetime in seconds
        duration: f32,
    },
    /// Axis-aligned wireframe box
    Box {
        /// Center
        center: Vec3,
        /// Half extents
        extents: Vec3,
        /// RGBA color
        color: Vec4,
        /// Remaining lifetime in seconds
        duration: f32,
    },
}

impl DebugShape {
    /// Decrease duration by `delta_time`, returns true if expired
    pub fn tick(&mut self, delta_time: f32) -> bool {
        let (Self::Line { duration, .. } | Self::Box { duration, .. }) = self;
        *duration -= delta_time;
        *duration <= 0.0
    }
}

/// Records shapes until they expire
///
/// Shapes drawn through the [`DebugDraw`] trait live for a single
/// [`update`](Self::update).
#[derive(Debug, Default)]
pub struct DebugDrawSystem {
    shapes: Vec<DebugShape>,
    /// Master enable/disable flag
    pub enabled: bool,
}

impl DebugDrawSystem {
    /// Create an enabled system
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            enabled: true,
        }
    }

    /// Record a line that lives for `duration` seconds
    pub fn line_for(&mut self, start: Vec3, end: Vec3, color: Vec4, duration: f32) {
        if self.enabled {
            self.shapes.push(DebugShape::Line { start, end, color, duration });
        }
    }

    /// Record a box that lives for `duration` seconds
    pub fn box_for(&mut self, center: Vec3, extents: Vec3, color: Vec4, duration: f32) {
        if self.enabled {
            self.shapes.push(DebugShape::Box { center, extents, color, duration });
        }
    }

    /// Age shapes and drop the expired ones
    pub fn update(&mut self, delta_time: f32) {
        self.shapes.retain_mut(|shape| !shape.tick(delta_time));
    }

    /// Currently recorded shapes
    pub fn shapes(&self) -> &[DebugShape] {
        &self.shapes
    }

    /// Number of boxes recorded
    pub fn box_count(&self) -> usize {
        self.shapes.iter().filter(|s| matches!(s, DebugShape::Box { .. })).count()
    }

    /// Number of lines recorded
    pub fn line_count(&self) -> usize {
        self.shapes.iter().filter(|s| matches!(s, DebugShape::Line { .. })).count()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.shapes.clear();
    }
}

impl DebugDraw for DebugDrawSystem {
    fn draw_box(&mut self, center: Vec3, half_size: Vec3, color: Vec4) {
        self.box_for(center, half_size, color, f32::EPSILON);
    }

    fn draw_line(&mut self, start: Vec3, end: Vec3, color: Vec4) {
        self.line_for(start, end, color, f32::EPSILON);
    }
}
