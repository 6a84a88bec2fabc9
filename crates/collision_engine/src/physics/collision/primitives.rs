//! Primitive collision shapes and query results
//!
//! Value types shared by the SAT kernels, the BVH and the cast layer. All
//! shapes are plain `Copy` data in world space.

use crate::foundation::math::Vec3;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Create from corners; `min <= max` per axis is the caller's job
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inverted box that any `expand` call will overwrite
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(-f32::MAX),
        }
    }

    /// Create from a center and half extents
    pub fn from_center_half(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box containing every point
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.expand_point(p);
        }
        aabb
    }

    /// `true` once the box has been expanded at least once
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full size along each axis
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Half size along each axis
    pub fn half_size(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Grow to contain a point
    pub fn expand_point(&mut self, p: &Vec3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grow to contain another box
    pub fn expand(&mut self, other: &Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Union of two boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Minkowski sum with a box of the given half extents
    pub fn inflated(&self, half: &Vec3) -> Self {
        Self {
            min: self.min - half,
            max: self.max + half,
        }
    }

    /// Closed-interval overlap test
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Point containment, boundary inclusive
    pub fn contains_point(&self, p: &Vec3) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// `true` if `other` lies entirely inside this box
    pub fn contains(&self, other: &Self) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Surface area, zero for an empty box
    pub fn surface_area(&self) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }
        let e = self.size();
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Volume, zero for an empty box
    pub fn volume(&self) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }
        let e = self.size();
        e.x * e.y * e.z
    }

    /// Index of the longest axis (0 = X, 1 = Y, 2 = Z)
    pub fn longest_axis(&self) -> usize {
        let e = self.size();
        if e.x > e.y && e.x > e.z {
            0
        } else if e.y > e.z {
            1
        } else {
            2
        }
    }
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Vertex by index, wrapping modulo 3
    pub fn vertex(&self, i: usize) -> Vec3 {
        match i % 3 {
            0 => self.v0,
            1 => self.v1,
            _ => self.v2,
        }
    }

    /// The three edges `v1-v0`, `v2-v1`, `v0-v2`
    pub fn edges(&self) -> [Vec3; 3] {
        [self.v1 - self.v0, self.v2 - self.v1, self.v0 - self.v2]
    }

    /// Unnormalized normal `(v1-v0) x (v2-v0)`; length is twice the area
    pub fn raw_normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal (right-hand rule), zero for degenerate triangles
    pub fn normal(&self) -> Vec3 {
        self.raw_normal().try_normalize(1e-12).unwrap_or_else(Vec3::zeros)
    }

    /// Triangle area
    pub fn area(&self) -> f32 {
        self.raw_normal().norm() * 0.5
    }

    /// Centroid
    pub fn center(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Bounding box
    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            self.v0.inf(&self.v1).inf(&self.v2),
            self.v0.sup(&self.v1).sup(&self.v2),
        )
    }

    /// Copy moved by `offset`
    pub fn translated(&self, offset: &Vec3) -> Self {
        Self::new(self.v0 + offset, self.v1 + offset, self.v2 + offset)
    }

    /// Inside test for a point assumed to lie on the triangle's plane.
    ///
    /// Uses same-side edge tests against the face normal, boundary inclusive
    /// within `tolerance` (scaled by edge length).
    pub fn contains_coplanar_point(&self, p: &Vec3, tolerance: f32) -> bool {
        let n = self.raw_normal();
        if n.norm_squared() < 1e-20 {
            return false;
        }
        let verts = [self.v0, self.v1, self.v2];
        (0..3).all(|i| {
            let a = verts[i];
            let b = verts[(i + 1) % 3];
            let edge = b - a;
            edge.cross(&(p - a)).dot(&n) >= -tolerance * edge.norm() * n.norm()
        })
    }
}

/// Axis-aligned box query shape: center plus half extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxShape {
    /// Center in world space
    pub center: Vec3,
    /// Half extents along each world axis
    pub half_size: Vec3,
}

impl BoxShape {
    /// Create a box shape
    pub fn new(center: Vec3, half_size: Vec3) -> Self {
        Self { center, half_size }
    }

    /// World-space bounds
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_half(self.center, self.half_size)
    }

    /// Same box moved to `center`
    pub fn at(&self, center: Vec3) -> Self {
        Self::new(center, self.half_size)
    }
}

/// A ray segment `origin + dir * t` for `t` in `[t_min, t_max]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin in world space
    pub origin: Vec3,
    /// Direction; queries re-normalize it
    pub dir: Vec3,
    /// Near limit
    pub t_min: f32,
    /// Far limit
    pub t_max: f32,
}

impl Ray {
    /// Creates a ray from `origin` along `dir` up to `t_max`
    pub fn new(origin: Vec3, dir: Vec3, t_max: f32) -> Self {
        Self {
            origin,
            dir,
            t_min: 0.0,
            t_max,
        }
    }

    /// Set the near limit
    pub fn with_t_min(mut self, t_min: f32) -> Self {
        self.t_min = t_min;
        self
    }

    /// Point at parameter `t`
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// A sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// A capsule: segment `start..end` swept by `radius`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    /// Segment start
    pub start: Vec3,
    /// Segment end
    pub end: Vec3,
    /// Radius
    pub radius: f32,
}

impl Capsule {
    /// Creates a new capsule
    pub fn new(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self { start, end, radius }
    }

    /// Bounds of the swept segment
    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.start.inf(&self.end), self.start.sup(&self.end))
            .inflated(&Vec3::repeat(self.radius))
    }
}

/// Contact produced by the static overlap kernels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Contact point in world space
    pub point: Vec3,
    /// Unit normal pointing away from the triangle
    pub normal: Vec3,
    /// Penetration depth, zero when only touching
    pub depth: f32,
}

/// Result of a cast or overlap query
///
/// For casts `t` is the travelled distance in world units and `depth` is
/// zero. For overlaps `t` is zero and `depth` is the penetration along
/// `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Distance travelled before contact
    pub t: f32,
    /// Caster position at contact (or contact point for overlaps)
    pub pos: Vec3,
    /// Unit surface normal facing the caster
    pub normal: Vec3,
    /// Index into the engine's global triangle buffer
    pub tri_index: u32,
    /// Penetration depth for overlap queries
    pub depth: f32,
}

impl Default for Hit {
    fn default() -> Self {
        Self {
            t: 0.0,
            pos: Vec3::zeros(),
            normal: Vec3::zeros(),
            tri_index: u32::MAX,
            depth: 0.0,
        }
    }
}
