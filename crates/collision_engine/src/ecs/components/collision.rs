//! Collision components for ECS
//!
//! [`MeshColliderComponent`] carries static triangle soup in local space,
//! split into named submeshes; each submesh becomes one BVH slice when the
//! owning entity is registered. [`BoxColliderComponent`] is the hull used by
//! moving actors.

use crate::foundation::math::Vec3;
use crate::physics::collision::{Aabb, BoxShape, Triangle};

/// A named run of local-space triangles
#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    /// Name used in log output
    pub name: String,
    /// Local-space triangles
    pub triangles: Vec<Triangle>,
}

impl SubMesh {
    /// Create from triangles
    pub fn new(name: impl Into<String>, triangles: Vec<Triangle>) -> Self {
        Self {
            name: name.into(),
            triangles,
        }
    }

    /// Build from an indexed vertex list; trailing indices that do not form
    /// a full triangle are ignored, as are out-of-range indices
    pub fn from_indexed(name: impl Into<String>, vertices: &[Vec3], indices: &[u32]) -> Self {
        let triangles = indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let v0 = vertices.get(tri[0] as usize)?;
                let v1 = vertices.get(tri[1] as usize)?;
                let v2 = vertices.get(tri[2] as usize)?;
                Some(Triangle::new(*v0, *v1, *v2))
            })
            .collect();
        Self::new(name, triangles)
    }

    /// Local-space bounds
    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for tri in &self.triangles {
            aabb.expand(&tri.bounds());
        }
        aabb
    }
}

/// Static mesh collider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshColliderComponent {
    /// Submeshes registered as separate BVH slices
    pub submeshes: Vec<SubMesh>,
}

impl MeshColliderComponent {
    /// Create a collider with a single submesh
    pub fn from_triangles(name: impl Into<String>, triangles: Vec<Triangle>) -> Self {
        Self {
            submeshes: vec![SubMesh::new(name, triangles)],
        }
    }

    /// Append a submesh
    pub fn with_submesh(mut self, submesh: SubMesh) -> Self {
        self.submeshes.push(submesh);
        self
    }

    /// Total triangle count across submeshes
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.triangles.len()).sum()
    }
}

/// Axis-aligned hull for a moving actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxColliderComponent {
    /// Half extents
    pub half_size: Vec3,
}

impl BoxColliderComponent {
    /// Create from half extents
    pub fn new(half_size: Vec3) -> Self {
        Self { half_size }
    }

    /// Query shape centered at `position`
    pub fn shape_at(&self, position: Vec3) -> BoxShape {
        BoxShape::new(position, self.half_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_indexed_skips_bad_indices() {
        let vertices = [Vec3::zeros(), Vec3::x(), Vec3::z(), Vec3::y()];
        let submesh = SubMesh::from_indexed("quad", &vertices, &[0, 1, 2, 0, 2, 9, 1]);
        assert_eq!(submesh.triangles.len(), 1);
        assert_eq!(submesh.triangles[0].v1, Vec3::x());
    }

    #[test]
    fn test_triangle_count_spans_submeshes() {
        let tri = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::z());
        let collider = MeshColliderComponent::from_triangles("a", vec![tri, tri])
            .with_submesh(SubMesh::new("b", vec![tri]));
        assert_eq!(collider.triangle_count(), 3);
    }
}
