//! Collision primitives and geometric kernels
//!
//! - [`primitives`]: value types (`Aabb`, `Triangle`, `BoxShape`, `Ray`, ...)
//! - [`ray`]: slab test and ray/triangle intersection
//! - [`sat`]: separating-axis overlap and closest-point kernels
//! - [`sweep`]: swept box and sphere against a triangle

pub mod primitives;
pub mod ray;
pub mod sat;
pub mod sweep;

pub use primitives::{Aabb, BoxShape, Capsule, Contact, Hit, Ray, Sphere, Triangle};
pub use ray::{ray_hits_aabb, ray_vs_aabb, ray_vs_triangle};
pub use sat::{
    aabb_overlaps_triangle, box_vs_triangle_overlap, closest_point_on_segment,
    closest_point_on_triangle, closest_points_between_segments, closest_points_segment_triangle,
    intersect_aabb_with_triangle, intersect_capsule_with_triangle, project_aabb_onto_axis,
    test_axis,
};
pub use sweep::{swept_aabb_vs_triangle, swept_sphere_vs_triangle};
