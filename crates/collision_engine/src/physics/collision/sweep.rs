//! Swept-shape kernels against a single static triangle
//!
//! Both kernels take the full motion `delta` and report a normalized time of
//! impact in `[0, 1]` plus the contact normal facing the moving shape.

use super::primitives::{BoxShape, Triangle};
use super::sat::{
    closest_point_on_segment, closest_point_on_triangle, normalized_box_triangle_axes,
    project_aabb_onto_axis, project_triangle_onto_axis,
};
use crate::foundation::math::Vec3;

/// Relative axis speeds below this are treated as static
const STATIC_AXIS_SPEED: f32 = 1e-8;

/// Swept AABB vs triangle by separating-axis interval clipping.
///
/// For every axis the entry/exit times of the projected intervals are
/// intersected; the axis with the latest entry supplies the normal. A box
/// that already overlaps the triangle reports a time of impact of zero.
pub fn swept_aabb_vs_triangle(shape: &BoxShape, delta: &Vec3, tri: &Triangle) -> Option<(f32, Vec3)> {
    let mut t_enter = -f32::MAX;
    let mut t_exit = f32::MAX;
    let mut normal = Vec3::zeros();

    for a in normalized_box_triangle_axes(tri) {
        let (box_min, box_max) = project_aabb_onto_axis(&shape.center, &shape.half_size, &a);
        let (tri_min, tri_max) = project_triangle_onto_axis(tri, &a);
        let speed = delta.dot(&a);

        if speed.abs() < STATIC_AXIS_SPEED {
            if box_max < tri_min || tri_max < box_min {
                return None;
            }
            continue;
        }

        let mut t0 = (tri_min - box_max) / speed;
        let mut t1 = (tri_max - box_min) / speed;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }

        if t0 > t_enter {
            t_enter = t0;
            normal = if speed > 0.0 { -a } else { a };
        }
        t_exit = t_exit.min(t1);

        if t_enter > t_exit {
            return None;
        }
    }

    if t_exit < 0.0 || t_enter > 1.0 {
        return None;
    }

    if normal == Vec3::zeros() {
        normal = facing_normal(tri, delta)?;
    }
    Some((t_enter.max(0.0), normal))
}

/// Swept sphere vs triangle.
///
/// Tests the face first, then the edges as capsules and the vertices as
/// spheres. A sphere that starts in contact reports a time of impact of
/// zero, pushed away from the closest feature.
pub fn swept_sphere_vs_triangle(center: &Vec3, radius: f32, delta: &Vec3, tri: &Triangle) -> Option<(f32, Vec3)> {
    let face_normal = tri.raw_normal().try_normalize(1e-12)?;

    let closest = closest_point_on_triangle(center, tri);
    let offset = center - closest;
    let dist_sq = offset.norm_squared();
    if dist_sq < radius * radius {
        let dist = dist_sq.sqrt();
        let normal = if dist > 1e-6 {
            offset / dist
        } else {
            facing_normal(tri, delta)?
        };
        return Some((0.0, normal));
    }

    // Face interior: the earliest possible contact if it lands inside
    let mut plane_normal = face_normal;
    let mut plane_dist = (center - tri.v0).dot(&plane_normal);
    if plane_dist < 0.0 {
        plane_normal = -plane_normal;
        plane_dist = -plane_dist;
    }
    let approach = -delta.dot(&plane_normal);
    if approach > STATIC_AXIS_SPEED {
        let t = (plane_dist - radius) / approach;
        if (0.0..=1.0).contains(&t) {
            let touch = center + delta * t - plane_normal * radius;
            if tri.contains_coplanar_point(&touch, 1e-6) {
                return Some((t, plane_normal));
            }
        }
    }

    // Edges and vertices
    let mut best: Option<f32> = None;
    for i in 0..3 {
        let a = tri.vertex(i);
        let b = tri.vertex(i + 1);
        let candidates = [
            sweep_point_vs_cylinder(center, delta, &a, &b, radius),
            sweep_point_vs_sphere(center, delta, &a, radius),
        ];
        for t in candidates.into_iter().flatten() {
            if best.map_or(true, |current| t < current) {
                best = Some(t);
            }
        }
    }

    let t = best?;
    let at_contact = center + delta * t;
    let feature = closest_point_on_triangle(&at_contact, tri);
    let normal = (at_contact - feature)
        .try_normalize(1e-9)
        .unwrap_or(plane_normal);
    Some((t, normal))
}

/// First `t` in `[0, 1]` at which `origin + delta * t` is `radius` away from
/// the interior of segment `a..b`
fn sweep_point_vs_cylinder(origin: &Vec3, delta: &Vec3, a: &Vec3, b: &Vec3, radius: f32) -> Option<f32> {
    let ab = b - a;
    let ab_sq = ab.norm_squared();
    if ab_sq < 1e-12 {
        return None;
    }
    let m = origin - a;
    let d_perp = delta - ab * (delta.dot(&ab) / ab_sq);
    let m_perp = m - ab * (m.dot(&ab) / ab_sq);

    let qa = d_perp.norm_squared();
    if qa < 1e-12 {
        return None;
    }
    let qb = 2.0 * m_perp.dot(&d_perp);
    let qc = m_perp.norm_squared() - radius * radius;
    let t = smallest_root(qa, qb, qc)?;

    let s = (m + delta * t).dot(&ab) / ab_sq;
    (0.0..=1.0).contains(&s).then_some(t)
}

/// First `t` in `[0, 1]` at which `origin + delta * t` is `radius` from `p`
fn sweep_point_vs_sphere(origin: &Vec3, delta: &Vec3, p: &Vec3, radius: f32) -> Option<f32> {
    let qa = delta.norm_squared();
    if qa < 1e-12 {
        return None;
    }
    let m = origin - p;
    smallest_root(qa, 2.0 * m.dot(delta), m.norm_squared() - radius * radius)
}

fn smallest_root(a: f32, b: f32, c: f32) -> Option<f32> {
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}

/// Triangle normal flipped against the motion, or the reversed motion for
/// degenerate triangles
fn facing_normal(tri: &Triangle, delta: &Vec3) -> Option<Vec3> {
    match tri.raw_normal().try_normalize(1e-12) {
        Some(n) if n.dot(delta) > 0.0 => Some(-n),
        Some(n) => Some(n),
        None => (-delta).try_normalize(1e-12),
    }
}
