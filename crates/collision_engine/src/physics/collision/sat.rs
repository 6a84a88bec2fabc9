//! Separating-axis and closest-point kernels
//!
//! Static (non-swept) tests between boxes, capsules and triangles. Axes are
//! the usual 13 for box-vs-triangle: the triangle normal, the three world
//! axes and the nine cross products of world axes with triangle edges.
//! Near-zero axes can never separate, so degenerate input biases toward
//! reporting contact.

use smallvec::SmallVec;

use super::primitives::{Aabb, BoxShape, Capsule, Contact, Triangle};
use crate::foundation::math::{Vec3, utils::axis};

/// Axes shorter than this (squared) are skipped by [`test_axis`]
pub const DEGENERATE_AXIS_SQ: f32 = 1e-6;

/// Normalized-axis threshold used by the depth-tracking kernels
pub(crate) const MIN_AXIS_SQ: f32 = 1e-8;

/// Segments shorter than this (squared) collapse to points
const DEGENERATE_SEGMENT_SQ: f32 = 1e-12;

/// Candidate axes list, one slot per SAT axis
pub(crate) type AxisList = SmallVec<[Vec3; 13]>;

/// The 13 raw (unnormalized) box-vs-triangle axes, degenerate ones included
pub fn box_triangle_axes(tri: &Triangle) -> [Vec3; 13] {
    let edges = tri.edges();
    let mut axes = [Vec3::zeros(); 13];
    axes[0] = tri.raw_normal();
    for i in 0..3 {
        axes[1 + i] = axis(i);
    }
    for (e, edge) in edges.iter().enumerate() {
        for i in 0..3 {
            axes[4 + e * 3 + i] = axis(i).cross(edge);
        }
    }
    axes
}

/// Unit-length SAT axes with degenerate ones dropped
pub(crate) fn normalized_box_triangle_axes(tri: &Triangle) -> AxisList {
    box_triangle_axes(tri)
        .iter()
        .filter(|a| a.norm_squared() > MIN_AXIS_SQ)
        .map(|a| a.normalize())
        .collect()
}

/// Project an AABB given by center and half extents onto `axis`.
///
/// `axis` need not be normalized; the interval is scaled accordingly.
pub fn project_aabb_onto_axis(center: &Vec3, half_size: &Vec3, axis: &Vec3) -> (f32, f32) {
    let c = center.dot(axis);
    let r = half_size.x * axis.x.abs() + half_size.y * axis.y.abs() + half_size.z * axis.z.abs();
    (c - r, c + r)
}

/// Project the triangle's vertices onto `axis`
pub fn project_triangle_onto_axis(tri: &Triangle, axis: &Vec3) -> (f32, f32) {
    let p0 = tri.v0.dot(axis);
    let p1 = tri.v1.dot(axis);
    let p2 = tri.v2.dot(axis);
    (p0.min(p1).min(p2), p0.max(p1).max(p2))
}

/// `true` unless `axis` proves the box and triangle are separated
pub fn test_axis(axis: &Vec3, center: &Vec3, half_size: &Vec3, tri: &Triangle) -> bool {
    if axis.norm_squared() < DEGENERATE_AXIS_SQ {
        return true;
    }
    let (box_min, box_max) = project_aabb_onto_axis(center, half_size, axis);
    let (tri_min, tri_max) = project_triangle_onto_axis(tri, axis);
    box_max >= tri_min && tri_max >= box_min
}

/// 13-axis SAT predicate for an AABB against a triangle
pub fn aabb_overlaps_triangle(aabb: &Aabb, tri: &Triangle) -> bool {
    let center = aabb.center();
    let half = aabb.half_size();
    box_triangle_axes(tri)
        .iter()
        .all(|a| test_axis(a, &center, &half, tri))
}

/// AABB vs triangle overlap with a contact on the triangle plane.
///
/// The contact normal is the triangle normal flipped toward the box center,
/// the point is the box center projected onto the plane. Depth is not
/// measured. Degenerate triangles never report contact.
pub fn intersect_aabb_with_triangle(aabb: &Aabb, tri: &Triangle) -> Option<Contact> {
    if !aabb_overlaps_triangle(aabb, tri) {
        return None;
    }
    let mut normal = tri.raw_normal().try_normalize(1e-12)?;
    let center = aabb.center();
    let dist = (center - tri.v0).dot(&normal);
    if dist < 0.0 {
        normal = -normal;
    }
    Some(Contact {
        point: center - normal * dist.abs(),
        normal,
        depth: 0.0,
    })
}

/// Box vs triangle SAT tracking the axis of minimum penetration.
///
/// The returned normal pushes the box out of the triangle; `depth` is the
/// overlap along it. `None` as soon as any axis separates (touching counts
/// as separated).
pub fn box_vs_triangle_overlap(shape: &BoxShape, tri: &Triangle) -> Option<Contact> {
    let mut best_depth = f32::MAX;
    let mut best_axis = Vec3::zeros();

    for a in normalized_box_triangle_axes(tri) {
        let (box_min, box_max) = project_aabb_onto_axis(&shape.center, &shape.half_size, &a);
        let (tri_min, tri_max) = project_triangle_onto_axis(tri, &a);

        let below = box_max - tri_min;
        let above = tri_max - box_min;
        if below <= 0.0 || above <= 0.0 {
            return None;
        }

        let depth = below.min(above);
        if depth < best_depth {
            best_depth = depth;
            best_axis = if below < above { -a } else { a };
        }
    }

    if best_depth == f32::MAX {
        return None;
    }

    let support = project_aabb_onto_axis(&Vec3::zeros(), &shape.half_size, &best_axis).1;
    Some(Contact {
        point: shape.center - best_axis * (support - best_depth * 0.5),
        normal: best_axis,
        depth: best_depth,
    })
}

/// Closest point to `p` on segment `a..b`
pub fn closest_point_on_segment(p: &Vec3, a: &Vec3, b: &Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < DEGENERATE_SEGMENT_SQ {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest point to `p` on the triangle, by Voronoi region
pub fn closest_point_on_triangle(p: &Vec3, tri: &Triangle) -> Vec3 {
    let (a, b, c) = (tri.v0, tri.v1, tri.v2);
    let ab = b - a;
    let ac = c - a;

    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = va + vb + vc;
    if denom.abs() < f32::EPSILON {
        // Degenerate triangle: fall back to the nearest edge
        return nearest_of(p, &[
            closest_point_on_segment(p, &a, &b),
            closest_point_on_segment(p, &b, &c),
            closest_point_on_segment(p, &c, &a),
        ]);
    }
    let inv = 1.0 / denom;
    let v = vb * inv;
    let w = vc * inv;
    a + ab * v + ac * w
}

/// Closest points between segments `p1..q1` and `p2..q2`.
///
/// Both parameters are clamped to `[0, 1]`; degenerate segments act as
/// points.
pub fn closest_points_between_segments(p1: &Vec3, q1: &Vec3, p2: &Vec3, q2: &Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    if a <= DEGENERATE_SEGMENT_SQ && e <= DEGENERATE_SEGMENT_SQ {
        return (*p1, *p2);
    }

    let (s, t) = if a <= DEGENERATE_SEGMENT_SQ {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= DEGENERATE_SEGMENT_SQ {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > DEGENERATE_SEGMENT_SQ {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

/// Closest points between segment `p..q` and a triangle: `(on_segment, on_triangle)`
pub fn closest_points_segment_triangle(p: &Vec3, q: &Vec3, tri: &Triangle) -> (Vec3, Vec3) {
    // Segment piercing the face
    if let Some(n) = tri.raw_normal().try_normalize(1e-12) {
        let dp = (p - tri.v0).dot(&n);
        let dq = (q - tri.v0).dot(&n);
        if dp * dq < 0.0 {
            let hit = p + (q - p) * (dp / (dp - dq));
            if tri.contains_coplanar_point(&hit, 1e-6) {
                return (hit, hit);
            }
        }
    }

    let mut best = (*p, closest_point_on_triangle(p, tri));
    let mut best_sq = (best.0 - best.1).norm_squared();
    let mut consider = |pair: (Vec3, Vec3)| {
        let d = (pair.0 - pair.1).norm_squared();
        if d < best_sq {
            best_sq = d;
            best = pair;
        }
    };

    consider((*q, closest_point_on_triangle(q, tri)));
    for i in 0..3 {
        let a = tri.vertex(i);
        let b = tri.vertex(i + 1);
        consider(closest_points_between_segments(p, q, &a, &b));
    }
    best
}

/// Capsule vs triangle contact.
///
/// The normal points from the triangle toward the capsule axis; `depth` is
/// the radius minus the axis-to-triangle distance.
pub fn intersect_capsule_with_triangle(capsule: &Capsule, tri: &Triangle) -> Option<Contact> {
    let face_normal = tri.raw_normal().try_normalize(1e-12)?;
    let (on_segment, on_triangle) = closest_points_segment_triangle(&capsule.start, &capsule.end, tri);
    let delta = on_segment - on_triangle;
    let dist = delta.norm();
    if dist > capsule.radius {
        return None;
    }

    let normal = if dist > 1e-6 {
        delta / dist
    } else {
        let mid = (capsule.start + capsule.end) * 0.5;
        if (mid - tri.v0).dot(&face_normal) < 0.0 {
            -face_normal
        } else {
            face_normal
        }
    };

    Some(Contact {
        point: on_triangle,
        normal,
        depth: capsule.radius - dist,
    })
}

fn nearest_of(p: &Vec3, candidates: &[Vec3]) -> Vec3 {
    candidates
        .iter()
        .copied()
        .min_by(|a, b| (a - p).norm_squared().total_cmp(&(b - p).norm_squared()))
        .unwrap_or(*p)
}
