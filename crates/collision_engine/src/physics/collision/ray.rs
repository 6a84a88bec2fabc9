//! Ray kernels: slab test and Möller-Trumbore

use super::primitives::{Aabb, Ray, Triangle};
use crate::foundation::math::Vec3;

/// Direction components below this are treated as parallel to a slab
const PARALLEL_EPSILON: f32 = 1e-8;

/// Determinant threshold for the ray/triangle test
const TRIANGLE_EPSILON: f32 = 1e-6;

/// Slab test of the segment `origin + dir * t`, `t` in `[t_min, t_max]`.
///
/// Returns the clipped parameter interval when the segment touches the box.
/// A direction component that is (near) zero turns that axis into a
/// containment check on the origin.
pub fn ray_vs_aabb(origin: &Vec3, dir: &Vec3, t_min: f32, t_max: f32, aabb: &Aabb) -> Option<(f32, f32)> {
    let mut t_near = t_min;
    let mut t_far = t_max;

    for i in 0..3 {
        if dir[i].abs() < PARALLEL_EPSILON {
            if origin[i] < aabb.min[i] || origin[i] > aabb.max[i] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / dir[i];
        let mut t0 = (aabb.min[i] - origin[i]) * inv;
        let mut t1 = (aabb.max[i] - origin[i]) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }

        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }

    Some((t_near, t_far))
}

/// [`ray_vs_aabb`] for a [`Ray`]
pub fn ray_hits_aabb(ray: &Ray, aabb: &Aabb) -> bool {
    ray_vs_aabb(&ray.origin, &ray.dir, ray.t_min, ray.t_max, aabb).is_some()
}

/// Möller-Trumbore ray/triangle intersection.
///
/// Returns the hit parameter within `[t_min, t_max]` and the unit face
/// normal oriented against the ray. Parallel rays and degenerate triangles
/// miss.
pub fn ray_vs_triangle(ray: &Ray, tri: &Triangle) -> Option<(f32, Vec3)> {
    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;

    let h = ray.dir.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < TRIANGLE_EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - tri.v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * ray.dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    if t < ray.t_min || t > ray.t_max {
        return None;
    }

    let mut normal = edge1.cross(&edge2).try_normalize(1e-12)?;
    if normal.dot(&ray.dir) > 0.0 {
        normal = -normal;
    }
    Some((t, normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::zeros(), Vec3::repeat(1.0))
    }

    /// Marches the segment in small steps and checks containment
    fn brute_force_hits(origin: &Vec3, dir: &Vec3, t_min: f32, t_max: f32, aabb: &Aabb) -> Option<bool> {
        const STEPS: usize = 20_000;
        let grown = aabb.inflated(&Vec3::repeat(1e-3));
        let shrunk = aabb.inflated(&Vec3::repeat(-1e-3));
        let mut inside_grown = false;
        let mut inside_shrunk = false;
        for i in 0..=STEPS {
            let t = t_min + (t_max - t_min) * (i as f32 / STEPS as f32);
            let p = origin + dir * t;
            inside_grown |= grown.contains_point(&p);
            inside_shrunk |= shrunk.contains_point(&p);
        }
        // Ambiguous when the segment only grazes the boundary
        if inside_grown == inside_shrunk {
            Some(inside_grown)
        } else {
            None
        }
    }

    #[test]
    fn test_ray_through_box() {
        let (t0, t1) = ray_vs_aabb(&Vec3::new(-1.0, 0.5, 0.5), &Vec3::x(), 0.0, 10.0, &unit_box()).unwrap();
        assert_relative_eq!(t0, 1.0);
        assert_relative_eq!(t1, 2.0);
    }

    #[test]
    fn test_parallel_axis_is_containment_check() {
        assert!(ray_vs_aabb(&Vec3::new(-1.0, 0.5, 0.5), &Vec3::x(), 0.0, 10.0, &unit_box()).is_some());
        assert!(ray_vs_aabb(&Vec3::new(-1.0, 1.5, 0.5), &Vec3::x(), 0.0, 10.0, &unit_box()).is_none());
    }

    #[test]
    fn test_segment_too_short() {
        assert!(ray_vs_aabb(&Vec3::new(-1.0, 0.5, 0.5), &Vec3::x(), 0.0, 0.5, &unit_box()).is_none());
    }

    #[test]
    fn test_ray_vs_aabb_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut checked = 0;
        for _ in 0..500 {
            let min = Vec3::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
            let size = Vec3::new(rng.gen_range(0.1..2.0), rng.gen_range(0.1..2.0), rng.gen_range(0.1..2.0));
            let aabb = Aabb::new(min, min + size);
            let origin = Vec3::new(rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0));
            let dir = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            let Some(dir) = dir.try_normalize(1e-3) else { continue };
            let t_max = rng.gen_range(0.5..8.0);

            if let Some(expected) = brute_force_hits(&origin, &dir, 0.0, t_max, &aabb) {
                assert_eq!(ray_vs_aabb(&origin, &dir, 0.0, t_max, &aabb).is_some(), expected);
                checked += 1;
            }
        }
        assert!(checked > 400);
    }

    #[test]
    fn test_ray_vs_triangle_orients_normal() {
        let tri = Triangle::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let down = Ray::new(Vec3::new(0.2, 1.0, 0.2), Vec3::new(0.0, -1.0, 0.0), 10.0);
        let (t, normal) = ray_vs_triangle(&down, &tri).unwrap();
        assert_relative_eq!(t, 1.0);
        assert_relative_eq!(normal, Vec3::new(0.0, 1.0, 0.0));

        let up = Ray::new(Vec3::new(0.2, -1.0, 0.2), Vec3::new(0.0, 1.0, 0.0), 10.0);
        let (_, normal) = ray_vs_triangle(&up, &tri).unwrap();
        assert_relative_eq!(normal, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_ray_vs_triangle_respects_limits() {
        let tri = Triangle::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let short = Ray::new(Vec3::new(0.2, 1.0, 0.2), Vec3::new(0.0, -1.0, 0.0), 0.5);
        assert!(ray_vs_triangle(&short, &tri).is_none());
        let outside = Ray::new(Vec3::new(0.8, 1.0, 0.8), Vec3::new(0.0, -1.0, 0.0), 10.0);
        assert!(ray_vs_triangle(&outside, &tri).is_none());
        let parallel = Ray::new(Vec3::new(-1.0, 0.0, 0.2), Vec3::x(), 10.0);
        assert!(ray_vs_triangle(&parallel, &tri).is_none());
    }
}
