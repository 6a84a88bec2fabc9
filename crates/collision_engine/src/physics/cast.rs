//! Shape casts against registered BVHs
//!
//! A cast is a shape ([`CastKind`]) moved from `start` along a unit `dir`
//! for `length` world units. Traversal runs in two phases:
//!
//! 1. **Broad phase**: each BVH's root bounds, Minkowski-expanded by the
//!    caster, is ray-tested against the whole segment.
//! 2. **Narrow phase**: surviving trees are walked depth first with an
//!    explicit stack. Node bounds are re-tested against a segment clipped to
//!    the best hit so far, so every improvement prunes the rest of the walk.
//!
//! Box expansion is exact for axis-aligned bounds; sphere expansion by the
//! radius is conservative (the corners of the expanded box over-approximate
//! the rounded Minkowski sum) and only costs extra triangle tests.

use smallvec::SmallVec;

use super::bvh::StaticBvh;
use super::collision::{
    ray_vs_aabb, ray_vs_triangle, swept_aabb_vs_triangle, swept_sphere_vs_triangle, Aabb, BoxShape,
    Hit, Ray, Triangle,
};
use crate::foundation::collections::NodeStack;
use crate::foundation::math::Vec3;

/// Extra margin on sphere expansion so grazing contacts survive the bounds test
const SPHERE_MARGIN: f32 = 1e-6;

/// What is being swept
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CastKind {
    /// A point; hits closer than `t_min` are ignored
    Ray {
        /// Near limit along the ray
        t_min: f32,
    },
    /// An axis-aligned box centered on the cast start
    Box {
        /// Half extents
        half_size: Vec3,
    },
    /// A sphere centered on the cast start
    Sphere {
        /// Radius
        radius: f32,
    },
}

impl CastKind {
    /// Grow node bounds by the caster's extent
    pub fn expand_node(&self, bounds: &Aabb) -> Aabb {
        match self {
            Self::Ray { .. } => *bounds,
            Self::Box { half_size } => bounds.inflated(half_size),
            Self::Sphere { radius } => bounds.inflated(&Vec3::repeat(radius + SPHERE_MARGIN)),
        }
    }

    /// Sweep against one triangle; returns the travelled distance (world
    /// units, `<= length`) and the contact normal
    pub fn test_triangle(&self, start: &Vec3, dir: &Vec3, length: f32, tri: &Triangle) -> Option<(f32, Vec3)> {
        match self {
            Self::Ray { t_min } => {
                let ray = Ray::new(*start, *dir, length).with_t_min(*t_min);
                ray_vs_triangle(&ray, tri)
            }
            Self::Box { half_size } => {
                let shape = BoxShape::new(*start, *half_size);
                swept_aabb_vs_triangle(&shape, &(dir * length), tri).map(|(toi, n)| (toi * length, n))
            }
            Self::Sphere { radius } => {
                swept_sphere_vs_triangle(start, *radius, &(dir * length), tri).map(|(toi, n)| (toi * length, n))
            }
        }
    }
}

/// Nearest hit across `bvhs`.
///
/// `dir` must be unit length and `length` positive; `triangles` is the
/// buffer the BVHs' indices point into. Only hits strictly closer than
/// `length` count.
pub fn cast_bvh<'a>(
    kind: &CastKind,
    start: &Vec3,
    dir: &Vec3,
    length: f32,
    bvhs: impl IntoIterator<Item = &'a StaticBvh>,
    triangles: &[Triangle],
) -> Option<Hit> {
    let candidates: SmallVec<[&StaticBvh; 16]> = bvhs
        .into_iter()
        .filter(|bvh| {
            bvh.root_bounds().is_some_and(|root| {
                ray_vs_aabb(start, dir, 0.0, length, &kind.expand_node(&root)).is_some()
            })
        })
        .collect();

    let mut best_dist = length;
    let mut best: Option<(u32, Vec3)> = None;
    let mut stack = NodeStack::new();

    for bvh in candidates {
        stack.clear();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &bvh.nodes[index as usize];
            let bounds = kind.expand_node(&node.bounds);
            if ray_vs_aabb(start, dir, 0.0, best_dist, &bounds).is_none() {
                continue;
            }

            if !node.is_leaf() {
                stack.push(node.right_first);
                stack.push(node.left_first);
                continue;
            }

            for &tri_index in &bvh.tri_indices[node.prim_range()] {
                let tri = &triangles[tri_index as usize];
                if let Some((dist, normal)) = kind.test_triangle(start, dir, length, tri) {
                    if dist < best_dist {
                        best_dist = dist;
                        best = Some((tri_index, normal));
                    }
                }
            }
        }
    }

    best.map(|(tri_index, normal)| Hit {
        t: best_dist,
        pos: start + dir * best_dist,
        normal,
        tri_index,
        depth: 0.0,
    })
}

/// Nearest hit by testing every triangle, without acceleration
pub fn cast_linear(kind: &CastKind, start: &Vec3, dir: &Vec3, length: f32, triangles: &[Triangle]) -> Option<Hit> {
    let mut best: Option<Hit> = None;
    for (index, tri) in triangles.iter().enumerate() {
        let Some((dist, normal)) = kind.test_triangle(start, dir, length, tri) else {
            continue;
        };
        if dist < best.map_or(length, |hit| hit.t) {
            best = Some(Hit {
                t: dist,
                pos: start + dir * dist,
                normal,
                tri_index: index as u32,
                depth: 0.0,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::bvh::BvhBuilder;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn random_soup(rng: &mut StdRng, count: usize) -> Vec<Triangle> {
        (0..count)
            .map(|_| {
                let o = Vec3::new(rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0));
                let a = Vec3::new(rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5));
                let b = Vec3::new(rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5));
                Triangle::new(o, o + a, o + b)
            })
            .collect()
    }

    fn random_dir(rng: &mut StdRng) -> Vec3 {
        loop {
            let v = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            if let Some(dir) = v.try_normalize(0.1) {
                return dir;
            }
        }
    }

    fn check_against_linear(kind: CastKind, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let triangles = random_soup(&mut rng, 300);
        let bvh = BvhBuilder::default().build(&triangles);
        let mut hits = 0;

        for _ in 0..300 {
            let start = Vec3::new(rng.gen_range(-12.0..12.0), rng.gen_range(-12.0..12.0), rng.gen_range(-12.0..12.0));
            let dir = random_dir(&mut rng);
            let length = rng.gen_range(1.0..25.0);

            let fast = cast_bvh(&kind, &start, &dir, length, [&bvh], &triangles);
            let slow = cast_linear(&kind, &start, &dir, length, &triangles);
            match (fast, slow) {
                (Some(a), Some(b)) => {
                    assert_relative_eq!(a.t, b.t, epsilon = 1e-4);
                    hits += 1;
                }
                (None, None) => {}
                (a, b) => panic!("{kind:?}: bvh {a:?} vs linear {b:?}"),
            }
        }
        assert!(hits > 20, "{kind:?}: only {hits} hits");
    }

    #[test]
    fn test_ray_cast_matches_linear() {
        check_against_linear(CastKind::Ray { t_min: 0.0 }, 1);
    }

    #[test]
    fn test_box_cast_matches_linear() {
        check_against_linear(CastKind::Box { half_size: Vec3::new(0.4, 0.9, 0.3) }, 2);
    }

    #[test]
    fn test_sphere_cast_matches_linear() {
        check_against_linear(CastKind::Sphere { radius: 0.6 }, 3);
    }

    #[test]
    fn test_expand_node() {
        let bounds = Aabb::new(Vec3::zeros(), Vec3::repeat(1.0));
        assert_eq!(CastKind::Ray { t_min: 0.0 }.expand_node(&bounds), bounds);
        let grown = CastKind::Box { half_size: Vec3::new(0.5, 1.0, 2.0) }.expand_node(&bounds);
        assert_eq!(grown.min, Vec3::new(-0.5, -1.0, -2.0));
        assert_eq!(grown.max, Vec3::new(1.5, 2.0, 3.0));
        let sphere = CastKind::Sphere { radius: 0.25 }.expand_node(&bounds);
        assert!(sphere.min.x < -0.25 && sphere.max.y > 1.25);
    }

    #[test]
    fn test_multiple_trees_nearest_wins() {
        let near = vec![Triangle::new(Vec3::new(-1.0, 2.0, -1.0), Vec3::new(1.0, 2.0, -1.0), Vec3::new(0.0, 2.0, 1.0))];
        let far = vec![Triangle::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0))];
        let builder = BvhBuilder::default();
        let mut far_bvh = builder.build(&far);
        let near_bvh = builder.build(&near);
        // far triangle lives at index 1 of the shared buffer
        far_bvh.offset_indices(1);
        let triangles = [near[0], far[0]];

        let hit = cast_bvh(&CastKind::Ray { t_min: 0.0 }, &Vec3::new(0.0, 5.0, 0.0), &Vec3::new(0.0, -1.0, 0.0), 10.0, [&far_bvh, &near_bvh], &triangles).unwrap();
        assert_eq!(hit.tri_index, 0);
        assert_relative_eq!(hit.t, 3.0);
    }
}
