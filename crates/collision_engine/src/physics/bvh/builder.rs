//! Top-down SAH builder for [`StaticBvh`]
//!
//! Each node is split along the longest axis of its centroid bounds at the
//! best of `sah_buckets` bucket boundaries. When every centroid falls on one
//! side (coincident or degenerate input) the range is split at the median
//! instead. Construction is deterministic for a given triangle order.

use log::trace;

use super::{FlatNode, StaticBvh};
use crate::core::BvhSettings;
use crate::physics::collision::{Aabb, Triangle};
use crate::foundation::math::Vec3;

/// Relative cost of one traversal step against one triangle test
const TRAVERSAL_COST: f32 = 0.125;

#[derive(Debug, Clone, Copy)]
struct PrimInfo {
    bounds: Aabb,
    centroid: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    bounds: Aabb,
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            count: 0,
            bounds: Aabb::empty(),
        }
    }
}

/// SAH BVH builder
#[derive(Debug, Clone, Default)]
pub struct BvhBuilder {
    settings: BvhSettings,
}

impl BvhBuilder {
    /// Create a builder
    pub fn new(settings: BvhSettings) -> Self {
        Self { settings }
    }

    /// Build a tree over `triangles`; indices in the result are local
    /// (`0..triangles.len()`)
    pub fn build(&self, triangles: &[Triangle]) -> StaticBvh {
        if triangles.is_empty() {
            return StaticBvh::default();
        }

        let infos: Vec<PrimInfo> = triangles
            .iter()
            .map(|tri| PrimInfo {
                bounds: tri.bounds(),
                centroid: tri.center(),
            })
            .collect();

        let mut bvh = StaticBvh {
            nodes: Vec::with_capacity(triangles.len() * 2),
            tri_indices: (0..triangles.len() as u32).collect(),
        };
        bvh.nodes.push(FlatNode::leaf(Aabb::empty(), 0, 0));
        self.subdivide(&mut bvh, &infos, 0, 0, triangles.len());

        trace!(
            "Built BVH over {} triangles: {} nodes, depth {}",
            triangles.len(),
            bvh.nodes.len(),
            bvh.depth()
        );
        bvh
    }

    fn subdivide(&self, bvh: &mut StaticBvh, infos: &[PrimInfo], node_index: usize, start: usize, end: usize) {
        let mut bounds = Aabb::empty();
        let mut centroid_bounds = Aabb::empty();
        for &prim in &bvh.tri_indices[start..end] {
            let info = &infos[prim as usize];
            bounds.expand(&info.bounds);
            centroid_bounds.expand_point(&info.centroid);
        }

        let count = end - start;
        let leaf_size = self.settings.leaf_size.max(1) as usize;
        if count <= leaf_size {
            bvh.nodes[node_index] = FlatNode::leaf(bounds, start as u32, count as u32);
            return;
        }

        let axis = centroid_bounds.longest_axis();
        let sah_mid = self
            .find_split(bvh, infos, start, end, axis, &centroid_bounds)
            .map(|split| {
                start + partition(&mut bvh.tri_indices[start..end], |prim| {
                    infos[prim as usize].centroid[axis] < split
                })
            });
        let mid = match sah_mid {
            Some(mid) if mid > start && mid < end => mid,
            _ => {
                bvh.tri_indices[start..end].select_nth_unstable_by(count / 2, |a, b| {
                    infos[*a as usize].centroid[axis].total_cmp(&infos[*b as usize].centroid[axis])
                });
                start + count / 2
            }
        };

        let left = bvh.nodes.len();
        bvh.nodes.push(FlatNode::leaf(Aabb::empty(), 0, 0));
        let right = bvh.nodes.len();
        bvh.nodes.push(FlatNode::leaf(Aabb::empty(), 0, 0));
        bvh.nodes[node_index] = FlatNode::internal(bounds, left as u32, right as u32);

        self.subdivide(bvh, infos, left, start, mid);
        self.subdivide(bvh, infos, right, mid, end);
    }

    /// Best bucket boundary along `axis`, `None` when the centroids have no
    /// extent or no boundary separates them
    fn find_split(
        &self,
        bvh: &StaticBvh,
        infos: &[PrimInfo],
        start: usize,
        end: usize,
        axis: usize,
        centroid_bounds: &Aabb,
    ) -> Option<f32> {
        let bucket_count = self.settings.sah_buckets.max(2);
        let min = centroid_bounds.min[axis];
        let extent = centroid_bounds.max[axis] - min;
        if extent <= f32::EPSILON {
            return None;
        }

        let scale = bucket_count as f32 / extent;
        let mut buckets = vec![Bucket::default(); bucket_count];
        for &prim in &bvh.tri_indices[start..end] {
            let info = &infos[prim as usize];
            let slot = (((info.centroid[axis] - min) * scale) as usize).min(bucket_count - 1);
            buckets[slot].count += 1;
            buckets[slot].bounds.expand(&info.bounds);
        }

        let mut best: Option<(usize, f32)> = None;
        for split in 0..bucket_count - 1 {
            let (left, right) = buckets.split_at(split + 1);
            let (left_count, left_bounds) = accumulate(left);
            let (right_count, right_bounds) = accumulate(right);
            if left_count == 0 || right_count == 0 {
                continue;
            }
            let cost = TRAVERSAL_COST
                + left_count as f32 * left_bounds.surface_area()
                + right_count as f32 * right_bounds.surface_area();
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((split, cost));
            }
        }

        best.map(|(split, _)| min + extent * (split + 1) as f32 / bucket_count as f32)
    }
}

fn accumulate(buckets: &[Bucket]) -> (u32, Aabb) {
    buckets.iter().fold((0, Aabb::empty()), |(count, bounds), bucket| {
        (count + bucket.count, bounds.union(&bucket.bounds))
    })
}

/// In-place partition; returns the number of elements satisfying `pred`,
/// which end up first
fn partition(slice: &mut [u32], pred: impl Fn(u32) -> bool) -> usize {
    let mut first_false = 0;
    for i in 0..slice.len() {
        if pred(slice[i]) {
            slice.swap(first_false, i);
            first_false += 1;
        }
    }
    first_false
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn grid(n: usize) -> Vec<Triangle> {
        let mut tris = Vec::new();
        for x in 0..n {
            for z in 0..n {
                let o = Vec3::new(x as f32, 0.0, z as f32);
                tris.push(Triangle::new(o, o + Vec3::x(), o + Vec3::z()));
                tris.push(Triangle::new(o + Vec3::x(), o + Vec3::new(1.0, 0.0, 1.0), o + Vec3::z()));
            }
        }
        tris
    }

    /// Structural checks: every index referenced exactly once, leaves within
    /// the size limit, parents contain children
    fn check_tree(bvh: &StaticBvh, triangles: &[Triangle], leaf_size: u32) {
        let mut seen = vec![0u32; triangles.len()];
        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            let node = &bvh.nodes()[index as usize];
            if node.is_leaf() {
                assert!(node.prim_count <= leaf_size);
                for &prim in &bvh.tri_indices()[node.prim_range()] {
                    seen[prim as usize] += 1;
                    assert!(node.bounds.contains(&triangles[prim as usize].bounds()));
                }
            } else {
                for child in [node.left_first, node.right_first] {
                    assert!(node.bounds.contains(&bvh.nodes()[child as usize].bounds));
                    stack.push(child);
                }
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_empty_input_builds_empty_tree() {
        let bvh = BvhBuilder::default().build(&[]);
        assert!(bvh.is_empty());
        assert!(bvh.root_bounds().is_none());
        assert_eq!(bvh.depth(), 0);
    }

    #[test]
    fn test_single_leaf() {
        let tris = grid(1);
        let bvh = BvhBuilder::default().build(&tris);
        assert_eq!(bvh.nodes().len(), 1);
        assert!(bvh.nodes()[0].is_leaf());
        assert_eq!(bvh.nodes()[0].prim_count, 2);
    }

    #[test]
    fn test_grid_tree_is_well_formed() {
        let tris = grid(16);
        let bvh = BvhBuilder::default().build(&tris);
        check_tree(&bvh, &tris, 4);
        assert!(bvh.depth() < 20);
        assert_eq!(bvh.leaves().map(|leaf| leaf.prim_count as usize).sum::<usize>(), tris.len());
    }

    #[test]
    fn test_coincident_centroids_fall_back_to_median() {
        let tri = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::z());
        let tris = vec![tri; 37];
        let bvh = BvhBuilder::new(BvhSettings::default().with_leaf_size(2)).build(&tris);
        check_tree(&bvh, &tris, 2);
    }

    #[test]
    fn test_random_soup_and_determinism() {
        let mut rng = StdRng::seed_from_u64(42);
        let tris: Vec<Triangle> = (0..500)
            .map(|_| {
                let o = Vec3::new(rng.gen_range(-50.0..50.0), rng.gen_range(-5.0..5.0), rng.gen_range(-50.0..50.0));
                Triangle::new(o, o + Vec3::new(rng.gen_range(0.1..2.0), 0.0, 0.0), o + Vec3::new(0.0, rng.gen_range(0.1..2.0), 0.5))
            })
            .collect();
        let builder = BvhBuilder::new(BvhSettings::default().with_leaf_size(3).with_sah_buckets(8));
        let first = builder.build(&tris);
        check_tree(&first, &tris, 3);
        assert_eq!(first, builder.build(&tris));
    }
}
