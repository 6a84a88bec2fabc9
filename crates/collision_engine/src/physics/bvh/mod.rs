//! Bounding volume hierarchies
//!
//! Two variants:
//! - [`StaticBvh`]: flat, read-only tree built once per registered submesh by
//!   [`BvhBuilder`]
//! - [`DynamicBvh`]: incrementally maintained tree for moving proxies

pub mod builder;
pub mod dynamic;

pub use builder::BvhBuilder;
pub use dynamic::{DynamicBvh, NodeId, Relocation};

use crate::foundation::collections::NodeStack;
use super::collision::Aabb;

/// Node of a [`StaticBvh`].
///
/// Internal nodes have `prim_count == 0` and child indices in `left_first`
/// / `right_first`. Leaves have `prim_count > 0` and `left_first` indexes
/// the first entry of their run in the triangle-index array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatNode {
    /// Bounds of everything below this node
    pub bounds: Aabb,
    /// Left child, or first primitive for leaves
    pub left_first: u32,
    /// Right child (internal nodes only)
    pub right_first: u32,
    /// Primitive count, 0 for internal nodes
    pub prim_count: u32,
}

impl FlatNode {
    /// A leaf over `count` primitives starting at `first`
    pub fn leaf(bounds: Aabb, first: u32, count: u32) -> Self {
        Self {
            bounds,
            left_first: first,
            right_first: 0,
            prim_count: count,
        }
    }

    /// An internal node
    pub fn internal(bounds: Aabb, left: u32, right: u32) -> Self {
        Self {
            bounds,
            left_first: left,
            right_first: right,
            prim_count: 0,
        }
    }

    /// `true` for leaves
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.prim_count > 0
    }

    /// Range into the triangle-index array (leaves only)
    #[inline]
    pub fn prim_range(&self) -> std::ops::Range<usize> {
        let first = self.left_first as usize;
        first..first + self.prim_count as usize
    }
}

/// Flat static BVH: nodes (root at index 0) plus the permuted triangle
/// indices the leaves point into
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticBvh {
    pub(crate) nodes: Vec<FlatNode>,
    pub(crate) tri_indices: Vec<u32>,
}

impl StaticBvh {
    /// Node array, root first
    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    /// Triangle indices referenced by the leaves
    pub fn tri_indices(&self) -> &[u32] {
        &self.tri_indices
    }

    /// `true` when built over no triangles
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root bounds, `None` for an empty tree
    pub fn root_bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|node| node.bounds)
    }

    /// Add `offset` to every triangle index
    pub(crate) fn offset_indices(&mut self, offset: u32) {
        for index in &mut self.tri_indices {
            *index += offset;
        }
    }

    /// Shift indices at or above `start` down by `count`
    pub(crate) fn shift_indices_down(&mut self, start: u32, count: u32) {
        for index in &mut self.tri_indices {
            if *index >= start {
                *index -= count;
            }
        }
    }

    /// Longest root-to-leaf path, counted in nodes
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack: smallvec::SmallVec<[(u32, usize); 64]> = smallvec::smallvec![(0, 1)];
        while let Some((index, depth)) = stack.pop() {
            let node = &self.nodes[index as usize];
            max_depth = max_depth.max(depth);
            if !node.is_leaf() {
                stack.push((node.left_first, depth + 1));
                stack.push((node.right_first, depth + 1));
            }
        }
        max_depth
    }

    /// Leaf nodes in depth-first order
    pub fn leaves(&self) -> impl Iterator<Item = &FlatNode> + '_ {
        let mut stack = NodeStack::new();
        if !self.nodes.is_empty() {
            stack.push(0);
        }
        std::iter::from_fn(move || {
            while let Some(index) = stack.pop() {
                let node = &self.nodes[index as usize];
                if node.is_leaf() {
                    return Some(node);
                }
                stack.push(node.right_first);
                stack.push(node.left_first);
            }
            None
        })
    }
}
