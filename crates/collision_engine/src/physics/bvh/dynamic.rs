//! Incremental AABB tree for moving proxies
//!
//! Leaves carry a caller-supplied payload (`T`, an object index or handle).
//! Insertion descends toward the child whose volume grows least and splices
//! a new parent in at the chosen leaf; there is no rebalancing. Removal
//! keeps the node array compact by swapping with the last slot, so node ids
//! can move: every move is reported as a [`Relocation`].
//!
//! Mutation takes the internal lock exclusively, queries take it shared.

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::foundation::collections::TRAVERSAL_STACK_INLINE;
use crate::physics::collision::Aabb;
use crate::physics::error::{PhysicsError, PhysicsResult};

/// Index of a node in the tree
pub type NodeId = usize;

/// A node that moved from one slot to another during removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// Old id
    pub from: NodeId,
    /// New id
    pub to: NodeId,
}

/// Relocations caused by one removal, in application order
pub type Relocations = SmallVec<[Relocation; 2]>;

#[derive(Debug, Clone)]
struct DynamicNode<T> {
    bounds: Aabb,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    object: Option<T>,
}

impl<T> DynamicNode<T> {
    fn leaf(bounds: Aabb, object: T) -> Self {
        Self {
            bounds,
            parent: None,
            left: None,
            right: None,
            object: Some(object),
        }
    }

    fn is_leaf(&self) -> bool {
        self.object.is_some()
    }
}

#[derive(Debug)]
struct Tree<T> {
    nodes: Vec<DynamicNode<T>>,
    root: Option<NodeId>,
}

impl<T: Copy> Tree<T> {
    fn check_leaf(&self, node: NodeId) -> PhysicsResult<()> {
        match self.nodes.get(node) {
            None => Err(PhysicsError::InvalidProxy(node)),
            Some(n) if !n.is_leaf() => Err(PhysicsError::NotALeaf(node)),
            Some(_) => Ok(()),
        }
    }

    fn children_bounds(&self, node: NodeId) -> Option<Aabb> {
        let n = &self.nodes[node];
        match (n.left, n.right) {
            (Some(l), Some(r)) => Some(self.nodes[l].bounds.union(&self.nodes[r].bounds)),
            _ => None,
        }
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        let p = &mut self.nodes[parent];
        if p.left == Some(old) {
            p.left = Some(new);
        } else if p.right == Some(old) {
            p.right = Some(new);
        }
    }

    /// Recompute bounds from `start` to the root, stopping early once a box
    /// is unchanged
    fn refit(&mut self, start: Option<NodeId>) {
        let mut current = start;
        while let Some(index) = current {
            let Some(bounds) = self.children_bounds(index) else {
                break;
            };
            if bounds == self.nodes[index].bounds {
                break;
            }
            self.nodes[index].bounds = bounds;
            current = self.nodes[index].parent;
        }
    }

    fn create_new_parent(&mut self, sibling: NodeId, leaf: NodeId) {
        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.nodes.len();
        self.nodes.push(DynamicNode {
            bounds: self.nodes[sibling].bounds.union(&self.nodes[leaf].bounds),
            parent: old_parent,
            left: Some(sibling),
            right: Some(leaf),
            object: None,
        });
        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);

        match old_parent {
            Some(parent) => {
                self.replace_child(parent, sibling, new_parent);
                self.refit(Some(parent));
            }
            None => self.root = Some(new_parent),
        }
    }

    /// Swap-remove a detached node, re-pointing whatever referenced the node
    /// that was moved into its slot
    fn swap_remove_node(&mut self, id: NodeId) -> Option<Relocation> {
        let last = self.nodes.len() - 1;
        self.nodes.swap_remove(id);
        if id == last {
            return None;
        }

        let (parent, left, right) = {
            let moved = &self.nodes[id];
            (moved.parent, moved.left, moved.right)
        };
        match parent {
            Some(p) => self.replace_child(p, last, id),
            None => {
                if self.root == Some(last) {
                    self.root = Some(id);
                }
            }
        }
        for child in [left, right].into_iter().flatten() {
            self.nodes[child].parent = Some(id);
        }
        Some(Relocation { from: last, to: id })
    }
}

/// Volume added to `existing` if `incoming` were merged into it
pub fn calculate_growth(existing: &Aabb, incoming: &Aabb) -> f32 {
    existing.union(incoming).volume() - existing.volume()
}

/// Dynamic AABB tree guarded by a reader/writer lock
#[derive(Debug)]
pub struct DynamicBvh<T = usize> {
    tree: RwLock<Tree<T>>,
}

impl<T: Copy> Default for DynamicBvh<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> DynamicBvh<T> {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Tree {
                nodes: Vec::new(),
                root: None,
            }),
        }
    }

    /// Insert a leaf for `object`; returns its node id
    pub fn insert_object(&self, aabb: Aabb, object: T) -> NodeId {
        let mut tree = self.tree.write();
        let leaf = tree.nodes.len();
        tree.nodes.push(DynamicNode::leaf(aabb, object));

        let Some(mut current) = tree.root else {
            tree.root = Some(leaf);
            return leaf;
        };

        while !tree.nodes[current].is_leaf() {
            let node = &tree.nodes[current];
            let (Some(left), Some(right)) = (node.left, node.right) else {
                break;
            };
            let left_growth = calculate_growth(&tree.nodes[left].bounds, &aabb);
            let right_growth = calculate_growth(&tree.nodes[right].bounds, &aabb);
            current = if left_growth < right_growth { left } else { right };
        }

        tree.create_new_parent(current, leaf);
        leaf
    }

    /// Remove a leaf.
    ///
    /// The sibling takes its parent's place; removing the last leaf empties
    /// the tree. Returns the node moves the caller must apply, in order, to
    /// any ids it holds.
    pub fn remove_object(&self, node: NodeId) -> PhysicsResult<Relocations> {
        let mut tree = self.tree.write();
        tree.check_leaf(node)?;
        let mut relocations = Relocations::new();

        let Some(parent) = tree.nodes[node].parent else {
            tree.nodes.clear();
            tree.root = None;
            return Ok(relocations);
        };

        let sibling = if tree.nodes[parent].left == Some(node) {
            tree.nodes[parent].right
        } else {
            tree.nodes[parent].left
        };
        let sibling = sibling.ok_or(PhysicsError::InvalidProxy(parent))?;
        let grandparent = tree.nodes[parent].parent;

        tree.nodes[sibling].parent = grandparent;
        match grandparent {
            Some(g) => {
                tree.replace_child(g, parent, sibling);
                tree.refit(Some(g));
            }
            None => tree.root = Some(sibling),
        }

        let (high, low) = if node > parent { (node, parent) } else { (parent, node) };
        relocations.extend(tree.swap_remove_node(high));
        relocations.extend(tree.swap_remove_node(low));
        Ok(relocations)
    }

    /// Move a leaf to new bounds and refit its ancestors
    pub fn update_object(&self, node: NodeId, aabb: Aabb) -> PhysicsResult<()> {
        let mut tree = self.tree.write();
        tree.check_leaf(node)?;
        tree.nodes[node].bounds = aabb;
        let parent = tree.nodes[node].parent;
        tree.refit(parent);
        Ok(())
    }

    /// Payloads of every leaf whose bounds intersect `aabb`
    pub fn query_overlaps(&self, aabb: &Aabb) -> Vec<T> {
        let tree = self.tree.read();
        let mut results = Vec::new();
        let Some(root) = tree.root else {
            return results;
        };

        let mut stack: SmallVec<[NodeId; TRAVERSAL_STACK_INLINE]> = SmallVec::new();
        stack.push(root);
        while let Some(index) = stack.pop() {
            let node = &tree.nodes[index];
            if !node.bounds.intersects(aabb) {
                continue;
            }
            if let Some(object) = node.object {
                results.push(object);
            } else {
                stack.extend(node.left);
                stack.extend(node.right);
            }
        }
        results
    }

    /// Bounds stored at `node`
    pub fn bounds(&self, node: NodeId) -> Option<Aabb> {
        self.tree.read().nodes.get(node).map(|n| n.bounds)
    }

    /// Payload stored at `node` (leaves only)
    pub fn object(&self, node: NodeId) -> Option<T> {
        self.tree.read().nodes.get(node).and_then(|n| n.object)
    }

    /// Root bounds
    pub fn root_bounds(&self) -> Option<Aabb> {
        let tree = self.tree.read();
        tree.root.map(|root| tree.nodes[root].bounds)
    }

    /// Bounds and leaf flag of every node, for debug drawing
    pub fn node_bounds(&self) -> Vec<(Aabb, bool)> {
        self.tree
            .read()
            .nodes
            .iter()
            .map(|n| (n.bounds, n.is_leaf()))
            .collect()
    }

    /// Total node count (leaves and internal)
    pub fn node_count(&self) -> usize {
        self.tree.read().nodes.len()
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.tree.read().nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// `true` when no leaves exist
    pub fn is_empty(&self) -> bool {
        self.tree.read().root.is_none()
    }

    /// Drop every node
    pub fn clear(&self) {
        let mut tree = self.tree.write();
        tree.nodes.clear();
        tree.root = None;
    }
}
