//! Specialized collections for collision bookkeeping

pub use slotmap::{SlotMap, SecondaryMap, Key, KeyData};
pub use smallvec::{SmallVec, smallvec};

/// Generational arena keyed by a typed handle
pub type HandleMap<K, V> = SlotMap<K, V>;

/// Inline capacity of the explicit traversal stacks.
///
/// Deeper trees spill to the heap instead of overflowing.
pub const TRAVERSAL_STACK_INLINE: usize = 64;

/// Traversal stack of node indices
pub type NodeStack = SmallVec<[u32; TRAVERSAL_STACK_INLINE]>;
