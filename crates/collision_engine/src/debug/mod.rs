//! Debug visualization side channel
//!
//! The collision engine emits wireframe shapes through the [`DebugDraw`]
//! trait. Nothing here renders; a host application forwards the recorded
//! shapes to its own renderer, or passes [`NullDebugDraw`].

pub mod draw;

pub use draw::{DebugDraw, DebugDrawSystem, DebugShape, NullDebugDraw, colors};

bitflags::bitflags! {
    /// Selects what [`CollisionEngine::draw_debug`](crate::physics::CollisionEngine::draw_debug) emits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DebugDrawFlags: u32 {
        /// Internal node bounds of static BVHs
        const NODES = 1 << 0;
        /// Leaf bounds of static BVHs
        const LEAVES = 1 << 1;
        /// Triangle wireframes
        const TRIANGLES = 1 << 2;
        /// Dynamic tree bounds
        const DYNAMIC = 1 << 3;
    }
}

impl Default for DebugDrawFlags {
    fn default() -> Self {
        Self::LEAVES | Self::DYNAMIC
    }
}
