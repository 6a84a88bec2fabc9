//! Physics error types

use crate::ecs::Entity;

/// Errors reported by registration and dynamic-tree maintenance.
///
/// Queries never fail; they return `None` or an empty list.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// The entity handle is stale or was never created
    #[error("unknown entity {0}")]
    UnknownEntity(Entity),

    /// The entity has no mesh collider to register
    #[error("entity '{0}' has no mesh collider")]
    MissingMeshCollider(String),

    /// Every submesh of the entity was empty
    #[error("entity '{0}' has no triangles to register")]
    EmptyMesh(String),

    /// The entity owns no registered geometry or dynamic proxy
    #[error("{0} is not registered")]
    NotRegistered(Entity),

    /// Dynamic tree node id out of range
    #[error("dynamic BVH node {0} does not exist")]
    InvalidProxy(usize),

    /// Dynamic tree node id refers to an internal node
    #[error("dynamic BVH node {0} is not a leaf")]
    NotALeaf(usize),
}

/// Result alias for physics operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;
