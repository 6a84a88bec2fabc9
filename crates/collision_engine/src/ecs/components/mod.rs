//! Components consumed by the collision engine

pub mod transform;
pub mod collision;

pub use transform::TransformComponent;
pub use collision::{MeshColliderComponent, SubMesh, BoxColliderComponent};
