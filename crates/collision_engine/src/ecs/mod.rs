//! Minimal entity/component store
//!
//! Entities are generational handles into a [`World`] arena, so a stale
//! handle can never alias a newer entity. Only the components the collision
//! engine consumes are modelled.

pub mod entity;
pub mod world;
pub mod components;

pub use entity::Entity;
pub use world::{World, EntityRecord};
pub use components::{TransformComponent, MeshColliderComponent, SubMesh, BoxColliderComponent};
