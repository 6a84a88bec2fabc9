//! Physics module for collision queries and character movement
//!
//! Static level geometry is registered with a [`CollisionEngine`], which
//! keeps one SAH-built BVH per submesh and answers ray, box and sphere casts
//! plus box overlaps. [`SlideResolver`] and [`CharacterController`] build
//! collide-and-slide movement on top of those queries.

pub mod bvh;
pub mod cast;
pub mod collision;
pub mod engine;
pub mod error;
pub mod movement;
pub mod slide;

#[cfg(test)]
mod tests;

pub use bvh::{BvhBuilder, DynamicBvh, FlatNode, NodeId, Relocation, StaticBvh};
pub use cast::{cast_bvh, cast_linear, CastKind};
pub use collision::{Aabb, BoxShape, Capsule, Contact, Hit, Ray, Sphere, Triangle};
pub use engine::{CollisionEngine, RegisteredBvh};
pub use error::{PhysicsError, PhysicsResult};
pub use movement::{CharacterController, MoveInput};
pub use slide::{clip_to_planes, SlideOutcome, SlideResolver};
