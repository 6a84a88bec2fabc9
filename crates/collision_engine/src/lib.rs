//! # Collision Engine
//!
//! Static-mesh collision queries and collide-and-slide character movement.
//!
//! ## Features
//!
//! - **Static BVHs**: one SAH-built, flattened tree per registered submesh
//! - **Casts**: ray, box and sphere sweeps with progressive pruning
//! - **Overlaps**: SAT box-vs-triangle with minimum-penetration contacts
//! - **Dynamic broad phase**: incrementally refitted tree behind a RwLock
//! - **Movement**: collide-and-slide resolver and a Quake-style controller
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use collision_engine::prelude::*;
//!
//! fn main() -> Result<(), PhysicsError> {
//!     let mut world = World::new();
//!     let floor = world.create_entity("floor", TransformComponent::default());
//!     world.set_mesh_collider(floor, MeshColliderComponent::from_triangles("floor", vec![
//!         Triangle::new(Vec3::new(-5.0, 0.0, -5.0), Vec3::new(5.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 5.0)),
//!     ]));
//!
//!     let mut engine = CollisionEngine::default();
//!     engine.register_entity(&world, floor)?;
//!
//!     let hit = engine.ray_cast(&Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 10.0));
//!     assert!(hit.is_some());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod core;
pub mod ecs;
pub mod physics;
pub mod debug;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::{BvhSettings, MovementSettings, PhysicsConfig, SlideSettings},
        debug::{DebugDraw, DebugDrawFlags, DebugDrawSystem, NullDebugDraw},
        ecs::{BoxColliderComponent, Entity, MeshColliderComponent, SubMesh, TransformComponent, World},
        foundation::math::{units::{hu_to_m, m_to_hu}, Vec3},
        physics::{
            Aabb, BoxShape, CharacterController, CollisionEngine, Hit, MoveInput, PhysicsError,
            PhysicsResult, Ray, SlideOutcome, SlideResolver, Triangle,
        },
    };
}
