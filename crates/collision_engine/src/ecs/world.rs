//! ECS World implementation

use log::debug;

use super::{Entity, TransformComponent, MeshColliderComponent, BoxColliderComponent};
use crate::foundation::collections::HandleMap;

/// Per-entity component data
#[derive(Debug, Clone, Default)]
pub struct EntityRecord {
    /// Display name
    pub name: String,
    /// Placement
    pub transform: TransformComponent,
    /// Static triangle geometry, if any
    pub mesh_collider: Option<MeshColliderComponent>,
    /// Actor hull, if any
    pub box_collider: Option<BoxColliderComponent>,
}

/// ECS World containing all entities and their components
#[derive(Debug, Default)]
pub struct World {
    entities: HandleMap<Entity, EntityRecord>,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entity at `transform`
    pub fn create_entity(&mut self, name: impl Into<String>, transform: TransformComponent) -> Entity {
        let name = name.into();
        let entity = self.entities.insert(EntityRecord {
            name,
            transform,
            ..EntityRecord::default()
        });
        debug!("Created {} '{}'", entity, self.entities[entity].name);
        entity
    }

    /// Destroy an entity; returns its components if it was alive
    pub fn destroy_entity(&mut self, entity: Entity) -> Option<EntityRecord> {
        self.entities.remove(entity)
    }

    /// Attach a mesh collider
    pub fn set_mesh_collider(&mut self, entity: Entity, collider: MeshColliderComponent) -> bool {
        self.entities
            .get_mut(entity)
            .map(|record| record.mesh_collider = Some(collider))
            .is_some()
    }

    /// Attach a box collider
    pub fn set_box_collider(&mut self, entity: Entity, collider: BoxColliderComponent) -> bool {
        self.entities
            .get_mut(entity)
            .map(|record| record.box_collider = Some(collider))
            .is_some()
    }

    /// Component data for an entity
    pub fn get(&self, entity: Entity) -> Option<&EntityRecord> {
        self.entities.get(entity)
    }

    /// Mutable transform access
    pub fn transform_mut(&mut self, entity: Entity) -> Option<&mut TransformComponent> {
        self.entities.get_mut(entity).map(|record| &mut record.transform)
    }

    /// `true` while the handle refers to a live entity
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(entity)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// `true` when no entities exist
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get an iterator over all entities
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_stale_handle_after_destroy() {
        let mut world = World::new();
        let a = world.create_entity("a", TransformComponent::default());
        assert!(world.destroy_entity(a).is_some());
        let b = world.create_entity("b", TransformComponent::from_position(Vec3::y()));
        assert_ne!(a, b);
        assert!(!world.contains(a));
        assert!(!world.set_box_collider(a, BoxColliderComponent::new(Vec3::repeat(0.5))));
        assert_eq!(world.get(b).unwrap().transform.position, Vec3::y());
    }
}
