//! Collision engine: registered static geometry plus query entry points
//!
//! Static meshes are registered per entity. Each submesh becomes one
//! [`RegisteredBvh`] slice whose triangles are appended to a single global
//! buffer; slice BVHs store global triangle indices. Unregistering an entity
//! compacts the buffer and shifts every later slice down, which is
//! O(total triangles): registration is expected to be mostly append-only.
//!
//! Moving objects live in a separate [`DynamicBvh`] keyed by entity.

use log::{debug, warn};
use slotmap::SecondaryMap;

use super::bvh::{BvhBuilder, DynamicBvh, FlatNode, NodeId, StaticBvh};
use super::cast::{cast_bvh, CastKind};
use super::collision::{box_vs_triangle_overlap, Aabb, BoxShape, Contact, Hit, Ray, Triangle};
use super::error::{PhysicsError, PhysicsResult};
use crate::core::BvhSettings;
use crate::debug::{colors, DebugDraw, DebugDrawFlags};
use crate::ecs::{Entity, World};
use crate::foundation::collections::NodeStack;
use crate::foundation::math::{utils::normalize_with_length, Vec3};

/// One registered submesh: a BVH over a contiguous slice of the global
/// triangle buffer
#[derive(Debug, Clone)]
pub struct RegisteredBvh {
    bvh: StaticBvh,
    tri_start: u32,
    tri_count: u32,
    owner: Entity,
    name: String,
}

impl RegisteredBvh {
    /// Tree over this slice
    pub fn bvh(&self) -> &StaticBvh {
        &self.bvh
    }

    /// Node array
    pub fn nodes(&self) -> &[FlatNode] {
        self.bvh.nodes()
    }

    /// Global triangle indices referenced by the leaves
    pub fn tri_indices(&self) -> &[u32] {
        self.bvh.tri_indices()
    }

    /// First triangle of the slice in the global buffer
    pub fn tri_start(&self) -> u32 {
        self.tri_start
    }

    /// Number of triangles in the slice
    pub fn tri_count(&self) -> u32 {
        self.tri_count
    }

    /// Entity that registered the slice
    pub fn owner(&self) -> Entity {
        self.owner
    }

    /// `<entity name>/<submesh name>`
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// BVH-accelerated collision world
#[derive(Debug, Default)]
pub struct CollisionEngine {
    builder: BvhBuilder,
    triangles: Vec<Triangle>,
    bvhs: Vec<RegisteredBvh>,
    dynamic: DynamicBvh<Entity>,
    proxies: SecondaryMap<Entity, NodeId>,
}

impl CollisionEngine {
    /// Create an empty engine
    pub fn new(settings: BvhSettings) -> Self {
        Self {
            builder: BvhBuilder::new(settings),
            ..Self::default()
        }
    }

    /// Register the mesh collider of `entity`.
    ///
    /// Submesh triangles are translated by the entity position and each
    /// non-empty submesh becomes one BVH slice. Returns the number of slices
    /// added. Entities without a mesh collider are rejected with a warning
    /// and leave the engine untouched.
    pub fn register_entity(&mut self, world: &World, entity: Entity) -> PhysicsResult<usize> {
        let Some(record) = world.get(entity) else {
            warn!("Cannot register {entity}: entity does not exist");
            return Err(PhysicsError::UnknownEntity(entity));
        };
        let Some(collider) = &record.mesh_collider else {
            warn!("Cannot register '{}': no mesh collider", record.name);
            return Err(PhysicsError::MissingMeshCollider(record.name.clone()));
        };

        let offset = record.transform.position;
        let mut registered = 0;
        for submesh in &collider.submeshes {
            if submesh.triangles.is_empty() {
                warn!("Skipping empty submesh '{}' of '{}'", submesh.name, record.name);
                continue;
            }
            let world_triangles: Vec<Triangle> = submesh
                .triangles
                .iter()
                .map(|tri| tri.translated(&offset))
                .collect();
            self.register_triangles(entity, format!("{}/{}", record.name, submesh.name), world_triangles)?;
            registered += 1;
        }

        if registered == 0 {
            warn!("Cannot register '{}': mesh collider has no triangles", record.name);
            return Err(PhysicsError::EmptyMesh(record.name.clone()));
        }
        Ok(registered)
    }

    /// Register world-space triangles as one slice owned by `owner`
    pub fn register_triangles(
        &mut self,
        owner: Entity,
        name: impl Into<String>,
        triangles: Vec<Triangle>,
    ) -> PhysicsResult<()> {
        let name = name.into();
        if triangles.is_empty() {
            return Err(PhysicsError::EmptyMesh(name));
        }

        let tri_start = self.triangles.len() as u32;
        let tri_count = triangles.len() as u32;
        let mut bvh = self.builder.build(&triangles);
        bvh.offset_indices(tri_start);

        debug!(
            "Registered submesh '{}' for {} with {} triangles ({} nodes)",
            name,
            owner,
            tri_count,
            bvh.nodes().len()
        );

        self.triangles.extend(triangles);
        self.bvhs.push(RegisteredBvh {
            bvh,
            tri_start,
            tri_count,
            owner,
            name,
        });
        Ok(())
    }

    /// Remove every slice owned by `entity`; returns how many were removed.
    ///
    /// Slices are erased from the highest start down so earlier ranges stay
    /// valid, and every later slice is shifted down after each erase.
    pub fn unregister_entity(&mut self, entity: Entity) -> usize {
        let mut ranges: Vec<(u32, u32)> = Vec::new();
        self.bvhs.retain(|slice| {
            if slice.owner == entity {
                ranges.push((slice.tri_start, slice.tri_count));
                false
            } else {
                true
            }
        });

        if ranges.is_empty() {
            warn!("Cannot unregister {entity}: no registered geometry");
            return 0;
        }

        ranges.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        let mut removed_triangles = 0;
        for &(start, count) in &ranges {
            self.triangles.drain(start as usize..(start + count) as usize);
            for slice in &mut self.bvhs {
                if slice.tri_start > start {
                    slice.tri_start -= count;
                    slice.bvh.shift_indices_down(start, count);
                }
            }
            removed_triangles += count;
        }

        debug!(
            "Unregistered {} slices ({} triangles) for {}",
            ranges.len(),
            removed_triangles,
            entity
        );
        ranges.len()
    }

    /// Nearest hit along `ray` within `[t_min, t_max]`; `t` is the distance
    /// from the origin
    pub fn ray_cast(&self, ray: &Ray) -> Option<Hit> {
        let (dir, _) = normalize_with_length(&ray.dir)?;
        if ray.t_max <= 0.0 {
            return None;
        }
        self.cast(&CastKind::Ray { t_min: ray.t_min }, &ray.origin, &dir, ray.t_max)
    }

    /// Sweep an axis-aligned box; `t` is the distance its center travels
    pub fn box_cast(&self, shape: &BoxShape, dir: &Vec3, length: f32) -> Option<Hit> {
        let (dir, _) = normalize_with_length(dir)?;
        if length <= 0.0 {
            return None;
        }
        self.cast(&CastKind::Box { half_size: shape.half_size }, &shape.center, &dir, length)
    }

    /// Sweep a sphere; `t` is the distance its center travels
    pub fn sphere_cast(&self, start: &Vec3, radius: f32, dir: &Vec3, length: f32) -> Option<Hit> {
        let (dir, _) = normalize_with_length(dir)?;
        if length <= 0.0 || radius < 0.0 {
            return None;
        }
        self.cast(&CastKind::Sphere { radius }, start, &dir, length)
    }

    fn cast(&self, kind: &CastKind, start: &Vec3, dir: &Vec3, length: f32) -> Option<Hit> {
        cast_bvh(kind, start, dir, length, self.bvhs.iter().map(|slice| &slice.bvh), &self.triangles)
    }

    /// Static overlap: the contact of minimum penetration, if any
    pub fn box_overlap(&self, shape: &BoxShape) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        self.visit_overlaps(shape, |tri_index, contact| {
            if best.map_or(true, |hit| contact.depth < hit.depth) {
                best = Some(overlap_hit(tri_index, &contact));
            }
        });
        best
    }

    /// Static overlap: up to `max_hits` contacts, deepest first
    pub fn box_overlap_many(&self, shape: &BoxShape, max_hits: usize) -> Vec<Hit> {
        if max_hits == 0 {
            return Vec::new();
        }
        let mut hits = Vec::new();
        self.visit_overlaps(shape, |tri_index, contact| hits.push(overlap_hit(tri_index, &contact)));
        hits.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        hits.truncate(max_hits);
        hits
    }

    fn visit_overlaps(&self, shape: &BoxShape, mut visit: impl FnMut(u32, Contact)) {
        let query = shape.aabb();
        let mut stack = NodeStack::new();

        for slice in &self.bvhs {
            if !slice.bvh.root_bounds().is_some_and(|root| root.intersects(&query)) {
                continue;
            }
            stack.clear();
            stack.push(0);
            while let Some(index) = stack.pop() {
                let node = &slice.bvh.nodes[index as usize];
                if !node.bounds.intersects(&query) {
                    continue;
                }
                if !node.is_leaf() {
                    stack.push(node.right_first);
                    stack.push(node.left_first);
                    continue;
                }
                for &tri_index in &slice.bvh.tri_indices[node.prim_range()] {
                    if let Some(contact) = box_vs_triangle_overlap(shape, &self.triangles[tri_index as usize]) {
                        visit(tri_index, contact);
                    }
                }
            }
        }
    }

    /// Add (or move) the dynamic proxy of `entity`
    pub fn insert_dynamic(&mut self, entity: Entity, aabb: Aabb) -> NodeId {
        if let Some(&node) = self.proxies.get(entity) {
            if self.dynamic.update_object(node, aabb).is_ok() {
                return node;
            }
        }
        let node = self.dynamic.insert_object(aabb, entity);
        self.proxies.insert(entity, node);
        node
    }

    /// Move the dynamic proxy of `entity`
    pub fn update_dynamic(&mut self, entity: Entity, aabb: Aabb) -> PhysicsResult<()> {
        let node = *self.proxies.get(entity).ok_or(PhysicsError::NotRegistered(entity))?;
        self.dynamic.update_object(node, aabb)
    }

    /// Drop the dynamic proxy of `entity`
    pub fn remove_dynamic(&mut self, entity: Entity) -> PhysicsResult<()> {
        let node = *self.proxies.get(entity).ok_or(PhysicsError::NotRegistered(entity))?;
        let relocations = self.dynamic.remove_object(node)?;
        self.proxies.remove(entity);
        for relocation in &relocations {
            for (_, proxy) in self.proxies.iter_mut() {
                if *proxy == relocation.from {
                    *proxy = relocation.to;
                }
            }
        }
        Ok(())
    }

    /// Entities whose dynamic proxy overlaps `aabb`
    pub fn query_dynamic(&self, aabb: &Aabb) -> Vec<Entity> {
        self.dynamic.query_overlaps(aabb)
    }

    /// The dynamic tree, for shared read access
    pub fn dynamic(&self) -> &DynamicBvh<Entity> {
        &self.dynamic
    }

    /// Global triangle buffer
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of registered triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of registered slices
    pub fn bvh_count(&self) -> usize {
        self.bvhs.len()
    }

    /// Registered slices in registration order
    pub fn registered_bvhs(&self) -> &[RegisteredBvh] {
        &self.bvhs
    }

    /// Drop all static and dynamic state
    pub fn clear(&mut self) {
        self.triangles.clear();
        self.bvhs.clear();
        self.dynamic.clear();
        self.proxies.clear();
    }

    /// Emit BVH bounds and geometry selected by `flags`
    pub fn draw_debug(&self, sink: &mut dyn DebugDraw, flags: DebugDrawFlags) {
        for slice in &self.bvhs {
            for node in slice.nodes() {
                let wanted = if node.is_leaf() {
                    flags.contains(DebugDrawFlags::LEAVES)
                } else {
                    flags.contains(DebugDrawFlags::NODES)
                };
                if wanted {
                    let color = if node.is_leaf() { colors::green() } else { colors::yellow() };
                    sink.draw_box(node.bounds.center(), node.bounds.half_size(), color);
                }
            }
        }

        if flags.contains(DebugDrawFlags::TRIANGLES) {
            for tri in &self.triangles {
                for i in 0..3 {
                    sink.draw_line(tri.vertex(i), tri.vertex(i + 1), colors::white());
                }
            }
        }

        if flags.contains(DebugDrawFlags::DYNAMIC) {
            for (bounds, _) in self.dynamic.node_bounds() {
                sink.draw_box(bounds.center(), bounds.half_size(), colors::cyan());
            }
        }
    }

    /// Ray-cast from a camera and draw the ray, the hit point and its normal
    pub fn debug_probe(&self, origin: &Vec3, forward: &Vec3, max_distance: f32, sink: &mut dyn DebugDraw) -> Option<Hit> {
        let hit = self.ray_cast(&Ray::new(*origin, *forward, max_distance));
        match &hit {
            Some(hit) => {
                sink.draw_line(*origin, hit.pos, colors::green());
                sink.draw_axis(hit.pos, 0.25);
                sink.draw_line(hit.pos, hit.pos + hit.normal * 0.5, colors::blue());
            }
            None => {
                if let Some((dir, _)) = normalize_with_length(forward) {
                    sink.draw_line(*origin, origin + dir * max_distance, colors::red());
                }
            }
        }
        hit
    }
}

fn overlap_hit(tri_index: u32, contact: &Contact) -> Hit {
    Hit {
        t: 0.0,
        pos: contact.point,
        normal: contact.normal,
        tri_index,
        depth: contact.depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::DebugDrawSystem;
    use crate::ecs::{MeshColliderComponent, SubMesh, TransformComponent};
    use approx::assert_relative_eq;

    fn quad(size: f32) -> Vec<Triangle> {
        let a = Vec3::new(-size, 0.0, -size);
        let b = Vec3::new(size, 0.0, -size);
        let c = Vec3::new(size, 0.0, size);
        let d = Vec3::new(-size, 0.0, size);
        vec![Triangle::new(a, b, c), Triangle::new(a, c, d)]
    }

    fn spawn_mesh(world: &mut World, name: &str, position: Vec3, collider: MeshColliderComponent) -> Entity {
        let entity = world.create_entity(name, TransformComponent::from_position(position));
        world.set_mesh_collider(entity, collider);
        entity
    }

    #[test]
    fn test_register_requires_mesh_collider() {
        let mut world = World::new();
        let bare = world.create_entity("bare", TransformComponent::default());
        let mut engine = CollisionEngine::default();
        assert_eq!(
            engine.register_entity(&world, bare),
            Err(PhysicsError::MissingMeshCollider("bare".into()))
        );
        assert_eq!(engine.triangle_count(), 0);
        assert_eq!(engine.bvh_count(), 0);
    }

    #[test]
    fn test_register_translates_and_skips_empty_submeshes() {
        let mut world = World::new();
        let collider = MeshColliderComponent::from_triangles("floor", quad(1.0))
            .with_submesh(SubMesh::new("nothing", Vec::new()))
            .with_submesh(SubMesh::new("roof", quad(0.5)));
        let entity = spawn_mesh(&mut world, "room", Vec3::new(0.0, 2.0, 0.0), collider);

        let mut engine = CollisionEngine::default();
        assert_eq!(engine.register_entity(&world, entity), Ok(2));
        assert_eq!(engine.triangle_count(), 4);
        assert_eq!(engine.registered_bvhs()[1].tri_start(), 2);
        assert_eq!(engine.registered_bvhs()[1].name(), "room/roof");
        assert!(engine.triangles().iter().all(|tri| tri.v0.y == 2.0));

        let empty = spawn_mesh(&mut world, "empty", Vec3::zeros(), MeshColliderComponent::default());
        assert_eq!(engine.register_entity(&world, empty), Err(PhysicsError::EmptyMesh("empty".into())));
    }

    #[test]
    fn test_unregister_shifts_later_slices() {
        let mut world = World::new();
        let a = spawn_mesh(
            &mut world,
            "a",
            Vec3::new(0.0, 5.0, 0.0),
            MeshColliderComponent::from_triangles("top", quad(1.0)).with_submesh(SubMesh::new("mid", quad(2.0))),
        );
        let b = spawn_mesh(&mut world, "b", Vec3::zeros(), MeshColliderComponent::from_triangles("floor", quad(3.0)));

        let mut engine = CollisionEngine::default();
        engine.register_entity(&world, a).unwrap();
        engine.register_entity(&world, b).unwrap();
        assert_eq!(engine.registered_bvhs()[2].tri_start(), 4);

        assert_eq!(engine.unregister_entity(a), 2);
        assert_eq!(engine.bvh_count(), 1);
        let slice = &engine.registered_bvhs()[0];
        assert_eq!(slice.owner(), b);
        assert_eq!(slice.tri_start(), 0);
        let mut indices = slice.tri_indices().to_vec();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(engine.triangles(), quad(3.0).as_slice());

        assert_eq!(engine.unregister_entity(a), 0);
    }

    #[test]
    fn test_box_overlap_single_and_many() {
        let mut engine = CollisionEngine::default();
        let mut world = World::new();
        let floor = world.create_entity("floor", TransformComponent::default());
        engine.register_triangles(floor, "floor", quad(2.0)).unwrap();

        let shape = BoxShape::new(Vec3::new(0.3, 0.4, 0.2), Vec3::repeat(0.5));
        let hit = engine.box_overlap(&shape).unwrap();
        assert_relative_eq!(hit.depth, 0.1, epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);

        let hits = engine.box_overlap_many(&shape, 8);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].depth >= hits[1].depth);
        assert_eq!(engine.box_overlap_many(&shape, 1).len(), 1);
        assert!(engine.box_overlap_many(&shape, 0).is_empty());

        assert!(engine.box_overlap(&shape.at(Vec3::new(0.0, 3.0, 0.0))).is_none());
    }

    #[test]
    fn test_zero_direction_is_a_miss() {
        let mut engine = CollisionEngine::default();
        let mut world = World::new();
        let floor = world.create_entity("floor", TransformComponent::default());
        engine.register_triangles(floor, "floor", quad(2.0)).unwrap();

        assert!(engine.ray_cast(&Ray::new(Vec3::y(), Vec3::zeros(), 10.0)).is_none());
        assert!(engine.box_cast(&BoxShape::new(Vec3::y() * 2.0, Vec3::repeat(0.5)), &Vec3::zeros(), 5.0).is_none());
        assert!(engine.sphere_cast(&(Vec3::y() * 2.0), 0.5, &Vec3::zeros(), 5.0).is_none());
    }

    #[test]
    fn test_dynamic_proxies_follow_relocations() {
        let mut world = World::new();
        let entities: Vec<Entity> = (0..6)
            .map(|i| world.create_entity(format!("mover{i}"), TransformComponent::default()))
            .collect();
        let mut engine = CollisionEngine::default();
        for (i, &entity) in entities.iter().enumerate() {
            let center = Vec3::new(i as f32 * 4.0, 0.0, 0.0);
            engine.insert_dynamic(entity, Aabb::from_center_half(center, Vec3::repeat(1.0)));
        }

        engine.remove_dynamic(entities[0]).unwrap();
        engine.remove_dynamic(entities[3]).unwrap();
        assert_eq!(engine.remove_dynamic(entities[3]), Err(PhysicsError::NotRegistered(entities[3])));

        for (i, &entity) in entities.iter().enumerate() {
            let probe = Aabb::from_center_half(Vec3::new(i as f32 * 4.0, 0.0, 0.0), Vec3::repeat(0.5));
            let found = engine.query_dynamic(&probe);
            if i == 0 || i == 3 {
                assert!(found.is_empty());
            } else {
                assert_eq!(found, vec![entity]);
                engine.update_dynamic(entity, probe).unwrap();
            }
        }
    }

    #[test]
    fn test_failed_dynamic_removal_keeps_proxy() {
        let mut world = World::new();
        let a = world.create_entity("a", TransformComponent::default());
        let b = world.create_entity("b", TransformComponent::default());
        let mut engine = CollisionEngine::default();
        engine.insert_dynamic(a, Aabb::from_center_half(Vec3::zeros(), Vec3::repeat(1.0)));
        engine.insert_dynamic(b, Aabb::from_center_half(Vec3::new(5.0, 0.0, 0.0), Vec3::repeat(1.0)));

        // Node 2 is the parent created for the second leaf
        engine.proxies.insert(a, 2);
        assert_eq!(engine.remove_dynamic(a), Err(PhysicsError::NotALeaf(2)));
        assert_eq!(engine.proxies.get(a), Some(&2));
        assert_eq!(engine.dynamic().len(), 2);

        engine.proxies.insert(a, 0);
        assert_eq!(engine.remove_dynamic(a), Ok(()));
        assert!(!engine.proxies.contains_key(a));
        assert_eq!(engine.query_dynamic(&Aabb::from_center_half(Vec3::new(5.0, 0.0, 0.0), Vec3::repeat(0.5))), vec![b]);
    }

    #[test]
    fn test_debug_output() {
        let mut world = World::new();
        let floor = world.create_entity("floor", TransformComponent::default());
        let mut engine = CollisionEngine::default();
        engine.register_triangles(floor, "floor", quad(2.0)).unwrap();
        engine.insert_dynamic(floor, Aabb::from_center_half(Vec3::zeros(), Vec3::repeat(1.0)));

        let mut sink = DebugDrawSystem::new();
        engine.draw_debug(&mut sink, DebugDrawFlags::all());
        assert_eq!(sink.box_count(), 2);
        assert_eq!(sink.line_count(), 6);

        sink.clear();
        let hit = engine.debug_probe(&Vec3::new(0.0, 3.0, 0.0), &Vec3::new(0.0, -2.0, 0.0), 10.0, &mut sink);
        assert_relative_eq!(hit.unwrap().t, 3.0);
        assert_eq!(sink.line_count(), 5);
    }
}
