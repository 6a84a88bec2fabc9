//! End-to-end scenarios against a registered level

use crate::core::{MovementSettings, SlideSettings};
use crate::ecs::{BoxColliderComponent, Entity, MeshColliderComponent, TransformComponent, World};
use crate::foundation::math::{units::hu_to_m, Vec3};
use crate::physics::{
    BoxShape, CharacterController, CollisionEngine, MoveInput, Ray, SlideResolver, Triangle,
};

fn quad_floor(size: f32) -> Vec<Triangle> {
    let a = Vec3::new(-size, 0.0, -size);
    let b = Vec3::new(size, 0.0, -size);
    let c = Vec3::new(size, 0.0, size);
    let d = Vec3::new(-size, 0.0, size);
    vec![Triangle::new(a, b, c), Triangle::new(a, c, d)]
}

fn spawn(world: &mut World, name: &str, position: Vec3, triangles: Vec<Triangle>) -> Entity {
    let entity = world.create_entity(name, TransformComponent::from_position(position));
    world.set_mesh_collider(entity, MeshColliderComponent::from_triangles(name, triangles));
    entity
}

/// Floor plus a raised block starting at x = 2: its front face and top
fn floor_with_ledge(height_hu: f32) -> CollisionEngine {
    let h = hu_to_m(height_hu);
    let mut world = World::new();
    let floor = spawn(&mut world, "floor", Vec3::zeros(), quad_floor(20.0));
    let ledge = spawn(
        &mut world,
        "ledge",
        Vec3::zeros(),
        vec![
            Triangle::new(Vec3::new(2.0, h, -5.0), Vec3::new(10.0, h, -5.0), Vec3::new(10.0, h, 5.0)),
            Triangle::new(Vec3::new(2.0, h, -5.0), Vec3::new(10.0, h, 5.0), Vec3::new(2.0, h, 5.0)),
            Triangle::new(Vec3::new(2.0, 0.0, -5.0), Vec3::new(2.0, h, -5.0), Vec3::new(2.0, h, 5.0)),
            Triangle::new(Vec3::new(2.0, 0.0, -5.0), Vec3::new(2.0, h, 5.0), Vec3::new(2.0, 0.0, 5.0)),
        ],
    );
    let mut engine = CollisionEngine::default();
    engine.register_entity(&world, floor).unwrap();
    engine.register_entity(&world, ledge).unwrap();
    engine
}

/// Settle on the floor, then walk towards +x for `frames` ticks
fn walk_towards_ledge(engine: &CollisionEngine, frames: u32) -> CharacterController {
    let mut player = CharacterController::new(
        Vec3::new(0.0, 1.0, 0.0),
        BoxColliderComponent::new(Vec3::new(0.4, 0.9, 0.4)),
        MovementSettings::default(),
        SlideSettings::default(),
    );
    for _ in 0..120 {
        player.update(Some(engine), &MoveInput::default(), 1.0 / 60.0);
    }
    let input = MoveInput::walk(Vec3::new(1.0, 0.0, 0.0));
    for _ in 0..frames {
        player.update(Some(engine), &input, 1.0 / 60.0);
    }
    player
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_hits_single_triangle() {
        let mut world = World::new();
        let tri = Triangle::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        let entity = spawn(&mut world, "tri", Vec3::zeros(), vec![tri]);
        let mut engine = CollisionEngine::default();
        engine.register_entity(&world, entity).unwrap();

        let hit = engine
            .ray_cast(&Ray::new(Vec3::new(0.2, 1.0, 0.2), Vec3::new(0.0, -1.0, 0.0), 10.0))
            .unwrap();
        assert_relative_eq!(hit.t, 1.0, epsilon = 1e-5);
        assert_relative_eq!(hit.pos, Vec3::new(0.2, 0.0, 0.2), epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
        assert_eq!(hit.tri_index, 0);
    }

    #[test]
    fn test_unregistered_floor_no_longer_hit() {
        let mut world = World::new();
        let floor = spawn(&mut world, "floor", Vec3::zeros(), quad_floor(1.0));
        let mut engine = CollisionEngine::default();
        engine.register_entity(&world, floor).unwrap();

        let rays: Vec<Ray> = [(-0.5, -0.5), (0.5, 0.5), (0.9, -0.2), (0.0, 0.0)]
            .iter()
            .map(|&(x, z)| Ray::new(Vec3::new(x, 2.0, z), Vec3::new(0.0, -1.0, 0.0), 10.0))
            .collect();
        assert!(rays.iter().all(|ray| engine.ray_cast(ray).is_some()));

        assert_eq!(engine.unregister_entity(floor), 1);
        assert_eq!(engine.triangle_count(), 0);
        assert!(rays.iter().all(|ray| engine.ray_cast(ray).is_none()));
    }

    #[test]
    fn test_box_cast_stops_on_floor() {
        let mut world = World::new();
        let floor = spawn(&mut world, "floor", Vec3::zeros(), quad_floor(1.0));
        let mut engine = CollisionEngine::default();
        engine.register_entity(&world, floor).unwrap();

        let shape = BoxShape::new(Vec3::new(0.25, 2.0, 0.25), Vec3::repeat(0.5));
        let hit = engine.box_cast(&shape, &Vec3::new(0.0, -1.0, 0.0), 5.0).unwrap();
        let bottom = shape.center.y - hit.t - shape.half_size.y;
        assert!(bottom.abs() <= hu_to_m(0.2), "bottom face at {bottom}");
        assert_relative_eq!(hit.t, 1.5, epsilon = 1e-4);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_register_unregister_symmetry() {
        let mut world = World::new();
        let ramp = vec![
            Triangle::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 2.0)),
            Triangle::new(Vec3::new(2.0, 1.0, 0.0), Vec3::new(2.0, 1.0, 2.0), Vec3::new(0.0, 0.0, 2.0)),
        ];
        let a = spawn(&mut world, "a", Vec3::new(50.0, 0.0, 0.0), ramp);
        let b = spawn(&mut world, "b", Vec3::zeros(), quad_floor(4.0));

        let mut engine = CollisionEngine::default();
        engine.register_entity(&world, a).unwrap();
        engine.register_entity(&world, b).unwrap();

        let rays: Vec<Ray> = (0..16)
            .map(|i| {
                let x = -3.5 + (i % 4) as f32 * 2.0;
                let z = -3.5 + (i / 4) as f32 * 2.0;
                Ray::new(Vec3::new(x, 3.0, z), Vec3::new(0.1, -1.0, 0.05), 10.0)
            })
            .collect();
        let before: Vec<_> = rays.iter().map(|ray| engine.ray_cast(ray)).collect();
        assert!(before.iter().all(Option::is_some));

        engine.unregister_entity(a);
        assert_eq!(engine.triangles(), quad_floor(4.0).as_slice());
        let slice = &engine.registered_bvhs()[0];
        assert_eq!(slice.owner(), b);
        assert_eq!(slice.tri_start(), 0);
        assert!(slice.tri_indices().iter().all(|&i| i < 2));

        for (ray, old) in rays.iter().zip(&before) {
            let (Some(old), Some(new)) = (old, engine.ray_cast(ray)) else {
                panic!("ray {ray:?} lost its hit");
            };
            assert_eq!(new.t, old.t);
            assert_eq!(new.pos, old.pos);
            assert_eq!(new.normal, old.normal);
            assert_eq!(new.tri_index, old.tri_index - 2);
        }
    }

    #[test]
    fn test_walks_up_low_ledge() {
        let engine = floor_with_ledge(16.0);
        let player = walk_towards_ledge(&engine, 45);
        let skin = hu_to_m(SlideSettings::default().skin_hu);

        assert!(player.position().x > 3.0, "stuck at x = {}", player.position().x);
        assert!(player.grounded());
        assert_relative_eq!(player.position().y, hu_to_m(16.0) + 0.9 + skin, epsilon = 2e-3);
    }

    #[test]
    fn test_blocked_by_tall_ledge() {
        let engine = floor_with_ledge(24.0);
        let player = walk_towards_ledge(&engine, 45);
        let skin = hu_to_m(SlideSettings::default().skin_hu);

        assert!(player.position().x <= 2.0 - 0.4);
        assert!(player.position().x > 1.5);
        assert!(player.grounded());
        assert_relative_eq!(player.position().y, 0.9 + skin, epsilon = 2e-3);
    }

    #[test]
    fn test_slide_is_stable_at_rest() {
        let mut world = World::new();
        let floor = spawn(&mut world, "floor", Vec3::zeros(), quad_floor(5.0));
        let mut engine = CollisionEngine::default();
        engine.register_entity(&world, floor).unwrap();

        let resolver = SlideResolver::new(SlideSettings::default());
        let hull = BoxColliderComponent::new(Vec3::repeat(0.5));
        let landed = resolver.resolve(Some(&engine), Some(&hull), Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -20.0, 0.0), 0.1);
        let rest = landed.position;

        let mut position = rest;
        for i in 0..200 {
            let velocity = if i % 2 == 0 { Vec3::zeros() } else { Vec3::new(0.0, -1e-3, 0.0) };
            let outcome = resolver.resolve(Some(&engine), Some(&hull), position, velocity, 1.0 / 60.0);
            assert!(outcome.iterations <= resolver.settings().max_iterations);
            assert!(!outcome.depenetrated);
            position = outcome.position;
        }
        assert!(position.y >= 0.5);
        assert!(position.y <= 0.5 + resolver.skin() + 1e-5);
        assert_relative_eq!(position, rest, epsilon = 1e-4);
    }
}
