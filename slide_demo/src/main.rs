//! Headless collide-and-slide demo
//!
//! Builds a small level (floor, wall, ramp), drops a box-hull character into
//! it and drives it through a scripted input sequence, logging the
//! trajectory.
//!
//! Usage: `slide_demo [config.toml|config.ron] [frames]`

use collision_engine::foundation::logging;
use collision_engine::prelude::*;
use log::{debug, info, warn};

const FRAME_DT: f32 = 1.0 / 60.0;
const DEFAULT_FRAMES: u32 = 480;
const REPORT_EVERY: u32 = 30;

/// Errors that end the demo early
#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("invalid frame count '{0}'")]
    FrameCount(String),
}

fn quad(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Vec<Triangle> {
    vec![Triangle::new(a, b, c), Triangle::new(a, c, d)]
}

/// Floor, a wall at +x and a ramp climbing towards -x
fn build_level(world: &mut World) -> Vec<Entity> {
    let floor = world.create_entity("floor", TransformComponent::default());
    world.set_mesh_collider(
        floor,
        MeshColliderComponent::from_triangles(
            "ground",
            quad(
                Vec3::new(-20.0, 0.0, -20.0),
                Vec3::new(20.0, 0.0, -20.0),
                Vec3::new(20.0, 0.0, 20.0),
                Vec3::new(-20.0, 0.0, 20.0),
            ),
        ),
    );

    let wall = world.create_entity("wall", TransformComponent::from_position(Vec3::new(6.0, 0.0, 0.0)));
    world.set_mesh_collider(
        wall,
        MeshColliderComponent::from_triangles(
            "face",
            quad(
                Vec3::new(0.0, 0.0, -20.0),
                Vec3::new(0.0, 4.0, -20.0),
                Vec3::new(0.0, 4.0, 20.0),
                Vec3::new(0.0, 0.0, 20.0),
            ),
        ),
    );

    let ramp = world.create_entity("ramp", TransformComponent::from_position(Vec3::new(-3.0, 0.0, 0.0)));
    world.set_mesh_collider(
        ramp,
        MeshColliderComponent::from_triangles(
            "slope",
            quad(
                Vec3::new(0.0, 0.0, -3.0),
                Vec3::new(0.0, 0.0, 3.0),
                Vec3::new(-6.0, 2.0, 3.0),
                Vec3::new(-6.0, 2.0, -3.0),
            ),
        ),
    );

    vec![floor, wall, ramp]
}

/// Scripted input: settle, run into the wall, jump, then climb the ramp
fn input_for_frame(frame: u32) -> MoveInput {
    match frame {
        0..=59 => MoveInput::default(),
        60..=179 => MoveInput::walk(Vec3::new(1.0, 0.0, 0.3)),
        180 => MoveInput::walk(Vec3::new(1.0, 0.0, 0.0)).with_jump(),
        181..=239 => MoveInput::default(),
        _ => MoveInput::walk(Vec3::new(-1.0, 0.0, 0.0)),
    }
}

fn load_config(path: Option<&str>) -> Result<PhysicsConfig, DemoError> {
    match path {
        Some(path) => {
            info!("Loading physics config from {path}");
            Ok(PhysicsConfig::load_validated(path)?)
        }
        None => {
            let config = PhysicsConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn run() -> Result<(), DemoError> {
    let mut args = std::env::args().skip(1);
    let config = load_config(args.next().as_deref())?;
    let frames = match args.next() {
        Some(text) => text.parse().map_err(|_| DemoError::FrameCount(text))?,
        None => DEFAULT_FRAMES,
    };

    let mut world = World::new();
    let mut engine = CollisionEngine::new(config.bvh.clone());
    for entity in build_level(&mut world) {
        engine.register_entity(&world, entity)?;
    }
    info!(
        "Level ready: {} triangles in {} BVHs",
        engine.triangle_count(),
        engine.bvh_count()
    );

    let hull = BoxColliderComponent::new(Vec3::new(0.4, 0.9, 0.4));
    let mut player = CharacterController::from_config(Vec3::new(0.0, 3.0, 0.0), hull, &config);
    let player_entity = world.create_entity("player", TransformComponent::from_position(player.position()));
    world.set_box_collider(player_entity, hull);
    engine.insert_dynamic(player_entity, hull.shape_at(player.position()).aabb());

    for frame in 0..frames {
        let outcome = player.update(Some(&engine), &input_for_frame(frame), FRAME_DT);
        engine.update_dynamic(player_entity, hull.shape_at(player.position()).aabb())?;
        if let Some(transform) = world.transform_mut(player_entity) {
            transform.position = player.position();
        }

        if outcome.depenetrated {
            warn!("Frame {frame}: player was embedded and pushed out");
        }
        if !outcome.planes.is_empty() {
            debug!("Frame {frame}: touched {} planes in {} sweeps", outcome.planes.len(), outcome.iterations);
        }

        if frame % REPORT_EVERY == 0 {
            let p = player.position();
            let v = player.velocity();
            info!(
                "Frame {frame:4}: pos ({:6.2}, {:6.2}, {:6.2}) m, speed {:6.1} hu/s, grounded {}",
                p.x,
                p.y,
                p.z,
                m_to_hu(v.norm()),
                player.grounded()
            );
        }
    }

    let mut debug_draw = DebugDrawSystem::new();
    engine.draw_debug(&mut debug_draw, DebugDrawFlags::default());
    let eye = player.position() + Vec3::new(0.0, 0.7, 0.0);
    if let Some(hit) = engine.debug_probe(&eye, &Vec3::new(1.0, -0.3, 0.0), 50.0, &mut debug_draw) {
        info!("Probe hit triangle {} at {:.2} m", hit.tri_index, hit.t);
    }
    info!(
        "Debug output: {} boxes, {} lines",
        debug_draw.box_count(),
        debug_draw.line_count()
    );
    Ok(())
}

fn main() {
    logging::init_with_default_filter("info");

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
