//! Character movement
//!
//! Quake-style ground and air acceleration layered on the slide resolver.
//! Tunables are expressed in hammer units and converted once per step;
//! positions and velocities are meters.
//!
//! A grounded character moving horizontally also tries a stepped move:
//! raise the hull by the step height, slide, drop back onto walkable ground,
//! and keep that result if it got further than the flat move.

use log::trace;

use super::engine::CollisionEngine;
use super::slide::{SlideOutcome, SlideResolver};
use crate::core::{MovementSettings, PhysicsConfig, SlideSettings};
use crate::ecs::BoxColliderComponent;
use crate::foundation::math::{
    units::hu_to_m,
    utils::{horizontal, normalize_with_length},
    Vec3,
};

/// Horizontal speeds below this (hammer units) are not worth applying friction to
const MIN_FRICTION_SPEED_HU: f32 = 0.1;
/// A stepped move must beat the flat one by at least this much horizontal travel
const STEP_MIN_GAIN: f32 = 1e-4;

/// Player intent for one step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveInput {
    /// Desired horizontal direction; any length, zero for none
    pub wish_dir: Vec3,
    /// Jump if standing on ground
    pub jump: bool,
}

impl MoveInput {
    /// Walk towards `wish_dir`
    pub fn walk(wish_dir: Vec3) -> Self {
        Self { wish_dir, jump: false }
    }

    /// Request a jump alongside the current input
    pub fn with_jump(mut self) -> Self {
        self.jump = true;
        self
    }
}

/// Box-hull character driven by [`MoveInput`]
#[derive(Debug, Clone)]
pub struct CharacterController {
    position: Vec3,
    velocity: Vec3,
    hull: BoxColliderComponent,
    grounded: bool,
    ground_normal: Option<Vec3>,
    settings: MovementSettings,
    resolver: SlideResolver,
}

impl CharacterController {
    /// Create a controller at rest
    pub fn new(position: Vec3, hull: BoxColliderComponent, settings: MovementSettings, slide: SlideSettings) -> Self {
        Self {
            position,
            velocity: Vec3::zeros(),
            hull,
            grounded: false,
            ground_normal: None,
            settings,
            resolver: SlideResolver::new(slide),
        }
    }

    /// Create a controller from the movement and slide sections of `config`
    pub fn from_config(position: Vec3, hull: BoxColliderComponent, config: &PhysicsConfig) -> Self {
        Self::new(position, hull, config.movement.clone(), config.slide.clone())
    }

    /// Hull center
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Velocity in meters per second
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Teleport, keeping velocity
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Override velocity
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    /// Collision hull
    pub fn hull(&self) -> &BoxColliderComponent {
        &self.hull
    }

    /// Standing on walkable ground after the last step
    pub fn grounded(&self) -> bool {
        self.grounded
    }

    /// Normal of the ground under the hull, if grounded
    pub fn ground_normal(&self) -> Option<Vec3> {
        self.ground_normal
    }

    /// Movement settings
    pub fn settings(&self) -> &MovementSettings {
        &self.settings
    }

    /// Advance one step of `dt` seconds
    pub fn update(&mut self, engine: Option<&CollisionEngine>, input: &MoveInput, dt: f32) -> SlideOutcome {
        self.check_ground(engine);

        if self.grounded {
            if input.jump {
                self.velocity.y = hu_to_m(self.settings.jump_velocity);
                self.grounded = false;
                self.ground_normal = None;
                trace!("Jump at {:?}", self.position);
            } else {
                self.velocity.y = self.velocity.y.max(0.0);
            }
        }

        let wish = normalize_with_length(&Vec3::new(input.wish_dir.x, 0.0, input.wish_dir.z)).map(|(dir, _)| dir);
        let wish_speed = hu_to_m(self.settings.max_speed);

        if self.grounded {
            self.apply_friction(dt);
            if let Some(dir) = wish {
                self.accelerate(&dir, wish_speed, self.settings.accelerate, dt);
            }
        } else {
            if let Some(dir) = wish {
                self.air_accelerate(&dir, wish_speed, dt);
            }
            self.apply_half_gravity(dt);
        }
        self.clamp_velocity();

        let mut outcome = self.resolver.resolve(engine, Some(&self.hull), self.position, self.velocity, dt);
        if self.grounded {
            if let Some(stepped) = self.try_step(engine, &outcome, dt) {
                outcome = stepped;
            }
        }
        self.position = outcome.position;
        self.velocity = outcome.velocity;

        self.check_ground(engine);
        if !self.grounded {
            self.apply_half_gravity(dt);
        }
        self.clamp_velocity();
        outcome
    }

    /// Slide with the hull raised by the step height, then settle back onto
    /// walkable ground. `None` unless that beats `flat` horizontally.
    fn try_step(&self, engine: Option<&CollisionEngine>, flat: &SlideOutcome, dt: f32) -> Option<SlideOutcome> {
        let engine = engine?;
        let step = hu_to_m(self.settings.step_height);
        if step <= 0.0 || horizontal(&self.velocity).norm_squared() <= 1e-8 {
            return None;
        }

        let raised = self.position + Vec3::y() * step;
        if engine.box_overlap(&self.hull.shape_at(raised)).is_some() {
            return None;
        }
        let mut stepped = self.resolver.resolve(Some(engine), Some(&self.hull), raised, self.velocity, dt);

        let skin = self.resolver.skin();
        let down = engine.box_cast(&self.hull.shape_at(stepped.position), &-Vec3::y(), step + skin);
        if let Some(hit) = down {
            if hit.normal.y >= self.resolver.settings().walkable_cos {
                stepped.position.y -= (hit.t - skin).max(0.0);
            }
        }

        let progress = |position: &Vec3| horizontal(&(position - self.position)).norm();
        if progress(&stepped.position) > progress(&flat.position) + STEP_MIN_GAIN {
            trace!("Stepped from {:?} to {:?}", self.position, stepped.position);
            Some(stepped)
        } else {
            None
        }
    }

    /// Probe below the hull for walkable ground and update the grounded state.
    ///
    /// A grounded hull is snapped down so it rests one skin above the floor.
    pub fn check_ground(&mut self, engine: Option<&CollisionEngine>) -> bool {
        self.grounded = false;
        self.ground_normal = None;

        let Some(engine) = engine else {
            return false;
        };
        // Rising faster than half a jump means we just left the ground
        if self.velocity.y > hu_to_m(self.settings.jump_velocity) * 0.5 {
            return false;
        }

        let skin = self.resolver.skin();
        let probe = hu_to_m(self.settings.ground_probe) + skin;
        let shape = self.hull.shape_at(self.position);
        if let Some(hit) = engine.box_cast(&shape, &-Vec3::y(), probe) {
            if hit.normal.y > self.resolver.settings().walkable_cos {
                self.grounded = true;
                self.ground_normal = Some(hit.normal);
                if hit.t > skin {
                    self.position.y -= hit.t - skin;
                }
            }
        }
        self.grounded
    }

    /// Ground friction on the horizontal velocity
    fn apply_friction(&mut self, dt: f32) {
        let speed = self.velocity.x.hypot(self.velocity.z);
        if speed < hu_to_m(MIN_FRICTION_SPEED_HU) {
            self.velocity.x = 0.0;
            self.velocity.z = 0.0;
            return;
        }

        let control = speed.max(hu_to_m(self.settings.stop_speed));
        let drop = control * self.settings.friction * dt;
        let scale = (speed - drop).max(0.0) / speed;
        self.velocity.x *= scale;
        self.velocity.z *= scale;
    }

    /// Add speed along `wish_dir` up to `wish_speed`
    fn accelerate(&mut self, wish_dir: &Vec3, wish_speed: f32, accel: f32, dt: f32) {
        let add_speed = wish_speed - self.velocity.dot(wish_dir);
        if add_speed <= 0.0 {
            return;
        }
        let accel_speed = (accel * dt * wish_speed).min(add_speed);
        self.velocity += wish_dir * accel_speed;
    }

    /// Air control: the speed target is capped but the acceleration rate is not
    fn air_accelerate(&mut self, wish_dir: &Vec3, wish_speed: f32, dt: f32) {
        let capped = wish_speed.min(hu_to_m(self.settings.air_speed_cap));
        let add_speed = capped - self.velocity.dot(wish_dir);
        if add_speed <= 0.0 {
            return;
        }
        let accel_speed = (self.settings.air_accelerate * dt * wish_speed).min(add_speed);
        self.velocity += wish_dir * accel_speed;
    }

    fn apply_half_gravity(&mut self, dt: f32) {
        self.velocity.y -= hu_to_m(self.settings.gravity) * 0.5 * dt;
    }

    fn clamp_velocity(&mut self) {
        let max = hu_to_m(self.settings.max_velocity);
        self.velocity = self.velocity.map(|v| v.clamp(-max, max));
    }
}
