//! # Physics Configuration
//!
//! Tunables for the BVH builder, the collide-and-slide resolver and the
//! character movement controller, grouped under a single serializable
//! [`PhysicsConfig`].
//!
//! ## Units
//!
//! - **BVH / slide**: world units (meters) except where a field name ends in
//!   `_hu`, which is in hammer units
//! - **Movement**: hammer units, matching the classic console variables
//!   (`sv_gravity`, `sv_maxspeed`, ...)

use serde::{Serialize, Deserialize};

// Re-export from the config module for convenience
pub use crate::config::{Config, ConfigError};

/// # BVH Build Settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhSettings {
    /// Maximum triangles per leaf before a split is attempted
    pub leaf_size: u32,
    /// Number of SAH buckets evaluated along the split axis
    pub sah_buckets: usize,
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self {
            leaf_size: 4,
            sah_buckets: 12,
        }
    }
}

impl BvhSettings {
    /// Set the leaf threshold
    pub fn with_leaf_size(mut self, leaf_size: u32) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    /// Set the SAH bucket count
    pub fn with_sah_buckets(mut self, buckets: usize) -> Self {
        self.sah_buckets = buckets;
        self
    }
}

/// # Collide-and-Slide Settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideSettings {
    /// Sweep iterations per step
    pub max_iterations: u32,
    /// Clip planes remembered per step
    pub max_planes: usize,
    /// Skin kept between the hull and any surface (hammer units)
    pub skin_hu: f32,
    /// Distance used to push an embedded hull back out (hammer units)
    pub push_out_hu: f32,
    /// Normals whose dot product exceeds this are merged into one plane
    pub plane_merge_cos: f32,
    /// Final velocities below this speed (m/s) are zeroed
    pub stop_speed: f32,
    /// Minimum `normal.y` for a plane to count as ground
    pub walkable_cos: f32,
}

impl Default for SlideSettings {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            max_planes: 5,
            skin_hu: 0.2,
            push_out_hu: 1.0,
            plane_merge_cos: 0.99,
            stop_speed: 0.1,
            walkable_cos: 0.7,
        }
    }
}

impl SlideSettings {
    /// Set the iteration budget
    pub fn with_max_iterations(mut self, iterations: u32) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the skin width in hammer units
    pub fn with_skin_hu(mut self, skin_hu: f32) -> Self {
        self.skin_hu = skin_hu;
        self
    }
}

/// # Character Movement Settings
///
/// Defaults mirror the stock server variables of Quake-derived engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// `sv_gravity`
    pub gravity: f32,
    /// `sv_maxvelocity`, per axis
    pub max_velocity: f32,
    /// `sv_accelerate`
    pub accelerate: f32,
    /// `sv_airaccelerate`
    pub air_accelerate: f32,
    /// Wish speed cap while airborne
    pub air_speed_cap: f32,
    /// `sv_maxspeed`
    pub max_speed: f32,
    /// `sv_stopspeed`
    pub stop_speed: f32,
    /// `sv_friction`
    pub friction: f32,
    /// Upward speed applied on jump
    pub jump_velocity: f32,
    /// How far below the hull the ground probe reaches
    pub ground_probe: f32,
    /// Tallest ledge a grounded character walks up without jumping
    pub step_height: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            gravity: 800.0,
            max_velocity: 3500.0,
            accelerate: 10.0,
            air_accelerate: 12.0,
            air_speed_cap: 30.0,
            max_speed: 320.0,
            stop_speed: 100.0,
            friction: 4.0,
            jump_velocity: 350.0,
            ground_probe: 2.0,
            step_height: 18.0,
        }
    }
}

impl MovementSettings {
    /// Set gravity in hammer units per second squared
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set ground friction
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Set the step height in hammer units
    pub fn with_step_height(mut self, step_height: f32) -> Self {
        self.step_height = step_height;
        self
    }
}

/// # Physics Configuration
///
/// Root configuration object, loadable from `.toml` or `.ron` through
/// [`Config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// BVH build settings
    pub bvh: BvhSettings,
    /// Collide-and-slide settings
    pub slide: SlideSettings,
    /// Character movement settings
    pub movement: MovementSettings,
}

impl Config for PhysicsConfig {}

impl PhysicsConfig {
    /// Reject values the algorithms cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bvh.leaf_size == 0 {
            return Err(ConfigError::Invalid("bvh.leaf_size must be at least 1".into()));
        }
        if self.bvh.sah_buckets < 2 {
            return Err(ConfigError::Invalid("bvh.sah_buckets must be at least 2".into()));
        }
        if self.slide.max_iterations == 0 {
            return Err(ConfigError::Invalid("slide.max_iterations must be at least 1".into()));
        }
        if self.slide.max_planes == 0 {
            return Err(ConfigError::Invalid("slide.max_planes must be at least 1".into()));
        }
        if self.slide.skin_hu < 0.0 || self.slide.push_out_hu < 0.0 {
            return Err(ConfigError::Invalid("slide skin and push-out must be non-negative".into()));
        }
        if self.movement.friction < 0.0 {
            return Err(ConfigError::Invalid("movement.friction must be non-negative".into()));
        }
        if self.movement.step_height < 0.0 {
            return Err(ConfigError::Invalid("movement.step_height must be non-negative".into()));
        }
        Ok(())
    }

    /// Load from file and validate
    pub fn load_validated(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}
