//! Core settings shared by the physics subsystems

pub mod config;

pub use config::{PhysicsConfig, BvhSettings, SlideSettings, MovementSettings};
