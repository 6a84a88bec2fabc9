//! Transform component
//!
//! Only translation is applied to collision geometry; rotation and scale of
//! static meshes are not supported.

use crate::foundation::math::Vec3;

/// World-space placement of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformComponent {
    /// World space position (Y-up right-handed)
    pub position: Vec3,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
        }
    }
}

impl TransformComponent {
    /// Create from position only
    pub fn from_position(position: Vec3) -> Self {
        Self { position }
    }

    /// Move by `offset`
    pub fn translate(&mut self, offset: &Vec3) {
        self.position += offset;
    }
}
