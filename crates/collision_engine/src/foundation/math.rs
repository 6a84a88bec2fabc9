//! Mathematical types and utilities
//!
//! Thin aliases over nalgebra plus the hammer-unit conversions used by the
//! movement code. World space is meters, Y up.

pub use nalgebra::{Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;
/// 4D vector type (RGBA colors for debug drawing)
pub type Vec4 = Vector4<f32>;

/// Mathematical constants
pub mod constants {
    /// Directions shorter than this are treated as zero
    pub const MIN_DIRECTION_LENGTH: f32 = 1e-6;
}

/// Hammer-unit conversions
pub mod units {
    use super::Vec3;

    /// Meters per hammer unit (one inch)
    pub const METERS_PER_HU: f32 = 0.0254;
    /// Hammer units per meter
    pub const HU_PER_METER: f32 = 39.3701;

    /// Convert hammer units to meters
    #[inline]
    pub fn hu_to_m(hu: f32) -> f32 {
        hu * METERS_PER_HU
    }

    /// Convert meters to hammer units
    #[inline]
    pub fn m_to_hu(m: f32) -> f32 {
        m * HU_PER_METER
    }

    /// Convert a hammer-unit vector to meters
    #[inline]
    pub fn vec_hu_to_m(v: &Vec3) -> Vec3 {
        v * METERS_PER_HU
    }

    /// Convert a meter vector to hammer units
    #[inline]
    pub fn vec_m_to_hu(v: &Vec3) -> Vec3 {
        v * HU_PER_METER
    }
}

/// Utility functions
pub mod utils {
    use super::Vec3;
    use super::constants::MIN_DIRECTION_LENGTH;

    /// Normalize `v`, returning the unit direction and the original length.
    ///
    /// `None` for vectors shorter than [`MIN_DIRECTION_LENGTH`].
    pub fn normalize_with_length(v: &Vec3) -> Option<(Vec3, f32)> {
        let len = v.norm();
        if len < MIN_DIRECTION_LENGTH {
            return None;
        }
        Some((v / len, len))
    }

    /// Unit vector along world axis `i` (0 = X, 1 = Y, 2 = Z)
    #[inline]
    pub fn axis(i: usize) -> Vec3 {
        let mut v = Vec3::zeros();
        v[i] = 1.0;
        v
    }

    /// Horizontal (XZ) part of a vector
    #[inline]
    pub fn horizontal(v: &Vec3) -> Vec3 {
        Vec3::new(v.x, 0.0, v.z)
    }
}
