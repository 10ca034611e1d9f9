//! Directional (sun-like) light descriptor.

use lumi_math::Vec3;

/// A light infinitely far away, arriving from a single direction.
///
/// `direction` points from the surface towards the light, so a sun straight
/// overhead is `(0, 1, 0)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction,
            color,
            intensity,
        }
    }

    /// Unit vector towards the light.
    pub fn to_light(&self) -> Vec3 {
        self.direction.normalize_or_zero()
    }

    /// Incident radiance `Li` (color scaled by intensity).
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::Y, Vec3::ONE, 1.0)
    }
}
