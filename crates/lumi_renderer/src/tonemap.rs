//! HDR to display conversion.

use lumi_math::Vec3;

pub const DISPLAY_GAMMA: f32 = 2.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToneMap {
    /// Clamp only
    None,
    /// Narkowicz's fit of the ACES filmic curve
    #[default]
    Aces,
}

impl ToneMap {
    pub fn apply(self, color: Vec3) -> Vec3 {
        match self {
            ToneMap::None => color.clamp(Vec3::ZERO, Vec3::ONE),
            ToneMap::Aces => aces_filmic(color),
        }
    }
}

/// `x (2.51 x + 0.03) / (x (2.43 x + 0.59) + 0.14)`, clamped to `[0, 1]`.
pub fn aces_filmic(color: Vec3) -> Vec3 {
    let x = color.max(Vec3::ZERO);
    let a = x * (x * 2.51 + Vec3::splat(0.03));
    let b = x * (x * 2.43 + Vec3::splat(0.59)) + Vec3::splat(0.14);
    (a / b).clamp(Vec3::ZERO, Vec3::ONE)
}

#[inline]
pub fn gamma_correct(color: Vec3, gamma: f32) -> Vec3 {
    color.max(Vec3::ZERO).powf(1.0 / gamma)
}

/// Exposure, tone mapping, then gamma.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcess {
    pub exposure: f32,
    pub tone_map: ToneMap,
    pub gamma: f32,
}

impl Default for PostProcess {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            tone_map: ToneMap::Aces,
            gamma: DISPLAY_GAMMA,
        }
    }
}

impl PostProcess {
    pub fn with_exposure(exposure: f32) -> Self {
        Self {
            exposure,
            ..Self::default()
        }
    }

    pub fn apply(&self, radiance: Vec3) -> Vec3 {
        let mapped = self.tone_map.apply(radiance * self.exposure);
        gamma_correct(mapped, self.gamma)
    }
}
