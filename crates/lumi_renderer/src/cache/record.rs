//! Irradiance records and the interpolation weight between them and a query.

use lumi_math::Vec3;

use crate::error::{TraceError, TraceResult};

/// `sqrt(1 - cos(10°))`: angular divergence that alone zeroes the weight at accuracy 1.
pub const MAX_ANGLE_TERM: f32 = 0.123_256_83;

/// Tolerance of the "in front of the record" test, so coplanar queries are
/// not rejected by rounding.
const FRONT_TOLERANCE: f32 = 1e-4;

/// A cached irradiance estimate at one surface point.
///
/// Immutable once inserted. Gradients are stored per color channel, each a
/// world-space vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrradianceRecord {
    pub position: Vec3,
    pub normal: Vec3,
    pub irradiance: Vec3,
    /// Validity radius, always > 0
    pub r: f32,
    pub gradient_rotational: [Vec3; 3],
    pub gradient_translational: [Vec3; 3],
}

impl IrradianceRecord {
    /// A record without gradients (constant extrapolation).
    pub fn new(position: Vec3, normal: Vec3, irradiance: Vec3, r: f32) -> Self {
        Self {
            position,
            normal,
            irradiance,
            r,
            gradient_rotational: [Vec3::ZERO; 3],
            gradient_translational: [Vec3::ZERO; 3],
        }
    }

    /// Check the invariants lookups rely on: a finite positive radius, a
    /// finite unit-ish normal and finite, non-negative irradiance.
    pub fn validate(&self) -> TraceResult<()> {
        if !(self.r.is_finite() && self.r > 0.0) {
            return Err(TraceError::InvalidRecord(format!("radius must be positive, got {}", self.r)));
        }
        if !self.position.is_finite() {
            return Err(TraceError::InvalidRecord(format!("position {} is not finite", self.position)));
        }
        if !self.normal.is_finite() || self.normal.length_squared() < 1e-6 {
            return Err(TraceError::InvalidRecord(format!("normal {} is degenerate", self.normal)));
        }
        if !self.irradiance.is_finite() || self.irradiance.min_element() < 0.0 {
            return Err(TraceError::InvalidRecord(format!(
                "irradiance must be finite and non-negative, got {}",
                self.irradiance
            )));
        }
        Ok(())
    }

    /// Validity weight of this record for a query at `(point, normal)`.
    ///
    /// `w = 1 - accuracy * max(2|p - p_i| / r_i, sqrt(1 - n·n_i) / sqrt(1 - cos 10°))`.
    /// Non-positive weights mean the record must not be used.
    pub fn weight(&self, point: Vec3, normal: Vec3, accuracy: f32) -> f32 {
        let distance_term = 2.0 * (point - self.position).length() / self.r;
        let angle_term = (1.0 - normal.dot(self.normal)).max(0.0).sqrt() / MAX_ANGLE_TERM;
        1.0 - accuracy * distance_term.max(angle_term)
    }

    /// True when the query lies behind the record's surface with respect to
    /// the averaged normal; the cached hemisphere does not cover it.
    pub fn excludes(&self, point: Vec3, normal: Vec3) -> bool {
        let averaged = (self.normal + normal) * 0.5;
        (point - self.position).dot(averaged) < -FRONT_TOLERANCE
    }

    /// Irradiance extrapolated to `(point, normal)` with first-order
    /// rotational and translational gradients. Clamped to be non-negative.
    pub fn extrapolate(&self, point: Vec3, normal: Vec3) -> Vec3 {
        let rotation_axis = self.normal.cross(normal);
        let offset = point - self.position;
        let correction = Vec3::from_array(std::array::from_fn(|c| {
            rotation_axis.dot(self.gradient_rotational[c]) + offset.dot(self.gradient_translational[c])
        }));
        (self.irradiance + correction).max(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> IrradianceRecord {
        IrradianceRecord::new(Vec3::ZERO, Vec3::Y, Vec3::new(1.0, 2.0, 3.0), 1.0)
    }

    #[test]
    fn test_max_angle_term_matches_ten_degrees() {
        let expected = (1.0 - 10.0_f32.to_radians().cos()).sqrt();
        assert!((MAX_ANGLE_TERM - expected).abs() < 1e-6);
    }

    #[test]
    fn test_weight_is_one_at_record() {
        assert_eq!(record().weight(Vec3::ZERO, Vec3::Y, 1.0), 1.0);
    }

    #[test]
    fn test_weight_decreases_with_distance() {
        let rec = record();
        let mut last = f32::INFINITY;
        for step in 0..20 {
            let p = Vec3::new(step as f32 * 0.05, 0.0, 0.0);
            let w = rec.weight(p, Vec3::Y, 1.0 / 0.5);
            assert!(w < last, "weight did not decrease at step {step}");
            last = w;
        }
    }

    #[test]
    fn test_weight_decreases_with_angle() {
        let rec = record();
        let mut last = f32::INFINITY;
        for step in 0..20 {
            let angle = (step as f32 * 1.5).to_radians();
            let n = Vec3::new(angle.sin(), angle.cos(), 0.0);
            let w = rec.weight(Vec3::ZERO, n, 1.0 / 0.5);
            assert!(w < last, "weight did not decrease at {angle} rad");
            last = w;
        }
    }

    #[test]
    fn test_weight_zero_at_half_radius_for_accuracy_one() {
        let w = record().weight(Vec3::new(0.5, 0.0, 0.0), Vec3::Y, 1.0);
        assert!(w.abs() < 1e-6);
    }

    #[test]
    fn test_excludes_points_behind_surface() {
        let rec = record();
        assert!(!rec.excludes(Vec3::new(0.3, 0.0, 0.0), Vec3::Y));
        assert!(!rec.excludes(Vec3::new(0.3, 0.2, 0.0), Vec3::Y));
        assert!(rec.excludes(Vec3::new(0.3, -0.2, 0.0), Vec3::Y));
    }

    #[test]
    fn test_extrapolate_translational_gradient() {
        let mut rec = record();
        rec.gradient_translational = [Vec3::X, Vec3::X * 2.0, Vec3::ZERO];

        let e = rec.extrapolate(Vec3::new(0.25, 0.0, 0.0), Vec3::Y);
        assert!((e - Vec3::new(1.25, 2.5, 3.0)).length() < 1e-6);
    }

    #[test]
    fn test_extrapolate_rotational_gradient_and_clamp() {
        let mut rec = record();
        rec.gradient_rotational = [Vec3::Z * -20.0, Vec3::ZERO, Vec3::Z];

        // Tilting the normal towards +X rotates about -Z
        let n = Vec3::new(0.1, 1.0, 0.0).normalize();
        let e = rec.extrapolate(Vec3::ZERO, n);
        let axis_z = Vec3::Y.cross(n).z;

        assert!(axis_z < 0.0);
        assert!((e.x - (1.0 - 20.0 * axis_z)).abs() < 1e-5);
        assert!((e.z - (3.0 + axis_z)).abs() < 1e-5);

        let flipped = rec.extrapolate(Vec3::ZERO, Vec3::new(-0.1, 1.0, 0.0).normalize());
        assert_eq!(flipped.x, 0.0);
    }
}
