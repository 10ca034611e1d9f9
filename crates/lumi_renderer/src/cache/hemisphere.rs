//! Stratified hemisphere integration with irradiance gradients.
//!
//! Gradients follow Ward & Heckbert, "Irradiance Gradients" (1992): the
//! rotational term from the tilt of each stratum, the translational term
//! from finite differences between neighbouring strata weighted by the
//! distance to the geometry they saw.

use std::f32::consts::{PI, TAU};

use lumi_math::{Ray, Vec3};
use rand::RngCore;

use crate::intersect::SURFACE_OFFSET;
use crate::sampler::{stratified_cosine_hemisphere, tangent_frame, theta_at};

/// What a single hemisphere ray brought back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncidentSample {
    /// Radiance arriving along the ray (towards its origin)
    pub radiance: Vec3,
    /// Distance to the surface that emitted it, `None` for sky
    pub distance: Option<f32>,
}

impl IncidentSample {
    pub fn sky(radiance: Vec3) -> Self {
        Self {
            radiance,
            distance: None,
        }
    }
}

/// Source of incident radiance for cache records: traces a ray and shades
/// whatever it finds.
pub trait IncidentRadiance: Sync {
    /// `depth` is the bounce level of the record being computed (1 = first
    /// indirect bounce).
    fn incident(&self, ray: &Ray, depth: u32, rng: &mut dyn RngCore) -> IncidentSample;
}

/// θ × φ resolution of a stratified hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HemisphereGrid {
    pub theta: usize,
    pub phi: usize,
}

impl HemisphereGrid {
    pub fn new(theta: usize, phi: usize) -> Self {
        Self { theta, phi }
    }

    pub fn sample_count(&self) -> usize {
        self.theta * self.phi
    }
}

/// Irradiance and gradients integrated over one hemisphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereEstimate {
    pub irradiance: Vec3,
    pub gradient_rotational: [Vec3; 3],
    pub gradient_translational: [Vec3; 3],
    /// Harmonic mean distance to the geometry seen; infinite if nothing was hit
    pub harmonic_distance: f32,
    pub hits: usize,
}

/// `grad[c] += direction * per_channel[c]` for each color channel.
#[inline]
fn accumulate(grad: &mut [Vec3; 3], direction: Vec3, per_channel: Vec3) {
    for (c, g) in grad.iter_mut().enumerate() {
        *g += direction * per_channel[c];
    }
}

/// Integrate incident radiance over the hemisphere around `normal` at `point`.
///
/// Sample `(j, k)` is one jittered cosine-weighted direction in θ-row `j` and
/// φ-column `k`, so `E = π / (M N) Σ L`. Rays that hit nothing contribute
/// whatever sky radiance `source` returns and infinite distance.
pub fn sample_hemisphere<S>(
    point: Vec3,
    normal: Vec3,
    grid: HemisphereGrid,
    source: &S,
    depth: u32,
    rng: &mut dyn RngCore,
) -> HemisphereEstimate
where
    S: IncidentRadiance + ?Sized,
{
    let (m, n) = (grid.theta.max(1), grid.phi.max(1));
    let at = |j: usize, k: usize| j * n + k;
    let origin = point + normal * SURFACE_OFFSET;

    let mut radiance = vec![Vec3::ZERO; m * n];
    let mut distance = vec![f32::INFINITY; m * n];
    let mut inverse_distance_sum = 0.0f32;
    let mut hits = 0;

    for j in 0..m {
        for k in 0..n {
            let direction = stratified_cosine_hemisphere(normal, j, k, m, n, rng);
            let sample = source.incident(&Ray::new(origin, direction), depth, rng);
            radiance[at(j, k)] = sample.radiance;
            if let Some(d) = sample.distance.filter(|d| *d > 0.0 && d.is_finite()) {
                distance[at(j, k)] = d;
                inverse_distance_sum += 1.0 / d;
                hits += 1;
            }
        }
    }

    let sample_count = (m * n) as f32;
    let total = radiance.iter().fold(Vec3::ZERO, |acc, l| acc + *l);
    let irradiance = total * (PI / sample_count);

    let frame = tangent_frame(normal);
    let in_plane = |phi: f32| frame * Vec3::new(phi.cos(), phi.sin(), 0.0);

    let mut gradient_rotational = [Vec3::ZERO; 3];
    let mut gradient_translational = [Vec3::ZERO; 3];

    for k in 0..n {
        let phi_center = TAU * (k as f32 + 0.5) / n as f32;
        let phi_edge = TAU * k as f32 / n as f32;
        let u_k = in_plane(phi_center);
        let v_center = in_plane(phi_center + PI * 0.5);
        let v_edge = in_plane(phi_edge + PI * 0.5);
        let k_prev = (k + n - 1) % n;

        // Rotation: n x ω = sin θ · v(φ); cosine sampling turns sin θ into tan θ.
        let mut tilt = Vec3::ZERO;
        for j in 0..m {
            tilt += radiance[at(j, k)] * theta_at(j as f32 + 0.5, m).tan();
        }
        accumulate(&mut gradient_rotational, v_center, tilt * (PI / sample_count));

        // Translation across θ-row boundaries
        for j in 1..m {
            let (sin_t, cos_t) = theta_at(j as f32, m).sin_cos();
            let nearest = distance[at(j, k)].min(distance[at(j - 1, k)]);
            let coefficient = (TAU / n as f32) * sin_t * cos_t * cos_t / nearest;
            let delta = radiance[at(j, k)] - radiance[at(j - 1, k)];
            accumulate(&mut gradient_translational, u_k, delta * coefficient);
        }

        // Translation across φ-column boundaries
        if n > 1 {
            for j in 0..m {
                let cos_lo = theta_at(j as f32, m).cos();
                let cos_hi = theta_at(j as f32 + 1.0, m).cos();
                let sin_mid = theta_at(j as f32 + 0.5, m).sin();
                let nearest = distance[at(j, k)].min(distance[at(j, k_prev)]);
                let coefficient = (cos_lo - cos_hi) / (sin_mid * nearest);
                let delta = radiance[at(j, k)] - radiance[at(j, k_prev)];
                accumulate(&mut gradient_translational, v_edge, delta * coefficient);
            }
        }
    }

    let harmonic_distance = if inverse_distance_sum > 0.0 {
        sample_count / inverse_distance_sum
    } else {
        f32::INFINITY
    };

    HemisphereEstimate {
        irradiance,
        gradient_rotational,
        gradient_translational,
        harmonic_distance,
        hits,
    }
}
