//! Hemisphere and low-discrepancy sampling.
//!
//! All hemisphere samplers return world-space unit vectors on the side of
//! `normal`. Their PDFs differ, which callers must respect:
//!
//! | sampler                          | pdf            |
//! |----------------------------------|----------------|
//! | [`cosine_weighted_hemisphere`]   | cos θ / π      |
//! | [`stratified_cosine_hemisphere`] | cos θ / π      |
//! | [`uniform_hemisphere`]           | 1 / 2π         |
//!
//! With the cosine samplers the `cos θ` of the irradiance integral cancels,
//! so estimates are `π / n · Σ L`. Do not apply the cosine again.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use lumi_math::{Mat3, Vec2, Vec3};
use rand::{Rng, RngCore};

/// Uniform float in `[0, 1)`.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Orthonormal basis whose third column is `normal`.
///
/// Columns are `(tangent, bitangent, normal)`. "World up" is +Y unless the
/// normal is nearly vertical, in which case +Z is used.
pub fn tangent_frame(normal: Vec3) -> Mat3 {
    let up = if normal.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let tangent = up.cross(normal).normalize();
    let bitangent = normal.cross(tangent);
    Mat3::from_cols(tangent, bitangent, normal)
}

/// Shirley-Chiu concentric mapping of `[0,1)²` onto the unit disk.
pub fn concentric_disk(u: Vec2) -> Vec2 {
    let offset = u * 2.0 - Vec2::ONE;
    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (offset.y, FRAC_PI_2 - FRAC_PI_4 * (offset.x / offset.y))
    };
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Cosine-weighted direction from a uniform `[0,1)²` sample.
///
/// Disk points are lifted onto the hemisphere (Malley's method).
pub fn cosine_hemisphere_from(normal: Vec3, u: Vec2) -> Vec3 {
    let d = concentric_disk(u);
    let z = (1.0 - d.length_squared()).max(0.0).sqrt();
    (tangent_frame(normal) * Vec3::new(d.x, d.y, z)).normalize()
}

/// Cosine-weighted hemisphere direction around `normal`.
pub fn cosine_weighted_hemisphere(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let u = Vec2::new(gen_f32(rng), gen_f32(rng));
    cosine_hemisphere_from(normal, u)
}

/// Uniform hemisphere direction around `normal`.
pub fn uniform_hemisphere(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let z = gen_f32(rng);
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = TAU * gen_f32(rng);
    tangent_frame(normal) * Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Polar angle of the stratum boundary `j / m` under cosine weighting.
///
/// Cell `j` of an `m`-row grid spans `[theta_at(j, m), theta_at(j + 1, m)]`,
/// each row carrying the same projected solid angle.
#[inline]
pub fn theta_at(j: f32, m: usize) -> f32 {
    (j / m as f32).clamp(0.0, 1.0).sqrt().asin()
}

/// Jittered cosine-weighted sample in cell `(j, k)` of an `m × n` (θ × φ) grid.
pub fn stratified_cosine_hemisphere(
    normal: Vec3,
    j: usize,
    k: usize,
    m: usize,
    n: usize,
    rng: &mut dyn RngCore,
) -> Vec3 {
    let theta = theta_at(j as f32 + gen_f32(rng), m);
    let phi = TAU * (k as f32 + gen_f32(rng)) / n as f32;
    let (sin_theta, cos_theta) = theta.sin_cos();
    let local = Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
    (tangent_frame(normal) * local).normalize()
}

/// Radical inverse of `index` in `base` (van der Corput).
pub fn radical_inverse(mut index: u32, base: u32) -> f32 {
    let inv_base = 1.0 / base as f64;
    let mut inv_bi = inv_base;
    let mut result = 0.0f64;
    while index > 0 {
        result += (index % base) as f64 * inv_bi;
        index /= base;
        inv_bi *= inv_base;
    }
    // f64 accumulation keeps the result strictly below 1.0 after rounding
    (result as f32).min(1.0 - f32::EPSILON)
}

/// Point `index` of the 2D Halton sequence.
pub fn halton(index: u32, base_x: u32, base_y: u32) -> Vec2 {
    Vec2::new(radical_inverse(index, base_x), radical_inverse(index, base_y))
}

/// Point `index` of the (2, 3) Halton sequence.
#[inline]
pub fn halton23(index: u32) -> Vec2 {
    halton(index, 2, 3)
}

/// Solid-angle PDF of the cosine samplers.
#[inline]
pub fn cosine_pdf(cos_theta: f32) -> f32 {
    cos_theta.max(0.0) / PI
}
