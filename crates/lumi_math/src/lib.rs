//! Math types shared by the lumi crates.
//!
//! Re-exports glam and adds the small set of ray-tracing primitives the
//! scene graph and the path tracer both need.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::Mat4Ext;

/// Index of the component of `v` with the largest magnitude (0=X, 1=Y, 2=Z).
///
/// Ties resolve towards the lower axis.
#[inline]
pub fn dominant_axis(v: Vec3) -> usize {
    let a = v.abs();
    if a.x >= a.y && a.x >= a.z {
        0
    } else if a.y >= a.z {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_axis() {
        assert_eq!(dominant_axis(Vec3::new(1.0, 0.0, 0.0)), 0);
        assert_eq!(dominant_axis(Vec3::new(0.1, -3.0, 2.0)), 1);
        assert_eq!(dominant_axis(Vec3::new(0.0, 0.0, -1.0)), 2);
    }

    #[test]
    fn test_dominant_axis_tie() {
        assert_eq!(dominant_axis(Vec3::splat(1.0)), 0);
    }
}
