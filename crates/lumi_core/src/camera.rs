//! Camera descriptor handed to the path tracer.

use lumi_math::{Mat4, Vec3};

/// A pinhole camera described by its eye point and orthonormal basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Width / height
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Build a camera at `position` looking at `target`.
    ///
    /// `world_up` only orients the basis; when it is parallel to the view
    /// direction, +Z is used instead.
    pub fn look_at(position: Vec3, target: Vec3, world_up: Vec3, aspect_ratio: f32) -> Self {
        let forward = (target - position).normalize_or_zero();
        let mut right = forward.cross(world_up);
        if right.length_squared() < 1e-8 {
            right = forward.cross(Vec3::Z);
        }
        let right = right.normalize_or_zero();
        let up = right.cross(forward);

        Self {
            position,
            forward,
            right,
            up,
            fov_degrees: 45.0,
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
        }
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov_degrees = fov_degrees;
        self
    }

    /// Set the clip range.
    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Get the view matrix (world → camera space)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// Update aspect ratio (e.g., to match the output image)
    pub fn set_aspect(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_at_basis_is_orthonormal() {
        let camera = Camera::look_at(Vec3::new(3.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y, 16.0 / 9.0);

        assert!((camera.forward.length() - 1.0).abs() < 1e-5);
        assert!((camera.right.length() - 1.0).abs() < 1e-5);
        assert!((camera.up.length() - 1.0).abs() < 1e-5);
        assert!(camera.forward.dot(camera.right).abs() < 1e-5);
        assert!(camera.forward.dot(camera.up).abs() < 1e-5);
        assert!(camera.up.y > 0.0);
    }

    #[test]
    fn test_look_straight_down() {
        // View direction parallel to world up must still produce a basis
        let camera = Camera::look_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y, 1.0);

        assert_eq!(camera.forward, Vec3::NEG_Y);
        assert!((camera.right.length() - 1.0).abs() < 1e-5);
        assert!((camera.up.length() - 1.0).abs() < 1e-5);
        assert!(camera.right.dot(camera.up).abs() < 1e-5);
    }

    #[test]
    fn test_view_matrix_moves_eye_to_origin() {
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 1.0);
        let eye = camera.view_matrix().transform_point3(camera.position);

        assert!(eye.length() < 1e-5);
    }
}
