//! Primary ray generation.

use lumi_core::Camera;
use lumi_math::{Ray, Vec2, Vec3};

/// Pinhole projection of a [`Camera`] onto a `width` x `height` image.
///
/// Pixel `(0, 0)` is the bottom-left corner of the image; `y` grows upwards.
#[derive(Debug, Clone, Copy)]
pub struct PinholeCamera {
    origin: Vec3,
    forward: Vec3,
    lower_left: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    near: f32,
    far: f32,
    width: u32,
    height: u32,
}

impl PinholeCamera {
    /// The image aspect ratio wins over `camera.aspect_ratio` so pixels stay square.
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let aspect = width as f32 / height as f32;

        let half_height = (camera.fov_degrees.to_radians() * 0.5).tan();
        let half_width = half_height * aspect;

        let forward = camera.forward.normalize_or_zero();
        let horizontal = camera.right.normalize_or_zero() * (2.0 * half_width);
        let vertical = camera.up.normalize_or_zero() * (2.0 * half_height);
        let lower_left = forward - horizontal * 0.5 - vertical * 0.5;

        Self {
            origin: camera.position,
            forward,
            lower_left,
            horizontal,
            vertical,
            near: camera.near,
            far: camera.far,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Ray through pixel `(x, y)` at sub-pixel position `offset` in `[0,1)²`.
    pub fn ray(&self, x: u32, y: u32, offset: Vec2) -> Ray {
        let s = (x as f32 + offset.x) / self.width as f32;
        let t = (y as f32 + offset.y) / self.height as f32;
        let direction = self.lower_left + self.horizontal * s + self.vertical * t;
        Ray::new(self.origin, direction.normalize_or_zero())
    }

    /// Ray through the center of pixel `(x, y)`.
    pub fn center_ray(&self, x: u32, y: u32) -> Ray {
        self.ray(x, y, Vec2::splat(0.5))
    }

    /// True if a hit `distance` along `ray` lies outside the near/far
    /// planes, measured as depth along the view axis.
    pub fn clipped(&self, ray: &Ray, distance: f32) -> bool {
        let depth = distance * ray.direction.normalize_or_zero().dot(self.forward);
        depth < self.near || depth > self.far
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PinholeCamera {
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 1.0).with_fov(90.0);
        PinholeCamera::new(&camera, 11, 11)
    }

    #[test]
    fn test_center_pixel_looks_forward() {
        let ray = camera().center_ray(5, 5);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-5);
        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_row_zero_is_bottom() {
        let cam = camera();
        assert!(cam.center_ray(5, 0).direction.y < 0.0);
        assert!(cam.center_ray(5, 10).direction.y > 0.0);
        assert!(cam.center_ray(0, 5).direction.x < 0.0);
    }

    #[test]
    fn test_image_corner_matches_fov() {
        let ray = camera().ray(0, 0, Vec2::ZERO);
        // 90° fov: the bottom edge is 45° below the view axis
        let d = ray.direction;
        let vertical_angle = (-d.y).atan2(-d.z).to_degrees();
        assert!((vertical_angle - 45.0).abs() < 1e-3);
    }

    #[test]
    fn test_clip_planes() {
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 1.0).with_clip(1.0, 10.0);
        let cam = PinholeCamera::new(&camera, 4, 4);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);

        assert!(!cam.clipped(&ray, 9.0));
        assert!(cam.clipped(&ray, 11.0));
        assert!(cam.clipped(&ray, 0.5));
        assert!(!cam.clipped(&ray, 1.5));
    }
}
