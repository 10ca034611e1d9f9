//! Surface material as authored in the scene graph.

use lumi_math::Vec3;

/// A diffuse material: a flat color, optionally backed by a texture.
///
/// Texture paths are carried for the real-time viewport; the path tracer
/// approximates textured materials by their flat `diffuse_color`.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name
    pub name: String,

    /// Diffuse/albedo color (RGB, 0-1)
    pub diffuse_color: Vec3,

    /// Path to diffuse/albedo texture
    pub diffuse_texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: Vec3::new(0.5, 0.5, 0.5), // Grey default
            diffuse_texture: None,
        }
    }
}

impl Material {
    /// Create a new material with just a name and diffuse color.
    pub fn new(name: impl Into<String>, diffuse_color: Vec3) -> Self {
        Self {
            name: name.into(),
            diffuse_color,
            ..Default::default()
        }
    }

    /// Attach a diffuse texture path.
    pub fn with_diffuse_texture(mut self, path: impl Into<String>) -> Self {
        self.diffuse_texture = Some(path.into());
        self
    }

    pub fn has_diffuse_texture(&self) -> bool {
        self.diffuse_texture.is_some()
    }
}
