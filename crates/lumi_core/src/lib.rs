//! Lumi Core - the scene graph the path tracer reads from.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` (positions, normals, triangle indices)
//! - **Shading inputs**: `Material`, `DirectionalLight`, `Camera`
//! - **Scene graph**: `Scene` of `SceneNode`s carrying a closed `NodeKind`
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lumi_core::{DirectionalLight, Material, Mesh, Scene, Submesh, Transform};
//! use lumi_math::Vec3;
//!
//! let mut scene = Scene::new("quad");
//! let mesh = Arc::new(Mesh::quad(1.0));
//! let grey = Arc::new(Material::new("grey", Vec3::splat(0.5)));
//! scene.add_static_mesh("floor", Transform::default(), vec![Submesh::new(mesh, grey)])?;
//! scene.add_directional_light("sun", DirectionalLight::new(Vec3::Y, Vec3::ONE, 1.0));
//!
//! assert_eq!(scene.node_count(), 2);
//! # Ok::<(), lumi_core::SceneError>(())
//! ```

pub mod camera;
pub mod error;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;

// Re-export commonly used types
pub use camera::Camera;
pub use error::{SceneError, SceneResult};
pub use light::DirectionalLight;
pub use material::Material;
pub use mesh::Mesh;
pub use scene::{NodeId, NodeKind, Scene, SceneNode, Submesh, Transform};
