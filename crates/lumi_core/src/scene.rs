//! Scene graph types.
//!
//! A scene is a forest of nodes. Every node has a local transform and a
//! closed `NodeKind`; the renderer walks the graph once with
//! [`Scene::traverse`] and never needs to inspect anything else.

use std::sync::Arc;

use lumi_math::{Aabb, Mat4, Mat4Ext, Quat, Vec3};

use crate::camera::Camera;
use crate::error::{SceneError, SceneResult};
use crate::light::DirectionalLight;
use crate::material::Material;
use crate::mesh::Mesh;

/// Index of a node inside its scene.
pub type NodeId = usize;

/// Transform components that can be composed into a matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Decompose a 4x4 matrix into translation, rotation, and scale.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// One drawable piece of a static mesh node: geometry plus its material.
#[derive(Clone, Debug)]
pub struct Submesh {
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
}

impl Submesh {
    pub fn new(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self { mesh, material }
    }
}

/// What a scene node represents.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Pure transform node.
    Group,
    /// Static geometry, one entry per submesh.
    StaticMesh(Vec<Submesh>),
    /// Directional light. Its direction is rotated by the node's world transform.
    DirectionalLight(DirectionalLight),
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A complete scene: node hierarchy plus an optional active camera.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub name: String,
    nodes: Vec<SceneNode>,
    pub camera: Option<Camera>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a node under `parent` (or as a root) and return its id.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        kind: NodeKind,
        parent: Option<NodeId>,
    ) -> SceneResult<NodeId> {
        if let Some(parent_id) = parent {
            if parent_id >= self.nodes.len() {
                return Err(SceneError::UnknownParent(parent_id));
            }
        }
        if let NodeKind::StaticMesh(submeshes) = &kind {
            for submesh in submeshes {
                submesh.mesh.validate()?;
            }
        }

        let id = self.nodes.len();
        self.nodes.push(SceneNode {
            name: name.into(),
            transform,
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id].children.push(id);
        }
        Ok(id)
    }

    /// Add a root-level static mesh node.
    pub fn add_static_mesh(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        submeshes: Vec<Submesh>,
    ) -> SceneResult<NodeId> {
        self.add_node(name, transform, NodeKind::StaticMesh(submeshes), None)
    }

    /// Add a root-level directional light.
    pub fn add_directional_light(
        &mut self,
        name: impl Into<String>,
        light: DirectionalLight,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SceneNode {
            name: name.into(),
            transform: Transform::default(),
            kind: NodeKind::DirectionalLight(light),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Visit every node depth-first with its composed local-to-world matrix.
    pub fn traverse<F>(&self, mut visit: F)
    where
        F: FnMut(Mat4, &SceneNode),
    {
        for (id, node) in self.nodes.iter().enumerate() {
            if node.parent.is_none() {
                self.traverse_from(id, Mat4::IDENTITY, &mut visit);
            }
        }
    }

    fn traverse_from<F>(&self, id: NodeId, parent_matrix: Mat4, visit: &mut F)
    where
        F: FnMut(Mat4, &SceneNode),
    {
        let node = &self.nodes[id];
        let world = parent_matrix * node.transform.to_matrix();
        visit(world, node);
        for &child in &node.children {
            self.traverse_from(child, world, visit);
        }
    }

    /// Get total triangle count across all static meshes.
    pub fn total_triangle_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match &node.kind {
                NodeKind::StaticMesh(submeshes) => {
                    submeshes.iter().map(|s| s.mesh.triangle_count()).sum()
                }
                _ => 0,
            })
            .sum()
    }

    /// Compute the world-space bounding box of all static geometry.
    pub fn world_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        self.traverse(|world, node| {
            if let NodeKind::StaticMesh(submeshes) = &node.kind {
                for submesh in submeshes {
                    let b = world.transform_aabb(&submesh.mesh.bounds);
                    bounds = Aabb::surrounding(&bounds, &b);
                }
            }
        });
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey() -> Arc<Material> {
        Arc::new(Material::new("grey", Vec3::splat(0.5)))
    }

    #[test]
    fn test_scene_creation() {
        let mut scene = Scene::new("test");
        let quad = Arc::new(Mesh::quad(1.0));

        scene
            .add_static_mesh("a", Transform::default(), vec![Submesh::new(quad.clone(), grey())])
            .unwrap();
        scene
            .add_static_mesh(
                "b",
                Transform::from_translation(Vec3::X * 2.0),
                vec![Submesh::new(quad, grey())],
            )
            .unwrap();
        scene.add_directional_light("sun", DirectionalLight::default());

        assert_eq!(scene.node_count(), 3);
        assert_eq!(scene.total_triangle_count(), 4);
    }

    #[test]
    fn test_traverse_composes_parent_transforms() {
        let mut scene = Scene::new("hierarchy");
        let parent = scene
            .add_node(
                "root",
                Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)),
                NodeKind::Group,
                None,
            )
            .unwrap();
        scene
            .add_node(
                "child",
                Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)),
                NodeKind::Group,
                Some(parent),
            )
            .unwrap();

        let mut origins = Vec::new();
        scene.traverse(|world, node| origins.push((node.name.clone(), world.transform_point3(Vec3::ZERO))));

        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], ("root".to_string(), Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(origins[1], ("child".to_string(), Vec3::new(1.0, 2.0, 0.0)));
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let mut scene = Scene::new("bad");
        let result = scene.add_node("orphan", Transform::default(), NodeKind::Group, Some(3));
        assert_eq!(result, Err(SceneError::UnknownParent(3)));
    }

    #[test]
    fn test_invalid_mesh_is_rejected() {
        let mut scene = Scene::new("bad");
        let mesh = Arc::new(Mesh::new(vec![Vec3::ZERO], vec![0, 0], None));
        let result = scene.add_static_mesh("broken", Transform::default(), vec![Submesh::new(mesh, grey())]);

        assert!(matches!(result, Err(SceneError::IndexCountNotTriangles { len: 2 })));
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn test_world_bounds() {
        let mut scene = Scene::new("bounds");
        assert!(scene.world_bounds().is_empty());

        scene
            .add_static_mesh(
                "floor",
                Transform::from_translation(Vec3::new(0.0, -1.0, 0.0)).with_scale(Vec3::splat(4.0)),
                vec![Submesh::new(Arc::new(Mesh::quad(1.0)), grey())],
            )
            .unwrap();

        let bounds = scene.world_bounds();
        assert!((bounds.x.min + 2.0).abs() < 1e-4);
        assert!((bounds.z.max - 2.0).abs() < 1e-4);
        assert!(bounds.contains_point(Vec3::new(0.0, -1.0, 0.0)));
    }

    #[test]
    fn test_transform_matrix_roundtrip() {
        let transform = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let recovered = Transform::from_matrix(transform.to_matrix());

        assert!((recovered.translation - transform.translation).length() < 0.001);
        assert!((recovered.scale - transform.scale).length() < 0.001);
    }
}
