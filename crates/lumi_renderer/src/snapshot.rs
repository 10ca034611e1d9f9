//! Flattened, ray-trace-friendly copy of the scene graph.
//!
//! Built once per trace session and then shared read-only by every worker.

use std::collections::HashMap;
use std::sync::Arc;

use lumi_core::{Camera, DirectionalLight, Material, Mesh, NodeKind, Scene};
use lumi_math::{Aabb, Mat3, Mat4, Mat4Ext, Ray, Vec3};

use crate::intersect::HitRecord;

/// Object-space triangle geometry shared by one or more instances.
#[derive(Debug, Clone)]
pub struct Primitive {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Every 3 indices form a triangle
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl Primitive {
    /// Copy a scene mesh, computing smooth normals if it has none.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let normals = match &mesh.normals {
            Some(normals) if normals.len() == mesh.positions.len() => normals.clone(),
            _ => {
                let mut with_normals = mesh.clone();
                with_normals.ensure_normals();
                with_normals.normals.unwrap_or_default()
            }
        };

        Self {
            positions: mesh.positions.clone(),
            normals,
            indices: mesh.indices.clone(),
            bounds: mesh.bounds,
        }
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    fn vertex_ids(&self, triangle_id: usize) -> [usize; 3] {
        let base = triangle_id * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Object-space corners of a triangle.
    #[inline]
    pub fn triangle(&self, triangle_id: usize) -> [Vec3; 3] {
        self.vertex_ids(triangle_id).map(|i| self.positions[i])
    }

    /// Interpolated object-space normal at barycentrics `(u, v)`.
    ///
    /// Falls back to the face normal where the vertex normals cancel out.
    pub fn normal_at(&self, triangle_id: usize, u: f32, v: f32) -> Vec3 {
        let [i0, i1, i2] = self.vertex_ids(triangle_id);
        let smooth = self.normals[i0] * (1.0 - u - v) + self.normals[i1] * u + self.normals[i2] * v;
        smooth.try_normalize().unwrap_or_else(|| {
            let [p0, p1, p2] = self.triangle(triangle_id);
            (p1 - p0).cross(p2 - p0).normalize_or_zero()
        })
    }
}

/// A primitive placed in the world with a material.
#[derive(Debug, Clone)]
pub struct Instance {
    pub primitive_id: usize,
    pub material_id: usize,
    pub local_to_world: Mat4,
    pub world_to_local: Mat4,
    /// Inverse-transpose of the upper 3x3, for normals
    pub normal_to_world: Mat3,
    pub world_bounds: Aabb,
}

impl Instance {
    pub fn new(primitive_id: usize, material_id: usize, local_to_world: Mat4, local_bounds: &Aabb) -> Self {
        Self {
            primitive_id,
            material_id,
            local_to_world,
            world_to_local: local_to_world.inverse(),
            normal_to_world: Mat3::from_mat4(local_to_world).inverse().transpose(),
            world_bounds: local_to_world.transform_aabb(local_bounds),
        }
    }

    /// Transform a world-space ray into object space (direction normalized).
    #[inline]
    pub fn to_local(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.world_to_local.transform_point3(ray.origin),
            self.world_to_local.transform_vector3(ray.direction),
        )
        .normalized()
    }
}

/// Material flags used as part of the dedup key.
pub const MATERIAL_HAS_DIFFUSE_TEXTURE: u32 = 1;

/// Per-triangle material as the tracer sees it.
///
/// Textured materials are represented by their flat color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriMaterial {
    pub flat_color: Vec3,
    pub flags: u32,
}

impl TriMaterial {
    pub fn from_material(material: &Material) -> Self {
        let flags = if material.has_diffuse_texture() {
            MATERIAL_HAS_DIFFUSE_TEXTURE
        } else {
            0
        };
        Self {
            flat_color: material.diffuse_color,
            flags,
        }
    }

    fn key(&self) -> (u32, [u32; 3]) {
        (self.flags, self.flat_color.to_array().map(f32::to_bits))
    }
}

impl Default for TriMaterial {
    fn default() -> Self {
        Self::from_material(&Material::default())
    }
}

/// Shading inputs reconstructed from a hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub position: Vec3,
    /// Unit shading normal, facing the incoming ray
    pub normal: Vec3,
    pub albedo: Vec3,
}

/// The immutable scene a trace session works on.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub instances: Vec<Instance>,
    pub primitives: Vec<Primitive>,
    pub materials: Vec<TriMaterial>,
    /// World-space lights, directions already rotated by their node transforms
    pub lights: Vec<DirectionalLight>,
    pub camera: Option<Camera>,
    bounds: Aabb,
}

impl SceneSnapshot {
    /// Walk the scene graph once and flatten it.
    ///
    /// `camera` overrides the scene's own camera when given. Every submesh of
    /// every static mesh node becomes one instance; meshes shared through the
    /// same `Arc` become one primitive, and materials are deduplicated by
    /// (flags, flat color).
    pub fn build(scene: &Scene, camera: Option<&Camera>) -> Self {
        let mut snapshot = SceneSnapshot {
            camera: camera.copied().or(scene.camera),
            bounds: Aabb::EMPTY,
            ..Default::default()
        };
        let mut primitive_ids: HashMap<*const Mesh, usize> = HashMap::new();
        let mut material_ids: HashMap<(u32, [u32; 3]), usize> = HashMap::new();

        scene.traverse(|world, node| match &node.kind {
            NodeKind::Group => {}
            NodeKind::DirectionalLight(light) => {
                let direction = world.transform_vector3(light.direction).normalize_or_zero();
                snapshot.lights.push(DirectionalLight { direction, ..*light });
            }
            NodeKind::StaticMesh(submeshes) => {
                for submesh in submeshes {
                    if submesh.mesh.triangle_count() == 0 {
                        continue;
                    }

                    let primitive_id = *primitive_ids
                        .entry(Arc::as_ptr(&submesh.mesh))
                        .or_insert_with(|| {
                            snapshot.primitives.push(Primitive::from_mesh(&submesh.mesh));
                            snapshot.primitives.len() - 1
                        });

                    let material = TriMaterial::from_material(&submesh.material);
                    let material_id = *material_ids.entry(material.key()).or_insert_with(|| {
                        snapshot.materials.push(material);
                        snapshot.materials.len() - 1
                    });

                    let instance = Instance::new(
                        primitive_id,
                        material_id,
                        world,
                        &snapshot.primitives[primitive_id].bounds,
                    );
                    snapshot.bounds = Aabb::surrounding(&snapshot.bounds, &instance.world_bounds);
                    snapshot.instances.push(instance);
                }
            }
        });

        log::info!(
            "Scene snapshot '{}': {} instances, {} primitives, {} triangles, {} materials, {} lights",
            scene.name,
            snapshot.instances.len(),
            snapshot.primitives.len(),
            snapshot.triangle_count(),
            snapshot.materials.len(),
            snapshot.lights.len()
        );

        snapshot
    }

    /// World-space bounds of all static geometry (`Aabb::EMPTY` if none).
    pub fn world_bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Triangles across all instances.
    pub fn triangle_count(&self) -> usize {
        self.instances
            .iter()
            .map(|i| self.primitives[i.primitive_id].triangle_count())
            .sum()
    }

    pub fn material(&self, instance_id: usize) -> TriMaterial {
        self.instances
            .get(instance_id)
            .and_then(|i| self.materials.get(i.material_id))
            .copied()
            .unwrap_or_default()
    }

    /// Reconstruct position, shading normal and albedo for a hit of `ray`.
    pub fn surface(&self, ray: &Ray, hit: &HitRecord) -> SurfaceHit {
        let instance = &self.instances[hit.instance_id];
        let primitive = &self.primitives[instance.primitive_id];

        let direction = ray.direction.normalize_or_zero();
        let position = ray.origin + direction * hit.distance_t;

        let local_normal = primitive.normal_at(hit.triangle_id, hit.u, hit.v);
        let mut normal = (instance.normal_to_world * local_normal).normalize_or_zero();
        if normal.dot(direction) > 0.0 {
            normal = -normal;
        }

        SurfaceHit {
            position,
            normal,
            albedo: self.material(hit.instance_id).flat_color,
        }
    }
}
