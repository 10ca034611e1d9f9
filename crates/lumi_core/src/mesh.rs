//! Triangle mesh geometry for the scene graph.

use lumi_math::{Aabb, Vec3};

use crate::error::{SceneError, SceneResult};

/// A mesh consisting of vertex positions, optional normals, and triangle indices.
///
/// Triangles use counter-clockwise winding: the face normal of `(v0, v1, v2)`
/// is `(v1 - v0) x (v2 - v0)`.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional, one per position when present)
    pub normals: Option<Vec<Vec3>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box in object space
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Aabb::from_point_cloud(&positions);
        Self {
            positions,
            normals,
            indices,
            bounds,
        }
    }

    /// A square in the XZ plane centered at the origin, facing +Y.
    pub fn quad(size: f32) -> Self {
        let h = size * 0.5;
        let positions = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(h, 0.0, h),
            Vec3::new(-h, 0.0, h),
        ];
        Self::new(positions, vec![0, 2, 1, 0, 3, 2], Some(vec![Vec3::Y; 4]))
    }

    /// Check the index buffer and normals against the vertex data.
    pub fn validate(&self) -> SceneResult<()> {
        if self.indices.len() % 3 != 0 {
            return Err(SceneError::IndexCountNotTriangles {
                len: self.indices.len(),
            });
        }

        let vertex_count = self.positions.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(SceneError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        if let Some(normals) = &self.normals {
            if normals.len() != vertex_count {
                return Err(SceneError::NormalCountMismatch {
                    normals: normals.len(),
                    positions: vertex_count,
                });
            }
        }

        Ok(())
    }

    /// Compute smooth vertex normals by averaging area-weighted face normals.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            // Degenerate or unreferenced vertices fall back to up
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Ensure the mesh has per-vertex normals, computing them if necessary.
    pub fn ensure_normals(&mut self) {
        let should_compute = match &self.normals {
            None => true,
            Some(normals) => normals.len() != self.positions.len(),
        };

        if should_compute {
            log::debug!(
                "Computing smooth normals for mesh with {} vertices",
                self.positions.len()
            );
            self.compute_normals();
        }
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}
