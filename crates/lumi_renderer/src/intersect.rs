//! Ray/triangle and ray/scene intersection.
//!
//! Every triangle of every instance is tested per ray. Instances are culled
//! against their world-space bounds first, which is exact: a ray that misses
//! the box cannot hit anything inside it.

use lumi_math::{dominant_axis, Aabb, Interval, Ray, Vec3};

use crate::snapshot::{Primitive, SceneSnapshot};

/// Determinant and distance tolerance for Möller–Trumbore.
pub const EPSILON: f32 = 1e-7;

/// Distance secondary rays start above the surface they leave, along its normal.
pub const SURFACE_OFFSET: f32 = 1e-3;

/// Result of a single ray/triangle test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Ray parameter of the hit, in units of the ray direction
    pub t: f32,
    /// Barycentric weight of `v1`
    pub u: f32,
    /// Barycentric weight of `v2`
    pub v: f32,
}

impl TriangleHit {
    /// Weights of `(v0, v1, v2)`; they sum to one.
    #[inline]
    pub fn barycentrics(&self) -> Vec3 {
        Vec3::new(1.0 - self.u - self.v, self.u, self.v)
    }
}

/// Closest hit of a ray against the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// World-space distance along the normalized ray direction
    pub distance_t: f32,
    pub instance_id: usize,
    pub triangle_id: usize,
    /// Barycentric weight of the triangle's second vertex
    pub u: f32,
    /// Barycentric weight of the triangle's third vertex
    pub v: f32,
}

/// Möller–Trumbore ray/triangle intersection with barycentrics.
///
/// Rejects rays (near-)parallel to the triangle plane, hits outside the
/// triangle and hits at or behind the origin. Degenerate (zero-area)
/// triangles fail the parallel test.
pub fn intersect_triangle_barycentric(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let det = edge1.dot(h);
    if det.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / det;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if !(0.0..=1.0).contains(&v) || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if t <= EPSILON {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Möller–Trumbore test returning only the ray parameter.
#[inline]
pub fn intersect_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    intersect_triangle_barycentric(ray, v0, v1, v2).map(|hit| hit.t)
}

/// Slab test of a ray against a box over `(0, t_max]`.
#[inline]
pub fn intersect_aabb(ray: &Ray, aabb: &Aabb, t_max: f32) -> bool {
    aabb.hit(ray, Interval::new(0.0, t_max))
}

/// Closest triangle of `primitive` hit by an object-space ray.
fn closest_triangle(ray: &Ray, primitive: &Primitive) -> Option<(usize, TriangleHit)> {
    let mut closest: Option<(usize, TriangleHit)> = None;
    for triangle_id in 0..primitive.triangle_count() {
        let [v0, v1, v2] = primitive.triangle(triangle_id);
        if let Some(hit) = intersect_triangle_barycentric(ray, v0, v1, v2) {
            if closest.map_or(true, |(_, best)| hit.t < best.t) {
                closest = Some((triangle_id, hit));
            }
        }
    }
    closest
}

/// Closest hit across all instances, or `None`.
///
/// Each instance is intersected in object space. The object-space hit point
/// is mapped back to world space and its distance measured along the
/// dominant axis of the world direction, so axis-aligned rays never divide
/// by a zero component.
pub fn trace(ray: &Ray, scene: &SceneSnapshot) -> Option<HitRecord> {
    let ray = ray.normalized();
    if ray.direction == Vec3::ZERO {
        return None;
    }
    let axis = dominant_axis(ray.direction);

    let mut closest: Option<HitRecord> = None;
    for (instance_id, instance) in scene.instances.iter().enumerate() {
        let t_max = closest.map_or(f32::INFINITY, |hit| hit.distance_t);
        if !intersect_aabb(&ray, &instance.world_bounds, t_max) {
            continue;
        }

        let local_ray = instance.to_local(&ray);
        let primitive = &scene.primitives[instance.primitive_id];
        let Some((triangle_id, local_hit)) = closest_triangle(&local_ray, primitive) else {
            continue;
        };

        let world_point = instance.local_to_world.transform_point3(local_ray.at(local_hit.t));
        let distance_t = (world_point[axis] - ray.origin[axis]) / ray.direction[axis];
        if distance_t <= EPSILON || distance_t >= t_max {
            continue;
        }

        closest = Some(HitRecord {
            distance_t,
            instance_id,
            triangle_id,
            u: local_hit.u,
            v: local_hit.v,
        });
    }
    closest
}

/// Binary visibility: does the ray hit anything at all?
///
/// Returns on the first hit found; instance order is irrelevant.
pub fn trace_shadow(ray: &Ray, scene: &SceneSnapshot) -> bool {
    let ray = ray.normalized();
    if ray.direction == Vec3::ZERO {
        return false;
    }

    scene.instances.iter().any(|instance| {
        if !intersect_aabb(&ray, &instance.world_bounds, f32::INFINITY) {
            return false;
        }
        let local_ray = instance.to_local(&ray);
        let primitive = &scene.primitives[instance.primitive_id];
        (0..primitive.triangle_count()).any(|triangle_id| {
            let [v0, v1, v2] = primitive.triangle(triangle_id);
            intersect_triangle(&local_ray, v0, v1, v2).is_some()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SceneSnapshot;
    use lumi_core::{Material, Mesh, Scene, Submesh, Transform};
    use lumi_math::Quat;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    fn triangle() -> [Vec3; 3] {
        [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
        ]
    }

    fn quad_scene(transforms: &[Transform]) -> SceneSnapshot {
        let mut scene = Scene::new("quads");
        let mesh = Arc::new(Mesh::quad(1.0));
        let material = Arc::new(Material::new("grey", Vec3::splat(0.5)));
        for (i, transform) in transforms.iter().enumerate() {
            scene
                .add_static_mesh(
                    format!("quad{i}"),
                    transform.clone(),
                    vec![Submesh::new(mesh.clone(), material.clone())],
                )
                .unwrap();
        }
        SceneSnapshot::build(&scene, None)
    }

    #[test]
    fn test_triangle_hit() {
        let [v0, v1, v2] = triangle();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        let t = intersect_triangle(&ray, v0, v1, v2).unwrap();
        assert!((t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_miss_behind_origin() {
        let [v0, v1, v2] = triangle();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        assert_eq!(intersect_triangle(&ray, v0, v1, v2), None);
    }

    #[test]
    fn test_centroid_hit_reconstructs_point() {
        let v0 = Vec3::new(0.3, -0.2, 1.5);
        let v1 = Vec3::new(2.0, 0.4, 0.9);
        let v2 = Vec3::new(0.8, 1.7, 1.1);
        let centroid = (v0 + v1 + v2) / 3.0;
        let normal = (v1 - v0).cross(v2 - v0).normalize();

        let ray = Ray::new(centroid + normal * 2.0, -normal);
        let hit = intersect_triangle_barycentric(&ray, v0, v1, v2).expect("centroid ray must hit");

        let w = hit.barycentrics();
        assert!((w.x + w.y + w.z - 1.0).abs() < 1e-5);

        let reconstructed = v0 * w.x + v1 * w.y + v2 * w.z;
        assert!((reconstructed - ray.at(hit.t)).length() < 1e-4);
        assert!((hit.t - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_parallel_ray_misses() {
        let [v0, v1, v2] = triangle();
        // Direction lies in the z = -1 plane
        let ray = Ray::new(Vec3::new(-5.0, 0.0, -1.0), Vec3::X);

        assert_eq!(intersect_triangle(&ray, v0, v1, v2), None);
    }

    #[test]
    fn test_degenerate_triangle_misses() {
        let ray = Ray::new(Vec3::new(0.5, 1.0, 0.0), Vec3::NEG_Y);
        assert_eq!(intersect_triangle(&ray, Vec3::ZERO, Vec3::X, Vec3::X * 2.0), None);
        assert_eq!(intersect_triangle(&ray, Vec3::ONE, Vec3::ONE, Vec3::ONE), None);
    }

    #[test]
    fn test_barycentric_partition_of_unity() {
        let mut rng = StdRng::seed_from_u64(1234);
        let random_point = |rng: &mut StdRng| {
            Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
        };

        let mut tested = 0;
        while tested < 1000 {
            let (v0, v1, v2) = (random_point(&mut rng), random_point(&mut rng), random_point(&mut rng));
            let cross = (v1 - v0).cross(v2 - v0);
            if cross.length() < 0.05 {
                continue;
            }
            let normal = cross.normalize();

            // Uniform point strictly inside the triangle
            let (r1, r2): (f32, f32) = (rng.gen_range(0.01..0.99), rng.gen_range(0.01..0.99));
            let s = r1.sqrt();
            let inside = v0 * (1.0 - s) + v1 * (s * (1.0 - r2)) + v2 * (s * r2);

            let ray = Ray::new(inside + normal, -normal);
            let Some(hit) = intersect_triangle_barycentric(&ray, v0, v1, v2) else {
                panic!("ray through interior point missed");
            };

            let w = hit.barycentrics();
            assert!((w.x + w.y + w.z - 1.0).abs() < 1e-5);
            for c in w.to_array() {
                assert!((-1e-6..=1.0 + 1e-6).contains(&c), "weight {c} out of range");
            }
            tested += 1;
        }
    }

    #[test]
    fn test_trace_empty_scene() {
        let snapshot = SceneSnapshot::build(&Scene::new("empty"), None);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Y);

        assert!(trace(&ray, &snapshot).is_none());
        assert!(!trace_shadow(&ray, &snapshot));
    }

    #[test]
    fn test_trace_closest_hit_independent_of_order() {
        let near = Transform::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let far = Transform::from_translation(Vec3::new(0.0, -2.0, 0.0));
        let ray = Ray::new(Vec3::new(0.1, 5.0, 0.3), Vec3::new(0.0, -3.0, 0.0));

        for order in [[near.clone(), far.clone()], [far.clone(), near.clone()]] {
            let snapshot = quad_scene(&order);
            let hit = trace(&ray, &snapshot).expect("ray must hit a quad");

            assert!((hit.distance_t - 4.0).abs() < 1e-4, "got {}", hit.distance_t);
            let world_y = snapshot.instances[hit.instance_id].local_to_world.w_axis.y;
            assert_eq!(world_y, 1.0);
        }
    }

    #[test]
    fn test_trace_axis_aligned_rays_in_every_axis() {
        // Quads facing +X, +Y and +Z: the world distance must be measured on
        // the axis the ray travels along
        let facing_x = Transform::from_translation(Vec3::new(3.0, 0.0, 0.0))
            .with_rotation(Quat::from_rotation_z(-std::f32::consts::FRAC_PI_2));
        let facing_z = Transform::from_translation(Vec3::new(0.0, 0.0, 3.0))
            .with_rotation(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2));
        let facing_y = Transform::from_translation(Vec3::new(0.0, 3.0, 0.0));

        // Origins are offset from the quad diagonal shared by its two triangles
        let cases = [
            (facing_x, Vec3::new(0.0, 0.1, 0.2), Vec3::X),
            (facing_y, Vec3::new(0.1, 0.0, 0.2), Vec3::Y),
            (facing_z, Vec3::new(0.1, 0.2, 0.0), Vec3::Z),
        ];
        for (transform, origin, dir) in cases {
            let snapshot = quad_scene(&[transform]);
            let hit = trace(&Ray::new(origin, dir), &snapshot).expect("axis ray must hit");
            assert!((hit.distance_t - 3.0).abs() < 1e-4, "dir {dir:?} got {}", hit.distance_t);
        }
    }

    #[test]
    fn test_trace_scaled_instance_reports_world_distance() {
        let scaled = Transform::from_translation(Vec3::new(0.0, -1.0, 0.0)).with_scale(Vec3::splat(10.0));
        let snapshot = quad_scene(&[scaled]);

        let ray = Ray::new(Vec3::new(3.0, 4.0, -2.0), Vec3::NEG_Y);
        let hit = trace(&ray, &snapshot).unwrap();
        assert!((hit.distance_t - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_trace_shadow_any_hit() {
        let snapshot = quad_scene(&[Transform::default()]);

        assert!(trace_shadow(&Ray::new(Vec3::new(0.1, 2.0, 0.3), Vec3::NEG_Y), &snapshot));
        assert!(!trace_shadow(&Ray::new(Vec3::new(0.1, 2.0, 0.3), Vec3::Y), &snapshot));
        assert!(!trace_shadow(&Ray::new(Vec3::new(3.0, 2.0, 0.0), Vec3::NEG_Y), &snapshot));
    }

    #[test]
    fn test_intersect_aabb() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        assert!(intersect_aabb(&ray, &aabb, f32::INFINITY));
        assert!(!intersect_aabb(&ray, &aabb, 2.0));
    }
}
