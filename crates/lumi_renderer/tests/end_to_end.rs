//! Whole-pipeline traces of small scenes.

use std::f32::consts::PI;
use std::sync::Arc;

use lumi_core::{Camera, DirectionalLight, Material, Mesh, Scene, Submesh, Transform};
use lumi_math::{Ray, Vec3};
use lumi_renderer::{trace_shadow, ImageBuffer, PathTracer, PostProcess, SceneSnapshot, TraceConfig};

const ALBEDO: f32 = 0.7;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn submesh(size: f32, albedo: f32) -> Vec<Submesh> {
    vec![Submesh::new(
        Arc::new(Mesh::quad(size)),
        Arc::new(Material::new("diffuse", Vec3::splat(albedo))),
    )]
}

/// Unit quad at the origin facing up, camera looking down.
fn unlit_quad_scene() -> Scene {
    let mut scene = Scene::new("unit quad");
    scene
        .add_static_mesh("quad", Transform::default(), submesh(1.0, ALBEDO))
        .unwrap();
    scene.set_camera(Camera::look_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y, 1.0));
    scene
}

/// The unit quad with the sun straight above.
fn quad_scene() -> Scene {
    let mut scene = unlit_quad_scene();
    scene.add_directional_light("sun", DirectionalLight::new(Vec3::Y, Vec3::ONE, 1.0));
    scene
}

fn sky_pixel(config: &TraceConfig) -> Vec3 {
    PostProcess::with_exposure(config.exposure).apply(config.sky_color)
}

fn test_config() -> TraceConfig {
    TraceConfig::default()
        .with_workers(3)
        .with_hemisphere_samples(6, 12)
        .with_seed_hemisphere_samples(3, 6)
        .with_cache_seed_stride(2)
        .with_seed(11)
}

#[test]
fn test_unit_quad_direct_term_and_output_range() {
    init_logging();
    let tracer = PathTracer::new(test_config()).unwrap();
    let session = tracer.session(SceneSnapshot::build(&quad_scene(), None), 10, 10);

    // Pixel (5, 5) looks just off the quad center, clear of its diagonal
    let ray = session.camera().unwrap().center_ray(5, 5);
    let surface = session.primary_hit(&ray).expect("center pixel must hit the quad");
    let direct = session.direct_lighting(&surface);
    assert!(
        (direct - Vec3::splat(ALBEDO / PI)).length() < 1e-5,
        "direct term {direct}"
    );

    let mut image = ImageBuffer::new(10, 10);
    let report = tracer.run(&quad_scene(), None, &mut image).unwrap();

    assert!(!report.cancelled);
    assert!(report.rays_traced > 0);
    assert!(report.cache_records > 0);
    assert_eq!(report.cache_records as u64, report.cache.inserted);
    for pixel in &image.pixels {
        assert!(pixel.min_element() >= 0.0 && pixel.max_element() <= 1.0, "{pixel}");
    }

    // The lit quad is brighter than the sky around it
    assert!(image.get(5, 5).x > image.get(0, 0).x);
    assert!(tracer.progress().is_complete());
}

#[test]
fn test_camera_override_and_far_plane() {
    init_logging();
    let tracer = PathTracer::new(test_config().with_max_bounces(0)).unwrap();
    let camera = Camera::look_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y, 1.0).with_clip(0.1, 2.0);

    let mut image = ImageBuffer::new(10, 10);
    tracer.run(&quad_scene(), Some(&camera), &mut image).unwrap();

    // The quad lies beyond the far plane: every pixel sees the sky
    let sky = sky_pixel(tracer.config());
    assert!(image.pixels.iter().all(|p| *p == sky));
}

#[test]
fn test_shadowed_point_has_zero_direct_term() {
    init_logging();
    let mut scene = Scene::new("occluded");
    scene
        .add_static_mesh("floor", Transform::default(), submesh(4.0, ALBEDO))
        .unwrap();
    scene
        .add_static_mesh(
            "occluder",
            Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            submesh(1.0, 0.5),
        )
        .unwrap();
    scene.add_directional_light("sun", DirectionalLight::new(Vec3::Y, Vec3::ONE, 1.0));
    scene.set_camera(Camera::look_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y, 1.0));

    let tracer = PathTracer::new(test_config()).unwrap();
    let session = tracer.session(SceneSnapshot::build(&scene, None), 8, 8);

    // A point on the floor below the occluder
    let downward = Ray::new(Vec3::new(0.1, 0.5, 0.3), Vec3::NEG_Y);
    let surface = session.primary_hit(&downward).expect("ray must hit the floor");
    assert!(surface.position.y.abs() < 1e-4);

    let to_light = Ray::new(surface.position + surface.normal * 1e-3, Vec3::Y);
    assert!(trace_shadow(&to_light, session.snapshot()));
    assert_eq!(session.direct_lighting(&surface), Vec3::ZERO);

    // Sky still reaches it from the sides
    let mut rng = rand::thread_rng();
    let indirect = session.indirect_irradiance(&surface, session.config().record_grid(), &mut rng);
    assert!(indirect.max_element() > 0.0);

    // A floor point away from the occluder is lit
    let open = session
        .primary_hit(&Ray::new(Vec3::new(1.5, 0.5, 1.3), Vec3::NEG_Y))
        .unwrap();
    assert!((session.direct_lighting(&open) - Vec3::splat(ALBEDO / PI)).length() < 1e-5);
}

#[test]
fn test_empty_scene_renders_sky_only() {
    init_logging();
    let mut scene = Scene::new("nothing");
    scene.set_camera(Camera::look_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y, 1.0));

    let tracer = PathTracer::new(test_config()).unwrap();
    let mut image = ImageBuffer::new(6, 6);
    let report = tracer.run(&scene, None, &mut image).unwrap();

    assert_eq!(report.cache_records, 0);
    // Looking straight down still sees nothing but sky
    let sky = sky_pixel(tracer.config());
    assert!(sky.max_element() > 0.0);
    assert!(image.pixels.iter().all(|p| *p == sky));
}

#[test]
fn test_scene_without_lights_renders_indirect_only() {
    init_logging();
    let tracer = PathTracer::new(test_config()).unwrap();
    let session = tracer.session(SceneSnapshot::build(&unlit_quad_scene(), None), 10, 10);

    let ray = session.camera().unwrap().center_ray(5, 5);
    let surface = session.primary_hit(&ray).expect("center pixel must hit the quad");
    assert_eq!(session.direct_lighting(&surface), Vec3::ZERO);

    let mut rng = rand::thread_rng();
    let indirect = session.indirect_irradiance(&surface, session.config().record_grid(), &mut rng);
    assert!(indirect.max_element() > 0.0);

    let mut image = ImageBuffer::new(10, 10);
    let report = tracer.run(&unlit_quad_scene(), None, &mut image).unwrap();

    assert!(!report.cancelled);
    assert!(report.cache_records > 0);
    for pixel in &image.pixels {
        assert!(pixel.min_element() >= 0.0 && pixel.max_element() <= 1.0, "{pixel}");
    }
    // The quad reflects sky light only, so it is dimmer than the sky itself
    assert!(image.get(5, 5).max_element() > 0.0);
    assert!(image.get(5, 5).x < image.get(0, 0).x);
}

#[test]
fn test_octree_and_linear_scan_render_alike() {
    init_logging();
    let with_tree = PathTracer::new(test_config().with_workers(1).with_jitter(false)).unwrap();
    let linear = PathTracer::new(test_config().with_workers(1).with_jitter(false).with_octree(false)).unwrap();

    let mut a = ImageBuffer::new(8, 8);
    let mut b = ImageBuffer::new(8, 8);
    let report_a = with_tree.run(&quad_scene(), None, &mut a).unwrap();
    let report_b = linear.run(&quad_scene(), None, &mut b).unwrap();

    // Same seed, one worker: identical sample streams and identical lookups
    assert_eq!(report_a.cache_records, report_b.cache_records);
    for (pa, pb) in a.pixels.iter().zip(&b.pixels) {
        assert!((*pa - *pb).length() < 1e-3, "{pa} vs {pb}");
    }
}
