//! Renders a Cornell-style box with a sun shining through the open front
//! and writes `cornell_box.png`.
//!
//! ```text
//! cargo run --release -p lumi_renderer --example cornell_box [config.json] [output.png]
//! ```

use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use anyhow::{Context, Result};
use lumi_core::{Camera, DirectionalLight, Material, Mesh, Scene, Submesh, Transform};
use lumi_math::{Quat, Vec3};
use lumi_renderer::{ImageBuffer, PathTracer, TraceConfig};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 256;

fn cornell_box() -> Result<Scene> {
    let mut scene = Scene::new("cornell box");
    let wall = Arc::new(Mesh::quad(4.0));
    let block = Arc::new(Mesh::quad(1.2));

    let white = Arc::new(Material::new("white", Vec3::splat(0.73)));
    let red = Arc::new(Material::new("red", Vec3::new(0.65, 0.05, 0.05)));
    let green = Arc::new(Material::new("green", Vec3::new(0.12, 0.45, 0.15)));

    let walls = [
        ("floor", Transform::default(), white.clone()),
        (
            "ceiling",
            Transform::from_translation(Vec3::new(0.0, 4.0, 0.0)).with_rotation(Quat::from_rotation_x(PI)),
            white.clone(),
        ),
        (
            "back",
            Transform::from_translation(Vec3::new(0.0, 2.0, -2.0)).with_rotation(Quat::from_rotation_x(FRAC_PI_2)),
            white.clone(),
        ),
        (
            "left",
            Transform::from_translation(Vec3::new(-2.0, 2.0, 0.0)).with_rotation(Quat::from_rotation_z(-FRAC_PI_2)),
            red,
        ),
        (
            "right",
            Transform::from_translation(Vec3::new(2.0, 2.0, 0.0)).with_rotation(Quat::from_rotation_z(FRAC_PI_2)),
            green,
        ),
    ];
    for (name, transform, material) in walls {
        scene.add_static_mesh(name, transform, vec![Submesh::new(wall.clone(), material)])?;
    }

    // A floating panel that casts a shadow on the floor
    scene.add_static_mesh(
        "panel",
        Transform::from_translation(Vec3::new(0.3, 1.4, 0.2)).with_rotation(Quat::from_rotation_y(0.4)),
        vec![Submesh::new(block, white)],
    )?;

    scene.add_directional_light(
        "sun",
        DirectionalLight::new(Vec3::new(0.3, 0.6, 1.0), Vec3::new(1.0, 0.95, 0.85), 3.0),
    );
    scene.set_camera(
        Camera::look_at(Vec3::new(0.0, 2.0, 7.5), Vec3::new(0.0, 2.0, 0.0), Vec3::Y, 1.0).with_fov(40.0),
    );
    Ok(scene)
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => TraceConfig::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => TraceConfig::default().with_pixel_samples(2, 2),
    };
    let output = args.next().unwrap_or_else(|| "cornell_box.png".to_string());

    let scene = cornell_box()?;
    let tracer = PathTracer::new(config)?;
    let mut image = ImageBuffer::new(WIDTH, HEIGHT);

    let report = tracer.run(&scene, None, &mut image)?;
    log::info!(
        "{} rays, {} cache records ({} lookups, {:.1}% hits) in {:.2?}",
        report.rays_traced,
        report.cache_records,
        report.cache.lookups,
        report.cache.hit_rate() * 100.0,
        report.elapsed
    );

    image
        .save_png(&output)
        .with_context(|| format!("writing {}", output))?;
    println!("Wrote {}", output);
    Ok(())
}
