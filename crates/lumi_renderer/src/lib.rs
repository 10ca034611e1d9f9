//! Lumi renderer - CPU path tracing with an irradiance cache.
//!
//! Computes diffuse global illumination for a static [`lumi_core::Scene`]:
//! every camera ray is shaded with direct light from the scene's directional
//! lights plus indirect irradiance interpolated from a shared, octree-indexed
//! cache of hemisphere integrals (Ward-style irradiance caching with
//! gradients). Tracing runs on a fixed pool of worker threads, each owning a
//! contiguous range of pixels.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lumi_core::{Camera, DirectionalLight, Material, Mesh, Scene, Submesh, Transform};
//! use lumi_math::Vec3;
//! use lumi_renderer::{ImageBuffer, PathTracer, TraceConfig};
//!
//! let mut scene = Scene::new("floor");
//! let floor = Submesh::new(Arc::new(Mesh::quad(4.0)), Arc::new(Material::new("white", Vec3::splat(0.8))));
//! scene.add_static_mesh("floor", Transform::default(), vec![floor])?;
//! scene.add_directional_light("sun", DirectionalLight::new(Vec3::new(0.3, 1.0, 0.2), Vec3::ONE, 3.0));
//! scene.set_camera(Camera::look_at(Vec3::new(0.0, 3.0, 6.0), Vec3::ZERO, Vec3::Y, 1.0));
//!
//! let tracer = PathTracer::new(TraceConfig::default())?;
//! let mut image = ImageBuffer::new(64, 64);
//! let report = tracer.run(&scene, None, &mut image)?;
//! println!("{} rays, {} cache records", report.rays_traced, report.cache_records);
//! image.save_png("floor.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod intersect;
pub mod sampler;

mod camera;
mod config;
mod error;
mod framebuffer;
mod pool;
mod progress;
mod snapshot;
mod tonemap;
mod tracer;

pub use cache::{CacheSettings, CacheStats, IrradianceCache, IrradianceRecord};
pub use camera::PinholeCamera;
pub use config::{TraceConfig, MAX_WORKERS};
pub use error::{TraceError, TraceResult};
pub use framebuffer::ImageBuffer;
pub use intersect::{intersect_triangle, trace, trace_shadow, HitRecord};
pub use pool::{partition, WorkerPool};
pub use progress::TraceProgress;
pub use snapshot::{Instance, Primitive, SceneSnapshot, SurfaceHit, TriMaterial};
pub use tonemap::{aces_filmic, gamma_correct, PostProcess, ToneMap};
pub use tracer::{PathTracer, TraceReport, TraceSession};

/// Re-export math types from lumi_math
pub use lumi_math::{Aabb, Ray, Vec3};
