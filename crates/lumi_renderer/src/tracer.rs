//! Two-pass path tracer.
//!
//! A [`PathTracer`] owns the worker pool and progress handle and may run any
//! number of traces. Every run builds a fresh [`TraceSession`] holding the
//! scene snapshot, the irradiance cache and the camera; workers share it
//! through an `Arc`.
//!
//! Pass 1 seeds the cache from a decimated, Halton-jittered pixel grid with
//! a reduced hemisphere resolution. Pass 2 shades every pixel: direct light
//! from the directional lights plus `albedo / π · E`, with `E` taken from the
//! cache.

use std::f32::consts::PI;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lumi_core::{Camera, Scene};
use lumi_math::{Ray, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::cache::{CacheStats, HemisphereGrid, IncidentRadiance, IncidentSample, IrradianceCache};
use crate::camera::PinholeCamera;
use crate::config::TraceConfig;
use crate::error::{TraceError, TraceResult};
use crate::framebuffer::ImageBuffer;
use crate::intersect::{trace, trace_shadow, SURFACE_OFFSET};
use crate::pool::WorkerPool;
use crate::progress::TraceProgress;
use crate::sampler::{gen_f32, halton23};
use crate::snapshot::{SceneSnapshot, SurfaceHit};
use crate::tonemap::PostProcess;

/// Summary of one finished (or cancelled) trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceReport {
    /// Camera, hemisphere and shadow rays
    pub rays_traced: u64,
    pub cache: CacheStats,
    pub cache_records: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Everything one trace works on. Read-only apart from the cache and the
/// ray counter.
pub struct TraceSession {
    snapshot: SceneSnapshot,
    config: TraceConfig,
    cache: IrradianceCache,
    camera: Option<PinholeCamera>,
    post: PostProcess,
    width: u32,
    height: u32,
    rays: AtomicU64,
}

/// Hemisphere rays of a cache record, shaded at a fixed grid resolution.
struct Bounce<'a> {
    session: &'a TraceSession,
    grid: HemisphereGrid,
}

impl IncidentRadiance for Bounce<'_> {
    fn incident(&self, ray: &Ray, depth: u32, rng: &mut dyn RngCore) -> IncidentSample {
        let session = self.session;
        session.count_rays(1);

        let Some(hit) = trace(ray, &session.snapshot) else {
            return IncidentSample::sky(session.sky());
        };

        let surface = session.snapshot.surface(ray, &hit);
        let mut radiance = session.direct_lighting(&surface);
        if depth < session.config.max_bounces {
            let irradiance = session.cache.find_or_compute(
                surface.position,
                surface.normal,
                session.config.error_threshold,
                self.grid,
                self,
                depth + 1,
                rng,
            );
            radiance += surface.albedo / PI * irradiance;
        }

        IncidentSample {
            radiance,
            distance: Some(hit.distance_t),
        }
    }
}

impl TraceSession {
    /// Set up a session for a `width` x `height` image; the cache is
    /// initialized from the snapshot's world bounds.
    pub fn new(snapshot: SceneSnapshot, config: TraceConfig, width: u32, height: u32) -> Self {
        let cache = IrradianceCache::new(config.cache_settings());
        cache.initialize(&snapshot.world_bounds());

        let camera = snapshot
            .camera
            .as_ref()
            .map(|camera| PinholeCamera::new(camera, width, height));
        let post = PostProcess::with_exposure(config.exposure);

        Self {
            snapshot,
            config,
            cache,
            camera,
            post,
            width,
            height,
            rays: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> &SceneSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn cache(&self) -> &IrradianceCache {
        &self.cache
    }

    pub fn camera(&self) -> Option<&PinholeCamera> {
        self.camera.as_ref()
    }

    pub fn post_process(&self) -> &PostProcess {
        &self.post
    }

    pub fn rays_traced(&self) -> u64 {
        self.rays.load(Ordering::Relaxed)
    }

    #[inline]
    fn count_rays(&self, n: u64) {
        self.rays.fetch_add(n, Ordering::Relaxed);
    }

    /// Radiance of an escaping ray, the same in every direction.
    ///
    /// Hemisphere samples are cosine distributed, so a miss contributes the
    /// bare sky color to the irradiance estimate.
    pub fn sky(&self) -> Vec3 {
        self.config.sky_color
    }

    /// Lambertian reflection of every directional light, with binary shadows.
    pub fn direct_lighting(&self, surface: &SurfaceHit) -> Vec3 {
        let origin = surface.position + surface.normal * SURFACE_OFFSET;
        let mut radiance = Vec3::ZERO;

        for light in &self.snapshot.lights {
            let to_light = light.to_light();
            let cos_theta = surface.normal.dot(to_light);
            if cos_theta <= 0.0 {
                continue;
            }

            self.count_rays(1);
            if trace_shadow(&Ray::new(origin, to_light), &self.snapshot) {
                continue;
            }
            radiance += surface.albedo / PI * light.radiance() * cos_theta;
        }

        radiance
    }

    /// Irradiance arriving at a surface, from the cache.
    pub fn indirect_irradiance(&self, surface: &SurfaceHit, grid: HemisphereGrid, rng: &mut dyn RngCore) -> Vec3 {
        let bounce = Bounce { session: self, grid };
        self.cache.find_or_compute(
            surface.position,
            surface.normal,
            self.config.error_threshold,
            grid,
            &bounce,
            1,
            rng,
        )
    }

    /// Primary surface along a camera ray, between the near and far planes.
    pub fn primary_hit(&self, ray: &Ray) -> Option<SurfaceHit> {
        self.count_rays(1);
        let hit = trace(ray, &self.snapshot)?;
        if self.camera.is_some_and(|camera| camera.clipped(ray, hit.distance_t)) {
            return None;
        }
        Some(self.snapshot.surface(ray, &hit))
    }

    /// Outgoing radiance along a camera ray (before post-processing).
    pub fn radiance(&self, ray: &Ray, rng: &mut dyn RngCore) -> Vec3 {
        let Some(surface) = self.primary_hit(ray) else {
            return self.sky();
        };

        let mut radiance = self.direct_lighting(&surface);
        if self.config.max_bounces > 0 {
            let irradiance = self.indirect_irradiance(&surface, self.config.record_grid(), rng);
            radiance += surface.albedo / PI * irradiance;
        }
        radiance
    }

    /// Average radiance over the sub-pixel grid of pixel `(x, y)`.
    pub fn shade_pixel(&self, x: u32, y: u32, rng: &mut dyn RngCore) -> Vec3 {
        let Some(camera) = self.camera else {
            return self.config.sky_color;
        };

        let nx = self.config.pixel_samples_x.max(1);
        let ny = self.config.pixel_samples_y.max(1);
        let mut sum = Vec3::ZERO;

        for sy in 0..ny {
            for sx in 0..nx {
                let jitter = if self.config.jitter {
                    Vec2::new(gen_f32(rng), gen_f32(rng))
                } else {
                    Vec2::splat(0.5)
                };
                let offset = (Vec2::new(sx as f32, sy as f32) + jitter) / Vec2::new(nx as f32, ny as f32);
                sum += self.radiance(&camera.ray(x, y, offset), rng);
            }
        }

        sum / (nx * ny) as f32
    }

    fn seed_grid_size(&self) -> (u32, u32) {
        let stride = self.config.cache_seed_stride;
        if stride == 0 || self.config.max_bounces == 0 || self.camera.is_none() || self.snapshot.is_empty() {
            return (0, 0);
        }
        (self.width.div_ceil(stride), self.height.div_ceil(stride))
    }

    /// Number of cache-seeding samples Pass 1 will take.
    pub fn seed_count(&self) -> usize {
        let (columns, rows) = self.seed_grid_size();
        columns as usize * rows as usize
    }

    /// Populate the cache around seed sample `index`.
    fn seed(&self, index: usize, rng: &mut dyn RngCore) {
        let Some(camera) = self.camera else {
            return;
        };
        let (columns, _) = self.seed_grid_size();
        let stride = self.config.cache_seed_stride as f32;
        let cell = Vec2::new((index % columns as usize) as f32, (index / columns as usize) as f32);

        let position = (cell + halton23(index as u32)) * stride;
        let x = (position.x as u32).min(self.width.saturating_sub(1));
        let y = (position.y as u32).min(self.height.saturating_sub(1));
        let offset = position.fract();

        if let Some(surface) = self.primary_hit(&camera.ray(x, y, offset)) {
            self.indirect_irradiance(&surface, self.config.seed_grid(), rng);
        }
    }

    fn worker_rng(&self, pass: u64, range: &Range<usize>) -> StdRng {
        StdRng::seed_from_u64(self.config.random_seed ^ (pass << 56) ^ range.start as u64)
    }

    /// Pass 1 over one range of seed samples. Returns how many were taken.
    fn seed_range(&self, range: Range<usize>, progress: &TraceProgress) -> usize {
        let mut rng = self.worker_rng(1, &range);
        let mut done = 0;
        for index in range {
            if progress.is_cancelled() {
                break;
            }
            self.seed(index, &mut rng);
            progress.advance(1);
            done += 1;
        }
        done
    }

    /// Pass 2 over one range of pixels. Returns display colors for the
    /// pixels finished before cancellation, starting at `range.start`.
    fn shade_range(&self, range: Range<usize>, progress: &TraceProgress) -> Vec<Vec3> {
        let mut rng = self.worker_rng(2, &range);
        let width = self.width.max(1) as usize;
        let mut colors = Vec::with_capacity(range.len());

        for index in range {
            if progress.is_cancelled() {
                break;
            }
            let (x, y) = ((index % width) as u32, (index / width) as u32);
            let radiance = self.shade_pixel(x, y, &mut rng);
            colors.push(self.post.apply(radiance));
            progress.advance(1);
        }
        colors
    }
}

/// Entry point: configuration, worker pool and progress handle.
pub struct PathTracer {
    config: TraceConfig,
    pool: WorkerPool,
    progress: TraceProgress,
}

impl PathTracer {
    /// Validates `config` and spins up the worker pool.
    pub fn new(config: TraceConfig) -> TraceResult<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.resolved_worker_count())?;
        log::info!("Path tracer ready with {} workers", pool.workers());

        Ok(Self {
            config,
            pool,
            progress: TraceProgress::new(),
        })
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// Handle for observing progress or cancelling from another thread.
    pub fn progress(&self) -> TraceProgress {
        self.progress.clone()
    }

    /// Cancel the running trace; workers stop before their next pixel.
    pub fn cancel(&self) {
        self.progress.cancel();
    }

    /// Session for `snapshot` at the given resolution, without tracing.
    pub fn session(&self, snapshot: SceneSnapshot, width: u32, height: u32) -> TraceSession {
        TraceSession::new(snapshot, self.config.clone(), width, height)
    }

    /// Snapshot `scene` and trace it into `image`.
    ///
    /// `camera` overrides the scene's camera. Without any camera the image is
    /// filled with the post-processed sky color.
    pub fn run(&self, scene: &Scene, camera: Option<&Camera>, image: &mut ImageBuffer) -> TraceResult<TraceReport> {
        let snapshot = SceneSnapshot::build(scene, camera);
        self.render(snapshot, image)
    }

    /// Trace an existing snapshot into `image`.
    ///
    /// On cancellation the pixels finished so far are written, the rest keep
    /// their previous contents, and the report says `cancelled`. A
    /// cancellation requested before the call is honoured; either way the
    /// flag is cleared when the call returns.
    pub fn render(&self, snapshot: SceneSnapshot, image: &mut ImageBuffer) -> TraceResult<TraceReport> {
        self.config.validate()?;
        let expected = image.width as usize * image.height as usize;
        if image.pixels.len() != expected {
            return Err(TraceError::ImageSizeMismatch {
                width: image.width,
                height: image.height,
                expected,
                actual: image.pixels.len(),
            });
        }

        let start = Instant::now();
        let session = Arc::new(self.session(snapshot, image.width, image.height));

        if session.camera().is_none() {
            log::warn!("No camera in scene; filling the image with the sky color");
            image.fill(session.post_process().apply(self.config.sky_color));
            self.progress.begin(0);
            return Ok(self.finish(&session, start));
        }

        let seeds = session.seed_count();
        let pixels = image.pixel_count();
        self.progress.begin((seeds + pixels) as u64);
        log::info!(
            "Tracing {}x{} ({} seed samples, {} samples per pixel)",
            image.width,
            image.height,
            seeds,
            self.config.samples_per_pixel()
        );

        if seeds > 0 {
            let pass_start = Instant::now();
            let worker_session = Arc::clone(&session);
            self.pool
                .run(seeds, &self.progress, self.config.progress_interval(), move |range, progress| {
                    worker_session.seed_range(range, progress)
                })
                .map_err(|err| self.abort(err))?;
            log::info!(
                "Cache seeding: {} records in {:.2?}",
                session.cache().len(),
                pass_start.elapsed()
            );
        }

        if !self.progress.is_cancelled() {
            let pass_start = Instant::now();
            let worker_session = Arc::clone(&session);
            let chunks = self
                .pool
                .run(pixels, &self.progress, self.config.progress_interval(), move |range, progress| {
                    let start = range.start;
                    (start, worker_session.shade_range(range, progress))
                })
                .map_err(|err| self.abort(err))?;

            for (start, colors) in chunks {
                image.pixels[start..start + colors.len()].copy_from_slice(&colors);
            }
            log::info!("Shading finished in {:.2?}", pass_start.elapsed());
        }

        let report = self.finish(&session, start);
        if report.cancelled {
            log::info!("Trace cancelled after {:.2?}", report.elapsed);
        } else {
            log::info!(
                "Trace done in {:.2?}: {} rays, {} cache records, hit rate {:.1}%",
                report.elapsed,
                report.rays_traced,
                report.cache_records,
                report.cache.hit_rate() * 100.0
            );
        }
        Ok(report)
    }

    /// A failed pass cancelled the other workers; clear that before reporting.
    fn abort(&self, err: TraceError) -> TraceError {
        self.progress.resume();
        err
    }

    /// Build the report and clear any cancellation for the next run.
    fn finish(&self, session: &TraceSession, start: Instant) -> TraceReport {
        let report = TraceReport {
            rays_traced: session.rays_traced(),
            cache: session.cache().stats(),
            cache_records: session.cache().len(),
            cancelled: self.progress.is_cancelled(),
            elapsed: start.elapsed(),
        };
        self.progress.resume();
        report
    }
}
