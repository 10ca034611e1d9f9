//! Trace session configuration.

use std::path::Path;
use std::time::Duration;

use lumi_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheSettings, HemisphereGrid, DEFAULT_MAX_RADIUS, DEFAULT_MAX_RECORDS, DEFAULT_MIN_RADIUS};
use crate::error::{TraceError, TraceResult};

/// Upper bound on explicitly requested worker threads.
pub const MAX_WORKERS: usize = 64;

/// Knobs of one trace session.
///
/// Every field has a default, so JSON documents only need to name what they
/// change:
///
/// ```
/// use lumi_renderer::TraceConfig;
///
/// let config = TraceConfig::from_json(r#"{ "max_bounces": 2, "worker_count": 4 }"#).unwrap();
/// assert_eq!(config.max_bounces, 2);
/// assert_eq!(config.hemisphere_samples_theta, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Worker threads; 0 uses the available parallelism
    pub worker_count: usize,

    /// θ strata of a cache record hemisphere
    pub hemisphere_samples_theta: usize,
    /// φ strata of a cache record hemisphere
    pub hemisphere_samples_phi: usize,
    /// θ strata used while seeding the cache
    pub seed_hemisphere_samples_theta: usize,
    /// φ strata used while seeding the cache
    pub seed_hemisphere_samples_phi: usize,

    /// Indirect bounces; 0 renders direct light only
    pub max_bounces: u32,
    /// Cache error threshold; smaller means more records
    pub error_threshold: f32,

    /// Sub-pixel grid for anti-aliasing
    pub pixel_samples_x: u32,
    pub pixel_samples_y: u32,
    /// Jitter sub-pixel samples within their stratum
    pub jitter: bool,

    /// Seeding pass traces every n-th pixel in x and y; 0 skips the pass
    pub cache_seed_stride: u32,
    pub max_cache_records: usize,
    pub use_octree: bool,
    pub min_record_radius: f32,
    pub max_record_radius: f32,

    /// Radiance of rays that escape the scene
    pub sky_color: Vec3,
    pub random_seed: u64,
    /// Linear scale applied before tone mapping
    pub exposure: f32,
    pub progress_interval_ms: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            worker_count: 0,
            hemisphere_samples_theta: 32,
            hemisphere_samples_phi: 32,
            seed_hemisphere_samples_theta: 16,
            seed_hemisphere_samples_phi: 16,
            max_bounces: 1,
            error_threshold: 0.3,
            pixel_samples_x: 1,
            pixel_samples_y: 1,
            jitter: true,
            cache_seed_stride: 4,
            max_cache_records: DEFAULT_MAX_RECORDS,
            use_octree: true,
            min_record_radius: DEFAULT_MIN_RADIUS,
            max_record_radius: DEFAULT_MAX_RADIUS,
            sky_color: Vec3::new(0.4, 0.5, 0.6),
            random_seed: 0,
            exposure: 1.0,
            progress_interval_ms: 250,
        }
    }
}

impl TraceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> TraceResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> TraceResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> TraceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every knob once, before any work starts.
    pub fn validate(&self) -> TraceResult<()> {
        fn invalid(message: String) -> TraceResult<()> {
            Err(TraceError::InvalidConfig(message))
        }

        if self.worker_count > MAX_WORKERS {
            return invalid(format!(
                "worker_count must be 0 (auto) or 1..={}, got {}",
                MAX_WORKERS, self.worker_count
            ));
        }
        if self.hemisphere_samples_theta == 0 || self.hemisphere_samples_phi == 0 {
            return invalid("hemisphere sample grid must be at least 1x1".to_string());
        }
        if self.seed_hemisphere_samples_theta == 0 || self.seed_hemisphere_samples_phi == 0 {
            return invalid("seed hemisphere sample grid must be at least 1x1".to_string());
        }
        if !(self.error_threshold.is_finite() && self.error_threshold > 0.0) {
            return invalid(format!(
                "error_threshold must be positive, got {}",
                self.error_threshold
            ));
        }
        if self.pixel_samples_x == 0 || self.pixel_samples_y == 0 {
            return invalid("pixel sample grid must be at least 1x1".to_string());
        }
        if !(self.min_record_radius > 0.0 && self.max_record_radius >= self.min_record_radius) {
            return invalid(format!(
                "record radius range [{}, {}] is empty or not positive",
                self.min_record_radius, self.max_record_radius
            ));
        }
        if !self.sky_color.is_finite() || self.sky_color.min_element() < 0.0 {
            return invalid(format!("sky_color must be finite and non-negative, got {}", self.sky_color));
        }
        if !(self.exposure.is_finite() && self.exposure > 0.0) {
            return invalid(format!("exposure must be positive, got {}", self.exposure));
        }
        Ok(())
    }

    /// Worker threads to spawn, resolving 0 to the machine's parallelism.
    pub fn resolved_worker_count(&self) -> usize {
        if self.worker_count > 0 {
            return self.worker_count;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_WORKERS)
    }

    pub fn record_grid(&self) -> HemisphereGrid {
        HemisphereGrid::new(self.hemisphere_samples_theta, self.hemisphere_samples_phi)
    }

    pub fn seed_grid(&self) -> HemisphereGrid {
        HemisphereGrid::new(self.seed_hemisphere_samples_theta, self.seed_hemisphere_samples_phi)
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            max_records: self.max_cache_records,
            use_octree: self.use_octree,
            min_radius: self.min_record_radius,
            max_radius: self.max_record_radius,
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.pixel_samples_x * self.pixel_samples_y
    }

    /// Set the number of worker threads (0 = auto).
    pub fn with_workers(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the record hemisphere grid.
    pub fn with_hemisphere_samples(mut self, theta: usize, phi: usize) -> Self {
        self.hemisphere_samples_theta = theta;
        self.hemisphere_samples_phi = phi;
        self
    }

    /// Set the hemisphere grid used while seeding the cache.
    pub fn with_seed_hemisphere_samples(mut self, theta: usize, phi: usize) -> Self {
        self.seed_hemisphere_samples_theta = theta;
        self.seed_hemisphere_samples_phi = phi;
        self
    }

    pub fn with_max_bounces(mut self, bounces: u32) -> Self {
        self.max_bounces = bounces;
        self
    }

    pub fn with_error_threshold(mut self, threshold: f32) -> Self {
        self.error_threshold = threshold;
        self
    }

    /// Set the sub-pixel sample grid.
    pub fn with_pixel_samples(mut self, x: u32, y: u32) -> Self {
        self.pixel_samples_x = x;
        self.pixel_samples_y = y;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Seed every `stride`-th pixel before shading; 0 disables seeding.
    pub fn with_cache_seed_stride(mut self, stride: u32) -> Self {
        self.cache_seed_stride = stride;
        self
    }

    pub fn with_max_cache_records(mut self, records: usize) -> Self {
        self.max_cache_records = records;
        self
    }

    pub fn with_octree(mut self, use_octree: bool) -> Self {
        self.use_octree = use_octree;
        self
    }

    pub fn with_sky_color(mut self, color: Vec3) -> Self {
        self.sky_color = color;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval_ms = interval.as_millis() as u64;
        self
    }
}
