//! Irradiance cache shared by all workers of a trace session.
//!
//! Records are appended to a growable store and optionally filed in a loose
//! [`Octree`]. Lookups blend every record whose validity weight is positive;
//! misses integrate a new hemisphere and insert the result.
//!
//! The store and the octree live behind one `RwLock`. A miss computes its
//! hemisphere without holding any lock, then takes the write lock, looks up
//! again (another worker may have covered the point meanwhile) and only then
//! inserts. Readers therefore never observe a partially filed record and the
//! record count always equals the number of accepted insertions.

mod hemisphere;
mod octree;
mod record;

pub use hemisphere::{
    sample_hemisphere, HemisphereEstimate, HemisphereGrid, IncidentRadiance, IncidentSample,
};
pub use octree::{Octree, OctreeNode, MIN_SIDE_LENGTH};
pub use record::{IrradianceRecord, MAX_ANGLE_TERM};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use lumi_math::{Aabb, Vec3};
use parking_lot::RwLock;
use rand::RngCore;

use crate::error::{TraceError, TraceResult};

/// Smallest validity radius a new record may get, in world units.
pub const DEFAULT_MIN_RADIUS: f32 = 0.1;
/// Largest validity radius a new record may get, in world units.
pub const DEFAULT_MAX_RADIUS: f32 = 2.0;
pub const DEFAULT_MAX_RECORDS: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSettings {
    /// Capacity of the record store
    pub max_records: usize,
    /// File records in an octree; otherwise every lookup scans all records
    pub use_octree: bool,
    pub min_radius: f32,
    pub max_radius: f32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            use_octree: true,
            min_radius: DEFAULT_MIN_RADIUS,
            max_radius: DEFAULT_MAX_RADIUS,
        }
    }
}

/// Counters describing cache traffic since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls to `find_or_compute`
    pub lookups: u64,
    /// Lookups answered by interpolation
    pub hits: u64,
    /// Records added to the store
    pub inserted: u64,
    /// Records computed but dropped because the store was full
    pub capacity_rejections: u64,
}

impl CacheStats {
    pub fn misses(&self) -> u64 {
        self.lookups - self.hits
    }

    pub fn hit_rate(&self) -> f32 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f32 / self.lookups as f32
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    lookups: AtomicU64,
    hits: AtomicU64,
    inserted: AtomicU64,
    capacity_rejections: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(Ordering::Relaxed),
        }
    }

    fn clear(&self) {
        self.lookups.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.inserted.store(0, Ordering::Relaxed);
        self.capacity_rejections.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct CacheState {
    bounds: Option<Aabb>,
    records: Vec<IrradianceRecord>,
    octree: Option<Octree>,
}

impl CacheState {
    /// Weighted, gradient-corrected blend of every usable record.
    fn interpolate(&self, point: Vec3, normal: Vec3, error_threshold: f32) -> Option<Vec3> {
        let accuracy = 1.0 / error_threshold.max(f32::EPSILON);
        let mut accumulated = Vec3::ZERO;
        let mut weight_sum = 0.0f32;

        let mut visit = |index: u32| {
            let record = &self.records[index as usize];
            let weight = record.weight(point, normal, accuracy);
            if weight <= 0.0 || record.excludes(point, normal) {
                return;
            }
            accumulated += record.extrapolate(point, normal) * weight;
            weight_sum += weight;
        };

        match &self.octree {
            Some(tree) => tree.for_each_candidate(point, error_threshold, &mut visit),
            None => (0..self.records.len() as u32).for_each(&mut visit),
        }

        (weight_sum > 0.0).then(|| accumulated / weight_sum)
    }

    fn push(&mut self, record: IrradianceRecord, capacity: usize) -> TraceResult<usize> {
        if self.bounds.is_none() {
            return Err(TraceError::CacheUninitialized);
        }
        if self.records.len() >= capacity {
            return Err(TraceError::CacheCapacityExceeded { capacity });
        }

        let index = self.records.len();
        self.records.push(record);
        if let Some(tree) = &mut self.octree {
            tree.insert(index as u32, record.position, record.r);
        }
        Ok(index)
    }
}

/// Thread-safe irradiance cache.
///
/// Lifecycle: `new` (uninitialized) -> [`initialize`](Self::initialize) with
/// the scene bounds -> records accumulate through
/// [`find_or_compute`](Self::find_or_compute) -> [`reset`](Self::reset).
#[derive(Debug)]
pub struct IrradianceCache {
    settings: CacheSettings,
    state: RwLock<CacheState>,
    counters: Counters,
    warned_capacity: AtomicBool,
    warned_uninitialized: AtomicBool,
}

impl Default for IrradianceCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

impl IrradianceCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(CacheState::default()),
            counters: Counters::default(),
            warned_capacity: AtomicBool::new(false),
            warned_uninitialized: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Start a session over geometry enclosed by `bounds`.
    ///
    /// Drops any records from a previous session and seeds the octree root.
    pub fn initialize(&self, bounds: &Aabb) {
        let mut state = self.state.write();
        state.records.clear();
        state.octree = self.settings.use_octree.then(|| Octree::new(bounds));
        state.bounds = Some(*bounds);
        self.counters.clear();

        log::debug!(
            "Irradiance cache initialized (octree: {}, capacity: {})",
            self.settings.use_octree,
            self.settings.max_records
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().bounds.is_some()
    }

    /// Back to the uninitialized state, e.g. when a new scene is loaded.
    pub fn reset(&self) {
        *self.state.write() = CacheState::default();
        self.counters.clear();
        self.warned_capacity.store(false, Ordering::Relaxed);
        self.warned_uninitialized.store(false, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of record `index`, if it exists.
    pub fn record(&self, index: usize) -> Option<IrradianceRecord> {
        self.state.read().records.get(index).copied()
    }

    pub fn octree_node_count(&self) -> usize {
        self.state.read().octree.as_ref().map_or(0, Octree::node_count)
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Append a record, returning its index.
    ///
    /// Records with a non-positive radius or negative irradiance are rejected.
    pub fn insert(&self, record: IrradianceRecord) -> TraceResult<usize> {
        record.validate()?;
        let index = self.state.write().push(record, self.settings.max_records)?;
        self.counters.inserted.fetch_add(1, Ordering::Relaxed);
        Ok(index)
    }

    /// Interpolated irradiance at `(point, normal)` from existing records only.
    ///
    /// Pure read: the same query without intervening insertions returns the
    /// same bits.
    pub fn lookup(&self, point: Vec3, normal: Vec3, error_threshold: f32) -> Option<Vec3> {
        self.state.read().interpolate(point, normal, error_threshold)
    }

    /// Irradiance at `(point, normal)`, interpolated from cached records when
    /// possible and otherwise integrated over a `grid` hemisphere and cached.
    ///
    /// Never fails: when the record cannot be stored (cache full or not
    /// initialized) the fresh estimate is returned without inserting.
    #[allow(clippy::too_many_arguments)]
    pub fn find_or_compute<S>(
        &self,
        point: Vec3,
        normal: Vec3,
        error_threshold: f32,
        grid: HemisphereGrid,
        source: &S,
        depth: u32,
        rng: &mut dyn RngCore,
    ) -> Vec3
    where
        S: IncidentRadiance + ?Sized,
    {
        self.counters.lookups.fetch_add(1, Ordering::Relaxed);

        if let Some(irradiance) = self.lookup(point, normal, error_threshold) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return irradiance;
        }

        let estimate = sample_hemisphere(point, normal, grid, source, depth, rng);
        let record = self.record_from(point, normal, &estimate);

        let mut state = self.state.write();
        if let Some(irradiance) = state.interpolate(point, normal, error_threshold) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return irradiance;
        }

        match state.push(record, self.settings.max_records) {
            Ok(_) => {
                self.counters.inserted.fetch_add(1, Ordering::Relaxed);
            }
            Err(TraceError::CacheCapacityExceeded { capacity }) => {
                self.counters.capacity_rejections.fetch_add(1, Ordering::Relaxed);
                if !self.warned_capacity.swap(true, Ordering::Relaxed) {
                    log::warn!(
                        "Irradiance cache full ({} records); further misses are computed but not cached",
                        capacity
                    );
                }
            }
            Err(err) => {
                if !self.warned_uninitialized.swap(true, Ordering::Relaxed) {
                    log::warn!("{}; irradiance is computed but not cached", err);
                }
            }
        }

        record.irradiance
    }

    fn record_from(&self, point: Vec3, normal: Vec3, estimate: &HemisphereEstimate) -> IrradianceRecord {
        let r = if estimate.harmonic_distance.is_finite() {
            estimate
                .harmonic_distance
                .clamp(self.settings.min_radius, self.settings.max_radius)
        } else {
            self.settings.max_radius
        };

        IrradianceRecord {
            position: point,
            normal,
            irradiance: estimate.irradiance.max(Vec3::ZERO),
            r,
            gradient_rotational: estimate.gradient_rotational,
            gradient_translational: estimate.gradient_translational,
        }
    }
}
