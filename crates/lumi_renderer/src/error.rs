//! Errors surfaced by trace sessions.

use thiserror::Error;

/// Everything that can go wrong while configuring or running a trace.
///
/// Geometric degeneracy is not represented here: intersection and sampling
/// resolve it locally ("no hit", zero irradiance).
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Invalid trace configuration: {0}")]
    InvalidConfig(String),

    #[error("Irradiance cache is full ({capacity} records)")]
    CacheCapacityExceeded { capacity: usize },

    #[error("Irradiance cache used before initialization")]
    CacheUninitialized,

    #[error("Rejected irradiance record: {0}")]
    InvalidRecord(String),

    #[error("Image buffer holds {actual} pixels, expected {expected} for {width}x{height}")]
    ImageSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },

    #[error("Failed to parse trace configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TraceResult<T> = Result<T, TraceError>;
