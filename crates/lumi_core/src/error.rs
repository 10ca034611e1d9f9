//! Scene validation errors.

use thiserror::Error;

/// Errors raised while assembling a scene graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Index buffer length {len} is not a multiple of 3")]
    IndexCountNotTriangles { len: usize },

    #[error("Triangle index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("Mesh has {normals} normals but {positions} positions")]
    NormalCountMismatch { normals: usize, positions: usize },

    #[error("Unknown parent node {0}")]
    UnknownParent(usize),
}

pub type SceneResult<T> = Result<T, SceneError>;
