//! Error types for mesh construction.

use thiserror::Error;

/// Result type for mesh construction.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors raised while validating a [`TriangleMesh`](crate::TriangleMesh).
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum MeshError {
    /// Mesh has no faces (or no vertices).
    #[error("mesh is empty")]
    EmptyMesh,

    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        /// Face index.
        face: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A face has repeated vertices or zero area.
    #[error("face {face} is degenerate (area {area:e})")]
    DegenerateFace {
        /// Face index.
        face: usize,
        /// Computed face area.
        area: f64,
    },

    /// A vertex coordinate is NaN or infinite.
    #[error("vertex {vertex} has a non-finite coordinate")]
    NonFiniteVertex {
        /// Vertex index.
        vertex: usize,
    },

    /// Flat position/index buffers have the wrong length.
    #[error("invalid raw mesh data: {0}")]
    InvalidRawData(String),

    /// A primitive generator was given an unusable parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
