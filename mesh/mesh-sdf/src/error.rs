//! Error types for distance queries.

use mesh_types::MeshError;
use thiserror::Error;

/// Result type for distance oracle operations.
pub type SdfResult<T> = Result<T, SdfError>;

/// Errors that can occur while building a distance oracle.
///
/// Queries themselves never fail; only construction does.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SdfError {
    /// The input mesh is invalid.
    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
