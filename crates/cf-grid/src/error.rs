//! Error types for grid construction and persistence.

use thiserror::Error;

/// Result type for grid operations.
pub type GridResult<T> = Result<T, GridError>;

/// Errors that can occur while building, sampling or loading a grid.
///
/// Point queries never return these; they report an absent value instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GridError {
    /// A resolution component is zero.
    #[error("invalid resolution {0:?}: every axis needs at least one cell")]
    InvalidResolution([u32; 3]),

    /// The bounding box is non-finite or empty on some axis.
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// The grid would need more nodes than a `u32` index can address.
    #[error("grid needs {count} nodes, more than the supported {max}")]
    TooManyNodes {
        /// Nodes required by the resolution.
        count: u64,
        /// Largest supported node count.
        max: u64,
    },

    /// No field with this id exists on the grid.
    #[error("unknown field {0}")]
    UnknownField(usize),

    /// The data is not a serialized grid.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The data was written by an incompatible format version.
    #[error("unsupported format version: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version this build reads.
        expected: u32,
        /// Version found in the data.
        found: u32,
    },

    /// A stored array does not match the grid geometry.
    #[error("{what} mismatch: expected {expected}, found {found}")]
    GeometryMismatch {
        /// Which quantity disagreed.
        what: &'static str,
        /// Value implied by the grid geometry.
        expected: u64,
        /// Value found in the data.
        found: u64,
    },

    /// The data is truncated or internally inconsistent.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
