//! Configuration and presets for the distance oracle.
//!
//! # Presets
//!
//! - [`SdfConfig::default()`] - Precomputed normals, parallel batches and BVH build
//! - [`SdfConfig::lazy()`] - Pseudo-normals computed per query, smaller footprint
//! - [`SdfConfig::sequential()`] - No rayon, for deterministic single-thread runs
//!
//! # Example
//!
//! ```
//! use mesh_sdf::SdfConfig;
//!
//! let config = SdfConfig::lazy()
//!     .with_bvh_leaf_size(4)
//!     .with_parallel(false);
//! assert!(!config.precompute_normals);
//! ```

use crate::bvh::DEFAULT_LEAF_SIZE;
use crate::{SdfError, SdfResult};

/// Configuration for [`MeshDistance`](crate::MeshDistance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdfConfig {
    /// Build the face, edge and vertex pseudo-normal tables up front.
    ///
    /// When disabled, the normal needed for a sign is derived from the
    /// mesh adjacency on every query.
    pub precompute_normals: bool,

    /// Maximum number of triangles in a BVH leaf. Must be at least 1.
    pub bvh_leaf_size: usize,

    /// Whether to use rayon for the BVH build and batch queries.
    pub parallel: bool,

    /// Minimum number of triangles (BVH build) or points (batch queries)
    /// before work is split across threads.
    pub parallel_threshold: usize,
}

impl Default for SdfConfig {
    fn default() -> Self {
        Self {
            precompute_normals: true,
            bvh_leaf_size: DEFAULT_LEAF_SIZE,
            parallel: true,
            parallel_threshold: 4096,
        }
    }
}

impl SdfConfig {
    /// Skip the pseudo-normal tables and compute normals on demand.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_sdf::SdfConfig;
    ///
    /// assert!(!SdfConfig::lazy().precompute_normals);
    /// ```
    #[must_use]
    pub fn lazy() -> Self {
        Self {
            precompute_normals: false,
            ..Self::default()
        }
    }

    /// Run everything on the calling thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Enable or disable the pseudo-normal tables.
    #[must_use]
    pub fn with_precompute_normals(mut self, precompute: bool) -> Self {
        self.precompute_normals = precompute;
        self
    }

    /// Set the maximum BVH leaf size.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_sdf::SdfConfig;
    ///
    /// let config = SdfConfig::default().with_bvh_leaf_size(2);
    /// assert_eq!(config.bvh_leaf_size, 2);
    /// ```
    #[must_use]
    pub fn with_bvh_leaf_size(mut self, size: usize) -> Self {
        self.bvh_leaf_size = size;
        self
    }

    /// Enable or disable parallel processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the work size above which rayon is used.
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Check that all values are in range.
    ///
    /// # Errors
    ///
    /// Returns [`SdfError::InvalidConfig`] if `bvh_leaf_size` is zero.
    pub fn validate(&self) -> SdfResult<()> {
        if self.bvh_leaf_size == 0 {
            return Err(SdfError::InvalidConfig(
                "bvh_leaf_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = SdfConfig::default();
        assert!(config.precompute_normals);
        assert!(config.parallel);
        assert_eq!(config.bvh_leaf_size, DEFAULT_LEAF_SIZE);
        assert_eq!(DEFAULT_LEAF_SIZE, 8);
        assert_eq!(config.parallel_threshold, 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn presets_differ_from_default_in_one_field() {
        let lazy = SdfConfig::lazy();
        assert_eq!(lazy.with_precompute_normals(true), SdfConfig::default());

        let sequential = SdfConfig::sequential();
        assert_eq!(sequential.with_parallel(true), SdfConfig::default());
    }

    #[test]
    fn zero_leaf_size_is_rejected() {
        let err = SdfConfig::default().with_bvh_leaf_size(0).validate();
        assert!(matches!(err, Err(SdfError::InvalidConfig(_))));
    }
}
