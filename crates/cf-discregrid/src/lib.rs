//! Signed distance fields of triangle meshes on cubic Lagrange grids.
//!
//! This umbrella crate ties the mesh distance oracle to the grid: a mesh's
//! exact signed distance is sampled once at every grid node and afterwards
//! evaluated anywhere in the box, with its gradient, in constant time.
//!
//! # Quick Start
//!
//! ```
//! use cf_discregrid::prelude::*;
//!
//! // Exact oracle over a closed mesh
//! let md = MeshDistance::new(unit_cube()).unwrap();
//!
//! // Grid over the mesh bounds plus a small margin
//! let domain = padded_domain(md.mesh(), 0.1, [10, 10, 10]).unwrap();
//! let mut grid = CubicLagrangeGrid::from_domain(domain);
//! let sdf = add_sdf(&mut grid, &md, false);
//!
//! // Inside is negative, the gradient points away from the nearest face
//! let p = Point3::new(0.5, 0.5, 0.8);
//! let (d, n) = grid.interpolate_gradient(sdf, &p).unwrap();
//! assert!((d + 0.2).abs() < 1e-2);
//! assert!(n.z > 0.9);
//!
//! // Outside the box there is no value
//! assert!(grid.interpolate(sdf, &Point3::new(5.0, 0.0, 0.0)).is_none());
//! ```
//!
//! # Module Organization
//!
//! - [`types`] - Immutable triangle meshes, triangles and bounding boxes
//! - [`sdf`] - Exact nearest-point and signed distance queries
//! - [`grid`] - Cubic Lagrange grids, sampling, interpolation and persistence
//!
//! # Feature Flags
//!
//! - `serde` - Serialization of mesh and grid value types

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod sdf_field;

// =============================================================================
// Re-exports
// =============================================================================

/// Immutable triangle meshes, triangles and bounding boxes.
pub use mesh_types as types;

/// Exact nearest-point and signed distance queries.
pub use mesh_sdf as sdf;

/// Cubic Lagrange grids, sampling, interpolation and persistence.
pub use cf_grid as grid;

pub use sdf_field::{DEFAULT_PADDING, SignedDistanceFunction, add_sdf, padded_domain};

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for building and querying distance grids.
///
/// # Usage
///
/// ```
/// use cf_discregrid::prelude::*;
/// ```
pub mod prelude {
    // Mesh input
    pub use mesh_types::{Aabb, Point3, TriangleMesh, Vector3, unit_cube};

    // Oracle
    pub use mesh_sdf::{MeshDistance, NearestEntity, NearestHit, SdfConfig};

    // Grid
    pub use cf_grid::{
        ContinuousFunction, CubicLagrangeGrid, DiscreteGrid, FieldId, GridDomain,
        SamplePredicate,
    };

    // Glue
    pub use crate::{SignedDistanceFunction, add_sdf, padded_domain};
}

// =============================================================================
// Tests
// =============================================================================
