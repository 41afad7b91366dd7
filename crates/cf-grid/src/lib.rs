//! Discretization of scalar fields on regular grids of cubic Lagrange elements.
//!
//! A [`CubicLagrangeGrid`] splits an axis-aligned box into congruent cells.
//! Each cell is a 32-node cubic serendipity element (see [`lagrange`]), and
//! nodes shared between neighbouring cells are stored once. Any number of
//! fields can be sampled onto the same grid:
//!
//! - [`GridDomain`] - Box, resolution and node numbering
//! - [`DiscreteGrid`] - Sampling and interpolation interface
//! - [`ContinuousFunction`] / [`SamplePredicate`] - What gets sampled, and where
//! - [`ShapeSample`] - Shape functions at a point, reusable across fields
//!
//! Interpolation is exact for polynomials up to degree two and returns `None`
//! outside the sampled region, so queries never fail loudly.
//!
//! # Example
//!
//! ```
//! use cf_grid::{CubicLagrangeGrid, DiscreteGrid, Point3};
//!
//! let mut grid = CubicLagrangeGrid::new(
//!     Point3::new(-1.0, -1.0, -1.0),
//!     Point3::new(1.0, 1.0, 1.0),
//!     [8, 8, 8],
//! )
//! .unwrap();
//!
//! // Sample a sphere of radius 0.5, but only in the upper half
//! let sphere = |x: &Point3<f64>| x.coords.norm() - 0.5;
//! let upper = |x: &Point3<f64>| x.z > 0.0;
//! let field = grid.add_function(&sphere, false, Some(&upper));
//!
//! let (value, gradient) = grid.interpolate_gradient(field, &Point3::new(0.0, 0.0, 0.8)).unwrap();
//! assert!((value - 0.3).abs() < 1e-3);
//! assert!((gradient.z - 1.0).abs() < 1e-2);
//!
//! // Unsampled half and points outside the box
//! assert!(grid.interpolate(field, &Point3::new(0.0, 0.0, -0.8)).is_none());
//! assert!(grid.interpolate(field, &Point3::new(0.0, 0.0, 1.5)).is_none());
//! ```
//!
//! # Persistence
//!
//! Grids are stored in a compact little-endian binary format with
//! [`CubicLagrangeGrid::save`] and [`CubicLagrangeGrid::load`]; see
//! [`io`] for the layout.
//!
//! # Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`GridDomain`] and [`FieldId`]

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod domain;
mod error;
mod field;
mod function;
mod grid;
pub mod io;
pub mod lagrange;

pub use domain::GridDomain;
pub use error::{GridError, GridResult};
pub use function::{ContinuousFunction, SamplePredicate};
pub use grid::{CubicLagrangeGrid, DiscreteGrid, FieldId, ShapeSample};
pub use lagrange::{NODE_COUNT, ShapeGradients, ShapeValues};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
