//! Core mesh types for distance queries.
//!
//! This crate provides the immutable geometry consumed by the distance
//! oracle in `mesh-sdf`:
//!
//! - [`TriangleMesh`] - A validated, immutable indexed triangle mesh
//! - [`Triangle`] - A concrete triangle with vertex positions
//! - [`Aabb`] - Axis-aligned bounding box
//!
//! # Dependencies
//!
//! Only `nalgebra` and `thiserror` (plus `serde` behind the `serde`
//! feature), so the types can be used in CLI tools, servers, WASM or
//! Python bindings.
//!
//! # Coordinate System
//!
//! Uses a **right-handed coordinate system**. Face winding is
//! **counter-clockwise (CCW) when viewed from outside**, so normals point
//! outward by the right-hand rule. Signed distance queries rely on this.
//!
//! # Example
//!
//! ```
//! use mesh_types::{TriangleMesh, Point3};
//!
//! let mesh = TriangleMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.5, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap();
//!
//! assert_eq!(mesh.face_count(), 1);
//! assert_eq!(mesh.vertex_count(), 3);
//! ```
//!
//! Invalid input is rejected up front:
//!
//! ```
//! use mesh_types::{MeshError, TriangleMesh};
//!
//! let result = TriangleMesh::new(Vec::new(), Vec::new());
//! assert!(matches!(result, Err(MeshError::EmptyMesh)));
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bounds;
mod error;
mod mesh;
mod triangle;

pub use bounds::Aabb;
pub use error::{MeshError, MeshResult};
pub use mesh::{TriangleMesh, unit_cube, uv_sphere};
pub use triangle::Triangle;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
