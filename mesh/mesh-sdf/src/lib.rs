//! Exact signed distance queries against triangle meshes.
//!
//! [`MeshDistance`] answers nearest-point, unsigned and signed distance
//! queries for any point in space. The nearest triangle is found through a
//! [`Bvh`]; the sign comes from the face normal or, when the nearest point
//! lies on an edge or vertex, from an angle-weighted pseudo-normal.
//!
//! # Example
//!
//! ```
//! use mesh_sdf::{MeshDistance, NearestEntity, SdfConfig};
//! use mesh_types::{Point3, unit_cube};
//!
//! let md = MeshDistance::with_config(unit_cube(), SdfConfig::default()).unwrap();
//!
//! // Inside is negative
//! let d = md.signed_distance(Point3::new(0.5, 0.5, 0.25));
//! assert!((d + 0.25).abs() < 1e-12);
//!
//! // The nearest feature of an outside corner point is the cube corner
//! let hit = md.distance(Point3::new(2.0, 2.0, 2.0));
//! assert!(matches!(hit.entity, NearestEntity::Vertex(_)));
//! assert!((hit.distance - 3.0_f64.sqrt()).abs() < 1e-12);
//! ```
//!
//! # Concurrency
//!
//! The oracle is `Sync`. Batch queries ([`MeshDistance::signed_distances`])
//! use rayon. [`MeshDistance::signed_distance_cached`] shares one cache slot
//! per oracle and never blocks on it.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod adjacency;
mod bvh;
mod cache;
mod config;
mod error;
mod normals;
mod query;
mod sdf;

pub use adjacency::MeshAdjacency;
pub use bvh::{Bvh, BvhNode, BvhStats, DEFAULT_LEAF_SIZE};
pub use cache::CacheStats;
pub use config::SdfConfig;
pub use error::{SdfError, SdfResult};
pub use normals::{PseudoNormals, edge_pseudo_normal, face_normal, vertex_pseudo_normal};
pub use query::{
    ClosestPoint, NearestEntity, NearestHit, brute_force_nearest, closest_point_on_triangle,
    point_in_mesh, ray_triangle_intersect,
};
pub use sdf::MeshDistance;
