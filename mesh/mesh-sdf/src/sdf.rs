//! Mesh distance oracle.
//!
//! Computes the exact unsigned and signed distance from any point to the
//! surface of a triangle mesh, accelerated by a [`Bvh`].

use mesh_types::TriangleMesh;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::adjacency::MeshAdjacency;
use crate::bvh::Bvh;
use crate::cache::{CacheStats, CachedQuery, PointKey, QueryCache};
use crate::config::SdfConfig;
use crate::error::SdfResult;
use crate::normals::{PseudoNormals, edge_pseudo_normal, face_normal, vertex_pseudo_normal};
use crate::query::{NearestEntity, NearestHit};

/// Exact distance queries against a triangle mesh.
///
/// Owns its mesh together with the acceleration structure and, unless
/// built with [`SdfConfig::lazy`], the pseudo-normal tables. The oracle is
/// `Sync`; every query except [`MeshDistance::signed_distance_cached`] is
/// free of shared mutable state.
///
/// Signs follow the outward orientation of the mesh: negative inside,
/// positive outside, zero on the surface.
#[derive(Debug)]
pub struct MeshDistance {
    mesh: TriangleMesh,
    bvh: Bvh,
    adjacency: MeshAdjacency,
    normals: Option<PseudoNormals>,
    config: SdfConfig,
    cache: QueryCache,
}

impl MeshDistance {
    /// Build an oracle with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`MeshDistance::with_config`].
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_sdf::MeshDistance;
    /// use mesh_types::{Point3, unit_cube};
    ///
    /// let md = MeshDistance::new(unit_cube()).unwrap();
    ///
    /// assert!((md.signed_distance(Point3::new(0.5, 0.5, 0.5)) + 0.5).abs() < 1e-12);
    /// assert!((md.signed_distance(Point3::new(0.5, 0.5, 3.0)) - 2.0).abs() < 1e-12);
    /// ```
    pub fn new(mesh: TriangleMesh) -> SdfResult<Self> {
        Self::with_config(mesh, SdfConfig::default())
    }

    /// Build an oracle with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SdfError::InvalidConfig`](crate::SdfError::InvalidConfig) if
    /// the configuration does not validate.
    pub fn with_config(mesh: TriangleMesh, config: SdfConfig) -> SdfResult<Self> {
        config.validate()?;

        info!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            precompute_normals = config.precompute_normals,
            "Building mesh distance oracle"
        );

        let bvh = if config.parallel {
            Bvh::build_parallel(&mesh, config.bvh_leaf_size, config.parallel_threshold)
        } else {
            Bvh::build(&mesh, config.bvh_leaf_size)
        };
        let stats = bvh.stats();
        debug!(
            leaves = stats.leaf_count,
            depth = stats.max_depth,
            max_leaf_size = stats.max_leaf_size,
            "BVH built"
        );

        let adjacency = MeshAdjacency::build(&mesh);
        if !adjacency.is_watertight() {
            warn!(
                boundary_edges = adjacency.boundary_edge_count(),
                "Mesh is not closed; signs near the boundary may be unreliable"
            );
        }
        if adjacency.non_manifold_edge_count() > 0 {
            warn!(
                non_manifold_edges = adjacency.non_manifold_edge_count(),
                "Mesh has non-manifold edges"
            );
        }

        let normals = config
            .precompute_normals
            .then(|| PseudoNormals::compute(&mesh, &adjacency));

        Ok(Self {
            mesh,
            bvh,
            adjacency,
            normals,
            config,
            cache: QueryCache::default(),
        })
    }

    /// Nearest point on the surface, with face, feature and unsigned distance.
    ///
    /// Also stores the hit in the query cache, so a following
    /// [`MeshDistance::signed_distance_cached`] on the same point skips the
    /// traversal.
    #[must_use]
    pub fn distance(&self, point: Point3<f64>) -> NearestHit {
        let key = PointKey::of(point);
        self.cache
            .with_slot(|slot| match slot {
                Some(entry) if entry.key == key => (entry.hit, true),
                _ => {
                    let hit = self.bvh.query_nearest(point);
                    *slot = Some(CachedQuery {
                        key,
                        hit,
                        signed: None,
                    });
                    (hit, false)
                }
            })
            .unwrap_or_else(|| self.bvh.query_nearest(point))
    }

    /// Unsigned distance to the surface.
    #[must_use]
    pub fn unsigned_distance(&self, point: Point3<f64>) -> f64 {
        self.bvh.query_nearest(point).distance
    }

    /// Closest point on the surface.
    #[must_use]
    pub fn closest_point(&self, point: Point3<f64>) -> Point3<f64> {
        self.bvh.query_nearest(point).point
    }

    /// Signed distance to the surface.
    ///
    /// The sign is that of `dot(point - nearest, n)`, where `n` is the face
    /// normal for face-interior hits and the edge or vertex pseudo-normal
    /// otherwise.
    #[must_use]
    pub fn signed_distance(&self, point: Point3<f64>) -> f64 {
        let hit = self.bvh.query_nearest(point);
        self.resolve_sign(point, &hit)
    }

    /// Signed distance, reusing the previous query if it was the same point.
    ///
    /// Returns exactly what [`MeshDistance::signed_distance`] returns. When
    /// another thread holds the cache, the query runs uncached.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_sdf::MeshDistance;
    /// use mesh_types::{Point3, unit_cube};
    ///
    /// let md = MeshDistance::new(unit_cube()).unwrap();
    /// let p = Point3::new(0.25, 0.5, 0.5);
    ///
    /// let unsigned = md.distance(p).distance;
    /// let signed = md.signed_distance_cached(p);
    /// assert_eq!(signed, -unsigned);
    /// assert_eq!(md.cache_stats().hits, 1);
    /// ```
    #[must_use]
    pub fn signed_distance_cached(&self, point: Point3<f64>) -> f64 {
        let key = PointKey::of(point);
        self.cache
            .with_slot(|slot| match slot {
                Some(entry) if entry.key == key => {
                    let signed = match entry.signed {
                        Some(s) => s,
                        None => {
                            let s = self.resolve_sign(point, &entry.hit);
                            entry.signed = Some(s);
                            s
                        }
                    };
                    (signed, true)
                }
                _ => {
                    let hit = self.bvh.query_nearest(point);
                    let signed = self.resolve_sign(point, &hit);
                    *slot = Some(CachedQuery {
                        key,
                        hit,
                        signed: Some(signed),
                    });
                    (signed, false)
                }
            })
            .unwrap_or_else(|| self.signed_distance(point))
    }

    /// Signed distances for many points.
    ///
    /// Element-wise identical to [`MeshDistance::signed_distance`]; runs on
    /// the rayon pool when parallelism is enabled and the batch is large.
    #[must_use]
    pub fn signed_distances(&self, points: &[Point3<f64>]) -> Vec<f64> {
        if self.use_parallel(points.len()) {
            points.par_iter().map(|&p| self.signed_distance(p)).collect()
        } else {
            points.iter().map(|&p| self.signed_distance(p)).collect()
        }
    }

    /// Unsigned distances for many points.
    #[must_use]
    pub fn unsigned_distances(&self, points: &[Point3<f64>]) -> Vec<f64> {
        if self.use_parallel(points.len()) {
            points
                .par_iter()
                .map(|&p| self.unsigned_distance(p))
                .collect()
        } else {
            points.iter().map(|&p| self.unsigned_distance(p)).collect()
        }
    }

    /// Check if a point is strictly inside the mesh.
    #[must_use]
    pub fn is_inside(&self, point: Point3<f64>) -> bool {
        self.signed_distance(point) < 0.0
    }

    /// Get a reference to the underlying mesh.
    #[must_use]
    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// Get the acceleration structure.
    #[must_use]
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Get the mesh adjacency.
    #[must_use]
    pub fn adjacency(&self) -> &MeshAdjacency {
        &self.adjacency
    }

    /// Get the precomputed pseudo-normals, if enabled.
    #[must_use]
    pub fn normals(&self) -> Option<&PseudoNormals> {
        self.normals.as_ref()
    }

    /// Get the configuration the oracle was built with.
    #[must_use]
    pub fn config(&self) -> &SdfConfig {
        &self.config
    }

    /// Cache usage counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn use_parallel(&self, len: usize) -> bool {
        self.config.parallel && len >= self.config.parallel_threshold
    }

    fn resolve_sign(&self, point: Point3<f64>, hit: &NearestHit) -> f64 {
        let n = self.sign_normal(hit);
        if (point - hit.point).dot(&n) >= 0.0 {
            hit.distance
        } else {
            -hit.distance
        }
    }

    fn sign_normal(&self, hit: &NearestHit) -> Vector3<f64> {
        let face = self.mesh.faces()[hit.face];
        match (&self.normals, hit.entity) {
            (Some(table), NearestEntity::Face) => table.face(hit.face),
            (Some(table), NearestEntity::Edge(e)) => {
                let e = usize::from(e);
                table.edge(face[e], face[(e + 1) % 3])
            }
            (Some(table), NearestEntity::Vertex(v)) => table.vertex(face[usize::from(v)]),
            (None, NearestEntity::Face) => face_normal(&self.mesh, hit.face),
            (None, NearestEntity::Edge(e)) => {
                let e = usize::from(e);
                edge_pseudo_normal(&self.mesh, &self.adjacency, face[e], face[(e + 1) % 3])
            }
            (None, NearestEntity::Vertex(v)) => {
                vertex_pseudo_normal(&self.mesh, &self.adjacency, face[usize::from(v)])
            }
        }
    }
}
