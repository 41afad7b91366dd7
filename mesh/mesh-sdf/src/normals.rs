//! Angle-weighted pseudo-normals for sign determination.
//!
//! For a point whose nearest surface feature is a face interior, the sign
//! of `dot(p - nearest, n_face)` decides inside/outside. At edges and
//! vertices the face normal is ambiguous; Bærentzen & Aanæs show that the
//! edge normal (sum of the two adjacent face normals) and the
//! angle-weighted vertex normal give a correct sign on closed manifolds.

use hashbrown::HashMap;
use mesh_types::TriangleMesh;
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::adjacency::{MeshAdjacency, normalize_edge};

/// Unit normal of a face, or zero if it cannot be normalized.
#[must_use]
pub fn face_normal(mesh: &TriangleMesh, face: usize) -> Vector3<f64> {
    mesh.triangle(face).normal().unwrap_or_else(Vector3::zeros)
}

/// Angle-weighted vertex pseudo-normal.
///
/// Sum over incident faces of the face normal scaled by the interior angle
/// at the vertex, normalized.
#[must_use]
pub fn vertex_pseudo_normal(
    mesh: &TriangleMesh,
    adjacency: &MeshAdjacency,
    vertex: u32,
) -> Vector3<f64> {
    let sum = adjacency
        .faces_for_vertex(vertex)
        .iter()
        .fold(Vector3::zeros(), |acc, &f| {
            let face = mesh.faces()[f as usize];
            let tri = mesh.triangle(f as usize);
            let local = face.iter().position(|&v| v == vertex).unwrap_or(0);
            acc + face_normal(mesh, f as usize) * tri.angle_at(local)
        });
    sum.try_normalize(0.0).unwrap_or_else(Vector3::zeros)
}

/// Edge pseudo-normal: normalized sum of the adjacent face normals.
#[must_use]
pub fn edge_pseudo_normal(
    mesh: &TriangleMesh,
    adjacency: &MeshAdjacency,
    v0: u32,
    v1: u32,
) -> Vector3<f64> {
    let sum = adjacency
        .faces_for_edge(v0, v1)
        .unwrap_or(&[])
        .iter()
        .fold(Vector3::zeros(), |acc, &f| acc + face_normal(mesh, f as usize));
    sum.try_normalize(0.0).unwrap_or_else(Vector3::zeros)
}

/// Precomputed face, edge and vertex pseudo-normals of a mesh.
#[derive(Debug, Clone)]
pub struct PseudoNormals {
    face: Vec<Vector3<f64>>,
    vertex: Vec<Vector3<f64>>,
    edge: HashMap<(u32, u32), Vector3<f64>>,
}

impl PseudoNormals {
    /// Compute all pseudo-normals of a mesh.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_sdf::{MeshAdjacency, PseudoNormals};
    /// use mesh_types::unit_cube;
    ///
    /// let cube = unit_cube();
    /// let normals = PseudoNormals::compute(&cube, &MeshAdjacency::build(&cube));
    ///
    /// // The corner at the origin points diagonally outward
    /// let n = normals.vertex(0);
    /// assert!(n.x < 0.0 && n.y < 0.0 && n.z < 0.0);
    /// ```
    #[must_use]
    pub fn compute(mesh: &TriangleMesh, adjacency: &MeshAdjacency) -> Self {
        let face = (0..mesh.face_count())
            .into_par_iter()
            .map(|f| face_normal(mesh, f))
            .collect();

        let vertex = (0..mesh.vertex_count() as u32)
            .into_par_iter()
            .map(|v| vertex_pseudo_normal(mesh, adjacency, v))
            .collect();

        let edge = adjacency
            .edges()
            .map(|(a, b)| ((a, b), edge_pseudo_normal(mesh, adjacency, a, b)))
            .collect();

        Self { face, vertex, edge }
    }

    /// Normal of a face.
    ///
    /// # Panics
    ///
    /// Panics if `face` is out of range.
    #[must_use]
    pub fn face(&self, face: usize) -> Vector3<f64> {
        self.face[face]
    }

    /// Pseudo-normal of a vertex.
    ///
    /// # Panics
    ///
    /// Panics if `vertex` is out of range.
    #[must_use]
    pub fn vertex(&self, vertex: u32) -> Vector3<f64> {
        self.vertex[vertex as usize]
    }

    /// Pseudo-normal of an edge in either direction, zero if the edge is unknown.
    #[must_use]
    pub fn edge(&self, v0: u32, v1: u32) -> Vector3<f64> {
        self.edge
            .get(&normalize_edge(v0, v1))
            .copied()
            .unwrap_or_else(Vector3::zeros)
    }
}
