//! Mesh adjacency data structures.
//!
//! Provides edge-to-face and vertex-to-face lookups used to assemble the
//! edge and vertex pseudo-normals.

use hashbrown::HashMap;
use mesh_types::TriangleMesh;
use smallvec::SmallVec;

/// Faces around an edge. Two for a closed manifold.
pub type EdgeFaces = SmallVec<[u32; 2]>;

/// Faces around a vertex.
pub type VertexFaces = SmallVec<[u32; 8]>;

/// Adjacency information for a mesh.
///
/// Provides lookups for:
/// - Faces adjacent to an edge
/// - Faces adjacent to a vertex
/// - Boundary edges (edges with only one adjacent face)
/// - Non-manifold edges (edges with more than two adjacent faces)
#[derive(Debug, Clone)]
pub struct MeshAdjacency {
    /// Maps edge (v0, v1) to face indices. v0 < v1.
    edge_to_faces: HashMap<(u32, u32), EdgeFaces>,
    /// Face indices per vertex, indexed by vertex.
    vertex_to_faces: Vec<VertexFaces>,
}

impl MeshAdjacency {
    /// Build adjacency information for a mesh.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_sdf::MeshAdjacency;
    /// use mesh_types::unit_cube;
    ///
    /// let adj = MeshAdjacency::build(&unit_cube());
    /// assert!(adj.is_watertight());
    /// assert_eq!(adj.edge_count(), 18);
    /// ```
    #[must_use]
    pub fn build(mesh: &TriangleMesh) -> Self {
        let mut edge_to_faces: HashMap<(u32, u32), EdgeFaces> =
            HashMap::with_capacity(mesh.face_count() * 3 / 2);
        let mut vertex_to_faces = vec![VertexFaces::new(); mesh.vertex_count()];

        for (face_idx, face) in mesh.faces().iter().enumerate() {
            let face_idx = face_idx as u32;
            for &v in face {
                vertex_to_faces[v as usize].push(face_idx);
            }

            for i in 0..3 {
                let edge = normalize_edge(face[i], face[(i + 1) % 3]);
                edge_to_faces.entry(edge).or_default().push(face_idx);
            }
        }

        Self {
            edge_to_faces,
            vertex_to_faces,
        }
    }

    /// Get faces adjacent to an edge, in either direction.
    ///
    /// Returns `None` if the edge doesn't exist in the mesh.
    #[must_use]
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> Option<&[u32]> {
        self.edge_to_faces
            .get(&normalize_edge(v0, v1))
            .map(SmallVec::as_slice)
    }

    /// Get faces adjacent to a vertex.
    ///
    /// Returns an empty slice for unreferenced or out-of-range vertices.
    #[must_use]
    pub fn faces_for_vertex(&self, v: u32) -> &[u32] {
        self.vertex_to_faces
            .get(v as usize)
            .map_or(&[], SmallVec::as_slice)
    }

    /// Iterate over all edges as `(v0, v1)` with `v0 < v1`.
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces.keys().copied()
    }

    /// Count the number of boundary edges.
    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|faces| faces.len() == 1)
            .count()
    }

    /// Count the number of non-manifold edges.
    #[must_use]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|faces| faces.len() > 2)
            .count()
    }

    /// Check if the mesh is watertight (no boundary edges).
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() >= 2)
    }

    /// Get the total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }
}

/// Normalize edge direction so v0 < v1.
#[inline]
pub(crate) fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 { (v0, v1) } else { (v1, v0) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mesh_types::{Point3, unit_cube};

    fn two_triangles_sharing_edge() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [1, 3, 2]],
        )
        .unwrap()
    }

    #[test]
    fn faces_for_edge_ignores_direction() {
        let adj = MeshAdjacency::build(&two_triangles_sharing_edge());
        assert_eq!(adj.faces_for_edge(1, 2).unwrap(), &[0, 1]);
        assert_eq!(adj.faces_for_edge(2, 1).unwrap(), &[0, 1]);
        assert_eq!(adj.faces_for_edge(0, 1).unwrap(), &[0]);
        assert!(adj.faces_for_edge(0, 3).is_none());
    }

    #[test]
    fn faces_for_vertex() {
        let adj = MeshAdjacency::build(&two_triangles_sharing_edge());
        assert_eq!(adj.faces_for_vertex(0), &[0]);
        assert_eq!(adj.faces_for_vertex(2), &[0, 1]);
        assert!(adj.faces_for_vertex(99).is_empty());
    }

    #[test]
    fn open_patch_has_boundary() {
        let adj = MeshAdjacency::build(&two_triangles_sharing_edge());
        assert_eq!(adj.edge_count(), 5);
        assert_eq!(adj.boundary_edge_count(), 4);
        assert!(!adj.is_watertight());
    }

    #[test]
    fn cube_is_closed_manifold() {
        let adj = MeshAdjacency::build(&unit_cube());
        assert!(adj.is_watertight());
        assert_eq!(adj.non_manifold_edge_count(), 0);
        assert_eq!(adj.boundary_edge_count(), 0);
        assert!(adj.edges().all(|(a, b)| a < b));
    }
}
