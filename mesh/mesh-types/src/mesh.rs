//! Immutable indexed triangle mesh.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Aabb, MeshError, MeshResult, Triangle};

/// A validated, immutable indexed triangle mesh.
///
/// Vertices and faces are fixed at construction. Every face index is
/// guaranteed to be in range and every face has non-zero area, so
/// downstream queries never need to re-check.
///
/// The mesh does not have to be closed or manifold, but signed distance
/// queries assume a consistently oriented (CCW from outside) surface.
///
/// # Memory Layout
///
/// - `vertices`: `Vec<Point3<f64>>` - Vertex positions
/// - `faces`: `Vec<[u32; 3]>` - Triangle faces as vertex indices
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TriangleMesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create a mesh from vertex positions and faces.
    ///
    /// # Errors
    ///
    /// - [`MeshError::EmptyMesh`] if there are no faces or no vertices
    /// - [`MeshError::NonFiniteVertex`] if a coordinate is NaN or infinite
    /// - [`MeshError::FaceIndexOutOfRange`] if a face references a missing vertex
    /// - [`MeshError::DegenerateFace`] if a face repeats a vertex or has zero area
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{MeshError, Point3, TriangleMesh};
    ///
    /// let vertices = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// ];
    ///
    /// assert!(TriangleMesh::new(vertices.clone(), vec![[0, 1, 2]]).is_ok());
    /// assert!(matches!(
    ///     TriangleMesh::new(vertices, vec![[0, 1, 7]]),
    ///     Err(MeshError::FaceIndexOutOfRange { face: 0, index: 7, .. })
    /// ));
    /// ```
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> MeshResult<Self> {
        if faces.is_empty() || vertices.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        if let Some(vertex) = vertices
            .iter()
            .position(|v| !v.coords.iter().all(|c| c.is_finite()))
        {
            return Err(MeshError::NonFiniteVertex { vertex });
        }

        for (face_idx, face) in faces.iter().enumerate() {
            for &index in face {
                if index as usize >= vertices.len() {
                    return Err(MeshError::FaceIndexOutOfRange {
                        face: face_idx,
                        index,
                        vertex_count: vertices.len(),
                    });
                }
            }

            let tri = Triangle::new(
                vertices[face[0] as usize],
                vertices[face[1] as usize],
                vertices[face[2] as usize],
            );
            let repeated = face[0] == face[1] || face[1] == face[2] || face[2] == face[0];
            if repeated || tri.is_degenerate(0.0) {
                return Err(MeshError::DegenerateFace {
                    face: face_idx,
                    area: tri.area(),
                });
            }
        }

        Ok(Self { vertices, faces })
    }

    /// Create a mesh from flat coordinate and index buffers.
    ///
    /// `positions` is `[x0, y0, z0, x1, ...]`, `indices` is
    /// `[a0, b0, c0, a1, ...]`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidRawData`] if either buffer length is not a
    /// multiple of 3, otherwise the same errors as [`TriangleMesh::new`].
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::TriangleMesh;
    ///
    /// let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mesh = TriangleMesh::from_raw(&positions, &[0, 1, 2]).unwrap();
    /// assert_eq!(mesh.face_count(), 1);
    ///
    /// assert!(TriangleMesh::from_raw(&positions[..8], &[0, 1, 2]).is_err());
    /// ```
    pub fn from_raw(positions: &[f64], indices: &[u32]) -> MeshResult<Self> {
        if positions.len() % 3 != 0 {
            return Err(MeshError::InvalidRawData(format!(
                "position buffer length {} is not a multiple of 3",
                positions.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::InvalidRawData(format!(
                "index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }

        let vertices = positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        let faces = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

        Self::new(vertices, faces)
    }

    /// Vertex positions.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Faces as vertex index triples.
    #[inline]
    #[must_use]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Vertex position by index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    #[must_use]
    pub fn vertex(&self, index: u32) -> Point3<f64> {
        self.vertices[index as usize]
    }

    /// Triangle with resolved positions for a face.
    ///
    /// # Panics
    ///
    /// Panics if `face` is out of range.
    #[inline]
    #[must_use]
    pub fn triangle(&self, face: usize) -> Triangle {
        let [a, b, c] = self.faces[face];
        Triangle::new(self.vertex(a), self.vertex(b), self.vertex(c))
    }

    /// Iterate over all faces as triangles.
    pub fn triangles(&self) -> impl ExactSizeIterator<Item = Triangle> + '_ {
        (0..self.faces.len()).map(|f| self.triangle(f))
    }

    /// Tight bounding box of the vertices.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Signed volume via the divergence theorem.
    ///
    /// Positive for closed meshes with outward (CCW) winding, negative if
    /// inside-out. Meaningless for open meshes.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.triangles()
            .map(|t| t.v0.coords.dot(&t.v1.coords.cross(&t.v2.coords)))
            .sum::<f64>()
            / 6.0
    }

    /// Total surface area.
    #[must_use]
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|t| t.area()).sum()
    }

    /// Consume the mesh, returning its parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        (self.vertices, self.faces)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for TriangleMesh {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            vertices: Vec<Point3<f64>>,
            faces: Vec<[u32; 3]>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.vertices, raw.faces).map_err(serde::de::Error::custom)
    }
}

/// Create an axis-aligned unit cube `[0, 1]^3` with outward CCW winding.
///
/// # Example
///
/// ```
/// use mesh_types::unit_cube;
///
/// let cube = unit_cube();
/// assert_eq!(cube.face_count(), 12);
/// assert!((cube.signed_volume() - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn unit_cube() -> TriangleMesh {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];

    let faces = vec![
        // Bottom (z=0), normal -Z
        [0, 2, 1],
        [0, 3, 2],
        // Top (z=1), normal +Z
        [4, 5, 6],
        [4, 6, 7],
        // Front (y=0), normal -Y
        [0, 1, 5],
        [0, 5, 4],
        // Back (y=1), normal +Y
        [3, 7, 6],
        [3, 6, 2],
        // Left (x=0), normal -X
        [0, 4, 7],
        [0, 7, 3],
        // Right (x=1), normal +X
        [1, 2, 6],
        [1, 6, 5],
    ];

    TriangleMesh { vertices, faces }
}

/// Create a closed latitude/longitude sphere with outward CCW winding.
///
/// `stacks` is clamped to at least 2 and `slices` to at least 3. The mesh
/// has `2 + (stacks - 1) * slices` vertices and `2 * (stacks - 1) * slices`
/// faces.
///
/// # Errors
///
/// Returns an error if `radius` is not a positive finite number or `center`
/// is not finite.
///
/// # Example
///
/// ```
/// use mesh_types::{Point3, uv_sphere};
///
/// let sphere = uv_sphere(Point3::origin(), 1.0, 8, 16).unwrap();
/// assert_eq!(sphere.face_count(), 2 * 7 * 16);
/// assert!(sphere.signed_volume() > 0.0);
/// ```
pub fn uv_sphere(
    center: Point3<f64>,
    radius: f64,
    stacks: u32,
    slices: u32,
) -> MeshResult<TriangleMesh> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(MeshError::InvalidParameter(format!(
            "sphere radius must be positive and finite, got {radius}"
        )));
    }
    let stacks = stacks.max(2);
    let slices = slices.max(3);

    let mut vertices = Vec::with_capacity(2 + ((stacks - 1) * slices) as usize);
    vertices.push(center + Vector3::new(0.0, 0.0, radius));
    for k in 1..stacks {
        let theta = std::f64::consts::PI * f64::from(k) / f64::from(stacks);
        for j in 0..slices {
            let phi = std::f64::consts::TAU * f64::from(j) / f64::from(slices);
            vertices.push(
                center
                    + radius
                        * Vector3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()),
            );
        }
    }
    vertices.push(center - Vector3::new(0.0, 0.0, radius));

    let north = 0;
    let south = 1 + (stacks - 1) * slices;
    let ring = |k: u32, j: u32| 1 + (k - 1) * slices + j % slices;

    let mut faces = Vec::with_capacity(2 * ((stacks - 1) * slices) as usize);
    for j in 0..slices {
        faces.push([north, ring(1, j), ring(1, j + 1)]);
    }
    for k in 1..stacks - 1 {
        for j in 0..slices {
            let (a0, a1) = (ring(k, j), ring(k, j + 1));
            let (b0, b1) = (ring(k + 1, j), ring(k + 1, j + 1));
            faces.push([a0, b0, b1]);
            faces.push([a0, b1, a1]);
        }
    }
    for j in 0..slices {
        faces.push([south, ring(stacks - 1, j + 1), ring(stacks - 1, j)]);
    }

    TriangleMesh::new(vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle_vertices() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(
            TriangleMesh::new(triangle_vertices(), Vec::new()),
            Err(MeshError::EmptyMesh)
        );
        assert_eq!(
            TriangleMesh::new(Vec::new(), vec![[0, 1, 2]]),
            Err(MeshError::EmptyMesh)
        );
    }

    #[test]
    fn rejects_repeated_index() {
        let err = TriangleMesh::new(triangle_vertices(), vec![[0, 1, 1]]).unwrap_err();
        assert!(matches!(err, MeshError::DegenerateFace { face: 0, .. }));
    }

    #[test]
    fn rejects_collinear_face() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let err = TriangleMesh::new(vertices, vec![[0, 1, 2]]).unwrap_err();
        assert!(matches!(err, MeshError::DegenerateFace { .. }));
    }

    #[test]
    fn rejects_non_finite_vertex() {
        let mut vertices = triangle_vertices();
        vertices[1].y = f64::NAN;
        let err = TriangleMesh::new(vertices, vec![[0, 1, 2]]).unwrap_err();
        assert_eq!(err, MeshError::NonFiniteVertex { vertex: 1 });
    }

    #[test]
    fn raw_rejects_bad_lengths() {
        let err = TriangleMesh::from_raw(&[0.0; 9], &[0, 1]).unwrap_err();
        assert!(matches!(err, MeshError::InvalidRawData(_)));
    }

    #[test]
    fn unit_cube_is_valid_and_outward() {
        let cube = unit_cube();
        let (vertices, faces) = cube.clone().into_parts();
        assert_eq!(TriangleMesh::new(vertices, faces), Ok(cube.clone()));
        assert_relative_eq!(cube.signed_volume(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(cube.surface_area(), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn uv_sphere_is_closed_and_outward() {
        let sphere = uv_sphere(Point3::new(1.0, -2.0, 0.5), 2.0, 12, 24).unwrap();
        assert_eq!(sphere.vertex_count(), 2 + 11 * 24);
        assert_eq!(sphere.face_count(), 2 * 11 * 24);

        let exact = 4.0 / 3.0 * std::f64::consts::PI * 8.0;
        let volume = sphere.signed_volume();
        assert!(volume > 0.9 * exact && volume < exact);

        let b = sphere.bounds();
        assert_relative_eq!(b.max.z, 2.5, epsilon = 1e-12);
        assert_relative_eq!(b.min.z, -1.5, epsilon = 1e-12);
    }

    #[test]
    fn uv_sphere_rejects_bad_radius() {
        for radius in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                uv_sphere(Point3::origin(), radius, 4, 4),
                Err(MeshError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn unit_cube_bounds() {
        let b = unit_cube().bounds();
        assert_eq!(b.min, Point3::origin());
        assert_eq!(b.max, Point3::new(1.0, 1.0, 1.0));
    }
}
