//! Geometric query utilities for distance computation.
//!
//! Provides closest-point-on-triangle with feature classification,
//! ray-triangle intersection and a brute-force reference for both the
//! nearest-triangle search and the inside/outside test.

use mesh_types::{Triangle, TriangleMesh};
use nalgebra::{Point3, Vector3};

/// The feature of a triangle that a closest point lies on.
///
/// Local indices follow the face's vertex order: `Vertex(i)` is vertex `i`
/// and `Edge(i)` runs from vertex `i` to vertex `(i + 1) % 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NearestEntity {
    /// One of the three corners.
    Vertex(u8),
    /// The interior of one of the three edges.
    Edge(u8),
    /// The interior of the face.
    Face,
}

/// Closest point on a single triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// The closest point.
    pub point: Point3<f64>,
    /// Which feature of the triangle it lies on.
    pub entity: NearestEntity,
}

/// Result of a nearest-surface query against a whole mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestHit {
    /// Index of the nearest face.
    pub face: usize,
    /// Nearest point on the surface.
    pub point: Point3<f64>,
    /// Feature of the nearest face that `point` lies on.
    pub entity: NearestEntity,
    /// Unsigned Euclidean distance from the query point to `point`.
    pub distance: f64,
}

/// Compute the closest point on a triangle to a query point.
///
/// Implements the Voronoi-region walk from "Real-Time Collision Detection"
/// (Ericson) and reports which region the answer came from. The region is
/// what the sign test needs: face-interior hits use the face normal,
/// edge and vertex hits use pseudo-normals.
///
/// # Example
///
/// ```
/// use mesh_sdf::{NearestEntity, closest_point_on_triangle};
/// use mesh_types::{Point3, Triangle};
///
/// let tri = Triangle::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(10.0, 0.0, 0.0),
///     Point3::new(5.0, 10.0, 0.0),
/// );
///
/// let above = closest_point_on_triangle(Point3::new(5.0, 3.0, 5.0), &tri);
/// assert_eq!(above.entity, NearestEntity::Face);
///
/// let corner = closest_point_on_triangle(Point3::new(-5.0, -5.0, 0.0), &tri);
/// assert_eq!(corner.entity, NearestEntity::Vertex(0));
/// ```
#[must_use]
pub fn closest_point_on_triangle(point: Point3<f64>, tri: &Triangle) -> ClosestPoint {
    let (a, b, c) = (tri.v0, tri.v1, tri.v2);
    let ab = b - a;
    let ac = c - a;
    let ap = point - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return ClosestPoint {
            point: a,
            entity: NearestEntity::Vertex(0),
        };
    }

    let bp = point - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return ClosestPoint {
            point: b,
            entity: NearestEntity::Vertex(1),
        };
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return ClosestPoint {
            point: a + ab * v,
            entity: NearestEntity::Edge(0),
        };
    }

    let cp = point - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return ClosestPoint {
            point: c,
            entity: NearestEntity::Vertex(2),
        };
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return ClosestPoint {
            point: a + ac * w,
            entity: NearestEntity::Edge(2),
        };
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return ClosestPoint {
            point: b + (c - b) * w,
            entity: NearestEntity::Edge(1),
        };
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    ClosestPoint {
        point: a + ab * v + ac * w,
        entity: NearestEntity::Face,
    }
}

/// Test if a ray intersects a triangle (Möller–Trumbore).
///
/// Returns `Some(t)` with the ray parameter of the hit, or `None`.
#[must_use]
pub fn ray_triangle_intersect(
    ray_origin: Point3<f64>,
    ray_dir: Vector3<f64>,
    tri: &Triangle,
) -> Option<f64> {
    const EPSILON: f64 = 1e-12;

    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;

    let h = ray_dir.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray_origin - tri.v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * ray_dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    (t > EPSILON).then_some(t)
}

/// Check if a point is inside a closed mesh by ray-crossing parity.
///
/// Independent of normals and pseudo-normals, so it serves as a reference
/// for the sign of [`MeshDistance::signed_distance`](crate::MeshDistance::signed_distance).
/// The ray direction is deliberately skewed off the axes so that it does not
/// graze the diagonals of axis-aligned quads.
#[must_use]
pub fn point_in_mesh(point: Point3<f64>, mesh: &TriangleMesh) -> bool {
    let ray_dir = Vector3::new(1.0, 0.312_571, 0.170_463).normalize();
    let crossings = mesh
        .triangles()
        .filter(|tri| ray_triangle_intersect(point, ray_dir, tri).is_some())
        .count();
    crossings % 2 == 1
}

/// Nearest surface point by testing every face.
///
/// O(n) reference for the hierarchy in [`Bvh`](crate::Bvh); ties resolve to
/// the lowest face index.
#[must_use]
pub fn brute_force_nearest(point: Point3<f64>, mesh: &TriangleMesh) -> NearestHit {
    let mut best = nearest_on_face(point, mesh, 0);
    for face in 1..mesh.face_count() {
        let candidate = nearest_on_face(point, mesh, face);
        if candidate.distance < best.distance {
            best = candidate;
        }
    }
    best
}

fn nearest_on_face(point: Point3<f64>, mesh: &TriangleMesh, face: usize) -> NearestHit {
    let cp = closest_point_on_triangle(point, &mesh.triangle(face));
    NearestHit {
        face,
        point: cp.point,
        entity: cp.entity,
        distance: (cp.point - point).norm(),
    }
}
