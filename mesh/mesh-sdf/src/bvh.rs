//! Bounding Volume Hierarchy for nearest-triangle queries.
//!
//! Triangles are partitioned by recursive longest-axis median splits on
//! their centroids. Leaves own a contiguous range of a permuted face index
//! array, so the whole tree is two allocations plus the boxed nodes.

use mesh_types::{Aabb, Triangle, TriangleMesh};
use nalgebra::Point3;
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::query::{NearestHit, closest_point_on_triangle};

/// Default maximum number of triangles per leaf.
pub const DEFAULT_LEAF_SIZE: usize = 8;

/// BVH node containing either a leaf range or two children.
#[derive(Debug)]
pub enum BvhNode {
    /// Leaf node covering `order[start..end]`.
    Leaf {
        /// Bounding box of all triangles in this leaf.
        bbox: Aabb,
        /// First slot in the permuted face order.
        start: usize,
        /// One past the last slot.
        end: usize,
    },
    /// Internal node with two children.
    Internal {
        /// Bounding box of all triangles in this subtree.
        bbox: Aabb,
        /// Left child node.
        left: Box<Self>,
        /// Right child node.
        right: Box<Self>,
    },
}

impl BvhNode {
    /// Get the bounding box of this node.
    #[must_use]
    pub fn bbox(&self) -> &Aabb {
        match self {
            Self::Leaf { bbox, .. } | Self::Internal { bbox, .. } => bbox,
        }
    }
}

/// Per-triangle data shared by all recursion levels of a build.
struct BuildInput {
    bounds: Vec<Aabb>,
    centroids: Vec<Point3<f64>>,
}

/// Bounding Volume Hierarchy over the faces of a [`TriangleMesh`].
///
/// Stores resolved triangle positions so queries do not need the mesh.
#[derive(Debug)]
pub struct Bvh {
    root: BvhNode,
    order: Vec<u32>,
    triangles: Vec<Triangle>,
}

impl Bvh {
    /// Build a BVH on the calling thread.
    ///
    /// `max_leaf_size` values below 1 are treated as 1.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_sdf::Bvh;
    /// use mesh_types::{Point3, unit_cube};
    ///
    /// let bvh = Bvh::build(&unit_cube(), 2);
    /// assert_eq!(bvh.triangle_count(), 12);
    ///
    /// let hit = bvh.query_nearest(Point3::new(0.5, 0.5, 2.0));
    /// assert!((hit.distance - 1.0).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn build(mesh: &TriangleMesh, max_leaf_size: usize) -> Self {
        Self::build_parallel(mesh, max_leaf_size, usize::MAX)
    }

    /// Build a BVH, splitting subtrees with at least `parallel_threshold`
    /// triangles across the rayon pool.
    ///
    /// Produces the same tree as [`Bvh::build`].
    #[must_use]
    pub fn build_parallel(
        mesh: &TriangleMesh,
        max_leaf_size: usize,
        parallel_threshold: usize,
    ) -> Self {
        let triangles: Vec<Triangle> = if mesh.face_count() >= parallel_threshold {
            (0..mesh.face_count())
                .into_par_iter()
                .map(|f| mesh.triangle(f))
                .collect()
        } else {
            mesh.triangles().collect()
        };

        let input = BuildInput {
            bounds: triangles.iter().map(Triangle::bounds).collect(),
            centroids: triangles.iter().map(Triangle::centroid).collect(),
        };

        let mut order: Vec<u32> = (0..triangles.len() as u32).collect();
        let root = build_range(
            &input,
            &mut order,
            0,
            max_leaf_size.max(1),
            parallel_threshold.max(1),
        );

        Self {
            root,
            order,
            triangles,
        }
    }

    /// Find the nearest point on the mesh surface.
    ///
    /// Depth-first descent that visits the nearer child first and skips
    /// any subtree whose box is no closer than the best hit so far. The
    /// result is the global minimum over all triangles.
    ///
    /// A non-finite `point` yields a hit with a NaN distance.
    #[must_use]
    pub fn query_nearest(&self, point: Point3<f64>) -> NearestHit {
        let first = self.order[0] as usize;
        let mut best = self.hit_on(point, first);
        let mut best_d2 = best.distance * best.distance;

        let mut stack: SmallVec<[&BvhNode; 64]> = SmallVec::new();
        stack.push(&self.root);

        while let Some(node) = stack.pop() {
            if node.bbox().distance_squared_to(&point) >= best_d2 {
                continue;
            }
            match node {
                BvhNode::Leaf { start, end, .. } => {
                    for &face in &self.order[*start..*end] {
                        let cp = closest_point_on_triangle(point, &self.triangles[face as usize]);
                        let d2 = (cp.point - point).norm_squared();
                        if d2 < best_d2 {
                            best_d2 = d2;
                            best = NearestHit {
                                face: face as usize,
                                point: cp.point,
                                entity: cp.entity,
                                distance: d2.sqrt(),
                            };
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    let dl = left.bbox().distance_squared_to(&point);
                    let dr = right.bbox().distance_squared_to(&point);
                    // Push the farther child first so the nearer one is popped next
                    let (near, far, d_far) = if dl <= dr {
                        (left, right, dr)
                    } else {
                        (right, left, dl)
                    };
                    if d_far < best_d2 {
                        stack.push(far);
                    }
                    stack.push(near);
                }
            }
        }

        best
    }

    fn hit_on(&self, point: Point3<f64>, face: usize) -> NearestHit {
        let cp = closest_point_on_triangle(point, &self.triangles[face]);
        NearestHit {
            face,
            point: cp.point,
            entity: cp.entity,
            distance: (cp.point - point).norm(),
        }
    }

    /// Get the total number of triangles in the BVH.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Get the root bounding box (the bounds of the whole mesh).
    #[must_use]
    pub fn root_bounds(&self) -> &Aabb {
        self.root.bbox()
    }

    /// Get the root node.
    #[must_use]
    pub fn root(&self) -> &BvhNode {
        &self.root
    }

    /// Face indices in leaf order. A leaf's `start..end` indexes this slice.
    #[must_use]
    pub fn face_order(&self) -> &[u32] {
        &self.order
    }

    /// Get statistics about the BVH structure.
    #[must_use]
    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        Self::collect_stats(&self.root, 0, &mut stats);
        stats
    }

    fn collect_stats(node: &BvhNode, depth: usize, stats: &mut BvhStats) {
        stats.max_depth = stats.max_depth.max(depth);

        match node {
            BvhNode::Leaf { start, end, .. } => {
                let len = end - start;
                stats.leaf_count += 1;
                stats.total_triangles_in_leaves += len;
                stats.max_leaf_size = stats.max_leaf_size.max(len);
            }
            BvhNode::Internal { left, right, .. } => {
                stats.internal_count += 1;
                Self::collect_stats(left, depth + 1, stats);
                Self::collect_stats(right, depth + 1, stats);
            }
        }
    }
}

fn build_range(
    input: &BuildInput,
    indices: &mut [u32],
    offset: usize,
    max_leaf_size: usize,
    parallel_threshold: usize,
) -> BvhNode {
    let bbox = indices
        .iter()
        .fold(Aabb::empty(), |acc, &i| acc.union(&input.bounds[i as usize]));

    if indices.len() <= max_leaf_size {
        return BvhNode::Leaf {
            bbox,
            start: offset,
            end: offset + indices.len(),
        };
    }

    // Split on the longest axis of the centroid spread, not of the node box
    let spread = Aabb::from_points(indices.iter().map(|&i| &input.centroids[i as usize]));
    let axis = spread.longest_axis();
    let mid = indices.len() / 2;
    indices.select_nth_unstable_by(mid, |&a, &b| {
        input.centroids[a as usize][axis].total_cmp(&input.centroids[b as usize][axis])
    });

    let len = indices.len();
    let (lo, hi) = indices.split_at_mut(mid);
    let (left, right) = if len >= parallel_threshold {
        rayon::join(
            || build_range(input, lo, offset, max_leaf_size, parallel_threshold),
            || build_range(input, hi, offset + mid, max_leaf_size, parallel_threshold),
        )
    } else {
        (
            build_range(input, lo, offset, max_leaf_size, parallel_threshold),
            build_range(input, hi, offset + mid, max_leaf_size, parallel_threshold),
        )
    };

    BvhNode::Internal {
        bbox,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Statistics about BVH structure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BvhStats {
    /// Number of internal (branch) nodes.
    pub internal_count: usize,
    /// Number of leaf nodes.
    pub leaf_count: usize,
    /// Maximum depth of the tree.
    pub max_depth: usize,
    /// Maximum number of triangles in any leaf.
    pub max_leaf_size: usize,
    /// Total triangles stored across all leaves.
    pub total_triangles_in_leaves: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_types::unit_cube;

    /// A strip of `n` unit quads along X, two triangles each.
    fn strip(n: u32) -> TriangleMesh {
        let mut vertices = Vec::new();
        for i in 0..=n {
            vertices.push(Point3::new(f64::from(i), 0.0, 0.0));
            vertices.push(Point3::new(f64::from(i), 1.0, 0.0));
        }
        let mut faces = Vec::new();
        for i in 0..n {
            let a = 2 * i;
            faces.push([a, a + 2, a + 3]);
            faces.push([a, a + 3, a + 1]);
        }
        TriangleMesh::new(vertices, faces).unwrap()
    }

    fn check_nesting(node: &BvhNode, bvh: &Bvh) {
        match node {
            BvhNode::Leaf { bbox, start, end } => {
                assert!(start < end);
                for &f in &bvh.face_order()[*start..*end] {
                    assert!(bbox.contains_aabb(&bvh.triangles[f as usize].bounds()));
                }
            }
            BvhNode::Internal { bbox, left, right } => {
                assert!(bbox.contains_aabb(left.bbox()));
                assert!(bbox.contains_aabb(right.bbox()));
                check_nesting(left, bvh);
                check_nesting(right, bvh);
            }
        }
    }

    #[test]
    fn single_triangle_is_one_leaf() {
        let mesh = TriangleMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let stats = Bvh::build(&mesh, 8).stats();
        assert_eq!(stats.leaf_count, 1);
        assert_eq!(stats.internal_count, 0);
        assert_eq!(stats.total_triangles_in_leaves, 1);
    }

    #[test]
    fn leaves_cover_every_face_once() {
        let mesh = strip(37);
        let bvh = Bvh::build(&mesh, 3);
        let stats = bvh.stats();
        assert_eq!(stats.total_triangles_in_leaves, mesh.face_count());
        assert!(stats.max_leaf_size <= 3);

        let mut order = bvh.face_order().to_vec();
        order.sort_unstable();
        let expected: Vec<u32> = (0..mesh.face_count() as u32).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn child_boxes_nest_in_parents() {
        let bvh = Bvh::build(&strip(20), 2);
        check_nesting(bvh.root(), &bvh);
        assert_eq!(*bvh.root_bounds(), strip(20).bounds());
    }

    #[test]
    fn zero_leaf_size_is_clamped() {
        let stats = Bvh::build(&unit_cube(), 0).stats();
        assert_eq!(stats.max_leaf_size, 1);
        assert_eq!(stats.leaf_count, 12);
    }

    #[test]
    fn parallel_build_matches_sequential() {
        let mesh = strip(64);
        let sequential = Bvh::build(&mesh, 4);
        let parallel = Bvh::build_parallel(&mesh, 4, 8);
        assert_eq!(sequential.stats(), parallel.stats());
        assert_eq!(sequential.face_order(), parallel.face_order());
    }

    #[test]
    fn nearest_on_cube_from_outside() {
        let bvh = Bvh::build(&unit_cube(), 1);
        let hit = bvh.query_nearest(Point3::new(3.0, 0.5, 0.5));
        assert_relative_eq!(hit.distance, 2.0, epsilon = 1e-12);
        assert_relative_eq!(hit.point.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn non_finite_point_gives_nan_distance() {
        let bvh = Bvh::build(&unit_cube(), 4);
        let hit = bvh.query_nearest(Point3::new(f64::NAN, 0.0, 0.0));
        assert!(hit.distance.is_nan());
        assert!(hit.face < 12);
    }
}
