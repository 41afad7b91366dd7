//! The 32-node cubic serendipity hexahedron.
//!
//! Reference cube `[-1, 1]^3`. Nodes are the 8 corners plus two nodes per
//! edge at `±1/3` along it, ordered as:
//!
//! - `0..8`: corners, index `a + 2b + 4c` for `(x, y, z) = (±1, ±1, ±1)`,
//!   bit set meaning `+1`
//! - `8..16`: x-edges, edge `e = b + 2c`, nodes `8 + 2e + s` at `x = ∓1/3`
//! - `16..24`: y-edges, edge `e = a + 2c`, nodes `16 + 2e + s` at `y = ∓1/3`
//! - `24..32`: z-edges, edge `e = a + 2b`, nodes `24 + 2e + s` at `z = ∓1/3`
//!
//! Corner shape functions are
//! `1/64 (1 + x xi)(1 + y yi)(1 + z zi)(9(x² + y² + z²) - 19)`; an edge node
//! along axis `a` with transverse axes `b`, `c` has
//! `9/64 (1 - a²)(1 + 9 a ai)(1 + b bi)(1 + c ci)`.

use nalgebra::{SMatrix, SVector, Vector3};

/// Nodes per element.
pub const NODE_COUNT: usize = 32;

/// Shape function values at one local coordinate.
pub type ShapeValues = SVector<f64, NODE_COUNT>;

/// Shape function gradients with respect to the local coordinate, one row per node.
pub type ShapeGradients = SMatrix<f64, NODE_COUNT, 3>;

const T: f64 = 1.0 / 3.0;

/// Reference coordinates of the nodes in canonical order.
pub const NODES: [[f64; 3]; NODE_COUNT] = [
    // Corners
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    // x-edges
    [-T, -1.0, -1.0],
    [T, -1.0, -1.0],
    [-T, 1.0, -1.0],
    [T, 1.0, -1.0],
    [-T, -1.0, 1.0],
    [T, -1.0, 1.0],
    [-T, 1.0, 1.0],
    [T, 1.0, 1.0],
    // y-edges
    [-1.0, -T, -1.0],
    [-1.0, T, -1.0],
    [1.0, -T, -1.0],
    [1.0, T, -1.0],
    [-1.0, -T, 1.0],
    [-1.0, T, 1.0],
    [1.0, -T, 1.0],
    [1.0, T, 1.0],
    // z-edges
    [-1.0, -1.0, -T],
    [-1.0, -1.0, T],
    [1.0, -1.0, -T],
    [1.0, -1.0, T],
    [-1.0, 1.0, -T],
    [-1.0, 1.0, T],
    [1.0, 1.0, -T],
    [1.0, 1.0, T],
];

/// Reference coordinate of node `i` as a vector.
///
/// # Panics
///
/// Panics if `i >= 32`.
#[must_use]
pub fn node_local(i: usize) -> Vector3<f64> {
    Vector3::from(NODES[i])
}

/// Shape function values at a local coordinate.
///
/// # Example
///
/// ```
/// use cf_grid::lagrange::{node_local, shape_functions};
///
/// let n = shape_functions(&node_local(11));
/// assert!((n[11] - 1.0).abs() < 1e-12);
/// assert!((n.sum() - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn shape_functions(xi: &Vector3<f64>) -> ShapeValues {
    let r2 = xi.norm_squared();
    ShapeValues::from_fn(|i, _| {
        let node = &NODES[i];
        if i < 8 {
            let [fx, fy, fz] = corner_factors(xi, node);
            fx * fy * fz * (9.0 * r2 - 19.0) / 64.0
        } else {
            let (a, b, c) = edge_axes(i);
            let (p, q, r) = (xi[a], xi[b], xi[c]);
            9.0 / 64.0
                * (1.0 - p * p)
                * (1.0 + 9.0 * p * node[a])
                * (1.0 + q * node[b])
                * (1.0 + r * node[c])
        }
    })
}

/// Shape function gradients with respect to the local coordinate.
#[must_use]
pub fn shape_function_gradients(xi: &Vector3<f64>) -> ShapeGradients {
    let r2 = xi.norm_squared();
    let mut dn = ShapeGradients::zeros();

    for (i, node) in NODES.iter().enumerate() {
        if i < 8 {
            let f = corner_factors(xi, node);
            let g = 9.0 * r2 - 19.0;
            for d in 0..3 {
                let (o1, o2) = ((d + 1) % 3, (d + 2) % 3);
                dn[(i, d)] =
                    (node[d] * f[o1] * f[o2] * g + f[0] * f[1] * f[2] * 18.0 * xi[d]) / 64.0;
            }
        } else {
            let (a, b, c) = edge_axes(i);
            let (p, q, r) = (xi[a], xi[b], xi[c]);
            let along = (1.0 - p * p) * (1.0 + 9.0 * p * node[a]);
            let d_along = -2.0 * p * (1.0 + 9.0 * p * node[a]) + 9.0 * node[a] * (1.0 - p * p);
            let fb = 1.0 + q * node[b];
            let fc = 1.0 + r * node[c];

            dn[(i, a)] = 9.0 / 64.0 * d_along * fb * fc;
            dn[(i, b)] = 9.0 / 64.0 * along * node[b] * fc;
            dn[(i, c)] = 9.0 / 64.0 * along * fb * node[c];
        }
    }

    dn
}

/// Values and gradients in one call.
#[must_use]
pub fn shape_functions_with_gradients(xi: &Vector3<f64>) -> (ShapeValues, ShapeGradients) {
    (shape_functions(xi), shape_function_gradients(xi))
}

/// `(1 + x xi)`, `(1 + y yi)`, `(1 + z zi)` for a corner node.
fn corner_factors(xi: &Vector3<f64>, node: &[f64; 3]) -> [f64; 3] {
    [
        1.0 + xi[0] * node[0],
        1.0 + xi[1] * node[1],
        1.0 + xi[2] * node[2],
    ]
}

/// Edge axis and the two transverse axes of edge node `i`.
const fn edge_axes(i: usize) -> (usize, usize, usize) {
    match (i - 8) / 8 {
        0 => (0, 1, 2),
        1 => (1, 0, 2),
        _ => (2, 0, 1),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn kronecker_property_at_nodes() {
        for i in 0..NODE_COUNT {
            let n = shape_functions(&node_local(i));
            for j in 0..NODE_COUNT {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(n[j], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn nodes_are_distinct() {
        for i in 0..NODE_COUNT {
            for j in (i + 1)..NODE_COUNT {
                assert!((node_local(i) - node_local(j)).norm() > 0.1, "{i} and {j} coincide");
            }
        }
    }

    #[test]
    fn edge_ordering_matches_layout() {
        // x-edge 3 is (y, z) = (+1, +1); its second node is at x = +1/3
        assert_eq!(NODES[8 + 2 * 3 + 1], [T, 1.0, 1.0]);
        // y-edge 1 is (x, z) = (+1, -1)
        assert_eq!(NODES[16 + 2], [1.0, -T, -1.0]);
        // z-edge 2 is (x, y) = (-1, +1)
        assert_eq!(NODES[24 + 4], [-1.0, 1.0, -T]);
    }

    /// Central differences of the values agree with the analytic gradients.
    #[test]
    fn gradients_match_finite_differences() {
        let xi = Vector3::new(0.31, -0.47, 0.12);
        let dn = shape_function_gradients(&xi);
        let h = 1e-6;
        for d in 0..3 {
            let mut step = Vector3::zeros();
            step[d] = h;
            let fd = (shape_functions(&(xi + step)) - shape_functions(&(xi - step))) / (2.0 * h);
            for i in 0..NODE_COUNT {
                assert_relative_eq!(dn[(i, d)], fd[i], epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn with_gradients_matches_separate_calls() {
        let xi = Vector3::new(-0.9, 0.2, 0.6);
        let (n, dn) = shape_functions_with_gradients(&xi);
        assert_eq!(n, shape_functions(&xi));
        assert_eq!(dn, shape_function_gradients(&xi));
    }

    proptest! {
        #[test]
        fn partition_of_unity(x in -1.0f64..=1.0, y in -1.0f64..=1.0, z in -1.0f64..=1.0) {
            let xi = Vector3::new(x, y, z);
            prop_assert!((shape_functions(&xi).sum() - 1.0).abs() < 1e-12);
        }

        #[test]
        fn gradients_sum_to_zero(x in -1.0f64..=1.0, y in -1.0f64..=1.0, z in -1.0f64..=1.0) {
            let dn = shape_function_gradients(&Vector3::new(x, y, z));
            for d in 0..3 {
                prop_assert!(dn.column(d).sum().abs() < 1e-11);
            }
        }

        #[test]
        fn reproduces_quadratics(x in -1.0f64..=1.0, y in -1.0f64..=1.0, z in -1.0f64..=1.0) {
            let f = |p: Vector3<f64>| 0.5 + p.x - 2.0 * p.y * p.z + p.x * p.x + 0.25 * p.z;
            let coeffs = ShapeValues::from_fn(|i, _| f(node_local(i)));
            let xi = Vector3::new(x, y, z);
            let value = shape_functions(&xi).dot(&coeffs);
            prop_assert!((value - f(xi)).abs() < 1e-11);
        }
    }
}
