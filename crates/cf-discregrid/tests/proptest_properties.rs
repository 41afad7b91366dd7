//! Property-based tests across the oracle and the grid.
//!
//! Run with: cargo test -p cf-discregrid --test proptest_properties

#![allow(clippy::unwrap_used)]

use cf_discregrid::grid::lagrange::{shape_function_gradients, shape_functions};
use cf_discregrid::prelude::*;
use cf_discregrid::sdf::{brute_force_nearest, point_in_mesh};
use cf_discregrid::types::uv_sphere;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_point(extent: f64) -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-extent..extent).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

fn arb_local() -> impl Strategy<Value = Vector3<f64>> {
    prop::array::uniform3(-1.0..=1.0f64).prop_map(|[x, y, z]| Vector3::new(x, y, z))
}

/// A closed, slightly irregular mesh: an octahedron with its vertices
/// pulled along their axes.
fn octahedron(stretch: [f64; 3]) -> TriangleMesh {
    let [a, b, c] = stretch;
    let vertices = vec![
        Point3::new(a, 0.0, 0.0),
        Point3::new(-a, 0.0, 0.0),
        Point3::new(0.0, b, 0.0),
        Point3::new(0.0, -b, 0.0),
        Point3::new(0.0, 0.0, c),
        Point3::new(0.0, 0.0, -c),
    ];
    let faces = vec![
        [0, 2, 4],
        [2, 1, 4],
        [1, 3, 4],
        [3, 0, 4],
        [2, 0, 5],
        [1, 2, 5],
        [3, 1, 5],
        [0, 3, 5],
    ];
    TriangleMesh::new(vertices, faces).unwrap()
}

// =============================================================================
// Element
// =============================================================================

proptest! {
    #[test]
    fn shape_functions_partition_unity(xi in arb_local()) {
        let n = shape_functions(&xi);
        prop_assert!((n.sum() - 1.0).abs() < 1e-12);
        let dn = shape_function_gradients(&xi);
        for d in 0..3 {
            prop_assert!(dn.column(d).sum().abs() < 1e-11);
        }
    }
}

// =============================================================================
// Oracle
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sign_agrees_with_ray_parity(
        stretch in prop::array::uniform3(0.5..2.0f64),
        p in arb_point(2.5),
    ) {
        let mesh = octahedron(stretch);
        let md = MeshDistance::new(mesh.clone()).unwrap();
        let d = md.signed_distance(p);
        prop_assume!(d.abs() > 1e-6);
        prop_assert_eq!(d < 0.0, point_in_mesh(p, &mesh));
    }

    #[test]
    fn bvh_matches_brute_force(
        stretch in prop::array::uniform3(0.5..2.0f64),
        p in arb_point(3.0),
    ) {
        let mesh = octahedron(stretch);
        let md = MeshDistance::with_config(mesh.clone(), SdfConfig::default().with_bvh_leaf_size(1))
            .unwrap();
        let expected = brute_force_nearest(p, &mesh).distance;
        prop_assert!((md.distance(p).distance - expected).abs() < 1e-12);
    }

    #[test]
    fn cached_equals_uncached(points in prop::collection::vec(arb_point(2.0), 1..20)) {
        let md = MeshDistance::new(octahedron([1.0, 1.5, 0.8])).unwrap();
        for p in &points {
            let uncached = md.signed_distance(*p);
            prop_assert_eq!(md.signed_distance_cached(*p), uncached);
            prop_assert_eq!(md.signed_distance_cached(*p), uncached);
        }
    }

    #[test]
    fn batch_equals_scalar(points in prop::collection::vec(arb_point(2.0), 0..64)) {
        let md = MeshDistance::with_config(
            octahedron([1.2, 0.9, 1.1]),
            SdfConfig::default().with_parallel_threshold(8),
        )
        .unwrap();
        let signed = md.signed_distances(&points);
        let unsigned = md.unsigned_distances(&points);
        prop_assert_eq!(signed.len(), points.len());
        for (i, p) in points.iter().enumerate() {
            prop_assert_eq!(signed[i], md.signed_distance(*p));
            prop_assert_eq!(unsigned[i], md.unsigned_distance(*p));
        }
    }
}

// =============================================================================
// Grid
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn out_of_domain_is_none(p in arb_point(10.0)) {
        let mut grid = CubicLagrangeGrid::new(
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
            [2, 2, 2],
        )
        .unwrap();
        let id = grid.add_function(&|x: &Point3<f64>| x.x, false, None);
        let inside = p.coords.iter().all(|c| c.abs() <= 1.0);
        prop_assert_eq!(grid.interpolate(id, &p).is_some(), inside);
    }

    #[test]
    fn quadratics_are_exact_anywhere(p in arb_point(1.0), a in -2.0..2.0f64, b in -2.0..2.0f64) {
        let mut grid = CubicLagrangeGrid::new(
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
            [3, 2, 4],
        )
        .unwrap();
        let f = move |x: &Point3<f64>| a * x.x * x.z + b * x.y * x.y - x.z;
        let id = grid.add_function(&f, false, None);
        let (value, gradient) = grid.interpolate_gradient(id, &p).unwrap();
        prop_assert!((value - f(&p)).abs() < 1e-10);
        let expected = Vector3::new(a * p.z, 2.0 * b * p.y, a * p.x - 1.0);
        prop_assert!((gradient - expected).norm() < 1e-9);
    }
}

#[test]
fn sdf_grid_sign_matches_oracle_away_from_surface() {
    let md = MeshDistance::new(uv_sphere(Point3::origin(), 1.0, 16, 32).unwrap()).unwrap();
    let domain = padded_domain(md.mesh(), 0.25, [12, 12, 12]).unwrap();
    let mut grid = CubicLagrangeGrid::from_domain(domain);
    let id = add_sdf(&mut grid, &md, false);

    let mut runner = proptest::test_runner::TestRunner::default();
    runner
        .run(&arb_point(1.4), |p| {
            let exact = md.signed_distance(p);
            prop_assume!(exact.abs() > 0.05);
            let value = grid.interpolate(id, &p).unwrap();
            prop_assert_eq!(value < 0.0, exact < 0.0);
            Ok(())
        })
        .unwrap();
}
