//! Integration tests for sampling, interpolation and persistence.
//!
//! Run with: cargo test -p cf-grid --test grid_integration

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use approx::assert_relative_eq;
use cf_grid::{
    CubicLagrangeGrid, DiscreteGrid, FieldId, GridDomain, GridError, Point3, SamplePredicate,
    Vector3,
};

// =============================================================================
// Helpers
// =============================================================================

fn grid(res: [u32; 3]) -> CubicLagrangeGrid {
    CubicLagrangeGrid::new(Point3::new(-1.0, -0.5, 0.0), Point3::new(1.0, 0.5, 2.0), res).unwrap()
}

fn wavy(x: &Point3<f64>) -> f64 {
    (2.0 * x.x).sin() * x.y.cos() + x.z.powi(3)
}

// =============================================================================
// Interpolation
// =============================================================================

#[test]
fn interpolation_is_exact_at_every_node() {
    let mut g = grid([3, 2, 4]);
    let id = g.add_function(&wavy, false, None);
    let domain = *g.domain();

    for cell in 0..g.n_cells() {
        let coefficients = g.cell_coefficients(id, cell).unwrap();
        for (i, node) in domain.cell_nodes(cell).into_iter().enumerate() {
            let x = domain.node_position(node);
            assert_eq!(coefficients[i], wavy(&x));
            assert_relative_eq!(g.interpolate(id, &x).unwrap(), wavy(&x), epsilon = 1e-12);
        }
    }
}

#[test]
fn quadratic_is_reproduced_with_gradient() {
    let f = |x: &Point3<f64>| 1.0 + x.x * x.y - 0.5 * x.z * x.z + 3.0 * x.y;
    let df = |x: &Point3<f64>| Vector3::new(x.y, x.x + 3.0, -x.z);

    let mut g = grid([2, 3, 3]);
    let id = g.add_function(&f, false, None);

    for p in [
        Point3::new(-0.9, 0.1, 0.3),
        Point3::new(0.25, -0.49, 1.7),
        Point3::new(0.999, 0.0, 1.0),
    ] {
        let (value, gradient) = g.interpolate_gradient(id, &p).unwrap();
        assert_relative_eq!(value, f(&p), epsilon = 1e-12);
        assert_relative_eq!(gradient, df(&p), epsilon = 1e-10);
    }
}

#[test]
fn smooth_function_converges_under_refinement() {
    let probes = [
        Point3::new(0.123, 0.234, 1.345),
        Point3::new(-0.71, -0.33, 0.52),
        Point3::new(0.45, 0.05, 1.91),
        Point3::new(-0.2, 0.41, 0.13),
    ];
    let max_error = |res: u32| {
        let mut g = grid([res, res, res]);
        let id = g.add_function(&wavy, false, None);
        probes
            .iter()
            .map(|p| (g.interpolate(id, p).unwrap() - wavy(p)).abs())
            .fold(0.0, f64::max)
    };

    let coarse = max_error(2);
    let fine = max_error(8);
    assert!(fine < coarse / 10.0, "coarse {coarse}, fine {fine}");
    assert!(fine < 1e-3);
}

#[test]
fn boundary_points_are_inside() {
    let mut g = grid([2, 2, 2]);
    let id = g.add_function(&|x: &Point3<f64>| x.x + x.y + x.z, false, None);

    let max = Point3::new(1.0, 0.5, 2.0);
    assert_relative_eq!(g.interpolate(id, &max).unwrap(), 3.5, epsilon = 1e-12);
    let min = Point3::new(-1.0, -0.5, 0.0);
    assert_relative_eq!(g.interpolate(id, &min).unwrap(), -1.5, epsilon = 1e-12);
}

#[test]
fn outside_points_yield_none() {
    let mut g = grid([2, 2, 2]);
    let id = g.add_function(&wavy, false, None);

    for p in [
        Point3::new(1.0 + 1e-9, 0.0, 1.0),
        Point3::new(0.0, -0.6, 1.0),
        Point3::new(0.0, 0.0, 2.5),
        Point3::new(f64::NAN, 0.0, 1.0),
        Point3::new(0.0, f64::INFINITY, 1.0),
    ] {
        assert!(g.interpolate(id, &p).is_none(), "{p:?}");
        assert!(g.interpolate_gradient(id, &p).is_none());
        assert!(g.determine_shape_functions(id, &p, true).is_none());
    }
}

#[test]
fn rejecting_predicate_leaves_field_empty() {
    let mut g = grid([3, 3, 3]);
    let reject = |_: &Point3<f64>| false;
    let predicate: &dyn SamplePredicate = &reject;
    let id = g.add_function(&wavy, true, Some(predicate));

    assert_eq!(g.set_cell_count(id), Some(0));
    assert_eq!(g.coefficient_count(id), Some(0));
    for cell in 0..g.n_cells() {
        let center = g.domain().cell_center(cell);
        assert!(g.interpolate(id, &center).is_none());
    }
}

#[test]
fn shape_sample_is_shared_between_fields() {
    let mut g = grid([2, 2, 2]);
    let a = g.add_function(&wavy, false, None);
    let b = g.add_function(&|x: &Point3<f64>| -wavy(x), false, None);

    let p = Point3::new(0.4, 0.2, 0.6);
    let sample = g.determine_shape_functions(a, &p, true).unwrap();
    let va = g.interpolate_sample(a, &sample).unwrap();
    let vb = g.interpolate_sample(b, &sample).unwrap();
    assert_relative_eq!(va, -vb, epsilon = 1e-14);
    assert_relative_eq!(sample.n.sum(), 1.0, epsilon = 1e-12);
    assert_eq!(sample.jacobian, g.domain().jacobian());
}

#[test]
fn unknown_field_is_absent() {
    let g = grid([1, 1, 1]);
    let p = Point3::new(0.0, 0.0, 1.0);
    assert!(g.interpolate(FieldId::new(0), &p).is_none());
    assert!(g.shape_sample(&p, false).is_some());
}

// =============================================================================
// Narrow band reduction
// =============================================================================

#[test]
fn reduce_to_narrow_band() {
    let mut g =
        CubicLagrangeGrid::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0), [8, 8, 8])
            .unwrap();
    let sphere = |x: &Point3<f64>| x.coords.norm() - 0.6;
    let id = g.add_function(&sphere, false, None);
    let before = g.coefficient_count(id).unwrap();

    g.reduce_field(id, |_, value| value.abs() < 0.3).unwrap();

    let after = g.coefficient_count(id).unwrap();
    assert!(after < before);
    assert!(g.set_cell_count(id).unwrap() > 0);

    // Near the surface the band is kept; the center and corners are not
    assert!(g.interpolate(id, &Point3::new(0.61, 0.01, 0.01)).is_some());
    assert!(g.interpolate(id, &Point3::new(0.01, 0.01, 0.01)).is_none());
    assert!(g.interpolate(id, &Point3::new(0.95, 0.95, 0.95)).is_none());

    // Kept values are untouched
    let p = Point3::new(0.0, 0.6, 0.05);
    assert_relative_eq!(g.interpolate(id, &p).unwrap(), sphere(&p), epsilon = 1e-3);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn file_round_trip_is_bit_exact() {
    let mut g = grid([3, 2, 2]);
    g.add_function(&wavy, false, None);
    let lower = |x: &Point3<f64>| x.z < 1.0;
    let predicate: &dyn SamplePredicate = &lower;
    g.add_function(&|x: &Point3<f64>| x.x - x.y, false, Some(predicate));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("field.cfg");
    g.save(&path).unwrap();
    let loaded = CubicLagrangeGrid::load(&path).unwrap();

    assert_eq!(loaded, g);
    assert_eq!(loaded.n_fields(), 2);

    let original_bytes = std::fs::read(&path).unwrap();
    let resaved = dir.path().join("resaved.cfg");
    loaded.save(&resaved).unwrap();
    assert_eq!(std::fs::read(&resaved).unwrap(), original_bytes);

    let p = Point3::new(0.3, 0.1, 0.4);
    for field in 0..2 {
        let id = FieldId::new(field);
        assert_eq!(
            loaded.interpolate(id, &p).map(f64::to_bits),
            g.interpolate(id, &p).map(f64::to_bits)
        );
    }
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = CubicLagrangeGrid::load(dir.path().join("missing.cfg"));
    assert!(matches!(result, Err(GridError::Io(_))));
}

#[test]
fn load_garbage_is_invalid_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.cfg");
    std::fs::write(&path, b"definitely not a grid file").unwrap();
    assert!(matches!(
        CubicLagrangeGrid::load(&path),
        Err(GridError::InvalidFormat(_))
    ));
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn invalid_geometry_is_rejected() {
    let o = Point3::origin();
    let one = Point3::new(1.0, 1.0, 1.0);
    assert!(matches!(
        CubicLagrangeGrid::new(o, one, [0, 1, 1]),
        Err(GridError::InvalidResolution(_))
    ));
    assert!(matches!(
        CubicLagrangeGrid::new(one, o, [1, 1, 1]),
        Err(GridError::InvalidDomain(_))
    ));
    assert!(matches!(
        GridDomain::new(o, one, [2000, 2000, 2000]),
        Err(GridError::TooManyNodes { .. })
    ));
}
