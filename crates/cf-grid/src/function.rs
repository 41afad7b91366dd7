//! Callable abstractions sampled by the grid.
//!
//! Any `Fn(&Point3<f64>) -> f64 + Sync` closure is a [`ContinuousFunction`]
//! and any `Fn(&Point3<f64>) -> bool + Sync` closure is a
//! [`SamplePredicate`]. Types that carry state, like a mesh distance oracle,
//! implement the traits directly.

use nalgebra::Point3;

/// A scalar function over 3D space.
///
/// Implementations must be `Sync`: nodes are sampled in parallel.
///
/// # Example
///
/// ```
/// use cf_grid::ContinuousFunction;
/// use nalgebra::Point3;
///
/// let sphere = |x: &Point3<f64>| x.coords.norm() - 1.0;
/// assert_eq!(sphere.evaluate(&Point3::new(2.0, 0.0, 0.0)), 1.0);
/// ```
pub trait ContinuousFunction: Sync {
    /// Value at a world-space point.
    fn evaluate(&self, x: &Point3<f64>) -> f64;
}

impl<F> ContinuousFunction for F
where
    F: Fn(&Point3<f64>) -> f64 + Sync,
{
    fn evaluate(&self, x: &Point3<f64>) -> f64 {
        self(x)
    }
}

/// Decides whether a cell is sampled, given the cell center.
pub trait SamplePredicate: Sync {
    /// `true` to sample the cell whose center is `x`.
    fn accept(&self, x: &Point3<f64>) -> bool;
}

impl<F> SamplePredicate for F
where
    F: Fn(&Point3<f64>) -> bool + Sync,
{
    fn accept(&self, x: &Point3<f64>) -> bool {
        self(x)
    }
}
