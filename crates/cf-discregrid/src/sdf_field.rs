//! Sampling mesh distance fields onto grids.

use cf_grid::{ContinuousFunction, DiscreteGrid, FieldId, GridDomain, GridResult};
use mesh_sdf::MeshDistance;
use mesh_types::TriangleMesh;
use nalgebra::Point3;
use tracing::debug;

/// Default margin around a mesh, as a fraction of its bounding box diagonal.
pub const DEFAULT_PADDING: f64 = 1e-3;

/// Signed distance to a mesh as a [`ContinuousFunction`].
///
/// Evaluates through [`MeshDistance::signed_distance_cached`], so repeated
/// queries at the same point skip the nearest-triangle search.
///
/// # Example
///
/// ```
/// use cf_discregrid::SignedDistanceFunction;
/// use cf_grid::ContinuousFunction;
/// use mesh_sdf::MeshDistance;
/// use mesh_types::{Point3, unit_cube};
///
/// let md = MeshDistance::new(unit_cube()).unwrap();
/// let sdf = SignedDistanceFunction::new(&md);
/// assert!((sdf.evaluate(&Point3::new(0.5, 0.5, 0.5)) + 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SignedDistanceFunction<'a> {
    oracle: &'a MeshDistance,
}

impl<'a> SignedDistanceFunction<'a> {
    /// Wrap a distance oracle.
    #[must_use]
    pub const fn new(oracle: &'a MeshDistance) -> Self {
        Self { oracle }
    }

    /// The wrapped oracle.
    #[must_use]
    pub const fn oracle(&self) -> &'a MeshDistance {
        self.oracle
    }
}

impl ContinuousFunction for SignedDistanceFunction<'_> {
    fn evaluate(&self, x: &Point3<f64>) -> f64 {
        self.oracle.signed_distance_cached(*x)
    }
}

/// Samples the signed distance of `oracle`'s mesh on every cell of `grid`.
///
/// # Example
///
/// ```
/// use cf_discregrid::{add_sdf, padded_domain};
/// use cf_grid::{CubicLagrangeGrid, DiscreteGrid};
/// use mesh_sdf::MeshDistance;
/// use mesh_types::{Point3, unit_cube};
///
/// let md = MeshDistance::new(unit_cube()).unwrap();
/// let domain = padded_domain(md.mesh(), 0.25, [6, 6, 6]).unwrap();
/// let mut grid = CubicLagrangeGrid::from_domain(domain);
///
/// let field = add_sdf(&mut grid, &md, false);
/// let d = grid.interpolate(field, &Point3::new(0.5, 0.5, 0.9)).unwrap();
/// assert!((d + 0.1).abs() < 1e-2);
/// ```
pub fn add_sdf<G>(grid: &mut G, oracle: &MeshDistance, verbose: bool) -> FieldId
where
    G: DiscreteGrid + ?Sized,
{
    grid.add_function(&SignedDistanceFunction::new(oracle), verbose, None)
}

/// Domain enclosing `mesh` with a margin of `padding` times its bounding box
/// diagonal on every side.
///
/// Use [`DEFAULT_PADDING`] for a box that just encloses the surface.
///
/// # Errors
///
/// Returns a grid error if `resolution` has a zero component, the padded box
/// is empty on some axis (a single point, or `padding <= 0` on a flat mesh)
/// or the lattice is too large.
pub fn padded_domain(
    mesh: &TriangleMesh,
    padding: f64,
    resolution: [u32; 3],
) -> GridResult<GridDomain> {
    let bounds = mesh.bounds();
    let margin = padding * bounds.diagonal();
    let padded = bounds.expanded(margin);

    debug!(
        diagonal = bounds.diagonal(),
        margin,
        ?resolution,
        "Padded mesh domain"
    );
    GridDomain::new(padded.min, padded.max, resolution)
}
