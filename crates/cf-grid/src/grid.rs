//! Cubic Lagrange grids holding any number of sampled fields.

use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::{Point3, SVector, Vector3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::GridDomain;
use crate::error::{GridError, GridResult};
use crate::field::{Field, UNSET};
use crate::function::{ContinuousFunction, SamplePredicate};
use crate::lagrange::{
    NODE_COUNT, ShapeGradients, ShapeValues, shape_function_gradients, shape_functions,
    shape_functions_with_gradients,
};

/// Handle to a field stored on a grid.
///
/// Ids are dense and assigned in order of [`DiscreteGrid::add_function`] calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldId(usize);

impl FieldId {
    /// Field id from its position on the grid.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the field on the grid.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Shape functions evaluated at one point.
///
/// Depends only on the grid geometry, so a sample computed once can be
/// interpolated against every field on the grid that has the cell set.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSample {
    /// Flat index of the containing cell.
    pub cell: usize,
    /// Local coordinate in `[-1, 1]^3`.
    pub local: Vector3<f64>,
    /// The 32 shape function values.
    pub n: ShapeValues,
    /// Gradients with respect to `local`, if requested.
    pub dn: Option<ShapeGradients>,
    /// Diagonal of the reference-to-world derivative, `2 / cell_size`.
    pub jacobian: Vector3<f64>,
}

/// A discretization of scalar fields over a box.
///
/// Interpolation returns `None` for points outside the domain, cells the
/// field does not cover, unknown fields and non-finite coefficients.
pub trait DiscreteGrid {
    /// Geometry of the grid.
    fn domain(&self) -> &GridDomain;

    /// Number of fields added so far.
    fn n_fields(&self) -> usize;

    /// Number of cells.
    fn n_cells(&self) -> usize {
        self.domain().n_cells()
    }

    /// Samples `func` at the nodes of every cell accepted by `predicate`.
    ///
    /// The predicate sees cell centers; a rejected cell is left unset and its
    /// nodes are evaluated only if an accepted cell shares them. `verbose`
    /// reports progress at `info` level instead of `debug`.
    fn add_function(
        &mut self,
        func: &dyn ContinuousFunction,
        verbose: bool,
        predicate: Option<&dyn SamplePredicate>,
    ) -> FieldId;

    /// Locates `x` and evaluates the shape functions there.
    ///
    /// `None` if `x` is outside the domain, `field` is unknown or its cell is
    /// not set for `field`.
    fn determine_shape_functions(
        &self,
        field: FieldId,
        x: &Point3<f64>,
        with_gradients: bool,
    ) -> Option<ShapeSample>;

    /// Dot product of a sample with the field's coefficients.
    fn interpolate_sample(&self, field: FieldId, sample: &ShapeSample) -> Option<f64>;

    /// Value and world-space gradient from a sample.
    ///
    /// Gradients missing from the sample are computed from its local
    /// coordinate.
    fn interpolate_sample_gradient(
        &self,
        field: FieldId,
        sample: &ShapeSample,
    ) -> Option<(f64, Vector3<f64>)>;

    /// Field value at `x`.
    fn interpolate(&self, field: FieldId, x: &Point3<f64>) -> Option<f64> {
        let sample = self.determine_shape_functions(field, x, false)?;
        self.interpolate_sample(field, &sample)
    }

    /// Field value and world-space gradient at `x`.
    fn interpolate_gradient(&self, field: FieldId, x: &Point3<f64>) -> Option<(f64, Vector3<f64>)> {
        let sample = self.determine_shape_functions(field, x, true)?;
        self.interpolate_sample_gradient(field, &sample)
    }
}

/// Regular grid of 32-node cubic serendipity elements.
///
/// # Example
///
/// ```
/// use cf_grid::{CubicLagrangeGrid, DiscreteGrid};
/// use nalgebra::Point3;
///
/// let mut grid = CubicLagrangeGrid::new(
///     Point3::new(-1.0, -1.0, -1.0),
///     Point3::new(1.0, 1.0, 1.0),
///     [4, 4, 4],
/// )
/// .unwrap();
///
/// let f = |x: &Point3<f64>| x.x * x.x - x.y * x.z;
/// let id = grid.add_function(&f, false, None);
///
/// let p = Point3::new(0.3, -0.2, 0.55);
/// let value = grid.interpolate(id, &p).unwrap();
/// assert!((value - f(&p)).abs() < 1e-12);
/// assert!(grid.interpolate(id, &Point3::new(2.0, 0.0, 0.0)).is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CubicLagrangeGrid {
    pub(crate) domain: GridDomain,
    pub(crate) fields: Vec<Field>,
}

impl CubicLagrangeGrid {
    /// Empty grid over `[min, max]` with `resolution` cells per axis.
    ///
    /// # Errors
    ///
    /// Returns an error if the box or resolution is invalid (see
    /// [`GridDomain::new`]).
    pub fn new(min: Point3<f64>, max: Point3<f64>, resolution: [u32; 3]) -> GridResult<Self> {
        Ok(Self::from_domain(GridDomain::new(min, max, resolution)?))
    }

    /// Empty grid over an existing domain.
    #[must_use]
    pub const fn from_domain(domain: GridDomain) -> Self {
        Self {
            domain,
            fields: Vec::new(),
        }
    }

    /// Cells per axis.
    #[must_use]
    pub fn resolution(&self) -> [u32; 3] {
        self.domain.resolution()
    }

    /// Shape functions at `x`, regardless of which fields cover its cell.
    ///
    /// `None` only if `x` is outside the domain.
    #[must_use]
    pub fn shape_sample(&self, x: &Point3<f64>, with_gradients: bool) -> Option<ShapeSample> {
        let (cell, local) = self.domain.locate(x)?;
        let (n, dn) = if with_gradients {
            let (n, dn) = shape_functions_with_gradients(&local);
            (n, Some(dn))
        } else {
            (shape_functions(&local), None)
        };

        Some(ShapeSample {
            cell,
            local,
            n,
            dn,
            jacobian: self.domain.jacobian(),
        })
    }

    /// Coefficients of `field` on `cell` in element order.
    #[must_use]
    pub fn cell_coefficients(&self, field: FieldId, cell: usize) -> Option<SVector<f64, NODE_COUNT>> {
        self.fields.get(field.index())?.coefficients(cell)
    }

    /// Whether `field` covers `cell`.
    #[must_use]
    pub fn is_cell_set(&self, field: FieldId, cell: usize) -> bool {
        self.fields
            .get(field.index())
            .is_some_and(|f| f.is_set(cell))
    }

    /// Number of cells `field` covers, or `None` for an unknown field.
    #[must_use]
    pub fn set_cell_count(&self, field: FieldId) -> Option<usize> {
        self.fields.get(field.index()).map(|f| f.cells.len())
    }

    /// Number of coefficients stored for `field`, or `None` for an unknown field.
    #[must_use]
    pub fn coefficient_count(&self, field: FieldId) -> Option<usize> {
        self.fields.get(field.index()).map(|f| f.nodes.len())
    }

    /// Calls `f` with the flat index and minimum corner of every cell.
    pub fn for_each_cell<F>(&self, mut f: F)
    where
        F: FnMut(usize, Point3<f64>),
    {
        for cell in 0..self.domain.n_cells() {
            f(cell, self.domain.cell_min(cell));
        }
    }

    /// Unsets every cell of `field` that has a node rejected by `keep`.
    ///
    /// `keep` receives the node position and its stored value. Coefficients
    /// no longer referenced by any cell are dropped. Typically used to keep
    /// only a narrow band around the zero level set of a distance field.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::UnknownField`] if `field` does not exist.
    pub fn reduce_field<F>(&mut self, field: FieldId, keep: F) -> GridResult<()>
    where
        F: Fn(&Point3<f64>, f64) -> bool + Sync,
    {
        let domain = self.domain;
        let old = self
            .fields
            .get_mut(field.index())
            .ok_or(GridError::UnknownField(field.index()))?;

        // Stored nodes carry no position; recover their global ids from the cells
        let mut global = vec![UNSET; old.nodes.len()];
        for (cell, &slot) in old.cell_map.iter().enumerate() {
            if slot == UNSET {
                continue;
            }
            for (&local, id) in old.cells[slot as usize].iter().zip(domain.cell_nodes(cell)) {
                global[local as usize] = id;
            }
        }

        let node_kept: Vec<bool> = old
            .nodes
            .par_iter()
            .zip(global.par_iter())
            .map(|(&value, &id)| id != UNSET && keep(&domain.node_position(id), value))
            .collect();

        let mut reduced = Field::empty(old.cell_map.len());
        let mut remap = vec![UNSET; old.nodes.len()];
        for (cell, &slot) in old.cell_map.iter().enumerate() {
            if slot == UNSET {
                continue;
            }
            let indices = &old.cells[slot as usize];
            if !indices.iter().all(|&i| node_kept[i as usize]) {
                continue;
            }

            let mut compact = [0_u32; NODE_COUNT];
            for (dst, &src) in compact.iter_mut().zip(indices) {
                let entry = &mut remap[src as usize];
                if *entry == UNSET {
                    *entry = compact_index(reduced.nodes.len());
                    reduced.nodes.push(old.nodes[src as usize]);
                }
                *dst = *entry;
            }
            reduced.cell_map[cell] = compact_index(reduced.cells.len());
            reduced.cells.push(compact);
        }

        debug!(
            field = field.index(),
            cells_before = old.cells.len(),
            cells_after = reduced.cells.len(),
            nodes_before = old.nodes.len(),
            nodes_after = reduced.nodes.len(),
            "Reduced field"
        );
        *old = reduced;
        Ok(())
    }

    fn field(&self, field: FieldId) -> Option<&Field> {
        self.fields.get(field.index())
    }
}

impl DiscreteGrid for CubicLagrangeGrid {
    fn domain(&self) -> &GridDomain {
        &self.domain
    }

    fn n_fields(&self) -> usize {
        self.fields.len()
    }

    fn add_function(
        &mut self,
        func: &dyn ContinuousFunction,
        verbose: bool,
        predicate: Option<&dyn SamplePredicate>,
    ) -> FieldId {
        let domain = self.domain;
        let n_cells = domain.n_cells();
        let id = FieldId::new(self.fields.len());

        let accepted: Vec<bool> = (0..n_cells)
            .into_par_iter()
            .map(|cell| predicate.is_none_or(|p| p.accept(&domain.cell_center(cell))))
            .collect();

        // Compact numbering of the nodes touched by accepted cells, in first-seen order
        let mut field = Field::empty(n_cells);
        let mut remap = vec![UNSET; domain.n_nodes()];
        let mut global_ids: Vec<u32> = Vec::new();
        for cell in (0..n_cells).filter(|&c| accepted[c]) {
            let mut compact = [0_u32; NODE_COUNT];
            for (dst, node) in compact.iter_mut().zip(domain.cell_nodes(cell)) {
                let entry = &mut remap[node as usize];
                if *entry == UNSET {
                    *entry = compact_index(global_ids.len());
                    global_ids.push(node);
                }
                *dst = *entry;
            }
            field.cell_map[cell] = compact_index(field.cells.len());
            field.cells.push(compact);
        }
        drop(remap);

        let total = global_ids.len();
        info!(
            field = id.index(),
            cells = field.cells.len(),
            rejected_cells = n_cells - field.cells.len(),
            nodes = total,
            "Sampling function"
        );

        let step = (total / 10).max(1);
        let done = AtomicUsize::new(0);
        field.nodes = global_ids
            .par_iter()
            .map(|&node| {
                let value = func.evaluate(&domain.node_position(node));
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if n % step == 0 || n == total {
                    let percent = n * 100 / total;
                    if verbose {
                        info!(done = n, total, percent, "Sampling progress");
                    } else {
                        debug!(done = n, total, percent, "Sampling progress");
                    }
                }
                value
            })
            .collect();

        let non_finite = field.nodes.iter().filter(|v| !v.is_finite()).count();
        if non_finite > 0 {
            warn!(
                field = id.index(),
                non_finite,
                "Sampled function returned non-finite values; affected cells interpolate to None"
            );
        }

        self.fields.push(field);
        info!(field = id.index(), "Field sampled");
        id
    }

    fn determine_shape_functions(
        &self,
        field: FieldId,
        x: &Point3<f64>,
        with_gradients: bool,
    ) -> Option<ShapeSample> {
        let stored = self.field(field)?;
        let (cell, _) = self.domain.locate(x)?;
        if !stored.is_set(cell) {
            return None;
        }
        self.shape_sample(x, with_gradients)
    }

    fn interpolate_sample(&self, field: FieldId, sample: &ShapeSample) -> Option<f64> {
        let c = finite_coefficients(self.field(field)?, sample.cell)?;
        Some(sample.n.dot(&c))
    }

    fn interpolate_sample_gradient(
        &self,
        field: FieldId,
        sample: &ShapeSample,
    ) -> Option<(f64, Vector3<f64>)> {
        let c = finite_coefficients(self.field(field)?, sample.cell)?;
        let dn = sample
            .dn
            .unwrap_or_else(|| shape_function_gradients(&sample.local));

        let value = sample.n.dot(&c);
        let gradient = dn.tr_mul(&c).component_mul(&sample.jacobian);
        Some((value, gradient))
    }
}

fn finite_coefficients(field: &Field, cell: usize) -> Option<SVector<f64, NODE_COUNT>> {
    field
        .coefficients(cell)
        .filter(|c| c.iter().all(|v| v.is_finite()))
}

/// Index into compact storage.
///
/// Bounded by the node count of the domain, which construction keeps within `u32`.
#[allow(clippy::cast_possible_truncation)]
const fn compact_index(len: usize) -> u32 {
    len as u32
}
