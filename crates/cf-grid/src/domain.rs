//! Grid geometry: the bounding box, its cells and the global node lattice.
//!
//! # Cell indexing
//!
//! Cell `(i, j, k)` has flat index `i + nx * (j + ny * k)`.
//!
//! # Node numbering
//!
//! Every node of every cell has one global id, so nodes shared between
//! neighbouring cells are stored and sampled once:
//!
//! | Range | Nodes | Id |
//! |---|---|---|
//! | vertices | `(nx+1)(ny+1)(nz+1)` | `i + (nx+1)(j + (ny+1)k)` |
//! | x-edges | `2 nx(ny+1)(nz+1)` | `2(i + nx(j + (ny+1)k)) + s` |
//! | y-edges | `2 (nx+1)ny(nz+1)` | `2(i + (nx+1)(j + ny k)) + s` |
//! | z-edges | `2 (nx+1)(ny+1)nz` | `2(i + (nx+1)(j + (ny+1)k)) + s` |
//!
//! Edge ids are offset by the sizes of the preceding ranges. Edge node `s`
//! sits at `(1 + s) / 3` of the way along its edge.

use nalgebra::{Point3, Vector3};

use crate::error::{GridError, GridResult};
use crate::lagrange::NODE_COUNT;

/// Axis-aligned box split into `nx * ny * nz` congruent cells.
///
/// # Example
///
/// ```
/// use cf_grid::GridDomain;
/// use nalgebra::Point3;
///
/// let domain = GridDomain::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(2.0, 1.0, 1.0),
///     [4, 2, 2],
/// )
/// .unwrap();
///
/// assert_eq!(domain.n_cells(), 16);
/// assert_eq!(domain.cell_size().x, 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "DomainParts", into = "DomainParts")
)]
pub struct GridDomain {
    min: Point3<f64>,
    max: Point3<f64>,
    resolution: [u32; 3],
}

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct DomainParts {
    min: Point3<f64>,
    max: Point3<f64>,
    resolution: [u32; 3],
}

#[cfg(feature = "serde")]
impl TryFrom<DomainParts> for GridDomain {
    type Error = GridError;

    fn try_from(parts: DomainParts) -> GridResult<Self> {
        Self::new(parts.min, parts.max, parts.resolution)
    }
}

#[cfg(feature = "serde")]
impl From<GridDomain> for DomainParts {
    fn from(domain: GridDomain) -> Self {
        Self {
            min: domain.min,
            max: domain.max,
            resolution: domain.resolution,
        }
    }
}

impl GridDomain {
    /// Create a domain from a box and a per-axis cell count.
    ///
    /// # Errors
    ///
    /// - [`GridError::InvalidResolution`] if any axis has zero cells
    /// - [`GridError::InvalidDomain`] if a bound is not finite or `min >= max`
    ///   on some axis
    /// - [`GridError::TooManyNodes`] if the node lattice does not fit in `u32`
    pub fn new(min: Point3<f64>, max: Point3<f64>, resolution: [u32; 3]) -> GridResult<Self> {
        if resolution.contains(&0) {
            return Err(GridError::InvalidResolution(resolution));
        }
        for axis in 0..3 {
            if !min[axis].is_finite() || !max[axis].is_finite() {
                return Err(GridError::InvalidDomain(format!(
                    "non-finite bounds {min:?} .. {max:?}"
                )));
            }
            if min[axis] >= max[axis] {
                return Err(GridError::InvalidDomain(format!(
                    "empty extent on axis {axis}: {} .. {}",
                    min[axis], max[axis]
                )));
            }
        }

        let count = node_count(resolution);
        let max_nodes = u64::from(u32::MAX);
        if count > max_nodes {
            return Err(GridError::TooManyNodes {
                count,
                max: max_nodes,
            });
        }

        Ok(Self {
            min,
            max,
            resolution,
        })
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> Point3<f64> {
        self.min
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> Point3<f64> {
        self.max
    }

    /// Cells per axis.
    #[must_use]
    pub fn resolution(&self) -> [u32; 3] {
        self.resolution
    }

    /// Edge lengths of one cell.
    #[must_use]
    pub fn cell_size(&self) -> Vector3<f64> {
        let [nx, ny, nz] = self.resolution;
        (self.max - self.min).component_div(&Vector3::new(
            f64::from(nx),
            f64::from(ny),
            f64::from(nz),
        ))
    }

    /// Diagonal of the reference-to-world Jacobian, `d(local)/d(world)`.
    ///
    /// Local coordinates span `[-1, 1]` over a cell, so this is `2 / h`.
    #[must_use]
    pub fn jacobian(&self) -> Vector3<f64> {
        self.cell_size().map(|h| 2.0 / h)
    }

    /// Total number of cells.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        let [nx, ny, nz] = self.resolution;
        nx as usize * ny as usize * nz as usize
    }

    /// Total number of distinct nodes in the lattice.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        // Bounded by u32::MAX at construction
        node_count(self.resolution) as usize
    }

    /// Check if a point lies in the closed box.
    #[must_use]
    pub fn contains(&self, x: &Point3<f64>) -> bool {
        (0..3).all(|a| x[a] >= self.min[a] && x[a] <= self.max[a])
    }

    /// Flat index of cell `(i, j, k)`.
    #[must_use]
    pub fn cell_index(&self, [i, j, k]: [u32; 3]) -> usize {
        let [nx, ny, _] = self.resolution;
        i as usize + nx as usize * (j as usize + ny as usize * k as usize)
    }

    /// `(i, j, k)` of a flat cell index.
    #[must_use]
    pub fn cell_coords(&self, cell: usize) -> [u32; 3] {
        let nx = self.resolution[0] as usize;
        let ny = self.resolution[1] as usize;
        // Each component is below its resolution, which is a u32
        [
            (cell % nx) as u32,
            ((cell / nx) % ny) as u32,
            (cell / (nx * ny)) as u32,
        ]
    }

    /// Minimum corner of a cell.
    #[must_use]
    pub fn cell_min(&self, cell: usize) -> Point3<f64> {
        let [i, j, k] = self.cell_coords(cell);
        self.lattice_point(
            f64::from(i),
            f64::from(j),
            f64::from(k),
        )
    }

    /// Center of a cell, where sampling predicates are evaluated.
    #[must_use]
    pub fn cell_center(&self, cell: usize) -> Point3<f64> {
        let [i, j, k] = self.cell_coords(cell);
        self.lattice_point(
            f64::from(i) + 0.5,
            f64::from(j) + 0.5,
            f64::from(k) + 0.5,
        )
    }

    /// World point at fractional lattice coordinates.
    fn lattice_point(&self, fi: f64, fj: f64, fk: f64) -> Point3<f64> {
        self.min + self.cell_size().component_mul(&Vector3::new(fi, fj, fk))
    }

    /// Find the cell containing `x` and the local coordinate inside it.
    ///
    /// Constant time. Points on an interior cell face belong to the cell on
    /// the positive side; points on the upper boundary of the box belong to
    /// the last cell. Returns `None` outside the closed box.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_grid::GridDomain;
    /// use nalgebra::Point3;
    ///
    /// let domain = GridDomain::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0), [2, 2, 2]).unwrap();
    ///
    /// let (cell, local) = domain.locate(&Point3::new(0.75, 0.25, 0.25)).unwrap();
    /// assert_eq!(cell, 1);
    /// assert!((local.x - 0.0).abs() < 1e-12);
    /// assert!(domain.locate(&Point3::new(1.5, 0.5, 0.5)).is_none());
    /// ```
    #[must_use]
    pub fn locate(&self, x: &Point3<f64>) -> Option<(usize, Vector3<f64>)> {
        if !self.contains(x) {
            return None;
        }

        let h = self.cell_size();
        let mut ijk = [0_u32; 3];
        let mut local = Vector3::zeros();
        for a in 0..3 {
            let t = (x[a] - self.min[a]) / h[a];
            let n = self.resolution[a];
            // t is in [0, n] here, so the truncating cast is exact after floor
            let idx = (t.floor() as u32).min(n - 1);
            ijk[a] = idx;
            local[a] = (2.0 * (t - f64::from(idx)) - 1.0).clamp(-1.0, 1.0);
        }

        Some((self.cell_index(ijk), local))
    }

    /// Global node ids of a cell in canonical element order.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_grid::GridDomain;
    /// use nalgebra::Point3;
    ///
    /// let domain = GridDomain::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0), [1, 1, 1]).unwrap();
    /// let nodes = domain.cell_nodes(0);
    /// assert_eq!(&nodes[..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
    /// assert_eq!(domain.n_nodes(), 32);
    /// ```
    #[must_use]
    pub fn cell_nodes(&self, cell: usize) -> [u32; NODE_COUNT] {
        let [i, j, k] = self.cell_coords(cell);
        let mut nodes = [0_u32; NODE_COUNT];

        for (c, node) in nodes.iter_mut().take(8).enumerate() {
            let (a, b, d) = bits(c);
            *node = self.vertex_id(i + a, j + b, k + d);
        }
        for e in 0..4 {
            let (lo, hi, _) = bits(e);
            let x_edge = self.x_edge_id(i, j + lo, k + hi);
            let y_edge = self.y_edge_id(i + lo, j, k + hi);
            let z_edge = self.z_edge_id(i + lo, j + hi, k);
            for s in 0..2 {
                nodes[8 + 2 * e + s] = x_edge + s as u32;
                nodes[16 + 2 * e + s] = y_edge + s as u32;
                nodes[24 + 2 * e + s] = z_edge + s as u32;
            }
        }

        nodes
    }

    /// World position of a global node.
    ///
    /// Shared nodes have exactly one position, whichever cell asks.
    #[must_use]
    pub fn node_position(&self, id: u32) -> Point3<f64> {
        let [nx, ny, nz] = self.resolution.map(u64::from);
        let (vx, vy) = (nx + 1, ny + 1);
        let n_vertices = vx * vy * (nz + 1);
        let n_x_edges = nx * vy * (nz + 1);
        let n_y_edges = vx * ny * (nz + 1);

        let mut id = u64::from(id);
        if id < n_vertices {
            let (i, j, k) = unflatten(id, vx, vy);
            return self.lattice_point(i, j, k);
        }
        id -= n_vertices;

        let (axis, dims) = if id < 2 * n_x_edges {
            (0, (nx, vy))
        } else if id < 2 * (n_x_edges + n_y_edges) {
            id -= 2 * n_x_edges;
            (1, (vx, ny))
        } else {
            id -= 2 * (n_x_edges + n_y_edges);
            (2, (vx, vy))
        };

        let s = (id % 2) as f64;
        let (i, j, k) = unflatten(id / 2, dims.0, dims.1);
        let offset = (1.0 + s) / 3.0;
        match axis {
            0 => self.lattice_point(i + offset, j, k),
            1 => self.lattice_point(i, j + offset, k),
            _ => self.lattice_point(i, j, k + offset),
        }
    }

    fn vertex_id(&self, i: u32, j: u32, k: u32) -> u32 {
        let [nx, ny, _] = self.resolution;
        i + (nx + 1) * (j + (ny + 1) * k)
    }

    fn x_edge_id(&self, i: u32, j: u32, k: u32) -> u32 {
        let [nx, ny, _] = self.resolution;
        self.n_vertices() + 2 * (i + nx * (j + (ny + 1) * k))
    }

    fn y_edge_id(&self, i: u32, j: u32, k: u32) -> u32 {
        let [nx, ny, _] = self.resolution;
        self.n_vertices() + 2 * self.n_x_edges() + 2 * (i + (nx + 1) * (j + ny * k))
    }

    fn z_edge_id(&self, i: u32, j: u32, k: u32) -> u32 {
        let [nx, ny, _] = self.resolution;
        self.n_vertices()
            + 2 * (self.n_x_edges() + self.n_y_edges())
            + 2 * (i + (nx + 1) * (j + (ny + 1) * k))
    }

    fn n_vertices(&self) -> u32 {
        let [nx, ny, nz] = self.resolution;
        (nx + 1) * (ny + 1) * (nz + 1)
    }

    fn n_x_edges(&self) -> u32 {
        let [nx, ny, nz] = self.resolution;
        nx * (ny + 1) * (nz + 1)
    }

    fn n_y_edges(&self) -> u32 {
        let [nx, ny, nz] = self.resolution;
        (nx + 1) * ny * (nz + 1)
    }
}

/// Number of distinct lattice nodes for a resolution.
fn node_count(resolution: [u32; 3]) -> u64 {
    let [nx, ny, nz] = resolution.map(u64::from);
    let vertices = (nx + 1) * (ny + 1) * (nz + 1);
    let edges = nx * (ny + 1) * (nz + 1) + (nx + 1) * ny * (nz + 1) + (nx + 1) * (ny + 1) * nz;
    vertices + 2 * edges
}

/// Low three bits of `c` as 0/1 offsets.
const fn bits(c: usize) -> (u32, u32, u32) {
    ((c & 1) as u32, ((c >> 1) & 1) as u32, ((c >> 2) & 1) as u32)
}

/// Split a flat lattice index into fractional `(i, j, k)`.
#[allow(clippy::cast_precision_loss)]
fn unflatten(id: u64, ni: u64, nj: u64) -> (f64, f64, f64) {
    ((id % ni) as f64, ((id / ni) % nj) as f64, (id / (ni * nj)) as f64)
}
