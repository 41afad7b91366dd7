//! Compacted coefficient storage for one sampled field.

use nalgebra::SVector;

use crate::lagrange::NODE_COUNT;

/// Cell map entry for a cell that is not set for the field.
pub(crate) const UNSET: u32 = u32::MAX;

/// Coefficients of one field.
///
/// `nodes` holds one value per sampled global node. `cells[slot]` lists the
/// 32 positions in `nodes` for a set cell, in element order, and
/// `cell_map[cell]` is that cell's slot or [`UNSET`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Field {
    pub(crate) nodes: Vec<f64>,
    pub(crate) cells: Vec<[u32; NODE_COUNT]>,
    pub(crate) cell_map: Vec<u32>,
}

impl Field {
    /// A field with every cell unset.
    pub(crate) fn empty(n_cells: usize) -> Self {
        Self {
            nodes: Vec::new(),
            cells: Vec::new(),
            cell_map: vec![UNSET; n_cells],
        }
    }

    /// Slot of a set cell.
    pub(crate) fn slot(&self, cell: usize) -> Option<usize> {
        match self.cell_map.get(cell) {
            Some(&slot) if slot != UNSET => Some(slot as usize),
            _ => None,
        }
    }

    pub(crate) fn is_set(&self, cell: usize) -> bool {
        self.slot(cell).is_some()
    }

    /// The 32 coefficients of a set cell in element order.
    pub(crate) fn coefficients(&self, cell: usize) -> Option<SVector<f64, NODE_COUNT>> {
        let indices = &self.cells[self.slot(cell)?];
        Some(SVector::from_fn(|i, _| self.nodes[indices[i] as usize]))
    }
}
