//! Cell-level world access handed to pattern strategies.
//!
//! The engine never reads or writes cells itself; it passes a
//! [`WorldCells`] capability through to the active pattern on every step.

use std::collections::BTreeMap;

use crate::id::MaterialId;
use crate::volume::CellPos;

/// Read/write access to single cells. `None` is an empty (air) cell.
pub trait WorldCells {
    fn cell(&self, pos: CellPos) -> Option<MaterialId>;

    /// Write a cell. Returns `false` if the world refused the write (for
    /// example, the position is outside the loaded region).
    fn set_cell(&mut self, pos: CellPos, material: Option<MaterialId>) -> bool;
}

/// An in-memory world that stores only occupied cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseWorld {
    cells: BTreeMap<CellPos, MaterialId>,
    writes: u64,
}

impl SparseWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.len()
    }

    /// Total successful writes since creation.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellPos, &MaterialId)> {
        self.cells.iter()
    }
}

impl WorldCells for SparseWorld {
    fn cell(&self, pos: CellPos) -> Option<MaterialId> {
        self.cells.get(&pos).copied()
    }

    fn set_cell(&mut self, pos: CellPos, material: Option<MaterialId>) -> bool {
        match material {
            Some(m) => {
                self.cells.insert(pos, m);
            }
            None => {
                self.cells.remove(&pos);
            }
        }
        self.writes += 1;
        true
    }
}
