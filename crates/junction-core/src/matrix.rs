//! Sparse MNA matrix arena with stable entry handles.
//!
//! Devices resolve the positions they stamp once per topology change and keep
//! the returned [`MatrixEntry`] handles. Every entry owns a real and an
//! imaginary slot so the same structure serves DC, AC and pole-zero loads.
//!
//! Entries touching the ground row or column resolve to [`MatrixEntry::Trash`];
//! writes to it are discarded.

use indexmap::IndexMap;
use log::debug;
use nalgebra::DMatrix;
use num_complex::Complex;

use crate::error::{Error, Result};
use crate::node::NodeId;

/// Handle to one structural nonzero of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixEntry {
    /// Position in a ground row or column.
    #[default]
    Trash,
    /// Slot `index`, valid while the matrix generation equals `generation`.
    Element { index: u32, generation: u32 },
}

/// Sparse matrix storage addressed by (row node, column node).
#[derive(Debug, Clone, Default)]
pub struct SparseMatrix {
    lookup: IndexMap<(NodeId, NodeId), u32>,
    real: Vec<f64>,
    imag: Vec<f64>,
    generation: u32,
}

impl SparseMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the entry at (row, col).
    pub fn entry(&mut self, row: NodeId, col: NodeId) -> MatrixEntry {
        if row.is_ground() || col.is_ground() {
            return MatrixEntry::Trash;
        }
        let next = self.real.len() as u32;
        let index = *self.lookup.entry((row, col)).or_insert(next);
        if index == next {
            self.real.push(0.0);
            self.imag.push(0.0);
        }
        MatrixEntry::Element {
            index,
            generation: self.generation,
        }
    }

    /// Find an existing entry without creating it.
    pub fn find(&self, row: NodeId, col: NodeId) -> Option<MatrixEntry> {
        if row.is_ground() || col.is_ground() {
            return Some(MatrixEntry::Trash);
        }
        self.lookup
            .get(&(row, col))
            .map(|&index| MatrixEntry::Element {
                index,
                generation: self.generation,
            })
    }

    /// Number of structural nonzeros.
    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    /// Current storage generation. Bumped by [`SparseMatrix::reallocate`].
    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn slot(&self, entry: MatrixEntry) -> Result<Option<usize>> {
        match entry {
            MatrixEntry::Trash => Ok(None),
            MatrixEntry::Element { index, generation } => {
                if generation != self.generation {
                    return Err(Error::StaleMatrixEntry {
                        entry: generation,
                        matrix: self.generation,
                    });
                }
                Ok(Some(index as usize))
            }
        }
    }

    /// Add to the real part of an entry, reporting stale handles.
    pub fn try_add(&mut self, entry: MatrixEntry, value: f64) -> Result<()> {
        if let Some(i) = self.slot(entry)? {
            self.real[i] += value;
        }
        Ok(())
    }

    /// Add to the real part of an entry.
    pub fn add(&mut self, entry: MatrixEntry, value: f64) {
        debug_assert!(self.slot(entry).is_ok(), "stale matrix entry {entry:?}");
        if let Ok(Some(i)) = self.slot(entry) {
            self.real[i] += value;
        }
    }

    /// Add a complex value to an entry, reporting stale handles.
    pub fn try_add_complex(&mut self, entry: MatrixEntry, value: Complex<f64>) -> Result<()> {
        if let Some(i) = self.slot(entry)? {
            self.real[i] += value.re;
            self.imag[i] += value.im;
        }
        Ok(())
    }

    /// Real value at (row, col), zero when structurally absent.
    pub fn value(&self, row: NodeId, col: NodeId) -> f64 {
        self.complex_value(row, col).re
    }

    /// Complex value at (row, col), zero when structurally absent.
    pub fn complex_value(&self, row: NodeId, col: NodeId) -> Complex<f64> {
        self.lookup
            .get(&(row, col))
            .map(|&i| Complex::new(self.real[i as usize], self.imag[i as usize]))
            .unwrap_or_default()
    }

    /// Zero every value, keeping the structure.
    pub fn clear(&mut self) {
        self.real.fill(0.0);
        self.imag.fill(0.0);
    }

    /// Rebuild storage in row-major order.
    ///
    /// Values are preserved but every handle issued before the call becomes
    /// stale until its owner resolves it again.
    pub fn reallocate(&mut self) {
        let mut keys: Vec<_> = self.lookup.iter().map(|(&k, &i)| (k, i)).collect();
        keys.sort_unstable_by_key(|&(k, _)| k);

        let mut real = Vec::with_capacity(keys.len());
        let mut imag = Vec::with_capacity(keys.len());
        let mut lookup = IndexMap::with_capacity(keys.len());
        for (new_index, (key, old)) in keys.into_iter().enumerate() {
            real.push(self.real[old as usize]);
            imag.push(self.imag[old as usize]);
            lookup.insert(key, new_index as u32);
        }

        self.lookup = lookup;
        self.real = real;
        self.imag = imag;
        self.generation += 1;
        debug!(
            "matrix reallocated: {} entries, generation {}",
            self.len(),
            self.generation
        );
    }

    /// Dense copy of the real part, ground row/column dropped.
    ///
    /// `size` is the solution vector length including the ground slot.
    pub fn to_dense(&self, size: usize) -> DMatrix<f64> {
        let n = size.saturating_sub(1);
        let mut dense = DMatrix::zeros(n, n);
        for (&(row, col), &i) in &self.lookup {
            if row.index() <= n && col.index() <= n {
                dense[(row.index() - 1, col.index() - 1)] = self.real[i as usize];
            }
        }
        dense
    }

    /// Dense copy of the complex matrix, ground row/column dropped.
    pub fn to_dense_complex(&self, size: usize) -> DMatrix<Complex<f64>> {
        let n = size.saturating_sub(1);
        let mut dense = DMatrix::from_element(n, n, Complex::new(0.0, 0.0));
        for (&(row, col), &i) in &self.lookup {
            if row.index() <= n && col.index() <= n {
                dense[(row.index() - 1, col.index() - 1)] =
                    Complex::new(self.real[i as usize], self.imag[i as usize]);
            }
        }
        dense
    }
}
