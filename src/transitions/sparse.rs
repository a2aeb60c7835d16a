//! Coordinate-list sparse matrix used for transition probabilities.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{MdpError, Result};

/// Square sparse matrix stored as parallel `(row, col, value)` lists.
///
/// Entries stay in insertion order, which is also the order they are saved
/// in. Duplicate coordinates are allowed and add up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    dim: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    pub fn new(dim: usize) -> Self {
        SparseMatrix {
            dim,
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from parallel lists, checking lengths and bounds.
    pub fn from_triplets(
        dim: usize,
        values: Vec<f64>,
        rows: Vec<usize>,
        cols: Vec<usize>,
    ) -> Result<Self> {
        if values.len() != rows.len() || values.len() != cols.len() {
            return Err(MdpError::dimension_mismatch(
                format!("{} row and column indices", values.len()),
                format!("{} rows, {} columns", rows.len(), cols.len()),
            ));
        }
        if let Some(&idx) = rows.iter().chain(cols.iter()).find(|&&i| i >= dim) {
            return Err(MdpError::dimension_mismatch(
                format!("indices below {}", dim),
                format!("index {}", idx),
            ));
        }
        Ok(SparseMatrix {
            dim,
            rows,
            cols,
            values,
        })
    }

    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.dim && col < self.dim);
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored entries, zeros and duplicates included.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn col_indices(&self) -> &[usize] {
        &self.cols
    }

    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&r, &c), &v)| (r, c, v))
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.entries()
            .filter(|&(r, c, _)| r == row && c == col)
            .map(|(_, _, v)| v)
            .sum()
    }

    pub fn row_sums(&self) -> Array1<f64> {
        let mut sums = Array1::zeros(self.dim);
        for (r, _, v) in self.entries() {
            sums[r] += v;
        }
        sums
    }

    /// Matrix-vector product `self · x`.
    pub fn mul_vec(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        if x.len() != self.dim {
            return Err(MdpError::dimension_mismatch(
                self.dim.to_string(),
                x.len().to_string(),
            ));
        }
        let mut out = Array1::zeros(self.dim);
        for (r, c, v) in self.entries() {
            out[r] += v * x[c];
        }
        Ok(out)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.dim, self.dim));
        for (r, c, v) in self.entries() {
            dense[[r, c]] += v;
        }
        dense
    }
}
