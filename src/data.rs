//! Dense covariate storage and index-subset views

use crate::error::{BenchError, Result};

/// Row-major matrix of covariates (n_samples x n_features)
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DataMatrix {
    /// Build a matrix from a flat row-major buffer
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows * cols != data.len() {
            return Err(BenchError::Dataset(format!(
                "buffer of length {} does not match shape {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a matrix from individual rows; all rows must share one width
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(BenchError::Dataset(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Borrow row `i`
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Copy the rows named by `indices`, in that order
    ///
    /// Panics if an index is out of bounds; orderings handed in by the
    /// experiments are always permutations of `0..n_rows`.
    pub fn subset(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }

    /// Apply `f` to every column independently (used by covariate transforms)
    pub fn map_columns<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&[f64]) -> Vec<f64>,
    {
        let mut out = self.data.clone();
        let mut column = Vec::with_capacity(self.rows);
        for c in 0..self.cols {
            column.clear();
            column.extend((0..self.rows).map(|r| self.data[r * self.cols + c]));
            for (r, v) in f(&column).into_iter().enumerate().take(self.rows) {
                out[r * self.cols + c] = v;
            }
        }
        Self {
            rows: self.rows,
            cols: self.cols,
            data: out,
        }
    }
}

/// Covariates paired with one label per row
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub covariates: DataMatrix,
    pub labels: Vec<f64>,
}

impl Dataset {
    pub fn new(covariates: DataMatrix, labels: Vec<f64>) -> Result<Self> {
        if covariates.n_rows() != labels.len() {
            return Err(BenchError::Dataset(format!(
                "{} covariate rows but {} labels",
                covariates.n_rows(),
                labels.len()
            )));
        }
        Ok(Self { covariates, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of classes if every label is a non-negative integer
    pub fn num_classes(&self) -> Option<usize> {
        let mut max = 0usize;
        for &v in &self.labels {
            if v < 0.0 || v.fract() != 0.0 {
                return None;
            }
            max = max.max(v as usize);
        }
        if self.labels.is_empty() {
            None
        } else {
            Some(max + 1)
        }
    }
}

/// Gather `values[i]` for every `i` in `indices`
pub fn subset_labels(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| values[i]).collect()
}

/// Scale each value into [0, 1]; constant columns map to 0
pub fn minmax_scale(column: &[f64]) -> Vec<f64> {
    let min = column.iter().copied().fold(f64::INFINITY, f64::min);
    let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    column
        .iter()
        .map(|&v| if range > 0.0 { (v - min) / range } else { 0.0 })
        .collect()
}
