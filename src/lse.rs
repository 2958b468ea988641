//! Linear system of the interpolation problem.
//!
//! Every observation and every regularisation site contributes a weighted
//! least-squares row $w (c^T f - d)^2$. The rows are accumulated into the
//! normal equations $A f = b$ with $A = sum w c c^T$ and $b = sum w d c$,
//! which makes $A$ symmetric positive semi-definite by construction.

use crate::{grid::NodeIdx, sparse::SparseMatrix};

use rayon::prelude::*;

/// Weighted least-squares row $w (c^T f - d)^2$.
#[derive(Debug, Clone, PartialEq)]
pub struct LsqRow {
  pub entries: Vec<(NodeIdx, f64)>,
  pub rhs: f64,
  pub weight: f64,
}

impl LsqRow {
  pub fn new(entries: Vec<(NodeIdx, f64)>, rhs: f64, weight: f64) -> Self {
    Self {
      entries,
      rhs,
      weight,
    }
  }

  /// $c^T f - d$
  pub fn residual(&self, field: &na::DVector<f64>) -> f64 {
    self.apply(field) - self.rhs
  }

  /// $c^T f$
  pub fn apply(&self, field: &na::DVector<f64>) -> f64 {
    self.entries.iter().map(|&(i, c)| c * field[i]).sum()
  }

  fn normal_triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
    self.entries.iter().flat_map(move |&(i, ci)| {
      self
        .entries
        .iter()
        .map(move |&(j, cj)| (i, j, self.weight * ci * cj))
    })
  }
}

pub struct LinearSystem {
  matrix: SparseMatrix,
  rhs: na::DVector<f64>,
  diagonal: na::DVector<f64>,
  nrows_lsq: usize,
}

impl LinearSystem {
  pub fn new(ndofs: usize) -> Self {
    Self {
      matrix: SparseMatrix::zeros(ndofs, ndofs),
      rhs: na::DVector::zeros(ndofs),
      diagonal: na::DVector::zeros(ndofs),
      nrows_lsq: 0,
    }
  }

  pub fn ndofs(&self) -> usize {
    self.rhs.len()
  }
  pub fn matrix(&self) -> &SparseMatrix {
    &self.matrix
  }
  pub fn rhs(&self) -> &na::DVector<f64> {
    &self.rhs
  }
  /// Number of least-squares rows accumulated so far.
  pub fn nrows_lsq(&self) -> usize {
    self.nrows_lsq
  }

  /// Accumulates the normal equations of the rows.
  pub fn add_rows(&mut self, rows: &[LsqRow]) {
    let triplets: Vec<(usize, usize, f64)> = rows
      .par_iter()
      .filter(|row| row.weight != 0.0)
      .flat_map_iter(|row| row.normal_triplets())
      .collect();

    for &(r, c, v) in &triplets {
      if r == c {
        self.diagonal[r] += v;
      }
    }
    self.matrix.extend(triplets);

    for row in rows {
      for &(i, c) in &row.entries {
        self.rhs[i] += row.weight * c * row.rhs;
      }
    }
    self.nrows_lsq += rows.len();
  }

  /// Shifts the diagonal by `relative` times its largest entry,
  /// making a positive semi-definite matrix definite.
  ///
  /// Returns the applied shift.
  pub fn regularise_diagonal(&mut self, relative: f64) -> f64 {
    let shift = relative * self.diagonal.max();
    if shift > 0.0 {
      for i in 0..self.ndofs() {
        self.matrix.push(i, i, shift);
        self.diagonal[i] += shift;
      }
    }
    shift
  }

  pub fn into_parts(self) -> (SparseMatrix, na::DVector<f64>) {
    (self.matrix, self.rhs)
  }
}
