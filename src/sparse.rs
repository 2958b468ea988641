use crate::error::{InterpolationError, Result};

use itertools::Itertools;

/// Sparse matrix under assembly, as list of (row, col, value) triplets.
///
/// Duplicate entries are summed on conversion.
#[derive(Default, Debug, Clone)]
pub struct SparseMatrix {
  nrows: usize,
  ncols: usize,
  triplets: Vec<(usize, usize, f64)>,
}

impl SparseMatrix {
  pub fn zeros(nrows: usize, ncols: usize) -> Self {
    Self::new(nrows, ncols, Vec::new())
  }
  pub fn new(nrows: usize, ncols: usize, triplets: Vec<(usize, usize, f64)>) -> Self {
    Self {
      nrows,
      ncols,
      triplets,
    }
  }

  pub fn nrows(&self) -> usize {
    self.nrows
  }
  pub fn ncols(&self) -> usize {
    self.ncols
  }
  pub fn triplets(&self) -> &[(usize, usize, f64)] {
    &self.triplets
  }
  pub fn ntriplets(&self) -> usize {
    self.triplets.len()
  }

  pub fn push(&mut self, r: usize, c: usize, v: f64) {
    debug_assert!(r < self.nrows && c < self.ncols);
    if v != 0.0 {
      self.triplets.push((r, c, v));
    }
  }

  pub fn extend(&mut self, triplets: impl IntoIterator<Item = (usize, usize, f64)>) {
    for (r, c, v) in triplets {
      self.push(r, c, v);
    }
  }

  pub fn to_nalgebra_coo(&self) -> Result<nas::CooMatrix<f64>> {
    let (rows, cols, vals): (Vec<_>, Vec<_>, Vec<_>) = self.triplets.iter().copied().multiunzip();
    nas::CooMatrix::try_from_triplets(self.nrows, self.ncols, rows, cols, vals)
      .map_err(|err| InterpolationError::invalid(format!("malformed sparse matrix: {err}")))
  }

  pub fn to_nalgebra_csr(&self) -> Result<nas::CsrMatrix<f64>> {
    Ok((&self.to_nalgebra_coo()?).into())
  }

  pub fn to_nalgebra_csc(&self) -> Result<nas::CscMatrix<f64>> {
    Ok((&self.to_nalgebra_coo()?).into())
  }

  pub fn to_nalgebra_dense(&self) -> Result<na::DMatrix<f64>> {
    Ok((&self.to_nalgebra_coo()?).into())
  }
}
