use crate::error::{InterpolationError, Result};

use faer::solvers::SpSolver;
use rayon::prelude::*;

/// Outcome of a converged iterative solve.
#[derive(Debug, Clone)]
pub struct IterativeSolution {
  pub solution: na::DVector<f64>,
  pub iterations: usize,
  /// $||b - A x|| / ||b||$
  pub relative_residual: f64,
}

/// $y = A x$, parallel over rows.
pub fn spmv(a: &nas::CsrMatrix<f64>, x: &na::DVector<f64>, y: &mut na::DVector<f64>) {
  let offsets = a.row_offsets();
  let cols = a.col_indices();
  let vals = a.values();
  y.as_mut_slice()
    .par_iter_mut()
    .enumerate()
    .for_each(|(irow, yi)| {
      let range = offsets[irow]..offsets[irow + 1];
      *yi = cols[range.clone()]
        .iter()
        .zip(&vals[range])
        .map(|(&c, &v)| v * x[c])
        .sum();
    });
}

fn inverse_diagonal(a: &nas::CsrMatrix<f64>) -> na::DVector<f64> {
  let mut inv = na::DVector::from_element(a.nrows(), 1.0);
  for (irow, row) in a.row_iter().enumerate() {
    let diag: f64 = row
      .col_indices()
      .iter()
      .zip(row.values())
      .filter(|&(&c, _)| c == irow)
      .map(|(_, &v)| v)
      .sum();
    if diag > 0.0 {
      inv[irow] = diag.recip();
    }
  }
  inv
}

/// Jacobi preconditioned conjugate gradient method
/// for symmetric positive (semi-)definite systems.
///
/// Starts from zero and stops once $||r|| <= "tol" ||b||$.
/// Fails if the iteration limit is hit or a direction of
/// non-positive curvature is encountered.
pub fn conjugate_gradient(
  a: &nas::CsrMatrix<f64>,
  b: &na::DVector<f64>,
  tolerance: f64,
  max_iterations: usize,
) -> Result<IterativeSolution> {
  let n = b.len();
  let mut x = na::DVector::zeros(n);

  let b_norm = b.norm();
  if b_norm == 0.0 {
    return Ok(IterativeSolution {
      solution: x,
      iterations: 0,
      relative_residual: 0.0,
    });
  }

  let precon = inverse_diagonal(a);
  let mut r = b.clone();
  let mut z = r.component_mul(&precon);
  let mut p = z.clone();
  let mut rz = r.dot(&z);
  let mut q = na::DVector::zeros(n);

  let mut relative_residual = 1.0;
  for iteration in 1..=max_iterations {
    spmv(a, &p, &mut q);
    let curvature = p.dot(&q);
    if !(curvature > 0.0) {
      return Err(InterpolationError::SingularSystem(format!(
        "conjugate gradient broke down in iteration {iteration} \
        (curvature {curvature:.3e}, relative residual {relative_residual:.3e})"
      )));
    }

    let alpha = rz / curvature;
    x.axpy(alpha, &p, 1.0);
    r.axpy(-alpha, &q, 1.0);

    relative_residual = r.norm() / b_norm;
    if relative_residual <= tolerance {
      tracing::debug!(iteration, relative_residual, "conjugate gradient converged");
      return Ok(IterativeSolution {
        solution: x,
        iterations: iteration,
        relative_residual,
      });
    }

    z = r.component_mul(&precon);
    let rz_next = r.dot(&z);
    p.axpy(1.0, &z, rz_next / rz);
    rz = rz_next;
  }

  Err(InterpolationError::SingularSystem(format!(
    "conjugate gradient did not converge within {max_iterations} iterations \
    (relative residual {relative_residual:.3e})"
  )))
}

type SparseMatrixFaer = faer::sparse::SparseColMat<usize, f64>;

pub fn nalgebra2faer(m: nas::CscMatrix<f64>) -> SparseMatrixFaer {
  let nrows = m.nrows();
  let ncols = m.ncols();
  let (col_ptrs, row_indices, values) = m.disassemble();

  let symbolic =
    faer::sparse::SymbolicSparseColMat::new_checked(nrows, ncols, col_ptrs, None, row_indices);
  faer::sparse::SparseColMat::new(symbolic, values)
}

pub struct FaerLu {
  raw: faer::sparse::linalg::solvers::Lu<usize, f64>,
}
impl FaerLu {
  pub fn new(a: nas::CscMatrix<f64>) -> Result<Self> {
    let raw = nalgebra2faer(a).sp_lu().map_err(|err| {
      InterpolationError::SingularSystem(format!("sparse LU factorization failed: {err:?}"))
    })?;
    Ok(Self { raw })
  }

  pub fn solve(&self, b: &na::DVector<f64>) -> na::DVector<f64> {
    let b = faer::col::from_slice(b.as_slice());
    na::DVector::from_vec(self.raw.solve(b).as_slice().to_vec())
  }
}

pub struct FaerCholesky {
  raw: faer::sparse::linalg::solvers::Cholesky<usize, f64>,
}
impl FaerCholesky {
  pub fn new(a: nas::CscMatrix<f64>) -> Result<Self> {
    let raw = nalgebra2faer(a)
      .sp_cholesky(faer::Side::Upper)
      .map_err(|err| {
        InterpolationError::SingularSystem(format!(
          "sparse Cholesky factorization failed, matrix not positive definite: {err:?}"
        ))
      })?;
    Ok(Self { raw })
  }

  pub fn solve(&self, b: &na::DVector<f64>) -> na::DVector<f64> {
    let b = faer::col::from_slice(b.as_slice());
    na::DVector::from_vec(self.raw.solve(b).as_slice().to_vec())
  }
}
