//! Finite difference interpolation of an implicit scalar field.
//!
//! The field $f$ on the grid nodes minimizes
//! $$
//! sum_v w_v (T(p_v) f - "value"_v)^2
//! + sum_g w_g ||nabla (T f)(p_g) - n_g||^2
//! + "cgw" sum ||H f||_F^2
//! $$
//! where $T(p)$ are the trilinear weights of the cell containing $p$,
//! $n_g$ the unit gradient directions and $H$ the discrete Hessian of the
//! [`stencil`](crate::stencil) module.
//! Gradient constraints prescribe the full vector, which fixes
//! orientation, polarity and magnitude (one per unit length) of the gradient.

use crate::{
  constraints::ConstraintStore,
  error::{InterpolationError, Result},
  grid::Grid,
  linalg::{self, FaerCholesky, FaerLu},
  lse::{LinearSystem, LsqRow},
  stencil,
};

use std::{fmt, str::FromStr};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
  /// Jacobi preconditioned conjugate gradient.
  #[default]
  Cg,
  /// Sparse Cholesky factorization.
  Cholesky,
  /// Sparse LU factorization.
  Lu,
}

impl FromStr for SolverKind {
  type Err = InterpolationError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "cg" => Ok(Self::Cg),
      "cholesky" | "chol" => Ok(Self::Cholesky),
      "lu" => Ok(Self::Lu),
      _ => Err(InterpolationError::invalid(format!(
        "unknown solver `{s}`, expected one of `cg`, `cholesky`, `lu`"
      ))),
    }
  }
}

impl fmt::Display for SolverKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Cg => "cg",
      Self::Cholesky => "cholesky",
      Self::Lu => "lu",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
  pub solver: SolverKind,
  /// Weight of the smoothness regulariser.
  pub cgw: f64,
  /// Relative residual at which the conjugate gradient method stops.
  pub tolerance: f64,
  /// Iteration cap of the conjugate gradient method,
  /// defaults to `max(1000, 10 * node_count)`.
  pub max_iterations: Option<usize>,
  /// Diagonal shift relative to the largest diagonal entry,
  /// pins the directions no constraint or stencil controls.
  pub diagonal_regularisation: f64,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      solver: SolverKind::Cg,
      cgw: 0.1,
      tolerance: 1e-10,
      max_iterations: None,
      diagonal_regularisation: 1e-12,
    }
  }
}

impl SolverConfig {
  pub fn new(solver: SolverKind, cgw: f64) -> Self {
    Self {
      solver,
      cgw,
      ..Self::default()
    }
  }
  pub fn with_solver(mut self, solver: SolverKind) -> Self {
    self.solver = solver;
    self
  }
  pub fn with_cgw(mut self, cgw: f64) -> Self {
    self.cgw = cgw;
    self
  }
  pub fn with_tolerance(mut self, tolerance: f64) -> Self {
    self.tolerance = tolerance;
    self
  }
  pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
    self.max_iterations = Some(max_iterations);
    self
  }
  pub fn with_diagonal_regularisation(mut self, relative: f64) -> Self {
    self.diagonal_regularisation = relative;
    self
  }

  fn validate(&self) -> Result<()> {
    if !self.cgw.is_finite() || self.cgw <= 0.0 {
      return Err(InterpolationError::invalid(format!(
        "cgw must be finite and positive, got {}",
        self.cgw
      )));
    }
    if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
      return Err(InterpolationError::invalid(format!(
        "tolerance must be finite and positive, got {}",
        self.tolerance
      )));
    }
    if !self.diagonal_regularisation.is_finite() || self.diagonal_regularisation < 0.0 {
      return Err(InterpolationError::invalid(format!(
        "diagonal regularisation must be finite and non-negative, got {}",
        self.diagonal_regularisation
      )));
    }
    if self.max_iterations == Some(0) {
      return Err(InterpolationError::invalid("max iterations must be positive"));
    }
    Ok(())
  }
}

/// Scalar field with one value per grid node, in node order.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  values: na::DVector<f64>,
}

impl Field {
  pub fn new(values: na::DVector<f64>) -> Self {
    Self { values }
  }
  pub fn values(&self) -> &na::DVector<f64> {
    &self.values
  }
  pub fn into_values(self) -> na::DVector<f64> {
    self.values
  }
  pub fn len(&self) -> usize {
    self.values.len()
  }
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
  pub fn min(&self) -> f64 {
    self.values.min()
  }
  pub fn max(&self) -> f64 {
    self.values.max()
  }
}

impl std::ops::Index<usize> for Field {
  type Output = f64;
  fn index(&self, inode: usize) -> &f64 {
    &self.values[inode]
  }
}

/// Least-squares rows of the value constraints.
pub fn value_rows(grid: &Grid, constraints: &ConstraintStore) -> Vec<LsqRow> {
  constraints
    .values()
    .iter()
    .map(|c| {
      let location = grid.locate(&c.position);
      if location.clamped() {
        tracing::warn!(
          position = ?c.position.coords.as_slice(),
          "value constraint outside of grid, clamped onto its boundary"
        );
      }
      LsqRow::new(location.value_weights(grid), c.value, c.weight)
    })
    .collect()
}

/// Least-squares rows of the gradient constraints, one per axis with more than one node.
pub fn gradient_rows(grid: &Grid, constraints: &ConstraintStore) -> Vec<LsqRow> {
  constraints
    .gradients()
    .iter()
    .flat_map(|c| {
      let location = grid.locate(&c.position);
      if location.clamped() {
        tracing::warn!(
          position = ?c.position.coords.as_slice(),
          "gradient constraint outside of grid, clamped onto its boundary"
        );
      }
      (0..3).filter_map(move |axis| {
        let entries = location.gradient_weights(grid, axis);
        (!entries.is_empty()).then(|| LsqRow::new(entries, c.direction[axis], c.weight))
      })
    })
    .collect()
}

/// Assembles the normal equations of the interpolation problem.
pub fn assemble_system(
  grid: &Grid,
  constraints: &ConstraintStore,
  config: &SolverConfig,
) -> Result<LinearSystem> {
  config.validate()?;
  if constraints.is_empty() {
    return Err(InterpolationError::NoConstraints);
  }

  let mut lse = LinearSystem::new(grid.node_count());
  lse.add_rows(&stencil::regularisation_rows(grid, config.cgw));
  lse.add_rows(&value_rows(grid, constraints));
  lse.add_rows(&gradient_rows(grid, constraints));
  let shift = lse.regularise_diagonal(config.diagonal_regularisation);

  tracing::debug!(
    ndofs = lse.ndofs(),
    nrows_lsq = lse.nrows_lsq(),
    ntriplets = lse.matrix().ntriplets(),
    shift,
    "assembled interpolation system"
  );
  Ok(lse)
}

/// Solves for the field honouring the constraints.
///
/// Pure function of its arguments, every call assembles and owns its own system.
pub fn interpolate(
  grid: &Grid,
  constraints: &ConstraintStore,
  config: &SolverConfig,
) -> Result<Field> {
  let lse = assemble_system(grid, constraints, config)?;
  let (matrix, rhs) = lse.into_parts();

  let values = match config.solver {
    SolverKind::Cg => {
      let max_iterations = config
        .max_iterations
        .unwrap_or_else(|| (10 * grid.node_count()).max(1000));
      let sol = linalg::conjugate_gradient(
        &matrix.to_nalgebra_csr()?,
        &rhs,
        config.tolerance,
        max_iterations,
      )?;
      tracing::info!(
        iterations = sol.iterations,
        relative_residual = sol.relative_residual,
        "solved interpolation system with conjugate gradient"
      );
      sol.solution
    }
    SolverKind::Cholesky => FaerCholesky::new(matrix.to_nalgebra_csc()?)?.solve(&rhs),
    SolverKind::Lu => FaerLu::new(matrix.to_nalgebra_csc()?)?.solve(&rhs),
  };

  if values.iter().any(|v| !v.is_finite()) {
    return Err(InterpolationError::SingularSystem(format!(
      "{} solver produced non-finite field values",
      config.solver
    )));
  }
  Ok(Field::new(values))
}
