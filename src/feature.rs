//! Geological features, i.e. named interpolated fields.

use crate::{
  constraints::ConstraintStore,
  error::{InterpolationError, Result},
  grid::Grid,
  interpolate::{interpolate, Field, SolverConfig},
};

/// Named scalar field together with the grid and the constraints it was built from.
#[derive(Debug, Clone)]
pub struct GeologicalFeature<'a> {
  name: String,
  field: Field,
  grid: &'a Grid,
  constraints: &'a ConstraintStore,
}

// constructors
impl<'a> GeologicalFeature<'a> {
  /// Interpolates the constraints on the grid.
  pub fn build(
    name: impl Into<String>,
    grid: &'a Grid,
    constraints: &'a ConstraintStore,
    config: &SolverConfig,
  ) -> Result<Self> {
    let name = name.into();
    let field = interpolate(grid, constraints, config)?;
    tracing::info!(
      feature = %name,
      min = field.min(),
      max = field.max(),
      "built geological feature"
    );
    Self::from_field(name, field, grid, constraints)
  }

  pub fn from_field(
    name: impl Into<String>,
    field: Field,
    grid: &'a Grid,
    constraints: &'a ConstraintStore,
  ) -> Result<Self> {
    if field.len() != grid.node_count() {
      return Err(InterpolationError::invalid(format!(
        "field has {} values but grid has {} nodes",
        field.len(),
        grid.node_count()
      )));
    }
    Ok(Self {
      name: name.into(),
      field,
      grid,
      constraints,
    })
  }
}

// getters
impl<'a> GeologicalFeature<'a> {
  pub fn name(&self) -> &str {
    &self.name
  }
  pub fn field(&self) -> &Field {
    &self.field
  }
  pub fn grid(&self) -> &'a Grid {
    self.grid
  }
  pub fn constraints(&self) -> &'a ConstraintStore {
    self.constraints
  }
  pub fn min(&self) -> f64 {
    self.field.min()
  }
  pub fn max(&self) -> f64 {
    self.field.max()
  }
}

impl GeologicalFeature<'_> {
  /// Trilinear interpolation of the field, points outside the grid are clamped onto it.
  pub fn evaluate_value(&self, point: &na::Point3<f64>) -> f64 {
    self
      .grid
      .locate(point)
      .value_weights(self.grid)
      .iter()
      .map(|&(inode, w)| w * self.field[inode])
      .sum()
  }

  /// Gradient of the trilinear interpolant, zero along axes with a single node.
  pub fn evaluate_gradient(&self, point: &na::Point3<f64>) -> na::Vector3<f64> {
    let location = self.grid.locate(point);
    na::Vector3::from_fn(|axis, _| {
      location
        .gradient_weights(self.grid, axis)
        .iter()
        .map(|&(inode, w)| w * self.field[inode])
        .sum()
    })
  }

  /// Values at all rows `x y z` of `points`.
  pub fn evaluate_values(&self, points: &na::DMatrix<f64>) -> Result<na::DVector<f64>> {
    if points.ncols() != 3 {
      return Err(InterpolationError::invalid(format!(
        "expected points as n x 3 table, got {} columns",
        points.ncols()
      )));
    }
    Ok(na::DVector::from_iterator(
      points.nrows(),
      points
        .row_iter()
        .map(|row| self.evaluate_value(&na::Point3::new(row[0], row[1], row[2]))),
    ))
  }

  /// `nslices` evenly spaced isovalues strictly between the field extrema.
  pub fn isovalues(&self, nslices: usize) -> Vec<f64> {
    let (min, max) = (self.min(), self.max());
    let delta = (max - min) / (nslices + 1) as f64;
    (1..=nslices).map(|i| min + i as f64 * delta).collect()
  }
}

#[cfg(test)]
mod test {
  use super::GeologicalFeature;
  use crate::{
    constraints::ConstraintStore,
    error::InterpolationError,
    grid::Grid,
    interpolate::{Field, SolverConfig},
  };

  use approx::assert_abs_diff_eq;

  fn grid_and_linear_field() -> (Grid, Field) {
    let grid = Grid::new(
      [3, 4, 2],
      na::Vector3::new(0.5, 1.0, 2.0),
      na::Point3::new(1.0, 0.0, -1.0),
    )
    .unwrap();
    let values = grid
      .node_coords()
      .row_iter()
      .map(|p| 2.0 * p[0] - p[1] + 0.25 * p[2])
      .collect::<Vec<_>>();
    (grid, Field::new(na::DVector::from_vec(values)))
  }

  #[test]
  fn evaluation_reproduces_linear_field() {
    let (grid, field) = grid_and_linear_field();
    let store = ConstraintStore::new();
    let feature = GeologicalFeature::from_field("strati", field, &grid, &store).unwrap();
    assert_eq!(feature.name(), "strati");

    let point = na::Point3::new(1.7, 2.2, 0.3);
    assert_abs_diff_eq!(
      feature.evaluate_value(&point),
      2.0 * 1.7 - 2.2 + 0.25 * 0.3,
      epsilon = 1e-12
    );
    assert_abs_diff_eq!(
      feature.evaluate_gradient(&point),
      na::Vector3::new(2.0, -1.0, 0.25),
      epsilon = 1e-12
    );

    let node = grid.node_id(2, 1, 1).unwrap();
    let node_pos = grid.node_position(2, 1, 1).unwrap();
    assert_abs_diff_eq!(feature.evaluate_value(&node_pos), feature.field()[node], epsilon = 1e-12);

    let points = grid.node_coords();
    assert_abs_diff_eq!(
      feature.evaluate_values(&points).unwrap(),
      feature.field().values().clone(),
      epsilon = 1e-12
    );
  }

  #[test]
  fn isovalues_lie_inside_range() {
    let (grid, field) = grid_and_linear_field();
    let store = ConstraintStore::new();
    let feature = GeologicalFeature::from_field("strati", field, &grid, &store).unwrap();

    let (min, max) = (feature.min(), feature.max());
    let isovalues = feature.isovalues(4);
    assert_eq!(isovalues.len(), 4);
    assert!(isovalues.iter().all(|&v| v > min && v < max));
    for w in isovalues.windows(2) {
      assert_abs_diff_eq!(w[1] - w[0], (max - min) / 5.0, epsilon = 1e-12);
    }
    assert!(feature.isovalues(0).is_empty());
  }

  #[test]
  fn field_must_match_grid() {
    let (grid, _) = grid_and_linear_field();
    let store = ConstraintStore::new();
    let field = Field::new(na::DVector::zeros(3));
    assert!(matches!(
      GeologicalFeature::from_field("strati", field, &grid, &store),
      Err(InterpolationError::InvalidInput(_))
    ));
  }

  #[test]
  fn build_borrows_its_inputs() {
    let grid = Grid::from_nsteps([4, 4, 4], na::Vector3::new(1.0, 1.0, 1.0)).unwrap();
    let mut store = ConstraintStore::new();
    store.add_point(na::Point3::new(0.0, 0.0, 0.0), 0.0).unwrap();
    store
      .add_strike_and_dip(na::Point3::new(1.5, 1.5, 1.5), 0.0, 0.0)
      .unwrap();

    let config = SolverConfig::default().with_tolerance(1e-12);
    let feature = GeologicalFeature::build("strati", &grid, &store, &config).unwrap();
    assert!(std::ptr::eq(feature.grid(), &grid));
    assert_eq!(feature.constraints().ngradients(), 1);
    assert_abs_diff_eq!(
      feature.evaluate_value(&na::Point3::new(2.0, 1.0, 3.0)),
      3.0,
      epsilon = 1e-6
    );
  }
}
