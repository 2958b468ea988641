//! Sparse observations the interpolated field has to honour.

use crate::{
  error::{InterpolationError, Result},
  orientation,
};

/// Observed field value at a point.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueConstraint {
  pub position: na::Point3<f64>,
  pub value: f64,
  pub weight: f64,
}

/// Observed field gradient direction at a point.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientConstraint {
  pub position: na::Point3<f64>,
  /// Unit vector.
  pub direction: na::Vector3<f64>,
  pub weight: f64,
}

impl GradientConstraint {
  /// Strike and dip in degrees of the plane normal to the direction.
  pub fn strike_dip(&self) -> Result<(f64, f64)> {
    orientation::normal_to_strike_dip(&self.direction)
  }
}

/// Insertion-ordered collection of value and gradient constraints.
///
/// The order only matters for export, solving is independent of it.
#[derive(Debug, Default, Clone)]
pub struct ConstraintStore {
  values: Vec<ValueConstraint>,
  gradients: Vec<GradientConstraint>,
}

fn check_position(position: &na::Point3<f64>) -> Result<()> {
  if position.iter().any(|x| !x.is_finite()) {
    return Err(InterpolationError::invalid(format!(
      "constraint position must be finite, got {:?}",
      position.coords.as_slice()
    )));
  }
  Ok(())
}

fn check_weight(weight: f64) -> Result<()> {
  if !weight.is_finite() || weight < 0.0 {
    return Err(InterpolationError::invalid(format!(
      "constraint weight must be finite and non-negative, got {weight}"
    )));
  }
  if weight == 0.0 {
    tracing::warn!("constraint with zero weight has no influence on the field");
  }
  Ok(())
}

impl ConstraintStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_point(&mut self, position: na::Point3<f64>, value: f64) -> Result<()> {
    self.add_weighted_point(position, value, 1.0)
  }

  pub fn add_weighted_point(
    &mut self,
    position: na::Point3<f64>,
    value: f64,
    weight: f64,
  ) -> Result<()> {
    check_position(&position)?;
    if !value.is_finite() {
      return Err(InterpolationError::invalid(format!(
        "constraint value must be finite, got {value}"
      )));
    }
    check_weight(weight)?;

    self.values.push(ValueConstraint {
      position,
      value,
      weight,
    });
    Ok(())
  }

  /// Adds the plane orientation as gradient constraint, see [`orientation::strike_dip_normal`].
  pub fn add_strike_and_dip(
    &mut self,
    position: na::Point3<f64>,
    strike_degrees: f64,
    dip_degrees: f64,
  ) -> Result<()> {
    self.add_weighted_strike_and_dip(position, strike_degrees, dip_degrees, 1.0)
  }

  pub fn add_weighted_strike_and_dip(
    &mut self,
    position: na::Point3<f64>,
    strike_degrees: f64,
    dip_degrees: f64,
    weight: f64,
  ) -> Result<()> {
    let direction = orientation::strike_dip_normal(strike_degrees, dip_degrees)?;
    self.push_gradient(position, direction, weight)
  }

  /// Adds a gradient constraint from an arbitrary non-zero vector,
  /// only its direction is kept.
  pub fn add_gradient(
    &mut self,
    position: na::Point3<f64>,
    vector: na::Vector3<f64>,
    weight: f64,
  ) -> Result<()> {
    let norm = vector.norm();
    if !norm.is_finite() || norm == 0.0 {
      return Err(InterpolationError::invalid(format!(
        "gradient must be finite and non-zero, got {:?}",
        vector.as_slice()
      )));
    }
    self.push_gradient(position, vector / norm, weight)
  }

  fn push_gradient(
    &mut self,
    position: na::Point3<f64>,
    direction: na::Vector3<f64>,
    weight: f64,
  ) -> Result<()> {
    check_position(&position)?;
    check_weight(weight)?;
    self.gradients.push(GradientConstraint {
      position,
      direction,
      weight,
    });
    Ok(())
  }
}

// getters
impl ConstraintStore {
  pub fn values(&self) -> &[ValueConstraint] {
    &self.values
  }
  pub fn gradients(&self) -> &[GradientConstraint] {
    &self.gradients
  }
  pub fn nvalues(&self) -> usize {
    self.values.len()
  }
  pub fn ngradients(&self) -> usize {
    self.gradients.len()
  }
  pub fn is_empty(&self) -> bool {
    self.values.is_empty() && self.gradients.is_empty()
  }

  /// Value constraints as rows `x y z value`, in insertion order.
  pub fn control_points(&self) -> na::DMatrix<f64> {
    na::DMatrix::from_row_iterator(
      self.values.len(),
      4,
      self.values.iter().flat_map(|c| {
        let p = c.position;
        [p.x, p.y, p.z, c.value]
      }),
    )
  }

  /// Gradient constraints as rows `x y z dx dy dz`, in insertion order.
  pub fn gradient_control(&self) -> na::DMatrix<f64> {
    na::DMatrix::from_row_iterator(
      self.gradients.len(),
      6,
      self.gradients.iter().flat_map(|c| {
        let (p, d) = (c.position, c.direction);
        [p.x, p.y, p.z, d.x, d.y, d.z]
      }),
    )
  }
}
