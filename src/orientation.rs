//! Geological orientation measurements.
//!
//! Coordinates are east (x), north (y), up (z).
//! Strike is a compass bearing in degrees, clockwise from north.
//! Following the right-hand rule the plane dips toward `strike + 90`.
//! Dip is the inclination from horizontal in degrees.

use crate::error::{InterpolationError, Result};

use std::f64::consts::PI;

/// Upward unit normal of the plane with the given strike and dip.
///
/// The vertical reference vector is tilted by the dip about the strike line
/// and then turned by the strike about the vertical axis.
/// This gives `(sin(dip) cos(strike), -sin(dip) sin(strike), cos(dip))`.
///
/// Strike can be any finite angle, dip must lie in `[0, 90]`.
pub fn strike_dip_normal(strike_degrees: f64, dip_degrees: f64) -> Result<na::Vector3<f64>> {
  if !strike_degrees.is_finite() || !dip_degrees.is_finite() {
    return Err(InterpolationError::invalid(format!(
      "strike and dip must be finite, got ({strike_degrees}, {dip_degrees})"
    )));
  }
  if !(0.0..=90.0).contains(&dip_degrees) {
    return Err(InterpolationError::invalid(format!(
      "dip must lie in [0, 90] degrees, got {dip_degrees}"
    )));
  }

  let strike = strike_degrees.rem_euclid(360.0) * PI / 180.0;
  let dip = dip_degrees.to_radians();

  let tilt = na::Rotation3::from_axis_angle(&na::Vector3::y_axis(), dip);
  let turn = na::Rotation3::from_axis_angle(&na::Vector3::z_axis(), -strike);
  let normal = turn * tilt * na::Vector3::z();

  // Rotations preserve length, renormalise to drop the rounding.
  Ok(normal.normalize())
}

/// Strike and dip (in degrees) of the plane with the given normal.
///
/// The normal is flipped to point upward first.
pub fn normal_to_strike_dip(normal: &na::Vector3<f64>) -> Result<(f64, f64)> {
  let norm = normal.norm();
  if !norm.is_finite() || norm == 0.0 {
    return Err(InterpolationError::invalid(
      "normal must be a finite, non-zero vector",
    ));
  }
  let mut normal = normal / norm;
  if normal.z < 0.0 {
    normal = -normal;
  }

  let dip = normal.z.clamp(-1.0, 1.0).acos().to_degrees();
  let horizontal = normal.x.hypot(normal.y);
  let strike = if horizontal == 0.0 {
    0.0
  } else {
    (-normal.y).atan2(normal.x).to_degrees().rem_euclid(360.0)
  };
  Ok((strike, dip))
}
