//! A structured grid plays the role of the interpolation support.
//! It provides a global numbering of its nodes, their positions
//! and the face-neighbour topology.
//! It locates arbitrary points inside its cells, which gives rise
//! to the trilinear weights used to tie constraints to node values.

use crate::error::{InterpolationError, Result};

pub type NodeIdx = usize;
pub type CartIdx = [usize; 3];

/// converts linear index to cartesian index
///
/// converts linear index in 0..nx*ny*nz to cartesian index (i, j, k), x varying fastest
pub fn linear_index2cartesian_index(mut lin_idx: NodeIdx, nsteps: [usize; 3]) -> CartIdx {
  let mut cart_idx = [0; 3];
  for icomp in 0..3 {
    cart_idx[icomp] = lin_idx % nsteps[icomp];
    lin_idx /= nsteps[icomp];
  }
  cart_idx
}

/// converts cartesian index to linear index
///
/// inverse of [`linear_index2cartesian_index`]
pub fn cartesian_index2linear_index(cart_idx: CartIdx, nsteps: [usize; 3]) -> NodeIdx {
  let mut lin_idx = 0;
  for icomp in (0..3).rev() {
    lin_idx *= nsteps[icomp];
    lin_idx += cart_idx[icomp];
  }
  lin_idx
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
  nsteps: [usize; 3],
  step_vector: na::Vector3<f64>,
  origin: na::Point3<f64>,
}

// constructors
impl Grid {
  /// `nsteps` are the number of nodes along each axis.
  pub fn new(
    nsteps: [usize; 3],
    step_vector: na::Vector3<f64>,
    origin: na::Point3<f64>,
  ) -> Result<Self> {
    if nsteps.iter().any(|&n| n == 0) {
      return Err(InterpolationError::invalid(format!(
        "grid needs at least one node per axis, got {nsteps:?}"
      )));
    }
    if step_vector.iter().any(|&h| !h.is_finite() || h <= 0.0) {
      return Err(InterpolationError::invalid(format!(
        "grid steps must be finite and positive, got {:?}",
        step_vector.as_slice()
      )));
    }
    if origin.iter().any(|x| !x.is_finite()) {
      return Err(InterpolationError::invalid("grid origin must be finite"));
    }
    let node_count = nsteps.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n));
    if node_count.is_none() {
      return Err(InterpolationError::invalid(format!(
        "node count of grid {nsteps:?} overflows"
      )));
    }

    Ok(Self {
      nsteps,
      step_vector,
      origin,
    })
  }

  pub fn from_nsteps(nsteps: [usize; 3], step_vector: na::Vector3<f64>) -> Result<Self> {
    Self::new(nsteps, step_vector, na::Point3::origin())
  }
}

// getters
impl Grid {
  pub fn nsteps(&self) -> [usize; 3] {
    self.nsteps
  }
  pub fn step_vector(&self) -> &na::Vector3<f64> {
    &self.step_vector
  }
  pub fn origin(&self) -> &na::Point3<f64> {
    &self.origin
  }
  pub fn node_count(&self) -> usize {
    self.nsteps.iter().product()
  }
  pub fn bounding_box(&self) -> (na::Point3<f64>, na::Point3<f64>) {
    let extent = na::Vector3::from_fn(|d, _| (self.nsteps[d] - 1) as f64 * self.step_vector[d]);
    (self.origin, self.origin + extent)
  }
  pub fn contains(&self, point: &na::Point3<f64>) -> bool {
    let (min, max) = self.bounding_box();
    (0..3).all(|d| point[d] >= min[d] && point[d] <= max[d])
  }
}

// topology
impl Grid {
  fn check_cart_idx(&self, cart_idx: CartIdx) -> Result<()> {
    if (0..3).any(|d| cart_idx[d] >= self.nsteps[d]) {
      return Err(InterpolationError::IndexOutOfRange {
        index: cart_idx,
        nsteps: self.nsteps,
      });
    }
    Ok(())
  }

  pub fn node_id(&self, i: usize, j: usize, k: usize) -> Result<NodeIdx> {
    self.check_cart_idx([i, j, k])?;
    Ok(self.node_id_unchecked([i, j, k]))
  }

  pub(crate) fn node_id_unchecked(&self, cart_idx: CartIdx) -> NodeIdx {
    cartesian_index2linear_index(cart_idx, self.nsteps)
  }

  pub fn node_cart_idx(&self, inode: NodeIdx) -> Result<CartIdx> {
    if inode >= self.node_count() {
      return Err(InterpolationError::IndexOutOfRange {
        index: linear_index2cartesian_index(inode, self.nsteps),
        nsteps: self.nsteps,
      });
    }
    Ok(linear_index2cartesian_index(inode, self.nsteps))
  }

  pub fn node_position(&self, i: usize, j: usize, k: usize) -> Result<na::Point3<f64>> {
    self.check_cart_idx([i, j, k])?;
    Ok(self.node_position_unchecked([i, j, k]))
  }

  fn node_position_unchecked(&self, cart_idx: CartIdx) -> na::Point3<f64> {
    let offset = na::Vector3::from_fn(|d, _| cart_idx[d] as f64 * self.step_vector[d]);
    self.origin + offset
  }

  /// Face neighbours of a node, ordered -x, +x, -y, +y, -z, +z.
  ///
  /// Interior nodes have six, boundary nodes fewer.
  pub fn neighbors(&self, inode: NodeIdx) -> Result<Vec<NodeIdx>> {
    let cart_idx = self.node_cart_idx(inode)?;
    let mut neighbors = Vec::with_capacity(6);
    for d in 0..3 {
      if cart_idx[d] > 0 {
        let mut lower = cart_idx;
        lower[d] -= 1;
        neighbors.push(self.node_id_unchecked(lower));
      }
      if cart_idx[d] + 1 < self.nsteps[d] {
        let mut upper = cart_idx;
        upper[d] += 1;
        neighbors.push(self.node_id_unchecked(upper));
      }
    }
    Ok(neighbors)
  }

  /// Node coordinates as rows `x y z`, in node order.
  pub fn node_coords(&self) -> na::DMatrix<f64> {
    let mut coords = na::DMatrix::zeros(self.node_count(), 3);
    for (inode, mut row) in coords.row_iter_mut().enumerate() {
      let pos = self.node_position_unchecked(linear_index2cartesian_index(inode, self.nsteps));
      row.copy_from_slice(pos.coords.as_slice());
    }
    coords
  }
}

/// Interpolation data of a point along a single axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisWeights {
  /// Axis node index and linear interpolation weight.
  pub values: Vec<(usize, f64)>,
  /// Axis node index and weight of the derivative along the axis, in physical units.
  /// Empty for an axis with a single node.
  pub derivs: Vec<(usize, f64)>,
}

/// Location of a point in the grid, in terms of the trilinear interpolant
/// of the cell containing it.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLocation {
  axes: [AxisWeights; 3],
  clamped: bool,
}

impl Grid {
  /// Locates a point in the grid.
  ///
  /// Points outside of the bounding box are clamped onto it,
  /// which is reported by [`PointLocation::clamped`].
  pub fn locate(&self, point: &na::Point3<f64>) -> PointLocation {
    let mut clamped = false;
    let axes = std::array::from_fn(|d| {
      let nnodes = self.nsteps[d];
      let h = self.step_vector[d];
      let last = (nnodes - 1) as f64;
      let t = (point[d] - self.origin[d]) / h;

      let tol = 1e-9 * last.max(1.0);
      if t < -tol || t > last + tol {
        clamped = true;
      }
      let t = t.clamp(0.0, last);

      if nnodes == 1 {
        return AxisWeights {
          values: vec![(0, 1.0)],
          derivs: Vec::new(),
        };
      }

      let cell = (t.floor() as usize).min(nnodes - 2);
      let u = t - cell as f64;
      AxisWeights {
        values: vec![(cell, 1.0 - u), (cell + 1, u)],
        derivs: vec![(cell, -h.recip()), (cell + 1, h.recip())],
      }
    });

    PointLocation { axes, clamped }
  }
}

impl PointLocation {
  pub fn clamped(&self) -> bool {
    self.clamped
  }
  pub fn axis(&self, d: usize) -> &AxisWeights {
    &self.axes[d]
  }

  /// Trilinear weights of the nodes of the containing cell.
  pub fn value_weights(&self, grid: &Grid) -> Vec<(NodeIdx, f64)> {
    self.tensor_weights(grid, None)
  }

  /// Weights of the nodes for the partial derivative along `axis`
  /// of the trilinear interpolant.
  pub fn gradient_weights(&self, grid: &Grid, axis: usize) -> Vec<(NodeIdx, f64)> {
    self.tensor_weights(grid, Some(axis))
  }

  fn tensor_weights(&self, grid: &Grid, deriv_axis: Option<usize>) -> Vec<(NodeIdx, f64)> {
    let factors: [&[(usize, f64)]; 3] = std::array::from_fn(|d| {
      if deriv_axis == Some(d) {
        self.axes[d].derivs.as_slice()
      } else {
        self.axes[d].values.as_slice()
      }
    });

    let mut weights = Vec::with_capacity(8);
    for &(k, wk) in factors[2] {
      for &(j, wj) in factors[1] {
        for &(i, wi) in factors[0] {
          let w = wi * wj * wk;
          if w != 0.0 {
            weights.push((grid.node_id_unchecked([i, j, k]), w));
          }
        }
      }
    }
    weights
  }
}

#[cfg(test)]
mod test {
  use super::{cartesian_index2linear_index, linear_index2cartesian_index, Grid};
  use crate::error::InterpolationError;

  use std::collections::HashSet;

  fn grid_345() -> Grid {
    Grid::new(
      [3, 4, 5],
      na::Vector3::new(0.5, 1.0, 2.0),
      na::Point3::new(-1.0, 0.0, 1.0),
    )
    .unwrap()
  }

  #[test]
  fn node_ids_are_bijective() {
    let grid = grid_345();
    assert_eq!(grid.node_count(), 3 * 4 * 5);

    let mut ids = HashSet::new();
    for k in 0..5 {
      for j in 0..4 {
        for i in 0..3 {
          let id = grid.node_id(i, j, k).unwrap();
          assert_eq!(grid.node_cart_idx(id).unwrap(), [i, j, k]);
          ids.insert(id);
        }
      }
    }
    assert_eq!(ids, (0..grid.node_count()).collect());
  }

  #[test]
  fn index_conversion_x_fastest() {
    let nsteps = [3, 4, 5];
    assert_eq!(cartesian_index2linear_index([1, 0, 0], nsteps), 1);
    assert_eq!(cartesian_index2linear_index([0, 1, 0], nsteps), 3);
    assert_eq!(cartesian_index2linear_index([0, 0, 1], nsteps), 12);
    assert_eq!(linear_index2cartesian_index(59, nsteps), [2, 3, 4]);
  }

  #[test]
  fn node_positions() {
    let grid = grid_345();
    assert_eq!(
      grid.node_position(2, 3, 4).unwrap(),
      na::Point3::new(0.0, 3.0, 9.0)
    );
    let (min, max) = grid.bounding_box();
    assert_eq!(min, na::Point3::new(-1.0, 0.0, 1.0));
    assert_eq!(max, na::Point3::new(0.0, 3.0, 9.0));

    let coords = grid.node_coords();
    assert_eq!(coords.nrows(), grid.node_count());
    assert_eq!(coords.row(1).iter().copied().collect::<Vec<_>>(), [-0.5, 0.0, 1.0]);
  }

  #[test]
  fn out_of_range_index() {
    let grid = grid_345();
    assert!(matches!(
      grid.node_id(3, 0, 0),
      Err(InterpolationError::IndexOutOfRange { .. })
    ));
    assert!(matches!(
      grid.node_position(0, 0, 5),
      Err(InterpolationError::IndexOutOfRange { .. })
    ));
    assert!(matches!(
      grid.neighbors(60),
      Err(InterpolationError::IndexOutOfRange { .. })
    ));
  }

  #[test]
  fn invalid_grids() {
    let h = na::Vector3::new(1.0, 1.0, 1.0);
    assert!(matches!(
      Grid::from_nsteps([0, 2, 2], h),
      Err(InterpolationError::InvalidInput(_))
    ));
    assert!(matches!(
      Grid::from_nsteps([2, 2, 2], na::Vector3::new(1.0, -1.0, 1.0)),
      Err(InterpolationError::InvalidInput(_))
    ));
    assert!(matches!(
      Grid::from_nsteps([2, 2, 2], na::Vector3::new(1.0, f64::NAN, 1.0)),
      Err(InterpolationError::InvalidInput(_))
    ));
    assert!(matches!(
      Grid::from_nsteps([usize::MAX, 2, 2], h),
      Err(InterpolationError::InvalidInput(_))
    ));
  }

  #[test]
  fn neighbors_interior_and_boundary() {
    let grid = Grid::from_nsteps([3, 3, 3], na::Vector3::new(1.0, 1.0, 1.0)).unwrap();
    let center = grid.node_id(1, 1, 1).unwrap();
    assert_eq!(grid.neighbors(center).unwrap(), vec![12, 14, 10, 16, 4, 22]);

    let corner = grid.node_id(0, 0, 0).unwrap();
    assert_eq!(grid.neighbors(corner).unwrap(), vec![1, 3, 9]);

    let edge = grid.node_id(1, 0, 0).unwrap();
    assert_eq!(grid.neighbors(edge).unwrap().len(), 4);
  }

  #[test]
  fn locate_on_node_hits_single_node() {
    let grid = grid_345();
    let pos = grid.node_position(2, 3, 4).unwrap();
    let location = grid.locate(&pos);
    assert!(!location.clamped());
    assert_eq!(
      location.value_weights(&grid),
      vec![(grid.node_id(2, 3, 4).unwrap(), 1.0)]
    );
  }

  #[test]
  fn locate_reproduces_linear_functions() {
    let grid = grid_345();
    let linear = |p: &na::Point3<f64>| 2.0 * p.x - 3.0 * p.y + 0.5 * p.z + 1.0;
    let nodal: Vec<f64> = (0..grid.node_count())
      .map(|inode| {
        let [i, j, k] = grid.node_cart_idx(inode).unwrap();
        linear(&grid.node_position(i, j, k).unwrap())
      })
      .collect();

    let point = na::Point3::new(-0.3, 1.7, 4.2);
    let location = grid.locate(&point);
    let value: f64 = location
      .value_weights(&grid)
      .iter()
      .map(|&(inode, w)| w * nodal[inode])
      .sum();
    approx::assert_abs_diff_eq!(value, linear(&point), epsilon = 1e-12);

    let expected_gradient = [2.0, -3.0, 0.5];
    for (axis, expected) in expected_gradient.into_iter().enumerate() {
      let derivative: f64 = location
        .gradient_weights(&grid, axis)
        .iter()
        .map(|&(inode, w)| w * nodal[inode])
        .sum();
      approx::assert_abs_diff_eq!(derivative, expected, epsilon = 1e-12);
    }
  }

  #[test]
  fn locate_clamps_outside_points() {
    let grid = grid_345();
    let location = grid.locate(&na::Point3::new(-5.0, 1.0, 3.0));
    assert!(location.clamped());
    assert_eq!(location.axis(0).values, vec![(0, 1.0), (1, 0.0)]);
  }

  #[test]
  fn flat_axis_has_no_derivative() {
    let grid = Grid::from_nsteps([4, 4, 1], na::Vector3::new(1.0, 1.0, 1.0)).unwrap();
    let location = grid.locate(&na::Point3::new(1.5, 2.0, 0.0));
    assert!(location.gradient_weights(&grid, 2).is_empty());
    assert_eq!(location.value_weights(&grid).len(), 2);
  }
}
