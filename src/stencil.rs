//! Finite difference stencils of the smoothness regulariser.
//!
//! The regulariser is the squared Frobenius norm of the discrete Hessian,
//! summed over all sites where a stencil fits into the grid.
//! Pure second derivatives use the central stencil $[1, -2, 1]$ centered at a node,
//! mixed derivatives the four point stencil $[1, -1, -1, 1]$ on a cell face
//! anchored at its lowest node. Mixed terms appear twice in the Frobenius norm.
//! Stencils act in node-index units, so the step lengths do not enter.
//!
//! The null space of the regulariser are the affine functions.

use crate::{
  grid::{CartIdx, Grid, NodeIdx},
  lse::LsqRow,
};

use rayon::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct Stencil {
  pub name: &'static str,
  pub terms: &'static [([isize; 3], f64)],
  pub weight: f64,
}

const fn second_derivative(name: &'static str, terms: &'static [([isize; 3], f64)]) -> Stencil {
  Stencil {
    name,
    terms,
    weight: 1.0,
  }
}

const fn mixed_derivative(name: &'static str, terms: &'static [([isize; 3], f64)]) -> Stencil {
  Stencil {
    name,
    terms,
    weight: 2.0,
  }
}

#[rustfmt::skip]
pub static HESSIAN_STENCILS: [Stencil; 6] = [
  second_derivative("xx", &[([-1, 0, 0], 1.0), ([0, 0, 0], -2.0), ([1, 0, 0], 1.0)]),
  second_derivative("yy", &[([0, -1, 0], 1.0), ([0, 0, 0], -2.0), ([0, 1, 0], 1.0)]),
  second_derivative("zz", &[([0, 0, -1], 1.0), ([0, 0, 0], -2.0), ([0, 0, 1], 1.0)]),
  mixed_derivative("xy", &[([0, 0, 0], 1.0), ([1, 0, 0], -1.0), ([0, 1, 0], -1.0), ([1, 1, 0], 1.0)]),
  mixed_derivative("xz", &[([0, 0, 0], 1.0), ([1, 0, 0], -1.0), ([0, 0, 1], -1.0), ([1, 0, 1], 1.0)]),
  mixed_derivative("yz", &[([0, 0, 0], 1.0), ([0, 1, 0], -1.0), ([0, 0, 1], -1.0), ([0, 1, 1], 1.0)]),
];

impl Stencil {
  /// Node coefficients of the stencil at `site`,
  /// `None` if it reaches outside of the grid.
  pub fn at(&self, grid: &Grid, site: CartIdx) -> Option<Vec<(NodeIdx, f64)>> {
    let nsteps = grid.nsteps();
    self
      .terms
      .iter()
      .map(|&(offset, coeff)| {
        let mut idx = [0; 3];
        for d in 0..3 {
          let i = site[d].checked_add_signed(offset[d])?;
          if i >= nsteps[d] {
            return None;
          }
          idx[d] = i;
        }
        Some((grid.node_id_unchecked(idx), coeff))
      })
      .collect()
  }
}

/// Least-squares rows of the regulariser, scaled by `cgw`.
///
/// Rows are ordered by node, then by stencil.
pub fn regularisation_rows(grid: &Grid, cgw: f64) -> Vec<LsqRow> {
  (0..grid.node_count())
    .into_par_iter()
    .flat_map_iter(|inode| {
      let site = crate::grid::linear_index2cartesian_index(inode, grid.nsteps());
      HESSIAN_STENCILS.iter().filter_map(move |stencil| {
        stencil
          .at(grid, site)
          .map(|entries| LsqRow::new(entries, 0.0, cgw * stencil.weight))
      })
    })
    .collect()
}

/// Regularisation energy of a nodal field, i.e. its discrete roughness.
pub fn roughness(grid: &Grid, values: &na::DVector<f64>) -> f64 {
  regularisation_rows(grid, 1.0)
    .iter()
    .map(|row| row.weight * row.apply(values).powi(2))
    .sum()
}

#[cfg(test)]
mod test {
  use super::{regularisation_rows, roughness, HESSIAN_STENCILS};
  use crate::grid::Grid;

  #[test]
  fn stencils_annihilate_linear_functions() {
    for stencil in &HESSIAN_STENCILS {
      let sum: f64 = stencil.terms.iter().map(|(_, c)| c).sum();
      assert_eq!(sum, 0.0, "{}", stencil.name);
      for d in 0..3 {
        let moment: f64 = stencil.terms.iter().map(|(o, c)| o[d] as f64 * c).sum();
        assert_eq!(moment, 0.0, "{}", stencil.name);
      }
    }
  }

  #[test]
  fn stencil_sites_respect_boundary() {
    let grid = Grid::from_nsteps([3, 2, 1], na::Vector3::new(1.0, 1.0, 1.0)).unwrap();
    let xx = &HESSIAN_STENCILS[0];
    assert!(xx.at(&grid, [0, 0, 0]).is_none());
    assert_eq!(xx.at(&grid, [1, 1, 0]).unwrap(), vec![(3, 1.0), (4, -2.0), (5, 1.0)]);

    // xx at the 2 interior nodes, xy on the 2 faces, nothing along y or z.
    assert_eq!(regularisation_rows(&grid, 1.0).len(), 4);
  }

  #[test]
  fn roughness_of_quadratic() {
    let grid = Grid::from_nsteps([4, 3, 3], na::Vector3::new(0.5, 1.0, 1.0)).unwrap();
    let values = na::DVector::from_iterator(
      grid.node_count(),
      (0..grid.node_count()).map(|inode| {
        let [i, j, k] = grid.node_cart_idx(inode).unwrap();
        (i * i) as f64 + (j + k) as f64
      }),
    );
    // f_xx = 2 at the 2 * 3 * 3 sites with x-neighbours on both sides.
    assert_eq!(roughness(&grid, &values), 18.0 * 4.0);

    let constant = values.map(|_| 3.0);
    assert_eq!(roughness(&grid, &constant), 0.0);
  }
}
