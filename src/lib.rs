//! Implicit modelling of stratigraphy on structured grids.
//!
//! A scalar field is interpolated from sparse value and orientation
//! observations by finite differences, smoothed by a discrete Hessian
//! regulariser. Level sets of the field are the modelled horizons.

extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod constraints;
pub mod error;
pub mod feature;
pub mod grid;
pub mod interpolate;
pub mod io;
pub mod linalg;
pub mod lse;
pub mod orientation;
pub mod sparse;
pub mod stencil;

pub use constraints::ConstraintStore;
pub use error::{InterpolationError, Result};
pub use feature::GeologicalFeature;
pub use grid::{Grid, NodeIdx};
pub use interpolate::{interpolate, Field, SolverConfig, SolverKind};
