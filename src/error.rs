use crate::grid::CartIdx;

pub type Result<T> = std::result::Result<T, InterpolationError>;

#[derive(Debug, thiserror::Error)]
pub enum InterpolationError {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("node index {index:?} out of range for grid with {nsteps:?} nodes")]
  IndexOutOfRange { index: CartIdx, nsteps: [usize; 3] },

  #[error("no value or gradient constraints given, the field is undefined")]
  NoConstraints,

  #[error("singular system: {0}")]
  SingularSystem(String),
}

impl InterpolationError {
  pub(crate) fn invalid(msg: impl Into<String>) -> Self {
    Self::InvalidInput(msg.into())
  }
}
