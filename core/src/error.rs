// railyard/src/error.rs
use anyhow::Error as AnyhowError;
use std::sync::Arc;
use thiserror::Error;

/// Errors carried by failed and cancelled outcomes, and returned by the few
/// fallible library APIs (configuration loading).
///
/// `Clone` is required because an outcome's error travels with it across
/// stages, and the same cancel cause is observed by every holder of a context.
#[derive(Debug, Clone, Error)]
pub enum RailError {
  #[error("operation cancelled")]
  Cancelled,

  #[error("deadline exceeded")]
  DeadlineExceeded,

  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Stage(Arc<AnyhowError>),

  #[error("stage panicked: {0}")]
  StagePanicked(String),

  #[error("processed value of type {from} cannot pass through a stage producing {to}")]
  ProcessedTypeMismatch { from: &'static str, to: &'static str },

  #[error("Configuration error for '{key}': {message}")]
  Configuration { key: String, message: String },
}

impl RailError {
  /// True for the two reasons a pipeline is asked to stop.
  pub fn is_cancellation(&self) -> bool {
    matches!(self, RailError::Cancelled | RailError::DeadlineExceeded)
  }

  pub fn validation(message: impl Into<String>) -> Self {
    RailError::Validation(message.into())
  }
}

// Errors returned by caller-supplied stage functions arrive as anyhow errors.
impl From<AnyhowError> for RailError {
  fn from(err: AnyhowError) -> Self {
    // A stage that forwarded one of our own errors keeps its variant.
    if let Some(rail_err) = err.downcast_ref::<RailError>() {
      return rail_err.clone();
    }
    RailError::Stage(Arc::new(err))
  }
}

pub type RailResult<T, E = RailError> = std::result::Result<T, E>;
