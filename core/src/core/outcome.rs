// railyard/src/core/outcome.rs

//! Defines `Outcome<T>`, the tri-state result carried through every stage.

use crate::error::RailError;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::ops::ControlFlow;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum State<T> {
  Succeeded(T),
  Failed(RailError),
  Cancelled(RailError),
}

/// An immutable succeeded / failed / cancelled value.
///
/// Every outcome carries a correlation `id` and a creation timestamp. Copying
/// transforms (`set_processed`, `cancel_from`, `route`) keep both.
///
/// The `processed` flag marks an outcome an earlier stage declared finished:
/// later stages pass it through untouched whatever its state.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
  id: Uuid,
  created_at: DateTime<Utc>,
  state: State<T>,
  processed: bool,
}

impl<T> Outcome<T> {
  fn fresh(state: State<T>) -> Self {
    Self {
      id: Uuid::new_v4(),
      created_at: Utc::now(),
      state,
      processed: false,
    }
  }

  pub fn success(value: T) -> Self {
    Self::fresh(State::Succeeded(value))
  }

  pub fn fail(err: RailError) -> Self {
    Self::fresh(State::Failed(err))
  }

  pub fn cancel(reason: RailError) -> Self {
    Self::fresh(State::Cancelled(reason))
  }

  pub fn success_and_processed(value: T) -> Self {
    Self::success(value).set_processed()
  }

  pub fn fail_and_processed(err: RailError) -> Self {
    Self::fail(err).set_processed()
  }

  pub fn cancel_and_processed(reason: RailError) -> Self {
    Self::cancel(reason).set_processed()
  }

  /// Builds a cancellation marker standing in for `from`.
  ///
  /// A cancelled input keeps its reason; any other input gets the generic
  /// `RailError::Cancelled`. Id, timestamp and processed flag are kept either way.
  pub fn cancel_from<In>(from: &Outcome<In>) -> Self {
    let reason = match &from.state {
      State::Cancelled(reason) => reason.clone(),
      _ => RailError::Cancelled,
    };
    Self {
      id: from.id,
      created_at: from.created_at,
      state: State::Cancelled(reason),
      processed: from.processed,
    }
  }

  /// Marks the outcome as already finalized.
  pub fn set_processed(mut self) -> Self {
    self.processed = true;
    self
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  /// The succeeded value, if any.
  pub fn result(&self) -> Option<&T> {
    match &self.state {
      State::Succeeded(value) => Some(value),
      _ => None,
    }
  }

  pub fn into_result(self) -> Option<T> {
    match self.state {
      State::Succeeded(value) => Some(value),
      _ => None,
    }
  }

  /// The failure or cancellation reason, if any.
  pub fn err(&self) -> Option<&RailError> {
    match &self.state {
      State::Succeeded(_) => None,
      State::Failed(err) | State::Cancelled(err) => Some(err),
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self.state, State::Succeeded(_))
  }

  /// True for both failed and cancelled outcomes.
  pub fn is_failure(&self) -> bool {
    !self.is_success()
  }

  pub fn is_cancel(&self) -> bool {
    matches!(self.state, State::Cancelled(_))
  }

  pub fn has_result(&self) -> bool {
    self.is_success()
  }

  /// A cancelled outcome never carries a value, so this is always false.
  /// Kept for callers that check for cancel-with-result explicitly.
  pub fn is_cancel_with_result(&self) -> bool {
    self.is_cancel() && self.has_result()
  }

  pub fn is_processed(&self) -> bool {
    self.processed
  }

  pub fn as_std(&self) -> Result<&T, &RailError> {
    match &self.state {
      State::Succeeded(value) => Ok(value),
      State::Failed(err) | State::Cancelled(err) => Err(err),
    }
  }

  pub fn into_std(self) -> Result<T, RailError> {
    match self.state {
      State::Succeeded(value) => Ok(value),
      State::Failed(err) | State::Cancelled(err) => Err(err),
    }
  }
}

impl<T: 'static> Outcome<T> {
  /// Decides whether a stage should run on this outcome.
  ///
  /// Returns `Continue(value)` for an unprocessed success. Everything else
  /// comes back as `Break` with the outcome re-typed to the stage's output:
  /// failed and cancelled outcomes keep their error, processed outcomes keep
  /// their value when the stage does not change the element type.
  pub fn route<U: 'static>(self) -> ControlFlow<Outcome<U>, T> {
    let Outcome {
      id,
      created_at,
      state,
      processed,
    } = self;

    let state = match state {
      State::Succeeded(value) if !processed => return ControlFlow::Continue(value),
      State::Succeeded(value) => match cast_value::<T, U>(value) {
        Ok(cast) => State::Succeeded(cast),
        Err(_) => State::Failed(RailError::ProcessedTypeMismatch {
          from: std::any::type_name::<T>(),
          to: std::any::type_name::<U>(),
        }),
      },
      State::Failed(err) => State::Failed(err),
      State::Cancelled(reason) => State::Cancelled(reason),
    };

    ControlFlow::Break(Outcome {
      id,
      created_at,
      state,
      processed,
    })
  }
}

// Moves `value` into a `U` when `T` and `U` are the same type.
fn cast_value<T: 'static, U: 'static>(value: T) -> Result<U, T> {
  let mut slot = Some(value);
  let cast = (&mut slot as &mut dyn Any)
    .downcast_mut::<Option<U>>()
    .and_then(Option::take);
  match (cast, slot) {
    (Some(cast), _) => Ok(cast),
    (None, Some(value)) => Err(value),
    (None, None) => unreachable!("slot is only emptied by a successful cast"),
  }
}

impl<T> From<Result<T, RailError>> for Outcome<T> {
  fn from(res: Result<T, RailError>) -> Self {
    match res {
      Ok(value) => Outcome::success(value),
      Err(err) => Outcome::fail(err),
    }
  }
}
