// railyard/src/core/control.rs

//! Labels for the worker loop state machine and the ways it can end.

/// Where a worker loop is in its pull → compute → forward cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocomotiveState {
  /// Waiting for the next input or cancellation.
  AwaitNext,
  /// Waiting for the stage to complete the pulled input, or cancellation.
  AwaitStage,
  /// Waiting for room downstream to forward the produced output, or cancellation.
  AwaitForward,
  Terminated,
}

/// Why a worker loop reached `LocomotiveState::Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
  /// The input stream closed while waiting for the next item.
  Exhausted,
  /// Cancellation was observed at the given checkpoint and drain handlers ran.
  Cancelled(LocomotiveState),
  /// The downstream receiver went away; nothing more can be delivered.
  DownstreamClosed,
  /// The stage closed its completion without a value while the context was live.
  Abandoned,
}

impl Termination {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, Termination::Cancelled(_))
  }
}
