// railyard/src/core/context.rs

//! Defines `ExecutionContext`, the cancellation signal and run options shared
//! by every worker of a pipeline.

use crate::core::options::{RunOptions, DEFAULT_MAX_WORKERS};
use crate::error::RailError;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A cheaply cloneable cancellation observer plus immutable run options.
///
/// Cancellation is level-triggered: once `is_cancelled()` turns true it stays
/// true. A context may also carry a deadline, in which case it counts as
/// cancelled (reason `DeadlineExceeded`) from that instant on.
///
/// Holding a context grants nothing but the ability to observe (and trigger)
/// cancellation and to read options.
#[derive(Clone)]
pub struct ExecutionContext {
  token: CancellationToken,
  deadline: Option<Instant>,
  // First explicit cause wins; written at most once.
  cause: Arc<RwLock<Option<RailError>>>,
  parent: Option<Arc<ExecutionContext>>,
  options: Arc<RunOptions>,
}

impl ExecutionContext {
  pub fn new() -> Self {
    Self {
      token: CancellationToken::new(),
      deadline: None,
      cause: Arc::new(RwLock::new(None)),
      parent: None,
      options: Arc::new(RunOptions::default()),
    }
  }

  /// Derives a context that is cancelled with this one, but whose own
  /// cancellation does not reach back to the parent.
  pub fn child(&self) -> Self {
    Self {
      token: self.token.child_token(),
      deadline: self.deadline,
      cause: Arc::new(RwLock::new(None)),
      parent: Some(Arc::new(self.clone())),
      options: self.options.clone(),
    }
  }

  pub fn with_timeout(&self, timeout: Duration) -> Self {
    self.with_deadline(Instant::now() + timeout)
  }

  /// Child context with a deadline. An earlier inherited deadline still applies.
  pub fn with_deadline(&self, deadline: Instant) -> Self {
    let mut child = self.child();
    child.deadline = Some(match self.deadline {
      Some(inherited) => inherited.min(deadline),
      None => deadline,
    });
    child
  }

  /// Same cancellation signal, replaced options.
  pub fn with_options(&self, options: RunOptions) -> Self {
    let mut derived = self.clone();
    derived.options = Arc::new(options);
    derived
  }

  pub fn with_worker_options(&self, max_workers: usize) -> Self {
    self.with_options(self.options.with_max_workers(max_workers))
  }

  pub fn with_process_options(&self, process_remaining: bool) -> Self {
    self.with_options(self.options.with_process_remaining(process_remaining))
  }

  pub fn options(&self) -> &RunOptions {
    &self.options
  }

  pub fn worker_max_count(&self, default_max_workers: usize) -> usize {
    self.options.worker_max_count(default_max_workers)
  }

  pub fn default_worker_count(&self) -> usize {
    self.worker_max_count(DEFAULT_MAX_WORKERS)
  }

  pub fn is_process_remaining_enabled(&self) -> bool {
    self.options.is_process_remaining_enabled()
  }

  pub fn cancel(&self) {
    self.cancel_with(RailError::Cancelled);
  }

  /// Cancels with an explicit cause. Has no effect once cancelled.
  pub fn cancel_with(&self, cause: RailError) {
    if self.is_cancelled() {
      return;
    }
    {
      let mut slot = self.cause.write();
      if slot.is_none() {
        *slot = Some(cause);
      }
    }
    self.token.cancel();
  }

  pub fn is_cancelled(&self) -> bool {
    self.token.is_cancelled() || self.deadline_passed()
  }

  fn deadline_passed(&self) -> bool {
    self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  /// Resolves once the context is cancelled or its deadline passes.
  /// Resolves immediately if that already happened.
  pub async fn cancelled(&self) {
    match self.deadline {
      Some(deadline) => {
        tokio::select! {
          _ = self.token.cancelled() => {}
          _ = tokio::time::sleep_until(deadline) => {}
        }
      }
      None => self.token.cancelled().await,
    }
  }

  /// Why the context is cancelled, or `None` while it is live.
  pub fn reason(&self) -> Option<RailError> {
    if let Some(cause) = self.cause.read().clone() {
      return Some(cause);
    }
    if let Some(reason) = self.parent.as_ref().and_then(|parent| parent.reason()) {
      return Some(reason);
    }
    if self.token.is_cancelled() {
      return Some(RailError::Cancelled);
    }
    if self.deadline_passed() {
      return Some(RailError::DeadlineExceeded);
    }
    None
  }
}

impl Default for ExecutionContext {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for ExecutionContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExecutionContext")
      .field("cancelled", &self.is_cancelled())
      .field("deadline", &self.deadline)
      .field("options", &self.options)
      .finish()
  }
}
