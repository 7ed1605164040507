// railyard/src/engine/adapter.rs

//! Lifts a one-shot computation on a single outcome into a unit of work that
//! races against cancellation.
//!
//! The adapter starts the computation in its own task and hands back a
//! [`Completion`]. Exactly one of two things then happens:
//!  - the produced outcome is delivered through the completion, or
//!  - cancellation wins, the `on_cancel` callback (if any) runs with the
//!    original input, the completion closes empty and the result of the
//!    computation is discarded whenever it finishes.
//!
//! If the context is already cancelled at entry the computation never starts
//! and `on_cancel` runs immediately.

use crate::core::context::ExecutionContext;
use crate::core::outcome::Outcome;
use crate::error::RailError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::{event, Level};

/// Synchronous step run by [`launch`].
pub type StepFn<In, Out> = Arc<dyn Fn(&ExecutionContext, Outcome<In>) -> Outcome<Out> + Send + Sync + 'static>;

/// Callback invoked with the original input when cancellation beats the computation.
pub type OnCancel<In> = Arc<dyn Fn(&ExecutionContext, &Outcome<In>) + Send + Sync + 'static>;

/// Single-slot receiver for the outcome of one launched computation.
/// Resolves to `None` when the computation was cancelled.
pub struct Completion<Out> {
  rx: oneshot::Receiver<Outcome<Out>>,
}

impl<Out> Completion<Out> {
  /// A completion already holding `outcome`, for engines that finish inline.
  pub fn ready(outcome: Outcome<Out>) -> Self {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(outcome);
    Self { rx }
  }

  /// A completion that resolves to `None`.
  pub fn closed() -> Self {
    let (_, rx) = oneshot::channel();
    Self { rx }
  }

  pub fn channel() -> (oneshot::Sender<Outcome<Out>>, Self) {
    let (tx, rx) = oneshot::channel();
    (tx, Self { rx })
  }
}

impl<Out> Future for Completion<Out> {
  type Output = Option<Outcome<Out>>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    Pin::new(&mut self.rx).poll(cx).map(Result::ok)
  }
}

/// Runs a synchronous, possibly long `step` on a blocking thread and races it
/// against cancellation of `ctx`.
pub fn launch<In, Out>(
  ctx: &ExecutionContext,
  input: Outcome<In>,
  step: StepFn<In, Out>,
  on_cancel: Option<OnCancel<In>>,
) -> Completion<Out>
where
  In: Clone + Send + 'static,
  Out: Send + 'static,
{
  if ctx.is_cancelled() {
    cancelled_at_entry(ctx, &input, on_cancel.as_ref());
    return Completion::closed();
  }

  let (tx, completion) = Completion::channel();
  let ctx = ctx.clone();
  tokio::spawn(async move {
    let work_ctx = ctx.clone();
    let work_input = input.clone();
    let work = tokio::task::spawn_blocking(move || step(&work_ctx, work_input));

    tokio::select! {
      biased;
      _ = ctx.cancelled() => {
        event!(Level::DEBUG, outcome_id = %input.id(), "Stage cancelled before completion.");
        if let Some(on_cancel) = &on_cancel {
          on_cancel(&ctx, &input);
        }
      }
      joined = work => {
        let _ = tx.send(joined.unwrap_or_else(panicked));
      }
    }
  });
  completion
}

/// Async counterpart of [`launch`]: `step` produces a future that is polled
/// in its own task. On cancellation the future is dropped.
pub fn launch_async<In, Out, F, Fut>(
  ctx: &ExecutionContext,
  input: Outcome<In>,
  step: F,
  on_cancel: Option<OnCancel<In>>,
) -> Completion<Out>
where
  In: Clone + Send + 'static,
  Out: Send + 'static,
  F: FnOnce(ExecutionContext, Outcome<In>) -> Fut + Send + 'static,
  Fut: Future<Output = Outcome<Out>> + Send + 'static,
{
  if ctx.is_cancelled() {
    cancelled_at_entry(ctx, &input, on_cancel.as_ref());
    return Completion::closed();
  }

  let (tx, completion) = Completion::channel();
  let ctx = ctx.clone();
  tokio::spawn(async move {
    let work = tokio::spawn(step(ctx.clone(), input.clone()));
    let abort = work.abort_handle();

    tokio::select! {
      biased;
      _ = ctx.cancelled() => {
        abort.abort();
        event!(Level::DEBUG, outcome_id = %input.id(), "Async stage cancelled before completion.");
        if let Some(on_cancel) = &on_cancel {
          on_cancel(&ctx, &input);
        }
      }
      joined = work => {
        let _ = tx.send(joined.unwrap_or_else(panicked));
      }
    }
  });
  completion
}

fn cancelled_at_entry<In>(ctx: &ExecutionContext, input: &Outcome<In>, on_cancel: Option<&OnCancel<In>>) {
  event!(Level::DEBUG, outcome_id = %input.id(), "Context already cancelled; stage not started.");
  if let Some(on_cancel) = on_cancel {
    on_cancel(ctx, input);
  }
}

fn panicked<Out>(err: JoinError) -> Outcome<Out> {
  event!(Level::ERROR, error = %err, "Stage task failed.");
  Outcome::fail(RailError::StagePanicked(err.to_string()))
}
