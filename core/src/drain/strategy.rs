// railyard/src/drain/strategy.rs

//! Drain strategies. Each is a no-op returning 0 unless the context enables
//! process-remaining; otherwise it emits and returns how many items it sent.
//! Emission stops early if the receiving side is gone.

use crate::core::channel::{Inbound, Outbound};
use crate::core::context::ExecutionContext;
use crate::core::outcome::Outcome;
use std::sync::Arc;
use tracing::{event, Level};

/// Reduces an interrupted outcome to a plain value for the finalizer's output.
pub type BrokenFn<In, Out> = Arc<dyn Fn(&ExecutionContext, &Outcome<In>) -> Out + Send + Sync + 'static>;

/// Emits one cancellation marker for a pending input, keeping the input's
/// reason if it was already cancelled.
pub async fn cancel_remaining_result<In, Out>(
  ctx: &ExecutionContext,
  input: Outcome<In>,
  out: &Outbound<Outcome<Out>>,
) -> usize
where
  In: Send,
  Out: Send,
{
  if !ctx.is_process_remaining_enabled() {
    return 0;
  }
  match out.send(Outcome::cancel_from(&input)).await {
    Ok(()) => 1,
    Err(_) => 0,
  }
}

/// Emits a cancellation marker for every input left in the stream, until it closes.
pub async fn cancel_remaining_results<In, Out>(
  ctx: &ExecutionContext,
  input: &Inbound<Outcome<In>>,
  out: &Outbound<Outcome<Out>>,
) -> usize
where
  In: Send,
  Out: Send,
{
  if !ctx.is_process_remaining_enabled() {
    return 0;
  }
  let mut emitted = 0;
  while let Some(pending) = input.recv().await {
    if out.send(Outcome::cancel_from(&pending)).await.is_err() {
      break;
    }
    emitted += 1;
  }
  event!(Level::DEBUG, emitted, "Remaining inputs converted to cancellation markers.");
  emitted
}

/// Emits `broken(input)` for one pending input.
pub async fn cancel_remaining_value<In, Out>(
  ctx: &ExecutionContext,
  input: Outcome<In>,
  broken: &BrokenFn<In, Out>,
  out: &Outbound<Out>,
) -> usize
where
  In: Send,
  Out: Send,
{
  if !ctx.is_process_remaining_enabled() {
    return 0;
  }
  match out.send(broken(ctx, &input)).await {
    Ok(()) => 1,
    Err(_) => 0,
  }
}

/// Emits `broken(input)` for every input left in the stream, until it closes.
pub async fn cancel_remaining_values<In, Out>(
  ctx: &ExecutionContext,
  input: &Inbound<Outcome<In>>,
  broken: &BrokenFn<In, Out>,
  out: &Outbound<Out>,
) -> usize
where
  In: Send,
  Out: Send,
{
  if !ctx.is_process_remaining_enabled() {
    return 0;
  }
  let mut emitted = 0;
  while let Some(pending) = input.recv().await {
    if out.send(broken(ctx, &pending)).await.is_err() {
      break;
    }
    emitted += 1;
  }
  event!(Level::DEBUG, emitted, "Remaining inputs reduced with the broken handler.");
  emitted
}

/// Re-emits one value whose work is already done.
pub async fn cancel_result<T: Send>(ctx: &ExecutionContext, value: T, out: &Outbound<T>) -> usize {
  if !ctx.is_process_remaining_enabled() {
    return 0;
  }
  match out.send(value).await {
    Ok(()) => 1,
    Err(_) => 0,
  }
}

/// Re-emits every finished value left in the stream, until it closes.
pub async fn cancel_results<T: Send>(ctx: &ExecutionContext, input: &Inbound<T>, out: &Outbound<T>) -> usize {
  if !ctx.is_process_remaining_enabled() {
    return 0;
  }
  let mut emitted = 0;
  while let Some(value) = input.recv().await {
    if out.send(value).await.is_err() {
      break;
    }
    emitted += 1;
  }
  event!(Level::DEBUG, emitted, "Finished values passed through on cancellation.");
  emitted
}
