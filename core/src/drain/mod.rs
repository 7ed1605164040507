// railyard/src/drain/mod.rs

//! What to emit for interrupted work when a pipeline is cancelled.
//!
//! Worker loops and the finalizer call into a handler at each cancellation
//! checkpoint. Handlers are injected: `Discard` drops everything,
//! `DrainPolicy` / `FinalizeDrain` apply the strategies in [`strategy`]
//! (gated by the context's process-remaining toggle), and
//! `CancellationHandlers` lets callers supply their own closures.

pub mod policy;
pub mod strategy;

use crate::core::channel::{Inbound, Outbound};
use crate::core::context::ExecutionContext;
use crate::core::outcome::Outcome;
use async_trait::async_trait;

pub use policy::{CancellationHandlers, Discard, DrainPolicy, FinalizeDrain};

/// Cancellation hooks of a worker loop. Every hook defaults to doing nothing.
#[async_trait]
pub trait CancelHandler<In, Out>: Send + Sync + 'static
where
  In: Send + 'static,
  Out: Send + 'static,
{
  /// Whole-stream hook, run last at every checkpoint. `input` still holds
  /// whatever the worker never pulled.
  async fn on_cancel(&self, _ctx: &ExecutionContext, _input: &Inbound<Outcome<In>>, _out: &Outbound<Outcome<Out>>) {}

  /// The worker pulled `unprocessed` but the stage did not finish.
  async fn on_cancel_unprocessed(
    &self,
    _ctx: &ExecutionContext,
    _unprocessed: Outcome<In>,
    _out: &Outbound<Outcome<Out>>,
  ) {
  }

  /// The stage produced `processed` from `input` but forwarding was cut short.
  async fn on_cancel_processed(
    &self,
    _ctx: &ExecutionContext,
    _input: Outcome<In>,
    _processed: Outcome<Out>,
    _out: &Outbound<Outcome<Out>>,
  ) {
  }
}

/// Cancellation hooks of the finalizer. Every hook defaults to doing nothing.
#[async_trait]
pub trait FinalizeCancelHandler<In, Out>: Send + Sync + 'static
where
  In: Send + 'static,
  Out: Send + 'static,
{
  /// Reduction of `input` was interrupted.
  async fn on_cancel_value(&self, _ctx: &ExecutionContext, _input: Outcome<In>, _out: &Outbound<Out>) {}

  /// Outcomes never reduced.
  async fn on_cancel_values(&self, _ctx: &ExecutionContext, _input: &Inbound<Outcome<In>>, _out: &Outbound<Out>) {}

  /// Forwarding of the already reduced `value` was interrupted.
  async fn on_cancel_result(&self, _ctx: &ExecutionContext, _value: Out, _out: &Outbound<Out>) {}

  /// Reduced values still buffered between reduction and forwarding.
  async fn on_cancel_results(&self, _ctx: &ExecutionContext, _backlog: &Inbound<Out>, _out: &Outbound<Out>) {}
}
