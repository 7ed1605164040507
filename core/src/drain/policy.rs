// railyard/src/drain/policy.rs

//! Ready-made cancellation handlers.

use crate::core::channel::{Inbound, Outbound};
use crate::core::context::ExecutionContext;
use crate::core::outcome::Outcome;
use crate::drain::strategy::{self, BrokenFn};
use crate::drain::{CancelHandler, FinalizeCancelHandler};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Drops interrupted work silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl<In, Out> CancelHandler<In, Out> for Discard
where
  In: Send + 'static,
  Out: Send + 'static,
{
}

impl<In, Out> FinalizeCancelHandler<In, Out> for Discard
where
  In: Send + 'static,
  Out: Send + 'static,
{
}

/// Worker-loop drain: pending inputs become cancellation markers and an
/// output that was already produced is passed through. Does nothing unless
/// the context enables process-remaining.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainPolicy;

#[async_trait]
impl<In, Out> CancelHandler<In, Out> for DrainPolicy
where
  In: Send + 'static,
  Out: Send + 'static,
{
  async fn on_cancel(&self, ctx: &ExecutionContext, input: &Inbound<Outcome<In>>, out: &Outbound<Outcome<Out>>) {
    strategy::cancel_remaining_results(ctx, input, out).await;
  }

  async fn on_cancel_unprocessed(&self, ctx: &ExecutionContext, unprocessed: Outcome<In>, out: &Outbound<Outcome<Out>>) {
    strategy::cancel_remaining_result(ctx, unprocessed, out).await;
  }

  async fn on_cancel_processed(
    &self,
    ctx: &ExecutionContext,
    _input: Outcome<In>,
    processed: Outcome<Out>,
    out: &Outbound<Outcome<Out>>,
  ) {
    strategy::cancel_result(ctx, processed, out).await;
  }
}

/// Finalizer drain: interrupted or never-reduced outcomes go through the
/// `broken` reducer, already reduced values are passed through.
pub struct FinalizeDrain<In, Out> {
  broken: BrokenFn<In, Out>,
}

impl<In, Out> FinalizeDrain<In, Out> {
  pub fn new(broken: impl Fn(&ExecutionContext, &Outcome<In>) -> Out + Send + Sync + 'static) -> Self {
    Self {
      broken: Arc::new(broken),
    }
  }
}

impl<In, Out> Clone for FinalizeDrain<In, Out> {
  fn clone(&self) -> Self {
    Self {
      broken: self.broken.clone(),
    }
  }
}

#[async_trait]
impl<In, Out> FinalizeCancelHandler<In, Out> for FinalizeDrain<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  async fn on_cancel_value(&self, ctx: &ExecutionContext, input: Outcome<In>, out: &Outbound<Out>) {
    strategy::cancel_remaining_value(ctx, input, &self.broken, out).await;
  }

  async fn on_cancel_values(&self, ctx: &ExecutionContext, input: &Inbound<Outcome<In>>, out: &Outbound<Out>) {
    strategy::cancel_remaining_values(ctx, input, &self.broken, out).await;
  }

  async fn on_cancel_result(&self, ctx: &ExecutionContext, value: Out, out: &Outbound<Out>) {
    strategy::cancel_result(ctx, value, out).await;
  }

  async fn on_cancel_results(&self, ctx: &ExecutionContext, backlog: &Inbound<Out>, out: &Outbound<Out>) {
    strategy::cancel_results(ctx, backlog, out).await;
  }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type StreamHook<In, Out> =
  Arc<dyn Fn(ExecutionContext, Inbound<Outcome<In>>, Outbound<Outcome<Out>>) -> HandlerFuture + Send + Sync>;
type UnprocessedHook<In, Out> = Arc<dyn Fn(ExecutionContext, Outcome<In>, Outbound<Outcome<Out>>) -> HandlerFuture + Send + Sync>;
type ProcessedHook<In, Out> =
  Arc<dyn Fn(ExecutionContext, Outcome<In>, Outcome<Out>, Outbound<Outcome<Out>>) -> HandlerFuture + Send + Sync>;

/// Caller-supplied closures for the worker-loop hooks. Unset hooks do nothing.
///
/// Closures receive owned handles (context, streams) and return a future, so
/// they can `.await` sends without borrowing from the worker.
pub struct CancellationHandlers<In, Out> {
  on_cancel: Option<StreamHook<In, Out>>,
  on_cancel_unprocessed: Option<UnprocessedHook<In, Out>>,
  on_cancel_processed: Option<ProcessedHook<In, Out>>,
}

impl<In, Out> Default for CancellationHandlers<In, Out> {
  fn default() -> Self {
    Self {
      on_cancel: None,
      on_cancel_unprocessed: None,
      on_cancel_processed: None,
    }
  }
}

impl<In, Out> Clone for CancellationHandlers<In, Out> {
  fn clone(&self) -> Self {
    Self {
      on_cancel: self.on_cancel.clone(),
      on_cancel_unprocessed: self.on_cancel_unprocessed.clone(),
      on_cancel_processed: self.on_cancel_processed.clone(),
    }
  }
}

impl<In, Out> CancellationHandlers<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on_cancel<F>(mut self, hook: impl Fn(ExecutionContext, Inbound<Outcome<In>>, Outbound<Outcome<Out>>) -> F + Send + Sync + 'static) -> Self
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let hook: StreamHook<In, Out> = Arc::new(move |ctx: ExecutionContext, input: Inbound<Outcome<In>>, out: Outbound<Outcome<Out>>| -> HandlerFuture { Box::pin(hook(ctx, input, out)) });
    self.on_cancel = Some(hook);
    self
  }

  pub fn on_cancel_unprocessed<F>(mut self, hook: impl Fn(ExecutionContext, Outcome<In>, Outbound<Outcome<Out>>) -> F + Send + Sync + 'static) -> Self
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let hook: UnprocessedHook<In, Out> =
      Arc::new(move |ctx: ExecutionContext, unprocessed: Outcome<In>, out: Outbound<Outcome<Out>>| -> HandlerFuture { Box::pin(hook(ctx, unprocessed, out)) });
    self.on_cancel_unprocessed = Some(hook);
    self
  }

  pub fn on_cancel_processed<F>(
    mut self,
    hook: impl Fn(ExecutionContext, Outcome<In>, Outcome<Out>, Outbound<Outcome<Out>>) -> F + Send + Sync + 'static,
  ) -> Self
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let hook: ProcessedHook<In, Out> =
      Arc::new(
      move |ctx: ExecutionContext, input: Outcome<In>, processed: Outcome<Out>, out: Outbound<Outcome<Out>>| -> HandlerFuture { Box::pin(hook(ctx, input, processed, out)) },
    );
    self.on_cancel_processed = Some(hook);
    self
  }
}

#[async_trait]
impl<In, Out> CancelHandler<In, Out> for CancellationHandlers<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  async fn on_cancel(&self, ctx: &ExecutionContext, input: &Inbound<Outcome<In>>, out: &Outbound<Outcome<Out>>) {
    if let Some(hook) = &self.on_cancel {
      hook(ctx.clone(), input.clone(), out.clone()).await;
    }
  }

  async fn on_cancel_unprocessed(&self, ctx: &ExecutionContext, unprocessed: Outcome<In>, out: &Outbound<Outcome<Out>>) {
    if let Some(hook) = &self.on_cancel_unprocessed {
      hook(ctx.clone(), unprocessed, out.clone()).await;
    }
  }

  async fn on_cancel_processed(
    &self,
    ctx: &ExecutionContext,
    input: Outcome<In>,
    processed: Outcome<Out>,
    out: &Outbound<Outcome<Out>>,
  ) {
    if let Some(hook) = &self.on_cancel_processed {
      hook(ctx.clone(), input, processed, out.clone()).await;
    }
  }
}
