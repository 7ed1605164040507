// railyard/src/pipeline/finalizer.rs

//! The terminal stage: reduces every outcome to a plain value and forwards it.
//!
//! Reduction and forwarding run as two tasks joined by an internal buffer, so
//! cancellation is caught separately at each point:
//!  - while reducing, the interrupted outcome goes to `on_cancel_value` and the
//!    never-reduced backlog to `on_cancel_values`;
//!  - while forwarding, the interrupted value goes to `on_cancel_result` and the
//!    reduced-but-unforwarded backlog to `on_cancel_results`.

use crate::core::channel::{self, Inbound, Outbound};
use crate::core::context::ExecutionContext;
use crate::core::outcome::Outcome;
use crate::drain::{Discard, FinalizeCancelHandler};
use crate::error::RailError;
use std::sync::Arc;
use tracing::{event, instrument, Level};

type ValueFn<In, Out> = Arc<dyn Fn(&ExecutionContext, &In) -> Out + Send + Sync + 'static>;
type ErrorFn<Out> = Arc<dyn Fn(&ExecutionContext, &RailError) -> Out + Send + Sync + 'static>;

/// Observer fired after each value the finalizer forwards.
pub type ResultObserver<Out> = Arc<dyn Fn(&ExecutionContext, &Out) + Send + Sync + 'static>;

/// The three-way reduction. Handlers only see references, so reducing the
/// same outcome twice gives the same value.
pub struct FinallyHandlers<In, Out> {
  on_success: ValueFn<In, Out>,
  on_error: ErrorFn<Out>,
  on_cancel: ErrorFn<Out>,
}

impl<In, Out> Clone for FinallyHandlers<In, Out> {
  fn clone(&self) -> Self {
    Self {
      on_success: self.on_success.clone(),
      on_error: self.on_error.clone(),
      on_cancel: self.on_cancel.clone(),
    }
  }
}

impl<In, Out> FinallyHandlers<In, Out> {
  pub fn new(
    on_success: impl Fn(&ExecutionContext, &In) -> Out + Send + Sync + 'static,
    on_error: impl Fn(&ExecutionContext, &RailError) -> Out + Send + Sync + 'static,
    on_cancel: impl Fn(&ExecutionContext, &RailError) -> Out + Send + Sync + 'static,
  ) -> Self {
    Self {
      on_success: Arc::new(on_success),
      on_error: Arc::new(on_error),
      on_cancel: Arc::new(on_cancel),
    }
  }

  /// Reduces one outcome. Processed outcomes are reduced like any other.
  pub fn reduce(&self, ctx: &ExecutionContext, input: &Outcome<In>) -> Out {
    match input.as_std() {
      Ok(value) => (self.on_success)(ctx, value),
      Err(reason) if input.is_cancel() => (self.on_cancel)(ctx, reason),
      Err(err) => (self.on_error)(ctx, err),
    }
  }
}

/// Builder for the terminal stage. Defaults to [`Discard`] cancellation
/// handlers and no result observer.
pub struct Finalizer<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  handlers: FinallyHandlers<In, Out>,
  cancel_handlers: Arc<dyn FinalizeCancelHandler<In, Out>>,
  on_success_result: Option<ResultObserver<Out>>,
}

impl<In, Out> Finalizer<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  pub fn new(handlers: FinallyHandlers<In, Out>) -> Self {
    Self {
      handlers,
      cancel_handlers: Arc::new(Discard),
      on_success_result: None,
    }
  }

  pub fn with_cancel_handlers(mut self, cancel_handlers: impl FinalizeCancelHandler<In, Out>) -> Self {
    self.cancel_handlers = Arc::new(cancel_handlers);
    self
  }

  pub fn on_success_result(mut self, observer: impl Fn(&ExecutionContext, &Out) + Send + Sync + 'static) -> Self {
    let observer: ResultObserver<Out> = Arc::new(observer);
    self.on_success_result = Some(observer);
    self
  }

  /// Starts the reduce and forward tasks and returns the stream of values.
  ///
  /// Must be called from within a Tokio runtime.
  pub fn spawn(self, ctx: &ExecutionContext, input: Inbound<Outcome<In>>) -> Inbound<Out> {
    let buffer = ctx.options().buffer_size();
    let (reduced_tx, reduced) = channel::channel(buffer);
    let (out, output) = channel::channel(buffer);

    tokio::spawn(reduce(
      ctx.clone(),
      input,
      self.handlers,
      self.cancel_handlers.clone(),
      reduced_tx,
    ));
    tokio::spawn(forward(
      ctx.clone(),
      reduced,
      self.cancel_handlers,
      self.on_success_result,
      out,
    ));
    output
  }
}

/// Reduces `input` with `handlers`; interrupted work is handed to `cancel_handlers`.
pub fn finalize<In, Out>(
  ctx: &ExecutionContext,
  input: Inbound<Outcome<In>>,
  handlers: FinallyHandlers<In, Out>,
  cancel_handlers: impl FinalizeCancelHandler<In, Out>,
) -> Inbound<Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  Finalizer::new(handlers)
    .with_cancel_handlers(cancel_handlers)
    .spawn(ctx, input)
}

#[instrument(name = "finalizer::reduce", skip_all)]
async fn reduce<In, Out>(
  ctx: ExecutionContext,
  input: Inbound<Outcome<In>>,
  handlers: FinallyHandlers<In, Out>,
  cancel_handlers: Arc<dyn FinalizeCancelHandler<In, Out>>,
  reduced: Outbound<Out>,
) where
  In: Send + 'static,
  Out: Send + 'static,
{
  let mut count = 0usize;
  loop {
    let next = tokio::select! {
      biased;
      _ = ctx.cancelled() => {
        event!(Level::DEBUG, count, "Cancellation observed before reduction.");
        cancel_handlers.on_cancel_values(&ctx, &input, &reduced).await;
        break;
      }
      next = input.recv() => next,
    };
    let Some(next) = next else {
      break;
    };

    let value = handlers.reduce(&ctx, &next);
    if ctx.is_cancelled() {
      event!(Level::DEBUG, count, outcome_id = %next.id(), "Cancellation observed during reduction.");
      cancel_handlers.on_cancel_value(&ctx, next, &reduced).await;
      cancel_handlers.on_cancel_values(&ctx, &input, &reduced).await;
      break;
    }

    let permit = tokio::select! {
      biased;
      _ = ctx.cancelled() => {
        event!(Level::DEBUG, count, outcome_id = %next.id(), "Cancellation observed before hand-off.");
        cancel_handlers.on_cancel_value(&ctx, next, &reduced).await;
        cancel_handlers.on_cancel_values(&ctx, &input, &reduced).await;
        break;
      }
      permit = reduced.reserve() => permit,
    };
    match permit {
      Ok(permit) => permit.send(value),
      Err(_) => break,
    }
    count += 1;
  }
  event!(Level::DEBUG, count, "Reduction finished.");
}

#[instrument(name = "finalizer::forward", skip_all)]
async fn forward<In, Out>(
  ctx: ExecutionContext,
  reduced: Inbound<Out>,
  cancel_handlers: Arc<dyn FinalizeCancelHandler<In, Out>>,
  on_success_result: Option<ResultObserver<Out>>,
  out: Outbound<Out>,
) where
  In: Send + 'static,
  Out: Send + 'static,
{
  let mut forwarded = 0usize;
  loop {
    let next = tokio::select! {
      biased;
      _ = ctx.cancelled() => {
        event!(Level::DEBUG, forwarded, "Cancellation observed before forwarding.");
        cancel_handlers.on_cancel_results(&ctx, &reduced, &out).await;
        break;
      }
      next = reduced.recv() => next,
    };
    let Some(value) = next else {
      break;
    };

    let permit = tokio::select! {
      biased;
      _ = ctx.cancelled() => {
        event!(Level::DEBUG, forwarded, "Cancellation observed during forwarding.");
        cancel_handlers.on_cancel_result(&ctx, value, &out).await;
        cancel_handlers.on_cancel_results(&ctx, &reduced, &out).await;
        break;
      }
      permit = out.reserve() => permit,
    };
    let Ok(permit) = permit else {
      event!(Level::WARN, forwarded, "Finalizer output closed.");
      break;
    };
    if let Some(observer) = &on_success_result {
      observer(&ctx, &value);
    }
    permit.send(value);
    forwarded += 1;
  }
  event!(Level::DEBUG, forwarded, "Forwarding finished.");
}
