// railyard/src/pipeline/pool.rs

//! The worker pool: N worker loops sharing one input and one output stream.
//!
//! The output stream closes only after every worker has been joined. With
//! more than one worker the output order is whatever order workers finish in;
//! a single worker preserves input order.

use crate::core::channel::{self, Inbound, Outbound};
use crate::core::context::ExecutionContext;
use crate::core::control::Termination;
use crate::core::outcome::Outcome;
use crate::drain::{CancelHandler, DrainPolicy};
use crate::engine::stage::Engine;
use crate::pipeline::locomotive::{Locomotive, SuccessObserver};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{event, Level};

/// Builder for a pool of worker loops around one engine.
///
/// Defaults: the context's worker count, [`DrainPolicy`] cancellation
/// handlers (which do nothing unless the context enables process-remaining)
/// and no success observer.
pub struct Pool<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  locomotive: Locomotive<In, Out>,
  workers: Option<usize>,
}

impl<In, Out> Pool<In, Out>
where
  In: Clone + Send + 'static,
  Out: Send + 'static,
{
  pub fn new(engine: impl Engine<In, Out>) -> Self {
    Self::from_engine(Arc::new(engine))
  }

  pub fn from_engine(engine: Arc<dyn Engine<In, Out>>) -> Self {
    Self {
      locomotive: Locomotive {
        engine,
        handlers: Arc::new(DrainPolicy),
        on_success: None,
      },
      workers: None,
    }
  }

  pub fn with_handlers(mut self, handlers: impl CancelHandler<In, Out>) -> Self {
    self.locomotive.handlers = Arc::new(handlers);
    self
  }

  pub fn on_success(mut self, observer: impl Fn(&ExecutionContext, &Outcome<Out>) + Send + Sync + 'static) -> Self {
    let observer: SuccessObserver<Out> = Arc::new(observer);
    self.locomotive.on_success = Some(observer);
    self
  }

  /// Overrides the context's worker count. Zero is raised to one.
  pub fn workers(mut self, workers: usize) -> Self {
    self.workers = Some(workers);
    self
  }

  /// One worker: outputs keep input order.
  pub fn single(self) -> Self {
    self.workers(1)
  }

  fn worker_count(&self, ctx: &ExecutionContext) -> usize {
    let requested = self.workers.unwrap_or_else(|| ctx.default_worker_count());
    if requested == 0 {
      event!(Level::WARN, "Worker count of 0 requested; running 1 worker.");
      return 1;
    }
    requested
  }

  /// Starts the workers and returns the output stream.
  ///
  /// Must be called from within a Tokio runtime.
  pub fn spawn(&self, ctx: &ExecutionContext, input: Inbound<Outcome<In>>) -> Inbound<Outcome<Out>> {
    let workers = self.worker_count(ctx);
    let (outbound, output) = channel::channel(ctx.options().buffer_size());

    let mut set = JoinSet::new();
    for worker in 0..workers {
      let locomotive = self.locomotive.clone();
      set.spawn(locomotive.run(ctx.clone(), worker, input.clone(), outbound.clone()));
    }
    event!(Level::DEBUG, workers, "Worker pool started.");

    tokio::spawn(supervise(set, outbound));
    output
  }
}

// Joins every worker, then drops the last sender so the output stream closes.
async fn supervise<Out: Send + 'static>(mut set: JoinSet<Termination>, outbound: Outbound<Outcome<Out>>) {
  let mut cancelled = 0usize;
  while let Some(joined) = set.join_next().await {
    match joined {
      Ok(termination) => {
        if termination.is_cancelled() {
          cancelled += 1;
        }
      }
      Err(err) => event!(Level::ERROR, error = %err, "Worker task failed."),
    }
  }
  drop(outbound);
  event!(Level::DEBUG, cancelled, "Worker pool joined; output closed.");
}

/// Runs a same-type stage with the context's worker count.
pub fn run<T>(ctx: &ExecutionContext, input: Inbound<Outcome<T>>, engine: impl Engine<T, T>) -> Inbound<Outcome<T>>
where
  T: Clone + Send + 'static,
{
  Pool::new(engine).spawn(ctx, input)
}

/// Runs a stage that changes the element type, with the context's worker count.
pub fn turnout<In, Out>(
  ctx: &ExecutionContext,
  input: Inbound<Outcome<In>>,
  engine: impl Engine<In, Out>,
) -> Inbound<Outcome<Out>>
where
  In: Clone + Send + 'static,
  Out: Send + 'static,
{
  Pool::new(engine).spawn(ctx, input)
}

/// Runs a same-type stage on a single worker, preserving input order.
pub fn run_single<T>(ctx: &ExecutionContext, input: Inbound<Outcome<T>>, engine: impl Engine<T, T>) -> Inbound<Outcome<T>>
where
  T: Clone + Send + 'static,
{
  Pool::new(engine).single().spawn(ctx, input)
}
