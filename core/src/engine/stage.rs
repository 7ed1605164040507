// railyard/src/engine/stage.rs

//! Defines the `Engine` seam the worker loop drives, and the `Stage` /
//! `AsyncStage` factories that build engines from caller functions.
//!
//! Every factory routes its input first (see [`Outcome::route`]): failed,
//! cancelled and processed outcomes bypass the caller's function and are
//! forwarded unchanged.

use crate::core::context::ExecutionContext;
use crate::core::outcome::Outcome;
use crate::engine::adapter::{self, Completion, OnCancel, StepFn};
use crate::error::RailError;
use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;

/// A unit of work the worker loop launches once per pulled input.
pub trait Engine<In, Out>: Send + Sync + 'static {
  fn launch(&self, ctx: &ExecutionContext, input: Outcome<In>) -> Completion<Out>;
}

impl<In, Out, F> Engine<In, Out> for F
where
  F: Fn(&ExecutionContext, Outcome<In>) -> Completion<Out> + Send + Sync + 'static,
{
  fn launch(&self, ctx: &ExecutionContext, input: Outcome<In>) -> Completion<Out> {
    self(ctx, input)
  }
}

/// A synchronous step launched through [`adapter::launch`].
pub struct Stage<In, Out> {
  step: StepFn<In, Out>,
  on_cancel: Option<OnCancel<In>>,
}

impl<In, Out> Clone for Stage<In, Out> {
  fn clone(&self) -> Self {
    Self {
      step: self.step.clone(),
      on_cancel: self.on_cancel.clone(),
    }
  }
}

impl<In, Out> Stage<In, Out>
where
  In: Clone + Send + 'static,
  Out: Send + 'static,
{
  /// Raw outcome-to-outcome step. No routing is applied: the step sees every
  /// input, including failed, cancelled and processed ones.
  pub fn from_fn(step: impl Fn(&ExecutionContext, Outcome<In>) -> Outcome<Out> + Send + Sync + 'static) -> Self {
    Self {
      step: Arc::new(step),
      on_cancel: None,
    }
  }

  /// Continues the railway with an outcome-returning function.
  pub fn switch(f: impl Fn(&ExecutionContext, In) -> Outcome<Out> + Send + Sync + 'static) -> Self {
    Self::from_fn(move |ctx, input| match input.route::<Out>() {
      ControlFlow::Continue(value) => f(ctx, value),
      ControlFlow::Break(bypass) => bypass,
    })
  }

  /// Transforms the succeeded value.
  pub fn map(f: impl Fn(&ExecutionContext, In) -> Out + Send + Sync + 'static) -> Self {
    Self::switch(move |ctx, value| Outcome::success(f(ctx, value)))
  }

  /// Runs a fallible function. Any returned error becomes a failed outcome.
  pub fn try_map<E>(f: impl Fn(&ExecutionContext, In) -> Result<Out, E> + Send + Sync + 'static) -> Self
  where
    E: Into<anyhow::Error>,
  {
    Self::switch(move |ctx, value| match f(ctx, value) {
      Ok(out) => Outcome::success(out),
      Err(err) => failure(err.into()),
    })
  }

  pub fn with_on_cancel(mut self, on_cancel: impl Fn(&ExecutionContext, &Outcome<In>) + Send + Sync + 'static) -> Self {
    self.on_cancel = Some(Arc::new(on_cancel));
    self
  }
}

impl<T> Stage<T, T>
where
  T: Clone + Send + 'static,
{
  /// Keeps a succeeded value when `f` accepts it, fails it with
  /// `RailError::Validation` otherwise.
  pub fn validate(f: impl Fn(&ExecutionContext, &T) -> Result<(), String> + Send + Sync + 'static) -> Self {
    Self::from_fn(move |ctx, input| {
      let verdict = input
        .result()
        .filter(|_| !input.is_processed())
        .map(|value| f(ctx, value));
      match verdict {
        Some(Err(message)) => Outcome::fail(RailError::Validation(message)),
        _ => input,
      }
    })
  }

  /// Runs a side effect on a succeeded value; the outcome passes unchanged.
  pub fn tee(f: impl Fn(&ExecutionContext, &T) + Send + Sync + 'static) -> Self {
    Self::from_fn(move |ctx, input| {
      if !input.is_processed() {
        if let Some(value) = input.result() {
          f(ctx, value);
        }
      }
      input
    })
  }
}

impl<In, Out> Engine<In, Out> for Stage<In, Out>
where
  In: Clone + Send + 'static,
  Out: Send + 'static,
{
  fn launch(&self, ctx: &ExecutionContext, input: Outcome<In>) -> Completion<Out> {
    adapter::launch(ctx, input, self.step.clone(), self.on_cancel.clone())
  }
}

// Only the context cancels; an error the caller returns is always a failure.
fn failure<Out>(err: anyhow::Error) -> Outcome<Out> {
  Outcome::fail(RailError::from(err))
}

type AsyncStepFn<In, Out> =
  Arc<dyn Fn(ExecutionContext, In) -> Pin<Box<dyn Future<Output = Outcome<Out>> + Send>> + Send + Sync + 'static>;

/// An asynchronous step launched through [`adapter::launch_async`].
/// Use it for stages that await I/O rather than burn CPU.
pub struct AsyncStage<In, Out> {
  step: AsyncStepFn<In, Out>,
  on_cancel: Option<OnCancel<In>>,
}

impl<In, Out> Clone for AsyncStage<In, Out> {
  fn clone(&self) -> Self {
    Self {
      step: self.step.clone(),
      on_cancel: self.on_cancel.clone(),
    }
  }
}

impl<In, Out> AsyncStage<In, Out>
where
  In: Clone + Send + 'static,
  Out: Send + 'static,
{
  pub fn switch<F, Fut>(f: F) -> Self
  where
    F: Fn(ExecutionContext, In) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<Out>> + Send + 'static,
  {
    let step: AsyncStepFn<In, Out> = Arc::new(move |ctx: ExecutionContext, value: In| {
      let fut: Pin<Box<dyn Future<Output = Outcome<Out>> + Send>> = Box::pin(f(ctx, value));
      fut
    });
    Self { step, on_cancel: None }
  }

  pub fn try_map<F, Fut, E>(f: F) -> Self
  where
    F: Fn(ExecutionContext, In) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, E>> + Send + 'static,
    E: Into<anyhow::Error> + 'static,
  {
    let f = Arc::new(f);
    Self::switch(move |ctx, value| {
      let f = f.clone();
      async move {
        match f(ctx, value).await {
          Ok(out) => Outcome::success(out),
          Err(err) => failure(err.into()),
        }
      }
    })
  }

  pub fn with_on_cancel(mut self, on_cancel: impl Fn(&ExecutionContext, &Outcome<In>) + Send + Sync + 'static) -> Self {
    self.on_cancel = Some(Arc::new(on_cancel));
    self
  }
}

impl<In, Out> Engine<In, Out> for AsyncStage<In, Out>
where
  In: Clone + Send + 'static,
  Out: Send + 'static,
{
  fn launch(&self, ctx: &ExecutionContext, input: Outcome<In>) -> Completion<Out> {
    let step = self.step.clone();
    adapter::launch_async(
      ctx,
      input,
      move |ctx, input| async move {
        match input.route::<Out>() {
          ControlFlow::Continue(value) => step(ctx, value).await,
          ControlFlow::Break(bypass) => bypass,
        }
      },
      self.on_cancel.clone(),
    )
  }
}
