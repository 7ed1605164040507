// railyard/src/pipeline/locomotive.rs

//! The worker loop: pull one outcome, run it through the engine, forward the
//! result, until the input stream closes or the context is cancelled.
//!
//! Each of the three waits races the context and is biased toward
//! cancellation, so a cancelled context is always noticed at the next
//! checkpoint even when work is also ready. Once cancellation is observed the
//! worker runs its drain hooks exactly once and stops.

use crate::core::channel::{Inbound, Outbound};
use crate::core::context::ExecutionContext;
use crate::core::control::{LocomotiveState, Termination};
use crate::core::outcome::Outcome;
use crate::drain::CancelHandler;
use crate::engine::stage::Engine;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Observer fired after each successful forward. Must not block.
pub type SuccessObserver<Out> = Arc<dyn Fn(&ExecutionContext, &Outcome<Out>) + Send + Sync + 'static>;

/// Everything one worker needs, cloned per worker by the pool.
pub(crate) struct Locomotive<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  pub(crate) engine: Arc<dyn Engine<In, Out>>,
  pub(crate) handlers: Arc<dyn CancelHandler<In, Out>>,
  pub(crate) on_success: Option<SuccessObserver<Out>>,
}

impl<In, Out> Clone for Locomotive<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  fn clone(&self) -> Self {
    Self {
      engine: self.engine.clone(),
      handlers: self.handlers.clone(),
      on_success: self.on_success.clone(),
    }
  }
}

impl<In, Out> Locomotive<In, Out>
where
  In: Clone + Send + 'static,
  Out: Send + 'static,
{
  #[instrument(name = "locomotive", skip_all, fields(worker = worker))]
  pub(crate) async fn run(
    self,
    ctx: ExecutionContext,
    worker: usize,
    inbound: Inbound<Outcome<In>>,
    outbound: Outbound<Outcome<Out>>,
  ) -> Termination {
    event!(Level::DEBUG, "Worker started.");
    let mut forwarded = 0usize;

    let termination = loop {
      // Await-next.
      let input = tokio::select! {
        biased;
        _ = ctx.cancelled() => {
          break self.stop(&ctx, LocomotiveState::AwaitNext, &inbound, &outbound).await;
        }
        // An idle worker must not keep the input alive for a reader that is gone.
        _ = outbound.closed() => {
          event!(Level::WARN, forwarded, "Downstream closed; worker stopping.");
          break Termination::DownstreamClosed;
        }
        next = inbound.recv() => match next {
          Some(input) => input,
          None => break Termination::Exhausted,
        },
      };

      // Await-stage.
      let completion = self.engine.launch(&ctx, input.clone());
      let produced = tokio::select! {
        biased;
        _ = ctx.cancelled() => None,
        produced = completion => Some(produced),
      };
      let produced = match produced {
        Some(Some(produced)) => produced,
        Some(None) if !ctx.is_cancelled() => {
          event!(Level::WARN, outcome_id = %input.id(), "Stage closed its completion without a value.");
          break Termination::Abandoned;
        }
        // Cancelled while the stage ran, or the stage gave up because of it.
        _ => {
          self.handlers.on_cancel_unprocessed(&ctx, input, &outbound).await;
          break self.stop(&ctx, LocomotiveState::AwaitStage, &inbound, &outbound).await;
        }
      };

      // Await-forward. Reserving first keeps `produced` in hand if cancellation wins.
      let permit = tokio::select! {
        biased;
        _ = ctx.cancelled() => {
          self.handlers.on_cancel_processed(&ctx, input, produced, &outbound).await;
          break self.stop(&ctx, LocomotiveState::AwaitForward, &inbound, &outbound).await;
        }
        permit = outbound.reserve() => permit,
      };
      let Ok(permit) = permit else {
        event!(Level::WARN, forwarded, "Downstream closed; worker stopping.");
        break Termination::DownstreamClosed;
      };
      // The permit guarantees delivery, so the observer may run first.
      if let Some(on_success) = &self.on_success {
        on_success(&ctx, &produced);
      }
      permit.send(produced);
      forwarded += 1;
    };

    event!(Level::DEBUG, forwarded, termination = ?termination, "Worker terminated.");
    termination
  }

  // Whole-stream hook shared by every checkpoint.
  async fn stop(
    &self,
    ctx: &ExecutionContext,
    at: LocomotiveState,
    inbound: &Inbound<Outcome<In>>,
    outbound: &Outbound<Outcome<Out>>,
  ) -> Termination {
    event!(Level::DEBUG, checkpoint = ?at, reason = ?ctx.reason(), "Cancellation observed.");
    self.handlers.on_cancel(ctx, inbound, outbound).await;
    Termination::Cancelled(at)
  }
}
