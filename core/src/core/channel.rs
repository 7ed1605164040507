// railyard/src/core/channel.rs

//! Stream plumbing: a receiver several workers can pull from, plus the small
//! source and sink helpers used to feed and drain pipelines.

use crate::core::context::ExecutionContext;
use crate::core::outcome::Outcome;
use crate::error::RailError;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{event, instrument, Level};

/// Sending half of a pipeline stream.
pub type Outbound<T> = mpsc::Sender<T>;

/// Receiving half of a pipeline stream, shareable between workers.
///
/// Each `recv` hands an item to exactly one caller. The stream is exhausted
/// when every sender is dropped and the buffer is empty.
pub struct Inbound<T> {
  receiver: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for Inbound<T> {
  fn clone(&self) -> Self {
    Self {
      receiver: self.receiver.clone(),
    }
  }
}

impl<T: Send> Inbound<T> {
  pub fn new(receiver: mpsc::Receiver<T>) -> Self {
    Self {
      receiver: Arc::new(Mutex::new(receiver)),
    }
  }

  /// Next item, or `None` once the stream is closed and empty.
  /// Cancel-safe: dropping the future never loses an item.
  pub async fn recv(&self) -> Option<T> {
    self.receiver.lock().await.recv().await
  }
}

impl<T: Send> From<mpsc::Receiver<T>> for Inbound<T> {
  fn from(receiver: mpsc::Receiver<T>) -> Self {
    Self::new(receiver)
  }
}

pub fn channel<T: Send>(capacity: usize) -> (Outbound<T>, Inbound<T>) {
  let (tx, rx) = mpsc::channel(capacity.max(1));
  (tx, Inbound::new(rx))
}

/// A closed stream already holding every value as a succeeded outcome.
pub fn preloaded<T: Send>(values: impl IntoIterator<Item = T>) -> Inbound<Outcome<T>> {
  preloaded_outcomes(values.into_iter().map(Outcome::success))
}

/// A closed stream already holding the given outcomes, in order.
pub fn preloaded_outcomes<T: Send>(outcomes: impl IntoIterator<Item = Outcome<T>>) -> Inbound<Outcome<T>> {
  let outcomes: Vec<_> = outcomes.into_iter().collect();
  let (tx, rx) = mpsc::channel(outcomes.len().max(1));
  for outcome in outcomes {
    // Capacity matches the item count, so this cannot be full.
    if tx.try_send(outcome).is_err() {
      break;
    }
  }
  Inbound::new(rx)
}

type SentFn<T> = Arc<dyn Fn(&ExecutionContext, &T) + Send + Sync + 'static>;
type UnsentFn<T> = Arc<dyn Fn(&ExecutionContext, &[T]) + Send + Sync + 'static>;

/// Builder for a producer task feeding values into a new stream.
///
/// The producer stops pulling values once `ctx` is cancelled. Values it never
/// sent go to `on_start_fail` when the context was already cancelled at start,
/// to `on_break` otherwise. With process-remaining enabled each unsent value
/// is also emitted as a cancelled outcome, so drains downstream count it.
pub struct Source<T> {
  on_start_fail: Option<UnsentFn<T>>,
  on_success: Option<SentFn<T>>,
  on_break: Option<UnsentFn<T>>,
}

impl<T> Default for Source<T> {
  fn default() -> Self {
    Self {
      on_start_fail: None,
      on_success: None,
      on_break: None,
    }
  }
}

impl<T: Send + 'static> Source<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on_start_fail(mut self, f: impl Fn(&ExecutionContext, &[T]) + Send + Sync + 'static) -> Self {
    self.on_start_fail = Some(Arc::new(f));
    self
  }

  /// Fires for each value handed downstream. Must not block.
  pub fn on_success(mut self, f: impl Fn(&ExecutionContext, &T) + Send + Sync + 'static) -> Self {
    self.on_success = Some(Arc::new(f));
    self
  }

  /// Receives the values left unsent when cancellation interrupts the producer.
  pub fn on_break(mut self, f: impl Fn(&ExecutionContext, &[T]) + Send + Sync + 'static) -> Self {
    self.on_break = Some(Arc::new(f));
    self
  }

  /// Starts the producer and returns its stream.
  ///
  /// Must be called from within a Tokio runtime.
  pub fn spawn<I>(self, ctx: &ExecutionContext, values: I) -> Inbound<Outcome<T>>
  where
    I: IntoIterator<Item = T> + Send + 'static,
    I::IntoIter: Send,
  {
    let (tx, rx) = channel(ctx.options().buffer_size());
    tokio::spawn(self.produce(ctx.clone(), values.into_iter(), tx));
    rx
  }

  #[instrument(name = "source", skip_all)]
  async fn produce<I>(self, ctx: ExecutionContext, mut values: I, tx: Outbound<Outcome<T>>)
  where
    I: Iterator<Item = T> + Send,
  {
    if ctx.is_cancelled() {
      let unsent: Vec<T> = values.collect();
      event!(Level::DEBUG, unsent = unsent.len(), "Source cancelled before start.");
      if let Some(on_start_fail) = &self.on_start_fail {
        on_start_fail(&ctx, &unsent);
      }
      cancel_unsent(&ctx, unsent.len(), &tx).await;
      return;
    }

    let mut sent = 0usize;
    while let Some(value) = values.next() {
      // Reserving first keeps `value` in hand if cancellation wins.
      let permit = tokio::select! {
        biased;
        _ = ctx.cancelled() => None,
        permit = tx.reserve() => Some(permit),
      };
      let permit = match permit {
        Some(Ok(permit)) => permit,
        Some(Err(_)) => {
          event!(Level::DEBUG, sent, "Source stopped: downstream closed.");
          return;
        }
        None => {
          let unsent: Vec<T> = std::iter::once(value).chain(values).collect();
          event!(Level::DEBUG, sent, unsent = unsent.len(), "Source stopped by cancellation.");
          if let Some(on_break) = &self.on_break {
            on_break(&ctx, &unsent);
          }
          cancel_unsent(&ctx, unsent.len(), &tx).await;
          return;
        }
      };
      if let Some(on_success) = &self.on_success {
        on_success(&ctx, &value);
      }
      permit.send(Outcome::success(value));
      sent += 1;
    }
    event!(Level::TRACE, sent, "Source exhausted.");
  }
}

// Emits one cancelled outcome per unsent value when process-remaining is enabled.
async fn cancel_unsent<T>(ctx: &ExecutionContext, unsent: usize, tx: &Outbound<Outcome<T>>) -> usize {
  if !ctx.is_process_remaining_enabled() {
    return 0;
  }
  let reason = ctx.reason().unwrap_or(RailError::Cancelled);
  let mut emitted = 0usize;
  for _ in 0..unsent {
    if tx.send(Outcome::cancel(reason.clone())).await.is_err() {
      break;
    }
    emitted += 1;
  }
  event!(Level::DEBUG, emitted, "Unsent values emitted as cancelled outcomes.");
  emitted
}

/// Feeds values into a new stream from a producer task with no handlers.
/// See [`Source`] for what happens to unsent values on cancellation.
pub fn from_values<T, I>(ctx: &ExecutionContext, values: I) -> Inbound<Outcome<T>>
where
  T: Send + 'static,
  I: IntoIterator<Item = T> + Send + 'static,
  I::IntoIter: Send,
{
  Source::new().spawn(ctx, values)
}

/// Collects every item until the stream closes. Does not stop on
/// cancellation, so markers flushed by drain handlers are observed.
pub async fn collect<T: Send>(inbound: Inbound<T>) -> Vec<T> {
  let mut items = Vec::new();
  while let Some(item) = inbound.recv().await {
    items.push(item);
  }
  items
}
