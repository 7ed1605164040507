// railyard_core/examples/cancellation_drain.rs

use railyard::{collect, preloaded, ExecutionContext, Pool, RailError, RunOptions, Stage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), RailError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

  info!("--- Cancellation Drain Example ---");

  for process_remaining in [true, false] {
    let ctx = ExecutionContext::new().with_options(RunOptions::new().with_process_remaining(process_remaining));
    let forwarded = Arc::new(AtomicUsize::new(0));
    let tally = forwarded.clone();

    // Cancel the run once three results made it downstream.
    let output = Pool::new(Stage::map(|_ctx, v: u32| v * v))
      .single()
      .on_success(move |ctx, _out| {
        if tally.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
          ctx.cancel();
        }
      })
      .spawn(&ctx, preloaded(1..=10));
    let outcomes = collect(output).await;

    let markers = outcomes.iter().filter(|o| o.is_cancel()).count();
    info!(
      process_remaining,
      delivered = outcomes.len() - markers,
      markers,
      "Pipeline cancelled after three results."
    );
  }
  Ok(())
}
