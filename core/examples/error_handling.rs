// railyard_core/examples/error_handling.rs

use railyard::{collect, finalize, preloaded, turnout, Discard, ExecutionContext, FinallyHandlers, RailError, Stage};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
enum ParseError {
  #[error("'{0}' is not a number")]
  NotANumber(String),
}

#[tokio::main]
async fn main() -> Result<(), RailError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Error Handling Example ---");
  let ctx = ExecutionContext::new().with_worker_options(2);

  let raw = preloaded(vec!["4", "oops", "-2", "10"].into_iter().map(String::from));

  // Failures from one stage ride through the next one untouched.
  let parsed = turnout(
    &ctx,
    raw,
    Stage::try_map(|_ctx, s: String| s.parse::<i64>().map_err(|_| ParseError::NotANumber(s.clone()))),
  );
  let checked = turnout(
    &ctx,
    parsed,
    Stage::validate(|_ctx, v: &i64| if *v < 0 { Err(format!("{v} is negative")) } else { Ok(()) }),
  );

  let handlers = FinallyHandlers::new(
    |_ctx, v: &i64| format!("ok: {v}"),
    |_ctx, err: &RailError| {
      warn!(error = %err, "Item failed.");
      format!("failed: {err}")
    },
    |_ctx, reason: &RailError| format!("cancelled: {reason}"),
  );
  let mut report = collect(finalize(&ctx, checked, handlers, Discard)).await;
  report.sort();
  for line in &report {
    info!("{}", line);
  }
  Ok(())
}
