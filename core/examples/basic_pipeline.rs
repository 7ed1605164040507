// railyard_core/examples/basic_pipeline.rs

use railyard::{collect, finalize, from_values, run, Discard, ExecutionContext, FinallyHandlers, RailError, RunOptions, Stage};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), RailError> {
  // Initialize tracing (optional, for demonstration)
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Pipeline Example ---");

  // 1. Options come from RAILYARD_* variables when set; four workers otherwise.
  let options = RunOptions::from_env()?;
  let ctx = ExecutionContext::new().with_options(options.with_max_workers(options.worker_max_count(4)));

  // 2. A source stream of succeeded outcomes.
  let input = from_values(&ctx, 1..=10);

  // 3. Two stages, each run by a pool of workers.
  let doubled = run(&ctx, input, Stage::map(|_ctx, v: i32| v * 2));
  let logged = run(
    &ctx,
    doubled,
    Stage::tee(|_ctx, v: &i32| info!(value = *v, "Doubled value ready.")),
  );

  // 4. Reduce outcomes back to plain values.
  let handlers = FinallyHandlers::new(|_ctx, v: &i32| *v, |_ctx, _err| 0, |_ctx, _reason| 0);
  let mut values = collect(finalize(&ctx, logged, handlers, Discard)).await;
  values.sort();

  info!("Final values: {:?}", values);
  assert_eq!(values, (1..=10).map(|v| v * 2).collect::<Vec<_>>());
  Ok(())
}
