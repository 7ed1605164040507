// tests/pipeline_tests.rs
mod common;

use common::*;
use parking_lot::Mutex;
use railyard::{
  channel, collect, from_values, preloaded, preloaded_outcomes, run, run_single, turnout, AsyncStage,
  CancellationHandlers, Discard, ExecutionContext, Outcome, Pool, RailError, RunOptions, Source, Stage,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_doubles_with_three_workers() {
  setup_tracing();
  let ctx = ctx_with(3, false);
  let output = run(&ctx, preloaded(vec![1, 2, 3, 4, 5]), Stage::map(|_ctx, v: i32| v * 2));
  let outcomes = collect(output).await;

  assert_eq!(outcomes.len(), 5);
  assert_eq!(sorted(succeeded_values(&outcomes)), vec![2, 4, 6, 8, 10]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_worker_preserves_order() {
  setup_tracing();
  let ctx = ctx_with(8, false);
  let inputs: Vec<i32> = (0..50).collect();
  let stage = Stage::map(|_ctx, v: i32| {
    // Uneven work so an unordered pool would shuffle.
    std::thread::sleep(Duration::from_micros(((v % 3) * 200) as u64));
    v + 1
  });
  let outcomes = collect(run_single(&ctx, preloaded(inputs.clone()), stage)).await;

  let expected: Vec<i32> = inputs.iter().map(|v| v + 1).collect();
  assert_eq!(succeeded_values(&outcomes), expected);
}

#[tokio::test]
async fn test_failed_cancelled_and_processed_pass_through() {
  setup_tracing();
  let ctx = ExecutionContext::new();
  let calls = counter();
  let seen = calls.clone();

  let failed: Outcome<i32> = Outcome::fail(RailError::validation("bad row"));
  let cancelled: Outcome<i32> = Outcome::cancel(RailError::DeadlineExceeded);
  let processed = Outcome::success_and_processed(7);
  let ids = [failed.id(), cancelled.id(), processed.id()];

  let stage = Stage::map(move |_ctx, v: i32| {
    seen.fetch_add(1, Ordering::SeqCst);
    v * 100
  });
  let output = Pool::new(stage)
    .single()
    .spawn(&ctx, preloaded_outcomes(vec![failed, cancelled, processed, Outcome::success(1)]));
  let outcomes = collect(output).await;

  assert_eq!(outcomes.len(), 4);
  assert_eq!(outcomes[0].id(), ids[0]);
  assert_eq!(outcomes[0].err().map(|e| e.to_string()), Some("bad row".to_string()));
  assert!(!outcomes[0].is_cancel());
  assert_eq!(outcomes[1].id(), ids[1]);
  assert!(matches!(outcomes[1].err(), Some(RailError::DeadlineExceeded)));
  assert_eq!(outcomes[2].id(), ids[2]);
  assert_eq!(outcomes[2].result(), Some(&7));
  assert!(outcomes[2].is_processed());
  assert_eq!(outcomes[3].result(), Some(&100));
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_workers_is_raised_to_one() {
  setup_tracing();
  let ctx = ExecutionContext::new();
  let output = Pool::new(Stage::map(|_ctx, v: i32| v))
    .workers(0)
    .spawn(&ctx, preloaded(vec![1, 2, 3]));
  assert_eq!(succeeded_values(&collect(output).await), vec![1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_turnout_changes_element_type() {
  setup_tracing();
  let ctx = ctx_with(2, false);
  let parsed = turnout(
    &ctx,
    preloaded(vec!["1".to_string(), "x".to_string(), "3".to_string()]),
    Stage::try_map(|_ctx, raw: String| raw.parse::<i32>()),
  );
  let outcomes = collect(parsed).await;

  assert_eq!(outcomes.len(), 3);
  assert_eq!(sorted(succeeded_values(&outcomes)), vec![1, 3]);
  assert_eq!(outcomes.iter().filter(|o| o.is_failure() && !o.is_cancel()).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chained_pools_close_in_turn() {
  setup_tracing();
  let ctx = ctx_with(2, false);
  let doubled = run(&ctx, from_values(&ctx, 1..=20), Stage::map(|_ctx, v: i32| v * 2));
  let labelled = turnout(&ctx, doubled, Stage::map(|_ctx, v: i32| format!("v{v}")));
  let outcomes = collect(labelled).await;
  assert_eq!(outcomes.len(), 20);
  assert!(outcomes.iter().all(|o| o.result().map_or(false, |s| s.starts_with('v'))));
}

#[tokio::test]
async fn test_drain_enabled_emits_markers_for_the_rest() {
  setup_tracing();
  let ctx = ctx_with(1, true);
  let forwarded = counter();
  let tally = forwarded.clone();
  let output = Pool::new(Stage::map(|_ctx, v: i32| v))
    .on_success(move |ctx, _out| {
      if tally.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
        ctx.cancel();
      }
    })
    .spawn(&ctx, preloaded(1..=10));
  let outcomes = collect(output).await;

  assert_eq!(outcomes.len(), 10);
  assert_eq!(succeeded_values(&outcomes), vec![1, 2, 3]);
  assert_eq!(cancelled_count(&outcomes), 7);
  assert!(outcomes[3..].iter().all(|o| matches!(o.err(), Some(RailError::Cancelled))));
}

#[tokio::test]
async fn test_drain_disabled_drops_the_rest() {
  setup_tracing();
  let ctx = ctx_with(1, false);
  let forwarded = counter();
  let tally = forwarded.clone();
  let output = Pool::new(Stage::map(|_ctx, v: i32| v))
    .on_success(move |ctx, _out| {
      if tally.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
        ctx.cancel();
      }
    })
    .spawn(&ctx, preloaded(1..=10));
  let outcomes = collect(output).await;

  assert!(outcomes.len() < 10);
  assert_eq!(succeeded_values(&outcomes), vec![1, 2, 3]);
  assert_eq!(cancelled_count(&outcomes), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_drain_accounts_for_every_input_across_workers() {
  setup_tracing();
  let ctx = ctx_with(4, true);
  let forwarded = counter();
  let tally = forwarded.clone();
  let stage = Stage::map(|_ctx, v: i32| {
    std::thread::sleep(Duration::from_millis(2));
    v
  });
  let output = Pool::new(stage)
    .on_success(move |ctx, _out| {
      if tally.fetch_add(1, Ordering::SeqCst) + 1 == 5 {
        ctx.cancel();
      }
    })
    .spawn(&ctx, preloaded(1..=40));
  let outcomes = collect(output).await;

  let succeeded = succeeded_values(&outcomes).len();
  assert!(succeeded >= 5);
  assert_eq!(succeeded + cancelled_count(&outcomes), 40);
}

#[tokio::test]
async fn test_cancel_while_forwarding_passes_output_through() {
  setup_tracing();
  let ctx = ctx_with(1, true);
  let computed = counter();
  let tally = computed.clone();
  let stage = Stage::map(move |_ctx, v: i32| {
    tally.fetch_add(1, Ordering::SeqCst);
    v * 10
  });
  // Nobody reads yet: the first output fills the buffer, the second waits to be forwarded.
  let output = Pool::new(stage).spawn(&ctx, preloaded(1..=4));
  assert!(wait_for(&computed, 2).await);
  tokio::time::sleep(Duration::from_millis(20)).await;
  ctx.cancel();

  let outcomes = collect(output).await;
  assert_eq!(outcomes.len(), 4);
  assert_eq!(succeeded_values(&outcomes), vec![10, 20]);
  assert_eq!(cancelled_count(&outcomes), 2);
  assert_eq!(computed.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_custom_handlers_see_the_interrupted_input() {
  setup_tracing();
  let ctx = ctx_with(1, false);
  let leftovers = counter();
  let seen = leftovers.clone();

  let handlers = CancellationHandlers::<i32, i32>::new()
    .on_cancel_unprocessed(|_ctx, unprocessed, out| async move {
      let _ = out.send(Outcome::cancel_from(&unprocessed)).await;
    })
    .on_cancel(move |_ctx, input, _out| {
      let seen = seen.clone();
      async move {
        while input.recv().await.is_some() {
          seen.fetch_add(1, Ordering::SeqCst);
        }
      }
    });
  let stage = AsyncStage::switch(|_ctx, v: i32| async move {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Outcome::success(v)
  });
  let output = Pool::new(stage).with_handlers(handlers).spawn(&ctx, preloaded(vec![1, 2, 3]));
  tokio::time::sleep(Duration::from_millis(20)).await;
  ctx.cancel();

  let outcomes = collect(output).await;
  assert_eq!(outcomes.len(), 1);
  assert!(outcomes[0].is_cancel());
  assert_eq!(leftovers.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_discard_ignores_process_remaining() {
  setup_tracing();
  let ctx = ctx_with(1, true);
  ctx.cancel();
  let output = Pool::new(Stage::map(|_ctx, v: i32| v))
    .with_handlers(Discard)
    .spawn(&ctx, preloaded(1..=5));
  assert!(collect(output).await.is_empty());
}

#[tokio::test]
async fn test_already_cancelled_context_drains_everything() {
  setup_tracing();
  let ctx = ctx_with(2, true);
  ctx.cancel_with(RailError::DeadlineExceeded);
  let output = Pool::new(Stage::map(|_ctx, v: i32| v)).spawn(&ctx, preloaded(1..=6));
  let outcomes = collect(output).await;
  assert_eq!(cancelled_count(&outcomes), 6);
}

#[tokio::test]
async fn test_from_values_stops_on_cancellation() {
  setup_tracing();
  let ctx = ExecutionContext::new().with_options(RunOptions::new().with_buffer(1));
  let source = from_values(&ctx, 0..1_000_000);
  let first = source.recv().await;
  assert!(first.is_some());
  ctx.cancel();
  let rest = collect(source).await;
  assert!(rest.len() < 10);
}

#[tokio::test]
async fn test_source_unsent_values_become_markers() {
  setup_tracing();
  let ctx = ctx_with(1, true);
  let forwarded = counter();
  let tally = forwarded.clone();
  let output = Pool::new(Stage::map(|_ctx, v: i32| v))
    .on_success(move |ctx, _out| {
      if tally.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
        ctx.cancel();
      }
    })
    .spawn(&ctx, from_values(&ctx, 1..=10));
  let outcomes = collect(output).await;

  assert_eq!(outcomes.len(), 10);
  assert_eq!(succeeded_values(&outcomes), vec![1, 2, 3]);
  assert_eq!(cancelled_count(&outcomes), 7);
  assert!(outcomes[3..].iter().all(|o| matches!(o.err(), Some(RailError::Cancelled))));
}

#[tokio::test]
async fn test_source_handlers_see_sent_and_unsent_values() {
  setup_tracing();
  let ctx = ExecutionContext::new().with_options(RunOptions::new().with_buffer(1));
  let sent = counter();
  let tally = sent.clone();
  let unsent = Arc::new(Mutex::new(Vec::new()));
  let rest = unsent.clone();

  let source = Source::new()
    .on_success(move |_ctx, _v: &i32| {
      tally.fetch_add(1, Ordering::SeqCst);
    })
    .on_break(move |_ctx, values: &[i32]| rest.lock().extend_from_slice(values))
    .spawn(&ctx, 1..=10);
  assert!(source.recv().await.is_some());
  ctx.cancel();
  let received = 1 + collect(source).await.len();

  let sent = sent.load(Ordering::SeqCst);
  let unsent = unsent.lock().clone();
  assert_eq!(received, sent);
  assert_eq!(sent + unsent.len(), 10);
  let expected: Vec<i32> = ((sent as i32 + 1)..=10).collect();
  assert_eq!(unsent, expected);
}

#[tokio::test]
async fn test_source_on_cancelled_context_reports_start_failure() {
  setup_tracing();
  let ctx = ctx_with(1, true);
  ctx.cancel_with(RailError::DeadlineExceeded);
  let unsent = counter();
  let seen = unsent.clone();
  let broke = counter();
  let tally = broke.clone();

  let source = Source::new()
    .on_start_fail(move |_ctx, values: &[i32]| {
      seen.fetch_add(values.len(), Ordering::SeqCst);
    })
    .on_break(move |_ctx, _values: &[i32]| {
      tally.fetch_add(1, Ordering::SeqCst);
    })
    .spawn(&ctx, vec![1, 2, 3, 4, 5]);
  let outcomes = collect(source).await;

  assert_eq!(unsent.load(Ordering::SeqCst), 5);
  assert_eq!(broke.load(Ordering::SeqCst), 0);
  assert_eq!(outcomes.len(), 5);
  assert!(outcomes.iter().all(|o| matches!(o.err(), Some(RailError::DeadlineExceeded))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dropped_output_releases_the_input() {
  setup_tracing();
  let ctx = ctx_with(3, false);
  let (tx, input) = channel::<Outcome<i32>>(1);
  let output = Pool::new(Stage::map(|_ctx, v: i32| v)).spawn(&ctx, input);

  tx.send(Outcome::success(1)).await.unwrap();
  drop(output);

  // Every worker stops, so the last handle on the input goes away.
  let released = tokio::time::timeout(Duration::from_secs(2), tx.closed()).await;
  assert!(released.is_ok());
  assert!(tx.is_closed());
}

#[tokio::test]
async fn test_shared_inbound_hands_each_item_out_once() {
  let (tx, rx) = channel::<i32>(4);
  let other = rx.clone();
  for v in 0..4 {
    tx.send(v).await.unwrap();
  }
  drop(tx);
  let mut seen = vec![rx.recv().await.unwrap(), other.recv().await.unwrap()];
  seen.extend(collect(other).await);
  assert_eq!(sorted(seen), vec![0, 1, 2, 3]);
  assert!(rx.recv().await.is_none());
}
