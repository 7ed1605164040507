// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use railyard::{ExecutionContext, Outcome, RunOptions};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use tracing::Level;

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("negative input: {0}")]
  Negative(i32),
}

// --- Context helpers ---
pub fn ctx_with(workers: usize, process_remaining: bool) -> ExecutionContext {
  ExecutionContext::new().with_options(
    RunOptions::new()
      .with_max_workers(workers)
      .with_process_remaining(process_remaining),
  )
}

// --- Outcome helpers ---
pub fn succeeded_values<T: Clone>(outcomes: &[Outcome<T>]) -> Vec<T> {
  outcomes.iter().filter_map(|o| o.result().cloned()).collect()
}

pub fn cancelled_count<T>(outcomes: &[Outcome<T>]) -> usize {
  outcomes.iter().filter(|o| o.is_cancel()).count()
}

pub fn sorted<T: Ord>(mut values: Vec<T>) -> Vec<T> {
  values.sort();
  values
}

/// Spins until `counter` reaches `target`, giving up after two seconds.
pub async fn wait_for(counter: &AtomicUsize, target: usize) -> bool {
  let give_up = tokio::time::Instant::now() + Duration::from_secs(2);
  while counter.load(Ordering::SeqCst) < target {
    if tokio::time::Instant::now() >= give_up {
      return false;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
  }
  true
}

pub fn counter() -> Arc<AtomicUsize> {
  Arc::new(AtomicUsize::new(0))
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
