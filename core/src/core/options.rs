// railyard/src/core/options.rs

//! Run options captured by an `ExecutionContext`: worker count, drain toggle
//! and channel buffer size.

use crate::error::{RailError, RailResult};
use std::env;
use std::str::FromStr;

pub const DEFAULT_MAX_WORKERS: usize = 1;
/// Unset drain toggle means disabled.
pub const DEFAULT_PROCESS_REMAINING: bool = false;
pub const DEFAULT_BUFFER: usize = 1;

pub const MAX_WORKERS_VAR: &str = "RAILYARD_MAX_WORKERS";
pub const PROCESS_REMAINING_VAR: &str = "RAILYARD_PROCESS_REMAINING";
pub const BUFFER_VAR: &str = "RAILYARD_BUFFER";

/// Options a pipeline reads at construction. `None` means "not set" and
/// resolves to the matching `DEFAULT_*` constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
  pub max_workers: Option<usize>,
  pub process_remaining: Option<bool>,
  pub buffer: Option<usize>,
}

impl RunOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_max_workers(mut self, max_workers: usize) -> Self {
    self.max_workers = Some(max_workers);
    self
  }

  pub fn with_process_remaining(mut self, enabled: bool) -> Self {
    self.process_remaining = Some(enabled);
    self
  }

  pub fn with_buffer(mut self, buffer: usize) -> Self {
    self.buffer = Some(buffer);
    self
  }

  pub fn worker_max_count(&self, default_max_workers: usize) -> usize {
    self.max_workers.unwrap_or(default_max_workers)
  }

  pub fn is_process_remaining_enabled(&self) -> bool {
    self.process_remaining.unwrap_or(DEFAULT_PROCESS_REMAINING)
  }

  pub fn buffer_size(&self) -> usize {
    self.buffer.unwrap_or(DEFAULT_BUFFER).max(1)
  }

  /// Loads options from `RAILYARD_*` environment variables.
  /// Missing variables stay unset; malformed ones are a configuration error.
  pub fn from_env() -> RailResult<Self> {
    let max_workers = read_var::<usize>(MAX_WORKERS_VAR)?;
    if max_workers == Some(0) {
      return Err(RailError::Configuration {
        key: MAX_WORKERS_VAR.to_string(),
        message: "worker count must be positive".to_string(),
      });
    }
    let buffer = read_var::<usize>(BUFFER_VAR)?;
    if buffer == Some(0) {
      return Err(RailError::Configuration {
        key: BUFFER_VAR.to_string(),
        message: "buffer size must be positive".to_string(),
      });
    }
    let process_remaining = read_var::<bool>(PROCESS_REMAINING_VAR)?;

    let options = Self {
      max_workers,
      process_remaining,
      buffer,
    };
    tracing::info!(?options, "Run options loaded from environment.");
    Ok(options)
  }
}

fn read_var<V>(key: &str) -> RailResult<Option<V>>
where
  V: FromStr,
  V::Err: std::fmt::Display,
{
  match env::var(key) {
    Ok(raw) => raw
      .trim()
      .parse::<V>()
      .map(Some)
      .map_err(|e| RailError::Configuration {
        key: key.to_string(),
        message: format!("invalid value '{}': {}", raw, e),
      }),
    Err(env::VarError::NotPresent) => Ok(None),
    Err(e) => Err(RailError::Configuration {
      key: key.to_string(),
      message: e.to_string(),
    }),
  }
}
