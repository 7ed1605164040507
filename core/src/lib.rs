// src/lib.rs

//! Railyard: tri-state outcome pipelines on Tokio.
//!
//! Every element travelling through a railyard pipeline is an [`Outcome`]:
//! succeeded with a value, failed with an error, or cancelled with a reason.
//! Stages only run their logic on succeeded, unprocessed outcomes; everything
//! else rides through untouched until the [`Finalizer`] turns each outcome
//! into a plain value.
//!
//! Railyard provides:
//!  - An adapter that runs a stage function in its own task and races it
//!    against cancellation of the [`ExecutionContext`].
//!  - Worker loops ("locomotives") that pull, compute and forward with a
//!    cancellation checkpoint at each step, and a [`Pool`] that fans N of them
//!    over one input and one output stream.
//!  - Drain handlers that decide what is still emitted for interrupted work
//!    when a pipeline is cancelled.
//!  - A two-phase finalizer that reduces outcomes with success / error /
//!    cancel handlers under the same cancellation protocol.

pub mod core;
pub mod drain;
pub mod engine;
pub mod error;
pub mod pipeline;

// --- Re-exports for the Public API ---

pub use crate::core::channel::{channel, collect, from_values, preloaded, preloaded_outcomes, Inbound, Outbound, Source};
pub use crate::core::context::ExecutionContext;
pub use crate::core::control::{LocomotiveState, Termination};
pub use crate::core::options::RunOptions;
pub use crate::core::outcome::Outcome;

pub use crate::engine::adapter::Completion;
pub use crate::engine::stage::{AsyncStage, Engine, Stage};

pub use crate::drain::{CancelHandler, CancellationHandlers, Discard, DrainPolicy, FinalizeCancelHandler, FinalizeDrain};

pub use crate::pipeline::{finalize, run, run_single, turnout, FinallyHandlers, Finalizer, Pool};

pub use crate::error::{RailError, RailResult};

/*
    Typical pipeline:
    1. Create an `ExecutionContext`, optionally from `RunOptions::from_env()`.
    2. Feed a source stream: `preloaded(values)`, or `Source::new().spawn(&ctx, values)`
       (`from_values` when no source handlers are needed).
    3. Chain pools: `Pool::new(Stage::map(...)).workers(4).spawn(&ctx, input)`.
    4. Close with `finalize(&ctx, stream, FinallyHandlers::new(...), Discard)`.
    5. Read the values back with `collect(output).await`.
*/
