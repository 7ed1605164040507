// railyard/src/pipeline/mod.rs

//! Concurrent execution: worker loops, the pool that runs them, and the
//! terminal finalizer.

pub mod finalizer;
pub mod locomotive;
pub mod pool;

pub use finalizer::{finalize, FinallyHandlers, Finalizer};
pub use locomotive::SuccessObserver;
pub use pool::{run, run_single, turnout, Pool};
