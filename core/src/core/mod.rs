// railyard/src/core/mod.rs

//! Building blocks shared by every stage: the outcome type, the execution
//! context, run options, streams and the worker-loop state labels.

pub mod channel;
pub mod context;
pub mod control;
pub mod options;
pub mod outcome;

pub use channel::{Inbound, Outbound, Source};
pub use context::ExecutionContext;
pub use control::{LocomotiveState, Termination};
pub use options::RunOptions;
pub use outcome::Outcome;
