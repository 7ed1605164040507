// railyard/src/engine/mod.rs

//! Units of work: the adapter that races a computation against cancellation,
//! and the stage factories built on top of it.

pub mod adapter;
pub mod stage;

pub use adapter::Completion;
pub use stage::{AsyncStage, Engine, Stage};
