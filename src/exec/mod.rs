// src/exec/mod.rs

//! Transform execution layer.
//!
//! - [`executor`] turns a `(module, descriptor)` pair into a running
//!   transform on the tokio runtime.
//! - [`handle`] is the per-execution completion handle the aggregator joins.

pub mod executor;
pub mod handle;

pub use executor::Executor;
pub use handle::{ExecutionHandle, ExecutionOutcome, HandleCompleter, HandleState};
