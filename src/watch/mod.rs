// src/watch/mod.rs

//! File watching and change dispatch.
//!
//! This module is responsible for:
//! - Mapping changed paths to tasks through glob bindings (`dispatcher`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does **not** run anything; it only turns filesystem changes into
//! task-level requests for the engine.

pub mod dispatcher;
pub mod path_utils;
pub mod watcher;

pub use dispatcher::{DispatcherState, WatchBinding, WatchDispatcher};
pub use watcher::{NotifyWatcher, PathWatcher};
