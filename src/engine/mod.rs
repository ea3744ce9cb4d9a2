// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - task identities (`TaskId`) shared by the CLI, dispatcher and aggregator
//! - the aggregator that joins the transforms of one task
//! - the watch runtime that reacts to:
//!   - filesystem changes
//!   - watcher errors
//!   - shutdown signals
//!
//! The core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]. Tasks are launched through a [`TaskBackend`]
//! so tests can record launches instead of running transforms.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::DescriptorId;
use crate::types::TransformKind;

pub mod aggregator;
pub mod backend;
pub mod core;
pub mod runtime;

pub use aggregator::{Aggregator, CompositeHandle, CompositeState, CompositeStatus, TaskReport};
pub use backend::{AggregatorBackend, TaskBackend};
pub use core::{CoreCommand, CoreStep, WatchCore};
pub use runtime::WatchRuntime;

/// A unit of work the dispatcher can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    /// Run every descriptor of one kind across all modules.
    Build(TransformKind),
    /// Re-run a single incremental descriptor.
    Rebundle(DescriptorId),
    /// Re-resolve the configuration and rebuild all watch bindings.
    Reload,
}

impl TaskId {
    /// Human label used in completion notifications.
    pub fn label(&self) -> &'static str {
        match self {
            TaskId::Build(kind) => kind.label(),
            TaskId::Rebundle(id) => id.kind.label(),
            TaskId::Reload => "Configuration",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Build(kind) => f.write_str(kind.task_name()),
            TaskId::Rebundle(id) => write!(f, "rebundle:{id}"),
            TaskId::Reload => f.write_str("reload"),
        }
    }
}

/// Events flowing into the watch runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// A path was created, modified or removed.
    PathChanged(PathBuf),
    /// The filesystem watcher reported an error, optionally for a root.
    WatchError {
        root: Option<PathBuf>,
        message: String,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Default quiet window before a batch of changes is dispatched.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    pub debounce: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}
