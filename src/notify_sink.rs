// src/notify_sink.rs

//! Completion and error notifications.
//!
//! The executor and aggregator emit [`BuildEvent`]s fire-and-forget; a sink
//! must never block or fail the build. [`LogSink`] is the production sink
//! and reports through `tracing`.

use tracing::{error, info};

use crate::config::DescriptorId;
use crate::errors::TransformError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    TransformSucceeded {
        descriptor: DescriptorId,
        module: String,
    },
    TransformFailed(TransformError),
    /// All constituents of a task have reported.
    TaskFinished {
        task: String,
        /// Human label, e.g. "Server".
        label: String,
        succeeded: usize,
        failed: usize,
    },
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: BuildEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, event: BuildEvent) {
        match event {
            BuildEvent::TransformSucceeded { descriptor, module } => {
                info!(module = %module, descriptor = %descriptor, "transform done");
            }
            BuildEvent::TransformFailed(err) => {
                error!(module = %err.module, descriptor = %err.descriptor, "{}", err.reason);
            }
            BuildEvent::TaskFinished {
                task,
                label,
                succeeded,
                failed,
            } => {
                if failed == 0 {
                    info!(task = %task, succeeded, "{label} done!");
                } else {
                    error!(task = %task, succeeded, failed, "{label} failed");
                }
            }
        }
    }
}
