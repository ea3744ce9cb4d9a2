// src/engine/aggregator.rs

//! Joins the transforms of one task into a single composite result.
//!
//! Semantics are fail-visible, no-cancel:
//! - the composite is `Succeeded` only once every constituent succeeded;
//! - it turns `Failing` as soon as one constituent fails while others are
//!   still running;
//! - it is `Failed` once all constituents have reported and any failed.
//!
//! A failure never cancels siblings; every outcome ends up in the
//! [`TaskReport`].

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::config::{ConfigSnapshot, EffectiveConfig, Module, TransformDescriptor};
use crate::engine::TaskId;
use crate::errors::{BasisError, Result, TransformError};
use crate::exec::{ExecutionHandle, ExecutionOutcome, Executor};
use crate::notify_sink::{BuildEvent, NotificationSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeStatus {
    Pending,
    Failing,
    Succeeded,
    Failed,
}

/// Progress counters of a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeState {
    pub total: usize,
    pub reported: usize,
    pub failed: usize,
}

impl CompositeState {
    pub fn status(&self) -> CompositeStatus {
        match (self.reported >= self.total, self.failed > 0) {
            (false, false) => CompositeStatus::Pending,
            (false, true) => CompositeStatus::Failing,
            (true, false) => CompositeStatus::Succeeded,
            (true, true) => CompositeStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.reported >= self.total
    }
}

/// Every constituent outcome of a finished task, in completion order.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: TaskId,
    pub outcomes: Vec<ExecutionOutcome>,
}

impl TaskReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ExecutionOutcome::is_success)
    }

    pub fn failures(&self) -> Vec<TransformError> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().cloned())
            .collect()
    }

    /// `Err(AggregateFailure)` carrying every individual failure.
    pub fn into_result(self) -> Result<TaskReport> {
        let failures = self.failures();
        if failures.is_empty() {
            Ok(self)
        } else {
            Err(BasisError::AggregateFailure {
                task: self.task.to_string(),
                failures,
            })
        }
    }
}

/// Handle on a task whose constituents are running.
#[derive(Debug)]
pub struct CompositeHandle {
    task: TaskId,
    state_rx: watch::Receiver<CompositeState>,
    join: JoinHandle<TaskReport>,
}

impl CompositeHandle {
    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn state(&self) -> CompositeState {
        *self.state_rx.borrow()
    }

    pub fn status(&self) -> CompositeStatus {
        self.state().status()
    }

    /// Wait until at least `n` constituents have reported and return the
    /// state at that point.
    pub async fn wait_reported(&self, n: usize) -> CompositeState {
        let mut rx = self.state_rx.clone();
        let reached = rx
            .wait_for(|s| s.reported >= n || s.is_terminal())
            .await
            .map(|s| *s);
        reached.unwrap_or_else(|_| *rx.borrow())
    }

    /// Wait for every constituent and return the full report.
    pub async fn wait(self) -> Result<TaskReport> {
        self.join
            .await
            .map_err(|e| BasisError::Other(anyhow!("aggregation for '{}' aborted: {e}", self.task)))
    }
}

/// Runs all descriptors of a task and joins their handles.
#[derive(Clone)]
pub struct Aggregator {
    executor: Executor,
    sink: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    pub fn new(executor: Executor, sink: Arc<dyn NotificationSink>) -> Self {
        Self { executor, sink }
    }

    /// Start every descriptor of `task` and return the composite handle.
    ///
    /// A task with no descriptors completes immediately as `Succeeded`.
    pub fn run_task(&self, task: TaskId, snapshot: &ConfigSnapshot) -> CompositeHandle {
        let handles: Vec<ExecutionHandle> = descriptors_for_task(&snapshot.config, task)
            .into_iter()
            .map(|(module, descriptor)| self.executor.execute(module, descriptor, snapshot))
            .collect();

        debug!(task = %task, transforms = handles.len(), version = snapshot.version, "task started");
        Self::join(task, handles, Arc::clone(&self.sink))
    }

    /// Join already-running executions into one composite.
    pub fn join(
        task: TaskId,
        handles: Vec<ExecutionHandle>,
        sink: Arc<dyn NotificationSink>,
    ) -> CompositeHandle {
        let (state_tx, state_rx) = watch::channel(CompositeState {
            total: handles.len(),
            reported: 0,
            failed: 0,
        });

        let join = tokio::spawn(async move {
            let mut set = JoinSet::new();
            let mut pending = HashMap::new();
            for handle in handles {
                let who = (handle.descriptor(), handle.module().to_string());
                let abort = set.spawn(handle.wait());
                pending.insert(abort.id(), who);
            }

            let mut outcomes = Vec::with_capacity(pending.len());
            while let Some(joined) = set.join_next_with_id().await {
                let outcome = match joined {
                    Ok((id, outcome)) => {
                        pending.remove(&id);
                        outcome
                    }
                    Err(e) => {
                        let (descriptor, module) = match pending.remove(&e.id()) {
                            Some(who) => who,
                            None => continue,
                        };
                        ExecutionOutcome {
                            descriptor,
                            module: module.clone(),
                            result: Err(TransformError {
                                descriptor,
                                module,
                                reason: format!("execution aborted: {e}"),
                            }),
                        }
                    }
                };

                let failed = !outcome.is_success();
                if failed {
                    warn!(task = %task, descriptor = %outcome.descriptor, "transform failed");
                }
                state_tx.send_modify(|s| {
                    s.reported += 1;
                    if failed {
                        s.failed += 1;
                    }
                });
                outcomes.push(outcome);
            }

            let state = *state_tx.borrow();
            sink.notify(BuildEvent::TaskFinished {
                task: task.to_string(),
                label: task.label().to_string(),
                succeeded: state.reported - state.failed,
                failed: state.failed,
            });

            TaskReport { task, outcomes }
        });

        CompositeHandle {
            task,
            state_rx,
            join,
        }
    }
}

/// The `(module, descriptor)` pairs a task runs, in declaration order.
pub fn descriptors_for_task(
    config: &EffectiveConfig,
    task: TaskId,
) -> Vec<(&Module, &TransformDescriptor)> {
    match task {
        TaskId::Build(kind) => config.descriptors(kind).collect(),
        TaskId::Rebundle(id) => config.find(id).into_iter().collect(),
        TaskId::Reload => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_counters() {
        let s = |reported, failed| CompositeState {
            total: 3,
            reported,
            failed,
        };
        assert_eq!(s(0, 0).status(), CompositeStatus::Pending);
        assert_eq!(s(1, 1).status(), CompositeStatus::Failing);
        assert_eq!(s(3, 0).status(), CompositeStatus::Succeeded);
        assert_eq!(s(3, 2).status(), CompositeStatus::Failed);
    }

    #[test]
    fn empty_composite_is_immediately_succeeded() {
        let s = CompositeState {
            total: 0,
            reported: 0,
            failed: 0,
        };
        assert!(s.is_terminal());
        assert_eq!(s.status(), CompositeStatus::Succeeded);
    }
}
