// src/engine/backend.rs

//! Pluggable task backend.
//!
//! The watch runtime talks to a `TaskBackend` instead of the aggregator
//! directly, so tests can swap in a backend that only records launches.

use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::ConfigSnapshot;
use crate::engine::{Aggregator, TaskId};
use crate::errors::Result;
use crate::transform::BoxFuture;

pub trait TaskBackend: Send {
    /// Start `task` against `snapshot`. Returns once the task is launched,
    /// not when it finishes.
    fn launch(&mut self, task: TaskId, snapshot: ConfigSnapshot) -> BoxFuture<'_, Result<()>>;

    /// Wait for every launched task to finish.
    fn drain(&mut self) -> BoxFuture<'_, ()>;
}

/// Production backend: runs tasks through the [`Aggregator`] and logs each
/// report. Failures are reported, never propagated; watch mode keeps going.
#[derive(Debug)]
pub struct AggregatorBackend {
    aggregator: Aggregator,
    in_flight: JoinSet<()>,
}

impl AggregatorBackend {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator,
            in_flight: JoinSet::new(),
        }
    }

    fn reap_finished(&mut self) {
        while let Some(res) = self.in_flight.try_join_next() {
            if let Err(e) = res {
                error!(error = %e, "task watcher aborted");
            }
        }
    }
}

impl TaskBackend for AggregatorBackend {
    fn launch(&mut self, task: TaskId, snapshot: ConfigSnapshot) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.reap_finished();

            let handle = self.aggregator.run_task(task, &snapshot);
            self.in_flight.spawn(async move {
                match handle.wait().await.and_then(|report| report.into_result()) {
                    Ok(report) => {
                        info!(task = %report.task, transforms = report.outcomes.len(), "task succeeded");
                    }
                    Err(err) => error!("{err}"),
                }
            });
            Ok(())
        })
    }

    fn drain(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.in_flight.is_empty() {
                debug!(in_flight = self.in_flight.len(), "waiting for running tasks");
            }
            while let Some(res) = self.in_flight.join_next().await {
                if let Err(e) = res {
                    error!(error = %e, "task watcher aborted");
                }
            }
        })
    }
}
