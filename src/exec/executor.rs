// src/exec/executor.rs

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::{ConfigSnapshot, Module, TransformDescriptor};
use crate::exec::handle::ExecutionHandle;
use crate::notify_sink::{BuildEvent, NotificationSink};
use crate::transform::TransformRegistry;

/// Runs one descriptor through its strategy.
///
/// Failures never escape as panics or errors: a failing strategy, and even
/// a panicking one, resolves the handle as `Failed(reason)`.
#[derive(Clone)]
pub struct Executor {
    registry: TransformRegistry,
    sink: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(registry: TransformRegistry, sink: Arc<dyn NotificationSink>) -> Self {
        Self { registry, sink }
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    /// Start executing `descriptor` against `snapshot` and return its handle
    /// immediately. Must be called from within a tokio runtime.
    pub fn execute(
        &self,
        module: &Module,
        descriptor: &TransformDescriptor,
        snapshot: &ConfigSnapshot,
    ) -> ExecutionHandle {
        let (handle, completer) = ExecutionHandle::pending(descriptor.id, &module.name);

        let strategy = self.registry.strategy_for(descriptor.kind());
        let sink = Arc::clone(&self.sink);
        let config = Arc::clone(&snapshot.config);
        let descriptor = descriptor.clone();

        debug!(
            module = %module.name,
            descriptor = %descriptor.id,
            version = snapshot.version,
            "executing transform"
        );

        tokio::spawn(async move {
            let run = {
                let descriptor = descriptor.clone();
                tokio::spawn(async move { strategy.run_once(&descriptor, &config).await })
            };

            let result = match run.await {
                Ok(result) => result,
                Err(join_err) => {
                    error!(descriptor = %descriptor.id, error = %join_err, "transform task aborted");
                    Err(descriptor.failure(format!("transform panicked: {join_err}")))
                }
            };

            let event = match &result {
                Ok(_) => BuildEvent::TransformSucceeded {
                    descriptor: descriptor.id,
                    module: descriptor.module.clone(),
                },
                Err(e) => BuildEvent::TransformFailed(e.clone()),
            };
            completer.complete(result);
            sink.notify(event);
        });

        handle
    }
}
