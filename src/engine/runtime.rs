// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::errors::Result;
use crate::watch::PathWatcher;

use super::backend::TaskBackend;
use super::core::WatchCore;
use super::{CoreCommand, RuntimeEvent, RuntimeOptions};

/// Drives the watch core in response to `RuntimeEvent`s, delegating task
/// execution to a `TaskBackend` and directory observation to a
/// `PathWatcher`.
///
/// This is an IO shell around `WatchCore`, which holds the dispatch
/// semantics. This struct handles async IO: reading and debouncing events,
/// launching tasks and keeping the watched roots in sync.
pub struct WatchRuntime<B: TaskBackend, W: PathWatcher> {
    core: WatchCore,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: B,
    watcher: W,
    options: RuntimeOptions,
}

impl<B: TaskBackend, W: PathWatcher> fmt::Debug for WatchRuntime<B, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRuntime")
            .field("core", &self.core)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<B: TaskBackend, W: PathWatcher> WatchRuntime<B, W> {
    pub fn new(
        core: WatchCore,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        backend: B,
        watcher: W,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            core,
            event_rx,
            backend,
            watcher,
            options,
        }
    }

    /// Main event loop.
    ///
    /// - Waits for an event, then collects further events until the channel
    ///   stays quiet for the debounce window.
    /// - Feeds the batch into the core.
    /// - Executes the commands returned by the core.
    /// - On shutdown, waits for in-flight tasks before returning.
    pub async fn run(mut self) -> Result<()> {
        info!("watch runtime started");
        self.refresh_watches();

        loop {
            let Some(first) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };

            let batch = self.debounce(first).await;
            debug!(events = batch.len(), "runtime received batch");

            let step = self.core.step_batch(batch);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        self.backend.drain().await;
        self.watcher.unwatch_all();
        info!("watch runtime stopped");
        Ok(())
    }

    async fn debounce(&mut self, first: RuntimeEvent) -> Vec<RuntimeEvent> {
        let mut batch = vec![first];
        loop {
            if matches!(batch.last(), Some(RuntimeEvent::ShutdownRequested)) {
                break;
            }
            match timeout(self.options.debounce, self.event_rx.recv()).await {
                Ok(Some(event)) => batch.push(event),
                Ok(None) | Err(_) => break,
            }
        }
        batch
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Launch { task, snapshot } => {
                info!(task = %task, version = snapshot.version, "launching task");
                self.backend.launch(task, snapshot).await
            }
            CoreCommand::RewatchRoots => {
                self.refresh_watches();
                Ok(())
            }
        }
    }

    /// Re-register every watch root. Roots that cannot be watched have their
    /// bindings deactivated, which may expose nested roots that were
    /// previously covered; those are tried in turn.
    fn refresh_watches(&mut self) {
        self.watcher.unwatch_all();

        let mut failed = Vec::new();
        loop {
            let mut progressed = false;
            for root in self.core.dispatcher().watch_roots() {
                if failed.contains(&root) {
                    continue;
                }
                if let Err(e) = self.watcher.watch(&root) {
                    self.core.deactivate_root(&root, &format!("{e:#}"));
                    failed.push(root);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
            self.watcher.unwatch_all();
        }
    }
}
