// src/engine/core.rs

//! Core watch state machine.
//!
//! `WatchCore` consumes batches of [`RuntimeEvent`]s and produces:
//! - an updated dispatcher / snapshot
//! - a list of commands describing what the IO shell should do next
//!
//! It never spawns, watches or sleeps. The only IO it performs is reading
//! the configuration file when a `Reload` task is dispatched, which happens
//! in-line so that later events in the same batch match the new bindings.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::config::{ConfigLoader, ConfigSnapshot};
use crate::engine::{RuntimeEvent, TaskId};
use crate::transform::TransformRegistry;
use crate::watch::WatchDispatcher;

/// Command produced by the core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Launch `task` against `snapshot`.
    Launch {
        task: TaskId,
        snapshot: ConfigSnapshot,
    },
    /// The set of watch roots may have changed; re-register them with the
    /// filesystem watcher.
    RewatchRoots,
}

/// Decision returned by the core after handling a batch of events.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

#[derive(Debug)]
pub struct WatchCore {
    dispatcher: WatchDispatcher,
    loader: ConfigLoader,
    registry: TransformRegistry,
    /// Last successfully loaded snapshot.
    snapshot: Option<ConfigSnapshot>,
}

impl WatchCore {
    /// Load the configuration and register the initial bindings.
    ///
    /// A configuration error is not fatal here: the core starts with only
    /// the reload binding and waits for the file to be fixed.
    pub fn start(mut loader: ConfigLoader, registry: TransformRegistry) -> Self {
        let mut dispatcher = WatchDispatcher::new();
        let snapshot = dispatcher.on_reload(&mut loader, &registry).ok();
        Self {
            dispatcher,
            loader,
            registry,
            snapshot,
        }
    }

    pub fn dispatcher(&self) -> &WatchDispatcher {
        &self.dispatcher
    }

    pub fn snapshot(&self) -> Option<&ConfigSnapshot> {
        self.snapshot.as_ref()
    }

    /// Mark bindings under `root` inactive; see
    /// [`WatchDispatcher::deactivate_root`].
    pub fn deactivate_root(&mut self, root: &std::path::Path, reason: &str) -> usize {
        self.dispatcher.deactivate_root(root, reason)
    }

    /// Handle one debounced batch.
    ///
    /// Tasks are deduplicated per snapshot version: a task matched twice in
    /// one batch launches once, but a task matched both before and after a
    /// reload launches once per snapshot.
    pub fn step_batch(&mut self, events: Vec<RuntimeEvent>) -> CoreStep {
        let mut commands = Vec::new();
        let mut launched: HashSet<(TaskId, u64)> = HashSet::new();

        for event in events {
            match event {
                RuntimeEvent::PathChanged(path) => {
                    for task in self.dispatcher.on_path_changed(&path) {
                        if task == TaskId::Reload {
                            self.reload();
                            commands.push(CoreCommand::RewatchRoots);
                            continue;
                        }

                        let Some(snapshot) = &self.snapshot else {
                            continue;
                        };
                        if launched.insert((task, snapshot.version)) {
                            commands.push(CoreCommand::Launch {
                                task,
                                snapshot: snapshot.clone(),
                            });
                        }
                    }
                }
                RuntimeEvent::WatchError { root, message } => match root {
                    Some(root) => {
                        if self.dispatcher.deactivate_root(&root, &message) > 0 {
                            commands.push(CoreCommand::RewatchRoots);
                        }
                    }
                    None => warn!("file watch error: {message}"),
                },
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested; no further tasks will be dispatched");
                    return CoreStep {
                        commands,
                        keep_running: false,
                    };
                }
            }
        }

        CoreStep {
            commands,
            keep_running: true,
        }
    }

    fn reload(&mut self) {
        if let Ok(snapshot) = self.dispatcher.on_reload(&mut self.loader, &self.registry) {
            info!(version = snapshot.version, "configuration reloaded");
            self.snapshot = Some(snapshot);
        }
    }
}
