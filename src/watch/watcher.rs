// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;

/// Something that can observe directories and report changes as
/// [`RuntimeEvent`]s.
pub trait PathWatcher: Send {
    fn watch(&mut self, root: &Path) -> Result<()>;

    /// Stop observing every root passed to [`watch`](Self::watch).
    fn unwatch_all(&mut self);
}

/// Filesystem watcher backed by `notify`.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping this stops
/// file watching.
pub struct NotifyWatcher {
    inner: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl std::fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl NotifyWatcher {
    /// Create a watcher that forwards changes into `runtime_tx`. Must be
    /// called from within a tokio runtime.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Result<Self> {
        // Channel from the blocking notify callback into the async world.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Err(err) = event_tx.send(res) {
                    // No tracing from the notify thread.
                    eprintln!("basis: failed to forward notify event: {err}");
                }
            },
            Config::default(),
        )?;

        tokio::spawn(async move {
            while let Some(res) = event_rx.recv().await {
                let events = match res {
                    Ok(event) => to_runtime_events(event),
                    Err(err) => vec![RuntimeEvent::WatchError {
                        root: err.paths.first().cloned(),
                        message: err.to_string(),
                    }],
                };
                for event in events {
                    if runtime_tx.send(event).await.is_err() {
                        debug!("runtime channel closed; stopping watcher forwarder");
                        return;
                    }
                }
            }
            debug!("watcher event loop finished");
        });

        Ok(Self {
            inner,
            watched: Vec::new(),
        })
    }
}

fn to_runtime_events(event: Event) -> Vec<RuntimeEvent> {
    if matches!(event.kind, EventKind::Access(_)) {
        return Vec::new();
    }
    event
        .paths
        .into_iter()
        .map(RuntimeEvent::PathChanged)
        .collect()
}

impl PathWatcher for NotifyWatcher {
    fn watch(&mut self, root: &Path) -> Result<()> {
        let mode = if root.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        self.inner.watch(root, mode)?;
        self.watched.push(root.to_path_buf());
        info!("file watcher started on {:?}", root);
        Ok(())
    }

    fn unwatch_all(&mut self) {
        for root in self.watched.drain(..) {
            if let Err(e) = self.inner.unwatch(&root) {
                debug!(root = %root.display(), error = %e, "unwatch failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind};

    #[test]
    fn access_events_are_ignored() {
        let event = Event::new(EventKind::Access(AccessKind::Any)).add_path("/p/a".into());
        assert!(to_runtime_events(event).is_empty());
    }

    #[test]
    fn every_path_becomes_a_change() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path("/p/a".into())
            .add_path("/p/b".into());
        assert_eq!(
            to_runtime_events(event),
            vec![
                RuntimeEvent::PathChanged(PathBuf::from("/p/a")),
                RuntimeEvent::PathChanged(PathBuf::from("/p/b")),
            ]
        );
    }
}
