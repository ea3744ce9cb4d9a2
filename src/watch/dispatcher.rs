// src/watch/dispatcher.rs

//! Path-to-task dispatch for watch mode.
//!
//! The dispatcher owns the current set of [`WatchBinding`]s. Bindings are
//! never patched in place: every configuration load discards them all and
//! registers a fresh set derived from the new snapshot.
//!
//! - Non-incremental strategies bind to `TaskId::Build(kind)`, so any change
//!   re-runs the whole kind.
//! - Incremental strategies bind to `TaskId::Rebundle(descriptor)`.
//! - The configuration file itself binds to `TaskId::Reload`.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, info, warn};

use crate::config::{ConfigLoader, ConfigSnapshot, TransformDescriptor};
use crate::engine::TaskId;
use crate::errors::{BasisError, Result};
use crate::transform::TransformRegistry;
use crate::transform::source::{glob_under, slash_path};
use crate::transform::watch_base;
use crate::watch::path_utils::{outermost, relative_str};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Active,
}

/// One watched glob and the task it triggers.
#[derive(Clone)]
pub struct WatchBinding {
    /// Absolute glob.
    pub pattern: String,
    /// Directory the filesystem watcher must observe for this binding.
    pub root: PathBuf,
    pub task: TaskId,
    pub active: bool,
    /// Outputs of `task` itself; changes under these never match.
    pub excluded: Vec<PathBuf>,
    matcher: GlobMatcher,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("pattern", &self.pattern)
            .field("root", &self.root)
            .field("task", &self.task)
            .field("active", &self.active)
            .field("excluded", &self.excluded)
            .finish()
    }
}

impl WatchBinding {
    pub fn new(pattern: String, root: PathBuf, task: TaskId) -> Result<Self> {
        let matcher = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid watch pattern '{pattern}'"))?
            .compile_matcher();
        Ok(Self {
            pattern,
            root,
            task,
            active: true,
            excluded: Vec::new(),
            matcher,
        })
    }

    /// Ignore changes equal to or under any of `outputs`.
    pub fn excluding(mut self, outputs: Vec<PathBuf>) -> Self {
        self.excluded = outputs;
        self
    }

    /// Whether `path` falls under this binding. Paths reported through a
    /// different prefix of the same directory (symlinks) are rebased onto
    /// `root` first.
    pub fn matches(&self, path: &Path) -> bool {
        if self.excluded.iter().any(|out| path.starts_with(out)) {
            return false;
        }
        if self.matcher.is_match(slash_path(path)) {
            return true;
        }
        match relative_str(&self.root, path) {
            Some(rel) => self.matcher.is_match(slash_path(&self.root.join(rel))),
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct WatchDispatcher {
    state: DispatcherState,
    bindings: Vec<WatchBinding>,
}

impl Default for WatchDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchDispatcher {
    pub fn new() -> Self {
        Self {
            state: DispatcherState::Idle,
            bindings: Vec::new(),
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Replace all bindings with those derived from `snapshot`.
    ///
    /// One binding per descriptor, in declaration order, followed by the
    /// binding on the configuration file itself.
    pub fn register(
        &mut self,
        snapshot: &ConfigSnapshot,
        registry: &TransformRegistry,
    ) -> Result<&[WatchBinding]> {
        let descriptors: Vec<_> = snapshot.config.all_descriptors().collect();
        let task_of = |descriptor: &TransformDescriptor| {
            if registry
                .strategy_for(descriptor.kind())
                .supports_incremental_watch()
            {
                TaskId::Rebundle(descriptor.id)
            } else {
                TaskId::Build(descriptor.kind())
            }
        };

        let mut bindings = Vec::new();
        for &(_, descriptor) in &descriptors {
            let strategy = registry.strategy_for(descriptor.kind());
            let task = task_of(descriptor);
            // Everything the task writes, across all of its descriptors.
            let outputs = descriptors
                .iter()
                .filter(|&&(_, d)| task_of(d) == task)
                .map(|&(_, d)| registry.strategy_for(d.kind()).output_root(d))
                .collect();
            bindings.push(
                WatchBinding::new(strategy.watch_pattern(descriptor), watch_base(descriptor), task)?
                    .excluding(outputs),
            );
        }

        bindings.push(reload_binding(&snapshot.path)?);

        self.bindings = bindings;
        self.state = DispatcherState::Active;
        info!(
            version = snapshot.version,
            bindings = self.bindings.len(),
            "watch bindings registered"
        );
        Ok(&self.bindings)
    }

    /// Every distinct task whose active bindings match `path`, in binding
    /// order.
    pub fn on_path_changed(&self, path: &Path) -> Vec<TaskId> {
        if self.state == DispatcherState::Idle {
            return Vec::new();
        }

        let mut tasks = Vec::new();
        for binding in self.bindings.iter().filter(|b| b.active) {
            if !tasks.contains(&binding.task) && binding.matches(path) {
                tasks.push(binding.task);
            }
        }

        debug!(path = %path.display(), ?tasks, "path dispatched");
        tasks
    }

    /// Discard every binding, reload the configuration and register again.
    ///
    /// If loading fails, only the reload binding is kept: nothing else
    /// dispatches until the file is fixed and saved again.
    pub fn on_reload(
        &mut self,
        loader: &mut ConfigLoader,
        registry: &TransformRegistry,
    ) -> Result<ConfigSnapshot> {
        self.bindings.clear();

        match loader.load() {
            Ok(snapshot) => {
                self.register(&snapshot, registry)?;
                Ok(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "configuration reload failed; dispatch suspended until it is fixed");
                self.bindings = vec![reload_binding(loader.path())?];
                self.state = DispatcherState::Active;
                Err(err)
            }
        }
    }

    /// Deactivate every binding under `root`, which could not be watched.
    /// Returns the number of bindings affected.
    pub fn deactivate_root(&mut self, root: &Path, reason: &str) -> usize {
        let mut count = 0;
        for binding in self.bindings.iter_mut().filter(|b| b.active) {
            if binding.root.starts_with(root) {
                binding.active = false;
                count += 1;
            }
        }

        if count > 0 {
            let err = BasisError::WatchDispatchError {
                root: root.to_path_buf(),
                message: reason.to_string(),
            };
            warn!(bindings = count, "{err}");
        }
        count
    }

    /// Directories the filesystem watcher must observe. Nested roots are
    /// covered by their ancestors.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        outermost(
            self.bindings
                .iter()
                .filter(|b| b.active)
                .map(|b| b.root.clone())
                .collect(),
        )
    }
}

fn reload_binding(config_path: &Path) -> Result<WatchBinding> {
    let root = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    WatchBinding::new(glob_under(config_path, ""), root, TaskId::Reload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_binding_matches_only_the_file() {
        let b = reload_binding(Path::new("/p/build.conf.toml")).unwrap();
        assert!(b.matches(Path::new("/p/build.conf.toml")));
        assert!(!b.matches(Path::new("/p/other.toml")));
        assert_eq!(b.root, PathBuf::from("/p"));
    }

    #[test]
    fn idle_dispatcher_matches_nothing() {
        let d = WatchDispatcher::new();
        assert_eq!(d.state(), DispatcherState::Idle);
        assert!(d.on_path_changed(Path::new("/p/build.conf.toml")).is_empty());
    }
}
