use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, bail};

use basis::config::{ConfigSnapshot, ScriptOptions, StyleOptions};
use basis::engine::{TaskBackend, TaskId};
use basis::errors::Result;
use basis::notify_sink::{BuildEvent, NotificationSink};
use basis::transform::{BoxFuture, Toolchain};
use basis::watch::PathWatcher;

/// Marker that makes the fake compilers fail on a file.
pub const SYNTAX_ERROR: &str = "SYNTAX ERROR";

/// A toolchain that:
/// - records every call as a string
/// - "compiles" by copying the source, failing on files containing
///   [`SYNTAX_ERROR`]
#[derive(Debug, Clone, Default)]
pub struct FakeToolchain {
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if text.contains(SYNTAX_ERROR) {
        bail!("{}: syntax error", path.display());
    }
    Ok(text)
}

fn write_output(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

impl Toolchain for FakeToolchain {
    fn compile_script<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
        options: &'a ScriptOptions,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.record(format!("compile {} ({})", input.display(), options.module));
            let text = read_source(input)?;
            let stem = input.file_stem().unwrap_or_default();
            write_output(&out_dir.join(stem).with_extension("js"), &text)
        })
    }

    fn bundle<'a>(
        &'a self,
        entry: &'a Path,
        output: &'a Path,
        _options: &'a ScriptOptions,
        minify: bool,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.record(format!("bundle {} minify={minify}", entry.display()));
            let text = read_source(entry)?;
            let header = if minify { "/*min*/" } else { "/*dev*/" };
            write_output(output, &format!("{header}\n{text}"))
        })
    }

    fn compile_stylesheet<'a>(
        &'a self,
        entry: &'a Path,
        options: &'a StyleOptions,
    ) -> BoxFuture<'a, anyhow::Result<String>> {
        Box::pin(async move {
            self.record(format!("stylesheet {} ({})", entry.display(), options.style));
            read_source(entry)
        })
    }
}

/// Sink that keeps every event.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<BuildEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: BuildEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A backend that records `(task, snapshot version)` for every launch and
/// runs nothing.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    launched: Arc<Mutex<Vec<(TaskId, u64)>>>,
    drained: Arc<Mutex<bool>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> Vec<(TaskId, u64)> {
        self.launched.lock().unwrap().clone()
    }

    pub fn was_drained(&self) -> bool {
        *self.drained.lock().unwrap()
    }
}

impl TaskBackend for RecordingBackend {
    fn launch(&mut self, task: TaskId, snapshot: ConfigSnapshot) -> BoxFuture<'_, Result<()>> {
        let launched = Arc::clone(&self.launched);
        Box::pin(async move {
            launched.lock().unwrap().push((task, snapshot.version));
            Ok(())
        })
    }

    fn drain(&mut self) -> BoxFuture<'_, ()> {
        let drained = Arc::clone(&self.drained);
        Box::pin(async move {
            *drained.lock().unwrap() = true;
        })
    }
}

/// A watcher that records roots and refuses the ones listed in `failing`.
#[derive(Debug, Clone, Default)]
pub struct RecordingWatcher {
    watched: Arc<Mutex<Vec<PathBuf>>>,
    failing: Vec<PathBuf>,
}

impl RecordingWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            failing: roots.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn watched(&self) -> Vec<PathBuf> {
        self.watched.lock().unwrap().clone()
    }
}

impl PathWatcher for RecordingWatcher {
    fn watch(&mut self, root: &Path) -> anyhow::Result<()> {
        if self.failing.iter().any(|f| f == root) {
            bail!("no such directory: {}", root.display());
        }
        self.watched.lock().unwrap().push(root.to_path_buf());
        Ok(())
    }

    fn unwatch_all(&mut self) {
        self.watched.lock().unwrap().clear();
    }
}
