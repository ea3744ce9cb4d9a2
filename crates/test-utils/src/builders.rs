#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use basis::config::{ConfigLoader, ConfigSnapshot, DEFAULT_CONFIG_FILE};
use basis::engine::Aggregator;
use basis::exec::Executor;
use basis::fs::RealFileSystem;
use basis::notify_sink::NotificationSink;
use basis::transform::TransformRegistry;

use crate::fakes::{FakeToolchain, RecordingSink};

/// A throwaway project directory with a config file and sources.
pub struct ProjectBuilder {
    dir: TempDir,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project dir"),
        }
    }

    /// Write `contents` at `rel`, creating parent directories.
    pub fn file(self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        self.write(rel, contents);
        self
    }

    pub fn config(self, toml: &str) -> Self {
        self.file(DEFAULT_CONFIG_FILE, toml)
    }

    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write project file");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn config_path(&self) -> PathBuf {
        self.join(DEFAULT_CONFIG_FILE)
    }

    pub fn loader(&self) -> ConfigLoader {
        ConfigLoader::new(self.config_path()).expect("config path")
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        self.loader().load().expect("valid test configuration")
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry using the fake toolchain against the real filesystem.
pub fn fake_registry(toolchain: &FakeToolchain) -> TransformRegistry {
    TransformRegistry::new(Arc::new(toolchain.clone()), Arc::new(RealFileSystem))
}

/// Aggregator over [`fake_registry`], reporting into `sink`.
pub fn fake_aggregator(toolchain: &FakeToolchain, sink: &RecordingSink) -> Aggregator {
    let sink: Arc<dyn NotificationSink> = Arc::new(sink.clone());
    Aggregator::new(
        Executor::new(fake_registry(toolchain), Arc::clone(&sink)),
        sink,
    )
}

/// One `[[modules]]` table with the given `(kind, source, dest)` transforms.
pub fn module_toml(name: &str, transforms: &[(&str, &str, &str)]) -> String {
    let mut out = format!("[[modules]]\nname = \"{name}\"\npath = \".\"\n");
    for (kind, source, dest) in transforms {
        out.push_str(&format!(
            "\n[[modules.transforms.{kind}]]\nsource = \"{source}\"\ndest = \"{dest}\"\n"
        ));
    }
    out
}
