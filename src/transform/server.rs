// src/transform/server.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::{EffectiveConfig, TransformDescriptor};
use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::transform::source::{SourcePattern, glob_under};
use crate::transform::{BoxFuture, Toolchain, TransformStrategy, TransformSummary, watch_base};
use crate::types::TransformKind;

/// Compiles every matched server file on its own, mirroring the source tree
/// under `dest`.
///
/// Files compile concurrently. A failing file does not stop its siblings;
/// all per-file failures are folded into one [`TransformError`].
pub struct ServerScriptStrategy {
    toolchain: Arc<dyn Toolchain>,
    fs: Arc<dyn FileSystem>,
}

impl ServerScriptStrategy {
    pub fn new(toolchain: Arc<dyn Toolchain>, fs: Arc<dyn FileSystem>) -> Self {
        Self { toolchain, fs }
    }

    async fn run(
        &self,
        descriptor: &TransformDescriptor,
        config: &EffectiveConfig,
    ) -> Result<TransformSummary, TransformError> {
        let pattern = SourcePattern::resolve(&descriptor.base_path, &descriptor.source)
            .map_err(|e| descriptor.failure(e))?;

        let files = {
            let fs = Arc::clone(&self.fs);
            let pattern = pattern.clone();
            tokio::task::spawn_blocking(move || pattern.expand(fs.as_ref()))
                .await
                .map_err(|e| descriptor.failure(anyhow!("source expansion panicked: {e}")))?
                .map_err(|e| descriptor.failure(e))?
        };

        if files.is_empty() {
            warn!(
                module = %descriptor.module,
                source = %descriptor.source,
                "server source matched no files"
            );
            return Ok(TransformSummary::default());
        }

        let mut set = JoinSet::new();
        for file in files.iter().cloned() {
            let out_dir = output_dir(&pattern, &descriptor.dest, &file);
            let toolchain = Arc::clone(&self.toolchain);
            let options = config.server.clone();
            set.spawn(async move {
                let result = toolchain.compile_script(&file, &out_dir, &options).await;
                (file, out_dir, result)
            });
        }

        let mut outputs = Vec::new();
        let mut failures = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((file, out_dir, Ok(()))) => {
                    debug!(file = %file.display(), "compiled server file");
                    outputs.push(compiled_name(&file, &out_dir));
                }
                Ok((file, _, Err(e))) => failures.push(format!("{}: {e:#}", file.display())),
                Err(e) => failures.push(format!("compile task panicked: {e}")),
            }
        }

        if !failures.is_empty() {
            failures.sort();
            return Err(descriptor.failure(failures.join("; ")));
        }

        outputs.sort();
        Ok(TransformSummary {
            files: files.len(),
            outputs,
        })
    }
}

/// `dest` plus the file's directory relative to the source's literal base.
fn output_dir(pattern: &SourcePattern, dest: &Path, file: &Path) -> PathBuf {
    match pattern.relative(file).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => dest.join(parent),
        _ => dest.to_path_buf(),
    }
}

fn compiled_name(file: &Path, out_dir: &Path) -> PathBuf {
    let stem = file.file_stem().unwrap_or_default();
    out_dir.join(stem).with_extension("js")
}

impl TransformStrategy for ServerScriptStrategy {
    fn kind(&self) -> TransformKind {
        TransformKind::ServerScript
    }

    fn run_once<'a>(
        &'a self,
        descriptor: &'a TransformDescriptor,
        config: &'a EffectiveConfig,
    ) -> BoxFuture<'a, Result<TransformSummary, TransformError>> {
        Box::pin(self.run(descriptor, config))
    }

    fn watch_pattern(&self, descriptor: &TransformDescriptor) -> String {
        glob_under(&watch_base(descriptor), "**/*.{ts,tsx,js}")
    }
}
