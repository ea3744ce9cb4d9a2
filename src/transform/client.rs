// src/transform/client.rs

use std::sync::Arc;

use crate::config::{EffectiveConfig, TransformDescriptor};
use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::transform::source::glob_under;
use crate::transform::{BoxFuture, Toolchain, TransformStrategy, TransformSummary, watch_base};
use crate::types::TransformKind;

/// Bundles a single client entry point into `dest`.
///
/// This is the only strategy that rebuilds per descriptor in watch mode.
pub struct ClientScriptStrategy {
    toolchain: Arc<dyn Toolchain>,
    fs: Arc<dyn FileSystem>,
}

impl ClientScriptStrategy {
    pub fn new(toolchain: Arc<dyn Toolchain>, fs: Arc<dyn FileSystem>) -> Self {
        Self { toolchain, fs }
    }

    async fn run(
        &self,
        descriptor: &TransformDescriptor,
        config: &EffectiveConfig,
    ) -> Result<TransformSummary, TransformError> {
        let entry = descriptor.base_path.join(&descriptor.source);
        if !self.fs.is_file(&entry) {
            return Err(descriptor.failure(format!(
                "entry point not found: {}",
                entry.display()
            )));
        }

        self.toolchain
            .bundle(&entry, &descriptor.dest, &config.client, config.minify)
            .await
            .map_err(|e| descriptor.failure(format!("{e:#}")))?;

        Ok(TransformSummary {
            files: 1,
            outputs: vec![descriptor.dest.clone()],
        })
    }
}

impl TransformStrategy for ClientScriptStrategy {
    fn kind(&self) -> TransformKind {
        TransformKind::ClientScript
    }

    fn run_once<'a>(
        &'a self,
        descriptor: &'a TransformDescriptor,
        config: &'a EffectiveConfig,
    ) -> BoxFuture<'a, Result<TransformSummary, TransformError>> {
        Box::pin(self.run(descriptor, config))
    }

    fn supports_incremental_watch(&self) -> bool {
        true
    }

    fn watch_pattern(&self, descriptor: &TransformDescriptor) -> String {
        glob_under(&watch_base(descriptor), "**/*.{ts,tsx,js,jsx}")
    }
}
