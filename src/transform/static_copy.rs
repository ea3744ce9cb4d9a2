// src/transform/static_copy.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{EffectiveConfig, TransformDescriptor};
use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::transform::source::{SourcePattern, glob_under};
use crate::transform::{BoxFuture, TransformStrategy, TransformSummary, watch_base};
use crate::types::TransformKind;

/// Copies matched files verbatim into `dest`, keeping their path relative to
/// the source's literal base.
pub struct StaticCopyStrategy {
    fs: Arc<dyn FileSystem>,
}

impl StaticCopyStrategy {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    async fn run(&self, descriptor: &TransformDescriptor) -> Result<TransformSummary, TransformError> {
        let pattern = SourcePattern::resolve(&descriptor.base_path, &descriptor.source)
            .map_err(|e| descriptor.failure(format!("{e:#}")))?;
        let fs = Arc::clone(&self.fs);
        let dest = descriptor.dest.clone();

        tokio::task::spawn_blocking(move || copy_all(fs.as_ref(), &pattern, &dest))
            .await
            .map_err(|e| descriptor.failure(format!("copy task panicked: {e}")))?
            .map_err(|e| descriptor.failure(format!("{e:#}")))
    }
}

fn copy_all(fs: &dyn FileSystem, pattern: &SourcePattern, dest: &Path) -> Result<TransformSummary> {
    let files = pattern.expand(fs)?;
    let mut outputs = Vec::with_capacity(files.len());

    for file in &files {
        let target = dest.join(pattern.relative(file));
        fs.copy(file, &target)
            .with_context(|| format!("copying {}", file.display()))?;
        outputs.push(target);
    }

    Ok(TransformSummary {
        files: files.len(),
        outputs,
    })
}

impl TransformStrategy for StaticCopyStrategy {
    fn kind(&self) -> TransformKind {
        TransformKind::Static
    }

    fn run_once<'a>(
        &'a self,
        descriptor: &'a TransformDescriptor,
        _config: &'a EffectiveConfig,
    ) -> BoxFuture<'a, Result<TransformSummary, TransformError>> {
        Box::pin(self.run(descriptor))
    }

    fn watch_pattern(&self, descriptor: &TransformDescriptor) -> String {
        glob_under(&watch_base(descriptor), "**/*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DescriptorId;
    use crate::fs::mock::MockFileSystem;

    fn descriptor(source: &str, dest: &str) -> TransformDescriptor {
        TransformDescriptor {
            id: DescriptorId {
                module: 0,
                kind: TransformKind::Static,
                index: 0,
            },
            module: "core".to_string(),
            base_path: PathBuf::from("/p"),
            source: source.to_string(),
            dest: PathBuf::from(dest),
        }
    }

    #[tokio::test]
    async fn glob_copy_preserves_relative_paths() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/static/img/logo.png", vec![137u8, 80, 78, 71]);
        fs.add_file("/p/src/static/robots.txt", b"User-agent: *".to_vec());

        let strategy = StaticCopyStrategy::new(Arc::new(fs.clone()));
        let summary = strategy
            .run(&descriptor("src/static/**/*", "/p/static"))
            .await
            .unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(
            fs.contents("/p/static/img/logo.png"),
            Some(vec![137u8, 80, 78, 71])
        );
        assert!(fs.is_file(Path::new("/p/static/robots.txt")));
    }

    #[tokio::test]
    async fn single_file_lands_inside_dest() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/assets/favicon.ico", vec![0u8, 1, 2]);

        let strategy = StaticCopyStrategy::new(Arc::new(fs.clone()));
        strategy
            .run(&descriptor("assets/favicon.ico", "/p/public"))
            .await
            .unwrap();

        assert_eq!(fs.contents("/p/public/favicon.ico"), Some(vec![0u8, 1, 2]));
    }

    #[tokio::test]
    async fn missing_single_file_fails_with_descriptor() {
        let fs = MockFileSystem::new();
        let strategy = StaticCopyStrategy::new(Arc::new(fs));
        let err = strategy
            .run(&descriptor("assets/missing.ico", "/p/public"))
            .await
            .unwrap_err();
        assert_eq!(err.module, "core");
        assert!(err.reason.contains("missing.ico"));
    }
}
