// src/transform/mod.rs

//! Transform strategies.
//!
//! Every [`TransformKind`] has exactly one [`TransformStrategy`], looked up
//! through the [`TransformRegistry`]. A strategy performs one pass over a
//! single descriptor; it knows nothing about tasks, aggregation or watching.
//!
//! - [`source`] resolves a descriptor's `source` into files.
//! - [`toolchain`] is the seam to the external compilers.
//! - [`server`], [`client`], [`styles`], [`static_copy`] are the strategies.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::config::{EffectiveConfig, TransformDescriptor};
use crate::errors::TransformError;
use crate::types::TransformKind;

pub mod client;
pub mod registry;
pub mod server;
pub mod source;
pub mod static_copy;
pub mod styles;
pub mod toolchain;

pub use registry::TransformRegistry;
pub use source::SourcePattern;
pub use toolchain::{CommandToolchain, Toolchain};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a successful pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSummary {
    /// Number of source files processed.
    pub files: usize,
    pub outputs: Vec<PathBuf>,
}

/// Execution strategy for one transform kind.
pub trait TransformStrategy: Send + Sync {
    fn kind(&self) -> TransformKind;

    /// Run the transform once for `descriptor` with the options in `config`.
    fn run_once<'a>(
        &'a self,
        descriptor: &'a TransformDescriptor,
        config: &'a EffectiveConfig,
    ) -> BoxFuture<'a, Result<TransformSummary, TransformError>>;

    /// Whether a change should re-run only this descriptor (`Rebundle`)
    /// rather than the whole kind.
    fn supports_incremental_watch(&self) -> bool {
        false
    }

    /// Absolute glob the watch dispatcher binds for this descriptor.
    fn watch_pattern(&self, descriptor: &TransformDescriptor) -> String;

    /// File or directory every output of this descriptor is written to.
    /// Changes there never re-trigger the descriptor's own task.
    fn output_root(&self, descriptor: &TransformDescriptor) -> PathBuf {
        descriptor.dest.clone()
    }
}

/// Literal base directory of a descriptor's source, for watch patterns.
///
/// Falls back to the module base path when the source glob is invalid; the
/// error itself surfaces when the transform runs.
pub(crate) fn watch_base(descriptor: &TransformDescriptor) -> PathBuf {
    SourcePattern::resolve(&descriptor.base_path, &descriptor.source)
        .map(|p| p.literal_base().to_path_buf())
        .unwrap_or_else(|_| descriptor.base_path.clone())
}
