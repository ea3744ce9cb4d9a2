// src/transform/registry.rs

use std::fmt;
use std::sync::Arc;

use crate::fs::{FileSystem, RealFileSystem};
use crate::transform::client::ClientScriptStrategy;
use crate::transform::server::ServerScriptStrategy;
use crate::transform::static_copy::StaticCopyStrategy;
use crate::transform::styles::StyleStrategy;
use crate::transform::{CommandToolchain, Toolchain, TransformStrategy};
use crate::types::TransformKind;

/// Fixed mapping from [`TransformKind`] to its strategy.
///
/// The table is built once and never changes; the match in
/// [`strategy_for`](Self::strategy_for) is exhaustive over the closed kind set.
#[derive(Clone)]
pub struct TransformRegistry {
    server: Arc<dyn TransformStrategy>,
    client: Arc<dyn TransformStrategy>,
    styles: Arc<dyn TransformStrategy>,
    statics: Arc<dyn TransformStrategy>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry").finish_non_exhaustive()
    }
}

impl TransformRegistry {
    pub fn new(toolchain: Arc<dyn Toolchain>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            server: Arc::new(ServerScriptStrategy::new(
                Arc::clone(&toolchain),
                Arc::clone(&fs),
            )),
            client: Arc::new(ClientScriptStrategy::new(
                Arc::clone(&toolchain),
                Arc::clone(&fs),
            )),
            styles: Arc::new(StyleStrategy::new(toolchain, Arc::clone(&fs))),
            statics: Arc::new(StaticCopyStrategy::new(fs)),
        }
    }

    /// Registry backed by the configured shell commands and the real
    /// filesystem.
    pub fn with_command_toolchain() -> Self {
        Self::new(Arc::new(CommandToolchain), Arc::new(RealFileSystem))
    }

    pub fn strategy_for(&self, kind: TransformKind) -> Arc<dyn TransformStrategy> {
        let strategy = match kind {
            TransformKind::ServerScript => &self.server,
            TransformKind::ClientScript => &self.client,
            TransformKind::Style => &self.styles,
            TransformKind::Static => &self.statics,
        };
        Arc::clone(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_its_own_strategy() {
        let registry = TransformRegistry::with_command_toolchain();
        for kind in TransformKind::ALL {
            assert_eq!(registry.strategy_for(kind).kind(), kind);
        }
    }

    #[test]
    fn only_client_rebuilds_incrementally() {
        let registry = TransformRegistry::with_command_toolchain();
        for kind in TransformKind::ALL {
            assert_eq!(
                registry.strategy_for(kind).supports_incremental_watch(),
                kind == TransformKind::ClientScript
            );
        }
    }
}
