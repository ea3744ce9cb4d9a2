// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::errors::TransformError;
use crate::types::{Preset, TransformKind};

/// Merged configuration as deserialized after defaults and preset have been
/// layered beneath the user file.
///
/// Every top-level field is guaranteed to be present at this point because
/// the built-in defaults table provides all of them. Module entries are still
/// raw and get normalized into [`Module`]s.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub preset: Preset,
    pub minify: bool,

    #[serde(default)]
    pub modules: Vec<RawModule>,

    pub server: ScriptOptions,
    pub client: ScriptOptions,
    pub styles: StyleOptions,
}

/// One `[[modules]]` entry exactly as the user wrote it.
///
/// ```toml
/// [[modules]]
/// name = "core"
/// path = "."
/// buildPath = "debug"
/// productionBuildPath = "release"
///
/// [[modules.transforms.static]]
/// source = "src/static/**/*"
/// dest = "static"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawModule {
    #[serde(default)]
    pub name: Option<String>,

    /// Absolute, or relative to the directory holding the config file.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub build_path: Option<String>,

    #[serde(default)]
    pub production_build_path: Option<String>,

    #[serde(default)]
    pub transforms: RawTransforms,
}

/// `[modules.transforms]`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransforms {
    #[serde(default)]
    pub server: Vec<RawTransform>,
    #[serde(default)]
    pub client: Vec<RawTransform>,
    #[serde(default)]
    pub styles: Vec<RawTransform>,
    #[serde(default, rename = "static")]
    pub static_files: Vec<RawTransform>,
}

impl RawTransforms {
    pub fn of_kind(&self, kind: TransformKind) -> &[RawTransform] {
        match kind {
            TransformKind::ServerScript => &self.server,
            TransformKind::ClientScript => &self.client,
            TransformKind::Style => &self.styles,
            TransformKind::Static => &self.static_files,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTransform {
    pub source: String,

    #[serde(default)]
    pub dest: String,
}

/// Options handed to the script compiler / bundler.
///
/// `command` is a template; see [`crate::transform::toolchain`] for the
/// supported placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptOptions {
    pub module: String,
    pub command: String,

    /// Substituted for `{minify}` when minification is enabled.
    #[serde(default)]
    pub minify_flag: String,
}

/// Options handed to the stylesheet compiler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StyleOptions {
    pub style: String,
    pub sourcemap: bool,
    pub command: String,
}

/// Stable identity of a descriptor inside one configuration: which module,
/// which kind, and its position in that module's list for the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorId {
    pub module: usize,
    pub kind: TransformKind,
    pub index: usize,
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.module, self.kind, self.index)
    }
}

/// A declared source-to-destination conversion, already resolved against the
/// owning module's base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformDescriptor {
    pub id: DescriptorId,
    /// Name of the owning module.
    pub module: String,
    pub base_path: PathBuf,
    /// Source path or glob as declared, relative to `base_path`.
    pub source: String,
    /// Absolute destination (file or directory, depending on the kind).
    pub dest: PathBuf,
}

impl TransformDescriptor {
    pub fn kind(&self) -> TransformKind {
        self.id.kind
    }

    /// Build a [`TransformError`] attributed to this descriptor.
    pub fn failure(&self, reason: impl fmt::Display) -> TransformError {
        TransformError {
            descriptor: self.id,
            module: self.module.clone(),
            reason: reason.to_string(),
        }
    }
}

/// A normalized module. `name` and `base_path` are always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub base_path: PathBuf,
    pub build_path: String,
    pub production_build_path: String,
    pub transforms: BTreeMap<TransformKind, Vec<TransformDescriptor>>,
}

impl Module {
    pub fn descriptors(&self, kind: TransformKind) -> &[TransformDescriptor] {
        self.transforms
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Output root for the given preset (`buildPath` or `productionBuildPath`).
    pub fn build_dir(&self, preset: Preset) -> PathBuf {
        let dir = match preset {
            Preset::Production => &self.production_build_path,
            Preset::Development => &self.build_path,
        };
        self.base_path.join(dir)
    }
}

/// Result of merging defaults, preset and user configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub preset: Preset,
    pub minify: bool,
    pub modules: Vec<Module>,
    pub server: ScriptOptions,
    pub client: ScriptOptions,
    pub styles: StyleOptions,
}

impl EffectiveConfig {
    /// Every `(module, descriptor)` pair of the given kind, in declaration order.
    pub fn descriptors(
        &self,
        kind: TransformKind,
    ) -> impl Iterator<Item = (&Module, &TransformDescriptor)> {
        self.modules
            .iter()
            .flat_map(move |m| m.descriptors(kind).iter().map(move |d| (m, d)))
    }

    /// Every descriptor of every kind.
    pub fn all_descriptors(&self) -> impl Iterator<Item = (&Module, &TransformDescriptor)> {
        TransformKind::ALL
            .into_iter()
            .flat_map(move |kind| self.descriptors(kind))
    }

    pub fn find(&self, id: DescriptorId) -> Option<(&Module, &TransformDescriptor)> {
        let module = self.modules.get(id.module)?;
        let descriptor = module.descriptors(id.kind).get(id.index)?;
        Some((module, descriptor))
    }
}

/// Immutable, versioned view of the configuration.
///
/// Components never read a shared mutable global; they receive the snapshot
/// that was current when their work was requested. Each reload produces a
/// new snapshot with a higher `version`.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub version: u64,
    pub path: PathBuf,
    pub config: Arc<EffectiveConfig>,
}

impl ConfigSnapshot {
    pub fn new(version: u64, path: impl AsRef<Path>, config: EffectiveConfig) -> Self {
        Self {
            version,
            path: path.as_ref().to_path_buf(),
            config: Arc::new(config),
        }
    }
}
