// src/config/loader.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::{debug, info};

use crate::config::defaults::{builtin_defaults, defaults_deep, preset_table};
use crate::config::model::{ConfigSnapshot, EffectiveConfig, RawConfigFile};
use crate::errors::{BasisError, Result};
use crate::types::Preset;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "build.conf.toml";

/// Resolve raw user configuration text into an [`EffectiveConfig`].
///
/// - `None` means the config file does not exist; the result is the
///   development preset with no modules.
/// - Malformed TOML, ill-typed fields, or an unknown preset name produce
///   [`BasisError::ConfigError`].
/// - Relative module paths are resolved against `config_dir`.
pub fn resolve(raw: Option<&str>, config_dir: &Path) -> Result<EffectiveConfig> {
    let mut user: Table = match raw {
        Some(text) => toml::from_str(text)
            .map_err(|e| BasisError::ConfigError(format!("malformed configuration: {e}")))?,
        None => Table::new(),
    };

    let defaults = builtin_defaults();
    let preset = preset_name(&user, &defaults)?;
    debug!(%preset, "applying configuration preset");

    defaults_deep(&mut user, &preset_table(preset));
    defaults_deep(&mut user, &defaults);

    let merged: RawConfigFile = Value::Table(user)
        .try_into()
        .map_err(|e| BasisError::ConfigError(format!("invalid configuration: {e}")))?;

    Ok(EffectiveConfig::from_raw(merged, config_dir))
}

fn preset_name(user: &Table, defaults: &Table) -> Result<Preset> {
    let value = user.get("preset").or_else(|| defaults.get("preset"));
    match value {
        Some(Value::String(s)) => s.parse().map_err(BasisError::ConfigError),
        Some(other) => Err(BasisError::ConfigError(format!(
            "`preset` must be a string, got {}",
            other.type_str()
        ))),
        None => Ok(Preset::default()),
    }
}

/// Load and resolve the config file at `path`.
///
/// A missing file is not an error; see [`resolve`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<EffectiveConfig> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no configuration file found; using development preset");
            None
        }
        Err(e) => return Err(e.into()),
    };

    resolve(contents.as_deref(), &config_root_dir(path))
}

/// Directory against which relative module paths are resolved.
///
/// - `configs/build.conf.toml` resolves against `configs/`.
/// - A bare file name resolves against the current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Re-entrant loader producing versioned [`ConfigSnapshot`]s.
///
/// The path is made absolute once so that watch bindings on the config file
/// keep matching regardless of later working-directory changes.
#[derive(Debug)]
pub struct ConfigLoader {
    path: PathBuf,
    version: u64,
}

impl ConfigLoader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        Ok(Self { path, version: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version of the last successfully loaded snapshot (0 before any load).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Read and resolve the file from scratch. The version only advances on
    /// success.
    pub fn load(&mut self) -> Result<ConfigSnapshot> {
        let config = load_from_path(&self.path)?;
        self.version += 1;
        info!(
            version = self.version,
            preset = %config.preset,
            modules = config.modules.len(),
            "configuration loaded"
        );
        Ok(ConfigSnapshot::new(self.version, &self.path, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_resolves_to_development_without_modules() {
        let cfg = resolve(None, Path::new("/proj")).unwrap();
        assert_eq!(cfg.preset, Preset::Development);
        assert!(!cfg.minify);
        assert!(cfg.modules.is_empty());
        assert_eq!(cfg.server.module, "commonjs");
        assert_eq!(cfg.styles.style, "expanded");
    }

    #[test]
    fn wrong_type_is_a_config_error() {
        let err = resolve(Some("minify = \"yes\""), Path::new("/proj")).unwrap_err();
        assert!(matches!(err, BasisError::ConfigError(_)));
    }

    #[test]
    fn non_string_preset_is_a_config_error() {
        let err = resolve(Some("preset = 3"), Path::new("/proj")).unwrap_err();
        match err {
            BasisError::ConfigError(msg) => assert!(msg.contains("preset")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }
}
