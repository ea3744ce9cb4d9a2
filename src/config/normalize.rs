// src/config/normalize.rs

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::config::model::{
    DescriptorId, EffectiveConfig, Module, RawConfigFile, RawModule, TransformDescriptor,
};
use crate::types::TransformKind;

pub const UNNAMED_MODULE: &str = "unnamed module";

impl EffectiveConfig {
    /// Normalize a merged raw config. This never fails: gaps are filled with
    /// defaults and every path is made absolute against `config_dir`.
    pub fn from_raw(raw: RawConfigFile, config_dir: &Path) -> Self {
        let modules = raw
            .modules
            .into_iter()
            .enumerate()
            .map(|(index, module)| normalize_module(index, module, config_dir))
            .collect();

        EffectiveConfig {
            preset: raw.preset,
            minify: raw.minify,
            modules,
            server: raw.server,
            client: raw.client,
            styles: raw.styles,
        }
    }
}

/// Fill in `name` / `path` and resolve every descriptor against the
/// module's base path.
pub fn normalize_module(index: usize, raw: RawModule, config_dir: &Path) -> Module {
    let name = raw
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNNAMED_MODULE.to_string());

    let base_path = match raw.path {
        Some(p) => clean_path(&config_dir.join(p)),
        None => clean_path(config_dir),
    };

    let mut transforms = BTreeMap::new();
    for kind in TransformKind::ALL {
        let descriptors: Vec<TransformDescriptor> = raw
            .transforms
            .of_kind(kind)
            .iter()
            .enumerate()
            .map(|(i, t)| TransformDescriptor {
                id: DescriptorId {
                    module: index,
                    kind,
                    index: i,
                },
                module: name.clone(),
                base_path: base_path.clone(),
                source: t.source.clone(),
                dest: clean_path(&base_path.join(&t.dest)),
            })
            .collect();

        if !descriptors.is_empty() {
            transforms.insert(kind, descriptors);
        }
    }

    Module {
        name,
        base_path,
        build_path: raw.build_path.unwrap_or_else(|| "debug".to_string()),
        production_build_path: raw
            .production_build_path
            .unwrap_or_else(|| "release".to_string()),
        transforms,
    }
}

/// Lexically drop `.` and fold `..` so that the same directory always
/// renders to the same string (watch bindings compare path strings).
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{RawTransform, RawTransforms};

    #[test]
    fn clean_path_folds_dots() {
        assert_eq!(clean_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean_path(Path::new("/proj/.")), PathBuf::from("/proj"));
    }

    #[test]
    fn empty_module_gets_name_and_path() {
        let m = normalize_module(0, RawModule::default(), Path::new("/proj"));
        assert_eq!(m.name, UNNAMED_MODULE);
        assert_eq!(m.base_path, PathBuf::from("/proj"));
        assert!(m.transforms.is_empty());
    }

    #[test]
    fn blank_name_is_treated_as_missing() {
        let raw = RawModule {
            name: Some("   ".to_string()),
            ..RawModule::default()
        };
        let m = normalize_module(0, raw, Path::new("/proj"));
        assert_eq!(m.name, UNNAMED_MODULE);
    }

    #[test]
    fn descriptors_resolve_against_module_path() {
        let raw = RawModule {
            name: Some("web".to_string()),
            path: Some(PathBuf::from("site")),
            transforms: RawTransforms {
                static_files: vec![RawTransform {
                    source: "src/static/**/*".to_string(),
                    dest: "static".to_string(),
                }],
                ..RawTransforms::default()
            },
            ..RawModule::default()
        };

        let m = normalize_module(3, raw, Path::new("/proj"));
        let d = &m.descriptors(TransformKind::Static)[0];
        assert_eq!(d.base_path, PathBuf::from("/proj/site"));
        assert_eq!(d.dest, PathBuf::from("/proj/site/static"));
        assert_eq!(d.id.module, 3);
        assert_eq!(d.module, "web");
    }
}
