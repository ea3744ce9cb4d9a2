use std::error::Error;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use basis::config::normalize::UNNAMED_MODULE;
use basis::config::{load_from_path, resolve};
use basis::errors::BasisError;
use basis::types::{Preset, TransformKind};
use basis_test_utils::builders::{ProjectBuilder, module_toml};
use basis_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

const SAMPLE: &str = r#"
preset = "production"

[[modules]]
name = "core"
path = "site"

[[modules.transforms.static]]
source = "src/static/**/*"
dest = "static"

[[modules.transforms.styles]]
source = "src/styles/main.scss"
dest = "static/bundle.css"

[styles]
style = "compressed"
"#;

#[test]
fn resolving_twice_gives_equal_configs() -> TestResult {
    let dir = Path::new("/proj");
    let a = resolve(Some(SAMPLE), dir)?;
    let b = resolve(Some(SAMPLE), dir)?;
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn user_values_are_merged_over_nested_defaults() -> TestResult {
    let cfg = resolve(Some(SAMPLE), Path::new("/proj"))?;

    assert_eq!(cfg.styles.style, "compressed");
    // Sibling keys of the user's `[styles]` table still come from defaults.
    assert!(cfg.styles.sourcemap);
    assert!(cfg.styles.command.contains("{input}"));
    assert_eq!(cfg.server.module, "commonjs");
    Ok(())
}

#[test]
fn production_preset_turns_on_minify() -> TestResult {
    let cfg = resolve(Some("preset = \"production\""), Path::new("/proj"))?;
    assert_eq!(cfg.preset, Preset::Production);
    assert!(cfg.minify);
    Ok(())
}

#[test]
fn explicit_minify_beats_the_preset() -> TestResult {
    let cfg = resolve(
        Some("preset = \"production\"\nminify = false"),
        Path::new("/proj"),
    )?;
    assert!(!cfg.minify);
    Ok(())
}

#[test]
fn modules_are_normalized_against_the_config_dir() -> TestResult {
    let cfg = resolve(Some(SAMPLE), Path::new("/proj"))?;
    let module = &cfg.modules[0];

    assert_eq!(module.base_path, PathBuf::from("/proj/site"));
    assert_eq!(module.build_dir(cfg.preset), PathBuf::from("/proj/site/release"));

    let statics = module.descriptors(TransformKind::Static);
    assert_eq!(statics.len(), 1);
    assert_eq!(statics[0].dest, PathBuf::from("/proj/site/static"));
    assert_eq!(statics[0].module, "core");
    Ok(())
}

#[test]
fn nameless_module_defaults_name_and_path() -> TestResult {
    let cfg = resolve(
        Some("[[modules]]\n[[modules.transforms.static]]\nsource = \"a.txt\"\n"),
        Path::new("/proj"),
    )?;
    let module = &cfg.modules[0];
    assert_eq!(module.name, UNNAMED_MODULE);
    assert_eq!(module.base_path, PathBuf::from("/proj"));
    assert_eq!(module.descriptors(TransformKind::Static)[0].dest, PathBuf::from("/proj"));
    Ok(())
}

#[test]
fn absent_file_resolves_to_development_fallback() -> TestResult {
    init_tracing();
    let project = ProjectBuilder::new();

    let cfg = load_from_path(project.config_path())?;
    assert_eq!(cfg.preset, Preset::Development);
    assert!(!cfg.minify);
    assert!(cfg.modules.is_empty());
    Ok(())
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = resolve(Some("[[modules]\nname = "), Path::new("/proj")).unwrap_err();
    assert!(matches!(err, BasisError::ConfigError(_)), "got {err:?}");
}

#[test]
fn unknown_preset_is_a_config_error() {
    let err = resolve(Some("preset = \"staging\""), Path::new("/proj")).unwrap_err();
    match err {
        BasisError::ConfigError(msg) => assert!(msg.contains("staging")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn loader_version_advances_only_on_success() -> TestResult {
    init_tracing();
    let project = ProjectBuilder::new().config(&module_toml(
        "core",
        &[("static", "src/**/*", "out")],
    ));
    let mut loader = project.loader();

    assert_eq!(loader.load()?.version, 1);

    project.write("build.conf.toml", "modules = 3");
    assert!(loader.load().is_err());
    assert_eq!(loader.version(), 1);

    project.write("build.conf.toml", "preset = \"production\"");
    let snapshot = loader.load()?;
    assert_eq!(snapshot.version, 2);
    assert!(snapshot.config.minify);
    Ok(())
}

fn preset_strategy() -> impl Strategy<Value = Preset> {
    prop_oneof![Just(Preset::Production), Just(Preset::Development)]
}

proptest! {
    // minify == user value if given, otherwise whatever the preset says.
    #[test]
    fn preset_merge_law(preset in preset_strategy(), user_minify in proptest::option::of(any::<bool>())) {
        let mut text = format!("preset = \"{preset}\"\n");
        if let Some(m) = user_minify {
            text.push_str(&format!("minify = {m}\n"));
        }

        let cfg = resolve(Some(&text), Path::new("/proj")).unwrap();
        prop_assert_eq!(cfg.preset, preset);
        prop_assert_eq!(cfg.minify, user_minify.unwrap_or(preset.minify()));
    }

    #[test]
    fn resolve_is_idempotent_for_any_style(style in "[a-z]{1,12}", sourcemap in any::<bool>()) {
        let text = format!("[styles]\nstyle = \"{style}\"\nsourcemap = {sourcemap}\n");
        let a = resolve(Some(&text), Path::new("/proj")).unwrap();
        let b = resolve(Some(&text), Path::new("/proj")).unwrap();
        prop_assert_eq!(&a.styles.style, &style);
        prop_assert_eq!(a, b);
    }
}
