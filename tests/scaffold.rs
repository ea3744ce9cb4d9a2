use std::error::Error;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tempfile::TempDir;

use basis::scaffold::{ScaffoldError, ScaffoldRequest, scaffold};
use basis_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn put(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn template() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    put(root, ".git/HEAD", "ref: refs/heads/main\n");
    put(root, "node_modules/gulp/index.js", "");
    put(root, "node_modules/@scope/shared/index.js", "module.exports = 1;\n");
    put(root, "release/server.js", "");
    put(root, ".sass-cache/a.cache", "");
    put(
        root,
        "package.json",
        r#"{"name":"basis","version":"0.4.2","description":"template","scripts":{"start":"node build/server.js"}}"#,
    );
    put(root, "README.md", "# basis\n");
    put(root, "CHANGES.md", "- initial\n");
    put(root, "build.conf.toml", "preset = \"development\"\n");
    put(root, "src/server/app.ts", "export {};\n");
    put(root, "src/static/release/notes.txt", "kept: nested release dir\n");
    put(
        root,
        "basis.sublime-project",
        r#"{"folders":[{"path":".","name":"basis"}]}"#,
    );
    dir
}

#[test]
fn copies_template_without_denylisted_entries() -> TestResult {
    init_tracing();
    let tpl = template();
    let out = tempfile::tempdir()?;
    let dest = out.path().join("shop");

    let report = scaffold(&ScaffoldRequest {
        template_root: tpl.path().to_path_buf(),
        destination: dest.clone(),
        project_name: "shop".to_string(),
    })?;

    assert_eq!(report.destination, dest);
    assert!(dest.join("build.conf.toml").is_file());
    assert!(dest.join("src/server/app.ts").is_file());
    assert!(dest.join("src/static/release/notes.txt").is_file());
    assert!(dest.join("node_modules/@scope/shared/index.js").is_file());

    assert!(!dest.join(".git").exists());
    assert!(!dest.join("node_modules/gulp").exists());
    assert!(!dest.join("release").exists());
    assert!(!dest.join(".sass-cache").exists());
    assert!(!dest.join("CHANGES.md").exists());
    assert!(!dest.join("basis.sublime-project").exists());

    // build.conf.toml, app.ts, notes.txt, scoped package.
    assert_eq!(report.files_copied, 4);
    Ok(())
}

#[test]
fn writes_per_project_files() -> TestResult {
    let tpl = template();
    let out = tempfile::tempdir()?;
    let dest = out.path().join("shop");

    scaffold(&ScaffoldRequest {
        template_root: tpl.path().to_path_buf(),
        destination: dest.clone(),
        project_name: "shop".to_string(),
    })?;

    let readme = fs::read_to_string(dest.join("README.md"))?;
    assert!(readme.starts_with("# shop\n"));

    let manifest: Value = serde_json::from_str(&fs::read_to_string(dest.join("package.json"))?)?;
    assert_eq!(manifest["name"], "shop");
    assert_eq!(manifest["version"], "1.0.0");
    assert_eq!(manifest["scripts"]["start"], "node build/server.js");

    let editor = fs::read_to_string(dest.join("shop.sublime-project"))?;
    assert!(editor.contains(r#""name":"shop""#));
    Ok(())
}

#[test]
fn destination_inside_template_is_refused() -> TestResult {
    let tpl = template();
    let err = scaffold(&ScaffoldRequest {
        template_root: tpl.path().to_path_buf(),
        destination: tpl.path().join("nested/copy"),
        project_name: "copy".to_string(),
    })
    .unwrap_err();

    assert!(matches!(err, ScaffoldError::DestinationInsideTemplate { .. }));
    assert!(!tpl.path().join("nested").exists());
    Ok(())
}

#[test]
fn missing_template_is_reported() -> TestResult {
    let out = tempfile::tempdir()?;
    let err = scaffold(&ScaffoldRequest {
        template_root: out.path().join("nope"),
        destination: out.path().join("dest"),
        project_name: "dest".to_string(),
    })
    .unwrap_err();

    assert!(matches!(err, ScaffoldError::TemplateMissing(_)));
    Ok(())
}
