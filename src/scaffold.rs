// src/scaffold.rs

//! Project scaffolding for `basis-gen`.
//!
//! Copies a template tree into a new directory, skipping build output,
//! VCS metadata and files that are regenerated per project (README and
//! manifest), then writes those per-project files with the new name.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::normalize::clean_path;

pub const MANIFEST_FILE: &str = "package.json";
pub const README_FILE: &str = "README.md";
const EDITOR_PROJECT_FILE: &str = "basis.sublime-project";

#[derive(Error, Debug)]
pub enum ScaffoldError {
    #[error("template directory not found: {}", .0.display())]
    TemplateMissing(PathBuf),

    #[error("destination {} is inside the template {}", .destination.display(), .template.display())]
    DestinationInsideTemplate {
        destination: PathBuf,
        template: PathBuf,
    },

    #[error("invalid denylist pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("walking template: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("template manifest is not valid JSON: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ScaffoldError + '_ {
    move |source| ScaffoldError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Template-relative paths that are never copied. Patterns are matched
/// against forward-slash relative paths.
#[derive(Debug, Clone)]
pub struct Denylist {
    patterns: Vec<Regex>,
}

impl Denylist {
    pub fn standard() -> Result<Self, ScaffoldError> {
        let patterns = [
            // Installed packages, except scoped `@org/...` ones.
            r"^node_modules[\\/][^@]",
            r"^\.git$",
            r"^\.sass-cache$",
            r"^(bin|\.template)$",
            r"^(debug|release)$",
            r"^package\.json$",
            r"^(CHANGES\.md|README\.md)$",
            r"^[^/]+\.sublime-",
            r"^target$",
        ]
        .into_iter()
        .map(Regex::new)
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_denied(&self, relative: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(relative))
    }
}

#[derive(Debug, Clone)]
pub struct ScaffoldRequest {
    pub template_root: PathBuf,
    pub destination: PathBuf,
    pub project_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScaffoldReport {
    pub destination: PathBuf,
    pub files_copied: usize,
    pub skipped: Vec<String>,
}

pub fn scaffold(request: &ScaffoldRequest) -> Result<ScaffoldReport, ScaffoldError> {
    let template = absolute(&request.template_root)?;
    let destination = absolute(&request.destination)?;

    if !template.is_dir() {
        return Err(ScaffoldError::TemplateMissing(template));
    }
    if destination.starts_with(&template) {
        return Err(ScaffoldError::DestinationInsideTemplate {
            destination,
            template,
        });
    }

    let denylist = Denylist::standard()?;
    fs::create_dir_all(&destination).map_err(io_err(&destination))?;
    info!(template = %template.display(), destination = %destination.display(), "scaffolding project");

    let mut report = ScaffoldReport {
        destination: destination.clone(),
        ..ScaffoldReport::default()
    };

    let walker = WalkDir::new(&template)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let rel = relative(&template, entry.path());
            let denied = denylist.is_denied(&rel);
            if denied {
                debug!(path = %rel, "skipping denylisted path");
            }
            !denied
        });

    for entry in walker {
        let entry = entry?;
        let rel = relative(&template, entry.path());
        let target = destination.join(&rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(io_err(&target))?;
            report.files_copied += 1;
        } else {
            report.skipped.push(rel);
        }
    }

    let readme_path = destination.join(README_FILE);
    fs::write(&readme_path, readme(&request.project_name)).map_err(io_err(&readme_path))?;

    let template_manifest = template.join(MANIFEST_FILE);
    let manifest_text = match fs::read_to_string(&template_manifest) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(io_err(&template_manifest)(e)),
    };
    let manifest = derive_manifest(manifest_text.as_deref(), &request.project_name)?;
    let manifest_path = destination.join(MANIFEST_FILE);
    fs::write(&manifest_path, manifest).map_err(io_err(&manifest_path))?;

    let editor_project = template.join(EDITOR_PROJECT_FILE);
    if editor_project.is_file() {
        let body = fs::read_to_string(&editor_project).map_err(io_err(&editor_project))?;
        let target = destination.join(format!("{}.sublime-project", request.project_name));
        fs::write(&target, body.replace("basis", &request.project_name))
            .map_err(io_err(&target))?;
    }

    info!(files = report.files_copied, "project created");
    Ok(report)
}

pub fn readme(name: &str) -> String {
    format!("# {name}\nThis project was generated with basis-gen.\n")
}

/// Manifest for the new project: the template's own manifest with `name`,
/// `version` and `description` replaced, or a minimal one if there is none.
pub fn derive_manifest(template: Option<&str>, name: &str) -> Result<String, ScaffoldError> {
    let mut manifest = match template {
        Some(text) => match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        None => Map::new(),
    };

    manifest.insert("name".to_string(), Value::from(name));
    manifest.insert("version".to_string(), Value::from("1.0.0"));
    manifest.insert(
        "description".to_string(),
        Value::from("Generated with basis-gen"),
    );

    let mut text = serde_json::to_string_pretty(&Value::Object(manifest))?;
    text.push('\n');
    Ok(text)
}

/// Project name implied by a destination path: its file stem.
pub fn default_project_name(destination: &Path) -> Option<String> {
    destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty() && s != "." && s != "..")
}

fn absolute(path: &Path) -> Result<PathBuf, ScaffoldError> {
    std::path::absolute(path)
        .map(|p| clean_path(&p))
        .map_err(io_err(path))
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
