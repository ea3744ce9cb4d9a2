// src/transform/source.rs

//! Resolution of a descriptor's `source` against its module base path.
//!
//! A source is either a plain path (`src/client/main.ts`) or a glob
//! (`src/static/**/*`). Both are split into a *literal base*, the longest
//! leading run of components without glob metacharacters, and an optional
//! matcher for the full absolute pattern. For a plain path the literal base
//! is its parent directory, so relative output paths are just file names.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use globset::{GlobBuilder, GlobMatcher};

use crate::fs::FileSystem;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

#[derive(Debug, Clone)]
pub struct SourcePattern {
    literal_base: PathBuf,
    /// Absolute path of the source when it is not a glob.
    file: Option<PathBuf>,
    matcher: Option<GlobMatcher>,
}

impl SourcePattern {
    pub fn resolve(base_path: &Path, source: &str) -> Result<Self> {
        let source = source.replace('\\', "/");
        let components: Vec<&str> = source.split('/').collect();
        let first_glob = components.iter().position(|c| c.contains(GLOB_META));

        match first_glob {
            None => {
                let file = base_path.join(&source);
                let literal_base = file
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| base_path.to_path_buf());
                Ok(Self {
                    literal_base,
                    file: Some(file),
                    matcher: None,
                })
            }
            Some(idx) => {
                let literal_base = base_path.join(components[..idx].join("/"));
                let remainder = components[idx..].join("/");
                let pattern = glob_under(&literal_base, &remainder);
                let matcher = GlobBuilder::new(&pattern)
                    .literal_separator(true)
                    .build()
                    .with_context(|| format!("invalid source glob: {source}"))?
                    .compile_matcher();
                Ok(Self {
                    literal_base,
                    file: None,
                    matcher: Some(matcher),
                })
            }
        }
    }

    /// Directory that every matched file lives under.
    pub fn literal_base(&self) -> &Path {
        &self.literal_base
    }

    pub fn is_glob(&self) -> bool {
        self.matcher.is_some()
    }

    pub fn matches(&self, path: &Path) -> bool {
        match (&self.matcher, &self.file) {
            (Some(m), _) => m.is_match(slash_path(path)),
            (None, Some(f)) => f == path,
            (None, None) => false,
        }
    }

    /// Path of `file` relative to the literal base, used to mirror structure
    /// under a destination directory.
    pub fn relative(&self, file: &Path) -> PathBuf {
        file.strip_prefix(&self.literal_base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| file.file_name().map(PathBuf::from).unwrap_or_default())
    }

    /// All files this source currently refers to.
    ///
    /// A plain path must exist. A glob whose literal base is missing simply
    /// matches nothing.
    pub fn expand(&self, fs: &dyn FileSystem) -> Result<Vec<PathBuf>> {
        if let Some(file) = &self.file {
            if !fs.is_file(file) {
                bail!("source file not found: {}", file.display());
            }
            return Ok(vec![file.clone()]);
        }

        if !fs.is_dir(&self.literal_base) {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = fs
            .walk_files(&self.literal_base)?
            .into_iter()
            .filter(|path| self.matches(path))
            .collect();
        files.sort();
        Ok(files)
    }
}

/// Forward-slash rendering of a path, as matched by the glob patterns.
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Absolute glob rooted at `dir`, with `dir` itself escaped so that
/// metacharacters in real directory names are matched literally.
pub fn glob_under(dir: &Path, suffix: &str) -> String {
    let base = globset::escape(&slash_path(dir));
    let base = base.trim_end_matches('/');
    if suffix.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn glob_source_splits_literal_base() {
        let p = SourcePattern::resolve(Path::new("/proj"), "src/static/**/*").unwrap();
        assert!(p.is_glob());
        assert_eq!(p.literal_base(), Path::new("/proj/src/static"));
        assert!(p.matches(Path::new("/proj/src/static/img/logo.png")));
        assert!(p.matches(Path::new("/proj/src/static/logo.png")));
        assert!(!p.matches(Path::new("/proj/src/other/logo.png")));
    }

    #[test]
    fn plain_source_uses_parent_as_base() {
        let p = SourcePattern::resolve(Path::new("/proj"), "src/styles/main.scss").unwrap();
        assert!(!p.is_glob());
        assert_eq!(p.literal_base(), Path::new("/proj/src/styles"));
        assert_eq!(
            p.relative(Path::new("/proj/src/styles/main.scss")),
            PathBuf::from("main.scss")
        );
    }

    #[test]
    fn expand_walks_nested_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/static/a.txt", b"a".to_vec());
        fs.add_file("/proj/src/static/img/b.png", b"b".to_vec());
        fs.add_file("/proj/src/other/c.txt", b"c".to_vec());

        let p = SourcePattern::resolve(Path::new("/proj"), "src/static/**/*").unwrap();
        let files = p.expand(&fs).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/proj/src/static/a.txt"),
                PathBuf::from("/proj/src/static/img/b.png"),
            ]
        );
        assert_eq!(p.relative(&files[1]), PathBuf::from("img/b.png"));
    }

    #[test]
    fn glob_with_missing_base_matches_nothing() {
        let fs = MockFileSystem::new();
        let p = SourcePattern::resolve(Path::new("/proj"), "nope/**/*.ts").unwrap();
        assert!(p.expand(&fs).unwrap().is_empty());
    }

    #[test]
    fn missing_plain_source_is_an_error() {
        let fs = MockFileSystem::new();
        let p = SourcePattern::resolve(Path::new("/proj"), "main.ts").unwrap();
        assert!(p.expand(&fs).is_err());
    }

    #[test]
    fn glob_under_escapes_directory_names() {
        let g = glob_under(Path::new("/proj/[v1]"), "**/*");
        assert_eq!(g, "/proj/[[]v1[]]/**/*");
    }
}
