// src/transform/styles.rs

//! Stylesheet strategy: compile, prefix, optionally minify.
//!
//! Prefixing targets a fixed browser floor roughly equivalent to
//! "last 2 versions, android 4". Plain `.css` entry points skip the
//! compiler and go straight to prefixing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::config::{EffectiveConfig, TransformDescriptor};
use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::transform::source::glob_under;
use crate::transform::{BoxFuture, Toolchain, TransformStrategy, TransformSummary, watch_base};
use crate::types::TransformKind;

pub struct StyleStrategy {
    toolchain: Arc<dyn Toolchain>,
    fs: Arc<dyn FileSystem>,
}

impl StyleStrategy {
    pub fn new(toolchain: Arc<dyn Toolchain>, fs: Arc<dyn FileSystem>) -> Self {
        Self { toolchain, fs }
    }

    async fn run(
        &self,
        descriptor: &TransformDescriptor,
        config: &EffectiveConfig,
    ) -> Result<TransformSummary, TransformError> {
        let entry = descriptor.base_path.join(&descriptor.source);
        if !self.fs.is_file(&entry) {
            return Err(descriptor.failure(format!(
                "entry point not found: {}",
                entry.display()
            )));
        }

        let css = if is_css(&entry) {
            let bytes = self
                .fs
                .read(&entry)
                .map_err(|e| descriptor.failure(format!("{e:#}")))?;
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            self.toolchain
                .compile_stylesheet(&entry, &config.styles)
                .await
                .map_err(|e| descriptor.failure(format!("{e:#}")))?
        };

        let processed = postprocess(&css, config.minify).map_err(|e| descriptor.failure(e))?;

        let output = output_path(&descriptor.dest);
        self.fs
            .write(&output, processed.as_bytes())
            .map_err(|e| descriptor.failure(format!("{e:#}")))?;

        Ok(TransformSummary {
            files: 1,
            outputs: vec![output],
        })
    }
}

fn is_css(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("css"))
}

/// `dest` with its extension forced to `.css`.
pub fn output_path(dest: &Path) -> PathBuf {
    if is_css(dest) {
        dest.to_path_buf()
    } else {
        dest.with_extension("css")
    }
}

fn browser_floor() -> Targets {
    Targets::from(Browsers {
        android: Some(4 << 16),
        chrome: Some(100 << 16),
        edge: Some(100 << 16),
        firefox: Some(100 << 16),
        ios_saf: Some(14 << 16),
        safari: Some(14 << 16),
        ..Browsers::default()
    })
}

/// Add vendor prefixes and, when `minify` is set, compress the output.
///
/// Without `minify` the stylesheet keeps its rules and values as written;
/// only the prefixed declarations the browser floor needs are inserted.
pub fn postprocess(css: &str, minify: bool) -> Result<String> {
    let mut sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| anyhow!("stylesheet parse error: {e}"))?;

    if !minify {
        return prefix_declarations(css);
    }

    sheet
        .minify(MinifyOptions {
            targets: browser_floor(),
            ..MinifyOptions::default()
        })
        .map_err(|e| anyhow!("stylesheet transform error: {e}"))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets: browser_floor(),
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("stylesheet print error: {e}"))?;

    Ok(printed.code)
}

fn prefix_declarations(css: &str) -> Result<String> {
    let mut out = String::with_capacity(css.len());
    // Property names declared so far in the current block.
    let mut seen: Vec<String> = Vec::new();
    let mut start = 0;

    for (end, terminator) in terminators(css) {
        let segment = &css[start..end];
        if terminator == b'{' {
            seen.clear();
            out.push_str(segment);
        } else if let Some(name) = property_name(segment) {
            let body = segment.trim_start();
            let indent = &segment[..segment.len() - body.len()];
            out.push_str(indent);
            if !name.starts_with('-') {
                for variant in prefixed_variants(declaration_text(body))? {
                    if property_name(&variant).is_some_and(|v| seen.contains(&v)) {
                        continue;
                    }
                    out.push_str(&variant);
                    out.push(';');
                    out.push_str(indent);
                }
            }
            out.push_str(body);
            seen.push(name);
        } else {
            out.push_str(segment);
        }
        if terminator == b'}' {
            seen.clear();
        }
        out.push(char::from(terminator));
        start = end + 1;
    }

    out.push_str(&css[start..]);
    Ok(out)
}

/// Extra declarations the browser floor needs next to `declaration`,
/// formatted as `name: value`.
fn prefixed_variants(declaration: &str) -> Result<Vec<String>> {
    let targeted = print_declarations(declaration, browser_floor())?;
    let plain = print_declarations(declaration, Targets::default())?;

    Ok(targeted
        .into_iter()
        .filter(|d| !plain.contains(d))
        .map(|d| match d.split_once(':') {
            Some((name, value)) => format!("{name}: {value}"),
            None => d,
        })
        .collect())
}

/// Minified declarations of `a{declaration}` after lowering for `targets`.
fn print_declarations(declaration: &str, targets: Targets) -> Result<Vec<String>> {
    let wrapped = format!("a{{{declaration}}}");
    let mut sheet = StyleSheet::parse(&wrapped, ParserOptions::default())
        .map_err(|e| anyhow!("stylesheet parse error: {e}"))?;
    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| anyhow!("stylesheet transform error: {e}"))?;
    let code = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("stylesheet print error: {e}"))?
        .code;

    let inner = match (code.find('{'), code.rfind('}')) {
        (Some(open), Some(close)) if open < close => &code[open + 1..close],
        _ => "",
    };
    let mut decls = Vec::new();
    let mut start = 0;
    for (end, _) in terminators(inner) {
        decls.push(inner[start..end].to_string());
        start = end + 1;
    }
    decls.push(inner[start..].to_string());
    decls.retain(|d| !d.trim().is_empty());
    Ok(decls)
}

/// The declaration itself, without any comment in front of it.
fn declaration_text(segment: &str) -> &str {
    match segment.rfind("*/") {
        Some(end) => segment[end + 2..].trim(),
        None => segment.trim(),
    }
}

/// Lowercased property name when `segment` is a declaration. At-rule
/// statements and custom properties are not.
fn property_name(segment: &str) -> Option<String> {
    let decl = declaration_text(segment);
    if decl.starts_with('@') || decl.starts_with("--") {
        return None;
    }
    let (name, _) = decl.split_once(':')?;
    let name = name.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then(|| name.to_ascii_lowercase())
}

/// Byte offsets of `{`, `}` and `;` outside comments, strings and
/// parentheses.
fn terminators(css: &str) -> Vec<(usize, u8)> {
    let bytes = css.as_bytes();
    let mut found = Vec::new();
    let mut parens = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = css[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |end| i + 2 + end + 2);
                continue;
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            b @ (b'{' | b'}' | b';') if parens == 0 => found.push((i, b)),
            _ => {}
        }
        i += 1;
    }
    found
}

impl TransformStrategy for StyleStrategy {
    fn kind(&self) -> TransformKind {
        TransformKind::Style
    }

    fn run_once<'a>(
        &'a self,
        descriptor: &'a TransformDescriptor,
        config: &'a EffectiveConfig,
    ) -> BoxFuture<'a, Result<TransformSummary, TransformError>> {
        Box::pin(self.run(descriptor, config))
    }

    fn watch_pattern(&self, descriptor: &TransformDescriptor) -> String {
        glob_under(&watch_base(descriptor), "**/*.{scss,sass,css}")
    }

    fn output_root(&self, descriptor: &TransformDescriptor) -> PathBuf {
        output_path(&descriptor.dest)
    }
}
