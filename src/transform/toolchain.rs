// src/transform/toolchain.rs

//! External compiler services.
//!
//! The strategies never spawn processes themselves; they go through a
//! [`Toolchain`]. [`CommandToolchain`] renders the command templates from
//! the configuration and runs them through the platform shell.
//!
//! Supported placeholders:
//! - `{input}`: source file
//! - `{output}`: output file (bundles)
//! - `{out_dir}`: output directory (server compilation)
//! - `{module}`: module system from `[server]` / `[client]`
//! - `{style}`: output style from `[styles]`
//! - `{minify}`: the configured `minify_flag`, or empty

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{ScriptOptions, StyleOptions};
use crate::transform::BoxFuture;

pub trait Toolchain: Send + Sync {
    /// Compile one script file into `out_dir`.
    fn compile_script<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
        options: &'a ScriptOptions,
    ) -> BoxFuture<'a, Result<()>>;

    /// Bundle an entry point into a single `output` file.
    fn bundle<'a>(
        &'a self,
        entry: &'a Path,
        output: &'a Path,
        options: &'a ScriptOptions,
        minify: bool,
    ) -> BoxFuture<'a, Result<()>>;

    /// Compile a stylesheet and return the resulting CSS.
    fn compile_stylesheet<'a>(
        &'a self,
        entry: &'a Path,
        options: &'a StyleOptions,
    ) -> BoxFuture<'a, Result<String>>;
}

/// Toolchain that shells out to the configured command templates.
#[derive(Debug, Clone, Default)]
pub struct CommandToolchain;

impl Toolchain for CommandToolchain {
    fn compile_script<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
        options: &'a ScriptOptions,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let vars = [
                ("input", quote_path(input)),
                ("out_dir", quote_path(out_dir)),
                ("module", options.module.clone()),
                ("minify", String::new()),
            ];
            let cmd = render_command(&options.command, &vars);
            run_shell(&cmd).await.map(|_| ())
        })
    }

    fn bundle<'a>(
        &'a self,
        entry: &'a Path,
        output: &'a Path,
        options: &'a ScriptOptions,
        minify: bool,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let flag = if minify {
                options.minify_flag.clone()
            } else {
                String::new()
            };
            let vars = [
                ("input", quote_path(entry)),
                ("output", quote_path(output)),
                ("module", options.module.clone()),
                ("minify", flag),
            ];
            let cmd = render_command(&options.command, &vars);
            run_shell(&cmd).await.map(|_| ())
        })
    }

    fn compile_stylesheet<'a>(
        &'a self,
        entry: &'a Path,
        options: &'a StyleOptions,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { run_shell(&stylesheet_command(entry, options)).await })
    }
}

/// Stylesheet compiler command for `entry`. The compiler writes CSS to
/// stdout, so a requested source map is embedded in it.
pub fn stylesheet_command(entry: &Path, options: &StyleOptions) -> String {
    let sourcemap = if options.sourcemap {
        "--embed-source-map"
    } else {
        "--no-source-map"
    };
    let vars = [
        ("input", quote_path(entry)),
        ("style", options.style.clone()),
        ("sourcemap", sourcemap.to_string()),
    ];
    render_command(&options.command, &vars)
}

/// Substitute `{name}` placeholders. Unknown placeholders are left as-is.
pub fn render_command(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out.trim().to_string()
}

/// Single-quote a path for `sh -c`.
fn quote_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        format!("\"{s}\"")
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Run `cmd` through the platform shell and return its stdout.
///
/// A non-zero exit is an error carrying the command's stderr.
async fn run_shell(cmd: &str) -> Result<String> {
    info!(cmd = %cmd, "running toolchain command");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("spawning toolchain command '{cmd}'"))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(cmd = %cmd, "stderr: {}", line);
    }

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        bail!("command exited with code {code}: {}", stderr.trim());
    }

    String::from_utf8(output.stdout).context("toolchain output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_substituted() {
        let cmd = render_command(
            "tsc --module {module} --outDir {out_dir} {input}",
            &[
                ("module", "commonjs".to_string()),
                ("out_dir", "'/b'".to_string()),
                ("input", "'/s/a.ts'".to_string()),
            ],
        );
        assert_eq!(cmd, "tsc --module commonjs --outDir '/b' '/s/a.ts'");
    }

    #[cfg(unix)]
    #[test]
    fn sourcemap_option_selects_the_compiler_flag() {
        let mut options = StyleOptions {
            style: "expanded".to_string(),
            sourcemap: true,
            command: "sass --style={style} {sourcemap} {input}".to_string(),
        };
        let entry = Path::new("/p/main.scss");
        assert_eq!(
            stylesheet_command(entry, &options),
            "sass --style=expanded --embed-source-map '/p/main.scss'"
        );

        options.sourcemap = false;
        assert_eq!(
            stylesheet_command(entry, &options),
            "sass --style=expanded --no-source-map '/p/main.scss'"
        );
    }

    #[test]
    fn empty_minify_flag_renders_nothing() {
        let cmd = render_command(
            "esbuild {input} {minify} --outfile={output}",
            &[
                ("input", "in.ts".to_string()),
                ("minify", String::new()),
                ("output", "out.js".to_string()),
            ],
        );
        assert_eq!(cmd, "esbuild in.ts  --outfile=out.js");
    }

    #[test]
    fn quotes_in_paths_are_escaped() {
        if cfg!(windows) {
            return;
        }
        assert_eq!(quote_path(Path::new("/a/it's")), r"'/a/it'\''s'");
    }

    #[tokio::test]
    async fn failing_command_reports_stderr() {
        if cfg!(windows) {
            return;
        }
        let err = run_shell("echo broken >&2; exit 3").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("code 3"), "{msg}");
        assert!(msg.contains("broken"), "{msg}");
    }
}
