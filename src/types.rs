use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// The four transform kinds a module can declare.
///
/// This is a closed set: every kind has exactly one execution strategy in
/// [`crate::transform::TransformRegistry`].
///
/// - `ServerScript`: compile each matched source file on its own.
/// - `ClientScript`: bundle a single entry point.
/// - `Style`: compile, prefix and (optionally) minify a stylesheet.
/// - `Static`: copy files verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum TransformKind {
    #[serde(rename = "server")]
    ServerScript,
    #[serde(rename = "client")]
    ClientScript,
    #[serde(rename = "styles")]
    Style,
    #[serde(rename = "static")]
    Static,
}

impl TransformKind {
    /// All kinds, in the order `build` runs them.
    pub const ALL: [TransformKind; 4] = [
        TransformKind::ServerScript,
        TransformKind::ClientScript,
        TransformKind::Style,
        TransformKind::Static,
    ];

    /// Key used under `[modules.transforms]` in the config file.
    pub fn config_key(self) -> &'static str {
        match self {
            TransformKind::ServerScript => "server",
            TransformKind::ClientScript => "client",
            TransformKind::Style => "styles",
            TransformKind::Static => "static",
        }
    }

    /// CLI task name that runs this kind across all modules.
    pub fn task_name(self) -> &'static str {
        match self {
            TransformKind::ServerScript => "build:server",
            TransformKind::ClientScript => "build:client",
            TransformKind::Style => "build:styles",
            TransformKind::Static => "build:static",
        }
    }

    /// Human label used in completion notifications ("Server done!").
    pub fn label(self) -> &'static str {
        match self {
            TransformKind::ServerScript => "Server",
            TransformKind::ClientScript => "Client",
            TransformKind::Style => "Styles",
            TransformKind::Static => "Statics",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

impl FromStr for TransformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "server" => Ok(TransformKind::ServerScript),
            "client" => Ok(TransformKind::ClientScript),
            "styles" => Ok(TransformKind::Style),
            "static" => Ok(TransformKind::Static),
            other => Err(format!(
                "invalid transform kind: {other} (expected \"server\", \"client\", \"styles\" or \"static\")"
            )),
        }
    }
}

/// Named bundle of configuration defaults merged beneath the user config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Production,
    Development,
}

impl Default for Preset {
    fn default() -> Self {
        Preset::Development
    }
}

impl Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Production => "production",
            Preset::Development => "development",
        }
    }

    /// Whether this preset turns minification on.
    pub fn minify(self) -> bool {
        matches!(self, Preset::Production)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" => Ok(Preset::Production),
            "development" => Ok(Preset::Development),
            other => Err(format!(
                "invalid preset: {other} (expected \"production\" or \"development\")"
            )),
        }
    }
}
