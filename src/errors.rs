// src/errors.rs

//! Crate-wide error types.
//!
//! `BasisError` is what crosses module boundaries and reaches the CLI.
//! `TransformError` is the per-descriptor failure recovered at the executor
//! boundary; it never aborts sibling transforms.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::DescriptorId;

#[derive(Error, Debug)]
pub enum BasisError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    TransformError(#[from] TransformError),

    #[error("task '{task}' failed ({} transform(s) reported errors):\n{}", .failures.len(), format_failures(.failures))]
    AggregateFailure {
        task: String,
        failures: Vec<TransformError>,
    },

    #[error("cannot watch {}: {message}", .root.display())]
    WatchDispatchError { root: PathBuf, message: String },

    #[error("build failed: {}", .0.join(", "))]
    TasksFailed(Vec<String>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One descriptor's execution failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{module}] {} #{}: {reason}", .descriptor.kind, .descriptor.index)]
pub struct TransformError {
    pub descriptor: DescriptorId,
    pub module: String,
    pub reason: String,
}

fn format_failures(failures: &[TransformError]) -> String {
    failures
        .iter()
        .map(|f| format!("  - {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BasisError>;
