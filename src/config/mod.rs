// src/config/mod.rs

//! Configuration loading and resolution.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Layer built-in defaults and presets beneath user values (`defaults.rs`).
//! - Normalize modules and descriptors (`normalize.rs`).
//! - Load a config file from disk into versioned snapshots (`loader.rs`).

pub mod defaults;
pub mod loader;
pub mod model;
pub mod normalize;

pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE, load_from_path, resolve};
pub use model::{
    ConfigSnapshot, DescriptorId, EffectiveConfig, Module, RawConfigFile, ScriptOptions,
    StyleOptions, TransformDescriptor,
};
