//! Core data types for comfyport.
//!
//! This crate defines the records a portable package build is driven by:
//! the pack configuration, the version file, the plugin manifest, the pip
//! requirement list, the build target, and the layout of the staged package
//! directory.
//!
//! This crate is intentionally free of async code, network I/O and
//! process spawning.

/// Name of the optional configuration file at the project root.
pub const CONFIG_FILE: &str = "comfyport.toml";

/// Upstream ComfyUI repository cloned when no other is configured.
pub const DEFAULT_APPLICATION_REPO: &str = "https://github.com/comfyanonymous/ComfyUI.git";

pub mod config;
pub mod layout;
pub mod manifest;
pub mod requirements;
pub mod target;
pub mod version;
