//! Shared utilities for comfyport.
//!
//! This crate provides cross-cutting concerns used by all other comfyport
//! crates: the error taxonomy, filesystem helpers, hashing, external process
//! execution, and terminal status output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;
pub mod progress;
