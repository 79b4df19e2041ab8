//! Portable Python environment builder.
//!
//! Resolves the package plan for a build target ([`plan`]), downloads the
//! Miniforge installer ([`download`]) and materializes a self-contained
//! interpreter with the planned packages ([`install`]).

pub mod download;
pub mod install;
pub mod plan;
