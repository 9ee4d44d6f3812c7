//! Idempotent boot-partition provisioning.
//!
//! `preppi` converges a machine to a declarative list of file mappings
//! (source, destination, mode, owner) and bakes parameterised recipes into
//! such files ahead of time.
//!
//! The public API is organised in layers:
//!
//! - **[`fs`]**: the filesystem abstraction (host, in-memory, rooted)
//! - **[`fingerprint`]**: content-plus-mode digests used for change detection
//! - **[`mapping`]** and **[`mapper`]**: single-file and batch convergence
//! - **[`config`]**: mapper configs on disk (JSON or TOML)
//! - **[`recipe`]**: templates, ingredients, bundles, and baking
//! - **[`commands`]**: top-level subcommand orchestration (`prepare`, `bake`, `vars`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod fingerprint;
pub mod fs;
pub mod logging;
pub mod mapper;
pub mod mapping;
pub mod recipe;

/// Version string reported by `preppi version` and written to log headers.
///
/// Release builds embed the value of `PREPPI_VERSION` (set by the build
/// script from git); otherwise the crate version is used.
#[must_use]
pub const fn version() -> &'static str {
    match option_env!("PREPPI_VERSION") {
        Some(version) => version,
        None => env!("CARGO_PKG_VERSION"),
    }
}
