//! Domain-specific error types for the provisioning engine.
//!
//! Library code returns the typed errors below; command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! BatchError                       a failed Mapper apply or Recipe bake
//! └── Error
//!     ├── Map(MapError)            one mapping's apply
//!     ├── Template(TemplateError)  recipe template parse or render
//!     └── Config(ConfigError)      mapper config and recipe bundles
//! ```
//!
//! Every variant reports an [`ErrorKind`] so callers can branch on the
//! failure without matching on nested structure.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Flat classification of every failure the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The mapping source is missing or unreadable.
    SourceUnavailable,
    /// A handle could not be fully read or rewound while fingerprinting.
    Read,
    /// Probing the destination failed for a reason other than "not found".
    DestinationStat,
    /// The destination differs and the mapping does not permit overwriting it.
    ClobberDenied,
    /// Directory creation, destination open, or content streaming failed.
    CopyIo,
    /// Setting destination ownership failed.
    Ownership,
    /// A template is malformed.
    TemplateSyntax,
    /// A template references a variable that has no binding.
    MissingVariable,
    /// Mapper or recipe configuration is malformed.
    ConfigParse,
    /// A configuration file could not be read.
    ConfigUnreadable,
}

/// Errors raised while applying a single mapping.
#[derive(Error, Debug)]
pub enum MapError {
    /// The source could not be stat-ed or opened.
    #[error("source {path} is unavailable")]
    SourceUnavailable {
        /// Source path as declared by the mapping.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A handle could not be consumed or rewound while fingerprinting.
    #[error("failed to fingerprint {path}")]
    Read {
        /// Path of the file being fingerprinted.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The destination probe failed with something other than "not found".
    #[error("something unexpected happened probing destination {path}")]
    DestinationStat {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The destination exists with different content or mode and clobbering
    /// is not allowed.
    #[error("can't clobber existing destination {path}")]
    ClobberDenied {
        /// Destination path.
        path: PathBuf,
    },

    /// Creating directories, opening the destination, or copying failed.
    #[error("copy to {path} failed")]
    CopyIo {
        /// Path the failing operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The destination was written but its ownership could not be set.
    #[error("couldn't chown {path} to {uid}:{gid}")]
    Ownership {
        /// Destination path.
        path: PathBuf,
        /// Requested owner.
        uid: u32,
        /// Requested group.
        gid: u32,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl MapError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Self::Read { .. } => ErrorKind::Read,
            Self::DestinationStat { .. } => ErrorKind::DestinationStat,
            Self::ClobberDenied { .. } => ErrorKind::ClobberDenied,
            Self::CopyIo { .. } => ErrorKind::CopyIo,
            Self::Ownership { .. } => ErrorKind::Ownership,
        }
    }
}

/// Errors raised while compiling or rendering a recipe template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template text is malformed.
    #[error("template {template}:{line}: {message}")]
    Syntax {
        /// Name of the template (usually the ingredient source path).
        template: String,
        /// One-based line where the offending action starts.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// The template references a variable with no binding.
    #[error("template {template}: no value bound for variable {name:?}")]
    MissingVariable {
        /// Name of the template.
        template: String,
        /// Name of the unbound variable.
        name: String,
    },
}

impl TemplateError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::TemplateSyntax,
            Self::MissingVariable { .. } => ErrorKind::MissingVariable,
        }
    }
}

/// Errors raised while loading mapper configs, recipe bundles, or variable
/// bindings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config or bundle file could not be read.
    #[error("failed reading config {path}")]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A config document is malformed.
    #[error("failed parsing config {origin}: {message}")]
    Parse {
        /// Where the document came from (a path, or `<inline>`).
        origin: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A `KEY=VALUE` variable assignment is malformed.
    #[error("invalid variable assignment {0:?}: expected KEY=VALUE")]
    Assignment(String),
}

impl ConfigError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::ConfigUnreadable,
            Self::Parse { .. } | Self::Assignment(_) => ErrorKind::ConfigParse,
        }
    }
}

/// Top-level error type for the provisioning engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A mapping could not be applied.
    #[error(transparent)]
    Map(#[from] MapError),

    /// A template could not be compiled or rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Map(e) => e.kind(),
            Self::Template(e) => e.kind(),
            Self::Config(e) => e.kind(),
        }
    }
}

/// A batch (mapper apply or recipe bake) stopped at its first failure.
///
/// Entries before `index` were processed and stay applied; `applied` counts
/// how many of them actually changed the destination.
#[derive(Error, Debug)]
#[error("entry {} failed after {applied} file(s) modified", .index + 1)]
pub struct BatchError {
    /// Number of files modified before the failure.
    pub applied: usize,
    /// Zero-based position of the failing entry.
    pub index: usize,
    /// The error that stopped the batch.
    #[source]
    pub source: Error,
}

impl BatchError {
    /// Classify the underlying failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
