//! A single declarative file copy and its idempotent apply algorithm.
//!
//! Every call re-derives the decision from the filesystem:
//!
//! ```text
//! stat(source) ──missing──▶ SourceUnavailable
//!     │
//! fingerprint(source, declared mode)
//!     │
//! stat(destination) ──not found──▶ COPY
//!     │              ──other error─▶ DestinationStat
//! fingerprint(destination, actual mode)
//!     ├─ equal ─────────────▶ AlreadyCorrect
//!     ├─ differ, !clobber ──▶ ClobberDenied
//!     └─ differ, clobber ───▶ COPY
//!
//! COPY: mkdir -p parent (dir_mode) → create/truncate (mode) → stream → chown
//! ```
//!
//! Copies happen in place. A failure part-way through COPY can leave the
//! destination truncated; the next run sees the fingerprint mismatch and
//! rewrites it when `clobber` is set.
use std::io::{self, Read, Seek, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, octal};
use crate::error::MapError;
use crate::fingerprint::Fingerprint;
use crate::fs::{Filesystem, ReadSeek, normalize};

/// Result of applying a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The destination was written.
    Applied,
    /// The destination already matched; nothing was written.
    AlreadyCorrect,
}

impl Outcome {
    /// Whether the destination was modified.
    #[must_use]
    pub const fn is_change(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// State of a mapping's destination relative to its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingState {
    /// The destination does not exist.
    Missing,
    /// The destination matches the source content and declared mode.
    Correct,
    /// The destination exists but its content or mode differs.
    Incorrect {
        /// Fingerprint of the destination as found.
        current: Fingerprint,
    },
}

impl MappingState {
    /// Whether applying the mapping would write the destination (or refuse
    /// to, when clobbering is not allowed).
    #[must_use]
    pub const fn needs_change(&self) -> bool {
        !matches!(self, Self::Correct)
    }
}

/// A file mapped from `source` to `destination`.
///
/// `mode`, `uid` and `gid` apply to the written destination; `dir_mode`
/// applies to any parent directories that have to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// File to copy from.
    pub source: PathBuf,
    /// File to converge.
    pub destination: PathBuf,
    /// Permission bits of the destination file.
    #[serde(default = "default_file_mode", with = "octal")]
    pub mode: u32,
    /// Permission bits for created parent directories.
    #[serde(rename = "dirmode", default = "default_dir_mode", with = "octal")]
    pub dir_mode: u32,
    /// Owner of the destination file.
    #[serde(default)]
    pub uid: u32,
    /// Group of the destination file.
    #[serde(default)]
    pub gid: u32,
    /// Whether an existing, differing destination may be overwritten.
    #[serde(default, skip_serializing_if = "is_false")]
    pub clobber: bool,
}

const fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

const fn default_dir_mode() -> u32 {
    DEFAULT_DIR_MODE
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

impl Mapping {
    /// Create a mapping with default modes, root ownership and no clobbering.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            mode: DEFAULT_FILE_MODE,
            dir_mode: DEFAULT_DIR_MODE,
            uid: 0,
            gid: 0,
            clobber: false,
        }
    }

    /// Set the destination file mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Set the mode for created parent directories.
    #[must_use]
    pub const fn with_dir_mode(mut self, dir_mode: u32) -> Self {
        self.dir_mode = dir_mode;
        self
    }

    /// Set the destination owner and group.
    #[must_use]
    pub const fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Allow or forbid overwriting a differing destination.
    #[must_use]
    pub const fn with_clobber(mut self, clobber: bool) -> Self {
        self.clobber = clobber;
        self
    }

    /// Human-readable description of this mapping.
    #[must_use]
    pub fn description(&self) -> String {
        format!("{} -> {}", self.source.display(), self.destination.display())
    }

    /// Converge the destination to the source.
    ///
    /// # Errors
    ///
    /// Returns a [`MapError`] describing the first failing step; see the
    /// module documentation for the decision sequence.
    pub fn apply(&self, fs: &dyn Filesystem) -> Result<Outcome, MapError> {
        let mut src = self.open_source(fs)?;
        if normalize(&self.source) == normalize(&self.destination) {
            return self.check_in_place(fs, &mut *src);
        }
        self.converge(fs, &mut *src)
    }

    /// Converge the destination to `content` instead of the file at
    /// `source`. `source` is still used to name the content in errors and
    /// logs.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply), minus `SourceUnavailable`.
    pub fn apply_content<R: Read + Seek>(
        &self,
        fs: &dyn Filesystem,
        mut content: R,
    ) -> Result<Outcome, MapError> {
        self.converge(fs, &mut content)
    }

    /// Determine the destination's state without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unavailable or either side cannot
    /// be fingerprinted.
    pub fn current_state(&self, fs: &dyn Filesystem) -> Result<MappingState, MapError> {
        let mut src = self.open_source(fs)?;
        let src_print = self.fingerprint_source(&mut *src)?;
        self.destination_state(fs, &src_print)
    }

    fn open_source(&self, fs: &dyn Filesystem) -> Result<Box<dyn ReadSeek>, MapError> {
        let unavailable = |source| MapError::SourceUnavailable {
            path: self.source.clone(),
            source,
        };
        fs.metadata(&self.source).map_err(unavailable)?;
        fs.open_read(&self.source).map_err(unavailable)
    }

    fn fingerprint_source(&self, src: &mut dyn ReadSeek) -> Result<Fingerprint, MapError> {
        Fingerprint::compute(self.mode, src).map_err(|source| MapError::Read {
            path: self.source.clone(),
            source,
        })
    }

    fn destination_state(
        &self,
        fs: &dyn Filesystem,
        src_print: &Fingerprint,
    ) -> Result<MappingState, MapError> {
        let stat_failed = |source| MapError::DestinationStat {
            path: self.destination.clone(),
            source,
        };
        let meta = match fs.metadata(&self.destination) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(MappingState::Missing),
            Err(e) => return Err(stat_failed(e)),
        };
        let mut dst = fs.open_read(&self.destination).map_err(stat_failed)?;
        let dst_print =
            Fingerprint::compute(meta.mode, &mut *dst).map_err(|source| MapError::Read {
                path: self.destination.clone(),
                source,
            })?;
        tracing::debug!("source      {src_print}");
        tracing::debug!("destination {dst_print}");
        if dst_print == *src_print {
            Ok(MappingState::Correct)
        } else {
            Ok(MappingState::Incorrect { current: dst_print })
        }
    }

    /// Source and destination name the same file. Truncating it for the copy
    /// would also empty the source, so a differing file is an error.
    fn check_in_place(
        &self,
        fs: &dyn Filesystem,
        src: &mut dyn ReadSeek,
    ) -> Result<Outcome, MapError> {
        let src_print = self.fingerprint_source(src)?;
        match self.destination_state(fs, &src_print)? {
            MappingState::Correct => Ok(Outcome::AlreadyCorrect),
            MappingState::Incorrect { .. } if !self.clobber => Err(MapError::ClobberDenied {
                path: self.destination.clone(),
            }),
            MappingState::Missing | MappingState::Incorrect { .. } => Err(MapError::CopyIo {
                path: self.destination.clone(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "source and destination are the same file",
                ),
            }),
        }
    }

    fn converge(&self, fs: &dyn Filesystem, src: &mut dyn ReadSeek) -> Result<Outcome, MapError> {
        let src_print = self.fingerprint_source(src)?;
        match self.destination_state(fs, &src_print)? {
            MappingState::Correct => {
                tracing::debug!("skipping {}", self.destination.display());
                return Ok(Outcome::AlreadyCorrect);
            }
            MappingState::Incorrect { .. } if !self.clobber => {
                return Err(MapError::ClobberDenied {
                    path: self.destination.clone(),
                });
            }
            MappingState::Missing | MappingState::Incorrect { .. } => {}
        }
        tracing::info!("copying {}", self.description());
        self.copy(fs, src)?;
        Ok(Outcome::Applied)
    }

    fn copy(&self, fs: &dyn Filesystem, src: &mut dyn ReadSeek) -> Result<(), MapError> {
        let copy_failed = |path: &Path, source| MapError::CopyIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = self
            .destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs.create_dir_all(parent, self.dir_mode)
                .map_err(|e| copy_failed(parent, e))?;
        }

        let mut dst = fs
            .open_write(&self.destination, self.mode)
            .map_err(|e| copy_failed(&self.destination, e))?;
        io::copy(src, &mut dst).map_err(|e| copy_failed(&self.destination, e))?;
        dst.flush().map_err(|e| copy_failed(&self.destination, e))?;
        drop(dst);

        fs.chown(&self.destination, self.uid, self.gid)
            .map_err(|source| MapError::Ownership {
                path: self.destination.clone(),
                uid: self.uid,
                gid: self.gid,
                source,
            })
    }
}
