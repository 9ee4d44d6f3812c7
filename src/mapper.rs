//! Ordered batches of mappings.
use std::path::Path;

use crate::config;
use crate::error::{BatchError, ConfigError};
use crate::fs::Filesystem;
use crate::mapping::{Mapping, MappingState};

/// An ordered list of [`Mapping`]s applied one after another.
///
/// Application is fail-fast and never rolls back: mappings before the
/// failing one stay applied, mappings after it are not touched. Because
/// every mapping is idempotent, re-running after fixing the problem only
/// redoes what is still out of sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapper {
    mappings: Vec<Mapping>,
}

impl Mapper {
    /// Create a mapper applying `mappings` in order.
    #[must_use]
    pub const fn new(mappings: Vec<Mapping>) -> Self {
        Self { mappings }
    }

    /// Parse a JSON mapper document (`{"map": [...]}` or a bare array).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        config::parse_json(bytes, "<inline>")
    }

    /// Parse a TOML mapper document (`[[map]]` tables).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        config::parse_toml(text, "<inline>")
    }

    /// Load a mapper config file through `fs`; see [`config::load_mapper`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(fs: &dyn Filesystem, path: &Path) -> Result<Self, ConfigError> {
        config::load_mapper(fs, path)
    }

    /// Serialize to the wrapped JSON form with numeric modes.
    #[must_use]
    pub fn to_json(&self) -> String {
        config::to_json(&self.mappings)
    }

    /// Number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether there are no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Iterate over the mappings in apply order.
    pub fn iter(&self) -> std::slice::Iter<'_, Mapping> {
        self.mappings.iter()
    }

    /// Apply every mapping in order and return how many destinations were
    /// modified.
    ///
    /// # Errors
    ///
    /// Stops at the first failing mapping and returns a [`BatchError`]
    /// carrying its position and the number of files modified before it.
    pub fn apply(&self, fs: &dyn Filesystem) -> Result<usize, BatchError> {
        let mut applied = 0;
        for (index, mapping) in self.mappings.iter().enumerate() {
            tracing::debug!("[{}/{}] {}", index + 1, self.len(), mapping.description());
            match mapping.apply(fs) {
                Ok(outcome) if outcome.is_change() => applied += 1,
                Ok(_) => {}
                Err(e) => {
                    return Err(BatchError {
                        applied,
                        index,
                        source: e.into(),
                    });
                }
            }
        }
        Ok(applied)
    }

    /// Inspect every mapping without writing anything.
    ///
    /// # Errors
    ///
    /// Stops at the first mapping whose state cannot be determined (for
    /// example a missing source). `applied` is always zero.
    pub fn plan(&self, fs: &dyn Filesystem) -> Result<Vec<(&Mapping, MappingState)>, BatchError> {
        self.mappings
            .iter()
            .enumerate()
            .map(|(index, mapping)| {
                mapping
                    .current_state(fs)
                    .map(|state| (mapping, state))
                    .map_err(|e| BatchError {
                        applied: 0,
                        index,
                        source: e.into(),
                    })
            })
            .collect()
    }
}

impl FromIterator<Mapping> for Mapper {
    fn from_iter<I: IntoIterator<Item = Mapping>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Mapper {
    type Item = &'a Mapping;
    type IntoIter = std::slice::Iter<'a, Mapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
