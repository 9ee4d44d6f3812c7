//! Variable bindings supplied to a bake.
use std::collections::BTreeMap;

use crate::error::ConfigError;

use super::Recipe;

/// Values for the variables referenced by a recipe's templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeData {
    /// Variable name to value.
    pub vars: BTreeMap<String, String>,
}

impl RecipeData {
    /// Create empty bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, replacing any previous binding.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Build bindings from `KEY=VALUE` assignments.
    ///
    /// Only the first `=` separates key from value, so values may contain
    /// `=`. Later assignments to the same key win.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Assignment`] for an assignment without `=` or
    /// with an empty key.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vars = BTreeMap::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            match assignment.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    vars.insert(key.to_string(), value.to_string());
                }
                _ => return Err(ConfigError::Assignment(assignment.to_string())),
            }
        }
        Ok(Self { vars })
    }

    /// Variables `recipe` references that have no binding, sorted.
    #[must_use]
    pub fn missing(&self, recipe: &Recipe) -> Vec<String> {
        recipe
            .vars()
            .into_iter()
            .filter(|v| !self.vars.contains_key(v))
            .collect()
    }
}
