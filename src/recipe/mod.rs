//! Recipes: named sets of templated files baked into a destination tree.
//!
//! Baking renders each [`Ingredient`]'s content and destination from a
//! [`RecipeData`], then converges the rendered file exactly as a
//! [`Mapping`](crate::mapping::Mapping) would, so re-baking with the same
//! data is a no-op.
mod bundle;
mod data;
mod ingredient;
mod template;

use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::Path;

pub use bundle::BUNDLE_FILE;
pub use data::RecipeData;
pub use ingredient::{Ingredient, Rendered};
pub use template::Template;

use crate::error::{BatchError, Error};
use crate::fs::Filesystem;

/// A named, ordered list of ingredients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipe {
    /// Recipe name.
    pub name: String,
    /// Ingredients, baked in order.
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    /// Create a recipe.
    #[must_use]
    pub fn new(name: impl Into<String>, ingredients: Vec<Ingredient>) -> Self {
        Self {
            name: name.into(),
            ingredients,
        }
    }

    /// Every variable referenced by any ingredient, sorted and deduplicated.
    #[must_use]
    pub fn vars(&self) -> Vec<String> {
        self.ingredients
            .iter()
            .flat_map(Ingredient::vars)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Render every ingredient with `data` and converge it under `root`.
    /// Returns how many files were written.
    ///
    /// # Errors
    ///
    /// Stops at the first ingredient that fails to render or apply, with
    /// the same accounting as [`Mapper::apply`](crate::mapper::Mapper::apply).
    pub fn bake(
        &self,
        fs: &dyn Filesystem,
        root: &Path,
        data: &RecipeData,
    ) -> Result<usize, BatchError> {
        tracing::debug!("baking recipe {} into {}", self.name, root.display());
        let mut applied = 0;
        for (index, ingredient) in self.ingredients.iter().enumerate() {
            let fail = |source: Error| BatchError {
                applied,
                index,
                source,
            };
            let Rendered { mapping, content } =
                ingredient.render(root, &data.vars).map_err(fail)?;
            let outcome = mapping
                .apply_content(fs, Cursor::new(content.into_bytes()))
                .map_err(|e| fail(e.into()))?;
            if outcome.is_change() {
                applied += 1;
            }
        }
        Ok(applied)
    }
}
