//! On-disk recipe bundles.
//!
//! A bundle is a directory holding `recipe.json` plus the content templates
//! it names:
//!
//! ```text
//! <recipes-root>/<name>/
//! ├── recipe.json
//! └── wpa_supplicant.conf.tmpl
//! ```
//!
//! ```json
//! {
//!   "name": "wifi",
//!   "ingredients": [
//!     {
//!       "source": "wpa_supplicant.conf.tmpl",
//!       "destination": "etc/wpa_supplicant/wpa_supplicant-{{.Iface}}.conf",
//!       "mode": "0600"
//!     }
//!   ]
//! }
//! ```
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, octal};
use crate::error::{ConfigError, Error};
use crate::fs::{self, Filesystem};

use super::{Ingredient, Recipe};

/// Name of the manifest inside a bundle directory.
pub const BUNDLE_FILE: &str = "recipe.json";

#[derive(Debug, Deserialize)]
struct RecipeFile {
    name: String,
    #[serde(default)]
    ingredients: Vec<IngredientRecord>,
}

#[derive(Debug, Deserialize)]
struct IngredientRecord {
    source: PathBuf,
    destination: String,
    #[serde(default = "default_file_mode", with = "octal")]
    mode: u32,
    #[serde(rename = "dirmode", default = "default_dir_mode", with = "octal")]
    dir_mode: u32,
    #[serde(default)]
    uid: u32,
    #[serde(default)]
    gid: u32,
    #[serde(default)]
    clobber: bool,
}

const fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

const fn default_dir_mode() -> u32 {
    DEFAULT_DIR_MODE
}

impl Recipe {
    /// Read the bundle in `dir` and compile all of its templates.
    ///
    /// Ingredient sources are resolved relative to `dir` and may not escape
    /// it.
    ///
    /// # Errors
    ///
    /// Returns a config error if the manifest or a template file cannot be
    /// read or parsed, and a template error if a template is malformed.
    pub fn from_bundle(fs: &dyn Filesystem, dir: &Path) -> Result<Self, Error> {
        let manifest = dir.join(BUNDLE_FILE);
        let bytes = read(fs, &manifest)?;
        let file: RecipeFile =
            serde_json::from_slice(&bytes).map_err(|e| ConfigError::Parse {
                origin: manifest.display().to_string(),
                message: e.to_string(),
            })?;

        let mut ingredients = Vec::with_capacity(file.ingredients.len());
        for record in file.ingredients {
            let path = fs::confine(dir, &record.source).map_err(|source| ConfigError::Io {
                path: record.source.clone(),
                source,
            })?;
            let text = String::from_utf8(read(fs, &path)?).map_err(|e| ConfigError::Parse {
                origin: path.display().to_string(),
                message: e.to_string(),
            })?;

            let mut ingredient = Ingredient::new(record.source)
                .with_content(&text)?
                .with_destination(&record.destination)?;
            ingredient.mode = record.mode;
            ingredient.dir_mode = record.dir_mode;
            ingredient.uid = record.uid;
            ingredient.gid = record.gid;
            ingredient.clobber = record.clobber;
            ingredients.push(ingredient);
        }
        tracing::debug!(
            "loaded recipe {} with {} ingredient(s) from {}",
            file.name,
            ingredients.len(),
            dir.display()
        );
        Ok(Self::new(file.name, ingredients))
    }

    /// Load the bundle named `name` under `recipes_root`.
    ///
    /// # Errors
    ///
    /// Same as [`from_bundle`](Self::from_bundle); a `name` that would leave
    /// `recipes_root` is reported as unreadable.
    pub fn load(fs: &dyn Filesystem, recipes_root: &Path, name: &str) -> Result<Self, Error> {
        let dir = fs::confine(recipes_root, Path::new(name)).map_err(|source| ConfigError::Io {
            path: PathBuf::from(name),
            source,
        })?;
        Self::from_bundle(fs, &dir)
    }
}

fn read(fs: &dyn Filesystem, path: &Path) -> Result<Vec<u8>, ConfigError> {
    fs::read_all(fs, path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
