//! One templated file within a recipe.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use crate::error::{Error, MapError, TemplateError};
use crate::fs;
use crate::mapping::Mapping;

use super::template::Template;

/// A templated file: both its content and its destination path are
/// rendered from the recipe variables before being mapped into place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    /// Where the content template came from. Names the template in errors.
    pub source: PathBuf,
    /// Compiled content template.
    pub content: Template,
    /// Compiled destination path template, rendered relative to the bake
    /// root.
    pub destination: Template,
    /// Permission bits of the rendered file.
    pub mode: u32,
    /// Permission bits for created parent directories.
    pub dir_mode: u32,
    /// Owner of the rendered file.
    pub uid: u32,
    /// Group of the rendered file.
    pub gid: u32,
    /// Whether an existing, differing file may be overwritten.
    pub clobber: bool,
}

/// Contents and placement of an ingredient after variable substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Mapping whose destination is already confined under the bake root.
    pub mapping: Mapping,
    /// Rendered file content.
    pub content: String,
}

impl Ingredient {
    /// Create an ingredient for `source` with empty templates and default
    /// attributes.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let name = source.display().to_string();
        Self {
            content: Template::empty(name.clone()),
            destination: Template::empty(name),
            source,
            mode: DEFAULT_FILE_MODE,
            dir_mode: DEFAULT_DIR_MODE,
            uid: 0,
            gid: 0,
            clobber: false,
        }
    }

    /// Compile `text` as a template named after this ingredient's source.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Syntax`] if `text` is malformed.
    pub fn compile_template(&self, text: &str) -> Result<Template, TemplateError> {
        Template::parse(self.source.display().to_string(), text)
    }

    /// Compile and set the content template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Syntax`] if `text` is malformed.
    pub fn with_content(mut self, text: &str) -> Result<Self, TemplateError> {
        self.content = self.compile_template(text)?;
        Ok(self)
    }

    /// Compile and set the destination path template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Syntax`] if `text` is malformed.
    pub fn with_destination(mut self, text: &str) -> Result<Self, TemplateError> {
        self.destination = Template::parse(format!("{} (destination)", self.source.display()), text)?;
        Ok(self)
    }

    /// Variables referenced by the content and destination templates.
    pub fn vars(&self) -> impl Iterator<Item = &str> {
        self.content.vars().chain(self.destination.vars())
    }

    /// Render content and destination, confining the destination under
    /// `root`.
    ///
    /// # Errors
    ///
    /// Returns a template error for an unbound variable, or
    /// [`MapError::CopyIo`] if the rendered destination escapes `root`.
    pub fn render(&self, root: &Path, vars: &BTreeMap<String, String>) -> Result<Rendered, Error> {
        let content = self.content.render(vars)?;
        let relative = self.destination.render(vars)?;
        let destination =
            fs::confine(root, Path::new(&relative)).map_err(|source| MapError::CopyIo {
                path: PathBuf::from(&relative),
                source,
            })?;
        let mapping = Mapping {
            source: self.source.clone(),
            destination,
            mode: self.mode,
            dir_mode: self.dir_mode,
            uid: self.uid,
            gid: self.gid,
            clobber: self.clobber,
        };
        Ok(Rendered { mapping, content })
    }
}
