//! Command: list the variables a recipe needs.
use std::io::{self, Write};

use anyhow::{Context as _, Result};

use crate::cli::VarsOpts;
use crate::fs::{Filesystem, OsFs};
use crate::logging::Logger;
use crate::recipe::Recipe;

/// Print the recipe's variable names to stdout, one per line.
///
/// # Errors
///
/// Returns an error if the recipe cannot be loaded or stdout cannot be
/// written.
pub fn run(opts: &VarsOpts, log: &Logger) -> Result<()> {
    execute(&OsFs::new(), opts, log, &mut io::stdout().lock())
}

/// Load the recipe through `fs` and write its sorted variable names to `out`.
///
/// # Errors
///
/// See [`run`].
pub fn execute(
    fs: &dyn Filesystem,
    opts: &VarsOpts,
    log: &Logger,
    out: &mut dyn Write,
) -> Result<()> {
    let recipe = Recipe::load(fs, &opts.recipes, &opts.recipe).with_context(|| {
        format!(
            "error reading recipe {:?} from {}",
            opts.recipe,
            opts.recipes.display()
        )
    })?;
    let vars = recipe.vars();
    log.debug(&format!(
        "recipe {} has {} ingredient(s), {} variable(s)",
        recipe.name,
        recipe.ingredients.len(),
        vars.len()
    ));
    for var in vars {
        writeln!(out, "{var}")?;
    }
    Ok(())
}
