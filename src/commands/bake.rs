//! Command: render a recipe into a directory.
use std::time::Instant;

use anyhow::{Context as _, Result, bail};

use crate::cli::BakeOpts;
use crate::fs::{Filesystem, OsFs};
use crate::logging::Logger;
use crate::recipe::{Recipe, RecipeData};

/// Run the bake command against the host filesystem.
///
/// # Errors
///
/// Returns an error if the bindings are malformed or incomplete, the recipe
/// cannot be loaded, or any ingredient fails to bake.
pub fn run(opts: &BakeOpts, log: &Logger) -> Result<()> {
    execute(&OsFs::new(), opts, log).map(|_| ())
}

/// Load the recipe through `fs`, check the bindings, and bake it under
/// `opts.out`. Returns the number of files written.
///
/// # Errors
///
/// See [`run`].
pub fn execute(fs: &dyn Filesystem, opts: &BakeOpts, log: &Logger) -> Result<usize> {
    if opts.out.as_os_str().is_empty() {
        bail!("no --out provided, refusing to write to the current directory");
    }
    let data = RecipeData::from_assignments(&opts.vars).context("error processing variables")?;
    let recipe = Recipe::load(fs, &opts.recipes, &opts.recipe).with_context(|| {
        format!(
            "error reading recipe {:?} from {}",
            opts.recipe,
            opts.recipes.display()
        )
    })?;

    let missing = data.missing(&recipe);
    if !missing.is_empty() {
        bail!(
            "recipe {:?} needs values for: {}",
            recipe.name,
            missing.join(", ")
        );
    }

    log.stage(&format!("Baking recipe {}", recipe.name));
    let start = Instant::now();
    let written = recipe
        .bake(fs, &opts.out, &data)
        .context("error baking recipe")?;
    log.info(&format!(
        "baked {} ingredient(s) into {}, wrote {written} in {:.2?}",
        recipe.ingredients.len(),
        opts.out.display(),
        start.elapsed()
    ));
    Ok(written)
}
