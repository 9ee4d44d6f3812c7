//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::exec::DEFAULT_REBOOT_COMMAND;

/// Config read by `prepare` when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "/boot/preppi/preppi.conf";

/// Directory holding recipe bundles when `--recipes` is not given.
pub const DEFAULT_RECIPES_ROOT: &str = "/etc/preppi/recipes";

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "preppi",
    about = "Idempotent boot-partition provisioning for single-board computers",
    version = crate::version()
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by all subcommands.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also append all output, including debug messages, to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Converge the system to the mapper config
    Prepare(PrepareOpts),
    /// Render a recipe into a directory
    Bake(BakeOpts),
    /// List the variables a recipe needs
    Vars(VarsOpts),
    /// Print version information
    Version,
}

/// Options for the `prepare` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct PrepareOpts {
    /// Mapper config to apply (JSON, or TOML when the name ends in .toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG, value_name = "PATH")]
    pub config: PathBuf,

    /// Parse the config and report what would change, without writing
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Reboot after a run that modified at least one file
    #[arg(long)]
    pub reboot: bool,

    /// Command run to reboot; no arguments may be passed
    #[arg(long, default_value = DEFAULT_REBOOT_COMMAND, value_name = "CMD")]
    pub reboot_command: String,

    /// Confine every path in the config under this directory
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

/// Options for the `bake` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct BakeOpts {
    /// Name of the recipe to bake
    #[arg(short, long)]
    pub recipe: String,

    /// Directory holding recipe bundles
    #[arg(long, default_value = DEFAULT_RECIPES_ROOT, value_name = "DIR")]
    pub recipes: PathBuf,

    /// Directory under which generated files are written
    #[arg(short, long, value_name = "DIR")]
    pub out: PathBuf,

    /// Variable bindings
    #[arg(value_name = "KEY=VALUE")]
    pub vars: Vec<String>,
}

/// Options for the `vars` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct VarsOpts {
    /// Name of the recipe to inspect
    #[arg(short, long)]
    pub recipe: String,

    /// Directory holding recipe bundles
    #[arg(long, default_value = DEFAULT_RECIPES_ROOT, value_name = "DIR")]
    pub recipes: PathBuf,
}
