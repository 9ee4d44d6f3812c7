//! `preppi` command-line entry point.

use anyhow::{Context as _, Result};
use clap::Parser;

use preppi_cli::cli::{Cli, Command};
use preppi_cli::commands;
use preppi_cli::logging::{Logger, init_subscriber};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let log_file = args.global.log_file.as_deref();
    init_subscriber(args.global.verbose, log_file).context("cannot initialize logging")?;
    let log = Logger::new(log_file);

    match args.command {
        Command::Prepare(opts) => commands::prepare::run(&opts, &log),
        Command::Bake(opts) => commands::bake::run(&opts, &log),
        Command::Vars(opts) => commands::vars::run(&opts, &log),
        Command::Version => commands::version::run(),
    }
}
