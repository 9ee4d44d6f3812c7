//! Command: converge the system to a mapper config.
use std::io;
use std::time::Instant;

use anyhow::{Context as _, Result};

use crate::cli::PrepareOpts;
use crate::config;
use crate::exec;
use crate::fs::Filesystem;
use crate::logging::Logger;
use crate::mapper::Mapper;
use crate::mapping::MappingState;

/// Run the prepare command against the host filesystem.
///
/// # Errors
///
/// Returns an error if the config cannot be read or parsed, a mapping fails
/// to apply, or the requested reboot fails.
pub fn run(opts: &PrepareOpts, log: &Logger) -> Result<()> {
    log.info(&format!("preppi {} starting", crate::version()));
    let fs = super::host_filesystem(opts.root.as_deref());
    execute(&*fs, opts, log, exec::reboot).map(|_| ())
}

/// Load the config through `fs` and apply it (or plan it, for a dry run).
/// `reboot` is called with the configured reboot command after a run that
/// changed at least one file, when rebooting was requested.
///
/// Returns the number of files modified.
///
/// # Errors
///
/// See [`run`].
pub fn execute(
    fs: &dyn Filesystem,
    opts: &PrepareOpts,
    log: &Logger,
    reboot: impl FnOnce(&str) -> Result<()>,
) -> Result<usize> {
    let config_path = opts.config.display();
    log.stage("Loading configuration");
    match fs.metadata(&opts.config) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log.warn(&format!("config {config_path} doesn't exist, nothing to do"));
            return Ok(0);
        }
        Err(e) => return Err(e).with_context(|| format!("couldn't stat config {config_path}")),
    }
    let mapper = config::load_mapper(fs, &opts.config)
        .with_context(|| format!("error processing config {config_path}"))?;
    log.info(&format!("loaded {} mapping(s)", mapper.len()));

    if opts.dry_run {
        plan(fs, &mapper, log)?;
        return Ok(0);
    }

    log.stage("Applying mappings");
    let start = Instant::now();
    let result = mapper.apply(fs);
    let modified = result.as_ref().map_or_else(|e| e.applied, |n| *n);
    log.info(&format!(
        "processed {} file(s), modified {modified} in {:.2?}",
        mapper.len(),
        start.elapsed()
    ));
    let modified = result?;

    if modified > 0 && opts.reboot {
        log.stage("Rebooting");
        log.info(&format!(
            "files changed, rebooting with {:?}",
            opts.reboot_command
        ));
        reboot(&opts.reboot_command).context("tried to reboot the system but failed")?;
    }
    Ok(modified)
}

/// Report what applying `mapper` would do.
fn plan(fs: &dyn Filesystem, mapper: &Mapper, log: &Logger) -> Result<()> {
    log.stage("Planning (dry run)");
    let mut changes = 0;
    for (mapping, state) in mapper.plan(fs)? {
        let destination = mapping.destination.display();
        match state {
            MappingState::Correct => {
                log.debug(&format!("up to date: {destination}"));
                continue;
            }
            MappingState::Missing => {
                log.dry_run(&format!("would create {}", mapping.description()));
            }
            MappingState::Incorrect { .. } if mapping.clobber => {
                log.dry_run(&format!("would overwrite {}", mapping.description()));
            }
            MappingState::Incorrect { .. } => {
                log.warn(&format!(
                    "{destination} differs and clobbering is disabled; apply would stop here"
                ));
            }
        }
        changes += 1;
    }
    log.info(&format!(
        "{changes} of {} file(s) out of date",
        mapper.len()
    ));
    Ok(())
}
