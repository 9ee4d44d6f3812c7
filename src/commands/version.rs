//! Command: print version information.
use std::io::{self, Write as _};

use anyhow::Result;

/// Print the preppi version to stdout.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn run() -> Result<()> {
    writeln!(io::stdout().lock(), "preppi {}", crate::version())?;
    Ok(())
}
