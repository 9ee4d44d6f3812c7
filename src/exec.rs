//! External command execution.
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Command used to reboot the system when none is configured.
pub const DEFAULT_REBOOT_COMMAND: &str = "/sbin/reboot";

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
    /// Exit code, if the command was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, label: &str) -> Result<ExecResult> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    let result = ExecResult::from(output);
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

/// Run a program with arguments. Fails if it exits non-zero.
///
/// # Errors
///
/// Returns an error if the program cannot be started or exits non-zero.
pub fn run(program: &Path, args: &[&str]) -> Result<ExecResult> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    execute_checked(cmd, &program.display().to_string())
}

/// Resolve `program` on `PATH` (or as given, if it contains a separator).
///
/// # Errors
///
/// Returns an error if no executable is found.
pub fn resolve(program: &str) -> Result<PathBuf> {
    which::which(program).with_context(|| format!("{program} not found"))
}

/// Reboot the machine by running `command` with no arguments.
///
/// # Errors
///
/// Returns an error if the command cannot be found or fails.
pub fn reboot(command: &str) -> Result<()> {
    let path = resolve(command).context("cannot reboot")?;
    run(&path, &[]).map(|_| ())
}
