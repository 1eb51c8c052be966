use anyhow::{bail, Context, Result};
use itertools::Itertools;
use log::debug;
use std::process::{Command, Stdio};

/// Shell-like rendering of a command line, for logs and error messages.
#[must_use]
pub fn display(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy())
        .join(" ")
}

/// Runs a command to completion and fails unless it exits successfully.
pub fn run(command: &mut Command, quiet: bool) -> Result<()> {
    let line = display(command);
    match command.get_current_dir() {
        Some(dir) => debug!(">> {line} (in {})", dir.display()),
        None => debug!(">> {line}"),
    }
    if quiet {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }
    let status = command
        .status()
        .with_context(|| format!("failed to start `{line}`"))?;
    if !status.success() {
        bail!("`{line}` exited with {status}");
    }
    Ok(())
}
