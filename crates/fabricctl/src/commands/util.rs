//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Prompt for confirmation of a destructive action.
///
/// Auto-approves with `--yes` or `--check-mode` (nothing is sent). Without
/// a terminal to prompt on, refuses instead of guessing.
pub fn confirm(message: &str, action: &str, global: &GlobalOpts) -> Result<bool, CliError> {
    if global.yes || global.check_mode {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))?;
    Ok(confirmed)
}

/// Serial list for prompts: "SN1, SN2" or "5 switches".
pub fn describe_switches(serials: &[String]) -> String {
    if serials.len() <= 4 {
        serials.join(", ")
    } else {
        format!("{} switches", serials.len())
    }
}
