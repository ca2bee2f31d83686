//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod image;
pub mod maintenance;
pub mod util;

use fabricctl_core::{CoreError, Session, Transport};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch<T: Transport>(
    cmd: Command,
    session: &mut Session<T>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Image(args) => image::handle(session, args, global).await,
        Command::MaintenanceMode(args) => maintenance::handle(session, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Print the task ledger and pass the operation's result through.
///
/// A failed task's ledger goes to stderr, ahead of the diagnostic.
pub(crate) fn finish<T: Transport>(
    session: &Session<T>,
    outcome: Result<(), CoreError>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let ledger = session.ledger();
    let color = output::should_color(&global.color);
    let rendered = output::render_ledger(&global.output, ledger.records(), &ledger.report(), color)?;
    match outcome {
        Ok(()) => {
            output::print_output(&rendered, global.quiet);
            Ok(())
        }
        Err(err) => {
            output::print_error_output(&rendered);
            Err(err.into())
        }
    }
}
