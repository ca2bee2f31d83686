//! Maintenance-mode command handlers.

use tracing::info;

use fabricctl_core::{MaintenanceModeRequest, Session, SystemMode, Transport};

use crate::cli::{GlobalOpts, MaintenanceModeArgs, MaintenanceModeCommand, ModeArg};
use crate::error::CliError;

use super::{finish, util};

impl From<ModeArg> for SystemMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Normal => Self::Normal,
            ModeArg::Maintenance => Self::Maintenance,
        }
    }
}

pub async fn handle<T: Transport>(
    session: &mut Session<T>,
    args: MaintenanceModeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        MaintenanceModeCommand::Set {
            fabric,
            mode,
            deploy,
            switches,
        } => {
            let target = SystemMode::from(mode);
            let prompt = format!(
                "Put {} in fabric '{fabric}' into {target} mode{}?",
                util::describe_switches(&switches.serials),
                if deploy { " and deploy" } else { "" }
            );
            if !util::confirm(&prompt, "maintenance-mode set", global)? {
                eprintln!("Aborted.");
                return Ok(());
            }

            let request = MaintenanceModeRequest {
                fabric,
                serials: switches.serials,
                target,
                deploy,
            };
            let outcome = session.set_maintenance_mode(&request).await;
            let outcome = outcome.map(|o| {
                info!(
                    %target,
                    submitted = o.submitted.len(),
                    skipped = o.skipped.len(),
                    ticks = o.ticks,
                    "maintenance mode done"
                );
            });
            finish(session, outcome, global)
        }
    }
}
