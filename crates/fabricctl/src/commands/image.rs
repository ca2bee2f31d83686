//! Image command handlers.

use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use fabricctl_core::{
    LedgerReport, NxosMode, OperationOutcome, Session, SwitchImageStatus, Transport,
    UpgradeOptions, UpgradeRequest,
};

use crate::cli::{GlobalOpts, ImageArgs, ImageCommand, NxosModeArg, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::{finish, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Staged")]
    staged: String,
    #[tabled(rename = "Validated")]
    validated: String,
    #[tabled(rename = "Upgrade")]
    upgrade: String,
    #[tabled(rename = "Busy")]
    busy: bool,
}

impl From<&SwitchImageStatus> for StatusRow {
    fn from(s: &SwitchImageStatus) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
        Self {
            serial: s.serial_number.clone(),
            name: text(&s.device_name),
            ip: text(&s.ip_address),
            staged: text(&s.image_staged),
            validated: text(&s.validated),
            upgrade: text(&s.upgrade),
            busy: s.actions_in_progress,
        }
    }
}

#[derive(Serialize)]
struct StatusReport<'a> {
    switches: &'a [SwitchImageStatus],
    ledger: LedgerReport,
}

impl From<NxosModeArg> for NxosMode {
    fn from(arg: NxosModeArg) -> Self {
        match arg {
            NxosModeArg::Disruptive => Self::Disruptive,
            NxosModeArg::NonDisruptive => Self::NonDisruptive,
            NxosModeArg::ForceNonDisruptive => Self::ForceNonDisruptive,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle<T: Transport>(
    session: &mut Session<T>,
    args: ImageArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ImageCommand::Stage(switches) => {
            let outcome = session.stage_images(&switches.serials).await;
            finish(session, outcome.map(|o| log_outcome("image stage", &o)), global)
        }

        ImageCommand::Validate {
            switches,
            non_disruptive,
        } => {
            let outcome = session
                .validate_images(&switches.serials, non_disruptive)
                .await;
            finish(session, outcome.map(|o| log_outcome("image validate", &o)), global)
        }

        ImageCommand::Upgrade {
            switches,
            policy,
            nxos_mode,
            bios_force,
            epld,
            reboot,
        } => {
            let prompt = format!(
                "Upgrade {} to policy '{policy}'?",
                util::describe_switches(&switches.serials)
            );
            if !util::confirm(&prompt, "image upgrade", global)? {
                eprintln!("Aborted.");
                return Ok(());
            }
            let request = UpgradeRequest {
                serials: switches.serials,
                policy,
                options: UpgradeOptions {
                    nxos_mode: nxos_mode.into(),
                    bios_force,
                    epld_upgrade: epld,
                    reboot,
                },
            };
            let outcome = session.upgrade_images(&request).await;
            finish(session, outcome.map(|o| log_outcome("image upgrade", &o)), global)
        }

        ImageCommand::Status { serials } => {
            let statuses = match session.query_image_status(&serials).await {
                Ok(statuses) => statuses,
                Err(err) => return finish(session, Err(err), global),
            };
            print_status(session, &statuses, global)
        }
    }
}

fn log_outcome(command: &str, outcome: &OperationOutcome) {
    info!(
        command,
        submitted = outcome.submitted.len(),
        skipped = outcome.skipped.len(),
        ticks = outcome.ticks,
        "done"
    );
}

fn print_status<T: Transport>(
    session: &Session<T>,
    statuses: &[SwitchImageStatus],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            let out = output::render_list(&global.output, statuses, |s| StatusRow::from(s), |s| {
                s.serial_number.clone()
            })?;
            output::print_output(&out, global.quiet);
            finish(session, Ok(()), global)
        }
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            let report = StatusReport {
                switches: statuses,
                ledger: session.ledger().report(),
            };
            let out = if matches!(global.output, OutputFormat::Yaml) {
                output::render_yaml(&report)?
            } else {
                output::render_json(&report, matches!(global.output, OutputFormat::JsonCompact))?
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
