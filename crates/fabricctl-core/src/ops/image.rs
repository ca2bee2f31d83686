use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::{Display, EnumString};
use tracing::info;

use fabricctl_api::{Transport, Verb};

use super::{OperationOutcome, no_change_response, serial_set};
use crate::config::PollSettings;
use crate::dispatch::{Dispatcher, OperationResult};
use crate::endpoints;
use crate::error::CoreError;
use crate::ledger::{AuditLedger, OperationRecord, TaskState};
use crate::poller::{ConvergencePoller, Operation};
use crate::session::Session;
use crate::status::ACTIONS_IN_PROGRESS;

/// NX-OS upgrade disruption mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NxosMode {
    #[default]
    Disruptive,
    NonDisruptive,
    ForceNonDisruptive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeOptions {
    pub nxos_mode: NxosMode,
    pub bios_force: bool,
    pub epld_upgrade: bool,
    pub reboot: bool,
}

/// Devices to upgrade against an attached image policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    pub serials: Vec<String>,
    pub policy: String,
    #[serde(default)]
    pub options: UpgradeOptions,
}

/// One of the three image-management submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAction {
    Stage,
    Validate { non_disruptive: bool },
    Upgrade { policy: String, options: UpgradeOptions },
}

impl ImageAction {
    /// Ledger action name.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Stage => "image_stage",
            Self::Validate { .. } => "image_validate",
            Self::Upgrade { .. } => "image_upgrade",
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Stage => Operation::ImageStage,
            Self::Validate { .. } => Operation::ImageValidate,
            Self::Upgrade { .. } => Operation::ImageUpgrade,
        }
    }

    fn path(&self) -> String {
        match self {
            Self::Stage => endpoints::stage_image(),
            Self::Validate { .. } => endpoints::validate_image(),
            Self::Upgrade { .. } => endpoints::upgrade_image(),
        }
    }

    /// Request body for `serials`.
    pub fn payload(&self, serials: &BTreeSet<String>) -> Value {
        match self {
            // The controller expects this key misspelled.
            Self::Stage => json!({ "sereialNum": serials }),
            Self::Validate { non_disruptive } => json!({
                "serialNum": serials,
                "nonDisruptive": non_disruptive,
            }),
            Self::Upgrade { policy, options } => {
                let devices: Vec<Value> = serials
                    .iter()
                    .map(|serial| json!({ "serialNumber": serial, "policyName": policy }))
                    .collect();
                json!({
                    "devices": devices,
                    "issuUpgrade": { "nxos": true, "epld": options.epld_upgrade },
                    "issuUpgradeOptions1": {
                        "disruptive": options.nxos_mode == NxosMode::Disruptive,
                        "nonDisruptive": options.nxos_mode == NxosMode::NonDisruptive,
                        "forceNonDisruptive": options.nxos_mode == NxosMode::ForceNonDisruptive,
                    },
                    "issuUpgradeOptions2": { "biosForce": options.bios_force },
                    "epldOptions": { "moduleNumber": "ALL", "golden": false },
                    "reboot": options.reboot,
                    "rebootOptions": { "configReload": false, "writeErase": false },
                })
            }
        }
    }
}

impl<T: Transport> Session<T> {
    /// Stage the attached image on each switch.
    pub async fn stage_images(&mut self, serials: &[String]) -> Result<OperationOutcome, CoreError> {
        self.run_image_action(&ImageAction::Stage, serials).await
    }

    /// Validate the staged image on each switch.
    pub async fn validate_images(
        &mut self,
        serials: &[String],
        non_disruptive: bool,
    ) -> Result<OperationOutcome, CoreError> {
        self.run_image_action(&ImageAction::Validate { non_disruptive }, serials)
            .await
    }

    /// Upgrade each switch to the image of `request.policy`.
    pub async fn upgrade_images(
        &mut self,
        request: &UpgradeRequest,
    ) -> Result<OperationOutcome, CoreError> {
        let action = ImageAction::Upgrade {
            policy: request.policy.clone(),
            options: request.options.clone(),
        };
        if request.policy.trim().is_empty() {
            let err = CoreError::validation("an image policy name is required");
            let check_mode = self.check_mode();
            self.ledger_mut()
                .record_failure(action.action(), TaskState::Merged, check_mode, &err);
            return Err(err);
        }
        self.run_image_action(&action, &request.serials).await
    }

    async fn run_image_action(
        &mut self,
        kind: &ImageAction,
        serials: &[String],
    ) -> Result<OperationOutcome, CoreError> {
        let action = kind.action();
        let check_mode = self.check_mode();
        let settings = self.poll_settings();

        self.ensure_clean(action)?;
        let items = match serial_set(serials) {
            Ok(items) => items,
            Err(err) => {
                self.ledger_mut()
                    .record_failure(action, TaskState::Merged, check_mode, &err);
                return Err(err);
            }
        };

        let (mut poller, dispatcher, ledger) = self.parts(kind.operation().status_source());
        let flow = ImageFlow {
            kind,
            check_mode,
            settings,
        };
        match flow.run(&mut poller, dispatcher, ledger, &items).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                ledger.record_failure(action, TaskState::Merged, check_mode, &err);
                Err(err)
            }
        }
    }
}

struct ImageFlow<'k> {
    kind: &'k ImageAction,
    check_mode: bool,
    settings: PollSettings,
}

impl ImageFlow<'_> {
    /// Everything after input validation. Errors are recorded by the caller.
    async fn run<T: Transport>(
        &self,
        poller: &mut ConvergencePoller<'_, T>,
        dispatcher: &Dispatcher<T>,
        ledger: &mut AuditLedger,
        items: &BTreeSet<String>,
    ) -> Result<OperationOutcome, CoreError> {
        let action = self.kind.action();
        let operation = self.kind.operation();

        poller
            .wait_for_precondition(items, ACTIONS_IN_PROGRESS, self.settings)
            .await?;

        let pending = poller.prune_converged(items, operation).await?;
        let skipped: BTreeSet<String> = items.difference(&pending).cloned().collect();
        if pending.is_empty() {
            info!(action, switches = items.len(), "nothing to do");
            ledger.append(
                OperationRecord::new(action, TaskState::Merged)
                    .check_mode(self.check_mode)
                    .response_value(no_change_response())
                    .result(OperationResult::UNCHANGED),
            );
            return Ok(OperationOutcome {
                submitted: pending,
                skipped,
                ticks: 0,
            });
        }

        let payload = self.kind.payload(&pending);
        let (response, result) = dispatcher
            .commit(Verb::Post, &self.kind.path(), Some(&payload), self.check_mode)
            .await?;
        if !result.success {
            return Err(CoreError::rejected(response));
        }

        let mut diff = Map::new();
        diff.insert("serial_numbers".into(), json!(pending));
        diff.insert("payload".into(), payload);
        ledger.append(
            OperationRecord::new(action, TaskState::Merged)
                .check_mode(self.check_mode)
                .diff(diff)
                .response(&response)
                .result(result),
        );
        info!(action, switches = ?pending, check_mode = self.check_mode, "submitted");

        if self.check_mode {
            return Ok(OperationOutcome {
                submitted: pending,
                skipped,
                ticks: 0,
            });
        }

        let convergence = poller
            .wait_for_completion(&pending, operation, self.settings)
            .await?;
        Ok(OperationOutcome {
            submitted: pending,
            skipped,
            ticks: convergence.ticks,
        })
    }
}
