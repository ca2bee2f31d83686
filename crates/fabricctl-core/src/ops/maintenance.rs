use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use fabricctl_api::{Transport, Verb};

use super::{OperationOutcome, no_change_response, serial_set};
use crate::config::PollSettings;
use crate::dispatch::{Dispatcher, OperationResult};
use crate::endpoints;
use crate::error::CoreError;
use crate::ledger::{AuditLedger, OperationRecord, TaskState};
use crate::poller::{ConvergencePoller, Operation, SystemMode};
use crate::session::Session;
use crate::status::StatusSource;

const ACTION: &str = "maintenance_mode";
const DEPLOY_ACTION: &str = "deploy_maintenance_mode";

/// Move switches in one fabric into or out of maintenance mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceModeRequest {
    pub fabric: String,
    pub serials: Vec<String>,
    pub target: SystemMode,
    /// Push the mode change to the switches and wait for it to apply.
    #[serde(default)]
    pub deploy: bool,
}

impl<T: Transport> Session<T> {
    pub async fn set_maintenance_mode(
        &mut self,
        request: &MaintenanceModeRequest,
    ) -> Result<OperationOutcome, CoreError> {
        let check_mode = self.check_mode();
        let settings = self.poll_settings();

        self.ensure_clean(ACTION)?;
        let items = match validate(request) {
            Ok(items) => items,
            Err(err) => {
                self.ledger_mut()
                    .record_failure(ACTION, TaskState::Merged, check_mode, &err);
                return Err(err);
            }
        };

        let (mut poller, dispatcher, ledger) = self.parts(StatusSource::switch_inventory());
        let flow = MaintenanceFlow {
            request,
            check_mode,
            settings,
        };
        match flow.run(&mut poller, dispatcher, ledger, &items).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                ledger.record_failure(ACTION, TaskState::Merged, check_mode, &err);
                Err(err)
            }
        }
    }
}

fn validate(request: &MaintenanceModeRequest) -> Result<BTreeSet<String>, CoreError> {
    if request.fabric.trim().is_empty() {
        return Err(CoreError::validation("a fabric name is required"));
    }
    serial_set(&request.serials)
}

struct MaintenanceFlow<'r> {
    request: &'r MaintenanceModeRequest,
    check_mode: bool,
    settings: PollSettings,
}

impl MaintenanceFlow<'_> {
    async fn run<T: Transport>(
        &self,
        poller: &mut ConvergencePoller<'_, T>,
        dispatcher: &Dispatcher<T>,
        ledger: &mut AuditLedger,
        items: &BTreeSet<String>,
    ) -> Result<OperationOutcome, CoreError> {
        let fabric = self.request.fabric.as_str();
        let target = self.request.target;
        let operation = Operation::MaintenanceMode(target);

        let pending = poller.prune_converged(items, operation).await?;
        let inventory = poller.tracker().snapshot();
        if let Some(unknown) = items.iter().find(|serial| !inventory.contains(serial)) {
            return Err(CoreError::NotFound {
                entity_type: "switch".into(),
                identifier: format!("{unknown} (fabric {fabric})"),
            });
        }

        let skipped: BTreeSet<String> = items.difference(&pending).cloned().collect();
        if pending.is_empty() {
            info!(fabric, %target, "all switches already in target mode");
            ledger.append(
                OperationRecord::new(ACTION, TaskState::Merged)
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

        let empty = json!({});
        let (verb, payload) = match target {
            SystemMode::Maintenance => (Verb::Post, Some(&empty)),
            SystemMode::Normal => (Verb::Delete, None),
        };
        for serial in &pending {
            let path = endpoints::maintenance_mode(fabric, serial);
            let (response, result) = dispatcher
                .commit(verb, &path, payload, self.check_mode)
                .await?;
            if !result.success {
                return Err(CoreError::rejected(response));
            }

            let mut diff = self.diff(serial);
            diff.insert(
                "ip_address".into(),
                inventory
                    .get(serial)
                    .and_then(|s| s.str_field("ipAddress"))
                    .map_or(Value::Null, Value::from),
            );
            diff.insert("mode".into(), json!(target));
            ledger.append(
                OperationRecord::new(ACTION, TaskState::Merged)
                    .check_mode(self.check_mode)
                    .diff(diff)
                    .response(&response)
                    .result(result),
            );
            info!(fabric, %serial, %target, "mode change submitted");
        }

        if !self.request.deploy {
            return Ok(OperationOutcome {
                submitted: pending,
                skipped,
                ticks: 0,
            });
        }

        for serial in &pending {
            let path = endpoints::deploy_maintenance_mode(fabric, serial);
            let (response, result) = dispatcher
                .commit(Verb::Post, &path, Some(&empty), self.check_mode)
                .await?;
            if !result.success {
                return Err(CoreError::rejected(response));
            }
            let mut diff = self.diff(serial);
            diff.insert("deploy".into(), Value::Bool(true));
            ledger.append(
                OperationRecord::new(DEPLOY_ACTION, TaskState::Merged)
                    .check_mode(self.check_mode)
                    .diff(diff)
                    .response(&response)
                    .result(result),
            );
        }

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

    fn diff(&self, serial: &str) -> Map<String, Value> {
        let mut diff = Map::new();
        diff.insert("fabric_name".into(), json!(self.request.fabric));
        diff.insert("serial_number".into(), json!(serial));
        diff
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::ScriptedTransport;

    fn inventory(switches: &[(&str, &str, &str)]) -> Value {
        Value::Array(
            switches
                .iter()
                .map(|(sn, mode, system_mode)| {
                    json!({
                        "serialNumber": sn,
                        "ipAddress": "192.0.2.10",
                        "fabricName": "f1",
                        "mode": mode,
                        "systemMode": system_mode,
                    })
                })
                .collect(),
        )
    }

    fn request(serials: &[&str], target: SystemMode, deploy: bool) -> MaintenanceModeRequest {
        MaintenanceModeRequest {
            fabric: "f1".into(),
            serials: serials.iter().map(|s| (*s).to_string()).collect(),
            target,
            deploy,
        }
    }

    fn session(transport: ScriptedTransport) -> Session<ScriptedTransport> {
        Session::new(transport, false, PollSettings::from_secs(1, 5)).unit_test(true)
    }

    #[tokio::test]
    async fn enter_maintenance_and_deploy_waits_for_both_fields() {
        let inv = endpoints::switch_inventory();
        let transport = ScriptedTransport::new()
            .ok(
                Verb::Get,
                &inv,
                inventory(&[("SN1", "Normal", "Normal"), ("SN2", "Normal", "Normal")]),
            )
            .ok(
                Verb::Get,
                &inv,
                inventory(&[
                    ("SN1", "Maintenance", "Maintenance"),
                    ("SN2", "Maintenance", "Normal"),
                ]),
            )
            .ok(
                Verb::Get,
                &inv,
                inventory(&[
                    ("SN1", "Maintenance", "Maintenance"),
                    ("SN2", "Maintenance", "Maintenance"),
                ]),
            )
            .ok(Verb::Post, &endpoints::maintenance_mode("f1", "SN1"), json!({}))
            .ok(Verb::Post, &endpoints::maintenance_mode("f1", "SN2"), json!({}))
            .ok(Verb::Post, &endpoints::deploy_maintenance_mode("f1", "SN1"), json!({}))
            .ok(Verb::Post, &endpoints::deploy_maintenance_mode("f1", "SN2"), json!({}));
        let mut session = session(transport);

        let outcome = session
            .set_maintenance_mode(&request(&["SN1", "SN2"], SystemMode::Maintenance, true))
            .await
            .unwrap();

        assert_eq!(outcome.ticks, 2);
        let actions: Vec<&str> = session
            .ledger()
            .records()
            .iter()
            .map(|r| r.action.as_str())
            .collect();
        assert_eq!(
            actions,
            vec![ACTION, ACTION, DEPLOY_ACTION, DEPLOY_ACTION]
        );
        let first = &session.ledger().records()[0];
        assert_eq!(first.diff["mode"], json!("maintenance"));
        assert_eq!(first.diff["ip_address"], json!("192.0.2.10"));
        assert!(session.ledger().any_changed());
    }

    #[tokio::test]
    async fn return_to_normal_uses_delete_without_payload() {
        let inv = endpoints::switch_inventory();
        let path = endpoints::maintenance_mode("f1", "SN1");
        let transport = ScriptedTransport::new()
            .ok(
                Verb::Get,
                &inv,
                inventory(&[("SN1", "Maintenance", "Maintenance")]),
            )
            .ok(Verb::Delete, &path, json!({}));
        let mut session = session(transport);

        let outcome = session
            .set_maintenance_mode(&request(&["SN1"], SystemMode::Normal, false))
            .await
            .unwrap();

        assert_eq!(outcome.ticks, 0);
        let calls = session.dispatcher().transport().calls();
        let delete = calls.iter().find(|c| c.verb == Verb::Delete).unwrap();
        assert_eq!(delete.path, path);
        assert_eq!(delete.payload, None);
        assert_eq!(session.ledger().len(), 1);
    }

    #[tokio::test]
    async fn unknown_switch_is_not_found() {
        let transport = ScriptedTransport::new().ok(
            Verb::Get,
            &endpoints::switch_inventory(),
            inventory(&[("SN1", "Normal", "Normal")]),
        );
        let mut session = session(transport);

        let err = session
            .set_maintenance_mode(&request(&["SN1", "SN9"], SystemMode::Maintenance, false))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound { ref identifier, .. } if identifier.starts_with("SN9")));
        assert_eq!(session.dispatcher().transport().call_count(), 1);
        assert_eq!(session.ledger().results(), vec![OperationResult::FAILED]);
    }

    #[tokio::test]
    async fn switches_already_in_mode_are_left_alone() {
        let transport = ScriptedTransport::new().ok(
            Verb::Get,
            &endpoints::switch_inventory(),
            inventory(&[("SN1", "normal", "Normal")]),
        );
        let mut session = session(transport);

        let outcome = session
            .set_maintenance_mode(&request(&["SN1"], SystemMode::Normal, true))
            .await
            .unwrap();

        assert_eq!(outcome.skipped.len(), 1);
        assert!(!session.ledger().any_changed());
    }

    #[tokio::test]
    async fn blank_fabric_is_rejected_before_network() {
        let mut session = session(ScriptedTransport::new());
        let mut req = request(&["SN1"], SystemMode::Maintenance, false);
        req.fabric = " ".into();

        let err = session.set_maintenance_mode(&req).await.unwrap_err();

        assert!(matches!(err, CoreError::Validation { .. }));
        assert_eq!(session.dispatcher().transport().call_count(), 0);
    }
}
