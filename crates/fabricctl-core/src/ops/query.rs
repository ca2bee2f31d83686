use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use fabricctl_api::Transport;

use super::serial_set;
use crate::dispatch::OperationResult;
use crate::error::CoreError;
use crate::ledger::{OperationRecord, TaskState};
use crate::session::Session;
use crate::status::{ACTIONS_IN_PROGRESS, EntityStatus, StatusSource};

const ACTION: &str = "image_status";

/// Image-management status of one switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchImageStatus {
    pub serial_number: String,
    pub ip_address: Option<String>,
    pub device_name: Option<String>,
    pub image_staged: Option<String>,
    pub validated: Option<String>,
    pub upgrade: Option<String>,
    pub actions_in_progress: bool,
}

impl SwitchImageStatus {
    fn from_status(serial: &str, status: &EntityStatus) -> Self {
        let text = |field: &str| status.str_field(field).map(String::from);
        Self {
            serial_number: serial.to_owned(),
            ip_address: text("ipAddress"),
            device_name: text("deviceName"),
            image_staged: text("imageStaged"),
            validated: text("validated"),
            upgrade: text("upgrade"),
            actions_in_progress: status
                .fields()
                .get(ACTIONS_IN_PROGRESS)
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

impl<T: Transport> Session<T> {
    /// Read image status for `serials`, or for every switch when empty.
    ///
    /// Unknown serials are left out of the result and mark the ledger
    /// record `found = false`.
    pub async fn query_image_status(
        &mut self,
        serials: &[String],
    ) -> Result<Vec<SwitchImageStatus>, CoreError> {
        let check_mode = self.check_mode();
        let (mut poller, _, ledger) = self.parts(StatusSource::image_status());

        let wanted = if serials.is_empty() {
            None
        } else {
            match serial_set(serials) {
                Ok(set) => Some(set),
                Err(err) => {
                    ledger.record_failure(ACTION, TaskState::Query, check_mode, &err);
                    return Err(err);
                }
            }
        };

        let tracker = poller.tracker_mut();
        if let Err(err) = tracker.refresh().await {
            ledger.record_failure(ACTION, TaskState::Query, check_mode, &err);
            return Err(err);
        }
        let snapshot = tracker.snapshot();

        let keys: Vec<String> = match &wanted {
            Some(set) => set.iter().cloned().collect(),
            None => snapshot.keys().map(String::from).collect(),
        };
        let mut statuses = Vec::with_capacity(keys.len());
        let mut missing = Vec::new();
        for key in keys {
            match snapshot.get(&key) {
                Some(status) => statuses.push(SwitchImageStatus::from_status(&key, status)),
                None => missing.push(key),
            }
        }
        if !missing.is_empty() {
            warn!(?missing, "switches not reported by controller");
        }
        debug!(switches = statuses.len(), "image status read");

        ledger.append(
            OperationRecord::new(ACTION, TaskState::Query)
                .check_mode(check_mode)
                .response_value(json!({
                    "RETURN_CODE": 200,
                    "MESSAGE": "OK",
                    "DATA": statuses,
                }))
                .result(OperationResult {
                    success: true,
                    changed: false,
                    found: missing.is_empty(),
                }),
        );
        Ok(statuses)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::PollSettings;
    use crate::endpoints;
    use crate::testing::ScriptedTransport;
    use fabricctl_api::Verb;

    fn transport() -> ScriptedTransport {
        ScriptedTransport::new().ok(
            Verb::Get,
            &endpoints::image_status(),
            json!({ "lastOperDataObject": [
                { "serialNumber": "SN1", "ipAddress": "10.0.0.1", "deviceName": "leaf1",
                  "imageStaged": "Success", "validated": "In Progress", "upgrade": "None" },
                { "serialNumber": "SN2", "deviceName": "leaf2", "imageStaged": "None" },
            ]}),
        )
    }

    #[tokio::test]
    async fn empty_request_reads_every_switch() {
        let mut session = Session::new(transport(), true, PollSettings::default());

        let statuses = session.query_image_status(&[]).await.unwrap();

        assert_eq!(statuses.len(), 2);
        let sn1 = &statuses[0];
        assert_eq!(sn1.device_name.as_deref(), Some("leaf1"));
        assert!(sn1.actions_in_progress);
        assert!(!statuses[1].actions_in_progress);

        let record = &session.ledger().records()[0];
        assert_eq!(record.state, TaskState::Query);
        assert!(record.diff.is_empty());
        assert_eq!(record.result, OperationResult::UNCHANGED);
    }

    #[tokio::test]
    async fn unknown_serial_marks_not_found() {
        let mut session = Session::new(transport(), false, PollSettings::default());

        let statuses = session
            .query_image_status(&["SN2".into(), "SN9".into()])
            .await
            .unwrap();

        assert_eq!(statuses.len(), 1);
        let result = session.ledger().results()[0];
        assert!(result.success);
        assert!(!result.found);
    }
}
