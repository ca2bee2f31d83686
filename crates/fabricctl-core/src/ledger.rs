// ── Audit ledger ──
//
// Append-only record of every dispatched operation in a task. Sequence
// numbers are ledger-local and assigned at append time. The diff,
// response, and result views are projections of one record list, so they
// can never drift out of step.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use fabricctl_api::RawResponse;

use crate::dispatch::OperationResult;
use crate::error::CoreError;

/// Task-level intent tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskState {
    Merged,
    Query,
}

/// One dispatched operation and its outcome.
///
/// Built by the caller, numbered by [`AuditLedger::append`], and never
/// mutated afterwards: the ledger only hands out shared references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Zero until appended.
    pub sequence_number: u64,
    pub action: String,
    pub check_mode: bool,
    pub state: TaskState,
    pub diff: Map<String, Value>,
    pub response: Value,
    pub result: OperationResult,
    pub recorded_at: DateTime<Utc>,
}

impl OperationRecord {
    pub fn new(action: impl Into<String>, state: TaskState) -> Self {
        Self {
            sequence_number: 0,
            action: action.into(),
            check_mode: false,
            state,
            diff: Map::new(),
            response: Value::Object(Map::new()),
            result: OperationResult::default(),
            recorded_at: Utc::now(),
        }
    }

    pub fn check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn diff(mut self, diff: Map<String, Value>) -> Self {
        self.diff = diff;
        self
    }

    pub fn response(mut self, response: &RawResponse) -> Self {
        self.response = serde_json::to_value(response).unwrap_or(Value::Null);
        self
    }

    pub fn response_value(mut self, response: Value) -> Self {
        self.response = response;
        self
    }

    pub fn result(mut self, result: OperationResult) -> Self {
        self.result = result;
        self
    }
}

/// Append-only, sequence-numbered record of a task's operations.
#[derive(Debug, Default)]
pub struct AuditLedger {
    records: Vec<OperationRecord>,
    next_sequence: u64,
}

impl AuditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number the record and store it. Returns the assigned sequence number.
    pub fn append(&mut self, mut record: OperationRecord) -> u64 {
        self.next_sequence += 1;
        record.sequence_number = self.next_sequence;
        self.records.push(record);
        self.next_sequence
    }

    /// Record a failure so it shows up in the audit trail.
    ///
    /// The diff is empty: nothing changed.
    pub fn record_failure(
        &mut self,
        action: &str,
        state: TaskState,
        check_mode: bool,
        error: &CoreError,
    ) -> u64 {
        self.append(
            OperationRecord::new(action, state)
                .check_mode(check_mode)
                .response_value(error.response_value())
                .result(OperationResult::FAILED),
        )
    }

    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn diffs(&self) -> Vec<&Map<String, Value>> {
        self.records.iter().map(|r| &r.diff).collect()
    }

    pub fn responses(&self) -> Vec<&Value> {
        self.records.iter().map(|r| &r.response).collect()
    }

    pub fn results(&self) -> Vec<OperationResult> {
        self.records.iter().map(|r| r.result).collect()
    }

    /// Distinct `!success` values seen so far.
    ///
    /// Contains `true` once any record failed.
    pub fn failed(&self) -> BTreeSet<bool> {
        self.records.iter().map(|r| !r.result.success).collect()
    }

    /// Distinct `changed` values seen so far.
    pub fn changed(&self) -> BTreeSet<bool> {
        self.records.iter().map(|r| r.result.changed).collect()
    }

    pub fn any_failed(&self) -> bool {
        self.failed().contains(&true)
    }

    pub fn any_changed(&self) -> bool {
        self.changed().contains(&true)
    }

    /// Serializable summary for operators.
    pub fn report(&self) -> LedgerReport {
        let mut diff = Vec::with_capacity(self.records.len());
        let mut metadata = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let mut entry = record.diff.clone();
            entry.insert("sequence_number".into(), record.sequence_number.into());
            diff.push(Value::Object(entry));
            metadata.push(RecordMetadata {
                sequence_number: record.sequence_number,
                action: record.action.clone(),
                state: record.state,
                check_mode: record.check_mode,
                recorded_at: record.recorded_at,
            });
        }
        LedgerReport {
            changed: self.any_changed(),
            failed: self.any_failed(),
            diff,
            response: self.records.iter().map(|r| r.response.clone()).collect(),
            result: self.results(),
            metadata,
        }
    }
}

/// Per-record bookkeeping shown next to the diff/response/result lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub sequence_number: u64,
    pub action: String,
    pub state: TaskState,
    pub check_mode: bool,
    pub recorded_at: DateTime<Utc>,
}

/// What a task changed, as reported to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerReport {
    pub changed: bool,
    pub failed: bool,
    pub diff: Vec<Value>,
    pub response: Vec<Value>,
    pub result: Vec<OperationResult>,
    pub metadata: Vec<RecordMetadata>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn record(action: &str, result: OperationResult) -> OperationRecord {
        OperationRecord::new(action, TaskState::Merged).result(result)
    }

    #[test]
    fn sequence_numbers_follow_append_order() {
        let mut ledger = AuditLedger::new();
        let seqs: Vec<u64> = (0..5)
            .map(|i| ledger.append(record(&format!("op{i}"), OperationResult::UNCHANGED)))
            .collect();

        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        let stored: Vec<u64> = ledger.records().iter().map(|r| r.sequence_number).collect();
        assert_eq!(stored, seqs);
        assert_eq!(ledger.records()[3].action, "op3");
    }

    #[test]
    fn sequence_numbers_are_per_ledger() {
        let mut a = AuditLedger::new();
        let mut b = AuditLedger::new();
        a.append(record("x", OperationResult::UNCHANGED));
        a.append(record("y", OperationResult::UNCHANGED));
        assert_eq!(b.append(record("z", OperationResult::UNCHANGED)), 1);
    }

    #[test]
    fn parallel_views_stay_in_step() {
        let mut ledger = AuditLedger::new();
        assert!(ledger.is_empty());
        for i in 0..4 {
            ledger.append(record("op", OperationResult::UNCHANGED));
            if i % 2 == 0 {
                ledger.record_failure(
                    "op",
                    TaskState::Merged,
                    false,
                    &CoreError::validation("bad"),
                );
            }
            assert_eq!(ledger.diffs().len(), ledger.responses().len());
            assert_eq!(ledger.responses().len(), ledger.results().len());
        }
        assert_eq!(ledger.len(), 6);
    }

    #[test]
    fn failed_and_changed_views() {
        let mut ledger = AuditLedger::new();
        assert!(ledger.failed().is_empty());

        ledger.append(record(
            "image_stage",
            OperationResult {
                success: true,
                changed: true,
                found: true,
            },
        ));
        assert_eq!(ledger.failed(), BTreeSet::from([false]));
        assert_eq!(ledger.changed(), BTreeSet::from([true]));
        assert!(!ledger.any_failed());

        ledger.append(record("image_validate", OperationResult::FAILED));
        assert_eq!(ledger.failed(), BTreeSet::from([false, true]));
        assert_eq!(ledger.changed(), BTreeSet::from([false, true]));
        assert!(ledger.any_failed());
        assert!(ledger.any_changed());
    }

    #[test]
    fn failure_record_has_empty_diff() {
        let mut ledger = AuditLedger::new();
        let seq = ledger.record_failure(
            "image_upgrade",
            TaskState::Merged,
            true,
            &CoreError::validation("no serials"),
        );

        let rec = &ledger.records()[0];
        assert_eq!(seq, 1);
        assert!(rec.diff.is_empty());
        assert!(rec.check_mode);
        assert_eq!(rec.result, OperationResult::FAILED);
        assert_eq!(rec.response["MESSAGE"], "Validation failed: no serials");
    }

    #[test]
    fn report_numbers_diffs() {
        let mut ledger = AuditLedger::new();
        let mut diff = Map::new();
        diff.insert("serial_numbers".into(), json!(["SN1"]));
        ledger.append(
            OperationRecord::new("image_stage", TaskState::Merged)
                .diff(diff)
                .result(OperationResult {
                    success: true,
                    changed: true,
                    found: true,
                }),
        );

        let report = ledger.report();
        assert!(report.changed);
        assert!(!report.failed);
        assert_eq!(
            report.diff,
            vec![json!({ "serial_numbers": ["SN1"], "sequence_number": 1 })]
        );
        assert_eq!(report.metadata[0].action, "image_stage");
        assert_eq!(report.metadata[0].state, TaskState::Merged);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["metadata"][0]["state"], "merged");
    }

    #[test]
    fn task_states_are_merged_and_query() {
        assert_eq!(TaskState::Merged.to_string(), "merged");
        assert_eq!("query".parse::<TaskState>().unwrap(), TaskState::Query);
        assert!("deleted".parse::<TaskState>().is_err());
        assert!("replaced".parse::<TaskState>().is_err());
    }
}
