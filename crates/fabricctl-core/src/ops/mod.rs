//! Resource operations that drive the dispatch/ledger/poll core.
//!
//! Each operation validates its input, waits out blocking controller
//! activity, skips devices that are already where they should be, submits
//! the change, records it, and waits for the controller to converge. Any
//! failure is appended to the ledger before it is returned.

mod image;
mod maintenance;
mod query;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::CoreError;

pub use image::{ImageAction, NxosMode, UpgradeOptions, UpgradeRequest};
pub use maintenance::MaintenanceModeRequest;
pub use query::SwitchImageStatus;

/// What an operation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Devices the change was submitted for.
    pub submitted: BTreeSet<String>,
    /// Devices already converged before submission.
    pub skipped: BTreeSet<String>,
    /// Poll ticks spent waiting for completion.
    pub ticks: u32,
}

/// Deduplicate and validate a serial number list.
pub(crate) fn serial_set(serials: &[String]) -> Result<BTreeSet<String>, CoreError> {
    if serials.is_empty() {
        return Err(CoreError::validation("at least one serial number is required"));
    }
    let mut set = BTreeSet::new();
    for serial in serials {
        let trimmed = serial.trim();
        if trimmed.is_empty() {
            return Err(CoreError::validation("serial numbers must not be blank"));
        }
        set.insert(trimmed.to_owned());
    }
    Ok(set)
}

/// Response recorded when there was nothing to submit.
pub(crate) fn no_change_response() -> Value {
    json!({
        "RETURN_CODE": 200,
        "MESSAGE": "No change required",
        "DATA": {},
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn serial_set_dedupes_and_trims() {
        let set = serial_set(&[" SN2".into(), "SN1".into(), "SN2 ".into()]).unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["SN1", "SN2"]);
    }

    #[test]
    fn serial_set_rejects_empty_input() {
        assert!(matches!(serial_set(&[]), Err(CoreError::Validation { .. })));
        assert!(matches!(
            serial_set(&["SN1".into(), "  ".into()]),
            Err(CoreError::Validation { .. })
        ));
    }
}
