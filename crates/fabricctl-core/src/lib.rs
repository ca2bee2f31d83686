// fabricctl-core: request dispatch, audit ledger, and convergence polling
// between fabricctl-api and consumers (CLI).

pub mod config;
pub mod dispatch;
pub mod endpoints;
pub mod error;
pub mod ledger;
pub mod ops;
pub mod poller;
pub mod session;
pub mod status;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControllerConfig, PollSettings, TlsVerification};
pub use dispatch::{Dispatcher, OperationResult};
pub use error::CoreError;
pub use ledger::{AuditLedger, LedgerReport, OperationRecord, RecordMetadata, TaskState};
pub use ops::{
    ImageAction, MaintenanceModeRequest, NxosMode, OperationOutcome, SwitchImageStatus,
    UpgradeOptions, UpgradeRequest,
};
pub use poller::{Convergence, ConvergencePoller, Operation, Progress, SystemMode};
pub use session::Session;
pub use status::{EntityStatus, EntityStatusSnapshot, EntityStatusTracker, StatusSource, StatusView};

pub use fabricctl_api::{RawResponse, Transport, Verb};
