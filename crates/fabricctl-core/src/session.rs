// ── Session facade ──
//
// One task invocation: a dispatcher, the ledger it fills, and the polling
// knobs and cancellation token every wait call in the task shares. The
// resource operations in `ops` are inherent methods on `Session`.

use tokio_util::sync::CancellationToken;

use fabricctl_api::{HttpTransport, TlsMode, Transport, TransportConfig};

use crate::config::{ControllerConfig, PollSettings, TlsVerification};
use crate::dispatch::Dispatcher;
use crate::error::CoreError;
use crate::ledger::{AuditLedger, TaskState};
use crate::poller::ConvergencePoller;
use crate::status::StatusSource;

/// The main entry point for consumers.
pub struct Session<T> {
    dispatcher: Dispatcher<T>,
    ledger: AuditLedger,
    poll: PollSettings,
    cancel: CancellationToken,
    unit_test: bool,
}

impl Session<HttpTransport> {
    /// Build an HTTP-backed session from configuration.
    ///
    /// Does not touch the network; the first request happens on the first
    /// operation.
    pub fn connect(config: &ControllerConfig) -> Result<Self, CoreError> {
        let tls = match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        let transport_config = TransportConfig {
            tls,
            timeout: config.timeout,
        };
        let transport =
            HttpTransport::new(config.url.clone(), config.api_key.as_ref(), &transport_config)?;
        Ok(Self::new(transport, config.check_mode, config.poll))
    }
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, check_mode: bool, poll: PollSettings) -> Self {
        Self {
            dispatcher: Dispatcher::new(transport, check_mode),
            ledger: AuditLedger::new(),
            poll,
            cancel: CancellationToken::new(),
            unit_test: false,
        }
    }

    /// Abort in-flight waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Skip poll sleeps in every wait this session runs.
    pub fn unit_test(mut self, enabled: bool) -> Self {
        self.unit_test = enabled;
        self
    }

    pub fn check_mode(&self) -> bool {
        self.dispatcher.check_mode()
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.poll
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut AuditLedger {
        &mut self.ledger
    }

    /// Split into a poller over `source` and the ledger, borrowed together.
    pub(crate) fn parts(
        &mut self,
        source: StatusSource,
    ) -> (ConvergencePoller<'_, T>, &Dispatcher<T>, &mut AuditLedger) {
        let poller = ConvergencePoller::for_source(&self.dispatcher, source)
            .with_cancellation(self.cancel.clone())
            .unit_test(self.unit_test);
        (poller, &self.dispatcher, &mut self.ledger)
    }

    /// Refuse to start a mutation once anything in this task has failed.
    ///
    /// The refusal itself is recorded.
    pub(crate) fn ensure_clean(&mut self, action: &str) -> Result<(), CoreError> {
        if !self.ledger.any_failed() {
            return Ok(());
        }
        let err = CoreError::validation(format!(
            "refusing to run {action}: an earlier operation in this task failed"
        ));
        let check_mode = self.check_mode();
        self.ledger
            .record_failure(action, TaskState::Merged, check_mode, &err);
        Err(err)
    }
}
