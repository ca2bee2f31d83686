// ── Convergence polling ──
//
// Waits for a set of independently-progressing devices to reach a
// terminal state. One wait call owns one `ConvergenceRequest`; each tick
// sleeps once, charges the budget once, refreshes status once, then walks
// the pending items in key order.
//
//   RUNNING ──all done──────────▶ CONVERGED
//      │ ───first "Failed"─────▶ FAILED     (fail-fast)
//      │ ───budget exhausted───▶ TIMED_OUT
//      └ ───token cancelled────▶ CANCELLED

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fabricctl_api::Transport;

use crate::config::PollSettings;
use crate::dispatch::Dispatcher;
use crate::error::CoreError;
use crate::status::{EntityStatusTracker, FAILED, StatusSource, StatusView, SUCCESS};

/// Budget charged for a tick when the interval is zero, so a finite
/// timeout always bounds the number of ticks.
const MIN_TICK_CHARGE: Duration = Duration::from_secs(1);

/// Switch system mode targeted by a maintenance-mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SystemMode {
    Normal,
    Maintenance,
}

/// Asynchronous controller operation a wait call can converge on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ImageStage,
    ImageValidate,
    ImageUpgrade,
    MaintenanceMode(SystemMode),
}

impl Operation {
    /// Status field the controller reports progress in.
    pub fn status_field(self) -> &'static str {
        match self {
            Self::ImageStage => "imageStaged",
            Self::ImageValidate => "validated",
            Self::ImageUpgrade => "upgrade",
            Self::MaintenanceMode(_) => "mode",
        }
    }

    /// Bulk endpoint that reports this operation's status.
    pub fn status_source(self) -> StatusSource {
        match self {
            Self::MaintenanceMode(_) => StatusSource::switch_inventory(),
            _ => StatusSource::image_status(),
        }
    }

    /// Interpret the current entity's status for this operation.
    ///
    /// A missing entity or field counts as pending.
    pub fn classify(self, view: &impl StatusView) -> Progress {
        match self {
            Self::MaintenanceMode(target) => {
                let mode = view.get_str("mode");
                let system_mode = view.get_str("systemMode");
                let wanted = target.to_string();
                let at_target = |v: Option<&str>| v.is_some_and(|m| m.eq_ignore_ascii_case(&wanted));
                if at_target(mode) && at_target(system_mode) {
                    Progress::Succeeded
                } else {
                    Progress::Pending(mode.map(String::from))
                }
            }
            _ => match view.get_str(self.status_field()) {
                Some(SUCCESS) => Progress::Succeeded,
                Some(FAILED) => Progress::Failed(FAILED.into()),
                other => Progress::Pending(other.map(String::from)),
            },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaintenanceMode(target) => write!(f, "maintenanceMode({target})"),
            other => f.write_str(other.status_field()),
        }
    }
}

/// Per-item interpretation of one status read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Not terminal yet; carries the raw status when there is one.
    Pending(Option<String>),
    Succeeded,
    Failed(String),
}

/// Terminal state of a wait call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PollState {
    Running,
    Converged,
    Failed,
    TimedOut,
    Cancelled,
}

/// Working state of one wait call. Owned by the poll loop that made it.
#[derive(Debug)]
pub struct ConvergenceRequest {
    operation: String,
    items: BTreeSet<String>,
    done: BTreeSet<String>,
    interval: Duration,
    budget: Duration,
    initial_budget: Duration,
    ticks: u32,
}

impl ConvergenceRequest {
    pub fn new(operation: impl Into<String>, items: &BTreeSet<String>, settings: PollSettings) -> Self {
        Self {
            operation: operation.into(),
            items: items.clone(),
            done: BTreeSet::new(),
            interval: settings.interval,
            budget: settings.timeout,
            initial_budget: settings.timeout,
            ticks: 0,
        }
    }

    pub fn is_converged(&self) -> bool {
        self.done.len() == self.items.len()
    }

    pub fn has_budget(&self) -> bool {
        !self.budget.is_zero()
    }

    /// Items not yet done, in key order.
    pub fn pending(&self) -> Vec<String> {
        self.items.difference(&self.done).cloned().collect()
    }

    pub fn done(&self) -> &BTreeSet<String> {
        &self.done
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    fn mark_done(&mut self, item: String) {
        self.done.insert(item);
    }

    fn charge_tick(&mut self) {
        self.ticks += 1;
        self.budget = self.budget.saturating_sub(self.interval.max(MIN_TICK_CHARGE));
    }

    fn todo(&self) -> BTreeSet<String> {
        self.pending().into_iter().collect()
    }

    fn timed_out(&self) -> CoreError {
        CoreError::Timeout {
            operation: self.operation.clone(),
            budget_secs: self.initial_budget.as_secs(),
            done: self.done.clone(),
            todo: self.todo(),
        }
    }

    fn cancelled(&self) -> CoreError {
        CoreError::Cancelled {
            operation: self.operation.clone(),
            done: self.done.clone(),
            todo: self.todo(),
        }
    }

    fn failed(&self, item: &str, status: String) -> CoreError {
        CoreError::Convergence {
            operation: self.operation.clone(),
            item: item.to_owned(),
            status,
            done: self.done.clone(),
            todo: self.todo(),
        }
    }

    fn outcome(self) -> Convergence {
        Convergence {
            done: self.done,
            ticks: self.ticks,
        }
    }
}

/// Successful wait: every item reached its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
    pub done: BTreeSet<String>,
    pub ticks: u32,
}

/// Waits for entities to converge, built on a status tracker.
pub struct ConvergencePoller<'a, T> {
    tracker: EntityStatusTracker<'a, T>,
    cancel: CancellationToken,
    unit_test: bool,
}

impl<'a, T: Transport> ConvergencePoller<'a, T> {
    pub fn new(tracker: EntityStatusTracker<'a, T>) -> Self {
        Self {
            tracker,
            cancel: CancellationToken::new(),
            unit_test: false,
        }
    }

    /// Poller over a fresh tracker for `source`.
    pub fn for_source(dispatcher: &'a Dispatcher<T>, source: StatusSource) -> Self {
        Self::new(EntityStatusTracker::new(dispatcher, source))
    }

    /// Abort waits early when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Skip tick sleeps. The budget is still charged every tick.
    pub fn unit_test(mut self, enabled: bool) -> Self {
        self.unit_test = enabled;
        self
    }

    pub fn tracker(&self) -> &EntityStatusTracker<'a, T> {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut EntityStatusTracker<'a, T> {
        &mut self.tracker
    }

    /// Wait until `blocking_field` reads `false` for every item.
    ///
    /// An item the controller does not know about is an error, not a
    /// pending item.
    pub async fn wait_for_precondition(
        &mut self,
        items: &BTreeSet<String>,
        blocking_field: &str,
        settings: PollSettings,
    ) -> Result<Convergence, CoreError> {
        let mut req = ConvergenceRequest::new(blocking_field, items, settings);
        debug!(
            field = blocking_field,
            items = items.len(),
            state = %PollState::Running,
            "waiting for precondition"
        );

        while !req.is_converged() && req.has_budget() {
            self.tick(&mut req).await?;
            for item in req.pending() {
                self.tracker.filter(item.as_str());
                let blocked = self.tracker.get(blocking_field)?;
                if blocked == &Value::Bool(false) {
                    debug!(%item, field = blocking_field, "no blocking action");
                    req.mark_done(item);
                }
            }
        }

        Self::finish(req)
    }

    /// Wait until every item reports terminal success for `operation`.
    ///
    /// The first item seen in a failed state aborts the whole wait.
    pub async fn wait_for_completion(
        &mut self,
        items: &BTreeSet<String>,
        operation: Operation,
        settings: PollSettings,
    ) -> Result<Convergence, CoreError> {
        let mut req = ConvergenceRequest::new(operation.to_string(), items, settings);
        debug!(
            %operation,
            items = items.len(),
            state = %PollState::Running,
            "waiting for completion"
        );

        while !req.is_converged() && req.has_budget() {
            self.tick(&mut req).await?;
            for item in req.pending() {
                self.tracker.filter(item.as_str());
                match operation.classify(&self.tracker) {
                    Progress::Succeeded => {
                        info!(%item, %operation, ip = ?self.tracker.ip_address(), "converged");
                        req.mark_done(item);
                    }
                    Progress::Failed(status) => {
                        warn!(%item, %operation, %status, state = %PollState::Failed, "operation failed");
                        return Err(req.failed(&item, status));
                    }
                    Progress::Pending(status) => {
                        debug!(
                            %item,
                            %operation,
                            status = status.as_deref().unwrap_or("None"),
                            percent = ?self.tracker.percent(operation.status_field()),
                            "pending"
                        );
                    }
                }
            }
        }

        Self::finish(req)
    }

    /// Drop items that already report terminal success for `operation`.
    ///
    /// One refresh. Lets idempotent re-runs skip the wait entirely.
    pub async fn prune_converged(
        &mut self,
        items: &BTreeSet<String>,
        operation: Operation,
    ) -> Result<BTreeSet<String>, CoreError> {
        self.tracker.refresh().await?;
        let mut remaining = BTreeSet::new();
        for item in items {
            self.tracker.filter(item.as_str());
            if operation.classify(&self.tracker) == Progress::Succeeded {
                debug!(%item, %operation, "already converged, pruning");
            } else {
                remaining.insert(item.clone());
            }
        }
        Ok(remaining)
    }

    async fn tick(&mut self, req: &mut ConvergenceRequest) -> Result<(), CoreError> {
        self.pause(req).await?;
        req.charge_tick();
        self.tracker.refresh().await?;
        debug!(
            operation = %req.operation,
            tick = req.ticks,
            remaining_secs = req.budget.as_secs(),
            pending = req.items.len() - req.done.len(),
            "poll tick"
        );
        Ok(())
    }

    async fn pause(&self, req: &ConvergenceRequest) -> Result<(), CoreError> {
        let cancelled = if self.cancel.is_cancelled() {
            true
        } else if self.unit_test {
            false
        } else {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => true,
                () = tokio::time::sleep(req.interval) => false,
            }
        };
        if cancelled {
            warn!(operation = %req.operation, ticks = req.ticks, state = %PollState::Cancelled, "wait cancelled");
            return Err(req.cancelled());
        }
        Ok(())
    }

    fn finish(req: ConvergenceRequest) -> Result<Convergence, CoreError> {
        if req.is_converged() {
            debug!(operation = %req.operation, ticks = req.ticks, state = %PollState::Converged, "wait finished");
            return Ok(req.outcome());
        }
        warn!(
            operation = %req.operation,
            ticks = req.ticks,
            pending = ?req.pending(),
            state = %PollState::TimedOut,
            "wait timed out"
        );
        Err(req.timed_out())
    }
}
