// ── Entity status tracking ──
//
// `refresh()` is the only call that touches the network: one bulk GET per
// poll tick, however many entities are being watched. `filter()` and
// `get()` are pure reads over the last snapshot.

mod snapshot;

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use fabricctl_api::{Transport, Verb};

use crate::dispatch::Dispatcher;
use crate::endpoints;
use crate::error::CoreError;

pub use snapshot::{
    ACTIONS_IN_PROGRESS, EntityStatus, EntityStatusSnapshot, FAILED, IN_PROGRESS, SUCCESS,
};

/// Read access to the status fields of one entity.
pub trait StatusView {
    fn get(&self, field: &str) -> Result<&Value, CoreError>;

    /// A string field, or `None` when absent, null, or not a string.
    fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).ok().and_then(Value::as_str)
    }
}

/// Describes one bulk status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSource {
    pub path: String,
    /// Field holding the entity key in each record.
    pub key_field: String,
    /// Envelope field holding the record list; `None` for a bare array.
    pub list_field: Option<String>,
    /// Compute `actionsInProgress` from the image progress fields.
    pub derive_actions_in_progress: bool,
}

impl StatusSource {
    /// Image stage / validate / upgrade status.
    pub fn image_status() -> Self {
        Self {
            path: endpoints::image_status(),
            key_field: "serialNumber".into(),
            list_field: Some("lastOperDataObject".into()),
            derive_actions_in_progress: true,
        }
    }

    /// Switch inventory with maintenance-mode fields.
    pub fn switch_inventory() -> Self {
        Self {
            path: endpoints::switch_inventory(),
            key_field: "serialNumber".into(),
            list_field: None,
            derive_actions_in_progress: false,
        }
    }
}

/// Bulk status reader with a "current entity" cursor.
pub struct EntityStatusTracker<'a, T> {
    dispatcher: &'a Dispatcher<T>,
    source: StatusSource,
    snapshot: Arc<EntityStatusSnapshot>,
    filter: Option<String>,
    refreshes: u32,
}

impl<'a, T: Transport> EntityStatusTracker<'a, T> {
    pub fn new(dispatcher: &'a Dispatcher<T>, source: StatusSource) -> Self {
        Self {
            dispatcher,
            source,
            snapshot: Arc::new(EntityStatusSnapshot::default()),
            filter: None,
            refreshes: 0,
        }
    }

    pub fn source(&self) -> &StatusSource {
        &self.source
    }

    /// Fetch status for every entity, replacing the previous snapshot.
    ///
    /// Always a real read, even when the session runs in check mode.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        let (response, result) = self
            .dispatcher
            .commit(Verb::Get, &self.source.path, None, false)
            .await?;
        if !result.success || !result.found {
            return Err(CoreError::rejected(response));
        }
        let Some(snapshot) = EntityStatusSnapshot::from_data(&response.data, &self.source) else {
            return Err(CoreError::rejected(response));
        };
        self.refreshes += 1;
        debug!(
            path = %self.source.path,
            entities = snapshot.len(),
            refresh = self.refreshes,
            "status refreshed"
        );
        self.snapshot = Arc::new(snapshot);
        Ok(())
    }

    /// Select the entity subsequent reads apply to.
    pub fn filter(&mut self, key: impl Into<String>) {
        self.filter = Some(key.into());
    }

    /// The last snapshot. Cheap to clone; unaffected by later refreshes.
    pub fn snapshot(&self) -> Arc<EntityStatusSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Number of successful refreshes so far.
    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    /// The currently filtered entity.
    pub fn current(&self) -> Result<&EntityStatus, CoreError> {
        let Some(key) = self.filter.as_deref() else {
            return Err(CoreError::NotFound {
                entity_type: "entity".into(),
                identifier: "(no filter set)".into(),
            });
        };
        self.snapshot.get(key).ok_or_else(|| CoreError::NotFound {
            entity_type: "entity".into(),
            identifier: key.into(),
        })
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.current().ok()?.str_field("ipAddress")
    }

    pub fn device_name(&self) -> Option<&str> {
        self.current().ok()?.str_field("deviceName")
    }

    /// Completion percentage for a status field (`<field>Percent`).
    pub fn percent(&self, field: &str) -> Option<u64> {
        self.current()
            .ok()?
            .fields()
            .get(&format!("{field}Percent"))
            .and_then(Value::as_u64)
    }
}

impl<T: Transport> StatusView for EntityStatusTracker<'_, T> {
    fn get(&self, field: &str) -> Result<&Value, CoreError> {
        let entity = self.current()?;
        entity.get(field).map_err(|_| CoreError::NotFound {
            entity_type: "status field".into(),
            identifier: format!("{field} on {}", self.filter.as_deref().unwrap_or_default()),
        })
    }
}
