// ── Bulk status snapshots ──
//
// One snapshot per refresh, built from a single list-endpoint response
// and never patched in place afterwards.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{StatusSource, StatusView};
use crate::error::CoreError;

/// Status value for an operation that is still running.
pub const IN_PROGRESS: &str = "In Progress";
/// Terminal success value.
pub const SUCCESS: &str = "Success";
/// Terminal failure value.
pub const FAILED: &str = "Failed";

/// Derived field: `true` while any image operation is running on a switch.
pub const ACTIONS_IN_PROGRESS: &str = "actionsInProgress";

/// Fields whose "In Progress" value blocks a new image operation.
const PROGRESS_FIELDS: [&str; 3] = ["imageStaged", "validated", "upgrade"];

/// The named status fields of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntityStatus {
    fields: Map<String, Value>,
}

impl EntityStatus {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// A string field, or `None` when absent, null, or not a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

impl StatusView for EntityStatus {
    fn get(&self, field: &str) -> Result<&Value, CoreError> {
        self.fields.get(field).ok_or_else(|| CoreError::NotFound {
            entity_type: "status field".into(),
            identifier: field.into(),
        })
    }
}

/// Status of every entity the controller reported, keyed by serial number.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntityStatusSnapshot {
    entities: BTreeMap<String, EntityStatus>,
}

impl EntityStatusSnapshot {
    /// Parse a list-endpoint body.
    ///
    /// Returns `None` when the body holds no list. Records without the key
    /// field are skipped; they cannot be addressed.
    pub fn from_data(data: &Value, source: &StatusSource) -> Option<Self> {
        let list = match &source.list_field {
            Some(field) => data.get(field).unwrap_or(&Value::Null),
            None => data,
        };
        let items = list.as_array()?;

        let mut entities = BTreeMap::new();
        for item in items {
            let Some(fields) = item.as_object() else {
                continue;
            };
            let Some(key) = fields.get(&source.key_field).and_then(Value::as_str) else {
                continue;
            };
            let mut fields = fields.clone();
            if source.derive_actions_in_progress && !fields.contains_key(ACTIONS_IN_PROGRESS) {
                let busy = PROGRESS_FIELDS
                    .iter()
                    .any(|f| fields.get(*f).and_then(Value::as_str) == Some(IN_PROGRESS));
                fields.insert(ACTIONS_IN_PROGRESS.into(), Value::Bool(busy));
            }
            entities.insert(key.to_owned(), EntityStatus::new(fields));
        }
        Some(Self { entities })
    }

    pub fn get(&self, key: &str) -> Option<&EntityStatus> {
        self.entities.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entities.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}
