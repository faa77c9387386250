//! Actions
//!
//! An action describes "what happened". The store imposes exactly one
//! structural requirement on it: a non-empty discriminant, exposed through
//! [`Action::kind`]. Everything else about the shape of an action belongs to
//! the application.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Reserved action kinds dispatched by the store itself.
///
/// Reducers must treat any kind they do not recognise, these included, as
/// "return the current state unchanged".
pub mod action_types {
    /// Dispatched once when a store is created.
    pub const INIT: &str = "@@INIT";

    /// Dispatched once per `replace_reducer` call.
    pub const REPLACE: &str = "@@INIT_REPLACE";
}

/// Name of the discriminant field on JSON actions.
pub const KIND_FIELD: &str = "kind";

/// A tagged description of a state transition request.
pub trait Action: Sized {
    /// The discriminant identifying this action to reducers.
    fn kind(&self) -> &str;

    /// Build one of the reserved bootstrap actions (see [`action_types`]).
    fn bootstrap(kind: &'static str) -> Self;

    /// Check the structural contract before the action reaches a reducer.
    fn validate(&self) -> Result<()> {
        if self.kind().is_empty() {
            return Err(StoreError::InvalidUpdate(
                "action kind must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Action for Value {
    fn kind(&self) -> &str {
        self.get(KIND_FIELD).and_then(Value::as_str).unwrap_or("")
    }

    fn bootstrap(kind: &'static str) -> Self {
        let mut map = Map::new();
        map.insert(KIND_FIELD.to_string(), Value::String(kind.to_string()));
        Value::Object(map)
    }

    fn validate(&self) -> Result<()> {
        let Some(map) = self.as_object() else {
            return Err(StoreError::InvalidUpdate(
                "actions must be JSON objects".to_string(),
            ));
        };
        match map.get(KIND_FIELD) {
            Some(Value::String(kind)) if !kind.is_empty() => Ok(()),
            Some(_) => Err(StoreError::InvalidUpdate(format!(
                "action `{KIND_FIELD}` must be a non-empty string"
            ))),
            None => Err(StoreError::InvalidUpdate(format!(
                "action is missing the `{KIND_FIELD}` field"
            ))),
        }
    }
}

/// Build a JSON action of the given kind carrying `payload`.
///
/// Object payloads are merged into the action; any other payload is stored
/// under a `"payload"` key.
pub fn json_action<T: Serialize>(kind: &str, payload: T) -> Result<Value> {
    let payload = serde_json::to_value(payload)
        .map_err(|e| StoreError::InvalidArgument(format!("unserializable payload: {e}")))?;

    let mut map = Map::new();
    match payload {
        Value::Object(fields) => map.extend(fields),
        Value::Null => {}
        other => {
            map.insert("payload".to_string(), other);
        }
    }
    map.insert(KIND_FIELD.to_string(), Value::String(kind.to_string()));
    Ok(Value::Object(map))
}
