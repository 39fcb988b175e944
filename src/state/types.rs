//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.
//!
//! A stream's state is a JSON object in one of two shapes:
//!
//! - *legacy flat*: `{"<partitionId>": {"<cursorField>": "<isoTimestamp>"}}`
//! - *partitioned*: `{"states": [{"partition": {"id": ...}, "cursor": {...}}]}`
//!
//! Exactly one shape is valid at a time; the partitioned shape is canonical
//! and is what migration and ongoing syncs produce.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Complete persisted state for a connector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    /// Per-stream state
    #[serde(default)]
    pub streams: HashMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.streams.entry(stream.to_string()).or_default()
    }
}

/// State for a single stream, in legacy-flat or partitioned shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamState(pub JsonObject);

impl StreamState {
    /// Create a new empty stream state
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: JsonValue) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::state(format!(
                "stream state must be a JSON object, got: {other}"
            ))),
        }
    }

    /// The raw JSON object
    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }

    /// The state as a JSON value (for template contexts)
    pub fn to_value(&self) -> JsonValue {
        Value::Object(self.0.clone())
    }

    /// Whether this state holds no entries at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this state is in the partitioned (`states`) shape
    pub fn is_partitioned(&self) -> bool {
        self.0.contains_key("states")
    }

    /// Read the cursor value straight off a legacy-flat state
    pub fn flat_cursor(&self, cursor_field: &str) -> Option<&JsonValue> {
        self.0.get(cursor_field)
    }

    /// Read the cursor value for one partition of a partitioned state.
    ///
    /// Returns `Ok(None)` when no entry matches the partition id, or when the
    /// matching entry has no value for the cursor field. More than one entry
    /// for the same partition id is a configuration error.
    pub fn partition_cursor(
        &self,
        partition_id: &str,
        cursor_field: &str,
    ) -> Result<Option<&JsonValue>> {
        let Some(states) = self.0.get("states").and_then(Value::as_array) else {
            return Ok(None);
        };

        let mut matched: Option<&Value> = None;
        for entry in states {
            let id = entry
                .get("partition")
                .and_then(|p| p.get("id"))
                .and_then(Value::as_str);
            if id == Some(partition_id) {
                if matched.is_some() {
                    return Err(Error::invalid_state(format!(
                        "duplicate state entries for partition '{partition_id}'"
                    )));
                }
                matched = Some(entry);
            }
        }

        Ok(matched
            .and_then(|entry| entry.get("cursor"))
            .and_then(|cursor| cursor.get(cursor_field)))
    }

    /// Set the cursor value on a legacy-flat state
    pub fn set_flat_cursor(&mut self, cursor_field: &str, value: JsonValue) {
        self.0.insert(cursor_field.to_string(), value);
    }

    /// Set the cursor value for one partition, upgrading to the partitioned
    /// shape if needed. An existing entry for the partition is updated in
    /// place; otherwise a new entry is appended.
    pub fn set_partition_cursor(
        &mut self,
        partition_id: &str,
        cursor_field: &str,
        value: JsonValue,
    ) {
        let states = self
            .0
            .entry("states".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        if let Value::Array(entries) = states {
            for entry in entries.iter_mut() {
                let id = entry
                    .get("partition")
                    .and_then(|p| p.get("id"))
                    .and_then(Value::as_str);
                if id == Some(partition_id) {
                    if let Some(Value::Object(cursor)) = entry.get_mut("cursor") {
                        cursor.insert(cursor_field.to_string(), value);
                        return;
                    }
                    *entry = partition_entry(partition_id, cursor_field, value);
                    return;
                }
            }
            entries.push(partition_entry(partition_id, cursor_field, value));
        }
    }
}

fn partition_entry(partition_id: &str, cursor_field: &str, value: JsonValue) -> JsonValue {
    serde_json::json!({
        "partition": { "id": partition_id },
        "cursor": { cursor_field: value },
    })
}

// ============================================================================
// Canonical partitioned shape
// ============================================================================

/// A partition identifier: a single-key `{id}` mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartitionDescriptor {
    /// Stable string id of the partition
    pub id: String,
}

/// One `{partition, cursor}` entry of a partitioned state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionCursor {
    /// Which partition this entry tracks
    pub partition: PartitionDescriptor,
    /// Single-key mapping from cursor field to cursor value
    pub cursor: JsonObject,
}

/// The canonical partitioned stream state: `{"states": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionedState {
    /// Per-partition cursor entries, in insertion order
    pub states: Vec<PartitionCursor>,
}

impl PartitionedState {
    /// Convert into an untyped [`StreamState`]
    pub fn into_stream_state(self) -> Result<StreamState> {
        StreamState::from_value(serde_json::to_value(self)?)
    }
}
