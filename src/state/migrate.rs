//! Legacy-state migration
//!
//! Upgrades the legacy flat per-partition cursor state
//! (`{"<partitionId>": {"<cursorField>": value}}`) to the canonical
//! partitioned shape (`{"states": [{"partition": {"id": ...}, "cursor":
//! {...}}]}`).
//!
//! Validation is strict: an ambiguous state is never silently accepted. The
//! migration itself is a pure transformation and runs once at stream-open
//! time, before any cursor or partition router consumes persisted state.

use super::types::{PartitionCursor, PartitionDescriptor, PartitionedState, StreamState};
use crate::error::{Error, Result};
use crate::partition::SubstreamRouter;
use crate::types::JsonObject;
use serde_json::Value;
use tracing::debug;

/// Migrates a stream's legacy flat cursor state to the partitioned shape.
#[derive(Debug, Clone)]
pub struct LegacyStateMigration {
    /// The substream router driving the stream; migration is only defined
    /// when it has exactly one parent stream config
    router: SubstreamRouter,
    /// The stream's configured cursor field
    cursor_field: String,
}

impl LegacyStateMigration {
    /// Create a new migration for the given router and cursor field
    pub fn new(router: SubstreamRouter, cursor_field: impl Into<String>) -> Self {
        Self {
            router,
            cursor_field: cursor_field.into(),
        }
    }

    /// Decide whether `state` is a legacy flat state that needs migration.
    ///
    /// Returns `Ok(false)` for an already-partitioned or empty state and
    /// `Ok(true)` for a well-formed legacy state. A state that is shaped
    /// like either form but violates a structural rule is an error, never a
    /// silent `false`.
    pub fn should_migrate(&self, state: &StreamState) -> Result<bool> {
        if state.is_partitioned() {
            self.validate_partitioned(state.as_object())?;
            return Ok(false);
        }

        if state.is_empty() {
            return Ok(false);
        }

        let parent_configs = self.router.parent_stream_configs().len();
        if parent_configs != 1 {
            return Err(Error::invalid_state(format!(
                "legacy state migration requires exactly one parent stream config, found {parent_configs}"
            )));
        }

        for (partition_id, value) in state.as_object() {
            self.validate_legacy_cursor(partition_id, value)?;
        }

        Ok(true)
    }

    /// Transform a legacy state into the partitioned shape.
    ///
    /// Precondition: [`should_migrate`](Self::should_migrate) returned true.
    /// One entry is emitted per legacy key, in input iteration order; the
    /// input is never mutated.
    pub fn migrate(&self, state: &StreamState) -> Result<StreamState> {
        let mut entries = Vec::with_capacity(state.as_object().len());

        for (partition_id, value) in state.as_object() {
            let cursor = self.validate_legacy_cursor(partition_id, value)?;
            entries.push(PartitionCursor {
                partition: PartitionDescriptor {
                    id: partition_id.clone(),
                },
                cursor: cursor.clone(),
            });
        }

        debug!(
            partitions = entries.len(),
            cursor_field = %self.cursor_field,
            "migrated legacy state to partitioned shape"
        );

        PartitionedState { states: entries }.into_stream_state()
    }

    /// Check one legacy entry: a mapping with exactly one key, the cursor field
    fn validate_legacy_cursor<'a>(
        &self,
        partition_id: &str,
        value: &'a Value,
    ) -> Result<&'a JsonObject> {
        let cursor = value.as_object().ok_or_else(|| {
            Error::invalid_state(format!(
                "legacy state entry '{partition_id}' is not a mapping"
            ))
        })?;

        if cursor.len() != 1 {
            return Err(Error::invalid_state(format!(
                "legacy state entry '{partition_id}' must have exactly one cursor key, found {}",
                cursor.len()
            )));
        }

        if !cursor.contains_key(&self.cursor_field) {
            return Err(Error::invalid_state(format!(
                "legacy state entry '{partition_id}' is not keyed by cursor field '{}'",
                self.cursor_field
            )));
        }

        Ok(cursor)
    }

    /// Check every entry of an already-partitioned state
    fn validate_partitioned(&self, state: &JsonObject) -> Result<()> {
        let entries = state
            .get("states")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::invalid_state("'states' must be a sequence"))?;

        for (index, entry) in entries.iter().enumerate() {
            let partition = entry
                .get("partition")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    Error::invalid_state(format!(
                        "state entry {index} is missing its partition component"
                    ))
                })?;

            if partition.len() != 1 || !partition.contains_key("id") {
                return Err(Error::invalid_state(format!(
                    "state entry {index} must identify its partition by a single 'id' key"
                )));
            }

            let cursor = entry
                .get("cursor")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    Error::invalid_state(format!(
                        "state entry {index} is missing its cursor component"
                    ))
                })?;

            if cursor.len() != 1 || !cursor.contains_key(&self.cursor_field) {
                return Err(Error::invalid_state(format!(
                    "state entry {index} must carry exactly one cursor keyed by '{}'",
                    self.cursor_field
                )));
            }
        }

        Ok(())
    }
}
