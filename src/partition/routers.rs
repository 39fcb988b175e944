//! Partition router implementations
//!
//! Each router handles a specific partitioning strategy.

use super::types::{ParentStreamConfig, PartitionRouter, StreamSlice};
use crate::error::{Error, Result};
use crate::types::Record;
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// List Router
// ============================================================================

/// List-based partition router
///
/// Creates one slice per value in a static list.
#[derive(Debug, Clone)]
pub struct ListRouter {
    /// List of partition values
    values: Vec<String>,
    /// Field name for partition
    partition_field: String,
}

impl ListRouter {
    /// Create a new list router
    pub fn new(values: Vec<String>, partition_field: impl Into<String>) -> Self {
        Self {
            values,
            partition_field: partition_field.into(),
        }
    }
}

impl PartitionRouter for ListRouter {
    fn stream_slices(&self) -> Result<Vec<StreamSlice>> {
        Ok(self
            .values
            .iter()
            .map(|v| StreamSlice::new(v.clone()).with_value(self.partition_field.clone(), v.clone()))
            .collect())
    }

    fn partition_field(&self) -> &str {
        &self.partition_field
    }
}

// ============================================================================
// Substream Router
// ============================================================================

/// Parent stream-based partition router
///
/// Creates one slice per distinct parent-key value found in the configured
/// parent streams' records. Carries the parent-stream configuration that the
/// legacy-state migration validates against (migration is only defined for a
/// router with exactly one parent config).
#[derive(Debug, Clone)]
pub struct SubstreamRouter {
    /// Parent stream configurations
    configs: Vec<ParentStreamConfig>,
    /// Records per parent stream name
    parent_records: HashMap<String, Vec<Record>>,
}

impl SubstreamRouter {
    /// Create a new substream router
    pub fn new(configs: Vec<ParentStreamConfig>) -> Self {
        Self {
            configs,
            parent_records: HashMap::new(),
        }
    }

    /// Convenience constructor for the common single-parent case
    pub fn single(config: ParentStreamConfig) -> Self {
        Self::new(vec![config])
    }

    /// The parent stream configurations
    pub fn parent_stream_configs(&self) -> &[ParentStreamConfig] {
        &self.configs
    }

    /// Set the records fetched from a parent stream
    pub fn set_parent_records(&mut self, stream_name: &str, records: Vec<Record>) {
        self.parent_records.insert(stream_name.to_string(), records);
    }

    /// Extract the partition key from a parent record
    fn extract_key(record: &Record, parent_key: &str) -> Option<String> {
        // Handle nested keys like "id" or "data.id"
        let mut current = record;
        for part in parent_key.split('.') {
            current = current.get(part)?;
        }

        match current {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl PartitionRouter for SubstreamRouter {
    fn stream_slices(&self) -> Result<Vec<StreamSlice>> {
        if self.configs.is_empty() {
            return Err(Error::config(
                "substream router requires at least one parent stream config",
            ));
        }

        let mut slices = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for config in &self.configs {
            let records = self
                .parent_records
                .get(&config.stream_name)
                .map(Vec::as_slice)
                .unwrap_or_default();

            for record in records {
                if let Some(key) = Self::extract_key(record, &config.parent_key) {
                    // Deduplicate across parents
                    if seen.insert(key.clone()) {
                        slices.push(
                            StreamSlice::new(&key)
                                .with_value(config.partition_field.clone(), key.clone()),
                        );
                    }
                }
            }
        }

        Ok(slices)
    }

    fn partition_field(&self) -> &str {
        self.configs
            .first()
            .map_or("", |c| c.partition_field.as_str())
    }
}
