//! Partition types and traits
//!
//! Defines the core partition abstractions.

use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;

/// One unit of extraction: a partition id plus the values to inject into
/// request templates for that partition.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSlice {
    /// Stable string id of the partition
    pub partition_id: String,
    /// Values to inject into templates/queries
    pub values: HashMap<String, Value>,
}

impl StreamSlice {
    /// Create a new slice
    pub fn new(partition_id: impl Into<String>) -> Self {
        Self {
            partition_id: partition_id.into(),
            values: HashMap::new(),
        }
    }

    /// Add a value to the slice
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The slice as a JSON object for template contexts: the values plus an
    /// `id` entry for the partition id
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("id".to_string(), Value::String(self.partition_id.clone()));
        for (key, value) in &self.values {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

/// Configuration for one parent stream feeding a substream router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentStreamConfig {
    /// Name of the parent stream
    pub stream_name: String,
    /// Field to extract from parent records
    pub parent_key: String,
    /// Field name injected into child-request templates
    pub partition_field: String,
}

impl ParentStreamConfig {
    /// Create a new parent stream config
    pub fn new(
        stream_name: impl Into<String>,
        parent_key: impl Into<String>,
        partition_field: impl Into<String>,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            parent_key: parent_key.into(),
            partition_field: partition_field.into(),
        }
    }
}

/// Trait for partition routers
pub trait PartitionRouter: Send + Sync {
    /// Generate the slices to extract
    fn stream_slices(&self) -> Result<Vec<StreamSlice>>;

    /// Get the partition field name (for template interpolation)
    fn partition_field(&self) -> &str;
}
