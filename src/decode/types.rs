//! Decoder types and traits
//!
//! Defines the core decoder abstractions.

use crate::error::Result;
use crate::types::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Format of the response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// JSON Lines format (one JSON object per line)
    Jsonl,
}

/// Configuration for decoding responses
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    /// Response format
    pub format: DecoderFormat,
    /// Path to extract records from the response (for JSON)
    pub record_path: Option<String>,
}

impl DecoderConfig {
    /// Create a JSON decoder config
    pub fn json() -> Self {
        Self {
            format: DecoderFormat::Json,
            record_path: None,
        }
    }

    /// Create a JSON decoder config with a record path
    pub fn json_with_path(path: impl Into<String>) -> Self {
        Self {
            format: DecoderFormat::Json,
            record_path: Some(path.into()),
        }
    }

    /// Create a JSONL decoder config
    pub fn jsonl() -> Self {
        Self {
            format: DecoderFormat::Jsonl,
            record_path: None,
        }
    }
}

/// Trait for decoding response bodies into records
pub trait RecordDecoder: Send + Sync {
    /// Decode the response body into a list of records
    fn decode(&self, body: &str) -> Result<Vec<Record>>;

    /// Decode the response body into a single JSON value (full response)
    fn decode_raw(&self, body: &str) -> Result<Value>;
}
