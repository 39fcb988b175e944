//! Decoder implementations
//!
//! Each decoder handles a specific response format.

use super::types::{DecoderConfig, DecoderFormat, RecordDecoder};
use crate::error::{Error, Result};
use crate::types::Record;
use serde_json::Value;

/// Build a decoder from a config. Always constructs a fresh instance so no
/// mutable default is shared between requesters.
pub(crate) fn build_decoder(config: &DecoderConfig) -> Box<dyn RecordDecoder> {
    match config.format {
        DecoderFormat::Json => Box::new(match &config.record_path {
            Some(path) => JsonDecoder::with_path(path.clone()),
            None => JsonDecoder::new(),
        }),
        DecoderFormat::Jsonl => Box::new(JsonlDecoder::new()),
    }
}

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder with optional record path extraction
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    /// Path to extract records (dot notation, or a JSONPath with wildcards)
    record_path: Option<String>,
}

impl JsonDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON decoder with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
        }
    }

    /// Extract records from a JSON value using the configured path
    fn extract_records(&self, value: &Value) -> Result<Vec<Record>> {
        match &self.record_path {
            Some(path) => {
                // Simple dot-notation paths are handled directly; only
                // wildcard patterns go through jsonpath-rust
                if path.contains('*') {
                    extract_with_jsonpath(value, path)
                } else {
                    match extract_simple_path(value, path) {
                        Some(Value::Array(arr)) => Ok(arr),
                        Some(v) => Ok(vec![v]),
                        None => Ok(vec![]),
                    }
                }
            }
            None => {
                // No path - treat entire response as records
                match value {
                    Value::Array(arr) => Ok(arr.clone()),
                    _ => Ok(vec![value.clone()]),
                }
            }
        }
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Record>> {
        let value: Value = serde_json::from_str(body).map_err(|e| Error::Decode {
            message: format!("Failed to parse JSON: {e}"),
        })?;
        self.extract_records(&value)
    }

    fn decode_raw(&self, body: &str) -> Result<Value> {
        serde_json::from_str(body).map_err(|e| Error::Decode {
            message: format!("Failed to parse JSON: {e}"),
        })
    }
}

// ============================================================================
// JSONL Decoder
// ============================================================================

/// JSON Lines decoder (one JSON object per line)
#[derive(Debug, Clone, Default)]
pub struct JsonlDecoder;

impl JsonlDecoder {
    /// Create a new JSONL decoder
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for JsonlDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();

        for (line_num, line) in body.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(line).map_err(|e| Error::Decode {
                message: format!("Failed to parse JSONL at line {}: {e}", line_num + 1),
            })?;

            records.push(value);
        }

        Ok(records)
    }

    fn decode_raw(&self, body: &str) -> Result<Value> {
        // Return as array
        let records = self.decode(body)?;
        Ok(Value::Array(records))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extract a value using simple dot-notation path
fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let mut current = value;

    for part in path.split('.') {
        // Handle array indexing like "data[0]" or "items[-1]"
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = &part[bracket_pos + 1..part.len() - 1];

            if !name.is_empty() {
                current = current.get(name)?;
            }

            let index: i64 = index_str.parse().ok()?;
            let Value::Array(arr) = current else {
                return None;
            };
            let idx = if index < 0 {
                (arr.len() as i64 + index) as usize
            } else {
                index as usize
            };
            current = arr.get(idx)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Record>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath: {e}"),
    })?;

    let result = jp.find(value);

    match result {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
