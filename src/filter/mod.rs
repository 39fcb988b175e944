//! Record filtering
//!
//! Filters are applied to each decoded page of records before they are
//! yielded. Two filters are provided:
//!
//! - [`ConditionFilter`]: keeps records for which a user-configured boolean
//!   expression evaluates truthy
//! - [`IncrementalCursorFilter`]: drops records at or below the stream's
//!   watermark (the later of the configured start date and the persisted
//!   cursor value), then delegates to an optional wrapped filter
//!
//! Filters never mutate their input and always preserve record order.

use crate::error::{Error, Result};
use crate::partition::StreamSlice;
use crate::state::StreamState;
use crate::template::{EvalContext, Evaluator};
use crate::types::{JsonValue, Record};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;


/// Trait for record filters
pub trait RecordFilter: Send + Sync {
    /// Filter a batch of records against the current sync context.
    ///
    /// The input is borrowed immutably; survivors are returned as a new
    /// sequence preserving the original relative order.
    fn filter_records(
        &self,
        records: &[Record],
        stream_state: &StreamState,
        stream_slice: Option<&StreamSlice>,
        next_page_token: Option<&JsonValue>,
    ) -> Result<Vec<Record>>;
}

// ============================================================================
// Condition Filter
// ============================================================================

/// Keeps records for which the configured boolean expression is truthy.
///
/// The expression is evaluated per record with the full sync context
/// (config, record, slice, state, page token) as variables. A malformed
/// expression is a configuration error raised at construction, never a
/// per-record failure.
pub struct ConditionFilter {
    /// The boolean expression, e.g. `{{ record.status }} == 'active'`
    condition: String,
    /// Connector configuration passed to every evaluation
    config: JsonValue,
    /// Injected expression evaluator
    evaluator: Arc<dyn Evaluator>,
}

impl ConditionFilter {
    /// Create a new condition filter. Fails on a malformed expression.
    pub fn new(
        condition: impl Into<String>,
        config: JsonValue,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Self> {
        let condition = condition.into();
        evaluator.validate(&condition)?;
        Ok(Self {
            condition,
            config,
            evaluator,
        })
    }
}

impl RecordFilter for ConditionFilter {
    fn filter_records(
        &self,
        records: &[Record],
        stream_state: &StreamState,
        stream_slice: Option<&StreamSlice>,
        next_page_token: Option<&JsonValue>,
    ) -> Result<Vec<Record>> {
        // An empty condition keeps everything
        if self.condition.is_empty() {
            return Ok(records.to_vec());
        }

        let base_ctx = EvalContext::with_config(self.config.clone())
            .state(stream_state.to_value())
            .partition(stream_slice.map(StreamSlice::to_value).unwrap_or_default())
            .page_token(next_page_token.cloned().unwrap_or_default());

        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            let ctx = base_ctx.clone().record(record.clone());
            if self.evaluator.eval_bool(&self.condition, &ctx)? {
                kept.push(record.clone());
            }
        }
        Ok(kept)
    }
}

impl std::fmt::Debug for ConditionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionFilter")
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Incremental Cursor Filter
// ============================================================================

/// Drops records whose cursor value does not exceed the stream's watermark.
///
/// The watermark source is resolved from the stream state: the partition
/// entry matching the current slice for a partitioned state, or the cursor
/// field read directly off a flat state. The effective filter date is the
/// later of the parsed configured start date and the parsed watermark; when
/// neither exists every record passes (first sync has no lower bound).
///
/// Composes with an optional wrapped filter with AND semantics.
pub struct IncrementalCursorFilter {
    /// The record attribute carrying the cursor timestamp
    cursor_field: String,
    /// Configured start date, if any
    start_date: Option<String>,
    /// Wrapped filter applied to the surviving records
    delegate: Option<Box<dyn RecordFilter>>,
}

impl IncrementalCursorFilter {
    /// Create a new incremental cursor filter
    pub fn new(cursor_field: impl Into<String>, start_date: Option<String>) -> Self {
        Self {
            cursor_field: cursor_field.into(),
            start_date,
            delegate: None,
        }
    }

    /// Wrap a base filter; records must satisfy both
    #[must_use]
    pub fn with_delegate(mut self, delegate: Box<dyn RecordFilter>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Resolve the persisted watermark value for this slice, if any
    fn watermark<'a>(
        &self,
        stream_state: &'a StreamState,
        stream_slice: Option<&StreamSlice>,
    ) -> Result<Option<&'a JsonValue>> {
        if stream_state.is_partitioned() {
            let slice = stream_slice.ok_or_else(|| {
                Error::config("partitioned stream state requires a stream slice to filter against")
            })?;
            stream_state.partition_cursor(&slice.partition_id, &self.cursor_field)
        } else {
            Ok(stream_state.flat_cursor(&self.cursor_field))
        }
    }

    /// The effective lower bound: the later of start date and watermark
    fn filter_date(&self, watermark: Option<&JsonValue>) -> Result<Option<DateTime<Utc>>> {
        let start = self
            .start_date
            .as_deref()
            .map(|s| {
                parse_datetime_str(s)
                    .ok_or_else(|| Error::config(format!("invalid start date: {s}")))
            })
            .transpose()?;

        let state = watermark
            .map(|value| {
                parse_datetime_value(value).ok_or_else(|| {
                    Error::state(format!(
                        "persisted cursor value for '{}' is not a timestamp: {value}",
                        self.cursor_field
                    ))
                })
            })
            .transpose()?;

        Ok(match (start, state) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        })
    }

    /// Parse a record's cursor value, failing descriptively on bad shape
    fn record_cursor(&self, record: &Record) -> Result<DateTime<Utc>> {
        let value = record.get(&self.cursor_field).ok_or_else(|| {
            Error::data_shape(
                &self.cursor_field,
                "record has no value for the configured cursor field",
            )
        })?;

        parse_datetime_value(value).ok_or_else(|| {
            Error::data_shape(
                &self.cursor_field,
                format!("cursor value is not a timestamp: {value}"),
            )
        })
    }
}

impl RecordFilter for IncrementalCursorFilter {
    fn filter_records(
        &self,
        records: &[Record],
        stream_state: &StreamState,
        stream_slice: Option<&StreamSlice>,
        next_page_token: Option<&JsonValue>,
    ) -> Result<Vec<Record>> {
        let watermark = self.watermark(stream_state, stream_slice)?;
        let filter_date = self.filter_date(watermark)?;

        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            let keep = match filter_date {
                // Timestamp comparison, strictly greater than the watermark
                Some(bound) => self.record_cursor(record)? > bound,
                // No lower bound on the first sync
                None => true,
            };
            if keep {
                kept.push(record.clone());
            }
        }

        match &self.delegate {
            Some(delegate) => {
                delegate.filter_records(&kept, stream_state, stream_slice, next_page_token)
            }
            None => Ok(kept),
        }
    }
}

impl std::fmt::Debug for IncrementalCursorFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalCursorFilter")
            .field("cursor_field", &self.cursor_field)
            .field("start_date", &self.start_date)
            .field("has_delegate", &self.delegate.is_some())
            .finish()
    }
}

// ============================================================================
// Datetime parsing
// ============================================================================

/// Parse a JSON cursor value into a UTC datetime.
///
/// Strings go through the lenient format list; numbers are taken as unix
/// seconds.
pub fn parse_datetime_value(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_datetime_str(s),
        Value::Number(n) => {
            let secs = n.as_i64()?;
            DateTime::from_timestamp(secs, 0)
        }
        _ => None,
    }
}

/// Parse a datetime string into a UTC DateTime
pub fn parse_datetime_str(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC 3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Try common formats
    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
        "%Y/%m/%d",
    ];

    for fmt in formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            let ndt = nd.and_hms_opt(0, 0, 0)?;
            return Some(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
    }

    None
}
