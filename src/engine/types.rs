//! Engine types
//!
//! Options and statistics for the read loop.

use crate::types::{JsonValue, Record};

/// Configuration for one stream read
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Record attribute to derive the advanced cursor from, if incremental
    pub cursor_field: Option<String>,
    /// Maximum pages to fetch (0 = unlimited)
    pub max_pages: usize,
    /// Maximum records to emit (0 = unlimited)
    pub max_records: usize,
}

impl ReadOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a cursor field for incremental reads
    #[must_use]
    pub fn with_cursor_field(mut self, field: impl Into<String>) -> Self {
        self.cursor_field = Some(field.into());
        self
    }

    /// Cap the number of pages
    #[must_use]
    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = max;
        self
    }

    /// Cap the number of emitted records
    #[must_use]
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }
}

/// Statistics for one read
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadStats {
    /// Pages fetched
    pub pages_fetched: usize,
    /// Records decoded before filtering
    pub records_fetched: usize,
    /// Records surviving the filters
    pub records_emitted: usize,
    /// Partitions processed (partitioned reads only)
    pub partitions: usize,
    /// Whether the read ended on the stop signal
    pub stopped: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl ReadStats {
    /// Fold another read's stats into this one
    pub fn merge(&mut self, other: &ReadStats) {
        self.pages_fetched += other.pages_fetched;
        self.records_fetched += other.records_fetched;
        self.records_emitted += other.records_emitted;
        self.partitions += other.partitions;
        self.stopped |= other.stopped;
        self.duration_ms += other.duration_ms;
    }
}

/// The result of one stream read
#[derive(Debug, Clone, Default)]
pub struct ReadOutcome {
    /// Filtered records, in fetch order
    pub records: Vec<Record>,
    /// The largest cursor value among the emitted records, when a cursor
    /// field was configured
    pub latest_cursor: Option<JsonValue>,
    /// Read statistics
    pub stats: ReadStats,
}
