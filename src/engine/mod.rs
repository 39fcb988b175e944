//! Execution engine module
//!
//! The sequential read loop: request, retry/backoff, decode, filter, advance
//! the cursor, compute the next page token, repeat. One stream is read by one
//! task; multiple streams may be driven concurrently by an external
//! orchestrator, each with its own state.
//!
//! The loop honors an external [`StopSignal`], checked between pages and
//! between retry attempts, so a cancelled sync releases without completing
//! the current page's remaining retries.

mod types;

pub use types::{ReadOptions, ReadOutcome, ReadStats};

use crate::error::{Error, Result};
use crate::filter::{parse_datetime_value, RecordFilter};
use crate::http::{exponential_backoff, HttpRequester};
use crate::pagination::Paginator;
use crate::partition::{PartitionRouter, StreamSlice};
use crate::state::{StateManager, StreamState};
use crate::types::{JsonValue, Record, StringMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};


// ============================================================================
// Stop signal
// ============================================================================

/// Shared cancellation flag for a running read.
///
/// Cloning yields a handle to the same flag; any holder can stop the read.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Create a new, unset signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the read to stop at the next check point
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether a stop has been requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of one page fetch attempt sequence
enum Fetched {
    /// A successful response
    Response(reqwest::Response),
    /// The stop signal fired between retry attempts
    Stopped,
}

// ============================================================================
// Read driver
// ============================================================================

/// Drives paginated reads described by an [`HttpRequester`]
pub struct ReadDriver {
    client: reqwest::Client,
    stop: StopSignal,
}

impl ReadDriver {
    /// Create a driver with a fresh HTTP client
    pub fn new(stop: StopSignal) -> Self {
        Self {
            client: reqwest::Client::new(),
            stop,
        }
    }

    /// Create a driver with a custom HTTP client
    pub fn with_client(client: reqwest::Client, stop: StopSignal) -> Self {
        Self { client, stop }
    }

    /// The driver's stop signal
    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Read one stream (or one slice of a partitioned stream) to exhaustion.
    ///
    /// Pages are fetched strictly sequentially: each page's token and the
    /// retry backoff depend on the prior page's outcome.
    pub async fn read_stream(
        &self,
        requester: &HttpRequester,
        paginator: &dyn Paginator,
        filter: Option<&dyn RecordFilter>,
        stream_state: &StreamState,
        stream_slice: Option<&StreamSlice>,
        options: &ReadOptions,
    ) -> Result<ReadOutcome> {
        let start = Instant::now();
        let mut stats = ReadStats::default();
        let mut records_out: Vec<Record> = Vec::new();
        let mut page_token: Option<JsonValue> = None;

        loop {
            if self.stop.is_stopped() {
                stats.stopped = true;
                break;
            }

            let ctx = requester.context(stream_state, stream_slice, page_token.as_ref());
            let url = requester.url(&ctx)?;
            let mut params = requester.query_params(&ctx)?;
            params.extend(paginator.request_params(page_token.as_ref()));
            let headers = requester.headers(&ctx)?;
            let body = requester.body_json(&ctx)?;

            let response = match self
                .fetch_page(requester, &url, &params, &headers, body.as_ref())
                .await?
            {
                Fetched::Response(response) => response,
                Fetched::Stopped => {
                    stats.stopped = true;
                    break;
                }
            };

            let response_headers = response.headers().clone();
            let body_text = response.text().await.map_err(Error::Http)?;

            let raw = requester.decode_raw(&body_text)?;
            let records = requester.decode(&body_text)?;
            let fetched_count = records.len();
            stats.pages_fetched += 1;
            stats.records_fetched += fetched_count;

            debug!(
                stream = requester.name(),
                page = stats.pages_fetched,
                records = fetched_count,
                "fetched page"
            );

            let kept = match filter {
                Some(filter) => {
                    filter.filter_records(&records, stream_state, stream_slice, page_token.as_ref())?
                }
                None => records,
            };
            stats.records_emitted += kept.len();
            records_out.extend(kept);

            if options.max_records > 0 && records_out.len() >= options.max_records {
                records_out.truncate(options.max_records);
                stats.records_emitted = records_out.len();
                break;
            }
            if options.max_pages > 0 && stats.pages_fetched >= options.max_pages {
                break;
            }

            match paginator.next_page_token(
                &raw,
                &response_headers,
                fetched_count,
                page_token.as_ref(),
            ) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let latest_cursor = options
            .cursor_field
            .as_deref()
            .and_then(|field| max_cursor(&records_out, field));

        stats.duration_ms = start.elapsed().as_millis() as u64;

        Ok(ReadOutcome {
            records: records_out,
            latest_cursor,
            stats,
        })
    }

    /// Read a partitioned stream: one sequential [`read_stream`] per slice,
    /// advancing the per-partition cursor in the state manager after each
    /// slice completes.
    ///
    /// [`read_stream`]: Self::read_stream
    pub async fn read_partitioned(
        &self,
        requester: &HttpRequester,
        paginator: &dyn Paginator,
        filter: Option<&dyn RecordFilter>,
        router: &dyn PartitionRouter,
        state_manager: &StateManager,
        options: &ReadOptions,
    ) -> Result<ReadOutcome> {
        let mut outcome = ReadOutcome::default();

        for slice in router.stream_slices()? {
            if self.stop.is_stopped() {
                outcome.stats.stopped = true;
                break;
            }

            let stream_state = state_manager
                .stream_state(requester.name())
                .await
                .unwrap_or_default();

            let slice_outcome = self
                .read_stream(
                    requester,
                    paginator,
                    filter,
                    &stream_state,
                    Some(&slice),
                    options,
                )
                .await?;

            outcome.stats.merge(&slice_outcome.stats);
            outcome.stats.partitions += 1;

            if let (Some(field), Some(cursor)) =
                (options.cursor_field.as_deref(), slice_outcome.latest_cursor)
            {
                state_manager
                    .advance_partition_cursor(
                        requester.name(),
                        &slice.partition_id,
                        field,
                        cursor,
                    )
                    .await?;
            }

            outcome.records.extend(slice_outcome.records);
        }

        state_manager.checkpoint().await?;
        Ok(outcome)
    }

    /// Fetch one page under the requester's retry policy.
    ///
    /// The calling task sleeps for the backoff duration between attempts;
    /// there is no parallel retry fan-out.
    async fn fetch_page(
        &self,
        requester: &HttpRequester,
        url: &str,
        params: &StringMap,
        headers: &StringMap,
        body: Option<&JsonValue>,
    ) -> Result<Fetched> {
        let budget = requester.max_retries();
        let within_budget = |attempt: u32| budget.map_or(true, |max| attempt < max);
        let mut attempt: u32 = 0;

        loop {
            let mut req = self.client.request(requester.method().into(), url);
            if !params.is_empty() {
                req = req.query(params);
            }
            for (name, value) in headers {
                req = req.header(name.as_str(), value.as_str());
            }
            if let Some(body) = body {
                req = req.json(body);
            }
            req = requester.authenticator().apply(req);

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if !requester.should_retry(&response) {
                        if status.is_client_error() || status.is_server_error() {
                            let body = response.text().await.unwrap_or_default();
                            return Err(Error::http_status(status.as_u16(), body));
                        }
                        return Ok(Fetched::Response(response));
                    }

                    if !within_budget(attempt) {
                        return Err(Error::MaxRetriesExceeded {
                            max_retries: budget.unwrap_or(0),
                        });
                    }

                    let delay = requester
                        .backoff_time(&response)
                        .unwrap_or_else(|| exponential_backoff(requester.retry_factor(), attempt));
                    warn!(
                        stream = requester.name(),
                        status = status.as_u16(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retryable response, backing off"
                    );

                    attempt += 1;
                    if self.stop.is_stopped() {
                        return Ok(Fetched::Stopped);
                    }
                    tokio::time::sleep(delay).await;
                    if self.stop.is_stopped() {
                        return Ok(Fetched::Stopped);
                    }
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && within_budget(attempt) {
                        let delay = exponential_backoff(requester.retry_factor(), attempt);
                        warn!(
                            stream = requester.name(),
                            error = %e,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "transport error, backing off"
                        );
                        attempt += 1;
                        if self.stop.is_stopped() {
                            return Ok(Fetched::Stopped);
                        }
                        tokio::time::sleep(delay).await;
                        if self.stop.is_stopped() {
                            return Ok(Fetched::Stopped);
                        }
                        continue;
                    }
                    return Err(Error::Http(e));
                }
            }
        }
    }
}

/// The largest cursor value among a batch of records, compared as timestamps
/// when both sides parse, lexicographically otherwise
fn max_cursor(records: &[Record], cursor_field: &str) -> Option<JsonValue> {
    let mut best: Option<&JsonValue> = None;

    for record in records {
        let Some(value) = record.get(cursor_field) else {
            continue;
        };
        best = match best {
            None => Some(value),
            Some(current) => {
                let newer = match (parse_datetime_value(value), parse_datetime_value(current)) {
                    (Some(a), Some(b)) => a > b,
                    _ => cursor_sort_key(value) > cursor_sort_key(current),
                };
                if newer {
                    Some(value)
                } else {
                    Some(current)
                }
            }
        };
    }

    best.cloned()
}

fn cursor_sort_key(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
