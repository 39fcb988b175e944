// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Tidemark
//!
//! A Rust-native toolkit for incremental API data extraction.
//!
//! Tidemark is the extraction core of a data-connector framework: it tracks
//! per-partition sync progress, migrates legacy flat-cursor state into the
//! structured partitioned form, filters fetched records against that state,
//! and drives paginated HTTP requests under a retry/backoff policy.
//!
//! ## Features
//!
//! - **Incremental Sync**: Watermark-based record filtering so only new data
//!   is emitted, per stream or per partition
//! - **State Migration**: Strictly validated upgrade of legacy flat cursor
//!   state to the partitioned `states` format
//! - **Declarative Requests**: Templated URL/path/params/headers evaluated
//!   against config, partition, state, and page token
//! - **Retry/Backoff**: Pluggable retrier with `Retry-After` support and
//!   exponential backoff
//! - **Pagination**: Cursor and page-number strategies behind one trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tidemark::engine::{ReadDriver, ReadOptions, StopSignal};
//! use tidemark::http::HttpRequester;
//! use tidemark::pagination::CursorPaginator;
//!
//! #[tokio::main]
//! async fn main() -> tidemark::Result<()> {
//!     let requester = HttpRequester::builder("orders")
//!         .url_base("https://api.example.com")
//!         .path("/v1/orders")
//!         .build()?;
//!
//!     let paginator = CursorPaginator::new("cursor", "next_cursor");
//!     let driver = ReadDriver::new(StopSignal::new());
//!     let state = tidemark::state::StreamState::new();
//!     let outcome = driver
//!         .read_stream(&requester, &paginator, None, &state, None, &ReadOptions::default())
//!         .await?;
//!     println!("{} records", outcome.records.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          ReadDriver                             │
//! │   request → retry/backoff → decode → filter → advance cursor    │
//! └──────┬───────────┬───────────┬───────────┬───────────┬──────────┘
//! │ Requester │  Retrier  │  Decode   │  Filter   │   State   │
//! ├───────────┼───────────┼───────────┼───────────┼───────────┤
//! │ url/path  │ should_   │ JSON      │ condition │ migrate   │
//! │ params    │   retry   │ JSONL     │ cursor    │ persist   │
//! │ headers   │ backoff   │ rec. path │ watermark │ partition │
//! └───────────┴───────────┴───────────┴───────────┴───────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: document public enum variants

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the toolkit
pub mod error;

/// Common types and type aliases
pub mod types;

/// Expression evaluation and template interpolation
pub mod template;

/// Record filtering (condition and incremental-cursor)
pub mod filter;

/// Stream state, legacy-state migration, and persistence
pub mod state;

/// Partition slices and routers
pub mod partition;

/// Response decoders (JSON, JSONL)
pub mod decode;

/// Request authentication
pub mod auth;

/// HTTP requester and retry policy
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Sequential read loop
pub mod engine;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
