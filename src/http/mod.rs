//! HTTP requester module
//!
//! Provides the request-building and retry-decision surface consumed by the
//! read driver.
//!
//! # Features
//!
//! - **Pure Requester**: URL, path, params, headers, and body evaluated per
//!   context; no I/O
//! - **Pluggable Providers**: interpolated or static parameter/header sources
//! - **Retry Policy**: status classification, `Retry-After`, exponential
//!   backoff budget

mod providers;
mod requester;
mod retry;

pub use providers::{
    InterpolatedProvider, RequestHeaderProvider, RequestParameterProvider, StaticProvider,
};
pub use requester::{HttpRequester, HttpRequesterBuilder};
pub use retry::{exponential_backoff, BackoffPolicy, ExponentialBackoffRetrier, Retrier};
