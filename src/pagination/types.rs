//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use crate::types::{JsonValue, StringMap};
use reqwest::header::HeaderMap;

/// Trait for pagination strategies.
///
/// Tokens are opaque JSON values owned by the strategy that produced them;
/// the driver threads the current token through both the requester's
/// evaluation context (as `page_token`) and [`Paginator::request_params`].
pub trait Paginator: Send + Sync {
    /// Query parameters fetching the page identified by `page_token`
    /// (`None` is the first page)
    fn request_params(&self, page_token: Option<&JsonValue>) -> StringMap;

    /// Compute the next page token from this page's decoded body, response
    /// headers, and record count. `None` ends pagination.
    fn next_page_token(
        &self,
        body: &JsonValue,
        headers: &HeaderMap,
        records_count: usize,
        current: Option<&JsonValue>,
    ) -> Option<JsonValue>;
}

/// Configuration for pagination behavior
#[derive(Debug, Clone, Default)]
pub enum PaginationConfig {
    /// Single-page streams
    #[default]
    None,

    /// Cursor-based pagination (e.g., Stripe, Slack)
    Cursor {
        /// Query parameter name for the cursor (e.g., "starting_after")
        cursor_param: String,
        /// Dot-notation path to the cursor in the response body
        cursor_path: String,
    },

    /// Page number pagination
    PageNumber {
        /// Query parameter name for the page number
        page_param: String,
        /// First page number (usually 0 or 1)
        start_page: u64,
        /// Optional page size parameter name and value
        page_size: Option<(String, u64)>,
    },
}

impl PaginationConfig {
    /// Create cursor pagination config
    pub fn cursor(cursor_param: impl Into<String>, cursor_path: impl Into<String>) -> Self {
        Self::Cursor {
            cursor_param: cursor_param.into(),
            cursor_path: cursor_path.into(),
        }
    }

    /// Create page number pagination config
    pub fn page_number(page_param: impl Into<String>, start_page: u64) -> Self {
        Self::PageNumber {
            page_param: page_param.into(),
            start_page,
            page_size: None,
        }
    }
}
