//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{PaginationConfig, Paginator};
use crate::types::{JsonValue, StringMap};
use reqwest::header::HeaderMap;
use serde_json::{json, Value};

/// Build a paginator from a config
pub fn build_paginator(config: &PaginationConfig) -> Box<dyn Paginator> {
    match config {
        PaginationConfig::None => Box::new(NoPagination),
        PaginationConfig::Cursor {
            cursor_param,
            cursor_path,
        } => Box::new(CursorPaginator::new(cursor_param.clone(), cursor_path.clone())),
        PaginationConfig::PageNumber {
            page_param,
            start_page,
            page_size,
        } => {
            let mut paginator = PageNumberPaginator::new(page_param.clone(), *start_page);
            if let Some((param, size)) = page_size {
                paginator = paginator.with_page_size(param.clone(), *size);
            }
            Box::new(paginator)
        }
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// Single-page streams: no parameters, never a next page
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPagination;

impl Paginator for NoPagination {
    fn request_params(&self, _page_token: Option<&JsonValue>) -> StringMap {
        StringMap::new()
    }

    fn next_page_token(
        &self,
        _body: &JsonValue,
        _headers: &HeaderMap,
        _records_count: usize,
        _current: Option<&JsonValue>,
    ) -> Option<JsonValue> {
        None
    }
}

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor-based pagination (e.g., Stripe, Slack)
///
/// Extracts a cursor value from each response and passes it back as a query
/// parameter. Pagination ends on an empty page or a missing/empty cursor.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Query parameter name for the cursor
    cursor_param: String,
    /// Dot-notation path to the cursor in the response body
    cursor_path: String,
}

impl CursorPaginator {
    /// Create a new cursor paginator
    pub fn new(cursor_param: impl Into<String>, cursor_path: impl Into<String>) -> Self {
        Self {
            cursor_param: cursor_param.into(),
            cursor_path: cursor_path.into(),
        }
    }
}

impl Paginator for CursorPaginator {
    fn request_params(&self, page_token: Option<&JsonValue>) -> StringMap {
        let mut params = StringMap::new();
        if let Some(cursor) = page_token.and_then(|t| t.get("cursor")).and_then(value_as_string) {
            params.insert(self.cursor_param.clone(), cursor);
        }
        params
    }

    fn next_page_token(
        &self,
        body: &JsonValue,
        _headers: &HeaderMap,
        records_count: usize,
        _current: Option<&JsonValue>,
    ) -> Option<JsonValue> {
        if records_count == 0 {
            return None;
        }

        let cursor = extract_path(body, &self.cursor_path).and_then(|v| value_as_string(&v))?;
        if cursor.is_empty() {
            return None;
        }
        Some(json!({ "cursor": cursor }))
    }
}

// ============================================================================
// Page Number Pagination
// ============================================================================

/// Page number pagination (e.g., traditional web pagination)
#[derive(Debug, Clone)]
pub struct PageNumberPaginator {
    /// Query parameter name for the page number
    page_param: String,
    /// First page number (usually 0 or 1)
    start_page: u64,
    /// Optional page size parameter name and value
    page_size: Option<(String, u64)>,
}

impl PageNumberPaginator {
    /// Create a new page number paginator
    pub fn new(page_param: impl Into<String>, start_page: u64) -> Self {
        Self {
            page_param: page_param.into(),
            start_page,
            page_size: None,
        }
    }

    /// Set the page size parameter
    #[must_use]
    pub fn with_page_size(mut self, param: impl Into<String>, size: u64) -> Self {
        self.page_size = Some((param.into(), size));
        self
    }
}

impl Paginator for PageNumberPaginator {
    fn request_params(&self, page_token: Option<&JsonValue>) -> StringMap {
        let page = page_token
            .and_then(|t| t.get("page"))
            .and_then(Value::as_u64)
            .unwrap_or(self.start_page);

        let mut params = StringMap::new();
        params.insert(self.page_param.clone(), page.to_string());
        if let Some((param, size)) = &self.page_size {
            params.insert(param.clone(), size.to_string());
        }
        params
    }

    fn next_page_token(
        &self,
        _body: &JsonValue,
        _headers: &HeaderMap,
        records_count: usize,
        current: Option<&JsonValue>,
    ) -> Option<JsonValue> {
        if records_count == 0 {
            return None;
        }

        // A short page means the source ran out of records
        if let Some((_, size)) = &self.page_size {
            if (records_count as u64) < *size {
                return None;
            }
        }

        let current_page = current
            .and_then(|t| t.get("page"))
            .and_then(Value::as_u64)
            .unwrap_or(self.start_page);
        Some(json!({ "page": current_page + 1 }))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extract a value using simple dot-notation path
fn extract_path(value: &JsonValue, path: &str) -> Option<JsonValue> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let mut current = value;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current.clone())
}

/// Render a scalar token value as a string
fn value_as_string(value: &JsonValue) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
