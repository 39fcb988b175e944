//! Tests for pagination module

use super::*;
use reqwest::header::HeaderMap;
use serde_json::json;

fn headers() -> HeaderMap {
    HeaderMap::new()
}

// ============================================================================
// NoPagination
// ============================================================================

#[test]
fn test_no_pagination() {
    let paginator = NoPagination;
    assert!(paginator.request_params(None).is_empty());
    assert!(paginator
        .next_page_token(&json!({}), &headers(), 10, None)
        .is_none());
}

// ============================================================================
// CursorPaginator
// ============================================================================

#[test]
fn test_cursor_paginator_first_page_has_no_params() {
    let paginator = CursorPaginator::new("starting_after", "next_cursor");
    assert!(paginator.request_params(None).is_empty());
}

#[test]
fn test_cursor_paginator_extracts_token() {
    let paginator = CursorPaginator::new("starting_after", "next_cursor");
    let body = json!({"data": [], "next_cursor": "obj_123"});

    let token = paginator.next_page_token(&body, &headers(), 5, None).unwrap();
    assert_eq!(token, json!({"cursor": "obj_123"}));

    let params = paginator.request_params(Some(&token));
    assert_eq!(params.get("starting_after"), Some(&"obj_123".to_string()));
}

#[test]
fn test_cursor_paginator_nested_path() {
    let paginator = CursorPaginator::new("after", "meta.pagination.next");
    let body = json!({"meta": {"pagination": {"next": "c2"}}});

    let token = paginator.next_page_token(&body, &headers(), 5, None).unwrap();
    assert_eq!(token, json!({"cursor": "c2"}));
}

#[test]
fn test_cursor_paginator_numeric_cursor() {
    let paginator = CursorPaginator::new("after", "next_id");
    let body = json!({"next_id": 42});

    let token = paginator.next_page_token(&body, &headers(), 5, None).unwrap();
    let params = paginator.request_params(Some(&token));
    assert_eq!(params.get("after"), Some(&"42".to_string()));
}

#[test]
fn test_cursor_paginator_stops_on_empty_page() {
    let paginator = CursorPaginator::new("after", "next_cursor");
    let body = json!({"next_cursor": "more"});

    assert!(paginator.next_page_token(&body, &headers(), 0, None).is_none());
}

#[test]
fn test_cursor_paginator_stops_on_missing_or_empty_cursor() {
    let paginator = CursorPaginator::new("after", "next_cursor");

    assert!(paginator
        .next_page_token(&json!({"data": [1]}), &headers(), 1, None)
        .is_none());
    assert!(paginator
        .next_page_token(&json!({"next_cursor": ""}), &headers(), 1, None)
        .is_none());
    assert!(paginator
        .next_page_token(&json!({"next_cursor": null}), &headers(), 1, None)
        .is_none());
}

// ============================================================================
// PageNumberPaginator
// ============================================================================

#[test]
fn test_page_number_paginator_first_page() {
    let paginator = PageNumberPaginator::new("page", 1).with_page_size("per_page", 50);

    let params = paginator.request_params(None);
    assert_eq!(params.get("page"), Some(&"1".to_string()));
    assert_eq!(params.get("per_page"), Some(&"50".to_string()));
}

#[test]
fn test_page_number_paginator_advances() {
    let paginator = PageNumberPaginator::new("page", 1).with_page_size("per_page", 2);

    let token = paginator
        .next_page_token(&json!({}), &headers(), 2, None)
        .unwrap();
    assert_eq!(token, json!({"page": 2}));

    let token = paginator
        .next_page_token(&json!({}), &headers(), 2, Some(&token))
        .unwrap();
    assert_eq!(token, json!({"page": 3}));

    let params = paginator.request_params(Some(&token));
    assert_eq!(params.get("page"), Some(&"3".to_string()));
}

#[test]
fn test_page_number_paginator_stops_on_short_page() {
    let paginator = PageNumberPaginator::new("page", 1).with_page_size("per_page", 50);

    assert!(paginator
        .next_page_token(&json!({}), &headers(), 49, None)
        .is_none());
    assert!(paginator
        .next_page_token(&json!({}), &headers(), 0, None)
        .is_none());
}

#[test]
fn test_page_number_paginator_without_page_size_stops_on_empty_only() {
    let paginator = PageNumberPaginator::new("page", 0);

    assert!(paginator
        .next_page_token(&json!({}), &headers(), 3, None)
        .is_some());
    assert!(paginator
        .next_page_token(&json!({}), &headers(), 0, None)
        .is_none());
}

// ============================================================================
// build_paginator
// ============================================================================

#[test]
fn test_build_paginator_from_config() {
    let paginator = build_paginator(&PaginationConfig::cursor("after", "next"));
    let token = paginator
        .next_page_token(&json!({"next": "x"}), &headers(), 1, None)
        .unwrap();
    assert_eq!(token, json!({"cursor": "x"}));

    let paginator = build_paginator(&PaginationConfig::page_number("page", 1));
    assert_eq!(
        paginator.request_params(None).get("page"),
        Some(&"1".to_string())
    );

    let paginator = build_paginator(&PaginationConfig::None);
    assert!(paginator
        .next_page_token(&json!({}), &headers(), 1, None)
        .is_none());
}
