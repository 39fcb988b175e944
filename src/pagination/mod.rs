//! Pagination module
//!
//! Supports: Cursor, Page Number
//!
//! # Overview
//!
//! A paginator turns one page's response into the token identifying the next
//! page, and turns a token into the query parameters that fetch it. The read
//! driver calls it after each decoded page; a `None` token ends the stream.

mod strategies;
mod types;

pub use strategies::{build_paginator, CursorPaginator, NoPagination, PageNumberPaginator};
pub use types::{PaginationConfig, Paginator};

#[cfg(test)]
mod tests;
