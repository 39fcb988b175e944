//! Partition routing module
//!
//! Supports: Parent (substream) routing, static lists
//!
//! # Overview
//!
//! Partitions split a stream into independent sub-queries, each identified by
//! a stable string id. This is useful for:
//! - Child resources that require a parent ID
//! - Static lists of values (e.g., regions, accounts)
//!
//! The substream router also carries the parent-stream configuration that the
//! legacy-state migration validates against.

mod routers;
mod types;

pub use routers::{ListRouter, SubstreamRouter};
pub use types::{ParentStreamConfig, PartitionRouter, StreamSlice};
