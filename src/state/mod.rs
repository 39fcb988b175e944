//! State management module
//!
//! Handles cursor tracking, legacy-state migration, checkpointing, and
//! resumability. State is persisted between sync runs to enable incremental
//! syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `StreamState` - Per-stream state in legacy-flat or partitioned shape
//! - `LegacyStateMigration` - Strictly validated upgrade to the partitioned shape
//! - `StateManager` - File-based state persistence with atomic writes

mod manager;
mod migrate;
mod types;

pub use manager::StateManager;
pub use migrate::LegacyStateMigration;
pub use types::{PartitionCursor, PartitionDescriptor, PartitionedState, State, StreamState};

#[cfg(test)]
mod manager_tests;

#[cfg(test)]
mod migrate_tests;
