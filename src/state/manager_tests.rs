//! Tests for StateManager

use super::*;
use crate::partition::{ParentStreamConfig, SubstreamRouter};
use serde_json::json;
use tempfile::tempdir;

fn migration() -> LegacyStateMigration {
    let router = SubstreamRouter::single(ParentStreamConfig::new("parents", "id", "parent_id"));
    LegacyStateMigration::new(router, "last_changed")
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_state_manager_new() {
    let manager = StateManager::new("/tmp/test-state.json");
    assert!(!manager.is_in_memory());
    assert_eq!(manager.path().to_str().unwrap(), "/tmp/test-state.json");
}

#[test]
fn test_state_manager_in_memory() {
    let manager = StateManager::in_memory();
    assert!(manager.is_in_memory());
}

#[test]
fn test_state_manager_from_json() {
    let manager = StateManager::from_json(
        r#"{"streams": {"orders": {"updated_at": "2024-01-01"}}}"#,
    )
    .unwrap();
    let state = tokio_test::block_on(manager.stream_state("orders")).unwrap();
    assert_eq!(state.flat_cursor("updated_at"), Some(&json!("2024-01-01")));
}

#[test]
fn test_state_manager_from_invalid_json() {
    assert!(StateManager::from_json("not json").is_err());
}

// ============================================================================
// Cursor Tests
// ============================================================================

#[tokio::test]
async fn test_advance_cursor() {
    let manager = StateManager::in_memory();

    assert!(manager.stream_state("users").await.is_none());

    manager
        .advance_cursor("users", "updated_at", json!("2024-01-01"))
        .await
        .unwrap();

    let state = manager.stream_state("users").await.unwrap();
    assert_eq!(state.flat_cursor("updated_at"), Some(&json!("2024-01-01")));
}

#[tokio::test]
async fn test_advance_partition_cursor() {
    let manager = StateManager::in_memory();

    manager
        .advance_partition_cursor("issues", "repo-1", "updated_at", json!("2024-01-01"))
        .await
        .unwrap();
    manager
        .advance_partition_cursor("issues", "repo-2", "updated_at", json!("2024-02-01"))
        .await
        .unwrap();

    let state = manager.stream_state("issues").await.unwrap();
    assert!(state.is_partitioned());
    assert_eq!(
        state.partition_cursor("repo-2", "updated_at").unwrap(),
        Some(&json!("2024-02-01"))
    );
}

#[tokio::test]
async fn test_clear_stream() {
    let manager = StateManager::in_memory();

    manager
        .advance_cursor("users", "updated_at", json!("2024-01-01"))
        .await
        .unwrap();
    manager.clear_stream("users").await.unwrap();

    assert!(manager.stream_state("users").await.is_none());
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::new(&path);
    manager
        .advance_partition_cursor("issues", "42", "updated_at", json!("2024-03-01"))
        .await
        .unwrap();

    // auto_save wrote the file; a fresh manager sees the same state
    let restored = StateManager::from_file(&path).unwrap();
    let state = restored.stream_state("issues").await.unwrap();
    assert_eq!(
        state.partition_cursor("42", "updated_at").unwrap(),
        Some(&json!("2024-03-01"))
    );
}

#[tokio::test]
async fn test_from_file_missing_is_empty() {
    let dir = tempdir().unwrap();
    let manager = StateManager::from_file(dir.path().join("absent.json")).unwrap();
    assert!(manager.stream_state("anything").await.is_none());
}

// ============================================================================
// Migration-at-open Tests
// ============================================================================

#[tokio::test]
async fn test_migrate_stream_applies_pending_migration() {
    let manager = StateManager::from_json(
        r#"{"streams": {"issues": {
            "13506132": {"last_changed": "2022-12-27T08:34:39+00:00"},
            "14351124": {"last_changed": "2022-12-27T08:35:39+00:00"}
        }}}"#,
    )
    .unwrap();

    let migrated = manager.migrate_stream("issues", &migration()).await.unwrap();
    assert!(migrated);

    let state = manager.stream_state("issues").await.unwrap();
    assert!(state.is_partitioned());
    assert_eq!(
        state.partition_cursor("13506132", "last_changed").unwrap(),
        Some(&json!("2022-12-27T08:34:39+00:00"))
    );
}

#[tokio::test]
async fn test_migrate_stream_noop_on_partitioned_state() {
    let manager = StateManager::from_json(
        r#"{"streams": {"issues": {"states": [
            {"partition": {"id": "1"}, "cursor": {"last_changed": "2022-12-27T08:34:39+00:00"}}
        ]}}}"#,
    )
    .unwrap();

    assert!(!manager.migrate_stream("issues", &migration()).await.unwrap());
}

#[tokio::test]
async fn test_migrate_stream_noop_on_absent_state() {
    let manager = StateManager::in_memory();
    assert!(!manager.migrate_stream("issues", &migration()).await.unwrap());
}

#[tokio::test]
async fn test_migrate_stream_surfaces_invalid_state() {
    let manager = StateManager::from_json(
        r#"{"streams": {"issues": {
            "13506132": {"wrong_field": "2022-12-27T08:34:39+00:00"}
        }}}"#,
    )
    .unwrap();

    assert!(manager.migrate_stream("issues", &migration()).await.is_err());
}
