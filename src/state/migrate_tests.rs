//! Tests for legacy-state migration

use super::migrate::LegacyStateMigration;
use super::types::StreamState;
use crate::partition::{ParentStreamConfig, SubstreamRouter};
use pretty_assertions::assert_eq;
use serde_json::json;

fn migration() -> LegacyStateMigration {
    let router = SubstreamRouter::single(ParentStreamConfig::new("parents", "id", "parent_id"));
    LegacyStateMigration::new(router, "last_changed")
}

fn migration_with_multiple_parent_streams() -> LegacyStateMigration {
    let router = SubstreamRouter::new(vec![
        ParentStreamConfig::new("parents", "id", "parent_id"),
        ParentStreamConfig::new("others", "id", "other_id"),
    ]);
    LegacyStateMigration::new(router, "last_changed")
}

fn state(value: serde_json::Value) -> StreamState {
    StreamState::from_value(value).unwrap()
}

#[test]
fn test_migrate_a_valid_legacy_state_to_per_partition() {
    let input = state(json!({
        "13506132": {"last_changed": "2022-12-27T08:34:39+00:00"},
        "14351124": {"last_changed": "2022-12-27T08:35:39+00:00"},
    }));

    let migration = migration();
    assert!(migration.should_migrate(&input).unwrap());

    let expected = state(json!({
        "states": [
            {
                "partition": {"id": "13506132"},
                "cursor": {"last_changed": "2022-12-27T08:34:39+00:00"}
            },
            {
                "partition": {"id": "14351124"},
                "cursor": {"last_changed": "2022-12-27T08:35:39+00:00"}
            },
        ]
    }));

    assert_eq!(migration.migrate(&input).unwrap(), expected);
}

#[test]
fn test_migrate_preserves_input_order() {
    // Keys deliberately not in sorted order
    let input = state(json!({
        "zeta": {"last_changed": "2022-01-03T00:00:00+00:00"},
        "alpha": {"last_changed": "2022-01-01T00:00:00+00:00"},
        "mid": {"last_changed": "2022-01-02T00:00:00+00:00"},
    }));

    let migrated = migration().migrate(&input).unwrap();
    let ids: Vec<&str> = migrated.as_object()["states"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["partition"]["id"].as_str().unwrap())
        .collect();

    assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_should_not_migrate_a_per_partition_state() {
    let input = state(json!({
        "states": [
            {
                "partition": {"id": "13506132"},
                "cursor": {"last_changed": "2022-12-27T08:34:39+00:00"}
            },
            {
                "partition": {"id": "14351124"},
                "cursor": {"last_changed": "2022-12-27T08:35:39+00:00"}
            },
        ]
    }));

    assert!(!migration().should_migrate(&input).unwrap());
}

#[test]
fn test_should_not_migrate_an_empty_state() {
    assert!(!migration().should_migrate(&StreamState::new()).unwrap());
}

#[test]
fn test_should_not_migrate_state_without_a_cursor_component() {
    let input = state(json!({
        "states": [
            {
                "partition": {"id": "13506132"},
                "cursor": {"last_changed": "2022-12-27T08:34:39+00:00"}
            },
            {
                "partition": {"id": "14351124"},
            },
        ]
    }));

    assert!(migration().should_migrate(&input).is_err());
}

#[test]
fn test_should_not_migrate_a_per_partition_state_with_wrong_cursor_field() {
    let input = state(json!({
        "states": [
            {
                "partition": {"id": "13506132"},
                "cursor": {"updated_at": "2022-12-27T08:34:39+00:00"}
            },
        ]
    }));

    assert!(migration().should_migrate(&input).is_err());
}

#[test]
fn test_should_not_migrate_a_per_partition_state_with_multiple_cursor_fields() {
    let input = state(json!({
        "states": [
            {
                "partition": {"id": "14351124"},
                "cursor": {
                    "last_changed": "2022-12-27T08:35:39+00:00",
                    "updated_at": "2021-01-01"
                }
            },
        ]
    }));

    assert!(migration().should_migrate(&input).is_err());
}

#[test]
fn test_should_not_migrate_state_without_a_partition_component() {
    let input = state(json!({
        "states": [
            {
                "cursor": {"last_changed": "2022-12-27T08:34:39+00:00"}
            },
        ]
    }));

    assert!(migration().should_migrate(&input).is_err());
}

#[test]
fn test_should_not_migrate_state_with_multiple_partition_keys() {
    let input = state(json!({
        "states": [
            {
                "partition": {"id": "13506132", "another_id": "A"},
                "cursor": {"last_changed": "2022-12-27T08:34:39+00:00"}
            },
        ]
    }));

    assert!(migration().should_migrate(&input).is_err());
}

#[test]
fn test_should_not_migrate_state_with_invalid_partition_key() {
    let input = state(json!({
        "states": [
            {
                "partition": {"identifier": "13506132"},
                "cursor": {"last_changed": "2022-12-27T08:34:39+00:00"}
            },
        ]
    }));

    assert!(migration().should_migrate(&input).is_err());
}

#[test]
fn test_should_not_migrate_if_a_legacy_entry_has_more_than_one_key() {
    let input = state(json!({
        "13506132": {"last_changed": "2022-12-27T08:34:39+00:00"},
        "14351124": {
            "last_changed": "2022-12-27T08:35:39+00:00",
            "another_key": "2022-12-27T08:35:39+00:00"
        },
    }));

    assert!(migration().should_migrate(&input).is_err());
}

#[test]
fn test_should_not_migrate_if_a_legacy_entry_key_is_not_the_cursor_field() {
    let input = state(json!({
        "13506132": {"last_changed": "2022-12-27T08:34:39+00:00"},
        "14351124": {"another_key": "2022-12-27T08:35:39+00:00"},
    }));

    assert!(migration().should_migrate(&input).is_err());
}

#[test]
fn test_should_not_migrate_if_a_legacy_entry_is_not_a_mapping() {
    let input = state(json!({
        "13506132": "2022-12-27T08:34:39+00:00",
    }));

    assert!(migration().should_migrate(&input).is_err());
}

#[test]
fn test_should_not_migrate_stream_with_multiple_parent_streams() {
    let input = state(json!({
        "13506132": {"last_changed": "2022-12-27T08:34:39+00:00"},
        "14351124": {"last_changed": "2022-12-27T08:35:39+00:00"},
    }));

    assert!(migration_with_multiple_parent_streams()
        .should_migrate(&input)
        .is_err());
}

#[test]
fn test_migrate_does_not_mutate_input() {
    let input = state(json!({
        "13506132": {"last_changed": "2022-12-27T08:34:39+00:00"},
    }));
    let snapshot = input.clone();

    let _ = migration().migrate(&input).unwrap();
    assert_eq!(input, snapshot);
}
