//! Property-based tests for mapping and change detection.
//!
//! - Mapping an entity out and back in is lossless
//! - Absent optional fields never reach the resource
//! - A failing field rejects the whole conversion
//! - Diffs partition identities exactly and a self-diff is empty

mod common;

use chrono::{DateTime, TimeZone, Utc};
use common::{meeting_mapping, Meeting};
use entity_repo::{diff, Direction, MappingError, Snapshot};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 ]{0,40}").unwrap()
}

fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000, 0u32..1_000_000_000)
        .prop_map(|(secs, nanos)| Utc.timestamp_opt(secs, nanos).unwrap())
}

fn meeting_strategy() -> impl Strategy<Value = Meeting> {
    (
        prop::option::of("[0-9]{1,6}"),
        text_strategy(),
        any::<i64>(),
        -1.0e12f64..1.0e12,
        any::<bool>(),
        instant_strategy(),
        prop::option::of(text_strategy()),
    )
        .prop_map(
            |(id, subject, seats, budget, remote, starts_at, location)| Meeting {
                id,
                subject,
                seats,
                budget,
                remote,
                starts_at,
                location,
            },
        )
}

/// Rows with unique keys, in arbitrary order.
fn rows_strategy() -> impl Strategy<Value = Vec<(u8, String)>> {
    prop::collection::btree_map(any::<u8>(), "[a-c]{0,2}", 0..40)
        .prop_flat_map(|rows| Just(rows.into_iter().collect::<Vec<_>>()).prop_shuffle())
}

fn key(row: &(u8, String)) -> u8 {
    row.0
}

// =============================================================================
// MAPPING PROPERTIES
// =============================================================================

mod mapping_properties {
    use super::*;

    proptest! {
        #[test]
        fn round_trip_is_lossless(meeting in meeting_strategy()) {
            let mapping = meeting_mapping();
            let resource = mapping.to_resource(&meeting).unwrap();
            let back = mapping.from_resource(&resource).unwrap();
            prop_assert_eq!(back, meeting);
        }

        #[test]
        fn absent_optionals_are_omitted(meeting in meeting_strategy()) {
            let resource = meeting_mapping().to_resource(&meeting).unwrap();
            prop_assert_eq!(resource.contains_key("eventId"), meeting.id.is_some());
            prop_assert_eq!(resource.contains_key("where"), meeting.location.is_some());
            prop_assert_eq!(resource.len(), 5 + meeting.id.is_some() as usize + meeting.location.is_some() as usize);
        }

        #[test]
        fn bad_boolean_rejects_whole_resource(
            meeting in meeting_strategy(),
            junk in "[a-zA-Z]{1,8}".prop_filter("canonical booleans", |s| {
                !matches!(s.as_str(), "true" | "TRUE" | "false" | "FALSE")
            }),
        ) {
            let mapping = meeting_mapping();
            let mut resource = mapping.to_resource(&meeting).unwrap();
            resource.insert("online", serde_json::Value::String(junk));

            match mapping.from_resource(&resource) {
                Err(MappingError::CoercionFailure { field, direction, .. }) => {
                    prop_assert_eq!(field, "remote");
                    prop_assert_eq!(direction, Direction::FromResource);
                }
                other => prop_assert!(false, "expected coercion failure, got {:?}", other),
            }
        }
    }
}

// =============================================================================
// CHANGE DETECTION PROPERTIES
// =============================================================================

mod diff_properties {
    use super::*;

    proptest! {
        /// Every identity lands in exactly the set its presence dictates.
        #[test]
        fn diff_partitions_identities(previous in rows_strategy(), current in rows_strategy()) {
            let before = diff(&Snapshot::empty(), previous.clone(), key).snapshot;
            let result = diff(&before, current.clone(), key);

            let old: BTreeMap<u8, &String> = previous.iter().map(|(k, v)| (*k, v)).collect();
            let new: BTreeMap<u8, &String> = current.iter().map(|(k, v)| (*k, v)).collect();

            let added: BTreeSet<u8> = result.changes.added().iter().map(key).collect();
            let deleted: BTreeSet<u8> = result.changes.deleted().iter().map(key).collect();
            let modified: BTreeSet<u8> = result.changes.modified().iter().map(key).collect();

            let expected_added: BTreeSet<u8> =
                new.keys().filter(|k| !old.contains_key(*k)).copied().collect();
            let expected_deleted: BTreeSet<u8> =
                old.keys().filter(|k| !new.contains_key(*k)).copied().collect();
            let expected_modified: BTreeSet<u8> = new
                .iter()
                .filter(|(k, v)| matches!(old.get(*k), Some(prev) if prev != *v))
                .map(|(k, _)| *k)
                .collect();

            prop_assert_eq!(added, expected_added);
            prop_assert_eq!(deleted, expected_deleted);
            prop_assert_eq!(modified, expected_modified);

            // Additions follow current order.
            let order: Vec<u8> = current.iter().map(key).collect();
            let added_order: Vec<u8> = result.changes.added().iter().map(key).collect();
            let expected_order: Vec<u8> = order
                .iter()
                .copied()
                .filter(|k| !old.contains_key(k))
                .collect();
            prop_assert_eq!(added_order, expected_order);

            let snapshot: Vec<(u8, String)> = result.snapshot.values().cloned().collect();
            prop_assert_eq!(snapshot, current);
        }

        #[test]
        fn self_diff_is_empty(rows in rows_strategy()) {
            let first = diff(&Snapshot::empty(), rows.clone(), key);
            prop_assert_eq!(first.changes.added().len(), rows.len());

            let second = diff(&first.snapshot, rows, key);
            prop_assert!(second.changes.is_empty());
            prop_assert_eq!(second.snapshot, first.snapshot);
        }
    }
}
