//! Tests for the change rules and the snapshot differ.

use std::time::{Duration, SystemTime};

use serde_json::{Value, json};
use tracing_test::traced_test;

use super::*;
use crate::monitor::IdField;

fn t(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn entity(key: &str, health: Option<f64>, items: &str) -> TrackedEntity {
    TrackedEntity {
        key: key.to_string(),
        owner: "Kessler".to_string(),
        health,
        items: items.to_string(),
        last_seen: t(0),
    }
}

/// Runs two cycles: seeds the snapshot with `first`, then diffs `second`.
fn two_cycles(first: Value, second: Value, rules: &ChangeRules) -> DiffOutcome {
    let seeded = diff(&Snapshot::new(), first, rules, None, t(1));
    assert!(seeded.events.is_empty(), "first observation must be silent");
    diff(&seeded.next, second, rules, None, t(2))
}

mod rules {
    use super::*;

    #[test]
    fn drop_of_exactly_threshold_is_suppressed() {
        let rules = ChangeRules::default();
        let events = rules.compare(
            &entity("a", Some(100.0), ""),
            &entity("a", Some(95.0), ""),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn drop_above_threshold_fires() {
        let rules = ChangeRules::default();
        let events = rules.compare(
            &entity("a", Some(100.0), ""),
            &entity("a", Some(94.0), ""),
        );

        assert_eq!(
            events,
            vec![ChangeEvent::HealthDropped {
                key: "a".to_string(),
                owner: "Kessler".to_string(),
                old_health: 100.0,
                new_health: 94.0,
            }]
        );
    }

    #[test]
    fn health_increase_is_ignored() {
        let rules = ChangeRules::default();
        let events = rules.compare(&entity("a", Some(10.0), ""), &entity("a", Some(90.0), ""));
        assert!(events.is_empty());
    }

    #[test]
    fn missing_previous_health_never_fires() {
        let rules = ChangeRules::default();
        let events = rules.compare(&entity("a", None, ""), &entity("a", Some(0.0), ""));
        assert!(events.is_empty());
    }

    #[test]
    fn custom_threshold_applies() {
        let rules = ChangeRules::with_threshold(20.0);

        let small = rules.compare(&entity("a", Some(100.0), ""), &entity("a", Some(80.0), ""));
        let large = rules.compare(&entity("a", Some(100.0), ""), &entity("a", Some(79.5), ""));

        assert!(small.is_empty());
        assert_eq!(large.len(), 1);
    }

    #[test]
    fn longer_items_fire() {
        let rules = ChangeRules::default();
        let events = rules.compare(&entity("a", None, "Iron"), &entity("a", None, "Iron, Gold"));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), ChangeKind::NewItemsListed);
    }

    #[test]
    fn removal_is_not_reported() {
        let rules = ChangeRules::default();
        let events = rules.compare(&entity("a", None, "Iron, Gold"), &entity("a", None, "Iron"));
        assert!(events.is_empty());
    }

    #[test]
    fn same_length_replacement_is_not_reported() {
        let rules = ChangeRules::default();
        let events = rules.compare(&entity("a", None, "Iron"), &entity("a", None, "Gold"));
        assert!(events.is_empty());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let rules = ChangeRules::default();
        // 4 chars (6 bytes) -> 5 chars (5 bytes): grows by chars only.
        let events = rules.compare(&entity("a", None, "Éclé"), &entity("a", None, "Eclat"));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn both_rules_emit_health_first() {
        let rules = ChangeRules::default();
        let events = rules.compare(
            &entity("a", Some(100.0), "Iron"),
            &entity("a", Some(50.0), "Iron, Gold"),
        );

        let kinds: Vec<_> = events.iter().map(ChangeEvent::kind).collect();
        assert_eq!(kinds, [ChangeKind::HealthDropped, ChangeKind::NewItemsListed]);
    }
}

mod differ {
    use super::*;

    #[test]
    fn first_observation_emits_nothing() {
        let payload = json!({"alpha": {"owner": "X", "health": 1, "items": "lots of items"}});

        let outcome = diff(&Snapshot::new(), payload, &ChangeRules::default(), None, t(1));

        assert!(outcome.events.is_empty());
        assert_eq!(outcome.next.len(), 1);
        assert_eq!(outcome.shape, PayloadShape::KeyedMapping);
    }

    #[test]
    fn new_key_in_later_cycle_emits_nothing() {
        let outcome = two_cycles(
            json!({"alpha": {"health": 100}}),
            json!({"alpha": {"health": 100}, "beta": {"health": 1, "items": "x"}}),
            &ChangeRules::default(),
        );

        assert!(outcome.events.is_empty());
        assert!(outcome.next.contains_key("beta"));
    }

    #[test]
    fn drop_of_five_does_not_fire_but_six_does() {
        let rules = ChangeRules::default();
        let five = two_cycles(
            json!([{"station": "a", "health": 50}]),
            json!([{"station": "a", "health": 45}]),
            &rules,
        );
        let six = two_cycles(
            json!([{"station": "a", "health": 50}]),
            json!([{"station": "a", "health": 44}]),
            &rules,
        );

        assert!(five.events.is_empty());
        assert_eq!(six.events.len(), 1);
    }

    #[test]
    fn events_follow_payload_order() {
        let outcome = two_cycles(
            json!({"b": {"health": 100, "items": ""}, "a": {"health": 100}}),
            json!({"b": {"health": 100, "items": "Iron"}, "a": {"health": 10}}),
            &ChangeRules::default(),
        );

        let keys: Vec<_> = outcome.events.iter().map(ChangeEvent::key).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn owner_comes_from_new_observation() {
        let outcome = two_cycles(
            json!({"a": {"owner": "Old", "health": 100}}),
            json!({"a": {"owner": "New", "health": 10}}),
            &ChangeRules::default(),
        );

        assert_eq!(outcome.events[0].owner(), "New");
    }

    #[test]
    fn stale_entities_persist() {
        let outcome = two_cycles(
            json!({"a": {"health": 100}, "b": {"health": 100}}),
            json!({"a": {"health": 100}}),
            &ChangeRules::default(),
        );

        assert!(outcome.next.contains_key("b"));
    }

    #[test]
    fn last_seen_uses_cycle_time() {
        let outcome = two_cycles(json!({"a": {}}), json!({"a": {}}), &ChangeRules::default());
        assert_eq!(outcome.next.get("a").unwrap().last_seen, t(2));
    }

    #[test]
    fn allow_list_excludes_before_rules() {
        let allow = AllowList::new(["a"]).unwrap();
        let rules = ChangeRules::default();
        let first = diff(
            &Snapshot::new(),
            json!({"a": {"health": 100}, "b": {"health": 100}}),
            &rules,
            Some(&allow),
            t(1),
        );
        let second = diff(
            &first.next,
            json!({"a": {"health": 100}, "b": {"health": 0}}),
            &rules,
            Some(&allow),
            t(2),
        );

        assert!(!first.next.contains_key("b"));
        assert!(second.events.is_empty());
        assert_eq!(second.next.len(), 1);
    }

    #[test]
    fn allow_list_prunes_carried_over_entities() {
        let rules = ChangeRules::default();
        let first = diff(
            &Snapshot::new(),
            json!({"a": {}, "b": {}}),
            &rules,
            None,
            t(1),
        );
        let allow = AllowList::new(["a"]).unwrap();

        let second = diff(&first.next, json!({}), &rules, Some(&allow), t(2));

        assert!(second.next.contains_key("a"));
        assert!(!second.next.contains_key("b"));
    }

    #[test]
    #[traced_test]
    fn unrecognized_payload_is_degraded_pass_through() {
        let rules = ChangeRules::default();
        let first = diff(&Snapshot::new(), json!({"a": {"health": 100}}), &rules, None, t(1));

        let outcome = diff(&first.next, json!(12345), &rules, None, t(2));

        assert!(outcome.events.is_empty());
        assert_eq!(outcome.shape, PayloadShape::Unrecognized);
        assert!(outcome.next.contains_key("a"));
        assert_eq!(outcome.next.unindexed(), Some(&json!(12345)));
        assert!(logs_contain("Unknown payload shape"));
    }

    #[test]
    fn recognized_payload_clears_unindexed() {
        let rules = ChangeRules::default();
        let degraded = diff(&Snapshot::new(), json!("junk"), &rules, None, t(1));

        let outcome = diff(&degraded.next, json!({}), &rules, None, t(2));

        assert!(outcome.next.unindexed().is_none());
    }

    #[test]
    fn name_keyed_records_are_tracked() {
        let outcome = two_cycles(
            json!([{"name": "Outpost", "health": 80}]),
            json!([{"name": "Outpost", "health": 60}]),
            &ChangeRules::default(),
        );

        assert_eq!(outcome.shape, PayloadShape::RecordsWithField(IdField::Name));
        assert_eq!(outcome.events.len(), 1);
    }

    /// Upstream gives no guarantee that keys are unique within one payload.
    /// Both duplicates are compared against the previous state and the later
    /// record is what ends up in the snapshot.
    #[test]
    fn duplicate_keys_in_one_payload_last_record_wins() {
        let outcome = two_cycles(
            json!([{"id": "x", "health": 100}]),
            json!([
                {"id": "x", "name": "Alpha", "health": 50},
                {"id": "x", "name": "Beta", "health": 99}
            ]),
            &ChangeRules::default(),
        );

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.next.get("x").unwrap().health, Some(99.0));
    }

    #[test]
    fn previous_snapshot_is_not_mutated() {
        let first = diff(
            &Snapshot::new(),
            json!({"a": {"health": 100}}),
            &ChangeRules::default(),
            None,
            t(1),
        );
        let before = first.next.clone();

        let _ = diff(&first.next, json!({"a": {"health": 1}}), &ChangeRules::default(), None, t(2));

        assert_eq!(first.next, before);
    }
}
