use cadence_core::db::establish_connection;
use cadence_core::error::CoreError;
use cadence_core::models::*;
use cadence_core::recurrence::MaterializationManager;
use cadence_core::repository::{
    ActionItemRepository, EventRepository, ExceptionRepository, InstanceRepository,
    SqliteRepository,
};
use chrono::{DateTime, Duration, TimeZone, Utc, Weekday};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// Helper function to create a test database
async fn setup_test_db() -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    let materialization_manager = MaterializationManager::with_defaults();
    let repository = SqliteRepository::new(pool, materialization_manager);

    (repository, temp_dir)
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    at(y, m, d, 0, 0)
}

fn daily_count(count: u32) -> RulePayload {
    RulePayload {
        frequency: Some(Frequency::Daily),
        count: Some(count),
        ..Default::default()
    }
}

fn daily_forever() -> RulePayload {
    RulePayload {
        frequency: Some(Frequency::Daily),
        never: true,
        ..Default::default()
    }
}

fn weekly_forever() -> RulePayload {
    RulePayload {
        frequency: Some(Frequency::Weekly),
        never: true,
        ..Default::default()
    }
}

/// Helper function to create a recurring event
async fn create_test_event(
    repo: &SqliteRepository,
    name: &str,
    start_at: DateTime<Utc>,
    rule: RulePayload,
) -> RecurringEvent {
    repo.create_event(NewEventData {
        name: name.to_string(),
        description: Some(format!("Test event: {}", name)),
        location: None,
        start_at,
        duration_minutes: 60,
        rule,
    })
    .await
    .expect("Failed to create test event")
}

/// Helper function to create a test action item
async fn create_test_action_item(
    repo: &SqliteRepository,
    event_id: Uuid,
    title: &str,
) -> ActionItem {
    repo.add_action_item(NewActionItemData {
        event_id,
        title: title.to_string(),
        assignee_id: None,
        category_id: None,
        pre_completion_notes: None,
    })
    .await
    .expect("Failed to create test action item")
}

#[tokio::test]
async fn test_event_creation_persists_rule_and_lineage() {
    let (repo, _temp_dir) = setup_test_db().await;

    let event = repo
        .create_event(NewEventData {
            name: "Sprint planning".to_string(),
            description: Some("Plan the next sprint".to_string()),
            location: Some("Room 2".to_string()),
            start_at: at(2025, 1, 6, 9, 30),
            duration_minutes: 45,
            rule: RulePayload {
                frequency: Some(Frequency::Weekly),
                interval: Some(2),
                by_day: vec![Weekday::Wed, Weekday::Mon],
                count: Some(4),
                ..Default::default()
            },
        })
        .await
        .expect("Failed to create event");

    assert_eq!(event.name, "Sprint planning");
    assert_eq!(event.duration_minutes, 45);
    // A fresh event is the root of its own lineage
    assert_eq!(event.original_series_id, event.id);
    assert!(event.last_materialized_until.is_some());

    let rule = repo
        .find_rule_by_id(event.rule_id)
        .await
        .expect("Failed to fetch rule")
        .expect("Rule should exist");
    assert_eq!(rule.frequency, Frequency::Weekly);
    assert_eq!(rule.interval, 2);
    // Weekday constraints come back normalized to week order
    assert_eq!(rule.by_day, vec![Weekday::Mon, Weekday::Wed]);
    assert_eq!(rule.termination, Termination::Count(4));
}

#[tokio::test]
async fn test_occurrence_listing_for_a_sparse_weekly_rule() {
    let (repo, _temp_dir) = setup_test_db().await;

    // Every other week on Monday and Wednesday, four times, anchored on a
    // Monday morning.
    let event = create_test_event(
        &repo,
        "Team sync",
        at(2025, 1, 6, 9, 30),
        RulePayload {
            frequency: Some(Frequency::Weekly),
            interval: Some(2),
            by_day: vec![Weekday::Mon, Weekday::Wed],
            count: Some(4),
            ..Default::default()
        },
    )
    .await;

    let views = repo
        .list_occurrences_in_window(event.id, day(2025, 1, 1), day(2025, 3, 1))
        .await
        .expect("Failed to list occurrences");

    let dates: Vec<DateTime<Utc>> = views.iter().map(|v| v.instance.occurrence_date).collect();
    assert_eq!(
        dates,
        vec![
            day(2025, 1, 6),
            day(2025, 1, 8),
            day(2025, 1, 20),
            day(2025, 1, 22),
        ]
    );
    let sequences: Vec<Option<i64>> = views.iter().map(|v| v.instance.sequence).collect();
    assert_eq!(sequences, vec![Some(1), Some(2), Some(3), Some(4)]);

    // Every occurrence carries the anchor's time of day
    assert_eq!(views[0].start_at, at(2025, 1, 6, 9, 30));
    assert_eq!(views[0].end_at, at(2025, 1, 6, 10, 30));
    assert_eq!(views[3].start_at, at(2025, 1, 22, 9, 30));
    assert_eq!(views[0].name, "Team sync");
}

#[tokio::test]
async fn test_create_event_reports_every_violation_at_once() {
    let (repo, _temp_dir) = setup_test_db().await;

    let result = repo
        .create_event(NewEventData {
            name: "   ".to_string(),
            description: None,
            location: None,
            start_at: at(2025, 1, 6, 9, 0),
            duration_minutes: 0,
            rule: RulePayload {
                frequency: Some(Frequency::Daily),
                interval: Some(0),
                by_day: vec![Weekday::Mon],
                ..Default::default()
            },
        })
        .await;

    match result {
        Err(CoreError::Validation(e)) => {
            let fields: Vec<&str> = e.violations.iter().map(|v| v.field).collect();
            assert!(fields.contains(&"name"));
            assert!(fields.contains(&"duration_minutes"));
            assert!(fields.contains(&"interval"));
            assert!(fields.contains(&"by_day"));
            assert!(fields.contains(&"termination"));
        }
        other => panic!("Expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ensure_instance_is_idempotent() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Morning check", at(2025, 3, 1, 8, 0), daily_count(10)).await;

    // The requested timestamp is normalized to the occurrence's civil date
    let first = repo
        .ensure_instance(event.id, at(2025, 3, 4, 15, 42))
        .await
        .expect("Failed to ensure instance");
    assert_eq!(first.occurrence_date, day(2025, 3, 4));
    assert_eq!(first.sequence, Some(4));
    assert_eq!(first.start_at, at(2025, 3, 4, 8, 0));
    assert_eq!(first.end_at, at(2025, 3, 4, 9, 0));

    let second = repo
        .ensure_instance(event.id, day(2025, 3, 4))
        .await
        .expect("Failed to ensure instance again");
    assert_eq!(second.id, first.id);

    let instances = repo
        .list_instances_in_window(event.id, day(2025, 3, 4), day(2025, 3, 4))
        .await
        .expect("Failed to list instances");
    assert_eq!(instances.len(), 1);

    // Dates the rule never produces still get a row, just without a sequence
    let off_rule = repo
        .ensure_instance(event.id, day(2025, 3, 20))
        .await
        .expect("Failed to ensure off-rule instance");
    assert_eq!(off_rule.sequence, None);
    assert_eq!(off_rule.start_at, at(2025, 3, 20, 8, 0));
}

#[tokio::test]
async fn test_concurrent_ensure_instance_converges_on_one_row() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Daily review", at(2025, 5, 1, 7, 0), daily_forever()).await;

    let repo = Arc::new(repo);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = Arc::clone(&repo);
        let event_id = event.id;
        handles.push(tokio::spawn(async move {
            repo.ensure_instance(event_id, day(2025, 5, 3)).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let instance = handle
            .await
            .expect("Task panicked")
            .expect("ensure_instance failed under contention");
        ids.push(instance.id);
    }
    assert!(ids.windows(2).all(|w| w[0] == w[1]));

    let instances = repo
        .list_instances_in_window(event.id, day(2025, 5, 3), day(2025, 5, 3))
        .await
        .expect("Failed to list instances");
    assert_eq!(instances.len(), 1);
}

#[tokio::test]
async fn test_event_exception_merges_only_supplied_fields() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Weekly sync", at(2025, 2, 3, 10, 0), weekly_forever()).await;
    let instance = repo
        .ensure_instance(event.id, day(2025, 2, 10))
        .await
        .expect("Failed to ensure instance");

    let first = repo
        .upsert_event_exception(
            event.id,
            instance.id,
            EventOverrideData {
                name: Some("Renamed sync".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to write exception");
    assert_eq!(first.name, Some("Renamed sync".to_string()));
    assert_eq!(first.location, None);
    assert_eq!(first.is_cancelled, None);

    // A later write with different fields merges into the same row
    let second = repo
        .upsert_event_exception(
            event.id,
            instance.id,
            EventOverrideData {
                location: Some(Some("Room 4".to_string())),
                description: Some(Some("Bring notes".to_string())),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to merge exception");
    assert_eq!(second.id, first.id);
    assert_eq!(second.name, Some("Renamed sync".to_string()));
    assert_eq!(second.location, Some("Room 4".to_string()));
    assert_eq!(second.description, Some("Bring notes".to_string()));

    // An explicit clear drops one override without touching the others
    let third = repo
        .upsert_event_exception(
            event.id,
            instance.id,
            EventOverrideData {
                description: Some(None),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to clear override");
    assert_eq!(third.description, None);
    assert_eq!(third.name, Some("Renamed sync".to_string()));
    assert_eq!(third.location, Some("Room 4".to_string()));

    let exceptions = repo
        .list_event_exceptions(event.id)
        .await
        .expect("Failed to list exceptions");
    assert_eq!(exceptions.len(), 1);
}

#[tokio::test]
async fn test_empty_changes_are_rejected() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Planning", at(2025, 2, 3, 10, 0), weekly_forever()).await;
    let instance = repo
        .ensure_instance(event.id, day(2025, 2, 10))
        .await
        .expect("Failed to ensure instance");
    let item = create_test_action_item(&repo, event.id, "Prepare agenda").await;

    let result = repo.update_event(event.id, UpdateEventData::default()).await;
    assert!(matches!(result, Err(CoreError::Validation(_))));

    let result = repo
        .upsert_event_exception(event.id, instance.id, EventOverrideData::default())
        .await;
    assert!(matches!(result, Err(CoreError::Validation(_))));

    let result = repo
        .upsert_action_exception(item.id, instance.id, ActionOverrideData::default())
        .await;
    assert!(matches!(result, Err(CoreError::Validation(_))));
}

#[tokio::test]
async fn test_cancel_hides_an_occurrence_and_restore_brings_it_back() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Standup", at(2025, 4, 1, 9, 0), daily_count(5)).await;
    let instance = repo
        .ensure_instance(event.id, day(2025, 4, 3))
        .await
        .expect("Failed to ensure instance");

    let exception = repo
        .cancel_occurrence(event.id, instance.id)
        .await
        .expect("Failed to cancel occurrence");
    assert_eq!(exception.is_cancelled, Some(true));

    let views = repo
        .list_occurrences_in_window(event.id, day(2025, 4, 1), day(2025, 4, 5))
        .await
        .expect("Failed to list occurrences");
    assert_eq!(views.len(), 4);
    assert!(views
        .iter()
        .all(|v| v.instance.occurrence_date != day(2025, 4, 3)));

    repo.restore_occurrence(event.id, instance.id)
        .await
        .expect("Failed to restore occurrence");

    let views = repo
        .list_occurrences_in_window(event.id, day(2025, 4, 1), day(2025, 4, 5))
        .await
        .expect("Failed to list occurrences after restore");
    assert_eq!(views.len(), 5);
    let restored = views
        .iter()
        .find(|v| v.instance.occurrence_date == day(2025, 4, 3))
        .expect("Restored occurrence should be listed");
    assert_eq!(restored.name, "Standup");
}

#[tokio::test]
async fn test_occurrence_views_apply_overrides_and_fall_back() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = repo
        .create_event(NewEventData {
            name: "Standup".to_string(),
            description: Some("Daily sync".to_string()),
            location: Some("Zoom".to_string()),
            start_at: at(2025, 6, 2, 9, 0),
            duration_minutes: 15,
            rule: daily_count(5),
        })
        .await
        .expect("Failed to create event");
    let instance = repo
        .ensure_instance(event.id, day(2025, 6, 4))
        .await
        .expect("Failed to ensure instance");

    repo.upsert_event_exception(
        event.id,
        instance.id,
        EventOverrideData {
            name: Some("Standup (async)".to_string()),
            description: Some(None),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to write exception");

    let views = repo
        .list_occurrences_in_window(event.id, day(2025, 6, 2), day(2025, 6, 6))
        .await
        .expect("Failed to list occurrences");
    assert_eq!(views.len(), 5);

    let overridden = &views[2];
    assert_eq!(overridden.instance.occurrence_date, day(2025, 6, 4));
    assert_eq!(overridden.name, "Standup (async)");
    assert_eq!(overridden.description, None);
    // Untouched fields fall back to the base event
    assert_eq!(overridden.location, Some("Zoom".to_string()));
    assert_eq!(overridden.end_at - overridden.start_at, Duration::minutes(15));

    let untouched = &views[0];
    assert_eq!(untouched.name, "Standup");
    assert_eq!(untouched.description, Some("Daily sync".to_string()));
}

#[tokio::test]
async fn test_duration_edits_reach_already_materialized_occurrences() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Review", at(2025, 7, 1, 8, 0), daily_count(3)).await;

    let created = repo
        .materialize_window(event.id, day(2025, 7, 1), day(2025, 7, 10))
        .await
        .expect("Failed to materialize");
    assert_eq!(created, 3);

    repo.update_event(
        event.id,
        UpdateEventData {
            duration_minutes: Some(90),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to update event");

    // End times are derived at read time from the current duration
    let views = repo
        .list_occurrences_in_window(event.id, day(2025, 7, 1), day(2025, 7, 10))
        .await
        .expect("Failed to list occurrences");
    assert_eq!(views.len(), 3);
    for view in &views {
        assert_eq!(view.end_at - view.start_at, Duration::minutes(90));
    }
}

#[tokio::test]
async fn test_action_items_follow_every_occurrence() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Weekly sync", at(2025, 9, 1, 14, 0), weekly_forever()).await;
    let agenda = create_test_action_item(&repo, event.id, "Prepare agenda").await;
    let room = create_test_action_item(&repo, event.id, "Book room").await;

    let items = repo
        .list_action_items(event.id)
        .await
        .expect("Failed to list action items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, agenda.id);
    assert_eq!(items[1].id, room.id);

    let instance = repo
        .ensure_instance(event.id, day(2025, 9, 8))
        .await
        .expect("Failed to ensure instance");
    let views = repo
        .list_action_items_for_instance(instance.id)
        .await
        .expect("Failed to list per-occurrence action items");
    assert_eq!(views.len(), 2);
    assert!(views.iter().all(|v| !v.is_completed));
}

#[tokio::test]
async fn test_action_overrides_touch_only_their_occurrence() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Weekly sync", at(2025, 9, 1, 14, 0), weekly_forever()).await;
    let item = create_test_action_item(&repo, event.id, "Prepare agenda").await;
    let first = repo
        .ensure_instance(event.id, day(2025, 9, 1))
        .await
        .expect("Failed to ensure instance");
    let second = repo
        .ensure_instance(event.id, day(2025, 9, 8))
        .await
        .expect("Failed to ensure instance");

    repo.upsert_action_exception(
        item.id,
        first.id,
        ActionOverrideData {
            is_completed: Some(true),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to complete for one occurrence");

    let views = repo
        .list_action_items_for_instance(first.id)
        .await
        .expect("Failed to list first occurrence items");
    assert!(views[0].is_completed);

    let views = repo
        .list_action_items_for_instance(second.id)
        .await
        .expect("Failed to list second occurrence items");
    assert!(!views[0].is_completed);

    // Reassignment on the second occurrence leaves the first alone
    let assignee = Uuid::now_v7();
    repo.upsert_action_exception(
        item.id,
        second.id,
        ActionOverrideData {
            assignee_id: Some(Some(assignee)),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to reassign");

    let views = repo
        .list_action_items_for_instance(second.id)
        .await
        .expect("Failed to list second occurrence items");
    assert_eq!(views[0].assignee_id, Some(assignee));
    let views = repo
        .list_action_items_for_instance(first.id)
        .await
        .expect("Failed to list first occurrence items");
    assert_eq!(views[0].assignee_id, None);

    // An explicit pending reset beats the earlier completion
    repo.mark_action_pending(item.id, first.id)
        .await
        .expect("Failed to mark pending");
    let views = repo
        .list_action_items_for_instance(first.id)
        .await
        .expect("Failed to list first occurrence items");
    assert!(!views[0].is_completed);
}

#[tokio::test]
async fn test_deleting_an_action_item_for_one_occurrence() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Weekly sync", at(2025, 9, 1, 14, 0), weekly_forever()).await;
    let item = create_test_action_item(&repo, event.id, "Prepare agenda").await;
    let first = repo
        .ensure_instance(event.id, day(2025, 9, 1))
        .await
        .expect("Failed to ensure instance");
    let second = repo
        .ensure_instance(event.id, day(2025, 9, 8))
        .await
        .expect("Failed to ensure instance");

    repo.mark_action_deleted(item.id, first.id)
        .await
        .expect("Failed to mark deleted");

    let views = repo
        .list_action_items_for_instance(first.id)
        .await
        .expect("Failed to list first occurrence items");
    assert!(views.is_empty());

    let views = repo
        .list_action_items_for_instance(second.id)
        .await
        .expect("Failed to list second occurrence items");
    assert_eq!(views.len(), 1);

    // The series-level item is untouched
    let items = repo
        .list_action_items(event.id)
        .await
        .expect("Failed to list action items");
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_removing_an_action_item_purges_its_overrides() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Weekly sync", at(2025, 9, 1, 14, 0), weekly_forever()).await;
    let item = create_test_action_item(&repo, event.id, "Prepare agenda").await;
    let instance = repo
        .ensure_instance(event.id, day(2025, 9, 1))
        .await
        .expect("Failed to ensure instance");
    repo.upsert_action_exception(
        item.id,
        instance.id,
        ActionOverrideData {
            is_completed: Some(true),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to write override");

    repo.remove_action_item(item.id)
        .await
        .expect("Failed to remove action item");

    assert!(repo
        .find_action_item_by_id(item.id)
        .await
        .expect("Lookup failed")
        .is_none());
    let exceptions = repo
        .list_action_exceptions_for_instance(instance.id)
        .await
        .expect("Failed to list overrides");
    assert!(exceptions.is_empty());

    let result = repo.remove_action_item(item.id).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_overrides_demand_matching_ownership() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event_a = create_test_event(&repo, "Event A", at(2025, 2, 3, 10, 0), weekly_forever()).await;
    let event_b = create_test_event(&repo, "Event B", at(2025, 2, 4, 10, 0), weekly_forever()).await;
    let instance_b = repo
        .ensure_instance(event_b.id, day(2025, 2, 11))
        .await
        .expect("Failed to ensure instance");
    let item_a = create_test_action_item(&repo, event_a.id, "Cross check").await;

    let result = repo
        .upsert_event_exception(
            event_a.id,
            instance_b.id,
            EventOverrideData {
                name: Some("Hijacked".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(CoreError::Forbidden(_))));

    let result = repo
        .upsert_action_exception(
            item_a.id,
            instance_b.id,
            ActionOverrideData {
                is_completed: Some(true),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(CoreError::Forbidden(_))));

    let result = repo
        .upsert_event_exception(
            event_a.id,
            Uuid::now_v7(),
            EventOverrideData {
                is_cancelled: Some(true),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_split_moves_the_tail_to_a_successor() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = repo
        .create_event(NewEventData {
            name: "Team sync".to_string(),
            description: None,
            location: Some("Room 1".to_string()),
            start_at: at(2025, 1, 6, 9, 0),
            duration_minutes: 60,
            rule: weekly_forever(),
        })
        .await
        .expect("Failed to create event");

    // One exception before the cut, one on it
    let jan_13 = repo
        .ensure_instance(event.id, day(2025, 1, 13))
        .await
        .expect("Failed to ensure instance");
    repo.upsert_event_exception(
        event.id,
        jan_13.id,
        EventOverrideData {
            name: Some("Rescheduled sync".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to write exception");
    let feb_3 = repo
        .ensure_instance(event.id, day(2025, 2, 3))
        .await
        .expect("Failed to ensure instance");
    repo.cancel_occurrence(event.id, feb_3.id)
        .await
        .expect("Failed to cancel");

    // Cut mid-day; the cut lands on the civil date
    let successor = repo
        .split_event(
            event.id,
            at(2025, 2, 3, 12, 30),
            SplitData {
                rule: None,
                changes: UpdateEventData {
                    name: Some("Team sync v2".to_string()),
                    ..Default::default()
                },
            },
        )
        .await
        .expect("Failed to split");

    assert_eq!(successor.name, "Team sync v2");
    assert_eq!(successor.location, Some("Room 1".to_string()));
    // Anchored at the cut, keeping the predecessor's time of day
    assert_eq!(successor.start_at, at(2025, 2, 3, 9, 0));
    assert_eq!(successor.original_series_id, event.id);
    assert_ne!(successor.rule_id, event.rule_id);

    // The predecessor keeps its identity and stops before the cut
    let predecessor = repo
        .find_event_by_id(event.id)
        .await
        .expect("Lookup failed")
        .expect("Predecessor should exist");
    assert_eq!(predecessor.name, "Team sync");
    let old_rule = repo
        .find_rule_by_id(event.rule_id)
        .await
        .expect("Lookup failed")
        .expect("Old rule should exist");
    assert_eq!(old_rule.termination, Termination::Until(day(2025, 2, 2)));

    let views = repo
        .list_occurrences_in_window(event.id, day(2025, 1, 1), day(2025, 12, 31))
        .await
        .expect("Failed to list predecessor occurrences");
    let dates: Vec<DateTime<Utc>> = views.iter().map(|v| v.instance.occurrence_date).collect();
    assert_eq!(
        dates,
        vec![
            day(2025, 1, 6),
            day(2025, 1, 13),
            day(2025, 1, 20),
            day(2025, 1, 27),
        ]
    );
    let renamed = views
        .iter()
        .find(|v| v.instance.occurrence_date == day(2025, 1, 13))
        .expect("Overridden occurrence should survive");
    assert_eq!(renamed.name, "Rescheduled sync");

    // The cut-side instance and its overlay are gone from the predecessor
    assert!(repo
        .find_instance_by_id(feb_3.id)
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .find_event_exception(event.id, feb_3.id)
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .find_event_exception(event.id, jan_13.id)
        .await
        .expect("Lookup failed")
        .is_some());

    // The successor restarts its own numbering at the cut
    let views = repo
        .list_occurrences_in_window(successor.id, day(2025, 2, 1), day(2025, 3, 1))
        .await
        .expect("Failed to list successor occurrences");
    let dates: Vec<DateTime<Utc>> = views.iter().map(|v| v.instance.occurrence_date).collect();
    assert_eq!(
        dates,
        vec![
            day(2025, 2, 3),
            day(2025, 2, 10),
            day(2025, 2, 17),
            day(2025, 2, 24),
        ]
    );
    assert_eq!(views[0].instance.sequence, Some(1));
    assert!(views.iter().all(|v| v.name == "Team sync v2"));
}

#[tokio::test]
async fn test_split_rejects_cuts_outside_the_series() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Short series", at(2025, 3, 1, 9, 0), daily_count(3)).await;

    // At or before the anchor there is nothing to keep
    let result = repo
        .split_event(event.id, day(2025, 3, 1), SplitData::default())
        .await;
    assert!(matches!(result, Err(CoreError::Forbidden(_))));
    let result = repo
        .split_event(event.id, day(2025, 2, 1), SplitData::default())
        .await;
    assert!(matches!(result, Err(CoreError::Forbidden(_))));

    // Past the last occurrence there is nothing to hand over
    let result = repo
        .split_event(event.id, day(2025, 4, 1), SplitData::default())
        .await;
    assert!(matches!(result, Err(CoreError::Forbidden(_))));

    let result = repo
        .split_event(Uuid::now_v7(), day(2025, 3, 2), SplitData::default())
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_split_at_a_materialized_instance() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Weekly sync", at(2025, 1, 6, 9, 0), weekly_forever()).await;
    let other = create_test_event(&repo, "Other series", at(2025, 1, 7, 9, 0), weekly_forever()).await;
    let cut = repo
        .ensure_instance(event.id, day(2025, 2, 3))
        .await
        .expect("Failed to ensure instance");

    // The cut instance must exist and must belong to the stated event
    let result = repo
        .split_at_instance(event.id, Uuid::now_v7(), SplitData::default())
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
    let result = repo
        .split_at_instance(other.id, cut.id, SplitData::default())
        .await;
    assert!(matches!(result, Err(CoreError::Forbidden(_))));

    let successor = repo
        .split_at_instance(event.id, cut.id, SplitData::default())
        .await
        .expect("Failed to split at instance");
    assert_eq!(successor.start_at, at(2025, 2, 3, 9, 0));

    // The cut instance moved to the successor; the predecessor's copy is gone
    assert!(repo
        .find_instance_by_id(cut.id)
        .await
        .expect("Lookup failed")
        .is_none());
    let views = repo
        .list_occurrences_in_window(successor.id, day(2025, 2, 3), day(2025, 2, 3))
        .await
        .expect("Failed to list successor occurrences");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].instance.sequence, Some(1));
}

#[tokio::test]
async fn test_split_with_a_replacement_rule() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Daily check", at(2025, 5, 1, 8, 0), daily_forever()).await;

    let successor = repo
        .split_event(
            event.id,
            day(2025, 5, 10),
            SplitData {
                rule: Some(RulePayload {
                    frequency: Some(Frequency::Weekly),
                    by_day: vec![Weekday::Mon],
                    count: Some(3),
                    ..Default::default()
                }),
                changes: UpdateEventData::default(),
            },
        )
        .await
        .expect("Failed to split");

    // The cut falls on a Saturday; the replacement rule first matches the
    // following Monday.
    let views = repo
        .list_occurrences_in_window(successor.id, day(2025, 5, 1), day(2025, 6, 30))
        .await
        .expect("Failed to list successor occurrences");
    let dates: Vec<DateTime<Utc>> = views.iter().map(|v| v.instance.occurrence_date).collect();
    assert_eq!(
        dates,
        vec![day(2025, 5, 12), day(2025, 5, 19), day(2025, 5, 26)]
    );

    let views = repo
        .list_occurrences_in_window(event.id, day(2025, 5, 1), day(2025, 6, 30))
        .await
        .expect("Failed to list predecessor occurrences");
    assert_eq!(views.len(), 9);
    assert_eq!(
        views.last().map(|v| v.instance.occurrence_date),
        Some(day(2025, 5, 9))
    );
}

#[tokio::test]
async fn test_materialize_window_counts_and_advances_the_boundary() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Morning run", at(2025, 8, 1, 6, 0), daily_count(10)).await;

    let created = repo
        .materialize_window(event.id, day(2025, 8, 1), day(2025, 8, 5))
        .await
        .expect("Failed to materialize");
    assert_eq!(created, 5);

    // The same window again is a no-op
    let created = repo
        .materialize_window(event.id, day(2025, 8, 1), day(2025, 8, 5))
        .await
        .expect("Failed to re-materialize");
    assert_eq!(created, 0);

    // A wider window fills only the gap, and the rule's count caps it
    let created = repo
        .materialize_window(event.id, day(2025, 8, 3), day(2025, 8, 20))
        .await
        .expect("Failed to extend");
    assert_eq!(created, 5);

    let refreshed = repo
        .find_event_by_id(event.id)
        .await
        .expect("Lookup failed")
        .expect("Event should exist");
    assert_eq!(refreshed.last_materialized_until, Some(day(2025, 8, 20)));

    // A narrower window later never moves the boundary backwards
    repo.materialize_window(event.id, day(2025, 8, 1), day(2025, 8, 2))
        .await
        .expect("Failed to materialize");
    let refreshed = repo
        .find_event_by_id(event.id)
        .await
        .expect("Lookup failed")
        .expect("Event should exist");
    assert_eq!(refreshed.last_materialized_until, Some(day(2025, 8, 20)));
}

#[tokio::test]
async fn test_materialization_respects_the_batch_cap() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");
    let repo = SqliteRepository::new(
        pool,
        MaterializationManager::new(MaterializationConfig {
            lookahead_days: 30,
            grace_days: 3,
            max_batch_size: 7,
        }),
    );

    let event = create_test_event(&repo, "Capped", at(2025, 10, 1, 9, 0), daily_forever()).await;

    let created = repo
        .materialize_window(event.id, day(2025, 10, 1), day(2025, 10, 31))
        .await
        .expect("Failed to materialize");
    assert_eq!(created, 7);

    // The next pass picks up where the cap stopped
    let created = repo
        .materialize_window(event.id, day(2025, 10, 1), day(2025, 10, 31))
        .await
        .expect("Failed to materialize");
    assert_eq!(created, 7);

    let instances = repo
        .list_instances_in_window(event.id, day(2025, 10, 1), day(2025, 10, 31))
        .await
        .expect("Failed to list instances");
    assert_eq!(instances.len(), 14);
    assert_eq!(
        instances.last().map(|i| i.occurrence_date),
        Some(day(2025, 10, 14))
    );
}

#[tokio::test]
async fn test_missing_events_surface_as_not_found() {
    let (repo, _temp_dir) = setup_test_db().await;
    let ghost = Uuid::now_v7();

    assert!(repo
        .find_event_by_id(ghost)
        .await
        .expect("Lookup failed")
        .is_none());

    let result = repo.ensure_instance(ghost, day(2025, 1, 1)).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));

    let result = repo
        .list_instances_in_window(ghost, day(2025, 1, 1), day(2025, 2, 1))
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));

    let result = repo
        .list_occurrences_in_window(ghost, day(2025, 1, 1), day(2025, 2, 1))
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));

    let result = repo
        .update_event(
            ghost,
            UpdateEventData {
                name: Some("New name".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));

    let result = repo.delete_event(ghost).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));

    let result = repo.list_action_items(ghost).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_short_id_prefix_lookup() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Only one", at(2025, 2, 3, 10, 0), weekly_forever()).await;
    let instance = repo
        .ensure_instance(event.id, day(2025, 2, 10))
        .await
        .expect("Failed to ensure instance");
    let item = create_test_action_item(&repo, event.id, "Prepare agenda").await;

    // The display form's first characters resolve, case-insensitively
    let prefix: String = event.id.to_string().chars().take(8).collect();
    let matches = repo
        .find_events_by_id_prefix(&prefix)
        .await
        .expect("Prefix lookup failed");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, event.id);

    let matches = repo
        .find_events_by_id_prefix(&event.id.to_string())
        .await
        .expect("Full id lookup failed");
    assert_eq!(matches.len(), 1);

    let prefix: String = instance.id.to_string().chars().take(8).collect();
    let matches = repo
        .find_instances_by_id_prefix(&prefix.to_uppercase())
        .await
        .expect("Prefix lookup failed");
    assert!(matches.iter().any(|i| i.id == instance.id));

    let prefix: String = item.id.to_string().chars().take(8).collect();
    let matches = repo
        .find_action_items_by_id_prefix(&prefix)
        .await
        .expect("Prefix lookup failed");
    assert!(matches.iter().any(|i| i.id == item.id));
}

#[tokio::test]
async fn test_deleting_an_event_removes_its_whole_graph() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Doomed", at(2025, 2, 3, 10, 0), weekly_forever()).await;
    let instance = repo
        .ensure_instance(event.id, day(2025, 2, 10))
        .await
        .expect("Failed to ensure instance");
    let item = create_test_action_item(&repo, event.id, "Cleanup").await;
    repo.cancel_occurrence(event.id, instance.id)
        .await
        .expect("Failed to cancel");
    repo.upsert_action_exception(
        item.id,
        instance.id,
        ActionOverrideData {
            is_completed: Some(true),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to write override");

    repo.delete_event(event.id)
        .await
        .expect("Failed to delete event");

    assert!(repo
        .find_event_by_id(event.id)
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .find_rule_by_id(event.rule_id)
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .find_instance_by_id(instance.id)
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .find_action_item_by_id(item.id)
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .find_event_exception(event.id, instance.id)
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .list_action_exceptions_for_instance(instance.id)
        .await
        .expect("Lookup failed")
        .is_empty());
}

#[tokio::test]
async fn test_sequence_is_stable_deep_into_a_series() {
    let (repo, _temp_dir) = setup_test_db().await;
    let event = create_test_event(&repo, "Daily log", at(2025, 1, 1, 22, 0), daily_forever()).await;

    let instance = repo
        .ensure_instance(event.id, day(2025, 12, 31))
        .await
        .expect("Failed to ensure instance");
    assert_eq!(instance.sequence, Some(365));
}
