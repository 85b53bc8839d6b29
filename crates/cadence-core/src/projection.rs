//! Read-time overlay resolution.
//!
//! Stored instances stay sparse; what a caller sees is computed here by
//! merging the base event (or base action item) with the occurrence's
//! exception row, when one exists. No exception row means the base applies
//! verbatim.

use crate::models::{
    ActionItem, ActionItemException, EventException, EventInstance, RecurringEvent,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// The effective view of one occurrence after overlay resolution.
#[derive(Debug, Clone)]
pub struct OccurrenceView {
    pub instance: EventInstance,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// The effective view of one action item on one occurrence.
#[derive(Debug, Clone)]
pub struct ActionItemView {
    pub id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub assignee_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub pre_completion_notes: Option<String>,
    pub is_completed: bool,
}

/// Resolves one occurrence against its exception, if any.
///
/// Returns `None` for cancelled occurrences; they do not appear in any
/// listing. A populated exception column wins over the base field, an empty
/// one falls through to it. The end time always follows the event's current
/// duration, so whole-series duration edits reach occurrences that were
/// materialized earlier.
pub fn project_occurrence(
    event: &RecurringEvent,
    instance: EventInstance,
    exception: Option<&EventException>,
) -> Option<OccurrenceView> {
    if exception.and_then(|e| e.is_cancelled) == Some(true) {
        return None;
    }
    let start_at = instance.start_at;
    let end_at = start_at + Duration::minutes(event.duration_minutes);
    Some(OccurrenceView {
        name: exception
            .and_then(|e| e.name.clone())
            .unwrap_or_else(|| event.name.clone()),
        description: exception
            .and_then(|e| e.description.clone())
            .or_else(|| event.description.clone()),
        location: exception
            .and_then(|e| e.location.clone())
            .or_else(|| event.location.clone()),
        start_at,
        end_at,
        instance,
    })
}

/// Resolves one action item against its per-occurrence exception, if any.
///
/// Returns `None` when the exception marks the item deleted for this
/// occurrence. Completion state is the one field where an explicit override
/// of `false` is meaningful: it reverts a base-completed item to pending on
/// this occurrence alone.
pub fn project_action_item(
    item: &ActionItem,
    exception: Option<&ActionItemException>,
) -> Option<ActionItemView> {
    if exception.and_then(|e| e.is_deleted) == Some(true) {
        return None;
    }
    Some(ActionItemView {
        id: item.id,
        event_id: item.event_id,
        title: item.title.clone(),
        assignee_id: exception
            .and_then(|e| e.assignee_id)
            .or(item.assignee_id),
        category_id: exception
            .and_then(|e| e.category_id)
            .or(item.category_id),
        pre_completion_notes: exception
            .and_then(|e| e.pre_completion_notes.clone())
            .or_else(|| item.pre_completion_notes.clone()),
        is_completed: exception
            .and_then(|e| e.is_completed)
            .unwrap_or(item.is_completed),
    })
}
