use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    ActionItem, ActionItemException, ActionOverrideData, EventException, EventInstance,
    EventOverrideData, NewActionItemData, NewEventData, RecurrenceRule, RecurringEvent,
    SplitData, UpdateEventData,
};
use crate::projection::{ActionItemView, OccurrenceView};
use crate::recurrence::MaterializationManager;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// Re-export domain modules
pub mod actions;
pub mod events;
pub mod exceptions;
pub mod instances;

// Traits are defined in this module and implemented in respective domain modules

/// Domain-specific trait for recurring event operations
#[async_trait]
pub trait EventRepository {
    async fn create_event(&self, data: NewEventData) -> Result<RecurringEvent, CoreError>;
    async fn find_event_by_id(&self, id: Uuid) -> Result<Option<RecurringEvent>, CoreError>;
    async fn find_events_by_id_prefix(&self, prefix: &str) -> Result<Vec<RecurringEvent>, CoreError>;
    async fn list_events(&self) -> Result<Vec<RecurringEvent>, CoreError>;
    async fn find_rule_by_id(&self, id: Uuid) -> Result<Option<RecurrenceRule>, CoreError>;
    async fn update_event(&self, id: Uuid, data: UpdateEventData) -> Result<RecurringEvent, CoreError>;
    async fn delete_event(&self, id: Uuid) -> Result<(), CoreError>;
    /// Splits a series at a cut date: occurrences before it stay on the
    /// existing event, the cut date and everything after move to a new event
    /// carrying the requested changes. Atomic.
    async fn split_event(&self, id: Uuid, cut_date: DateTime<Utc>, data: SplitData) -> Result<RecurringEvent, CoreError>;
    /// Splits at a materialized instance: its occurrence date becomes the
    /// cut. Fails when the instance is missing or belongs to another event.
    async fn split_at_instance(&self, id: Uuid, cut_instance_id: Uuid, data: SplitData) -> Result<RecurringEvent, CoreError>;
}

/// Domain-specific trait for occurrence instance operations
#[async_trait]
pub trait InstanceRepository {
    /// Looks up the instance for `(event, occurrence_date)`, creating it if
    /// absent. Concurrent callers converge on the same row.
    async fn ensure_instance(&self, event_id: Uuid, occurrence_date: DateTime<Utc>) -> Result<EventInstance, CoreError>;
    async fn find_instance_by_id(&self, id: Uuid) -> Result<Option<EventInstance>, CoreError>;
    async fn find_instances_by_id_prefix(&self, prefix: &str) -> Result<Vec<EventInstance>, CoreError>;
    async fn list_instances_in_window(&self, event_id: Uuid, from: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<EventInstance>, CoreError>;
    /// Creates any instances the rule generates inside the window that do
    /// not exist yet. Returns how many were created.
    async fn materialize_window(&self, event_id: Uuid, from: DateTime<Utc>, until: DateTime<Utc>) -> Result<usize, CoreError>;
    /// Materializes the window, then resolves every instance in it against
    /// the exception overlay. Cancelled occurrences are omitted.
    async fn list_occurrences_in_window(&self, event_id: Uuid, from: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<OccurrenceView>, CoreError>;
}

/// Domain-specific trait for action item operations
#[async_trait]
pub trait ActionItemRepository {
    async fn add_action_item(&self, data: NewActionItemData) -> Result<ActionItem, CoreError>;
    async fn find_action_item_by_id(&self, id: Uuid) -> Result<Option<ActionItem>, CoreError>;
    async fn find_action_items_by_id_prefix(&self, prefix: &str) -> Result<Vec<ActionItem>, CoreError>;
    async fn list_action_items(&self, event_id: Uuid) -> Result<Vec<ActionItem>, CoreError>;
    async fn remove_action_item(&self, id: Uuid) -> Result<(), CoreError>;
    /// Resolves the event's action items against one occurrence's overlay.
    async fn list_action_items_for_instance(&self, instance_id: Uuid) -> Result<Vec<ActionItemView>, CoreError>;
}

/// Domain-specific trait for exception overlay operations
#[async_trait]
pub trait ExceptionRepository {
    /// Writes the supplied override fields for one occurrence, merging into
    /// the existing exception row when one exists. Fields not supplied are
    /// left untouched.
    async fn upsert_event_exception(&self, event_id: Uuid, instance_id: Uuid, data: EventOverrideData) -> Result<EventException, CoreError>;
    async fn upsert_action_exception(&self, action_item_id: Uuid, instance_id: Uuid, data: ActionOverrideData) -> Result<ActionItemException, CoreError>;
    async fn cancel_occurrence(&self, event_id: Uuid, instance_id: Uuid) -> Result<EventException, CoreError>;
    async fn restore_occurrence(&self, event_id: Uuid, instance_id: Uuid) -> Result<EventException, CoreError>;
    /// Hides one occurrence's copy of an action item.
    async fn mark_action_deleted(&self, action_item_id: Uuid, instance_id: Uuid) -> Result<ActionItemException, CoreError>;
    /// Reverts an action item to pending for one occurrence.
    async fn mark_action_pending(&self, action_item_id: Uuid, instance_id: Uuid) -> Result<ActionItemException, CoreError>;
    async fn find_event_exception(&self, event_id: Uuid, instance_id: Uuid) -> Result<Option<EventException>, CoreError>;
    async fn list_event_exceptions(&self, event_id: Uuid) -> Result<Vec<EventException>, CoreError>;
    async fn list_action_exceptions_for_instance(&self, instance_id: Uuid) -> Result<Vec<ActionItemException>, CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository:
    EventRepository + InstanceRepository + ActionItemRepository + ExceptionRepository
{
    // This trait automatically composes all domain-specific repositories
    // Individual domain operations are defined in their respective traits
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
    materialization_manager: MaterializationManager,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, materialization_manager: MaterializationManager) -> Self {
        Self {
            pool,
            materialization_manager,
        }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get a reference to the materialization manager for internal use
    pub(crate) fn materialization_manager(&self) -> &MaterializationManager {
        &self.materialization_manager
    }

    /// Normalizes a short id the way ids are matched in SQL: hex digits of
    /// the raw value, no hyphens, uppercase.
    pub(crate) fn id_prefix_pattern(prefix: &str) -> String {
        let mut pattern: String = prefix
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_uppercase();
        pattern.push('%');
        pattern
    }
}

// The main Repository trait implementation will automatically be available
// when all domain trait implementations are defined
impl Repository for SqliteRepository {}
