use crate::error::{CoreError, ValidationError};
use crate::models::{
    ActionItem, ActionItemException, ActionOverrideData, EventException, EventInstance,
    EventOverrideData,
};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

#[async_trait]
impl super::ExceptionRepository for SqliteRepository {
    async fn upsert_event_exception(
        &self,
        event_id: Uuid,
        instance_id: Uuid,
        data: EventOverrideData,
    ) -> Result<EventException, CoreError> {
        self.write_event_exception(event_id, instance_id, data).await
    }

    async fn upsert_action_exception(
        &self,
        action_item_id: Uuid,
        instance_id: Uuid,
        data: ActionOverrideData,
    ) -> Result<ActionItemException, CoreError> {
        self.write_action_exception(action_item_id, instance_id, data)
            .await
    }

    async fn cancel_occurrence(
        &self,
        event_id: Uuid,
        instance_id: Uuid,
    ) -> Result<EventException, CoreError> {
        self.write_event_exception(
            event_id,
            instance_id,
            EventOverrideData {
                is_cancelled: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    async fn restore_occurrence(
        &self,
        event_id: Uuid,
        instance_id: Uuid,
    ) -> Result<EventException, CoreError> {
        self.write_event_exception(
            event_id,
            instance_id,
            EventOverrideData {
                is_cancelled: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    async fn mark_action_deleted(
        &self,
        action_item_id: Uuid,
        instance_id: Uuid,
    ) -> Result<ActionItemException, CoreError> {
        self.write_action_exception(
            action_item_id,
            instance_id,
            ActionOverrideData {
                is_deleted: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    async fn mark_action_pending(
        &self,
        action_item_id: Uuid,
        instance_id: Uuid,
    ) -> Result<ActionItemException, CoreError> {
        self.write_action_exception(
            action_item_id,
            instance_id,
            ActionOverrideData {
                is_completed: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    async fn find_event_exception(
        &self,
        event_id: Uuid,
        instance_id: Uuid,
    ) -> Result<Option<EventException>, CoreError> {
        let exception = sqlx::query_as(
            "SELECT * FROM event_exceptions WHERE event_id = $1 AND instance_id = $2",
        )
        .bind(event_id)
        .bind(instance_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(exception)
    }

    async fn list_event_exceptions(&self, event_id: Uuid) -> Result<Vec<EventException>, CoreError> {
        let exceptions = sqlx::query_as(
            r#"SELECT e.* FROM event_exceptions e
            JOIN event_instances i ON i.id = e.instance_id
            WHERE e.event_id = $1
            ORDER BY i.occurrence_date"#,
        )
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        Ok(exceptions)
    }

    async fn list_action_exceptions_for_instance(
        &self,
        instance_id: Uuid,
    ) -> Result<Vec<ActionItemException>, CoreError> {
        let exceptions = sqlx::query_as(
            "SELECT * FROM action_item_exceptions WHERE instance_id = $1 ORDER BY created_at",
        )
        .bind(instance_id)
        .fetch_all(self.pool())
        .await?;
        Ok(exceptions)
    }
}

impl SqliteRepository {
    /// Validate that the instance exists and belongs to the claimed event.
    async fn require_instance_of_event(
        &self,
        event_id: Uuid,
        instance_id: Uuid,
    ) -> Result<EventInstance, CoreError> {
        let event_exists = sqlx::query("SELECT 1 FROM recurring_events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(self.pool())
            .await?
            .is_some();
        if !event_exists {
            return Err(CoreError::NotFound(format!(
                "Event with id {} not found",
                event_id
            )));
        }

        let instance: EventInstance =
            sqlx::query_as("SELECT * FROM event_instances WHERE id = $1")
                .bind(instance_id)
                .fetch_optional(self.pool())
                .await?
                .ok_or_else(|| {
                    CoreError::NotFound(format!("Instance with id {} not found", instance_id))
                })?;

        if instance.event_id != event_id {
            return Err(CoreError::Forbidden(format!(
                "Instance {} does not belong to event {}",
                instance_id, event_id
            )));
        }

        Ok(instance)
    }

    /// Writes the supplied override columns for one occurrence of an event,
    /// merging into the existing row when one exists. A single statement,
    /// so concurrent writers cannot interleave partial merges.
    async fn write_event_exception(
        &self,
        event_id: Uuid,
        instance_id: Uuid,
        data: EventOverrideData,
    ) -> Result<EventException, CoreError> {
        if data.is_empty() {
            return Err(
                ValidationError::single("changes", "at least one field must be supplied").into(),
            );
        }
        self.require_instance_of_event(event_id, instance_id).await?;

        let now = Utc::now();
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO event_exceptions (id, event_id, instance_id, name, description, location, is_cancelled, created_at, updated_at) VALUES (",
        );
        {
            let mut values = qb.separated(", ");
            values.push_bind(Uuid::now_v7());
            values.push_bind(event_id);
            values.push_bind(instance_id);
            values.push_bind(data.name.clone());
            values.push_bind(data.description.clone().flatten());
            values.push_bind(data.location.clone().flatten());
            values.push_bind(data.is_cancelled);
            values.push_bind(now);
            values.push_bind(now);
        }
        qb.push(") ON CONFLICT (event_id, instance_id) DO UPDATE SET updated_at = ");
        qb.push_bind(now);
        if let Some(name) = data.name {
            qb.push(", name = ");
            qb.push_bind(name);
        }
        if let Some(description) = data.description {
            qb.push(", description = ");
            qb.push_bind(description);
        }
        if let Some(location) = data.location {
            qb.push(", location = ");
            qb.push_bind(location);
        }
        if let Some(is_cancelled) = data.is_cancelled {
            qb.push(", is_cancelled = ");
            qb.push_bind(is_cancelled);
        }
        qb.push(" RETURNING *");

        let exception: EventException = qb.build_query_as().fetch_one(self.pool()).await?;
        Ok(exception)
    }

    async fn write_action_exception(
        &self,
        action_item_id: Uuid,
        instance_id: Uuid,
        data: ActionOverrideData,
    ) -> Result<ActionItemException, CoreError> {
        if data.is_empty() {
            return Err(
                ValidationError::single("changes", "at least one field must be supplied").into(),
            );
        }

        let item: ActionItem = sqlx::query_as("SELECT * FROM action_items WHERE id = $1")
            .bind(action_item_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("Action item with id {} not found", action_item_id))
            })?;

        let instance: EventInstance =
            sqlx::query_as("SELECT * FROM event_instances WHERE id = $1")
                .bind(instance_id)
                .fetch_optional(self.pool())
                .await?
                .ok_or_else(|| {
                    CoreError::NotFound(format!("Instance with id {} not found", instance_id))
                })?;

        if instance.event_id != item.event_id {
            return Err(CoreError::Forbidden(format!(
                "Instance {} does not belong to the event of action item {}",
                instance_id, action_item_id
            )));
        }

        let now = Utc::now();
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO action_item_exceptions (id, action_item_id, instance_id, assignee_id, category_id, pre_completion_notes, is_completed, is_deleted, created_at, updated_at) VALUES (",
        );
        {
            let mut values = qb.separated(", ");
            values.push_bind(Uuid::now_v7());
            values.push_bind(action_item_id);
            values.push_bind(instance_id);
            values.push_bind(data.assignee_id.clone().flatten());
            values.push_bind(data.category_id.clone().flatten());
            values.push_bind(data.pre_completion_notes.clone().flatten());
            values.push_bind(data.is_completed);
            values.push_bind(data.is_deleted);
            values.push_bind(now);
            values.push_bind(now);
        }
        qb.push(") ON CONFLICT (action_item_id, instance_id) DO UPDATE SET updated_at = ");
        qb.push_bind(now);
        if let Some(assignee_id) = data.assignee_id {
            qb.push(", assignee_id = ");
            qb.push_bind(assignee_id);
        }
        if let Some(category_id) = data.category_id {
            qb.push(", category_id = ");
            qb.push_bind(category_id);
        }
        if let Some(pre_completion_notes) = data.pre_completion_notes {
            qb.push(", pre_completion_notes = ");
            qb.push_bind(pre_completion_notes);
        }
        if let Some(is_completed) = data.is_completed {
            qb.push(", is_completed = ");
            qb.push_bind(is_completed);
        }
        if let Some(is_deleted) = data.is_deleted {
            qb.push(", is_deleted = ");
            qb.push_bind(is_deleted);
        }
        qb.push(" RETURNING *");

        let exception: ActionItemException = qb.build_query_as().fetch_one(self.pool()).await?;
        Ok(exception)
    }
}
