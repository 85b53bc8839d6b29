use crate::error::{CoreError, ValidationError};
use crate::models::{ActionItem, ActionItemException, EventInstance, NewActionItemData};
use crate::projection::{self, ActionItemView};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
impl super::ActionItemRepository for SqliteRepository {
    async fn add_action_item(&self, data: NewActionItemData) -> Result<ActionItem, CoreError> {
        if data.title.trim().is_empty() {
            return Err(ValidationError::single("title", "must not be empty").into());
        }

        let event_exists = sqlx::query("SELECT 1 FROM recurring_events WHERE id = $1")
            .bind(data.event_id)
            .fetch_optional(self.pool())
            .await?
            .is_some();
        if !event_exists {
            return Err(CoreError::NotFound(format!(
                "Event with id {} not found",
                data.event_id
            )));
        }

        let item: ActionItem = sqlx::query_as(
            r#"INSERT INTO action_items
            (id, event_id, title, assignee_id, category_id, pre_completion_notes, is_completed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *"#,
        )
        .bind(Uuid::now_v7())
        .bind(data.event_id)
        .bind(&data.title)
        .bind(data.assignee_id)
        .bind(data.category_id)
        .bind(&data.pre_completion_notes)
        .bind(false)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(item)
    }

    async fn find_action_item_by_id(&self, id: Uuid) -> Result<Option<ActionItem>, CoreError> {
        let item = sqlx::query_as("SELECT * FROM action_items WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(item)
    }

    async fn find_action_items_by_id_prefix(&self, prefix: &str) -> Result<Vec<ActionItem>, CoreError> {
        let items: Vec<ActionItem> =
            sqlx::query_as("SELECT * FROM action_items WHERE hex(id) LIKE $1")
                .bind(Self::id_prefix_pattern(prefix))
                .fetch_all(self.pool())
                .await?;
        Ok(items)
    }

    async fn list_action_items(&self, event_id: Uuid) -> Result<Vec<ActionItem>, CoreError> {
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

        let items = sqlx::query_as(
            "SELECT * FROM action_items WHERE event_id = $1 ORDER BY created_at",
        )
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        Ok(items)
    }

    async fn remove_action_item(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM action_item_exceptions WHERE action_item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM action_items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "Action item with id {} not found",
                id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_action_items_for_instance(
        &self,
        instance_id: Uuid,
    ) -> Result<Vec<ActionItemView>, CoreError> {
        let instance: EventInstance =
            sqlx::query_as("SELECT * FROM event_instances WHERE id = $1")
                .bind(instance_id)
                .fetch_optional(self.pool())
                .await?
                .ok_or_else(|| {
                    CoreError::NotFound(format!("Instance with id {} not found", instance_id))
                })?;

        let items: Vec<ActionItem> = sqlx::query_as(
            "SELECT * FROM action_items WHERE event_id = $1 ORDER BY created_at",
        )
        .bind(instance.event_id)
        .fetch_all(self.pool())
        .await?;

        let exceptions: Vec<ActionItemException> = sqlx::query_as(
            "SELECT * FROM action_item_exceptions WHERE instance_id = $1",
        )
        .bind(instance_id)
        .fetch_all(self.pool())
        .await?;

        let by_item: HashMap<Uuid, ActionItemException> = exceptions
            .into_iter()
            .map(|e| (e.action_item_id, e))
            .collect();

        let views = items
            .iter()
            .filter_map(|item| projection::project_action_item(item, by_item.get(&item.id)))
            .collect();
        Ok(views)
    }
}
