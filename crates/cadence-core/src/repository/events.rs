use crate::error::{CoreError, ValidationError, Violation};
use crate::models::{
    EventInstance, NewEventData, RecurrenceRule, RecurringEvent, SplitData, UpdateEventData,
};
use crate::recurrence;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use tracing::info;
use uuid::Uuid;

#[async_trait]
impl super::EventRepository for SqliteRepository {
    async fn create_event(&self, data: NewEventData) -> Result<RecurringEvent, CoreError> {
        let mut violations = Vec::new();
        if data.name.trim().is_empty() {
            violations.push(Violation {
                field: "name",
                message: "must not be empty".to_string(),
            });
        }
        if data.duration_minutes <= 0 {
            violations.push(Violation {
                field: "duration_minutes",
                message: format!("must be positive, got {}", data.duration_minutes),
            });
        }
        let rule = match data.rule.validate() {
            Ok(rule) => rule,
            Err(e) => {
                violations.extend(e.violations);
                return Err(ValidationError::new(violations).into());
            }
        };
        if !violations.is_empty() {
            return Err(ValidationError::new(violations).into());
        }

        let mut tx = self.pool().begin().await?;

        Self::insert_rule_in_transaction(&mut tx, &rule).await?;

        let event_id = Uuid::now_v7();
        let now = Utc::now();
        let event: RecurringEvent = sqlx::query_as(
            r#"INSERT INTO recurring_events
            (id, name, description, location, start_at, duration_minutes, rule_id, original_series_id, last_materialized_until, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, $9, $9)
            RETURNING *"#,
        )
        .bind(event_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.start_at)
        .bind(data.duration_minutes)
        .bind(rule.id)
        // A fresh event starts its own lineage.
        .bind(event_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let (from, until) = self.materialization_manager().default_window();
        Self::materialize_window_in_transaction(
            &mut tx,
            &event,
            &rule,
            from,
            until,
            self.materialization_manager().max_batch_size(),
        )
        .await?;

        let event: RecurringEvent = sqlx::query_as("SELECT * FROM recurring_events WHERE id = $1")
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(event = %event.id, rule = %rule.describe(), "created recurring event");
        Ok(event)
    }

    async fn find_event_by_id(&self, id: Uuid) -> Result<Option<RecurringEvent>, CoreError> {
        let event = sqlx::query_as("SELECT * FROM recurring_events WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(event)
    }

    async fn find_events_by_id_prefix(&self, prefix: &str) -> Result<Vec<RecurringEvent>, CoreError> {
        let events: Vec<RecurringEvent> =
            sqlx::query_as("SELECT * FROM recurring_events WHERE hex(id) LIKE $1")
                .bind(Self::id_prefix_pattern(prefix))
                .fetch_all(self.pool())
                .await?;
        Ok(events)
    }

    async fn list_events(&self) -> Result<Vec<RecurringEvent>, CoreError> {
        let events = sqlx::query_as("SELECT * FROM recurring_events ORDER BY created_at")
            .fetch_all(self.pool())
            .await?;
        Ok(events)
    }

    async fn find_rule_by_id(&self, id: Uuid) -> Result<Option<RecurrenceRule>, CoreError> {
        let rule = sqlx::query_as("SELECT * FROM recurrence_rules WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(rule)
    }

    async fn update_event(&self, id: Uuid, data: UpdateEventData) -> Result<RecurringEvent, CoreError> {
        if data.is_empty() {
            return Err(
                ValidationError::single("changes", "at least one field must be supplied").into(),
            );
        }
        if let Some(name) = &data.name {
            if name.trim().is_empty() {
                return Err(ValidationError::single("name", "must not be empty").into());
            }
        }
        if let Some(duration) = data.duration_minutes {
            if duration <= 0 {
                return Err(ValidationError::single(
                    "duration_minutes",
                    format!("must be positive, got {}", duration),
                )
                .into());
            }
        }

        let mut tx = self.pool().begin().await?;

        let _current: RecurringEvent = sqlx::query_as("SELECT * FROM recurring_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Event with id {} not found", id)))?;

        Self::update_event_fields(&mut tx, id, &data).await?;

        let updated: RecurringEvent = sqlx::query_as("SELECT * FROM recurring_events WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        let event: RecurringEvent = sqlx::query_as("SELECT * FROM recurring_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Event with id {} not found", id)))?;

        sqlx::query(
            "DELETE FROM action_item_exceptions WHERE action_item_id IN (SELECT id FROM action_items WHERE event_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM event_exceptions WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM action_items WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM event_instances WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM recurring_events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM recurrence_rules WHERE id = $1")
            .bind(event.rule_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn split_event(
        &self,
        id: Uuid,
        cut_date: DateTime<Utc>,
        data: SplitData,
    ) -> Result<RecurringEvent, CoreError> {
        if let Some(name) = &data.changes.name {
            if name.trim().is_empty() {
                return Err(ValidationError::single("name", "must not be empty").into());
            }
        }
        if let Some(duration) = data.changes.duration_minutes {
            if duration <= 0 {
                return Err(ValidationError::single(
                    "duration_minutes",
                    format!("must be positive, got {}", duration),
                )
                .into());
            }
        }

        let cut = recurrence::utc_midnight(cut_date);
        let mut tx = self.pool().begin().await?;

        let event: RecurringEvent = sqlx::query_as("SELECT * FROM recurring_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Event with id {} not found", id)))?;

        let rule: RecurrenceRule = sqlx::query_as("SELECT * FROM recurrence_rules WHERE id = $1")
            .bind(event.rule_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("Rule with id {} not found", event.rule_id))
            })?;

        if cut <= event.anchor_date() {
            return Err(CoreError::Forbidden(format!(
                "Cut date {} must fall after the series start {}",
                cut.format("%Y-%m-%d"),
                event.anchor_date().format("%Y-%m-%d"),
            )));
        }
        // The cut must leave something to hand over; a series that already
        // ended before it cannot be split there.
        if recurrence::next_occurrence_after(&rule, event.anchor_date(), cut - Duration::days(1))
            .is_none()
        {
            return Err(CoreError::Forbidden(format!(
                "Series {} has no occurrences on or after {}",
                id,
                cut.format("%Y-%m-%d"),
            )));
        }

        let successor_rule = match data.rule {
            Some(payload) => payload.validate()?,
            None => rule.duplicate(),
        };
        Self::insert_rule_in_transaction(&mut tx, &successor_rule).await?;

        let successor_id = Uuid::now_v7();
        let now = Utc::now();
        let name = data.changes.name.clone().unwrap_or_else(|| event.name.clone());
        let description = match &data.changes.description {
            Some(description) => description.clone(),
            None => event.description.clone(),
        };
        let location = match &data.changes.location {
            Some(location) => location.clone(),
            None => event.location.clone(),
        };
        let duration_minutes = data.changes.duration_minutes.unwrap_or(event.duration_minutes);

        let successor: RecurringEvent = sqlx::query_as(
            r#"INSERT INTO recurring_events
            (id, name, description, location, start_at, duration_minutes, rule_id, original_series_id, last_materialized_until, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, $9, $9)
            RETURNING *"#,
        )
        .bind(successor_id)
        .bind(&name)
        .bind(&description)
        .bind(&location)
        // The successor is anchored at the cut, keeping the time of day.
        .bind(event.occurrence_start_at(cut))
        .bind(duration_minutes)
        .bind(successor_rule.id)
        .bind(event.original_series_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        // Truncate the predecessor's rule so its last occurrence falls
        // before the cut. A count budget no longer applies once an explicit
        // end date is in place.
        sqlx::query(
            "UPDATE recurrence_rules SET end_date = $1, count = NULL, updated_at = $2 WHERE id = $3",
        )
        .bind(cut - Duration::days(1))
        .bind(now)
        .bind(rule.id)
        .execute(&mut *tx)
        .await?;

        // Instances from the cut onward belong to the successor now; drop
        // the predecessor's copies along with their overlays. Everything
        // before the cut stays untouched.
        sqlx::query(
            "DELETE FROM action_item_exceptions WHERE instance_id IN (SELECT id FROM event_instances WHERE event_id = $1 AND occurrence_date >= $2)",
        )
        .bind(id)
        .bind(cut)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM event_exceptions WHERE instance_id IN (SELECT id FROM event_instances WHERE event_id = $1 AND occurrence_date >= $2)",
        )
        .bind(id)
        .bind(cut)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM event_instances WHERE event_id = $1 AND occurrence_date >= $2")
            .bind(id)
            .bind(cut)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE recurring_events SET updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let (from, until) = self.materialization_manager().default_window();
        Self::materialize_window_in_transaction(
            &mut tx,
            &successor,
            &successor_rule,
            from,
            until,
            self.materialization_manager().max_batch_size(),
        )
        .await?;

        let successor: RecurringEvent = sqlx::query_as("SELECT * FROM recurring_events WHERE id = $1")
            .bind(successor_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            predecessor = %event.id,
            successor = %successor.id,
            cut = %cut.format("%Y-%m-%d"),
            "split series",
        );
        Ok(successor)
    }

    async fn split_at_instance(
        &self,
        id: Uuid,
        cut_instance_id: Uuid,
        data: SplitData,
    ) -> Result<RecurringEvent, CoreError> {
        let instance: EventInstance =
            sqlx::query_as("SELECT * FROM event_instances WHERE id = $1")
                .bind(cut_instance_id)
                .fetch_optional(self.pool())
                .await?
                .ok_or_else(|| {
                    CoreError::NotFound(format!("Instance with id {} not found", cut_instance_id))
                })?;

        if instance.event_id != id {
            return Err(CoreError::Forbidden(format!(
                "Instance {} does not belong to event {}",
                cut_instance_id, id
            )));
        }

        self.split_event(id, instance.occurrence_date, data).await
    }
}

impl SqliteRepository {
    /// Persist a validated rule within an existing transaction.
    pub(crate) async fn insert_rule_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        rule: &RecurrenceRule,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO recurrence_rules
            (id, frequency, interval, by_day, by_month, by_month_day, end_date, count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(rule.id)
        .bind(rule.frequency)
        .bind(rule.interval)
        .bind(rule.by_day_json())
        .bind(rule.by_month_json())
        .bind(rule.by_month_day_json())
        .bind(rule.end_date())
        .bind(rule.count())
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub(crate) async fn update_event_fields(
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        data: &UpdateEventData,
    ) -> Result<(), CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE recurring_events SET ");
        let mut updated = false;

        if let Some(name) = &data.name {
            qb.push("name = ");
            qb.push_bind(name.clone());
            updated = true;
        }

        if let Some(description) = &data.description {
            if updated {
                qb.push(", ");
            }
            qb.push("description = ");
            qb.push_bind(description.clone());
            updated = true;
        }

        if let Some(location) = &data.location {
            if updated {
                qb.push(", ");
            }
            qb.push("location = ");
            qb.push_bind(location.clone());
            updated = true;
        }

        if let Some(duration_minutes) = data.duration_minutes {
            if updated {
                qb.push(", ");
            }
            qb.push("duration_minutes = ");
            qb.push_bind(duration_minutes);
            updated = true;
        }

        if updated {
            qb.push(", updated_at = ");
            qb.push_bind(Utc::now());
            qb.push(" WHERE id = ");
            qb.push_bind(id);
            qb.build().execute(&mut **tx).await?;
        }

        Ok(())
    }
}
