use crate::error::CoreError;
use crate::models::{EventException, EventInstance, RecurrenceRule, RecurringEvent};
use crate::projection::{self, OccurrenceView};
use crate::recurrence;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

#[async_trait]
impl super::InstanceRepository for SqliteRepository {
    async fn ensure_instance(
        &self,
        event_id: Uuid,
        occurrence_date: DateTime<Utc>,
    ) -> Result<EventInstance, CoreError> {
        let date = recurrence::utc_midnight(occurrence_date);

        let event: RecurringEvent = sqlx::query_as("SELECT * FROM recurring_events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Event with id {} not found", event_id)))?;

        let rule: RecurrenceRule = sqlx::query_as("SELECT * FROM recurrence_rules WHERE id = $1")
            .bind(event.rule_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("Rule with id {} not found", event.rule_id))
            })?;

        let sequence = recurrence::occurrence_on(&rule, event.anchor_date(), date)
            .map(|o| i64::from(o.sequence));

        // Two passes: the second covers the window where a concurrent delete
        // removed the row between our insert and the re-read.
        for _ in 0..2 {
            if let Some(instance) = self.insert_or_fetch_instance(&event, date, sequence).await? {
                return Ok(instance);
            }
        }

        Err(CoreError::Conflict(format!(
            "Instance for event {} on {} could not be settled",
            event_id,
            date.format("%Y-%m-%d"),
        )))
    }

    async fn find_instance_by_id(&self, id: Uuid) -> Result<Option<EventInstance>, CoreError> {
        let instance = sqlx::query_as("SELECT * FROM event_instances WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(instance)
    }

    async fn find_instances_by_id_prefix(&self, prefix: &str) -> Result<Vec<EventInstance>, CoreError> {
        let instances: Vec<EventInstance> =
            sqlx::query_as("SELECT * FROM event_instances WHERE hex(id) LIKE $1")
                .bind(Self::id_prefix_pattern(prefix))
                .fetch_all(self.pool())
                .await?;
        Ok(instances)
    }

    async fn list_instances_in_window(
        &self,
        event_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<EventInstance>, CoreError> {
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

        let instances = sqlx::query_as(
            r#"SELECT * FROM event_instances
            WHERE event_id = $1
            AND occurrence_date BETWEEN $2 AND $3
            ORDER BY occurrence_date"#,
        )
        .bind(event_id)
        .bind(recurrence::utc_midnight(from))
        .bind(recurrence::utc_midnight(until))
        .fetch_all(self.pool())
        .await?;
        Ok(instances)
    }

    async fn materialize_window(
        &self,
        event_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<usize, CoreError> {
        let mut tx = self.pool().begin().await?;

        let event: RecurringEvent = sqlx::query_as("SELECT * FROM recurring_events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Event with id {} not found", event_id)))?;

        let rule: RecurrenceRule = sqlx::query_as("SELECT * FROM recurrence_rules WHERE id = $1")
            .bind(event.rule_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("Rule with id {} not found", event.rule_id))
            })?;

        let created = Self::materialize_window_in_transaction(
            &mut tx,
            &event,
            &rule,
            from,
            until,
            self.materialization_manager().max_batch_size(),
        )
        .await?;

        tx.commit().await?;

        if created > 0 {
            debug!(event = %event_id, created, "materialized instances");
        }
        Ok(created)
    }

    async fn list_occurrences_in_window(
        &self,
        event_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<OccurrenceView>, CoreError> {
        let mut tx = self.pool().begin().await?;

        let event: RecurringEvent = sqlx::query_as("SELECT * FROM recurring_events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Event with id {} not found", event_id)))?;

        let rule: RecurrenceRule = sqlx::query_as("SELECT * FROM recurrence_rules WHERE id = $1")
            .bind(event.rule_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("Rule with id {} not found", event.rule_id))
            })?;

        Self::materialize_window_in_transaction(
            &mut tx,
            &event,
            &rule,
            from,
            until,
            self.materialization_manager().max_batch_size(),
        )
        .await?;

        let instances: Vec<EventInstance> = sqlx::query_as(
            r#"SELECT * FROM event_instances
            WHERE event_id = $1
            AND occurrence_date BETWEEN $2 AND $3
            ORDER BY occurrence_date"#,
        )
        .bind(event_id)
        .bind(recurrence::utc_midnight(from))
        .bind(recurrence::utc_midnight(until))
        .fetch_all(&mut *tx)
        .await?;

        let exceptions: Vec<EventException> =
            sqlx::query_as("SELECT * FROM event_exceptions WHERE event_id = $1")
                .bind(event_id)
                .fetch_all(&mut *tx)
                .await?;

        tx.commit().await?;

        let by_instance: HashMap<Uuid, EventException> = exceptions
            .into_iter()
            .map(|e| (e.instance_id, e))
            .collect();

        let views = instances
            .into_iter()
            .filter_map(|instance| {
                let exception = by_instance.get(&instance.id);
                projection::project_occurrence(&event, instance, exception)
            })
            .collect();
        Ok(views)
    }
}

impl SqliteRepository {
    /// One insert-then-read attempt for `ensure_instance`. The unique index
    /// on `(event_id, occurrence_date)` makes the insert a no-op when the
    /// row already exists, so both the creator and every racer read back the
    /// same row.
    async fn insert_or_fetch_instance(
        &self,
        event: &RecurringEvent,
        date: DateTime<Utc>,
        sequence: Option<i64>,
    ) -> Result<Option<EventInstance>, CoreError> {
        sqlx::query(
            r#"INSERT INTO event_instances
            (id, event_id, occurrence_date, start_at, end_at, sequence, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (event_id, occurrence_date) DO NOTHING"#,
        )
        .bind(Uuid::now_v7())
        .bind(event.id)
        .bind(date)
        .bind(event.occurrence_start_at(date))
        .bind(event.occurrence_end_at(date))
        .bind(sequence)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        let instance = sqlx::query_as(
            "SELECT * FROM event_instances WHERE event_id = $1 AND occurrence_date = $2",
        )
        .bind(event.id)
        .bind(date)
        .fetch_optional(self.pool())
        .await?;
        Ok(instance)
    }

    /// Create the instances the rule generates inside the window that are
    /// not materialized yet, within an existing transaction. Returns how
    /// many rows were created, capped at `max_batch`.
    pub(crate) async fn materialize_window_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        event: &RecurringEvent,
        rule: &RecurrenceRule,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        max_batch: usize,
    ) -> Result<usize, CoreError> {
        let from = recurrence::utc_midnight(from);
        let until = recurrence::utc_midnight(until);

        // Get existing materialized instances in this window
        let existing: Vec<EventInstance> = sqlx::query_as(
            r#"SELECT * FROM event_instances
            WHERE event_id = $1
            AND occurrence_date BETWEEN $2 AND $3"#,
        )
        .bind(event.id)
        .bind(from)
        .bind(until)
        .fetch_all(&mut **tx)
        .await?;

        let existing_dates: HashSet<DateTime<Utc>> =
            existing.iter().map(|i| i.occurrence_date).collect();

        let mut created = 0usize;
        for occurrence in recurrence::expand_between(rule, event.anchor_date(), from, until) {
            if created >= max_batch {
                break;
            }
            if existing_dates.contains(&occurrence.date) {
                continue; // Already materialized
            }

            sqlx::query(
                r#"INSERT INTO event_instances
                (id, event_id, occurrence_date, start_at, end_at, sequence, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                ON CONFLICT (event_id, occurrence_date) DO NOTHING"#,
            )
            .bind(Uuid::now_v7())
            .bind(event.id)
            .bind(occurrence.date)
            .bind(event.occurrence_start_at(occurrence.date))
            .bind(event.occurrence_end_at(occurrence.date))
            .bind(i64::from(occurrence.sequence))
            .bind(Utc::now())
            .execute(&mut **tx)
            .await?;

            created += 1;
        }

        // Advance the boundary so later refreshes can skip this stretch.
        if event.last_materialized_until.map_or(true, |boundary| until > boundary) {
            sqlx::query(
                "UPDATE recurring_events SET last_materialized_until = $1, updated_at = $2 WHERE id = $3",
            )
            .bind(until)
            .bind(Utc::now())
            .bind(event.id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(created)
    }
}
