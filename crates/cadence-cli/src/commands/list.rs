use anyhow::Result;
use cadence_core::recurrence;
use cadence_core::repository::Repository;
use chrono::Utc;

use crate::views::table::{display_events, ViewEvent};

pub async fn list_events(repo: &impl Repository) -> Result<()> {
    let events = repo.list_events().await?;

    let now = Utc::now();
    let mut view_events = Vec::with_capacity(events.len());
    for event in events {
        let rule = repo.find_rule_by_id(event.rule_id).await?;
        let (schedule, next) = match rule {
            Some(rule) => {
                let next = recurrence::next_occurrence_after(&rule, event.anchor_date(), now)
                    .map(|o| event.occurrence_start_at(o.date));
                (rule.describe(), next)
            }
            None => ("unknown".to_string(), None),
        };
        view_events.push(ViewEvent {
            id: event.id,
            name: event.name,
            schedule,
            start_at: event.start_at,
            duration_minutes: event.duration_minutes,
            location: event.location,
            next,
        });
    }

    display_events(&view_events);

    Ok(())
}
