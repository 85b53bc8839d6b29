use anyhow::{anyhow, Result};
use cadence_core::models::{EventOverrideData, Occurrence};
use cadence_core::recurrence;
use cadence_core::repository::Repository;
use chrono::{Duration, Utc};
use owo_colors::{OwoColorize, Style};

use crate::cli::{
    CancelCommand, ExceptionsCommand, MaterializeCommand, OccurrencesCommand, OverrideCommand,
    PreviewCommand, RestoreCommand,
};
use crate::config::Config;
use crate::util::{parse_date, resolve_event_id, resolve_instance};
use crate::views::table::{display_exceptions, display_occurrences, display_preview, ViewException};

pub async fn list_occurrences(
    repo: &impl Repository,
    command: OccurrencesCommand,
    config: &Config,
) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;
    let event = repo
        .find_event_by_id(event_id)
        .await?
        .ok_or_else(|| anyhow!("Event not found"))?;

    let from = match &command.from {
        Some(from) => parse_date(from)?,
        None => Utc::now(),
    };
    let to = match &command.to {
        Some(to) => parse_date(to)?,
        None => from + Duration::days(config.materialization.lookahead_days),
    };

    let views = repo.list_occurrences_in_window(event_id, from, to).await?;

    println!(
        "Occurrences of '{}' from {} to {}:",
        event.name.bold(),
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d"),
    );
    display_occurrences(&views);

    Ok(())
}

pub async fn preview_occurrences(repo: &impl Repository, command: PreviewCommand) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;
    let event = repo
        .find_event_by_id(event_id)
        .await?
        .ok_or_else(|| anyhow!("Event not found"))?;
    let rule = repo
        .find_rule_by_id(event.rule_id)
        .await?
        .ok_or_else(|| anyhow!("Rule not found"))?;

    let today = recurrence::utc_midnight(Utc::now());
    let upcoming: Vec<Occurrence> = recurrence::expand(&rule, event.anchor_date())
        .filter(|o| o.date >= today)
        .take(command.count)
        .collect();

    println!("Upcoming occurrences of '{}':", event.name.bold());
    display_preview(&upcoming);

    Ok(())
}

pub async fn cancel_occurrence(repo: &impl Repository, command: CancelCommand) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;
    let instance = resolve_instance(repo, event_id, &command.on).await?;

    repo.cancel_occurrence(event_id, instance.id).await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} Cancelled the occurrence on {}",
        "✓".style(success_style),
        instance.occurrence_date.format("%Y-%m-%d").to_string().cyan()
    );
    println!("  The rest of the series is untouched.");

    Ok(())
}

pub async fn restore_occurrence(repo: &impl Repository, command: RestoreCommand) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;
    let instance = resolve_instance(repo, event_id, &command.on).await?;

    repo.restore_occurrence(event_id, instance.id).await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} Restored the occurrence on {}",
        "✓".style(success_style),
        instance.occurrence_date.format("%Y-%m-%d").to_string().cyan()
    );

    Ok(())
}

pub async fn override_occurrence(repo: &impl Repository, command: OverrideCommand) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;
    let instance = resolve_instance(repo, event_id, &command.on).await?;

    let description = if command.description_clear {
        Some(None)
    } else {
        command.description.map(Some)
    };
    let location = if command.location_clear {
        Some(None)
    } else {
        command.location.map(Some)
    };

    repo.upsert_event_exception(
        event_id,
        instance.id,
        EventOverrideData {
            name: command.name,
            description,
            location,
            is_cancelled: None,
        },
    )
    .await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} Overrode the occurrence on {}",
        "✓".style(success_style),
        instance.occurrence_date.format("%Y-%m-%d").to_string().cyan()
    );
    println!("  Fields you did not pass still follow the series.");

    Ok(())
}

pub async fn list_exceptions(repo: &impl Repository, command: ExceptionsCommand) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;
    let event = repo
        .find_event_by_id(event_id)
        .await?
        .ok_or_else(|| anyhow!("Event not found"))?;

    let exceptions = repo.list_event_exceptions(event_id).await?;

    let mut views = Vec::with_capacity(exceptions.len());
    for exception in exceptions {
        let occurrence_date = repo
            .find_instance_by_id(exception.instance_id)
            .await?
            .map(|i| i.occurrence_date);
        views.push(ViewException {
            occurrence_date,
            cancelled: exception.is_cancelled == Some(true),
            name: exception.name,
            description: exception.description,
            location: exception.location,
        });
    }

    println!("Exceptions of '{}':", event.name.bold());
    display_exceptions(&views);

    Ok(())
}

pub async fn materialize(
    repo: &impl Repository,
    command: MaterializeCommand,
    config: &Config,
) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;

    let now = Utc::now();
    let from = match &command.from {
        Some(from) => parse_date(from)?,
        None => now - Duration::days(config.materialization.grace_days),
    };
    let to = match &command.to {
        Some(to) => parse_date(to)?,
        None => now + Duration::days(config.materialization.lookahead_days),
    };

    let created = repo.materialize_window(event_id, from, to).await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} Materialized {} new instance(s) between {} and {}",
        "✓".style(success_style),
        created.to_string().bright_white().bold(),
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d"),
    );

    Ok(())
}
