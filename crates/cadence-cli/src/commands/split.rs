use anyhow::{anyhow, Result};
use cadence_core::models::{RulePayload, SplitData, UpdateEventData};
use cadence_core::repository::Repository;
use owo_colors::{OwoColorize, Style};

use crate::cli::SplitCommand;
use crate::util::{parse_date, parse_month_days, parse_months, parse_weekdays, resolve_event_id};

pub async fn split_event(repo: &impl Repository, command: SplitCommand) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;
    let cut_date = parse_date(&command.at)?;

    let rule = build_replacement_rule(&command)?;

    let description = if command.description_clear {
        Some(None)
    } else {
        command.description.clone().map(Some)
    };
    let location = if command.location_clear {
        Some(None)
    } else {
        command.location.clone().map(Some)
    };
    let changes = UpdateEventData {
        name: command.name.clone(),
        description,
        location,
        duration_minutes: command.duration,
    };

    let successor = repo
        .split_event(event_id, cut_date, SplitData { rule, changes })
        .await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();

    println!(
        "{} Split series at {}",
        "✓".style(success_style),
        cut_date.format("%Y-%m-%d").to_string().cyan()
    );
    println!(
        "  {} Earlier occurrences stay on: {}",
        "→".style(info_style),
        event_id.to_string().yellow()
    );
    println!(
        "  {} From the cut on, the series continues as: {}",
        "→".style(info_style),
        successor.id.to_string().yellow()
    );
    if let Some(rule) = repo.find_rule_by_id(successor.rule_id).await? {
        println!("  {} New schedule: {}", "→".style(info_style), rule.describe());
    }

    Ok(())
}

/// A replacement rule is only built when schedule flags were given; the
/// predecessor's rule is copied otherwise.
fn build_replacement_rule(command: &SplitCommand) -> Result<Option<RulePayload>> {
    let has_schedule_flags = command.interval.is_some()
        || command.on.is_some()
        || command.months.is_some()
        || command.month_days.is_some()
        || command.until.is_some()
        || command.count.is_some()
        || command.forever;

    let Some(shortcut) = command.every else {
        if has_schedule_flags {
            return Err(anyhow!(
                "Schedule flags need --every to say what the new schedule repeats on"
            ));
        }
        return Ok(None);
    };

    let mut payload = shortcut.base_payload();
    payload.interval = command.interval;
    if let Some(on) = &command.on {
        payload.by_day = parse_weekdays(on)?;
    }
    if let Some(months) = &command.months {
        payload.by_month = parse_months(months)?;
    }
    if let Some(month_days) = &command.month_days {
        payload.by_month_day = parse_month_days(month_days)?;
    }
    if let Some(until) = &command.until {
        payload.end_date = Some(parse_date(until)?);
    }
    payload.count = command.count;
    payload.never = command.forever;
    Ok(Some(payload))
}
