use anyhow::Result;
use cadence_core::models::{NewEventData, RulePayload};
use cadence_core::repository::Repository;
use chrono::Utc;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;
use crate::util::{parse_date, parse_month_days, parse_months, parse_weekdays};

pub async fn add_event(repo: &impl Repository, command: AddCommand) -> Result<()> {
    let start_at = match &command.start {
        Some(start) => parse_date(start)?,
        None => Utc::now(),
    };

    let rule = build_rule_payload(&command)?;
    let event = repo
        .create_event(NewEventData {
            name: command.name,
            description: command.description,
            location: command.location,
            start_at,
            duration_minutes: command.duration,
            rule,
        })
        .await?;

    let rule = repo.find_rule_by_id(event.rule_id).await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    let subtle_style = Style::new().bright_black();

    println!(
        "{} Created recurring event: {}",
        "✓".style(success_style),
        event.name.bright_white().bold()
    );
    println!(
        "  {} Event ID: {}",
        "→".style(info_style),
        event.id.to_string().yellow()
    );
    if let Some(rule) = rule {
        println!("  {} Repeats: {}", "→".style(info_style), rule.describe());
    }
    println!(
        "  {} First occurrence on or after: {}",
        "→".style(info_style),
        event.start_at.format("%Y-%m-%d %H:%M").to_string().cyan()
    );

    println!("\n{} Next steps:", "💡".style(subtle_style));
    println!(
        "   {} Show the agenda: cadence occurrences {}",
        "•".style(subtle_style),
        event.id.to_string().yellow()
    );
    println!(
        "   {} Preview upcoming dates: cadence preview {}",
        "•".style(subtle_style),
        event.id.to_string().yellow()
    );

    Ok(())
}

/// Assemble the rule payload from the schedule flags. Cross-field rules are
/// left to the engine's validator so every problem is reported at once.
fn build_rule_payload(command: &AddCommand) -> Result<RulePayload> {
    let mut payload = command.every.base_payload();
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
    Ok(payload)
}
