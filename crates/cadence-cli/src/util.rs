use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::models::EventInstance;
use cadence_core::repository::Repository;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use chrono_english::{parse_date_string, Dialect};
use uuid::Uuid;

pub async fn resolve_event_id(repo: &impl Repository, short_id: &str) -> Result<Uuid> {
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    let events = repo.find_events_by_id_prefix(short_id).await?;
    if events.len() == 1 {
        Ok(events[0].id)
    } else if events.is_empty() {
        Err(anyhow!(CoreError::NotFound(format!(
            "No event found with ID prefix '{}'",
            short_id
        ))))
    } else {
        let event_info: Vec<(String, String)> = events
            .into_iter()
            .map(|e| (e.id.to_string(), e.name))
            .collect();
        Err(anyhow!(CoreError::AmbiguousId(event_info)))
    }
}

pub async fn resolve_action_item_id(repo: &impl Repository, short_id: &str) -> Result<Uuid> {
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    let items = repo.find_action_items_by_id_prefix(short_id).await?;
    if items.len() == 1 {
        Ok(items[0].id)
    } else if items.is_empty() {
        Err(anyhow!(CoreError::NotFound(format!(
            "No action item found with ID prefix '{}'",
            short_id
        ))))
    } else {
        let item_info: Vec<(String, String)> = items
            .into_iter()
            .map(|i| (i.id.to_string(), i.title))
            .collect();
        Err(anyhow!(CoreError::AmbiguousId(item_info)))
    }
}

/// Resolves an `--on <date>` flag to the occurrence's instance row, creating
/// it when it does not exist yet.
pub async fn resolve_instance(
    repo: &impl Repository,
    event_id: Uuid,
    date_str: &str,
) -> Result<EventInstance> {
    let date = parse_date(date_str)?;
    Ok(repo.ensure_instance(event_id, date).await?)
}

/// Parses a date or date-time. Plain ISO forms are tried first so scripted
/// input never depends on the natural-language dialect.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    if let Ok(date_time) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M") {
        return Ok(date_time.and_utc());
    }
    if let Ok(date_time) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(date_time.and_utc());
    }
    parse_date_string(trimmed, Utc::now(), Dialect::Us)
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", input, e))
}

/// Parse days string like "mon,tue,wed", "monday,tuesday", or "weekdays"
pub fn parse_weekdays(days_str: &str) -> Result<Vec<Weekday>> {
    let input = days_str.trim().to_lowercase();

    // Handle special day groups
    match input.as_str() {
        "weekdays" | "workdays" => {
            return Ok(vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]);
        }
        "weekends" => {
            return Ok(vec![Weekday::Sat, Weekday::Sun]);
        }
        _ => {}
    }

    let mut weekdays = Vec::new();
    let mut invalid_days = Vec::new();

    for day in input.split(',') {
        let day = day.trim();
        if day.is_empty() {
            continue;
        }

        let weekday = match day {
            "mon" | "monday" | "m" => Weekday::Mon,
            "tue" | "tuesday" | "tu" => Weekday::Tue,
            "wed" | "wednesday" | "w" => Weekday::Wed,
            "thu" | "thursday" | "th" => Weekday::Thu,
            "fri" | "friday" | "f" => Weekday::Fri,
            "sat" | "saturday" | "sa" => Weekday::Sat,
            "sun" | "sunday" | "su" => Weekday::Sun,
            _ => {
                invalid_days.push(day.to_string());
                continue;
            }
        };

        if !weekdays.contains(&weekday) {
            weekdays.push(weekday);
        }
    }

    if !invalid_days.is_empty() {
        return Err(anyhow!(
            "Invalid day(s): {}\n\nSupported formats:\n  • Full names: 'monday,tuesday,wednesday'\n  • Short names: 'mon,tue,wed'\n  • Single letters: 'm,tu,w,th,f,sa,su'\n  • Groups: 'weekdays', 'weekends'",
            invalid_days.join(", ")
        ));
    }

    if weekdays.is_empty() {
        return Err(anyhow!(
            "No valid days specified in: '{}'\n\nExamples:\n  • mon,wed,fri\n  • weekdays",
            days_str
        ));
    }

    Ok(weekdays)
}

/// Parse a comma-separated month list like "1,4,7,10"
pub fn parse_months(months_str: &str) -> Result<Vec<u32>> {
    let mut months = Vec::new();
    for part in months_str.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let month: u32 = part
            .parse()
            .map_err(|_| anyhow!("Invalid month '{}': expected a number between 1 and 12", part))?;
        if !months.contains(&month) {
            months.push(month);
        }
    }
    if months.is_empty() {
        return Err(anyhow!("No valid months specified in: '{}'", months_str));
    }
    Ok(months)
}

/// Parse a comma-separated month-day list like "1,15,-1"
pub fn parse_month_days(days_str: &str) -> Result<Vec<i32>> {
    let mut days = Vec::new();
    for part in days_str.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let day: i32 = part.parse().map_err(|_| {
            anyhow!(
                "Invalid month day '{}': expected a number like 15 or -1",
                part
            )
        })?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    if days.is_empty() {
        return Err(anyhow!("No valid month days specified in: '{}'", days_str));
    }
    Ok(days)
}

pub fn parse_optional_uuid(input: Option<&String>, what: &str) -> Result<Option<Uuid>> {
    input
        .map(|raw| {
            raw.parse::<Uuid>()
                .map_err(|_| anyhow!("Invalid {} ID: '{}'", what, raw))
        })
        .transpose()
}
