use crate::error::{ValidationError, Violation};
use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid frequency: {0}")]
pub struct ParseFrequencyError(String);

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid weekday token: {0}")]
pub struct ParseWeekdayError(String);

/// Parses a two-letter weekday token (`SU` through `SA`).
pub fn parse_weekday_token(s: &str) -> Result<Weekday, ParseWeekdayError> {
    match s.to_uppercase().as_str() {
        "SU" => Ok(Weekday::Sun),
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        _ => Err(ParseWeekdayError(s.to_string())),
    }
}

pub fn weekday_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "SU",
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
    }
}

/// How a rule stops producing occurrences. Exactly one mode per rule; the
/// payload validator enforces this before a rule can exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Absolute cutoff. A candidate equal to the cutoff date is still emitted.
    Until(DateTime<Utc>),
    /// Total number of occurrences, counting the anchor itself.
    Count(u32),
    /// Open-ended. Expansion must be bounded by the caller's window.
    Never,
}

/// Unvalidated recurrence input as received from the outer surface.
///
/// `validate` turns this into a [`RecurrenceRule`] or reports every field
/// violation found. Field semantics follow the stored rule; fields left
/// `None`/empty are defaulted or treated as absent.
#[derive(Debug, Clone, Default)]
pub struct RulePayload {
    pub frequency: Option<Frequency>,
    /// Every N frequency units, 1..=999. Defaults to 1.
    pub interval: Option<u32>,
    pub by_day: Vec<Weekday>,
    pub by_month: Vec<u32>,
    pub by_month_day: Vec<i32>,
    pub end_date: Option<DateTime<Utc>>,
    pub count: Option<u32>,
    pub never: bool,
}

impl RulePayload {
    /// Pure validation: no side effects, reports all violations at once.
    pub fn validate(&self) -> Result<RecurrenceRule, ValidationError> {
        let mut violations = Vec::new();

        let frequency = self.frequency;
        if frequency.is_none() {
            violations.push(Violation {
                field: "frequency",
                message: "a frequency is required".to_string(),
            });
        }

        let interval = self.interval.unwrap_or(1);
        if !(1..=999).contains(&interval) {
            violations.push(Violation {
                field: "interval",
                message: format!("must be between 1 and 999, got {}", interval),
            });
        }

        let termination_modes = usize::from(self.end_date.is_some())
            + usize::from(self.count.is_some())
            + usize::from(self.never);
        match termination_modes {
            1 => {}
            0 => violations.push(Violation {
                field: "termination",
                message: "exactly one of end_date, count or never must be set; none were"
                    .to_string(),
            }),
            _ => violations.push(Violation {
                field: "termination",
                message: "exactly one of end_date, count or never must be set; multiple were"
                    .to_string(),
            }),
        }

        if let Some(count) = self.count {
            if !(1..=999).contains(&count) {
                violations.push(Violation {
                    field: "count",
                    message: format!("must be between 1 and 999, got {}", count),
                });
            }
        }

        for month in &self.by_month {
            if !(1..=12).contains(month) {
                violations.push(Violation {
                    field: "by_month",
                    message: format!("months must be between 1 and 12, got {}", month),
                });
            }
        }

        for day in &self.by_month_day {
            if *day == 0 || !(-31..=31).contains(day) {
                violations.push(Violation {
                    field: "by_month_day",
                    message: format!(
                        "entries must be in -31..=31 and non-zero, got {}",
                        day
                    ),
                });
            }
        }

        if let Some(frequency) = frequency {
            if !self.by_day.is_empty()
                && !matches!(frequency, Frequency::Weekly | Frequency::Monthly)
            {
                violations.push(Violation {
                    field: "by_day",
                    message: format!("not applicable to {} rules", frequency),
                });
            }
            if !self.by_month.is_empty()
                && !matches!(frequency, Frequency::Monthly | Frequency::Yearly)
            {
                violations.push(Violation {
                    field: "by_month",
                    message: format!("not applicable to {} rules", frequency),
                });
            }
            if !self.by_month_day.is_empty()
                && !matches!(frequency, Frequency::Monthly | Frequency::Yearly)
            {
                violations.push(Violation {
                    field: "by_month_day",
                    message: format!("not applicable to {} rules", frequency),
                });
            }
        }

        if !violations.is_empty() {
            return Err(ValidationError::new(violations));
        }

        let termination = if self.never {
            Termination::Never
        } else if let Some(end_date) = self.end_date {
            Termination::Until(end_date)
        } else {
            // termination_modes == 1 and neither never nor end_date, so
            // count is present
            Termination::Count(self.count.unwrap_or(1))
        };

        let mut by_day = self.by_day.clone();
        by_day.sort_by_key(|d| d.num_days_from_sunday());
        by_day.dedup();
        let mut by_month = self.by_month.clone();
        by_month.sort_unstable();
        by_month.dedup();
        let mut by_month_day = self.by_month_day.clone();
        by_month_day.sort_unstable();
        by_month_day.dedup();

        let now = Utc::now();
        Ok(RecurrenceRule {
            id: Uuid::now_v7(),
            frequency: self.frequency.unwrap_or(Frequency::Daily),
            interval,
            by_day,
            by_month,
            by_month_day,
            termination,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A validated recurrence pattern. Immutable once stored except for the
/// truncation a series split applies to the predecessor's rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub id: Uuid,
    pub frequency: Frequency,
    pub interval: u32,
    /// Sorted Sunday-first, deduplicated.
    pub by_day: Vec<Weekday>,
    pub by_month: Vec<u32>,
    pub by_month_day: Vec<i32>,
    pub termination: Termination,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurrenceRule {
    /// Copy under a fresh identity, for the successor series of a split.
    pub fn duplicate(&self) -> RecurrenceRule {
        let now = Utc::now();
        RecurrenceRule {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        match self.termination {
            Termination::Until(end) => Some(end),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<u32> {
        match self.termination {
            Termination::Count(count) => Some(count),
            _ => None,
        }
    }

    /// JSON array of weekday tokens for the TEXT column, None when empty.
    pub fn by_day_json(&self) -> Option<String> {
        if self.by_day.is_empty() {
            return None;
        }
        let tokens: Vec<&str> = self.by_day.iter().map(|d| weekday_token(*d)).collect();
        Some(serde_json::to_string(&tokens).unwrap_or_default())
    }

    pub fn by_month_json(&self) -> Option<String> {
        if self.by_month.is_empty() {
            return None;
        }
        Some(serde_json::to_string(&self.by_month).unwrap_or_default())
    }

    pub fn by_month_day_json(&self) -> Option<String> {
        if self.by_month_day.is_empty() {
            return None;
        }
        Some(serde_json::to_string(&self.by_month_day).unwrap_or_default())
    }

    /// Human-oriented one-line summary, e.g. `weekly x2 on MO,WE (count 4)`.
    pub fn describe(&self) -> String {
        let mut out = self.frequency.to_string();
        if self.interval != 1 {
            out.push_str(&format!(" x{}", self.interval));
        }
        if !self.by_day.is_empty() {
            let days: Vec<&str> = self.by_day.iter().map(|d| weekday_token(*d)).collect();
            out.push_str(&format!(" on {}", days.join(",")));
        }
        if !self.by_month.is_empty() {
            let months: Vec<String> = self.by_month.iter().map(|m| m.to_string()).collect();
            out.push_str(&format!(" in months {}", months.join(",")));
        }
        if !self.by_month_day.is_empty() {
            let days: Vec<String> = self.by_month_day.iter().map(|d| d.to_string()).collect();
            out.push_str(&format!(" on days {}", days.join(",")));
        }
        match self.termination {
            Termination::Until(end) => out.push_str(&format!(" (until {})", end.format("%Y-%m-%d"))),
            Termination::Count(count) => out.push_str(&format!(" (count {})", count)),
            Termination::Never => out.push_str(" (never ends)"),
        }
        out
    }
}

fn decode_json_column<T: serde::de::DeserializeOwned>(
    column: &'static str,
    raw: Option<String>,
) -> Result<Vec<T>, sqlx::Error> {
    match raw {
        None => Ok(Vec::new()),
        Some(text) => serde_json::from_str(&text).map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        }),
    }
}

impl<'r> FromRow<'r, sqlx::sqlite::SqliteRow> for RecurrenceRule {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let tokens: Vec<String> = decode_json_column("by_day", row.try_get("by_day")?)?;
        let mut by_day = Vec::with_capacity(tokens.len());
        for token in tokens {
            by_day.push(parse_weekday_token(&token).map_err(|e| {
                sqlx::Error::ColumnDecode {
                    index: "by_day".to_string(),
                    source: Box::new(e),
                }
            })?);
        }

        let end_date: Option<DateTime<Utc>> = row.try_get("end_date")?;
        let count: Option<u32> = row.try_get("count")?;
        let termination = match (end_date, count) {
            (Some(end), _) => Termination::Until(end),
            (None, Some(count)) => Termination::Count(count),
            (None, None) => Termination::Never,
        };

        Ok(RecurrenceRule {
            id: row.try_get("id")?,
            frequency: row.try_get("frequency")?,
            interval: row.try_get("interval")?,
            by_day,
            by_month: decode_json_column("by_month", row.try_get("by_month")?)?,
            by_month_day: decode_json_column("by_month_day", row.try_get("by_month_day")?)?,
            termination,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// The base pattern every generated occurrence references: template fields,
/// the anchor, and the owning recurrence rule.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecurringEvent {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Anchor: its civil date is the first candidate occurrence date, its
    /// time of day is applied to every materialized occurrence.
    pub start_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub rule_id: Uuid,
    /// Stable lineage identity preserved across splits.
    pub original_series_id: Uuid,
    /// Materialization boundary; instances up to here already exist.
    pub last_materialized_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringEvent {
    /// The anchor's civil date at UTC midnight, as the expander consumes it.
    pub fn anchor_date(&self) -> DateTime<Utc> {
        self.start_at
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc()
    }

    pub fn time_of_day(&self) -> Duration {
        self.start_at - self.anchor_date()
    }

    pub fn occurrence_start_at(&self, occurrence_date: DateTime<Utc>) -> DateTime<Utc> {
        occurrence_date + self.time_of_day()
    }

    pub fn occurrence_end_at(&self, occurrence_date: DateTime<Utc>) -> DateTime<Utc> {
        self.occurrence_start_at(occurrence_date) + Duration::minutes(self.duration_minutes)
    }
}

/// One materialized occurrence of a recurring event. Exactly one row exists
/// per (event_id, occurrence_date) pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventInstance {
    pub id: Uuid,
    pub event_id: Uuid,
    /// UTC midnight of the occurrence's civil date.
    pub occurrence_date: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// 1-based position within the series, None when the date could not be
    /// located on the rule.
    pub sequence: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tracked piece of work attached to a recurring event; individual
/// occurrences can override or drop their copy via the exception overlay.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActionItem {
    pub id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub assignee_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub pre_completion_notes: Option<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sparse per-occurrence override of an event's template fields.
/// Null columns mean "fall back to the base event at projection time".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventException {
    pub id: Uuid,
    pub event_id: Uuid,
    pub instance_id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// The deletion marker for this shape: true hides the occurrence.
    pub is_cancelled: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sparse per-occurrence override of an action item.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActionItemException {
    pub id: Uuid,
    pub action_item_id: Uuid,
    pub instance_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub pre_completion_notes: Option<String>,
    pub is_completed: Option<bool>,
    pub is_deleted: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Data Transfer Objects for engine operations
// ============================================================================

/// Data required to create a new recurring event together with its rule.
#[derive(Debug, Clone)]
pub struct NewEventData {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub rule: RulePayload,
}

/// Partial whole-series edit of an event's template fields.
///
/// Outer `None` means the field was not supplied; for clearable fields the
/// inner `None` means an explicit clear. The distinction is load-bearing for
/// the overlay merge semantics and must survive all the way to the store.
#[derive(Debug, Clone, Default)]
pub struct UpdateEventData {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub duration_minutes: Option<i64>,
}

impl UpdateEventData {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.duration_minutes.is_none()
    }
}

/// Input for "this and following": an optional replacement rule and the
/// template changes to apply to the successor series.
#[derive(Debug, Clone, Default)]
pub struct SplitData {
    /// New rule for the successor; the predecessor's rule is copied when
    /// absent.
    pub rule: Option<RulePayload>,
    pub changes: UpdateEventData,
}

#[derive(Debug, Clone)]
pub struct NewActionItemData {
    pub event_id: Uuid,
    pub title: String,
    pub assignee_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub pre_completion_notes: Option<String>,
}

/// Per-occurrence event override; only supplied fields are written.
#[derive(Debug, Clone, Default)]
pub struct EventOverrideData {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub is_cancelled: Option<bool>,
}

impl EventOverrideData {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.is_cancelled.is_none()
    }
}

/// Per-occurrence action item override; only supplied fields are written.
/// `is_completed: Some(false)` is an explicit reset, distinct from absent.
#[derive(Debug, Clone, Default)]
pub struct ActionOverrideData {
    pub assignee_id: Option<Option<Uuid>>,
    pub category_id: Option<Option<Uuid>>,
    pub pre_completion_notes: Option<Option<String>>,
    pub is_completed: Option<bool>,
    pub is_deleted: Option<bool>,
}

impl ActionOverrideData {
    pub fn is_empty(&self) -> bool {
        self.assignee_id.is_none()
            && self.category_id.is_none()
            && self.pre_completion_notes.is_none()
            && self.is_completed.is_none()
            && self.is_deleted.is_none()
    }
}

/// One candidate date produced by rule expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// 1-based position within the series; the anchor occurrence is 1.
    pub sequence: u32,
    /// UTC midnight of the occurrence's civil date.
    pub date: DateTime<Utc>,
}

/// Configuration for instance materialization windows.
#[derive(Debug, Clone, Deserialize)]
pub struct MaterializationConfig {
    /// Default materialization window in days
    pub lookahead_days: i64,
    /// Include near-past in materialization windows (days)
    pub grace_days: i64,
    /// Limit for batch materialization operations
    pub max_batch_size: usize,
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        Self {
            lookahead_days: 30,
            grace_days: 3,
            max_batch_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn payload(frequency: Frequency) -> RulePayload {
        RulePayload {
            frequency: Some(frequency),
            never: true,
            ..Default::default()
        }
    }

    #[rstest]
    #[case("SU", Weekday::Sun)]
    #[case("MO", Weekday::Mon)]
    #[case("we", Weekday::Wed)]
    #[case("Fr", Weekday::Fri)]
    #[case("SA", Weekday::Sat)]
    fn parses_weekday_tokens(#[case] token: &str, #[case] expected: Weekday) {
        assert_eq!(parse_weekday_token(token), Ok(expected));
    }

    #[test]
    fn rejects_unknown_weekday_token() {
        assert!(parse_weekday_token("XX").is_err());
        assert!(parse_weekday_token("").is_err());
    }

    #[test]
    fn weekday_tokens_round_trip() {
        for day in [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ] {
            assert_eq!(parse_weekday_token(weekday_token(day)), Ok(day));
        }
    }

    #[test]
    fn frequency_parses_case_insensitively() {
        assert_eq!("DAILY".parse::<Frequency>(), Ok(Frequency::Daily));
        assert_eq!("weekly".parse::<Frequency>(), Ok(Frequency::Weekly));
        assert!("fortnightly".parse::<Frequency>().is_err());
    }

    mod validation {
        use super::*;

        #[test]
        fn accepts_never_alone() {
            let rule = payload(Frequency::Daily).validate().unwrap();
            assert_eq!(rule.termination, Termination::Never);
            assert_eq!(rule.interval, 1);
        }

        #[test]
        fn rejects_missing_termination() {
            let input = RulePayload {
                frequency: Some(Frequency::Daily),
                ..Default::default()
            };
            let err = input.validate().unwrap_err();
            assert!(err.violations.iter().any(|v| v.field == "termination"));
        }

        #[test]
        fn rejects_multiple_terminations() {
            let input = RulePayload {
                frequency: Some(Frequency::Daily),
                end_date: Some(Utc::now()),
                count: Some(5),
                ..Default::default()
            };
            let err = input.validate().unwrap_err();
            assert!(err.violations.iter().any(|v| v.field == "termination"));
        }

        #[test]
        fn rejects_zero_month_day() {
            let input = RulePayload {
                frequency: Some(Frequency::Monthly),
                by_month_day: vec![0],
                never: true,
                ..Default::default()
            };
            let err = input.validate().unwrap_err();
            assert!(err.violations.iter().any(|v| v.field == "by_month_day"));
        }

        #[test]
        fn rejects_out_of_range_interval_and_count() {
            let input = RulePayload {
                frequency: Some(Frequency::Daily),
                interval: Some(1000),
                count: Some(0),
                ..Default::default()
            };
            let err = input.validate().unwrap_err();
            assert!(err.violations.iter().any(|v| v.field == "interval"));
            assert!(err.violations.iter().any(|v| v.field == "count"));
        }

        #[test]
        fn rejects_by_day_for_daily() {
            let input = RulePayload {
                by_day: vec![Weekday::Mon],
                ..payload(Frequency::Daily)
            };
            let err = input.validate().unwrap_err();
            assert!(err.violations.iter().any(|v| v.field == "by_day"));
        }

        #[test]
        fn rejects_by_month_day_for_weekly() {
            let input = RulePayload {
                by_month_day: vec![15],
                ..payload(Frequency::Weekly)
            };
            let err = input.validate().unwrap_err();
            assert!(err.violations.iter().any(|v| v.field == "by_month_day"));
        }

        #[test]
        fn collects_all_violations() {
            let input = RulePayload {
                frequency: Some(Frequency::Weekly),
                interval: Some(0),
                by_month: vec![13],
                by_month_day: vec![0],
                ..Default::default()
            };
            let err = input.validate().unwrap_err();
            // interval, by_month range, by_month applicability,
            // by_month_day zero, by_month_day applicability, termination
            assert!(err.violations.len() >= 5);
        }

        #[test]
        fn normalizes_constraint_sets() {
            let input = RulePayload {
                by_day: vec![Weekday::Wed, Weekday::Mon, Weekday::Wed],
                ..payload(Frequency::Weekly)
            };
            let rule = input.validate().unwrap();
            assert_eq!(rule.by_day, vec![Weekday::Mon, Weekday::Wed]);
        }

        proptest! {
            #[test]
            fn validation_never_panics(
                freq_idx in 0usize..4,
                interval in proptest::option::of(0u32..2000),
                count in proptest::option::of(0u32..2000),
                never in proptest::bool::ANY,
                has_end in proptest::bool::ANY,
                by_month in proptest::collection::vec(0u32..15, 0..4),
                by_month_day in proptest::collection::vec(-40i32..40, 0..4),
            ) {
                let frequency = [
                    Frequency::Daily,
                    Frequency::Weekly,
                    Frequency::Monthly,
                    Frequency::Yearly,
                ][freq_idx];
                let input = RulePayload {
                    frequency: Some(frequency),
                    interval,
                    by_day: vec![],
                    by_month,
                    by_month_day,
                    end_date: has_end.then(Utc::now),
                    count,
                    never,
                };
                if let Ok(rule) = input.validate() {
                    prop_assert!((1..=999).contains(&rule.interval));
                    prop_assert!(rule.by_month.iter().all(|m| (1..=12).contains(m)));
                    prop_assert!(rule
                        .by_month_day
                        .iter()
                        .all(|d| *d != 0 && (-31..=31).contains(d)));
                    if let Termination::Count(c) = rule.termination {
                        prop_assert!((1..=999).contains(&c));
                    }
                }
            }
        }
    }
}
