//! Rule expansion: turns a [`RecurrenceRule`] plus an anchor date into the
//! ordered stream of occurrence dates the rule describes.
//!
//! Expansion is pure and lazy. Nothing here touches the database; callers
//! decide how much of the stream to consume and what to persist.

use crate::models::{Frequency, MaterializationConfig, Occurrence, RecurrenceRule, Termination};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::VecDeque;

/// Consecutive periods with no matching date before expansion gives up.
/// Stops rules that can never match, like day 30 in February.
const MAX_EMPTY_PERIODS: u32 = 1000;

/// Truncates an instant to UTC midnight of its civil date.
pub fn utc_midnight(at: DateTime<Utc>) -> DateTime<Utc> {
    midnight(at.date_naive())
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Lazily expands a rule from its anchor date onward.
///
/// The first yielded occurrence has sequence 1. Dates before the anchor are
/// never produced, and termination (`count`, `end_date`) is honored by the
/// iterator itself; open-ended rules must be bounded by the caller.
pub fn expand(rule: &RecurrenceRule, anchor: DateTime<Utc>) -> Occurrences<'_> {
    Occurrences {
        rule,
        anchor: anchor.date_naive(),
        period: 0,
        pending: VecDeque::new(),
        emitted: 0,
        empty_streak: 0,
        done: false,
    }
}

/// Occurrences whose dates fall inside `[from, until]`, both normalized to
/// UTC midnight, both ends inclusive.
///
/// Sequence numbers and the rule's `count` budget still account for
/// occurrences that precede the window; a window never shifts where a series
/// starts, only which part of it is visible.
pub fn expand_between<'a>(
    rule: &'a RecurrenceRule,
    anchor: DateTime<Utc>,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> impl Iterator<Item = Occurrence> + 'a {
    let from = utc_midnight(from);
    let until = utc_midnight(until);
    expand(rule, anchor)
        .skip_while(move |o| o.date < from)
        .take_while(move |o| o.date <= until)
}

/// First occurrence strictly after the given instant, if the rule has one.
pub fn next_occurrence_after(
    rule: &RecurrenceRule,
    anchor: DateTime<Utc>,
    after: DateTime<Utc>,
) -> Option<Occurrence> {
    expand(rule, anchor).find(|o| o.date > after)
}

/// Locates a specific civil date on the rule, returning its occurrence when
/// the date is one the rule generates.
pub fn occurrence_on(
    rule: &RecurrenceRule,
    anchor: DateTime<Utc>,
    date: DateTime<Utc>,
) -> Option<Occurrence> {
    let target = utc_midnight(date);
    expand(rule, anchor)
        .take_while(|o| o.date <= target)
        .find(|o| o.date == target)
}

/// Iterator over a rule's occurrences. Created by [`expand`].
pub struct Occurrences<'a> {
    rule: &'a RecurrenceRule,
    anchor: NaiveDate,
    /// Index of the next period to open, 0 being the anchor's own period.
    period: i64,
    /// Dates of the current period not yet yielded, ascending.
    pending: VecDeque<NaiveDate>,
    emitted: u32,
    empty_streak: u32,
    done: bool,
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        loop {
            if self.done {
                return None;
            }
            if let Termination::Count(total) = self.rule.termination {
                if self.emitted >= total {
                    self.done = true;
                    return None;
                }
            }
            if let Some(date) = self.pending.pop_front() {
                if let Termination::Until(end) = self.rule.termination {
                    if date > end.date_naive() {
                        self.done = true;
                        return None;
                    }
                }
                self.emitted += 1;
                return Some(Occurrence {
                    sequence: self.emitted,
                    date: midnight(date),
                });
            }
            if !self.advance_period() {
                self.done = true;
                return None;
            }
        }
    }
}

impl Occurrences<'_> {
    /// Opens the next period and queues its matching dates. Returns false
    /// when no further period can produce an occurrence.
    fn advance_period(&mut self) -> bool {
        if self.empty_streak >= MAX_EMPTY_PERIODS {
            return false;
        }
        let offset = self.period * i64::from(self.rule.interval);
        self.period += 1;

        let (floor, candidates) = match self.rule.frequency {
            Frequency::Daily => {
                let Some(date) = self.anchor.checked_add_signed(Duration::days(offset)) else {
                    return false;
                };
                (date, vec![date])
            }
            Frequency::Weekly => {
                let week_anchor = self.anchor
                    - Duration::days(i64::from(self.anchor.weekday().num_days_from_sunday()));
                let Some(start) = week_anchor.checked_add_signed(Duration::weeks(offset)) else {
                    return false;
                };
                (start, self.week_candidates(start))
            }
            Frequency::Monthly => {
                let index = self.anchor.year() as i64 * 12
                    + i64::from(self.anchor.month0())
                    + offset;
                let Ok(year) = i32::try_from(index.div_euclid(12)) else {
                    return false;
                };
                let month = index.rem_euclid(12) as u32 + 1;
                let Some(floor) = NaiveDate::from_ymd_opt(year, month, 1) else {
                    return false;
                };
                (floor, self.month_candidates(year, month))
            }
            Frequency::Yearly => {
                let Ok(year) = i32::try_from(i64::from(self.anchor.year()) + offset) else {
                    return false;
                };
                let Some(floor) = NaiveDate::from_ymd_opt(year, 1, 1) else {
                    return false;
                };
                (floor, self.year_candidates(year))
            }
        };

        // Every candidate a period can produce is on or after its floor, so
        // once the floor passes the cutoff no later period matters.
        if let Termination::Until(end) = self.rule.termination {
            if floor > end.date_naive() {
                return false;
            }
        }

        let anchor = self.anchor;
        let kept: Vec<NaiveDate> = candidates.into_iter().filter(|d| *d >= anchor).collect();
        if kept.is_empty() {
            self.empty_streak += 1;
        } else {
            self.empty_streak = 0;
            self.pending.extend(kept);
        }
        true
    }

    fn week_candidates(&self, week_start: NaiveDate) -> Vec<NaiveDate> {
        if self.rule.by_day.is_empty() {
            let offset = i64::from(self.anchor.weekday().num_days_from_sunday());
            return week_start
                .checked_add_signed(Duration::days(offset))
                .into_iter()
                .collect();
        }
        // by_day is stored sorted Sunday-first, so the week stays ordered.
        self.rule
            .by_day
            .iter()
            .filter_map(|day| {
                week_start.checked_add_signed(Duration::days(i64::from(
                    day.num_days_from_sunday(),
                )))
            })
            .collect()
    }

    fn month_candidates(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        if !self.rule.by_month.is_empty() && !self.rule.by_month.contains(&month) {
            return Vec::new();
        }
        let mut days: Vec<NaiveDate> = if !self.rule.by_month_day.is_empty() {
            self.rule
                .by_month_day
                .iter()
                .filter_map(|entry| resolve_month_day(year, month, *entry))
                .collect()
        } else if !self.rule.by_day.is_empty() {
            (1..=days_in_month(year, month))
                .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
                .filter(|date| self.rule.by_day.contains(&date.weekday()))
                .collect()
        } else {
            // A month too short for the anchor's day yields nothing; dates
            // are never clamped to the end of the month.
            resolve_month_day(year, month, self.anchor.day() as i32)
                .into_iter()
                .collect()
        };
        if !self.rule.by_month_day.is_empty() && !self.rule.by_day.is_empty() {
            days.retain(|date| self.rule.by_day.contains(&date.weekday()));
        }
        days.sort_unstable();
        days.dedup();
        days
    }

    fn year_candidates(&self, year: i32) -> Vec<NaiveDate> {
        let anchor_month = [self.anchor.month()];
        let months: &[u32] = if self.rule.by_month.is_empty() {
            &anchor_month
        } else {
            &self.rule.by_month
        };
        let mut days = Vec::new();
        for month in months {
            if self.rule.by_month_day.is_empty() {
                days.extend(resolve_month_day(year, *month, self.anchor.day() as i32));
            } else {
                for entry in &self.rule.by_month_day {
                    days.extend(resolve_month_day(year, *month, *entry));
                }
            }
        }
        days.sort_unstable();
        days.dedup();
        days
    }
}

/// Decides how much of a series is materialized around a point in time.
///
/// Instances are created on demand; this policy keeps a hot window of them
/// in the store so listings do not expand rules on every read.
#[derive(Debug, Clone)]
pub struct MaterializationManager {
    config: MaterializationConfig,
}

impl MaterializationManager {
    pub fn new(config: MaterializationConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(MaterializationConfig::default())
    }

    pub fn config(&self) -> &MaterializationConfig {
        &self.config
    }

    /// The hot window around now: a short grace period back, the configured
    /// lookahead forward.
    pub fn default_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        self.window_around(Utc::now())
    }

    pub fn window_around(&self, at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            at - Duration::days(self.config.grace_days),
            at + Duration::days(self.config.lookahead_days),
        )
    }

    pub fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(0)
}

/// Resolves a month-day entry against a concrete month. Negative entries
/// count back from the month's last day (-1 is the last day). Entries the
/// month cannot hold resolve to nothing.
fn resolve_month_day(year: i32, month: u32, entry: i32) -> Option<NaiveDate> {
    let length = days_in_month(year, month) as i32;
    let day = if entry > 0 { entry } else { length + 1 + entry };
    if day < 1 || day > length {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day as u32)
}
