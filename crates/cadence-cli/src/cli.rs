use clap::{Parser, Subcommand, ValueEnum};

/// A recurring event manager with per-occurrence exceptions and series splitting
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new recurring event
    Add(AddCommand),
    /// List recurring events
    List,
    /// Show an event's occurrences inside a window
    Occurrences(OccurrencesCommand),
    /// Preview upcoming occurrence dates without materializing them
    Preview(PreviewCommand),
    /// Edit an event across its whole series
    Edit(EditCommand),
    /// Split a series at a date; that date and everything after get new settings
    Split(SplitCommand),
    /// Delete an event and everything attached to it
    Delete(DeleteCommand),
    /// Cancel a single occurrence
    Cancel(CancelCommand),
    /// Restore a previously cancelled occurrence
    Restore(RestoreCommand),
    /// Override event fields for a single occurrence
    Override(OverrideCommand),
    /// List an event's per-occurrence exceptions
    Exceptions(ExceptionsCommand),
    /// Create instance rows for a window ahead of time
    Materialize(MaterializeCommand),
    /// Manage action items attached to events
    Action(ActionCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The name of the event
    pub name: String,
    /// The description of the event
    #[clap(short, long)]
    pub description: Option<String>,
    /// Where the event takes place
    #[clap(short, long)]
    pub location: Option<String>,
    /// When the series starts (e.g. '2025-01-06 09:30', 'next monday')
    #[clap(short, long)]
    pub start: Option<String>,
    /// Duration of each occurrence in minutes
    #[clap(long, default_value_t = 60)]
    pub duration: i64,
    /// How often the event repeats
    #[clap(long, value_enum)]
    pub every: RecurrenceShortcut,
    /// Repeat every N periods instead of every one
    #[clap(long, help = "Repeat every N days/weeks/months/years")]
    pub interval: Option<u32>,
    /// Days of week for weekly or monthly patterns
    #[clap(long, help = "Days of week (mon,tue,wed,thu,fri,sat,sun)")]
    pub on: Option<String>,
    /// Months of the year for monthly or yearly patterns
    #[clap(long, help = "Months of the year (1-12, e.g. '1,4,7,10')")]
    pub months: Option<String>,
    /// Days of month for monthly or yearly patterns
    #[clap(long, help = "Days of month (1-31, negatives count from the end, e.g. '1,15,-1')")]
    pub month_days: Option<String>,
    /// Last date an occurrence may fall on
    #[clap(long, conflicts_with_all = ["count", "forever"], help = "End date for the series (inclusive)")]
    pub until: Option<String>,
    /// Total number of occurrences, counting the first
    #[clap(long, conflicts_with = "forever", help = "Maximum number of occurrences")]
    pub count: Option<u32>,
    /// Repeat with no end
    #[clap(long)]
    pub forever: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct OccurrencesCommand {
    /// The ID of the event
    pub id: String,
    /// Start of the window (defaults to today)
    #[clap(long)]
    pub from: Option<String>,
    /// End of the window (defaults to the configured lookahead)
    #[clap(long)]
    pub to: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    /// The ID of the event
    pub id: String,
    /// Number of occurrences to show
    #[clap(long, short, default_value = "10")]
    pub count: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID of the event to edit
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long)]
    pub location: Option<String>,
    #[arg(long, conflicts_with = "location")]
    pub location_clear: bool,

    /// New duration in minutes
    #[arg(long)]
    pub duration: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct SplitCommand {
    /// The ID of the event to split
    pub id: String,
    /// First date that moves to the new series
    #[clap(long)]
    pub at: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long)]
    pub location: Option<String>,
    #[arg(long, conflicts_with = "location")]
    pub location_clear: bool,

    /// New duration in minutes
    #[arg(long)]
    pub duration: Option<i64>,

    /// Replacement schedule for the new series
    #[clap(long, value_enum)]
    pub every: Option<RecurrenceShortcut>,
    #[clap(long, help = "Repeat every N days/weeks/months/years")]
    pub interval: Option<u32>,
    #[clap(long, help = "Days of week (mon,tue,wed,thu,fri,sat,sun)")]
    pub on: Option<String>,
    #[clap(long, help = "Months of the year (1-12)")]
    pub months: Option<String>,
    #[clap(long, help = "Days of month (1-31, negatives count from the end)")]
    pub month_days: Option<String>,
    #[clap(long, conflicts_with_all = ["count", "forever"], help = "End date for the series (inclusive)")]
    pub until: Option<String>,
    #[clap(long, conflicts_with = "forever", help = "Maximum number of occurrences")]
    pub count: Option<u32>,
    #[clap(long)]
    pub forever: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID of the event to delete
    pub id: String,
    /// Force deletion without confirmation
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CancelCommand {
    /// The ID of the event
    pub id: String,
    /// Date of the occurrence to cancel (e.g. '2025-08-20', 'next friday')
    #[clap(long)]
    pub on: String,
}

#[derive(Parser, Debug, Clone)]
pub struct RestoreCommand {
    /// The ID of the event
    pub id: String,
    /// Date of the occurrence to restore
    #[clap(long)]
    pub on: String,
}

#[derive(Parser, Debug, Clone)]
pub struct OverrideCommand {
    /// The ID of the event
    pub id: String,
    /// Date of the occurrence to override
    #[clap(long)]
    pub on: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long)]
    pub location: Option<String>,
    #[arg(long, conflicts_with = "location")]
    pub location_clear: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ExceptionsCommand {
    /// The ID of the event
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct MaterializeCommand {
    /// The ID of the event
    pub id: String,
    /// Start of the window (defaults to the configured grace period)
    #[clap(long)]
    pub from: Option<String>,
    /// End of the window (defaults to the configured lookahead)
    #[clap(long)]
    pub to: Option<String>,
}

/// Action item management commands
#[derive(Parser, Debug, Clone)]
pub struct ActionCommand {
    #[command(subcommand)]
    pub command: ActionSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ActionSubcommand {
    /// Attach a new action item to an event
    Add(ActionAddCommand),
    /// List an event's action items
    List(ActionListCommand),
    /// Mark an action item done for one occurrence
    Done(ActionDoneCommand),
    /// Revert an action item to pending for one occurrence
    Undo(ActionUndoCommand),
    /// Reassign an action item for one occurrence
    Assign(ActionAssignCommand),
    /// Drop an action item from one occurrence
    Drop(ActionDropCommand),
    /// Remove an action item from the whole series
    Remove(ActionRemoveCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ActionAddCommand {
    /// The ID of the event to attach to
    pub event_id: String,
    /// What needs to be done
    pub title: String,
    /// The assignee's ID
    #[clap(long)]
    pub assignee: Option<String>,
    /// The category ID
    #[clap(long)]
    pub category: Option<String>,
    /// Notes to read before completing
    #[clap(long)]
    pub notes: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ActionListCommand {
    /// The ID of the event
    pub event_id: String,
    /// Show the effective items for the occurrence on this date
    #[clap(long)]
    pub on: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ActionDoneCommand {
    /// The ID of the action item
    pub id: String,
    /// Date of the occurrence it was done for
    #[clap(long)]
    pub on: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ActionUndoCommand {
    /// The ID of the action item
    pub id: String,
    /// Date of the occurrence to revert
    #[clap(long)]
    pub on: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ActionAssignCommand {
    /// The ID of the action item
    pub id: String,
    /// Date of the occurrence to reassign for
    #[clap(long)]
    pub on: String,
    /// The new assignee's ID
    #[clap(long, conflicts_with = "clear")]
    pub to: Option<String>,
    /// Remove the assignee for this occurrence
    #[clap(long)]
    pub clear: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ActionDropCommand {
    /// The ID of the action item
    pub id: String,
    /// Date of the occurrence to drop it from
    #[clap(long)]
    pub on: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ActionRemoveCommand {
    /// The ID of the action item
    pub id: String,
}

/// Human-friendly recurrence patterns
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceShortcut {
    /// Every day
    Daily,
    /// Every week (same weekday as the start)
    Weekly,
    /// Every month (same date)
    Monthly,
    /// Every year (same date)
    Yearly,
    /// Monday to Friday
    Weekdays,
    /// Saturday and Sunday
    Weekends,
}

impl std::fmt::Display for RecurrenceShortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecurrenceShortcut::Daily => write!(f, "daily"),
            RecurrenceShortcut::Weekly => write!(f, "weekly"),
            RecurrenceShortcut::Monthly => write!(f, "monthly"),
            RecurrenceShortcut::Yearly => write!(f, "yearly"),
            RecurrenceShortcut::Weekdays => write!(f, "weekdays"),
            RecurrenceShortcut::Weekends => write!(f, "weekends"),
        }
    }
}

impl RecurrenceShortcut {
    /// The rule payload this shortcut stands for, before any other flags
    /// are applied.
    pub fn base_payload(&self) -> cadence_core::models::RulePayload {
        use cadence_core::models::{Frequency, RulePayload};
        use chrono::Weekday;

        match self {
            RecurrenceShortcut::Daily => RulePayload {
                frequency: Some(Frequency::Daily),
                ..Default::default()
            },
            RecurrenceShortcut::Weekly => RulePayload {
                frequency: Some(Frequency::Weekly),
                ..Default::default()
            },
            RecurrenceShortcut::Monthly => RulePayload {
                frequency: Some(Frequency::Monthly),
                ..Default::default()
            },
            RecurrenceShortcut::Yearly => RulePayload {
                frequency: Some(Frequency::Yearly),
                ..Default::default()
            },
            RecurrenceShortcut::Weekdays => RulePayload {
                frequency: Some(Frequency::Weekly),
                by_day: vec![
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri,
                ],
                ..Default::default()
            },
            RecurrenceShortcut::Weekends => RulePayload {
                frequency: Some(Frequency::Weekly),
                by_day: vec![Weekday::Sat, Weekday::Sun],
                ..Default::default()
            },
        }
    }
}
