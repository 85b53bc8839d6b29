use cadence_core::models::{ActionItem, Occurrence};
use cadence_core::projection::{ActionItemView, OccurrenceView};
use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ViewEvent {
    pub id: Uuid,
    pub name: String,
    pub schedule: String,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub location: Option<String>,
    pub next: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ViewException {
    pub occurrence_date: Option<DateTime<Utc>>,
    pub cancelled: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

pub fn display_events(events: &[ViewEvent]) {
    if events.is_empty() {
        println!("No events found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Schedule", "Starts", "Duration", "Next"]);

    for event in events {
        let mut row = Row::new();
        row.add_cell(Cell::new(&event.id.to_string()[..7]));

        let mut display_name = String::from("↻ ");
        display_name.push_str(&event.name);
        if let Some(location) = &event.location {
            display_name.push_str(&format!(" @ {}", location));
        }
        row.add_cell(Cell::new(display_name));

        row.add_cell(Cell::new(&event.schedule));
        row.add_cell(Cell::new(event.start_at.format("%Y-%m-%d %H:%M").to_string()));
        row.add_cell(Cell::new(format!("{} min", event.duration_minutes)));

        let next_cell = match event.next {
            Some(next) => Cell::new(next.humanize()).fg(Color::Green),
            None => Cell::new("Ended").fg(Color::DarkGrey),
        };
        row.add_cell(next_cell);

        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_occurrences(views: &[OccurrenceView]) {
    if views.is_empty() {
        println!("No occurrences in this window.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Day", "Time", "Name", "Location"]);

    let today = Utc::now().date_naive();
    for view in views {
        let mut row = Row::new();
        row.add_cell(Cell::new(&view.instance.id.to_string()[..7]));

        let date = view.instance.occurrence_date.date_naive();
        let mut date_cell = Cell::new(date.format("%Y-%m-%d").to_string());
        if date == today {
            date_cell = date_cell.fg(Color::Yellow).add_attribute(Attribute::Bold);
        } else if date < today {
            date_cell = date_cell.fg(Color::DarkGrey);
        }
        row.add_cell(date_cell);

        row.add_cell(Cell::new(date.format("%a").to_string()));
        row.add_cell(Cell::new(format!(
            "{} - {}",
            view.start_at.format("%H:%M"),
            view.end_at.format("%H:%M"),
        )));
        row.add_cell(Cell::new(&view.name));
        row.add_cell(Cell::new(view.location.as_deref().unwrap_or("None")));

        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_preview(occurrences: &[Occurrence]) {
    if occurrences.is_empty() {
        println!("No upcoming occurrences.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Day", "When"]);

    for occurrence in occurrences {
        let mut row = Row::new();
        row.add_cell(Cell::new(occurrence.sequence.to_string()));
        row.add_cell(Cell::new(occurrence.date.format("%Y-%m-%d").to_string()));
        row.add_cell(Cell::new(occurrence.date.format("%a").to_string()));
        row.add_cell(Cell::new(occurrence.date.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_action_items(items: &[ActionItem]) {
    if items.is_empty() {
        println!("No action items found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Assignee", "Notes"]);

    for item in items {
        let mut row = Row::new();
        row.add_cell(Cell::new(&item.id.to_string()[..7]));
        row.add_cell(Cell::new(&item.title));
        row.add_cell(Cell::new(
            item.assignee_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "None".to_string()),
        ));
        row.add_cell(Cell::new(
            item.pre_completion_notes.as_deref().unwrap_or("None"),
        ));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_action_views(views: &[ActionItemView]) {
    if views.is_empty() {
        println!("No action items for this occurrence.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Status", "Assignee", "Notes"]);

    for view in views {
        let mut row = Row::new();
        row.add_cell(Cell::new(&view.id.to_string()[..7]));

        let mut title_cell = Cell::new(&view.title);
        if view.is_completed {
            title_cell = title_cell
                .add_attribute(Attribute::CrossedOut)
                .fg(Color::DarkGrey);
        }
        row.add_cell(title_cell);

        let status_cell = if view.is_completed {
            Cell::new("done").fg(Color::Green)
        } else {
            Cell::new("pending")
        };
        row.add_cell(status_cell);

        row.add_cell(Cell::new(
            view.assignee_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "None".to_string()),
        ));
        row.add_cell(Cell::new(
            view.pre_completion_notes.as_deref().unwrap_or("None"),
        ));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_exceptions(exceptions: &[ViewException]) {
    if exceptions.is_empty() {
        println!("No exceptions found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Cancelled", "Name", "Description", "Location"]);

    for exception in exceptions {
        let mut row = Row::new();
        row.add_cell(Cell::new(
            exception
                .occurrence_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
        ));
        let cancelled_cell = if exception.cancelled {
            Cell::new("cancelled").fg(Color::Red)
        } else {
            Cell::new("")
        };
        row.add_cell(cancelled_cell);
        row.add_cell(Cell::new(exception.name.as_deref().unwrap_or("-")));
        row.add_cell(Cell::new(exception.description.as_deref().unwrap_or("-")));
        row.add_cell(Cell::new(exception.location.as_deref().unwrap_or("-")));
        table.add_row(row);
    }

    println!("{table}");
}
