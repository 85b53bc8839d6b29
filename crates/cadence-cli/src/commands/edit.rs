use anyhow::Result;
use cadence_core::models::UpdateEventData;
use cadence_core::repository::Repository;
use owo_colors::{OwoColorize, Style};

use crate::cli::EditCommand;
use crate::util::resolve_event_id;

pub async fn edit_event(repo: &impl Repository, command: EditCommand) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;

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

    let update_data = UpdateEventData {
        name: command.name,
        description,
        location,
        duration_minutes: command.duration,
    };

    let event = repo.update_event(event_id, update_data).await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} Updated event: {}",
        "✓".style(success_style),
        event.name.bright_white().bold()
    );
    println!("  Changes apply to every occurrence, past and future.");

    Ok(())
}
