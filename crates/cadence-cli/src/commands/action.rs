use anyhow::{anyhow, Result};
use cadence_core::models::{ActionItem, ActionOverrideData, EventInstance, NewActionItemData};
use cadence_core::repository::Repository;
use owo_colors::{OwoColorize, Style};

use crate::cli::{
    ActionAddCommand, ActionAssignCommand, ActionCommand, ActionDoneCommand, ActionDropCommand,
    ActionListCommand, ActionRemoveCommand, ActionSubcommand, ActionUndoCommand,
};
use crate::util::{parse_optional_uuid, resolve_action_item_id, resolve_event_id, resolve_instance};
use crate::views::table::{display_action_items, display_action_views};

pub async fn action_command(repo: &impl Repository, command: ActionCommand) -> Result<()> {
    match command.command {
        ActionSubcommand::Add(cmd) => add_action_item(repo, cmd).await,
        ActionSubcommand::List(cmd) => list_action_items(repo, cmd).await,
        ActionSubcommand::Done(cmd) => mark_done(repo, cmd).await,
        ActionSubcommand::Undo(cmd) => mark_pending(repo, cmd).await,
        ActionSubcommand::Assign(cmd) => assign(repo, cmd).await,
        ActionSubcommand::Drop(cmd) => drop_from_occurrence(repo, cmd).await,
        ActionSubcommand::Remove(cmd) => remove_action_item(repo, cmd).await,
    }
}

async fn add_action_item(repo: &impl Repository, command: ActionAddCommand) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.event_id).await?;
    let assignee_id = parse_optional_uuid(command.assignee.as_ref(), "assignee")?;
    let category_id = parse_optional_uuid(command.category.as_ref(), "category")?;

    let item = repo
        .add_action_item(NewActionItemData {
            event_id,
            title: command.title,
            assignee_id,
            category_id,
            pre_completion_notes: command.notes,
        })
        .await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} Added action item '{}' to every occurrence",
        "✓".style(success_style),
        item.title.bold()
    );
    println!("  {} {}", "→ Item ID:".bold(), item.id.to_string().yellow());

    Ok(())
}

async fn list_action_items(repo: &impl Repository, command: ActionListCommand) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.event_id).await?;
    let event = repo
        .find_event_by_id(event_id)
        .await?
        .ok_or_else(|| anyhow!("Event not found"))?;

    match &command.on {
        Some(on) => {
            let instance = resolve_instance(repo, event_id, on).await?;
            let views = repo.list_action_items_for_instance(instance.id).await?;
            println!(
                "Action items of '{}' on {}:",
                event.name.bold(),
                instance.occurrence_date.format("%Y-%m-%d")
            );
            display_action_views(&views);
        }
        None => {
            let items = repo.list_action_items(event_id).await?;
            println!("Action items of '{}':", event.name.bold());
            display_action_items(&items);
        }
    }

    Ok(())
}

/// Looks up the action item behind a prefix, then the instance of its
/// event on the given date. Every per-occurrence subcommand starts here.
async fn resolve_action_context(
    repo: &impl Repository,
    id: &str,
    on: &str,
) -> Result<(ActionItem, EventInstance)> {
    let item_id = resolve_action_item_id(repo, id).await?;
    let item = repo
        .find_action_item_by_id(item_id)
        .await?
        .ok_or_else(|| anyhow!("Action item not found"))?;
    let instance = resolve_instance(repo, item.event_id, on).await?;
    Ok((item, instance))
}

async fn mark_done(repo: &impl Repository, command: ActionDoneCommand) -> Result<()> {
    let (item, instance) = resolve_action_context(repo, &command.id, &command.on).await?;

    repo.upsert_action_exception(
        item.id,
        instance.id,
        ActionOverrideData {
            is_completed: Some(true),
            ..Default::default()
        },
    )
    .await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} Marked '{}' done for {}",
        "✓".style(success_style),
        item.title.bold(),
        instance.occurrence_date.format("%Y-%m-%d").to_string().cyan()
    );

    Ok(())
}

async fn mark_pending(repo: &impl Repository, command: ActionUndoCommand) -> Result<()> {
    let (item, instance) = resolve_action_context(repo, &command.id, &command.on).await?;

    repo.mark_action_pending(item.id, instance.id).await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} '{}' is pending again for {}",
        "✓".style(success_style),
        item.title.bold(),
        instance.occurrence_date.format("%Y-%m-%d").to_string().cyan()
    );

    Ok(())
}

async fn assign(repo: &impl Repository, command: ActionAssignCommand) -> Result<()> {
    let (item, instance) = resolve_action_context(repo, &command.id, &command.on).await?;

    let assignee_id = if command.clear {
        Some(None)
    } else {
        parse_optional_uuid(command.to.as_ref(), "assignee")?.map(Some)
    };

    repo.upsert_action_exception(
        item.id,
        instance.id,
        ActionOverrideData {
            assignee_id,
            ..Default::default()
        },
    )
    .await?;

    let success_style = Style::new().green().bold();
    if command.clear {
        println!(
            "{} Cleared the assignee of '{}' for {}",
            "✓".style(success_style),
            item.title.bold(),
            instance.occurrence_date.format("%Y-%m-%d").to_string().cyan()
        );
    } else {
        println!(
            "{} Reassigned '{}' for {}",
            "✓".style(success_style),
            item.title.bold(),
            instance.occurrence_date.format("%Y-%m-%d").to_string().cyan()
        );
    }

    Ok(())
}

async fn drop_from_occurrence(repo: &impl Repository, command: ActionDropCommand) -> Result<()> {
    let (item, instance) = resolve_action_context(repo, &command.id, &command.on).await?;

    repo.mark_action_deleted(item.id, instance.id).await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} Dropped '{}' from {}",
        "✓".style(success_style),
        item.title.bold(),
        instance.occurrence_date.format("%Y-%m-%d").to_string().cyan()
    );
    println!("  Other occurrences keep the item.");

    Ok(())
}

async fn remove_action_item(repo: &impl Repository, command: ActionRemoveCommand) -> Result<()> {
    let item_id = resolve_action_item_id(repo, &command.id).await?;
    let item = repo
        .find_action_item_by_id(item_id)
        .await?
        .ok_or_else(|| anyhow!("Action item not found"))?;

    repo.remove_action_item(item_id).await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} Removed '{}' from the whole series",
        "✓".style(success_style),
        item.title.bold()
    );

    Ok(())
}
