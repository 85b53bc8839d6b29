use clap::Parser;
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};

use cadence_core::db;
use cadence_core::error::CoreError;
use cadence_core::recurrence::MaterializationManager;
use cadence_core::repository::{EventRepository, SqliteRepository};

mod cli;
mod commands;
mod config;
mod util;
mod views;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::new().unwrap_or_else(|_| config::Config::default());

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let materialization_manager = MaterializationManager::new(config.materialization.clone());
    let repository = SqliteRepository::new(db_pool, materialization_manager);

    let cli = cli::Cli::parse();

    let result = match cli.command {
        cli::Commands::Add(command) => commands::add::add_event(&repository, command).await,
        cli::Commands::List => commands::list::list_events(&repository).await,
        cli::Commands::Occurrences(command) => {
            commands::occurrence::list_occurrences(&repository, command, &config).await
        }
        cli::Commands::Preview(command) => {
            commands::occurrence::preview_occurrences(&repository, command).await
        }
        cli::Commands::Edit(command) => commands::edit::edit_event(&repository, command).await,
        cli::Commands::Split(command) => commands::split::split_event(&repository, command).await,
        cli::Commands::Delete(command) => {
            async {
                let event_id = util::resolve_event_id(&repository, &command.id).await?;
                let event = repository
                    .find_event_by_id(event_id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("Event not found"))?;

                if !command.force {
                    let confirmation = Confirm::new()
                        .with_prompt(format!(
                            "Are you sure you want to delete '{}' and every occurrence of it?",
                            event.name
                        ))
                        .default(false)
                        .interact()
                        .unwrap_or(false);

                    if !confirmation {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }
                commands::delete::delete_event(&repository, event_id).await
            }
            .await
        }
        cli::Commands::Cancel(command) => {
            commands::occurrence::cancel_occurrence(&repository, command).await
        }
        cli::Commands::Restore(command) => {
            commands::occurrence::restore_occurrence(&repository, command).await
        }
        cli::Commands::Override(command) => {
            commands::occurrence::override_occurrence(&repository, command).await
        }
        cli::Commands::Exceptions(command) => {
            commands::occurrence::list_exceptions(&repository, command).await
        }
        cli::Commands::Materialize(command) => {
            commands::occurrence::materialize(&repository, command, &config).await
        }
        cli::Commands::Action(command) => {
            commands::action::action_command(&repository, command).await
        }
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::Forbidden(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::Conflict(s) => {
                eprintln!(
                    "{} {} Try the command again.",
                    "Error:".style(error_style),
                    s
                );
            }
            CoreError::Validation(validation) => {
                eprintln!(
                    "{} The recurrence rule has problems:",
                    "Error:".style(error_style)
                );
                for violation in &validation.violations {
                    eprintln!("  • {}: {}", violation.field.yellow(), violation.message);
                }
            }
            CoreError::AmbiguousId(matches) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, name) in matches {
                    eprintln!("  {} ({})", id.yellow(), name);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
}
