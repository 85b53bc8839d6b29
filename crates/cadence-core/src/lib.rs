//! # Cadence Core Library
//!
//! A recurring event engine: validated recurrence rules, lazy occurrence
//! expansion, on-demand instance materialization, per-occurrence exception
//! overlays and non-destructive series splitting.
//!
//! ## Features
//!
//! - **Rule-Based Recurrence**: Daily, weekly, monthly and yearly patterns
//!   with weekday, month and month-day constraints and exactly one
//!   termination mode per rule
//! - **Lazy Expansion**: Occurrence dates are produced by an ordered
//!   iterator; nothing is generated until a caller asks for a window
//! - **On-Demand Materialization**: Instance rows are created just in time,
//!   with configurable lookahead windows and race-safe lookup-or-create
//! - **Exception Overlays**: Sparse per-occurrence overrides merged at read
//!   time, so the base series stays authoritative
//! - **Series Splitting**: "This and following" edits split a series at a
//!   cut date without rewriting its history
//! - **Type Safety**: Compile-time checked data access with sqlx
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`repository`]: Data access layer with Repository pattern
//! - [`recurrence`]: Rule expansion and materialization policy
//! - [`projection`]: Read-time overlay resolution
//! - [`error`]: Error types with context
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     db,
//!     error::CoreError,
//!     models::{Frequency, NewEventData, RulePayload},
//!     recurrence::MaterializationManager,
//!     repository::{EventRepository, SqliteRepository},
//! };
//! use chrono::Utc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CoreError> {
//!     // Initialize database
//!     let pool = db::establish_connection("events.db").await?;
//!
//!     // Create repository with materialization
//!     let repo = SqliteRepository::new(pool, MaterializationManager::with_defaults());
//!
//!     // Add a weekly series
//!     let event = repo
//!         .create_event(NewEventData {
//!             name: "Weekly sync".to_string(),
//!             description: None,
//!             location: None,
//!             start_at: Utc::now(),
//!             duration_minutes: 30,
//!             rule: RulePayload {
//!                 frequency: Some(Frequency::Weekly),
//!                 never: true,
//!                 ..Default::default()
//!             },
//!         })
//!         .await?;
//!     println!("Created series: {}", event.name);
//!
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod projection;
pub mod recurrence;
pub mod repository;
