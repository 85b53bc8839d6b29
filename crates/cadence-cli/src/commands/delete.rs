use anyhow::Result;
use cadence_core::repository::Repository;
use uuid::Uuid;

pub async fn delete_event(repo: &impl Repository, event_id: Uuid) -> Result<()> {
    repo.delete_event(event_id).await?;
    println!("Deleted event and all of its occurrences, exceptions and action items.");
    Ok(())
}
