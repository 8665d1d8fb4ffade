//! Expired-event sweep
//!
//! Runs once a minute, independent of request traffic, and deletes events
//! whose end instant has passed. No coordination against concurrent reads;
//! a sweep error is logged and the next tick tries again.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::storage::EventStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the sweep loop. The first pass runs immediately.
pub fn spawn(events: Arc<dyn EventStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_once(events.as_ref()).await {
                error!(error = %e, "expired-event sweep failed");
            }
        }
    })
}

/// Delete every expired event; returns how many were removed.
pub async fn sweep_once(events: &dyn EventStore) -> Result<u64> {
    let now = Utc::now();
    let mut deleted = 0;

    for event in events.list().await? {
        if event.is_expired(now) {
            events.delete(&event.id).await?;
            info!(event_id = %event.id, name = %event.name, "expired event deleted");
            deleted += 1;
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::Event;
    use crate::storage::memory::InMemoryEventStore;
    use chrono::{Duration as ChronoDuration, Local};
    use uuid::Uuid;

    fn event_on(date: chrono::NaiveDate) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            name: "Poetry night".into(),
            event_date: date,
            start_time: "18:00".into(),
            end_time: "20:00".into(),
            is_virtual: false,
            description: "Open mic".into(),
            event_url: None,
            location: Some("Main branch".into()),
            image_url: String::new(),
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_expired() {
        let store = InMemoryEventStore::new();
        let past = (Local::now() - ChronoDuration::days(2)).date_naive();
        let future = (Local::now() + ChronoDuration::days(2)).date_naive();

        let expired = store.insert(event_on(past)).await.unwrap();
        let upcoming = store.insert(event_on(future)).await.unwrap();

        let deleted = sweep_once(&store).await.unwrap();
        assert_eq!(deleted, 1);

        assert!(store.get(&expired.id).await.unwrap().is_none());
        assert!(store.get(&upcoming.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_on_empty_store() {
        let store = InMemoryEventStore::new();
        assert_eq!(sweep_once(&store).await.unwrap(), 0);
    }
}
