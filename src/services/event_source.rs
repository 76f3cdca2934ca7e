use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::get_events;
use crate::models::EventRecord;

/// Anything that can hand back the current batch of events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// `None` fetches every sport.
    async fn get_events(&self, sport: Option<&str>) -> Result<Vec<EventRecord>>;
}

/// Event source backed by the local SQLite store.
#[derive(Clone)]
pub struct StoreEventSource {
    pool: SqlitePool,
}

impl StoreEventSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventSource for StoreEventSource {
    async fn get_events(&self, sport: Option<&str>) -> Result<Vec<EventRecord>> {
        let events = get_events(&self.pool, sport).await?;
        tracing::debug!("Loaded {} events (sport: {})", events.len(), sport.unwrap_or("all"));
        Ok(events)
    }
}
