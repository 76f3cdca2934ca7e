pub mod seed;
pub use seed::seed_data;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::{SqliteConnectOptions, SqliteRow}, Row, SqlitePool};
#[cfg(test)]
use sqlx::sqlite::SqlitePoolOptions;
use std::str::FromStr;

use crate::models::{BetSubmission, EventRecord, StoredBet};

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if !file_path.starts_with(":memory:") {
        if let Some(parent) = std::path::Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Single-connection in-memory store; every connection to `:memory:` is a
/// separate database, so the pool must not open a second one.
#[cfg(test)]
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database(database_url: &str) -> Result<()> {
    let pool = create_pool(database_url).await?;
    init_database_with_pool(&pool).await?;
    seed_data(&pool).await
}

pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            sport TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            league TEXT,
            league_id TEXT,
            country TEXT,
            time TEXT NOT NULL,
            date TEXT NOT NULL,
            start_time TEXT,
            home_odds REAL NOT NULL,
            draw_odds REAL,
            away_odds REAL NOT NULL,
            is_live INTEGER,
            featured INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // bets: staged slips handed over for downstream processing
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bets (
            id TEXT PRIMARY KEY,
            selections TEXT NOT NULL,
            stake REAL NOT NULL,
            total_odds REAL NOT NULL,
            potential_return REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_sport ON events(sport)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_start ON events(start_time)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn event_from_row(row: &SqliteRow) -> Result<EventRecord> {
    let start_time = match row.get::<Option<String>, _>("start_time") {
        Some(raw) => Some(parse_timestamp(&raw)?),
        None => None,
    };

    Ok(EventRecord {
        id: row.get("id"),
        sport: row.get("sport"),
        home_team: row.get("home_team"),
        away_team: row.get("away_team"),
        league: row.get("league"),
        league_id: row.get("league_id"),
        country: row.get("country"),
        time: row.get("time"),
        date: row.get("date"),
        start_time,
        home_odds: row.get("home_odds"),
        draw_odds: row.get("draw_odds"),
        away_odds: row.get("away_odds"),
        is_live: row.get("is_live"),
        featured: row.get("featured"),
    })
}

// Event operations
pub async fn insert_event(pool: &SqlitePool, event: &EventRecord) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO events
        (id, sport, home_team, away_team, league, league_id, country, time, date, start_time,
         home_odds, draw_odds, away_odds, is_live, featured, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.id)
    .bind(&event.sport)
    .bind(&event.home_team)
    .bind(&event.away_team)
    .bind(&event.league)
    .bind(&event.league_id)
    .bind(&event.country)
    .bind(&event.time)
    .bind(&event.date)
    .bind(event.start_time.map(|t| t.to_rfc3339()))
    .bind(event.home_odds)
    .bind(event.draw_odds)
    .bind(event.away_odds)
    .bind(event.is_live)
    .bind(event.featured)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// All events, or those of one sport, ordered by kick-off.
pub async fn get_events(pool: &SqlitePool, sport: Option<&str>) -> Result<Vec<EventRecord>> {
    let query = if sport.is_some() {
        "SELECT * FROM events WHERE sport = ? ORDER BY start_time, id"
    } else {
        "SELECT * FROM events ORDER BY start_time, id"
    };

    let mut query_builder = sqlx::query(query);
    if let Some(sport) = sport {
        query_builder = query_builder.bind(sport);
    }

    let rows = query_builder.fetch_all(pool).await?;
    rows.iter().map(event_from_row).collect()
}

pub async fn get_event_by_id(pool: &SqlitePool, event_id: &str) -> Result<Option<EventRecord>> {
    let row = sqlx::query("SELECT * FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(event_from_row).transpose()
}

/// Returns false when no event has that id.
pub async fn update_event_odds(
    pool: &SqlitePool,
    event_id: &str,
    home_odds: f64,
    draw_odds: Option<f64>,
    away_odds: f64,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE events SET home_odds = ?, draw_odds = ?, away_odds = ?, updated_at = ? WHERE id = ?",
    )
    .bind(home_odds)
    .bind(draw_odds)
    .bind(away_odds)
    .bind(Utc::now().to_rfc3339())
    .bind(event_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_event_live(pool: &SqlitePool, event_id: &str, is_live: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE events SET is_live = ?, updated_at = ? WHERE id = ?")
        .bind(is_live)
        .bind(Utc::now().to_rfc3339())
        .bind(event_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_event(pool: &SqlitePool, event_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(event_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_events(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// Bet operations
pub async fn insert_bet(pool: &SqlitePool, submission: &BetSubmission) -> Result<StoredBet> {
    let bet = StoredBet {
        id: uuid::Uuid::new_v4().to_string(),
        selections: submission.selections.clone(),
        stake: submission.stake,
        total_odds: submission.total_odds,
        potential_return: submission.potential_return,
        status: "pending".to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO bets (id, selections, stake, total_odds, potential_return, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&bet.id)
    .bind(serde_json::to_string(&bet.selections)?)
    .bind(bet.stake)
    .bind(bet.total_odds)
    .bind(bet.potential_return)
    .bind(&bet.status)
    .bind(bet.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(bet)
}

pub async fn get_bets(pool: &SqlitePool, limit: i64) -> Result<Vec<StoredBet>> {
    let rows = sqlx::query("SELECT * FROM bets ORDER BY created_at DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await?;

    let mut bets = Vec::new();
    for row in rows {
        bets.push(StoredBet {
            id: row.get("id"),
            selections: serde_json::from_str(&row.get::<String, _>("selections"))?,
            stake: row.get("stake"),
            total_odds: row.get("total_odds"),
            potential_return: row.get("potential_return"),
            status: row.get("status"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        });
    }

    Ok(bets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pick, Selection};

    async fn test_pool() -> SqlitePool {
        let pool = create_memory_pool().await.unwrap();
        init_database_with_pool(&pool).await.unwrap();
        pool
    }

    fn event(id: &str, sport: &str) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            sport: sport.to_string(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            league: Some("Premier League".to_string()),
            league_id: Some("premier-league".to_string()),
            country: Some("England".to_string()),
            time: "20:00".to_string(),
            date: "Sat 24 Oct".to_string(),
            start_time: Some(parse_timestamp("2026-10-24T20:00:00Z").unwrap()),
            home_odds: 2.1,
            draw_odds: Some(3.4),
            away_odds: 3.2,
            is_live: None,
            featured: Some(true),
        }
    }

    #[tokio::test]
    async fn test_event_round_trip() {
        let pool = test_pool().await;
        insert_event(&pool, &event("e1", "football")).await.unwrap();
        insert_event(&pool, &event("e2", "basketball")).await.unwrap();

        let stored = get_event_by_id(&pool, "e1").await.unwrap().unwrap();
        assert_eq!(stored, event("e1", "football"));

        assert_eq!(get_events(&pool, None).await.unwrap().len(), 2);
        let football = get_events(&pool, Some("football")).await.unwrap();
        assert_eq!(football.len(), 1);
        assert_eq!(football[0].id, "e1");
    }

    #[tokio::test]
    async fn test_admin_updates() {
        let pool = test_pool().await;
        insert_event(&pool, &event("e1", "football")).await.unwrap();

        assert!(update_event_odds(&pool, "e1", 1.8, None, 4.5).await.unwrap());
        assert!(set_event_live(&pool, "e1", true).await.unwrap());
        let stored = get_event_by_id(&pool, "e1").await.unwrap().unwrap();
        assert_eq!(stored.home_odds, 1.8);
        assert_eq!(stored.draw_odds, None);
        assert_eq!(stored.is_live, Some(true));

        assert!(!update_event_odds(&pool, "missing", 1.8, None, 4.5).await.unwrap());
        assert!(delete_event(&pool, "e1").await.unwrap());
        assert!(get_event_by_id(&pool, "e1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bet_round_trip() {
        let pool = test_pool().await;
        let submission = BetSubmission {
            selections: vec![Selection {
                match_id: "e1".to_string(),
                label: "Arsenal vs Chelsea".to_string(),
                market: "match-winner".to_string(),
                pick: Pick::Home,
                odds: 2.1,
            }],
            stake: 10.0,
            total_odds: 2.1,
            potential_return: 21.0,
        };

        let bet = insert_bet(&pool, &submission).await.unwrap();
        let bets = get_bets(&pool, 10).await.unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].id, bet.id);
        assert_eq!(bets[0].status, "pending");
        assert_eq!(bets[0].selections, submission.selections);
    }
}
