use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::db::{count_events, insert_event};
use crate::models::EventRecord;

// (id, sport, league id, league, country, home, away, hours from now, home, draw, away, live, featured)
type SeedRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    i64,
    f64,
    Option<f64>,
    f64,
    bool,
    bool,
);

const EVENTS: &[SeedRow] = &[
    ("fb_1",  "football",   "premier-league",   "Premier League",   "England",       "Arsenal",           "Chelsea",            0,  2.10, Some(3.40), 3.30, true,  true),
    ("fb_2",  "football",   "premier-league",   "Premier League",   "England",       "Liverpool",         "Manchester City",    26, 2.45, Some(3.50), 2.80, false, true),
    ("fb_3",  "football",   "championship",     "Championship",     "England",       "Leeds United",      "Sunderland",         50, 1.95, Some(3.40), 3.90, false, false),
    ("fb_4",  "football",   "la-liga",          "La Liga",          "Spain",         "Real Madrid",       "Barcelona",          0,  2.30, Some(3.60), 2.90, true,  true),
    ("fb_5",  "football",   "la-liga",          "La Liga",          "Spain",         "Sevilla",           "Valencia",           28, 2.05, Some(3.20), 3.70, false, false),
    ("fb_6",  "football",   "serie-a",          "Serie A",          "Italy",         "Juventus",          "Inter",              30, 2.60, Some(3.10), 2.75, false, false),
    ("fb_7",  "football",   "bundesliga",       "Bundesliga",       "Germany",       "Bayern Munich",     "Borussia Dortmund",  0,  1.70, Some(4.20), 4.50, true,  false),
    ("fb_8",  "football",   "ligue-1",          "Ligue 1",          "France",        "Paris Saint-Germain", "Marseille",        74, 1.55, Some(4.40), 5.50, false, false),
    ("fb_9",  "football",   "champions-league", "Champions League", "Europe",        "Atletico Madrid",   "AC Milan",           98, 2.20, Some(3.30), 3.40, false, true),
    ("bb_1",  "basketball", "nba",              "NBA",              "USA",           "Boston Celtics",    "Los Angeles Lakers", 0,  1.65, None,       2.30, true,  true),
    ("bb_2",  "basketball", "nba",              "NBA",              "USA",           "Denver Nuggets",    "Golden State Warriors", 20, 1.80, None,    2.05, false, false),
    ("bb_3",  "basketball", "euroleague",       "EuroLeague",       "Europe",        "Real Madrid",       "Olympiacos",         44, 1.75, None,       2.10, false, false),
    ("bb_4",  "basketball", "liga-acb",         "Liga ACB",         "Spain",         "Barcelona",         "Valencia Basket",    68, 1.60, None,       2.40, false, false),
    ("tn_1",  "tennis",     "atp-tour",         "ATP Tour",         "International", "Carlos Alcaraz",    "Jannik Sinner",      0,  1.90, None,       1.90, true,  true),
    ("tn_2",  "tennis",     "wta-tour",         "WTA Tour",         "International", "Iga Swiatek",       "Aryna Sabalenka",    22, 1.85, None,       1.95, false, false),
    ("ih_1",  "ice-hockey", "nhl",              "NHL",              "USA",           "Edmonton Oilers",   "Florida Panthers",   36, 2.00, Some(4.10), 3.05, false, false),
];

pub async fn seed_data(pool: &SqlitePool) -> Result<()> {
    let count = count_events(pool).await?;
    if count > 0 {
        tracing::info!("Database already seeded ({} events found), skipping.", count);
        return Ok(());
    }

    tracing::info!("Seeding database with {} demonstration events...", EVENTS.len());

    let now = Utc::now();
    for (id, sport, league_id, league, country, home, away, hours, home_odds, draw_odds, away_odds, live, featured) in EVENTS {
        let start = now + Duration::hours(*hours);
        let event = EventRecord {
            id: id.to_string(),
            sport: sport.to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            league: Some(league.to_string()),
            league_id: Some(league_id.to_string()),
            country: Some(country.to_string()),
            time: if *live { "LIVE".to_string() } else { start.format("%H:%M").to_string() },
            date: start.format("%a %d %b").to_string(),
            start_time: Some(start),
            home_odds: *home_odds,
            draw_odds: *draw_odds,
            away_odds: *away_odds,
            is_live: Some(*live),
            featured: Some(*featured),
        };
        insert_event(pool, &event).await?;
    }

    tracing::info!("Database seeded successfully.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::db::{create_memory_pool, get_events, init_database_with_pool};

    #[test]
    fn test_seed_leagues_exist_in_catalog() {
        let catalog = Catalog::builtin();
        for row in EVENTS {
            let league = catalog.league(row.1, row.2);
            assert!(league.is_some(), "{} not in catalog", row.2);
            assert_eq!(league.unwrap().country, row.4);
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let pool = create_memory_pool().await.unwrap();
        init_database_with_pool(&pool).await.unwrap();

        seed_data(&pool).await.unwrap();
        seed_data(&pool).await.unwrap();

        assert_eq!(get_events(&pool, None).await.unwrap().len(), EVENTS.len());
    }
}
