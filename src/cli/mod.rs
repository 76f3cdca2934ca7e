use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::db::{create_pool, init_database_with_pool, seed_data};
use crate::models::{FilterCriteria, Match};
use crate::services::{
    build_listing, resolve_title, EventSource, FeedSnapshot, RefreshController, RefreshOptions,
    StoreEventSource,
};
use crate::utils::format_odds;

async fn open_source(config: &Config) -> Result<Arc<dyn EventSource>> {
    let pool = create_pool(&config.database_url).await?;
    init_database_with_pool(&pool).await?;
    seed_data(&pool).await?;
    Ok(Arc::new(StoreEventSource::new(pool)))
}

fn print_match(index: usize, m: &Match) {
    let live = if m.is_live() { "🔴 LIVE " } else { "" };
    let draw = m
        .draw_odds
        .map_or(String::new(), |d| format!(" | X {}", format_odds(d)));

    println!("{}. {}{} vs {} ({}, {} {})",
        index + 1,
        live,
        m.home_team,
        m.away_team,
        m.league,
        m.date,
        m.time
    );
    println!("   1 {}{} | 2 {}",
        format_odds(m.home_odds),
        draw,
        format_odds(m.away_odds)
    );
}

pub async fn list_matches(config: &Config, criteria: FilterCriteria) -> Result<()> {
    let catalog = Catalog::load(config.catalog_path.as_deref())?;
    let source = open_source(config).await?;

    let events = source.get_events(None).await?;
    let listing = build_listing(events, &criteria, &catalog);

    println!("🏟️  {}\n", listing.title);

    if listing.matches.is_empty() {
        println!("📭 No matches found for these filters.");
        if !criteria.search_text.is_empty() {
            println!("💡 Try a shorter search, or drop --search");
        }
        return Ok(());
    }

    for (i, m) in listing.matches.iter().enumerate() {
        print_match(i, m);
    }

    println!("\n✅ {} matches", listing.total);
    Ok(())
}

pub async fn watch_matches(config: &Config, criteria: FilterCriteria, interval: Option<u64>) -> Result<()> {
    let catalog = Arc::new(Catalog::load(config.catalog_path.as_deref())?);
    let source = open_source(config).await?;

    let interval = interval.map(Duration::from_secs).unwrap_or(config.refresh_interval);
    let title = resolve_title(&criteria.sport, criteria.country.as_deref(), criteria.league.as_deref(), &catalog);

    let controller = RefreshController::spawn(
        source,
        catalog,
        criteria,
        RefreshOptions {
            interval,
            fetch_timeout: config.fetch_timeout,
            initial: None,
        },
    );
    let mut updates = controller.subscribe();

    println!("👀 Watching {} (refresh every {}s, Ctrl+C to stop)\n", title, interval.as_secs());

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_snapshot(&snapshot);
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n👋 Stopped watching");
                break;
            }
        }
    }

    controller.shutdown();
    Ok(())
}

fn print_snapshot(snapshot: &FeedSnapshot) {
    let at = snapshot
        .refreshed_at
        .map_or("-".to_string(), |t| t.format("%H:%M:%S").to_string());
    println!("🔄 Refresh #{} at {} ({} matches)", snapshot.cycle, at, snapshot.matches.len());

    for (i, m) in snapshot.matches.iter().enumerate() {
        print_match(i, m);
    }
    println!();
}

pub fn show_title(config: &Config, sport: &str, country: Option<&str>, league: Option<&str>) -> Result<()> {
    let catalog = Catalog::load(config.catalog_path.as_deref())?;
    println!("{}", resolve_title(sport, country, league, &catalog));
    Ok(())
}

pub fn show_leagues(config: &Config) -> Result<()> {
    let catalog = Catalog::load(config.catalog_path.as_deref())?;

    println!("🏆 Available Leagues:\n");

    for sport in catalog.sports() {
        println!("📊 {} ({}):", sport.name.to_uppercase(), sport.id);
        for country in &sport.countries {
            println!("   {} ({})", country.name, country.id);
            for league in &country.leagues {
                println!("      • {} ({})", league.name, league.id);
            }
        }
        println!();
    }

    println!("💡 Use 'sportsbook matches --sport <sport> --country <country>' to list matches");
    println!("💡 Use 'sportsbook watch --sport <sport>' to follow live odds");

    Ok(())
}
