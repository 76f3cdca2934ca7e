mod api;
mod catalog;
mod cli;
mod config;
mod db;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::FilterCriteria;

#[derive(Parser)]
#[command(name = "sportsbook")]
#[command(about = "Sportsbook match board: filtering, titles and live odds refresh")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Sport id, or "all"
    #[arg(short, long, default_value = "all")]
    sport: String,
    /// Country id within the sport
    #[arg(short, long)]
    country: Option<String>,
    /// League id; takes precedence over --country
    #[arg(short, long)]
    league: Option<String>,
    /// Case-insensitive text matched against teams and league
    #[arg(long, default_value = "")]
    search: String,
    /// all, live or upcoming
    #[arg(short, long, default_value = "all")]
    view: String,
    #[arg(long)]
    limit: Option<usize>,
}

impl FilterArgs {
    fn into_criteria(self) -> Result<FilterCriteria> {
        let mut criteria = FilterCriteria::for_sport(self.sport);
        criteria.search_text = self.search.trim().to_string();
        criteria.country = self.country;
        criteria.league = self.league;
        criteria.view_mode = self.view.parse().map_err(anyhow::Error::msg)?;
        criteria.limit = self.limit;
        Ok(criteria)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Initialize and seed the database
    InitDb,
    /// Print the filtered match list once
    Matches {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Follow the filtered match list, refetching on an interval
    Watch {
        #[command(flatten)]
        filters: FilterArgs,
        /// Seconds between refreshes (defaults to REFRESH_INTERVAL_SECS)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Print the page title for a sport/country/league route
    Title {
        #[arg(short, long)]
        sport: String,
        #[arg(short, long)]
        country: Option<String>,
        #[arg(short, long)]
        league: Option<String>,
    },
    /// List the sport → country → league catalog
    Leagues,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(config.port);
            tracing::info!("Starting Sportsbook API server on port {}", port);
            api::serve(config, port).await?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            db::init_database(&config.database_url).await?;
        }
        Some(Commands::Matches { filters }) => {
            cli::list_matches(&config, filters.into_criteria()?).await?;
        }
        Some(Commands::Watch { filters, interval }) => {
            cli::watch_matches(&config, filters.into_criteria()?, interval).await?;
        }
        Some(Commands::Title { sport, country, league }) => {
            cli::show_title(&config, &sport, country.as_deref(), league.as_deref())?;
        }
        Some(Commands::Leagues) => {
            cli::show_leagues(&config)?;
        }
        None => {
            // Default to serving
            let port = config.port;
            tracing::info!("Starting Sportsbook API server on port {}", port);
            api::serve(config, port).await?;
        }
    }

    Ok(())
}
