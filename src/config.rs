use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::refresh::{DEFAULT_FETCH_TIMEOUT, DEFAULT_REFRESH_INTERVAL};

const DEFAULT_DATABASE_URL: &str = "sqlite:data/sportsbook.db";
const DEFAULT_INSIGHT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_INSIGHT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct InsightConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
    pub catalog_path: Option<PathBuf>,
    pub insight: InsightConfig,
}

impl Config {
    /// Read configuration from the environment (call `dotenv` first).
    pub fn from_env() -> Self {
        let fetch_timeout = Duration::from_secs(parse_var("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT.as_secs()));

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            port: parse_var("PORT", 3000),
            refresh_interval: Duration::from_secs(parse_var("REFRESH_INTERVAL_SECS", DEFAULT_REFRESH_INTERVAL.as_secs())),
            fetch_timeout,
            catalog_path: env::var("CATALOG_PATH").ok().filter(|p| !p.is_empty()).map(PathBuf::from),
            insight: InsightConfig {
                endpoint: env::var("INSIGHT_API_URL").unwrap_or_else(|_| DEFAULT_INSIGHT_URL.to_string()),
                api_key: env::var("INSIGHT_API_KEY").ok().filter(|k| !k.is_empty()),
                model: env::var("INSIGHT_MODEL").unwrap_or_else(|_| DEFAULT_INSIGHT_MODEL.to_string()),
                timeout: Duration::from_secs(30),
            },
        }
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => parse_or(name, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(name: &str, raw: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid value '{}' for {}, using {}", raw, name, default);
        default
    })
}
