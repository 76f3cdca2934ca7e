use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::slugify;

/// A single fixture as shown on the match board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub sport: String,
    pub league: String, // display label, e.g. "Premier League"
    pub league_id: String, // identifier used for filtering, e.g. "premier-league"
    pub country: String,
    pub time: String,
    pub date: String,
    pub start_time: Option<DateTime<Utc>>,
    pub home_odds: f64,
    pub draw_odds: Option<f64>, // Absent for two-outcome sports
    pub away_odds: f64,
    pub is_live: Option<bool>,
    pub featured: Option<bool>,
}

impl Match {
    pub fn is_live(&self) -> bool {
        self.is_live == Some(true)
    }
}

/// Row shape returned by an event source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub sport: String,
    pub home_team: String,
    pub away_team: String,
    pub league: Option<String>,
    pub league_id: Option<String>,
    pub country: Option<String>,
    pub time: String,
    pub date: String,
    pub start_time: Option<DateTime<Utc>>,
    pub home_odds: f64,
    pub draw_odds: Option<f64>,
    pub away_odds: f64,
    pub is_live: Option<bool>,
    pub featured: Option<bool>,
}

impl From<EventRecord> for Match {
    fn from(event: EventRecord) -> Self {
        let league = event.league.unwrap_or_default();
        let league_id = event
            .league_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| slugify(&league));

        Match {
            id: event.id,
            home_team: event.home_team,
            away_team: event.away_team,
            sport: event.sport,
            league,
            league_id,
            country: event.country.unwrap_or_default(),
            time: event.time,
            date: event.date,
            start_time: event.start_time,
            home_odds: event.home_odds,
            draw_odds: event.draw_odds,
            away_odds: event.away_odds,
            is_live: event.is_live,
            featured: event.featured,
        }
    }
}

// ── Static hierarchy ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportCategory {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub countries: Vec<Country>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub id: String,
    pub name: String,
    pub leagues: Vec<League>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: String,
    pub name: String,
    pub country: String, // Name of the enclosing country
    pub sport: String,   // Id of the enclosing sport
}

// ── Filtering ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    All,
    Live,
    Upcoming,
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "" => Ok(ViewMode::All),
            "live" => Ok(ViewMode::Live),
            "upcoming" => Ok(ViewMode::Upcoming),
            other => Err(format!("unknown view mode '{}'", other)),
        }
    }
}

pub const ALL_SPORTS: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub search_text: String,
    pub sport: String,
    pub country: Option<String>,
    pub league: Option<String>,
    pub view_mode: ViewMode,
    pub limit: Option<usize>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            sport: ALL_SPORTS.to_string(),
            country: None,
            league: None,
            view_mode: ViewMode::All,
            limit: None,
        }
    }
}

impl FilterCriteria {
    pub fn for_sport(sport: impl Into<String>) -> Self {
        Self {
            sport: sport.into(),
            ..Self::default()
        }
    }

    /// Sport id to pass to the event source; `None` means every sport.
    pub fn source_sport(&self) -> Option<&str> {
        if self.sport.is_empty() || self.sport == ALL_SPORTS {
            None
        } else {
            Some(&self.sport)
        }
    }

    /// True when no criterion narrows the list.
    pub fn is_unfiltered(&self) -> bool {
        self.search_text.is_empty()
            && self.source_sport().is_none()
            && self.country.is_none()
            && self.league.is_none()
            && self.view_mode == ViewMode::All
            && self.limit.is_none()
    }
}

// ── Betting slip ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pick {
    Home,
    Draw,
    Away,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub match_id: String,
    pub label: String, // e.g. "Arsenal vs Chelsea"
    pub market: String, // e.g. "match-winner"
    pub pick: Pick,
    pub odds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetSubmission {
    pub selections: Vec<Selection>,
    pub stake: f64,
    pub total_odds: f64,
    pub potential_return: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBet {
    pub id: String,
    pub selections: Vec<Selection>,
    pub stake: f64,
    pub total_odds: f64,
    pub potential_return: f64,
    pub status: String, // "pending" until a downstream system picks it up
    pub created_at: DateTime<Utc>,
}

// ── AI insight ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightTeams {
    pub home: String,
    pub away: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    #[serde(rename = "match")]
    pub match_name: String,
    pub teams: InsightTeams,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub current_form: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInsight {
    pub prediction: String,
    pub confidence: u8, // 0-100
    pub analysis: String,
    pub trend: String,
    pub odds: String,
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}
