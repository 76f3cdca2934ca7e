//! Derives the displayed match list from a source collection and the
//! active filter criteria.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::models::{EventRecord, FilterCriteria, Match, ViewMode, ALL_SPORTS};
use crate::services::title_resolver::resolve_title;

pub const FALLBACK_SPORT: &str = "football";

/// Match collections keyed by sport id, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SportCollections {
    order: Vec<String>,
    by_sport: HashMap<String, Vec<Match>>,
    all: Vec<Match>,
}

impl SportCollections {
    pub fn get(&self, sport: &str) -> Option<&[Match]> {
        self.by_sport.get(sport).map(Vec::as_slice)
    }

    /// Every match, grouped sport by sport.
    pub fn all(&self) -> &[Match] {
        &self.all
    }

    pub fn sports(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Normalise a fetched event. A missing league id is looked up in the
/// catalog by league label before falling back to a slug of the label.
pub fn match_from_event(event: EventRecord, catalog: &Catalog) -> Match {
    let has_id = event.league_id.as_deref().is_some_and(|id| !id.is_empty());
    let resolved = match (&event.league, has_id) {
        (Some(label), false) => catalog
            .league_by_name(&event.sport, label)
            .map(|l| l.id.clone()),
        _ => None,
    };

    let mut m = Match::from(event);
    if let Some(league_id) = resolved {
        m.league_id = league_id;
    }
    m
}

/// Build fresh per-sport collections from a fetched batch.
pub fn group_by_sport(events: Vec<EventRecord>, catalog: &Catalog) -> SportCollections {
    let mut order: Vec<String> = Vec::new();
    let mut by_sport: HashMap<String, Vec<Match>> = HashMap::new();

    for event in events {
        let m = match_from_event(event, catalog);
        if !by_sport.contains_key(&m.sport) {
            order.push(m.sport.clone());
        }
        by_sport.entry(m.sport.clone()).or_default().push(m);
    }

    let all = order
        .iter()
        .flat_map(|sport| by_sport[sport].iter().cloned())
        .collect();

    SportCollections { order, by_sport, all }
}

/// Pick the collection for `sport`. Unknown sports fall back to football;
/// "all" selects every collection.
pub fn select_sport_matches<'a>(collections: &'a SportCollections, sport: &str) -> &'a [Match] {
    if sport == ALL_SPORTS {
        return collections.all();
    }
    match collections.get(sport) {
        Some(matches) => matches,
        None => {
            tracing::debug!("Unknown sport '{}', falling back to {}", sport, FALLBACK_SPORT);
            collections.get(FALLBACK_SPORT).unwrap_or(&[])
        }
    }
}

/// Ordered subset of `matches` satisfying every criterion.
///
/// A league filter takes precedence over a country filter: when both are
/// set only the league is checked.
pub fn filter_matches(matches: &[Match], criteria: &FilterCriteria, catalog: &Catalog) -> Vec<Match> {
    let country_leagues = match (&criteria.league, &criteria.country) {
        (None, Some(country)) => Some(catalog.league_ids_for_country(&criteria.sport, country)),
        _ => None,
    };
    let needle = criteria.search_text.to_lowercase();

    let survivors = matches.iter().filter(|m| {
        if let Some(league) = &criteria.league {
            if m.league_id != *league {
                return false;
            }
        } else if let Some(keep) = &country_leagues {
            if !keep.contains(m.league_id.as_str()) {
                return false;
            }
        }

        if !needle.is_empty() && !matches_search(m, &needle) {
            return false;
        }

        match criteria.view_mode {
            ViewMode::All => true,
            ViewMode::Live => m.is_live(),
            ViewMode::Upcoming => !m.is_live(),
        }
    });

    match criteria.limit {
        Some(limit) => survivors.take(limit).cloned().collect(),
        None => survivors.cloned().collect(),
    }
}

fn matches_search(m: &Match, needle: &str) -> bool {
    m.home_team.to_lowercase().contains(needle)
        || m.away_team.to_lowercase().contains(needle)
        || m.league.to_lowercase().contains(needle)
}

/// A filtered list together with the heading it is shown under.
#[derive(Debug, Serialize)]
pub struct MatchListing {
    pub title: String,
    pub total: usize,
    pub matches: Vec<Match>,
}

/// Fetch-independent half of the pipeline: group, select, filter, title.
pub fn build_listing(events: Vec<EventRecord>, criteria: &FilterCriteria, catalog: &Catalog) -> MatchListing {
    let collections = group_by_sport(events, catalog);
    let source = select_sport_matches(&collections, &criteria.sport);
    let matches = filter_matches(source, criteria, catalog);

    MatchListing {
        title: resolve_title(&criteria.sport, criteria.country.as_deref(), criteria.league.as_deref(), catalog),
        total: matches.len(),
        matches,
    }
}
