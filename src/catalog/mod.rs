//! Static sport → country → league hierarchy.
//!
//! Loaded once at start-up (built-in or from a JSON file) and shared
//! read-only; lookups are by exact identifier at every level.

mod default;

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::models::{Country, League, SportCategory};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("league '{league}' declares sport '{declared}' but sits under sport '{sport}'")]
    SportMismatch {
        league: String,
        declared: String,
        sport: String,
    },
    #[error("league '{league}' declares country '{declared}' but sits under country '{country}'")]
    CountryMismatch {
        league: String,
        declared: String,
        country: String,
    },
}

#[derive(Debug, Clone)]
pub struct Catalog {
    sports: Vec<SportCategory>,
}

impl Catalog {
    pub fn new(sports: Vec<SportCategory>) -> Result<Self, CatalogError> {
        for sport in &sports {
            for country in &sport.countries {
                for league in &country.leagues {
                    if league.sport != sport.id {
                        return Err(CatalogError::SportMismatch {
                            league: league.id.clone(),
                            declared: league.sport.clone(),
                            sport: sport.id.clone(),
                        });
                    }
                    if league.country != country.name {
                        return Err(CatalogError::CountryMismatch {
                            league: league.id.clone(),
                            declared: league.country.clone(),
                            country: country.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(Self { sports })
    }

    /// The hierarchy compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            sports: default::sports(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let sports: Vec<SportCategory> = serde_json::from_str(json)?;
        Self::new(sports)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Use `path` when given, otherwise the built-in hierarchy.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                let catalog = Self::from_json_file(path)?;
                tracing::info!("Loaded catalog from {} ({} sports)", path.display(), catalog.sports.len());
                Ok(catalog)
            }
            None => Ok(Self::builtin()),
        }
    }

    pub fn sports(&self) -> &[SportCategory] {
        &self.sports
    }

    pub fn sport(&self, sport_id: &str) -> Option<&SportCategory> {
        self.sports.iter().find(|s| s.id == sport_id)
    }

    pub fn country(&self, sport_id: &str, country_id: &str) -> Option<&Country> {
        self.sport(sport_id)?
            .countries
            .iter()
            .find(|c| c.id == country_id)
    }

    /// Find a league by id, scoped to one sport.
    pub fn league(&self, sport_id: &str, league_id: &str) -> Option<&League> {
        self.sport(sport_id)?
            .countries
            .iter()
            .flat_map(|c| c.leagues.iter())
            .find(|l| l.id == league_id)
    }

    /// Find a league by its display name, ignoring case, scoped to one sport.
    pub fn league_by_name(&self, sport_id: &str, name: &str) -> Option<&League> {
        let name = name.trim().to_lowercase();
        self.sport(sport_id)?
            .countries
            .iter()
            .flat_map(|c| c.leagues.iter())
            .find(|l| l.name.to_lowercase() == name)
    }

    /// League ids under `country_id` within `sport_id`. Empty when either is unknown.
    pub fn league_ids_for_country(&self, sport_id: &str, country_id: &str) -> HashSet<&str> {
        self.country(sport_id, country_id)
            .map(|c| c.leagues.iter().map(|l| l.id.as_str()).collect())
            .unwrap_or_default()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_consistent() {
        let catalog = Catalog::builtin();
        assert!(Catalog::new(catalog.sports().to_vec()).is_ok());
        assert!(catalog.sport("football").is_some());
    }

    #[test]
    fn test_lookups_are_scoped_to_sport() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.league("football", "la-liga").map(|l| l.name.as_str()), Some("La Liga"));
        assert!(catalog.league("basketball", "la-liga").is_none());
        assert_eq!(catalog.country("football", "spain").map(|c| c.name.as_str()), Some("Spain"));
    }

    #[test]
    fn test_league_by_name_keeps_accents() {
        let catalog = Catalog::builtin();
        let league = catalog.league_by_name("football", "segunda división").unwrap();
        assert_eq!(league.id, "segunda-division");
        assert_eq!(catalog.league_by_name("football", " La Liga ").map(|l| l.id.as_str()), Some("la-liga"));
        assert!(catalog.league_by_name("basketball", "La Liga").is_none());
    }

    #[test]
    fn test_league_ids_for_unknown_country_is_empty() {
        let catalog = Catalog::builtin();
        assert!(catalog.league_ids_for_country("football", "atlantis").is_empty());
        assert!(catalog.league_ids_for_country("curling", "spain").is_empty());
        assert!(catalog.league_ids_for_country("football", "england").contains("premier-league"));
    }

    #[test]
    fn test_rejects_league_under_wrong_sport() {
        let json = r#"[{"id":"football","name":"Football","icon":"ball","countries":[
            {"id":"spain","name":"Spain","leagues":[
                {"id":"acb","name":"Liga ACB","country":"Spain","sport":"basketball"}]}]}]"#;
        assert!(matches!(
            Catalog::from_json_str(json),
            Err(CatalogError::SportMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_league_under_wrong_country() {
        let json = r#"[{"id":"football","name":"Football","icon":"ball","countries":[
            {"id":"spain","name":"Spain","leagues":[
                {"id":"serie-a","name":"Serie A","country":"Italy","sport":"football"}]}]}]"#;
        assert!(matches!(
            Catalog::from_json_str(json),
            Err(CatalogError::CountryMismatch { .. })
        ));
    }
}
