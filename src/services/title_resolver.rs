use crate::catalog::Catalog;
use crate::models::ALL_SPORTS;
use crate::utils::humanize_identifier;

pub const ALL_SPORTS_TITLE: &str = "All Sports";

/// Page heading for a sport/country/league route.
///
/// Most specific identifier wins. Unknown identifiers are shown humanized
/// rather than failing. The `all` pseudo-sport is always "All Sports".
pub fn resolve_title(sport: &str, country: Option<&str>, league: Option<&str>, catalog: &Catalog) -> String {
    if sport == ALL_SPORTS {
        return ALL_SPORTS_TITLE.to_string();
    }

    if let Some(league_id) = league {
        return catalog
            .league(sport, league_id)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| humanize_identifier(league_id));
    }

    if let Some(country_id) = country {
        return match (catalog.sport(sport), catalog.country(sport, country_id)) {
            (Some(s), Some(c)) => format!("{} {}", c.name, s.name),
            _ => humanize_identifier(country_id),
        };
    }

    catalog
        .sport(sport)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| humanize_identifier(sport))
}
