/// Turn an identifier such as "mystery-cup" into readable text ("mystery cup").
pub fn humanize_identifier(identifier: &str) -> String {
    identifier.replace(['-', '_'], " ")
}

/// Lower-case, hyphen-separated identifier for a display label
/// ("Premier League" -> "premier-league").
pub fn slugify(label: &str) -> String {
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Render decimal odds for display. Malformed prices show as "0.00".
pub fn format_odds(odds: f64) -> String {
    if odds.is_finite() && odds > 0.0 {
        format!("{:.2}", odds)
    } else {
        "0.00".to_string()
    }
}

/// A decimal price a selection can actually be staged at.
pub fn is_valid_price(odds: f64) -> bool {
    odds.is_finite() && odds > 1.0
}

/// Convert decimal odds to implied probability
pub fn odds_to_probability(odds: f64) -> f64 {
    if odds <= 1.0 {
        return 0.99; // Cap at 99%
    }
    (1.0 / odds).min(0.99)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_identifier() {
        assert_eq!(humanize_identifier("mystery-cup"), "mystery cup");
        assert_eq!(humanize_identifier("serie_a"), "serie a");
        assert_eq!(humanize_identifier("nba"), "nba");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Premier League"), "premier-league");
        assert_eq!(slugify("  Serie A "), "serie-a");
        assert_eq!(slugify("ATP Tour: Masters"), "atp-tour-masters");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_format_odds() {
        assert_eq!(format_odds(2.5), "2.50");
        assert_eq!(format_odds(f64::NAN), "0.00");
        assert_eq!(format_odds(-1.0), "0.00");
    }

    #[test]
    fn test_odds_to_probability() {
        assert!((odds_to_probability(2.0) - 0.5).abs() < 0.001);
        assert!((odds_to_probability(4.0) - 0.25).abs() < 0.001);
        assert_eq!(odds_to_probability(1.0), 0.99);
    }
}
