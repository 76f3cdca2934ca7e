use crate::models::{Country, League, SportCategory};

// (sport id, sport name, icon, [(country id, country name, [(league id, league name)])])
type CountryRow = (&'static str, &'static str, &'static [(&'static str, &'static str)]);

const HIERARCHY: &[(&str, &str, &str, &[CountryRow])] = &[
    (
        "football",
        "Football",
        "soccer-ball",
        &[
            ("england", "England", &[("premier-league", "Premier League"), ("championship", "Championship")]),
            ("spain", "Spain", &[("la-liga", "La Liga"), ("segunda-division", "Segunda División")]),
            ("italy", "Italy", &[("serie-a", "Serie A")]),
            ("germany", "Germany", &[("bundesliga", "Bundesliga")]),
            ("france", "France", &[("ligue-1", "Ligue 1")]),
            ("europe", "Europe", &[("champions-league", "Champions League"), ("europa-league", "Europa League")]),
        ],
    ),
    (
        "basketball",
        "Basketball",
        "basketball",
        &[
            ("usa", "USA", &[("nba", "NBA")]),
            ("europe", "Europe", &[("euroleague", "EuroLeague")]),
            ("spain", "Spain", &[("liga-acb", "Liga ACB")]),
        ],
    ),
    (
        "tennis",
        "Tennis",
        "tennis-ball",
        &[("international", "International", &[("atp-tour", "ATP Tour"), ("wta-tour", "WTA Tour")])],
    ),
    (
        "ice-hockey",
        "Ice Hockey",
        "hockey-puck",
        &[("usa", "USA", &[("nhl", "NHL")]), ("sweden", "Sweden", &[("shl", "SHL")])],
    ),
];

pub(super) fn sports() -> Vec<SportCategory> {
    HIERARCHY
        .iter()
        .map(|(sport_id, sport_name, icon, countries)| SportCategory {
            id: sport_id.to_string(),
            name: sport_name.to_string(),
            icon: icon.to_string(),
            countries: countries
                .iter()
                .map(|(country_id, country_name, leagues)| Country {
                    id: country_id.to_string(),
                    name: country_name.to_string(),
                    leagues: leagues
                        .iter()
                        .map(|(league_id, league_name)| League {
                            id: league_id.to_string(),
                            name: league_name.to_string(),
                            country: country_name.to_string(),
                            sport: sport_id.to_string(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}
