use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{BetSubmission, Match, Pick, Selection};
use crate::utils::{is_valid_price, odds_to_probability};

pub const MATCH_WINNER: &str = "match-winner";

#[derive(Debug, Error, PartialEq)]
pub enum SlipError {
    #[error("the slip has no selections")]
    Empty,
    #[error("stake must be a positive amount, got {0}")]
    InvalidStake(f64),
    #[error("selection for match {match_id} has an invalid price {odds}")]
    InvalidPrice { match_id: String, odds: f64 },
    #[error("match {0} does not offer a draw")]
    NoDrawMarket(String),
}

/// Selections staged locally before being handed over. One selection per
/// match; picking again on the same match replaces the earlier pick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BetSlip {
    selections: Vec<Selection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipQuote {
    pub selections: usize,
    pub stake: f64,
    pub total_odds: f64,
    pub implied_probability: f64,
    pub potential_return: f64,
}

impl BetSlip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_selections(selections: Vec<Selection>) -> Result<Self, SlipError> {
        let mut slip = Self::new();
        for selection in selections {
            slip.add(selection)?;
        }
        Ok(slip)
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn add(&mut self, selection: Selection) -> Result<(), SlipError> {
        if !is_valid_price(selection.odds) {
            return Err(SlipError::InvalidPrice {
                match_id: selection.match_id,
                odds: selection.odds,
            });
        }

        match self.selections.iter_mut().find(|s| s.match_id == selection.match_id) {
            Some(existing) => *existing = selection,
            None => self.selections.push(selection),
        }
        Ok(())
    }

    /// Stage the match-winner pick for `m` at its current price.
    pub fn pick(&mut self, m: &Match, pick: Pick) -> Result<(), SlipError> {
        let odds = match pick {
            Pick::Home => m.home_odds,
            Pick::Away => m.away_odds,
            Pick::Draw => m.draw_odds.ok_or_else(|| SlipError::NoDrawMarket(m.id.clone()))?,
        };

        self.add(Selection {
            match_id: m.id.clone(),
            label: format!("{} vs {}", m.home_team, m.away_team),
            market: MATCH_WINNER.to_string(),
            pick,
            odds,
        })
    }

    /// Returns the removed selection, if the match was on the slip.
    pub fn remove(&mut self, match_id: &str) -> Option<Selection> {
        let index = self.selections.iter().position(|s| s.match_id == match_id)?;
        Some(self.selections.remove(index))
    }

    pub fn clear(&mut self) {
        self.selections.clear();
    }

    /// Accumulator price: product of every selection's odds (1.0 when empty).
    pub fn total_odds(&self) -> f64 {
        self.selections.iter().map(|s| s.odds).product()
    }

    pub fn potential_return(&self, stake: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        stake * self.total_odds()
    }

    pub fn quote(&self, stake: f64) -> SlipQuote {
        let total_odds = self.total_odds();
        SlipQuote {
            selections: self.len(),
            stake,
            total_odds,
            implied_probability: if self.is_empty() { 0.0 } else { odds_to_probability(total_odds) },
            potential_return: self.potential_return(stake),
        }
    }

    /// Validated payload for downstream submission.
    pub fn submission(&self, stake: f64) -> Result<BetSubmission, SlipError> {
        if self.is_empty() {
            return Err(SlipError::Empty);
        }
        if !stake.is_finite() || stake <= 0.0 {
            return Err(SlipError::InvalidStake(stake));
        }

        Ok(BetSubmission {
            selections: self.selections.clone(),
            stake,
            total_odds: self.total_odds(),
            potential_return: self.potential_return(stake),
        })
    }
}

/// Open slips, keyed by id, held until they are submitted or discarded.
#[derive(Debug, Default)]
pub struct SlipBook {
    slips: Mutex<HashMap<String, BetSlip>>,
}

impl SlipBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty slip and return its id.
    pub async fn open(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut slips = self.slips.lock().await;
        slips.insert(id.clone(), BetSlip::new());
        tracing::debug!("Opened slip {} ({} open)", id, slips.len());
        id
    }

    /// Run `f` against the slip; `None` when no such slip is open.
    pub async fn with_slip<R>(&self, id: &str, f: impl FnOnce(&mut BetSlip) -> R) -> Option<R> {
        let mut slips = self.slips.lock().await;
        slips.get_mut(id).map(f)
    }

    pub async fn get(&self, id: &str) -> Option<BetSlip> {
        self.slips.lock().await.get(id).cloned()
    }

    /// Drop the slip, returning what was on it.
    pub async fn close(&self, id: &str) -> Option<BetSlip> {
        self.slips.lock().await.remove(id)
    }
}
