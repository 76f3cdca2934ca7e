//! Back-office routes: thin wrappers over the event and bet store.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;

use super::{internal, reject, ApiError, ApiResult, AppState};
use crate::db::{delete_event, get_bets, get_event_by_id, insert_event, set_event_live, update_event_odds};
use crate::models::{ApiResponse, EventRecord, StoredBet};
use crate::utils::is_valid_price;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event_handler))
        .route("/events/{id}", delete(delete_event_handler))
        .route("/events/{id}/odds", put(update_odds_handler))
        .route("/events/{id}/live", put(set_live_handler))
        .route("/bets", get(list_bets_handler))
}

fn check_prices(home: f64, draw: Option<f64>, away: f64) -> Result<(), ApiError> {
    let draw_ok = draw.map_or(true, is_valid_price);
    if is_valid_price(home) && is_valid_price(away) && draw_ok {
        Ok(())
    } else {
        Err(reject(StatusCode::BAD_REQUEST, "odds must be decimal prices above 1.0"))
    }
}

// POST /admin/events - Create or replace an event
async fn create_event_handler(
    State(state): State<AppState>,
    Json(event): Json<EventRecord>,
) -> ApiResult<EventRecord> {
    if event.id.trim().is_empty() || event.home_team.trim().is_empty() || event.away_team.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "id, homeTeam and awayTeam are required"));
    }
    check_prices(event.home_odds, event.draw_odds, event.away_odds)?;

    match insert_event(&state.pool, &event).await {
        Ok(()) => {
            tracing::info!("Admin stored event {} ({} vs {})", event.id, event.home_team, event.away_team);
            Ok(Json(ApiResponse::success(event)))
        }
        Err(e) => Err(internal("Failed to store event", e)),
    }
}

// PUT /admin/events/{id}/odds
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OddsUpdate {
    home_odds: f64,
    draw_odds: Option<f64>,
    away_odds: f64,
}

async fn update_odds_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(update): Json<OddsUpdate>,
) -> ApiResult<EventRecord> {
    check_prices(update.home_odds, update.draw_odds, update.away_odds)?;

    match update_event_odds(&state.pool, &event_id, update.home_odds, update.draw_odds, update.away_odds).await {
        Ok(true) => fetch_event(&state, &event_id).await,
        Ok(false) => Err(reject(StatusCode::NOT_FOUND, format!("event {} not found", event_id))),
        Err(e) => Err(internal("Failed to update odds", e)),
    }
}

// PUT /admin/events/{id}/live
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveUpdate {
    is_live: bool,
}

async fn set_live_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(update): Json<LiveUpdate>,
) -> ApiResult<EventRecord> {
    match set_event_live(&state.pool, &event_id, update.is_live).await {
        Ok(true) => fetch_event(&state, &event_id).await,
        Ok(false) => Err(reject(StatusCode::NOT_FOUND, format!("event {} not found", event_id))),
        Err(e) => Err(internal("Failed to update live flag", e)),
    }
}

// DELETE /admin/events/{id}
async fn delete_event_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<String> {
    match delete_event(&state.pool, &event_id).await {
        Ok(true) => {
            tracing::info!("Admin deleted event {}", event_id);
            Ok(Json(ApiResponse::success(event_id)))
        }
        Ok(false) => Err(reject(StatusCode::NOT_FOUND, format!("event {} not found", event_id))),
        Err(e) => Err(internal("Failed to delete event", e)),
    }
}

// GET /admin/bets - Most recent staged bets
#[derive(Deserialize)]
struct BetsQuery {
    limit: Option<i64>,
}

async fn list_bets_handler(
    State(state): State<AppState>,
    Query(params): Query<BetsQuery>,
) -> ApiResult<Vec<StoredBet>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    match get_bets(&state.pool, limit).await {
        Ok(bets) => Ok(Json(ApiResponse::success(bets))),
        Err(e) => Err(internal("Failed to fetch bets", e)),
    }
}

async fn fetch_event(state: &AppState, event_id: &str) -> ApiResult<EventRecord> {
    match get_event_by_id(&state.pool, event_id).await {
        Ok(Some(event)) => Ok(Json(ApiResponse::success(event))),
        Ok(None) => Err(reject(StatusCode::NOT_FOUND, format!("event {} not found", event_id))),
        Err(e) => Err(internal("Failed to load event", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_prices() {
        assert!(check_prices(1.9, None, 2.1).is_ok());
        assert!(check_prices(1.9, Some(3.3), 2.1).is_ok());
        assert!(check_prices(1.0, None, 2.1).is_err());
        assert!(check_prices(1.9, Some(f64::NAN), 2.1).is_err());
    }
}
