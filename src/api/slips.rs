//! Server-held bet slips: open, pick, remove, clear, quote and submit.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use super::{internal, reject, ApiError, ApiResult, AppState};
use crate::db::{get_event_by_id, insert_bet};
use crate::models::{ApiResponse, Pick, Selection, StoredBet};
use crate::services::{match_from_event, BetSlip, SlipError, SlipQuote};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/slips", post(open_slip_handler))
        .route("/slips/{id}", get(get_slip_handler).delete(discard_slip_handler))
        .route("/slips/{id}/picks", post(add_pick_handler).delete(clear_slip_handler))
        .route("/slips/{id}/picks/{match_id}", delete(remove_pick_handler))
        .route("/slips/{id}/quote", get(quote_handler))
        .route("/slips/{id}/submit", post(submit_handler))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipView {
    pub id: String,
    pub selections: Vec<Selection>,
    pub total_odds: f64,
}

fn view(id: &str, slip: &BetSlip) -> SlipView {
    SlipView {
        id: id.to_string(),
        selections: slip.selections().to_vec(),
        total_odds: slip.total_odds(),
    }
}

fn slip_not_found(id: &str) -> ApiError {
    reject(StatusCode::NOT_FOUND, format!("slip {} not found", id))
}

fn slip_rejected(e: SlipError) -> ApiError {
    reject(StatusCode::BAD_REQUEST, e.to_string())
}

// POST /slips - Open an empty slip
async fn open_slip_handler(State(state): State<AppState>) -> Json<ApiResponse<SlipView>> {
    let id = state.slips.open().await;
    Json(ApiResponse::success(view(&id, &BetSlip::new())))
}

// GET /slips/{id}
async fn get_slip_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SlipView> {
    match state.slips.get(&id).await {
        Some(slip) => Ok(Json(ApiResponse::success(view(&id, &slip)))),
        None => Err(slip_not_found(&id)),
    }
}

// DELETE /slips/{id} - Discard the slip entirely
async fn discard_slip_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SlipView> {
    match state.slips.close(&id).await {
        Some(slip) => Ok(Json(ApiResponse::success(view(&id, &slip)))),
        None => Err(slip_not_found(&id)),
    }
}

// POST /slips/{id}/picks - Stage a match-winner pick at the stored price
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PickRequest {
    match_id: String,
    pick: Pick,
}

async fn add_pick_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PickRequest>,
) -> ApiResult<SlipView> {
    let event = match get_event_by_id(&state.pool, &request.match_id).await {
        Ok(Some(event)) => event,
        Ok(None) => {
            return Err(reject(StatusCode::NOT_FOUND, format!("match {} not found", request.match_id)));
        }
        Err(e) => return Err(internal("Failed to load match", e)),
    };
    let m = match_from_event(event, &state.catalog);

    let outcome = state
        .slips
        .with_slip(&id, |slip| -> Result<SlipView, SlipError> {
            slip.pick(&m, request.pick)?;
            Ok(view(&id, slip))
        })
        .await;

    match outcome {
        Some(Ok(slip)) => Ok(Json(ApiResponse::success(slip))),
        Some(Err(e)) => Err(slip_rejected(e)),
        None => Err(slip_not_found(&id)),
    }
}

// DELETE /slips/{id}/picks/{match_id}
async fn remove_pick_handler(
    State(state): State<AppState>,
    Path((id, match_id)): Path<(String, String)>,
) -> ApiResult<SlipView> {
    let outcome = state
        .slips
        .with_slip(&id, |slip| {
            if slip.remove(&match_id).is_some() {
                Some(view(&id, slip))
            } else {
                None
            }
        })
        .await;

    match outcome {
        Some(Some(slip)) => Ok(Json(ApiResponse::success(slip))),
        Some(None) => Err(reject(
            StatusCode::NOT_FOUND,
            format!("match {} is not on slip {}", match_id, id),
        )),
        None => Err(slip_not_found(&id)),
    }
}

// DELETE /slips/{id}/picks - Empty the slip but keep it open
async fn clear_slip_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SlipView> {
    let outcome = state
        .slips
        .with_slip(&id, |slip| {
            slip.clear();
            view(&id, slip)
        })
        .await;

    outcome
        .map(|slip| Json(ApiResponse::success(slip)))
        .ok_or_else(|| slip_not_found(&id))
}

// GET /slips/{id}/quote?stake=
#[derive(Deserialize)]
struct StakeQuery {
    stake: f64,
}

async fn quote_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<StakeQuery>,
) -> ApiResult<SlipQuote> {
    match state.slips.get(&id).await {
        Some(slip) => Ok(Json(ApiResponse::success(slip.quote(params.stake)))),
        None => Err(slip_not_found(&id)),
    }
}

// POST /slips/{id}/submit - Record the slip as a pending bet and close it
async fn submit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StakeQuery>,
) -> ApiResult<StoredBet> {
    let slip = state.slips.get(&id).await.ok_or_else(|| slip_not_found(&id))?;
    let submission = slip.submission(request.stake).map_err(slip_rejected)?;

    match insert_bet(&state.pool, &submission).await {
        Ok(bet) => {
            state.slips.close(&id).await;
            tracing::info!("Slip {} submitted as bet {}", id, bet.id);
            Ok(Json(ApiResponse::success(bet)))
        }
        Err(e) => Err(internal("Failed to store bet", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventRecord;

    #[test]
    fn test_view_reports_selections_and_price() {
        let mut slip = BetSlip::new();
        let m = match_from_event(
            EventRecord {
                id: "fb_1".to_string(),
                sport: "football".to_string(),
                home_team: "Arsenal".to_string(),
                away_team: "Chelsea".to_string(),
                league: Some("Premier League".to_string()),
                league_id: None,
                country: Some("England".to_string()),
                time: "20:00".to_string(),
                date: "Today".to_string(),
                start_time: None,
                home_odds: 2.1,
                draw_odds: Some(3.4),
                away_odds: 3.2,
                is_live: None,
                featured: None,
            },
            &crate::catalog::Catalog::builtin(),
        );
        slip.pick(&m, Pick::Away).unwrap();

        let out = view("s1", &slip);
        assert_eq!(out.id, "s1");
        assert_eq!(out.selections.len(), 1);
        assert_eq!(out.selections[0].label, "Arsenal vs Chelsea");
        assert!((out.total_odds - 3.2).abs() < 1e-9);
    }
}
