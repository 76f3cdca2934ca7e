mod admin;
mod slips;

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::db::{create_pool, init_database_with_pool, insert_bet, seed_data};
use crate::models::{
    ApiResponse, EventRecord, FilterCriteria, InsightRequest, PredictionInsight, Selection,
    SportCategory, StoredBet, ALL_SPORTS,
};
use crate::services::{
    build_listing, resolve_title, BetSlip, EventSource, FeedSnapshot, InsightClient, InsightError,
    MatchListing, RefreshController, RefreshOptions, SlipBook, SlipQuote, StoreEventSource,
};

const MAX_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub catalog: Arc<Catalog>,
    pub source: Arc<dyn EventSource>,
    pub board: Arc<RefreshController>,
    pub insight: Arc<InsightClient>,
    pub slips: Arc<SlipBook>,
}

pub type ApiError = (StatusCode, Json<ApiResponse<()>>);
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub(crate) fn reject(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::error(message.into())))
}

pub(crate) fn internal(context: &str, e: impl std::fmt::Display) -> ApiError {
    tracing::error!("{}: {}", context, e);
    reject(StatusCode::INTERNAL_SERVER_ERROR, context)
}

pub async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    let pool = create_pool(&config.database_url).await?;
    init_database_with_pool(&pool).await?;
    seed_data(&pool).await?;

    let catalog = Arc::new(Catalog::load(config.catalog_path.as_deref())?);
    let source: Arc<dyn EventSource> = Arc::new(StoreEventSource::new(pool.clone()));

    let board = RefreshController::spawn(
        source.clone(),
        catalog.clone(),
        FilterCriteria::default(),
        RefreshOptions {
            interval: config.refresh_interval,
            fetch_timeout: config.fetch_timeout,
            initial: None,
        },
    );

    let insight = InsightClient::new(&config.insight);
    if !insight.is_configured() {
        tracing::warn!("INSIGHT_API_KEY not set, /ai/insight will answer 503");
    }

    let state = AppState {
        pool,
        catalog,
        source,
        board: Arc::new(board),
        insight: Arc::new(insight),
        slips: Arc::new(SlipBook::new()),
    };

    let app = create_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Sportsbook API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/catalog", get(get_catalog_handler))
        .route("/events", get(get_events_handler))
        .route("/matches", get(get_matches_handler))
        .route("/title", get(get_title_handler))
        .route("/board", get(get_board_handler))
        .route("/board/criteria", put(set_board_criteria_handler))
        .route("/slip/quote", post(quote_slip_handler))
        .route("/bets", post(submit_bet_handler))
        .route("/ai/insight", post(insight_handler))
        .merge(slips::router())
        .nest("/admin", admin::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
        )
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("Sportsbook API is running"))
}

// GET /catalog - Sport → country → league hierarchy
async fn get_catalog_handler(State(state): State<AppState>) -> Json<ApiResponse<Vec<SportCategory>>> {
    Json(ApiResponse::success(state.catalog.sports().to_vec()))
}

// GET /events - Raw event records
#[derive(Deserialize)]
struct EventsQuery {
    sport: Option<String>,
}

async fn get_events_handler(
    State(state): State<AppState>,
    Query(params): Query<EventsQuery>,
) -> ApiResult<Vec<EventRecord>> {
    let sport = params.sport.as_deref().filter(|s| *s != ALL_SPORTS);
    match state.source.get_events(sport).await {
        Ok(events) => Ok(Json(ApiResponse::success(events))),
        Err(e) => Err(internal("Failed to fetch events", e)),
    }
}

// GET /matches - Filtered match list with its page title
#[derive(Debug, Default, Deserialize)]
pub struct MatchesQuery {
    pub sport: Option<String>,
    pub country: Option<String>,
    pub league: Option<String>,
    pub search: Option<String>,
    pub view: Option<String>,
    pub limit: Option<usize>,
}

impl MatchesQuery {
    pub fn into_criteria(self) -> Result<FilterCriteria, String> {
        let view_mode = match self.view.as_deref() {
            Some(view) => view.parse()?,
            None => Default::default(),
        };

        Ok(FilterCriteria {
            search_text: self.search.unwrap_or_default().trim().to_string(),
            sport: self.sport.filter(|s| !s.is_empty()).unwrap_or_else(|| ALL_SPORTS.to_string()),
            country: self.country.filter(|c| !c.is_empty()),
            league: self.league.filter(|l| !l.is_empty()),
            view_mode,
            limit: Some(self.limit.unwrap_or(50).min(MAX_LIMIT)), // Cap at 100
        })
    }
}

async fn get_matches_handler(
    State(state): State<AppState>,
    Query(params): Query<MatchesQuery>,
) -> ApiResult<MatchListing> {
    let criteria = params
        .into_criteria()
        .map_err(|e| reject(StatusCode::BAD_REQUEST, e))?;

    let events = state
        .source
        .get_events(None)
        .await
        .map_err(|e| internal("Failed to fetch events", e))?;

    Ok(Json(ApiResponse::success(build_listing(events, &criteria, &state.catalog))))
}

// GET /title - Page heading for a route
#[derive(Deserialize)]
struct TitleQuery {
    sport: String,
    country: Option<String>,
    league: Option<String>,
}

async fn get_title_handler(
    State(state): State<AppState>,
    Query(params): Query<TitleQuery>,
) -> Json<ApiResponse<String>> {
    Json(ApiResponse::success(resolve_title(
        &params.sport,
        params.country.as_deref(),
        params.league.as_deref(),
        &state.catalog,
    )))
}

// GET /board - Latest snapshot of the auto-refreshing board
#[derive(Serialize)]
struct BoardResponse {
    criteria: FilterCriteria,
    snapshot: FeedSnapshot,
}

async fn get_board_handler(State(state): State<AppState>) -> Json<ApiResponse<BoardResponse>> {
    Json(ApiResponse::success(BoardResponse {
        criteria: state.board.criteria(),
        snapshot: state.board.snapshot(),
    }))
}

// PUT /board/criteria - Change what the board shows
async fn set_board_criteria_handler(
    State(state): State<AppState>,
    Json(criteria): Json<FilterCriteria>,
) -> Json<ApiResponse<bool>> {
    let changed = state.board.set_criteria(criteria);
    tracing::info!("Board criteria updated (changed: {})", changed);
    Json(ApiResponse::success(changed))
}

// POST /slip/quote and POST /bets - One-shot slips sent whole by the client
#[derive(Deserialize)]
struct SlipRequest {
    selections: Vec<Selection>,
    stake: f64,
}

fn slip_from_request(selections: Vec<Selection>) -> Result<BetSlip, ApiError> {
    BetSlip::from_selections(selections).map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))
}

async fn quote_slip_handler(Json(request): Json<SlipRequest>) -> ApiResult<SlipQuote> {
    let slip = slip_from_request(request.selections)?;
    Ok(Json(ApiResponse::success(slip.quote(request.stake))))
}

async fn submit_bet_handler(
    State(state): State<AppState>,
    Json(request): Json<SlipRequest>,
) -> ApiResult<StoredBet> {
    let slip = slip_from_request(request.selections)?;
    let submission = slip
        .submission(request.stake)
        .map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?;

    match insert_bet(&state.pool, &submission).await {
        Ok(bet) => {
            tracing::info!("Staged bet {} with {} selections", bet.id, bet.selections.len());
            Ok(Json(ApiResponse::success(bet)))
        }
        Err(e) => Err(internal("Failed to store bet", e)),
    }
}

// POST /ai/insight - Language-model match prediction
async fn insight_handler(
    State(state): State<AppState>,
    Json(request): Json<InsightRequest>,
) -> ApiResult<PredictionInsight> {
    match state.insight.predict(&request).await {
        Ok(insight) => Ok(Json(ApiResponse::success(insight))),
        Err(InsightError::NotConfigured) => Err(reject(
            StatusCode::SERVICE_UNAVAILABLE,
            InsightError::NotConfigured.to_string(),
        )),
        Err(e) => {
            tracing::error!("AI insight failed: {}", e);
            Err(reject(StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}
