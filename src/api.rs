use crate::admission::AdmissionController;
use crate::error::{OracleError, PlacementError, StoreError};
use crate::event::Event;
use crate::query::QueryService;
use crate::wager::Wager;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub query: Arc<QueryService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/bet", post(place_bet))
        .route("/bets", get(list_bets))
        .route("/events", get(list_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ===== Request/Response Types =====

#[derive(Debug, Deserialize)]
pub struct BetRequest {
    pub event_id: String,
    /// JSON number or string
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BetResponse {
    pub bet_id: Uuid,
}

// ===== Route Handlers =====

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn place_bet(
    State(state): State<AppState>,
    payload: Result<Json<BetRequest>, JsonRejection>,
) -> Result<Json<BetResponse>, ApiError> {
    let Json(request) = payload?;
    let bet_id = state
        .admission
        .place_bet(&request.event_id, request.amount)
        .await?;
    Ok(Json(BetResponse { bet_id }))
}

async fn list_bets(State(state): State<AppState>) -> Result<Json<Vec<Wager>>, ApiError> {
    Ok(Json(state.query.list_wagers().await?))
}

/// Events that can still take bets.
async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.query.available_events(Utc::now()).await?))
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    /// Body missing, not JSON, or not a bet request
    BadRequest(String),
    Placement(PlacementError),
    Store(StoreError),
    Upstream(OracleError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        ApiError::Placement(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<OracleError> for ApiError {
    fn from(err: OracleError) -> Self {
        ApiError::Upstream(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Placement(err) => match err {
                PlacementError::InvalidAmount
                | PlacementError::DeadlineExpired(_)
                | PlacementError::EventClosed(_) => StatusCode::BAD_REQUEST,
                PlacementError::EventNotFound(_) => StatusCode::NOT_FOUND,
                PlacementError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
                PlacementError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "INVALID_REQUEST",
            ApiError::Placement(err) => err.reason(),
            ApiError::Store(_) => "STORE_UNAVAILABLE",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(detail) => detail.clone(),
            ApiError::Placement(err) if status.is_client_error() => err.to_string(),
            ApiError::Placement(err) => {
                tracing::error!("Bet placement failed: {}", err);
                "Service temporarily unavailable".to_string()
            }
            ApiError::Store(err) => {
                tracing::error!("Database error: {}", err);
                "Service temporarily unavailable".to_string()
            }
            ApiError::Upstream(err) => {
                tracing::error!("Event provider error: {}", err);
                "Could not fetch events".to_string()
            }
        };

        let body = Json(json!({
            "error": message,
            "reason": self.reason(),
        }));

        (status, body).into_response()
    }
}
