use crate::error::AppError;
use crate::models::AddStockRequest;
use crate::server::AppState;
use crate::services::SharedRegistry;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

/// Health payload for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthStats {
    pub status: &'static str,
    pub tracked_tickers: usize,
    pub data_dir: String,
    pub uptime_secs: u64,
    pub current_system_time: String,
}

/// Map a service error to a JSON response
///
/// Client errors use `client_status` and expose their message; anything else
/// is logged and reported as a bare 500.
fn error_response(client_status: StatusCode, err: AppError) -> Response {
    if err.is_client_error() {
        warn!(status = %client_status, error = %err, "Request rejected");
        (
            client_status,
            Json(serde_json::json!({ "detail": err.to_string() })),
        )
            .into_response()
    } else {
        error!(error = %err, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": "Internal server error" })),
        )
            .into_response()
    }
}

/// GET / - Welcome message
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Welcome to the Stock API" }))
}

/// GET /health - Service health
#[instrument(skip(app_state))]
pub async fn health_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    let health = HealthStats {
        status: "ok",
        tracked_tickers: app_state.registry.len().await,
        data_dir: app_state.registry.data_dir().display().to_string(),
        uptime_secs: app_state.started_at.elapsed().as_secs(),
        current_system_time: Utc::now().to_rfc3339(),
    };

    debug!(?health, "Health check");
    (StatusCode::OK, Json(health)).into_response()
}

/// GET /stocks - All tracked tickers
#[instrument(skip(registry))]
pub async fn list_stocks_handler(State(registry): State<SharedRegistry>) -> Response {
    let tickers = registry.tickers().await;
    debug!(count = tickers.len(), "Listing tickers");
    (StatusCode::OK, Json(serde_json::json!({ "tickers": tickers }))).into_response()
}

/// GET /stocks/{ticker} - Snapshot of one stock
#[instrument(skip(registry))]
pub async fn get_stock_handler(
    State(registry): State<SharedRegistry>,
    Path(ticker): Path<String>,
) -> Response {
    match registry.get(&ticker).await {
        Ok(snapshot) => {
            info!(ticker = %snapshot.ticker, records = snapshot.data.len(), "Returning stock data");
            (StatusCode::OK, Json(snapshot)).into_response()
        }
        Err(e) => error_response(StatusCode::NOT_FOUND, e),
    }
}

/// PUT /stocks/{ticker} - Extend cached data up to today
#[instrument(skip(registry))]
pub async fn update_stock_handler(
    State(registry): State<SharedRegistry>,
    Path(ticker): Path<String>,
) -> Response {
    match registry.update(&ticker).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

/// POST /stocks - Track a new stock for a date range
///
/// Example body: `{"ticker": "AAPL", "start_date": "2022-01-01", "end_date": "2022-12-31"}`
#[instrument(skip(registry))]
pub async fn add_stock_handler(
    State(registry): State<SharedRegistry>,
    Json(request): Json<AddStockRequest>,
) -> Response {
    match registry
        .add(&request.ticker, &request.start_date, &request.end_date)
        .await
    {
        Ok(snapshot) => (StatusCode::CREATED, Json(snapshot)).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

/// DELETE /stocks/{ticker} - Stop tracking a stock
#[instrument(skip(registry))]
pub async fn delete_stock_handler(
    State(registry): State<SharedRegistry>,
    Path(ticker): Path<String>,
) -> Response {
    match registry.delete(&ticker).await {
        Ok(removed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Stock deleted", "ticker": removed })),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

/// GET /stocks/{ticker}/days/{date} - One day's bar
#[instrument(skip(registry))]
pub async fn get_stock_day_handler(
    State(registry): State<SharedRegistry>,
    Path((ticker, date)): Path<(String, String)>,
) -> Response {
    match registry.day(&ticker, &date).await {
        Ok(bar) => (StatusCode::OK, Json(bar)).into_response(),
        Err(e @ AppError::InvalidInput(_)) => error_response(StatusCode::BAD_REQUEST, e),
        Err(e) => error_response(StatusCode::NOT_FOUND, e),
    }
}
