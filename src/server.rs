use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info};

use crate::db::{self, MenuRecord};
use crate::ingest::{self, IngestError};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    /// Shared with the scheduler: manual triggers and scheduled ticks are
    /// mutually exclusive.
    pub run_lock: Arc<tokio::sync::Mutex<()>>,
    pub menu_url: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> axum::response::Response {
    (status, Json(ErrorBody { error: msg.into() })).into_response()
}

#[derive(Deserialize)]
struct MenuQuery {
    date: Option<String>,
}

/// API shape of one dish; prices go out as euros.
#[derive(Serialize)]
struct MenuItemResponse {
    date: String,
    name: String,
    category: String,
    price: f64,
}

impl From<MenuRecord> for MenuItemResponse {
    fn from(r: MenuRecord) -> Self {
        Self {
            date: r.menu_date.format("%Y-%m-%d").to_string(),
            name: r.name,
            category: r.category,
            price: r.price_cents as f64 / 100.0,
        }
    }
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /menu?date=YYYY-MM-DD — all dishes stored for one date.
/// An unknown date is an empty array, not an error.
async fn get_menu(State(state): State<AppState>, Query(q): Query<MenuQuery>) -> impl IntoResponse {
    let Some(date_str) = q.date else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'date' parameter");
    };
    let Ok(date) = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d") else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid date format. Use YYYY-MM-DD");
    };

    let conn = state.db.lock().unwrap();
    match db::menu_by_date(&conn, date) {
        Ok(records) => {
            let body: Vec<MenuItemResponse> = records.into_iter().map(Into::into).collect();
            Json(body).into_response()
        }
        Err(e) => {
            error!("Menu lookup failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
        }
    }
}

/// GET /menu/dates — every date with a stored menu, ascending.
async fn get_menu_dates(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();
    match db::menu_dates(&conn) {
        Ok(dates) => {
            let dates: Vec<String> = dates
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect();
            Json(serde_json::json!({ "dates": dates })).into_response()
        }
        Err(e) => {
            error!("Date listing failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
        }
    }
}

/// POST /ingest — run one ingestion now, queued behind any run in flight.
async fn trigger_ingest(State(state): State<AppState>) -> impl IntoResponse {
    let _guard = state.run_lock.lock().await;

    match ingest::run_ingest(&state.db, &state.menu_url).await {
        Ok(outcome) => Json(serde_json::json!({
            "status": "ok",
            "date": outcome.date.format("%Y-%m-%d").to_string(),
            "items": outcome.items,
        }))
        .into_response(),
        // Soft outcome: the document simply held no menu for today.
        Err(IngestError::NoUsableMenu) => Json(serde_json::json!({
            "status": "no_menu",
        }))
        .into_response(),
        Err(e @ (IngestError::Fetch(_) | IngestError::Extraction(_))) => {
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
        Err(e) => {
            error!("Manual ingestion failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Serve the lookup API until the shutdown signal fires; in-flight requests
/// (including a running manual ingestion) are allowed to complete.
pub async fn serve(
    state: AppState,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(health))
        .route("/menu", get(get_menu))
        .route("/menu/dates", get(get_menu_dates))
        .route("/ingest", post(trigger_ingest))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;

    Ok(())
}
