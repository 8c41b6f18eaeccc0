//! Apnea Alert API
//!
//! Thin Axum service over the detection core:
//! - `POST /predict` — classify a named feature map
//! - `GET /alerts?limit=N` — recent alert-log rows
//! - `GET /events?limit=N` — recent consolidated apnea events
//! - `GET /health` — service health
//!
//! The classifier model is loaded once at startup and shared read-only
//! across request handlers; a load failure aborts the process rather
//! than serving without a model.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use apnea_core::error::InferenceError;
use apnea_core::types::{AlertRecord, ApneaEvent};
use apnea_detect::store::read_alert_log_csv;
use apnea_detect::{AlertConsolidator, ClassifierService, DEFAULT_MAX_GAP};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "apnea-server", about = "Apnea alert HTTP service")]
struct Args {
    /// HTTP port
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Path to the classifier model artifact (JSON forest)
    #[arg(long, value_name = "PATH")]
    model: PathBuf,

    /// Alert-log CSV to serve via /alerts and consolidate into /events
    #[arg(long, value_name = "PATH")]
    alert_log: Option<PathBuf>,

    /// Gap tolerance for event consolidation
    #[arg(long, default_value_t = DEFAULT_MAX_GAP)]
    max_gap: u64,
}

// ── Shared state ─────────────────────────────────────────────────────────────

/// Application state, immutable after startup.
struct AppState {
    classifier: ClassifierService,
    alerts: Vec<AlertRecord>,
    events: Vec<ApneaEvent>,
    start_time: Instant,
}

type SharedState = Arc<AppState>;

/// Default row count for the list endpoints.
const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

// ── Request/response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PredictRequest {
    features: HashMap<String, f64>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn bad_request(error: &InferenceError) -> ApiError {
    let body = match error {
        InferenceError::MissingFeatures { missing } => serde_json::json!({
            "detail": format!("Missing features: {missing:?}"),
            "missing": missing,
        }),
        other => serde_json::json!({ "detail": other.to_string() }),
    };
    (StatusCode::BAD_REQUEST, Json(body))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "model": state.classifier.model().name,
        "model_version": state.classifier.model().version,
        "alert_rows": state.alerts.len(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

async fn predict(
    State(state): State<SharedState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let prediction = state
        .classifier
        .predict_named(&request.features)
        .map_err(|e| bad_request(&e))?;

    Ok(Json(serde_json::json!({
        "prediction": prediction.label.as_str(),
        "confidence": prediction.confidence,
    })))
}

async fn alerts(
    State(state): State<SharedState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<AlertRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let start = state.alerts.len().saturating_sub(limit);
    Json(state.alerts[start..].to_vec())
}

async fn events(
    State(state): State<SharedState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<ApneaEvent>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let start = state.events.len().saturating_sub(limit);
    Json(state.events[start..].to_vec())
}

// ── Startup ──────────────────────────────────────────────────────────────────

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/alerts", get(alerts))
        .route("/events", get(events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn build_state(
    classifier: ClassifierService,
    alerts: Vec<AlertRecord>,
    max_gap: u64,
) -> SharedState {
    let events = AlertConsolidator::new(max_gap).consolidate_records(&alerts);
    Arc::new(AppState {
        classifier,
        alerts,
        events,
        start_time: Instant::now(),
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    // Fail fast: no model, no service
    let classifier = match ClassifierService::from_model_file(&args.model) {
        Ok(classifier) => classifier,
        Err(e) => {
            error!("cannot start without a classifier: {e}");
            std::process::exit(1);
        }
    };

    let alerts = match &args.alert_log {
        Some(path) => match read_alert_log_csv(path) {
            Ok(records) => {
                info!(rows = records.len(), path = %path.display(), "alert log loaded");
                records
            }
            Err(e) => {
                error!("failed to read alert log: {e}");
                std::process::exit(1);
            }
        },
        None => Vec::new(),
    };

    let state = build_state(classifier, alerts, args.max_gap);
    info!(events = state.events.len(), "alert events consolidated");

    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("listening on http://{addr}");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}
