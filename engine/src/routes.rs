use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{sync::Arc, time::Instant};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    engine::TrustEngine,
    error::{validation_error, AppError},
    types::{HealthResponse, ScoreRequest, ScoreResult},
};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TrustEngine>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(engine: Arc<TrustEngine>, metrics: Option<PrometheusHandle>) -> Self {
        Self { engine, metrics }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/score", post(score_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn score_handler(
    State(state): State<AppState>,
    Json(payload): Json<ScoreRequest>,
) -> Result<Json<ScoreResult>, AppError> {
    let start = Instant::now();

    if payload.url.trim().is_empty() {
        warn!("Empty url provided");
        return Err(validation_error("url must not be empty"));
    }

    let result = match state.engine.score(&payload.url) {
        Ok(result) => result,
        Err(e) => {
            metrics::counter!("score_failures_total").increment(1);
            return Err(e);
        }
    };

    metrics::counter!("score_requests_total", "verdict" => result.verdict.as_str()).increment(1);
    metrics::histogram!("score_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);

    info!(
        "Score request for {} completed in {:?}",
        result.canonical_url,
        start.elapsed()
    );
    Ok(Json(result))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_version: state.engine.model_version().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
