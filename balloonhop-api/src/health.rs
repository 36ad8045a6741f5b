use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use balloonhop_core::models::FeatureFlag;

use crate::metrics::metrics_handler;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/flags", get(feature_flags))
        .route("/metrics", get(metrics_handler))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /health/flags
/// Store errors degrade to an empty list.
pub async fn feature_flags(State(state): State<AppState>) -> Json<Vec<FeatureFlag>> {
    match state.catalog.feature_flags().await {
        Ok(flags) => Json(flags),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load feature flags");
            Json(Vec::new())
        }
    }
}
