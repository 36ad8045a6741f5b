use axum::{extract::State, routing::get, Json, Router};

use balloonhop_core::models::Festival;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/festivals/upcoming", get(upcoming_festivals))
}

/// GET /festivals/upcoming
pub async fn upcoming_festivals(State(state): State<AppState>) -> Result<Json<Vec<Festival>>, AppError> {
    Ok(Json(state.catalog.upcoming_festivals(chrono::Utc::now()).await?))
}
