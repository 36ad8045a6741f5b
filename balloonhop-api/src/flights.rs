use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use balloonhop_core::models::FlightStatus;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FlightFilter {
    pub status: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights", get(list_flights))
        .route("/flights/{flight_id}", get(get_flight))
}

/// GET /flights
pub async fn list_flights(
    State(state): State<AppState>,
    Query(filter): Query<FlightFilter>,
) -> Result<Json<Vec<Value>>, AppError> {
    let status = filter
        .status
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<FlightStatus>())
        .transpose()
        .map_err(|e| AppError::ValidationError(format!("Invalid status: {}", e.value)))?;

    let flights = state.flights.list_flights(status).await?;
    let views = flights
        .iter()
        .map(|f| serde_json::to_value(f.view()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

/// GET /flights/{flightId}
pub async fn get_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let flight = state
        .flights
        .get_flight(flight_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Flight not found".to_string()))?;
    Ok(Json(serde_json::to_value(flight.view())?))
}
