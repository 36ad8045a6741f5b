use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use balloonhop_core::{BookingError, ReservationError, StoreError, ValidationErrors};

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    InvalidInput(ValidationErrors),
    NotFoundError(String),
    ConflictError(String),
    TooManyRequests(String),
    BadGateway(String),
    ServiceUnavailable(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    /// Client-facing reservation outcomes keep their message; storage failures are 500s.
    pub fn reservation(err: ReservationError) -> Self {
        match err {
            ReservationError::FlightNotFound(_) => AppError::NotFoundError("Flight not found".to_string()),
            ReservationError::PassengerNotFound(_) => AppError::NotFoundError("Passenger not found".to_string()),
            ReservationError::FlightNotBookable { .. } | ReservationError::InsufficientSeats { .. } => {
                AppError::ValidationError(err.to_string())
            }
            ReservationError::AmountOverflow => AppError::ValidationError(err.to_string()),
            ReservationError::Store(store) => AppError::Anyhow(store.into()),
        }
    }

    pub fn booking(err: BookingError) -> Self {
        match err {
            BookingError::Reservation(inner) => AppError::reservation(inner),
            BookingError::Payment { booking_id, source } => {
                tracing::error!(%booking_id, error = %source, "Payment intent failed, booking cancelled");
                AppError::BadGateway("Failed to create payment".to_string())
            }
            BookingError::Store(store) => AppError::Anyhow(store.into()),
        }
    }

    /// Maps a unique violation to 409 with `message`; anything else is a 500.
    pub fn conflict_or_internal(err: StoreError, message: &str) -> Self {
        match err {
            StoreError::Conflict(_) => AppError::ConflictError(message.to_string()),
            other => AppError::Anyhow(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error): (StatusCode, Value) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg.into()),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg.into()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.into()),
            AppError::InvalidInput(errors) => (
                StatusCode::BAD_REQUEST,
                serde_json::to_value(&errors).unwrap_or_else(|_| errors.to_string().into()),
            ),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg.into()),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg.into()),
            AppError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.into()),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.into()),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.into()),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".into())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".into())
            }
        };

        (status, Json(json!({ "error": error }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
