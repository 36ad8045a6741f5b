use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;

use balloonhop_core::models::{Booking, CreateBookingRequest};
use balloonhop_core::BookingError;

use crate::error::AppError;
use crate::extract::Valid;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub booking: Booking,
    pub client_secret: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/bookings", post(create_booking))
}

/// POST /bookings
/// Reserves seats and opens a payment intent. A payment failure cancels the
/// booking and gives the seats back before answering 502.
pub async fn create_booking(
    State(state): State<AppState>,
    Valid(request): Valid<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let receipt = match state.booking_service.create_booking(request).await {
        Ok(receipt) => receipt,
        Err(err) => {
            let reason = match &err {
                BookingError::Reservation(inner) => inner.reason(),
                BookingError::Payment { .. } => "payment_failed",
                BookingError::Store(_) => "store_error",
            };
            state.metrics.reservation_rejections.with_label_values(&[reason]).inc();
            return Err(AppError::booking(err));
        }
    };

    state.metrics.bookings_created.inc();
    state
        .metrics
        .seats_reserved
        .inc_by(receipt.booking.number_of_seats.max(0) as u64);

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            booking: receipt.booking,
            client_secret: receipt.client_secret,
        }),
    ))
}
