//! Seat reservation and the payment hand-off that follows it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use balloonhop_shared::money::{self, FeeSplit};

use crate::error::{PaymentError, ReservationError, StoreError};
use crate::models::{Booking, Flight, PaymentStatus, ReservationRequest};
use crate::payment::{Destination, PaymentGateway, PaymentIntentRequest};
use crate::repository::{BookingRepository, FlightRepository, PilotRepository};

/// Status and seat checks for a flight that is known to exist. Stores call this
/// while holding the flight row, then check the passenger.
pub fn quote_seats(flight: &Flight, requested: i32) -> Result<FeeSplit, ReservationError> {
    if !flight.status.is_bookable() {
        return Err(ReservationError::FlightNotBookable {
            flight_id: flight.flight_id,
            status: flight.status,
        });
    }

    let available = flight.seats_remaining();
    if requested > available {
        return Err(ReservationError::InsufficientSeats { requested, available });
    }

    let total = money::total_for_seats(flight.price_per_seat_cents, requested)
        .ok_or(ReservationError::AmountOverflow)?;
    Ok(FeeSplit::new(total, flight.platform_fee_bps))
}

#[derive(Debug, Clone)]
pub struct BookingReceipt {
    pub booking: Booking,
    pub client_secret: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error(transparent)]
    Reservation(#[from] ReservationError),
    /// The reservation was rolled back after the payment step failed.
    #[error("Payment could not be started for booking {booking_id}: {source}")]
    Payment {
        booking_id: Uuid,
        #[source]
        source: PaymentError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    flights: Arc<dyn FlightRepository>,
    pilots: Arc<dyn PilotRepository>,
    payments: Arc<dyn PaymentGateway>,
    currency: String,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        flights: Arc<dyn FlightRepository>,
        pilots: Arc<dyn PilotRepository>,
        payments: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            bookings,
            flights,
            pilots,
            payments,
            currency: currency.into(),
        }
    }

    /// Reserves seats, then opens a payment intent for the booking. If anything
    /// after the reservation fails, the booking is cancelled and its seats are
    /// returned before the error is reported.
    pub async fn create_booking(&self, request: ReservationRequest) -> Result<BookingReceipt, BookingError> {
        let booking = self.bookings.reserve_seats(&request).await?;
        info!(
            booking_id = %booking.booking_id,
            flight_id = %booking.flight_id,
            seats = booking.number_of_seats,
            "Seats reserved"
        );

        match self.start_payment(&booking).await {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                warn!(booking_id = %booking.booking_id, error = %err, "Payment step failed, releasing seats");
                self.bookings
                    .release_reservation(booking.booking_id, PaymentStatus::Cancelled)
                    .await?;
                Err(err)
            }
        }
    }

    async fn start_payment(&self, booking: &Booking) -> Result<BookingReceipt, BookingError> {
        let destination = self.destination_for(booking).await?;

        let mut metadata = BTreeMap::new();
        metadata.insert("flightId".to_string(), booking.flight_id.to_string());
        metadata.insert("passengerId".to_string(), booking.passenger_id.to_string());
        metadata.insert("numberOfSeats".to_string(), booking.number_of_seats.to_string());
        metadata.insert("bookingId".to_string(), booking.booking_id.to_string());

        let intent = self
            .payments
            .create_payment_intent(&PaymentIntentRequest {
                amount_cents: booking.total_amount_paid_cents,
                currency: self.currency.clone(),
                metadata,
                destination,
            })
            .await
            .map_err(|source| BookingError::Payment {
                booking_id: booking.booking_id,
                source,
            })?;

        let booking = self
            .bookings
            .attach_payment_intent(booking.booking_id, &intent.id)
            .await?;

        Ok(BookingReceipt {
            booking,
            client_secret: intent.client_secret,
        })
    }

    async fn destination_for(&self, booking: &Booking) -> Result<Option<Destination>, BookingError> {
        let Some(flight) = self.flights.get_flight(booking.flight_id).await? else {
            return Ok(None);
        };
        let pilot = self.pilots.find_pilot(flight.pilot_id).await?;
        Ok(pilot
            .as_ref()
            .and_then(|p| p.payout_account())
            .map(|account_id| Destination {
                account_id: account_id.to_string(),
                application_fee_cents: booking.platform_fee_cents,
            }))
    }

    /// `payment_intent.succeeded`.
    pub async fn confirm_payment(&self, intent_id: &str) -> Result<Option<Booking>, StoreError> {
        let Some(booking) = self.bookings.find_by_payment_intent(intent_id).await? else {
            warn!(intent_id, "No booking for succeeded payment intent");
            return Ok(None);
        };
        let paid = self.bookings.mark_paid(booking.booking_id).await?;
        if paid.is_some() {
            info!(booking_id = %booking.booking_id, "Booking paid");
        }
        Ok(paid)
    }

    /// `payment_intent.payment_failed`.
    pub async fn fail_payment(&self, intent_id: &str) -> Result<Option<Booking>, StoreError> {
        let Some(booking) = self.bookings.find_by_payment_intent(intent_id).await? else {
            warn!(intent_id, "No booking for failed payment intent");
            return Ok(None);
        };
        let released = self
            .bookings
            .release_reservation(booking.booking_id, PaymentStatus::Failed)
            .await?;
        if released.is_some() {
            info!(booking_id = %booking.booking_id, "Payment failed, seats released");
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlightStatus, LaunchLocation, NewFlight};
    use chrono::{Duration, Utc};

    fn flight(total: i32, reserved: i32) -> Flight {
        let now = Utc::now();
        let mut flight = NewFlight {
            pilot_id: Uuid::new_v4(),
            launch_location: LaunchLocation::point(-106.59, 35.19),
            meetup_timestamp: now + Duration::days(1),
            estimated_duration_minutes: 60,
            price_per_seat_cents: 25_000,
            total_seats: total,
            description: None,
            platform_fee_bps: 1000,
        }
        .into_flight(now);
        flight.seats_reserved = reserved;
        flight
    }

    #[test]
    fn test_quote_prices_seats() {
        let split = quote_seats(&flight(4, 1), 3).unwrap();
        assert_eq!(split.total, 75_000);
        assert_eq!(split.platform_fee, 7_500);
        assert_eq!(split.pilot_payout, 67_500);
    }

    #[test]
    fn test_quote_rejects_oversell() {
        match quote_seats(&flight(4, 3), 2) {
            Err(ReservationError::InsufficientSeats { requested, available }) => {
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_status_checked_before_seats() {
        let mut cancelled = flight(4, 4);
        cancelled.status = FlightStatus::Cancelled;
        assert!(matches!(
            quote_seats(&cancelled, 10),
            Err(ReservationError::FlightNotBookable { .. })
        ));
    }
}
