use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use balloonhop_shared::money::{Cents, FeeSplit};

use garde::Validate;

use crate::validation::{parse_uuid, trimmed, valid_uuid, Checked, ValidationErrors};

text_enum!(PaymentStatus, "payment status", {
    Pending => "PENDING",
    Paid => "PAID",
    Failed => "FAILED",
    Cancelled => "CANCELLED",
});

impl PaymentStatus {
    /// Bookings in these states hold seats on their flight.
    pub fn holds_seats(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Paid)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub passenger_id: Uuid,
    pub number_of_seats: i32,
    pub total_amount_paid_cents: Cents,
    pub platform_fee_cents: Cents,
    pub pilot_payout_cents: Cents,
    pub payment_status: PaymentStatus,
    pub stripe_payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn pending(request: &ReservationRequest, split: FeeSplit, now: DateTime<Utc>) -> Self {
        Self {
            booking_id: Uuid::new_v4(),
            flight_id: request.flight_id,
            passenger_id: request.passenger_id,
            number_of_seats: request.number_of_seats,
            total_amount_paid_cents: split.total,
            platform_fee_cents: split.platform_fee,
            pilot_payout_cents: split.pilot_payout,
            payment_status: PaymentStatus::Pending,
            stripe_payment_intent_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationRequest {
    pub flight_id: Uuid,
    pub passenger_id: Uuid,
    pub number_of_seats: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(custom(valid_uuid))]
    pub flight_id: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(custom(valid_uuid))]
    pub passenger_id: String,
    #[serde(default)]
    #[garde(range(min = 1, max = 2147483647))]
    pub number_of_seats: i64,
}

impl Checked for CreateBookingRequest {
    type Output = ReservationRequest;

    fn normalize(self) -> Result<ReservationRequest, ValidationErrors> {
        Ok(ReservationRequest {
            flight_id: parse_uuid("flightId", &self.flight_id)?,
            passenger_id: parse_uuid("passengerId", &self.passenger_id)?,
            number_of_seats: i32::try_from(self.number_of_seats)
                .map_err(|_| ValidationErrors::field("numberOfSeats", "out of range"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_request_validation() {
        let flight_id = Uuid::new_v4();
        let passenger_id = Uuid::new_v4();
        let ok = CreateBookingRequest {
            flight_id: flight_id.to_string(),
            passenger_id: passenger_id.to_string(),
            number_of_seats: 2,
        }
        .check()
        .unwrap();
        assert_eq!(ok.flight_id, flight_id);
        assert_eq!(ok.number_of_seats, 2);

        let errors = CreateBookingRequest {
            flight_id: "123".into(),
            passenger_id: String::new(),
            number_of_seats: -1,
        }
        .check()
        .unwrap_err();
        assert_eq!(errors.field_errors.len(), 3);
    }

    #[test]
    fn test_pending_booking_carries_fee_split() {
        let request = ReservationRequest {
            flight_id: Uuid::new_v4(),
            passenger_id: Uuid::new_v4(),
            number_of_seats: 3,
        };
        let booking = Booking::pending(&request, FeeSplit::new(30_000, 1000), Utc::now());
        assert_eq!(booking.total_amount_paid_cents, 30_000);
        assert_eq!(booking.platform_fee_cents, 3_000);
        assert_eq!(booking.pilot_payout_cents, 27_000);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert!(booking.payment_status.holds_seats());
    }
}
