use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use balloonhop_core::models::{Booking, Flight, PaymentStatus, ReservationRequest};
use balloonhop_core::repository::BookingRepository;
use balloonhop_core::reservation::quote_seats;
use balloonhop_core::{ReservationError, StoreError, StoreResult};

use crate::database::db_err;
use crate::rows::{convert_all, BookingRow, FlightRow, BOOKING_COLUMNS, FLIGHT_COLUMNS};

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn reserve_seats(&self, request: &ReservationRequest) -> Result<Booking, ReservationError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Row lock held until commit; concurrent reservations on the flight queue here.
        let sql = format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE flight_id = $1 FOR UPDATE");
        let flight: Flight = sqlx::query_as::<_, FlightRow>(&sql)
            .bind(request.flight_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or(ReservationError::FlightNotFound(request.flight_id))?
            .try_into()?;

        let split = quote_seats(&flight, request.number_of_seats)?;

        let passenger_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)")
            .bind(request.passenger_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        if !passenger_exists {
            return Err(ReservationError::PassengerNotFound(request.passenger_id));
        }

        sqlx::query("UPDATE flights SET seats_reserved = seats_reserved + $2, updated_at = NOW() WHERE flight_id = $1")
            .bind(flight.flight_id)
            .bind(request.number_of_seats)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let booking = Booking::pending(request, split, Utc::now());
        sqlx::query(
            "INSERT INTO bookings \
             (booking_id, flight_id, passenger_id, number_of_seats, total_amount_paid_cents, \
              platform_fee_cents, pilot_payout_cents, payment_status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(booking.booking_id)
        .bind(booking.flight_id)
        .bind(booking.passenger_id)
        .bind(booking.number_of_seats)
        .bind(booking.total_amount_paid_cents)
        .bind(booking.platform_fee_cents)
        .bind(booking.pilot_payout_cents)
        .bind(booking.payment_status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(booking)
    }

    async fn attach_payment_intent(&self, booking_id: Uuid, intent_id: &str) -> StoreResult<Booking> {
        let sql = format!(
            "UPDATE bookings SET stripe_payment_intent_id = $2, updated_at = NOW() \
             WHERE booking_id = $1 RETURNING {BOOKING_COLUMNS}"
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id)
            .bind(intent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", booking_id)))?
            .try_into()
    }

    async fn release_reservation(&self, booking_id: Uuid, status: PaymentStatus) -> StoreResult<Option<Booking>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let sql = format!(
            "UPDATE bookings SET payment_status = $2, updated_at = NOW() \
             WHERE booking_id = $1 AND payment_status = 'PENDING' RETURNING {BOOKING_COLUMNS}"
        );
        let Some(row) = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id)
            .bind(status.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
        else {
            debug!(%booking_id, "Booking not pending, nothing to release");
            return Ok(None);
        };
        let booking: Booking = row.try_into()?;

        sqlx::query(
            "UPDATE flights SET seats_reserved = GREATEST(seats_reserved - $2, 0), updated_at = NOW() \
             WHERE flight_id = $1",
        )
        .bind(booking.flight_id)
        .bind(booking.number_of_seats)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(Some(booking))
    }

    async fn mark_paid(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        let sql = format!(
            "UPDATE bookings SET payment_status = 'PAID', updated_at = NOW() \
             WHERE booking_id = $1 AND payment_status = 'PENDING' RETURNING {BOOKING_COLUMNS}"
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Booking::try_from)
            .transpose()
    }

    async fn get_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1");
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Booking::try_from)
            .transpose()
    }

    async fn find_by_payment_intent(&self, intent_id: &str) -> StoreResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE stripe_payment_intent_id = $1");
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(intent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Booking::try_from)
            .transpose()
    }

    async fn list_flight_bookings(&self, flight_id: Uuid) -> StoreResult<Vec<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE flight_id = $1 ORDER BY created_at ASC");
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(flight_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn passenger_phone_numbers(&self, flight_id: Uuid) -> StoreResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT u.phone_number FROM bookings b \
             JOIN users u ON u.user_id = b.passenger_id \
             WHERE b.flight_id = $1 AND b.payment_status IN ('PENDING', 'PAID')",
        )
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn count_bookings(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
