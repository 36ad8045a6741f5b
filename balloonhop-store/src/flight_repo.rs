use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use balloonhop_core::models::{Flight, FlightStatus, NewFlight};
use balloonhop_core::payment::FlightProduct;
use balloonhop_core::repository::FlightRepository;
use balloonhop_core::{StoreError, StoreResult};

use crate::database::db_err;
use crate::rows::{convert_all, FlightRow, FLIGHT_COLUMNS};

pub struct StoreFlightRepository {
    pool: PgPool,
}

impl StoreFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlightRepository for StoreFlightRepository {
    async fn create_flight(&self, flight: NewFlight) -> StoreResult<Flight> {
        let flight = flight.into_flight(Utc::now());
        sqlx::query(
            "INSERT INTO flights \
             (flight_id, pilot_id, launch_longitude, launch_latitude, meetup_timestamp, \
              estimated_duration_minutes, price_per_seat_cents, total_seats, seats_reserved, description, \
              status, platform_fee_bps, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(flight.flight_id)
        .bind(flight.pilot_id)
        .bind(flight.launch_location.longitude())
        .bind(flight.launch_location.latitude())
        .bind(flight.meetup_timestamp)
        .bind(flight.estimated_duration_minutes)
        .bind(flight.price_per_seat_cents)
        .bind(flight.total_seats)
        .bind(flight.seats_reserved)
        .bind(&flight.description)
        .bind(flight.status.as_str())
        .bind(flight.platform_fee_bps)
        .bind(flight.created_at)
        .bind(flight.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(flight)
    }

    async fn get_flight(&self, flight_id: Uuid) -> StoreResult<Option<Flight>> {
        let sql = format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE flight_id = $1");
        sqlx::query_as::<_, FlightRow>(&sql)
            .bind(flight_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Flight::try_from)
            .transpose()
    }

    async fn list_flights(&self, status: Option<FlightStatus>) -> StoreResult<Vec<Flight>> {
        let sql = format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY meetup_timestamp ASC"
        );
        let rows = sqlx::query_as::<_, FlightRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn list_pilot_flights(&self, pilot_id: Uuid) -> StoreResult<Vec<Flight>> {
        let sql = format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE pilot_id = $1 ORDER BY meetup_timestamp ASC");
        let rows = sqlx::query_as::<_, FlightRow>(&sql)
            .bind(pilot_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn attach_stripe_product(&self, flight_id: Uuid, product: &FlightProduct) -> StoreResult<Flight> {
        let sql = format!(
            "UPDATE flights SET stripe_product_id = $2, stripe_price_id = $3, stripe_payment_link_id = $4, \
             updated_at = NOW() WHERE flight_id = $1 RETURNING {FLIGHT_COLUMNS}"
        );
        sqlx::query_as::<_, FlightRow>(&sql)
            .bind(flight_id)
            .bind(&product.product_id)
            .bind(&product.price_id)
            .bind(&product.payment_link_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("flight {}", flight_id)))?
            .try_into()
    }

    async fn count_flights(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM flights")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
