use thiserror::Error;
use uuid::Uuid;

use crate::models::{FlightStatus, UnknownVariant};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Corrupt record: {0}")]
    Corrupt(#[from] UnknownVariant),
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreError::Backend(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Why a seat reservation was refused. Every variant except `Store` is a
/// client-facing outcome and leaves the store untouched.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("Flight not found")]
    FlightNotFound(Uuid),
    #[error("Flight is not available for booking")]
    FlightNotBookable { flight_id: Uuid, status: FlightStatus },
    #[error("Not enough seats available")]
    InsufficientSeats { requested: i32, available: i32 },
    #[error("Passenger not found")]
    PassengerNotFound(Uuid),
    #[error("Booking total overflows")]
    AmountOverflow,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReservationError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ReservationError::FlightNotFound(_) => "flight_not_found",
            ReservationError::FlightNotBookable { .. } => "flight_not_bookable",
            ReservationError::InsufficientSeats { .. } => "insufficient_seats",
            ReservationError::PassengerNotFound(_) => "passenger_not_found",
            ReservationError::AmountOverflow => "amount_overflow",
            ReservationError::Store(_) => "store_error",
        }
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider returned {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("Payment provider unreachable: {0}")]
    Transport(String),
    #[error("Unexpected payment provider response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
