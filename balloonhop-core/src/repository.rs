use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ReservationError, StoreResult};
use crate::models::{
    AdminActionDraft, AdminActionView, Booking, ConnectAccountStatus, FeatureFlag, Festival, Flight,
    FlightStatus, NewFlight, NewSubscription, NewUser, NotificationSubscription, PaymentStatus,
    PilotApplication, PilotDetails, PilotProfile, PilotStatus, PilotSummary, ReservationRequest, StatusChange, User,
};
use crate::payment::FlightProduct;

/// Everything created by a pilot registration, written in one transaction.
#[derive(Debug, Clone)]
pub struct PilotRegistrationRecord {
    pub user: User,
    pub pilot: PilotProfile,
    pub application: PilotApplication,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `StoreError::Conflict` when the email or phone number is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn register_pilot(
        &self,
        user: NewUser,
        pilot_license_number: String,
    ) -> StoreResult<PilotRegistrationRecord>;

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_phone(&self, phone_number: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait PilotRepository: Send + Sync {
    async fn find_pilot(&self, pilot_id: Uuid) -> StoreResult<Option<PilotProfile>>;

    async fn find_pilot_by_user(&self, user_id: Uuid) -> StoreResult<Option<PilotProfile>>;

    async fn find_pilot_by_connect_account(&self, account_id: &str) -> StoreResult<Option<PilotProfile>>;

    async fn pilot_details(&self, pilot_id: Uuid) -> StoreResult<Option<PilotDetails>>;

    /// Oldest first.
    async fn list_pilot_details(&self, status: PilotStatus) -> StoreResult<Vec<PilotDetails>>;

    async fn list_approved_pilots(&self) -> StoreResult<Vec<PilotSummary>>;

    /// Sets the pilot's status and records the audit row atomically. A pilot
    /// already in `status` is left alone and no audit row is written.
    async fn transition_status(
        &self,
        pilot_id: Uuid,
        status: PilotStatus,
        action: AdminActionDraft,
    ) -> StoreResult<StatusChange>;

    async fn link_connect_account(
        &self,
        pilot_id: Uuid,
        account_id: &str,
        status: ConnectAccountStatus,
    ) -> StoreResult<PilotProfile>;

    async fn update_connect_status(
        &self,
        pilot_id: Uuid,
        status: ConnectAccountStatus,
    ) -> StoreResult<PilotProfile>;

    async fn count_pilots(&self, status: Option<PilotStatus>) -> StoreResult<i64>;
}

#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn create_flight(&self, flight: NewFlight) -> StoreResult<Flight>;

    async fn get_flight(&self, flight_id: Uuid) -> StoreResult<Option<Flight>>;

    /// Ordered by meetup time, earliest first.
    async fn list_flights(&self, status: Option<FlightStatus>) -> StoreResult<Vec<Flight>>;

    async fn list_pilot_flights(&self, pilot_id: Uuid) -> StoreResult<Vec<Flight>>;

    async fn attach_stripe_product(&self, flight_id: Uuid, product: &FlightProduct) -> StoreResult<Flight>;

    async fn count_flights(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Checks the flight, its status, the remaining seats and the passenger,
    /// then increments `seats_reserved` and inserts a `PENDING` booking, all
    /// under one lock or transaction. A refused reservation writes nothing.
    async fn reserve_seats(&self, request: &ReservationRequest) -> Result<Booking, ReservationError>;

    async fn attach_payment_intent(&self, booking_id: Uuid, intent_id: &str) -> StoreResult<Booking>;

    /// Moves a `PENDING` booking to `status` and gives its seats back to the
    /// flight. `Ok(None)` when the booking is missing or no longer pending.
    async fn release_reservation(&self, booking_id: Uuid, status: PaymentStatus) -> StoreResult<Option<Booking>>;

    /// Moves a `PENDING` booking to `PAID`. `Ok(None)` when it is not pending.
    async fn mark_paid(&self, booking_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn get_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn find_by_payment_intent(&self, intent_id: &str) -> StoreResult<Option<Booking>>;

    async fn list_flight_bookings(&self, flight_id: Uuid) -> StoreResult<Vec<Booking>>;

    /// Distinct phone numbers of passengers holding seats on the flight.
    async fn passenger_phone_numbers(&self, flight_id: Uuid) -> StoreResult<Vec<String>>;

    async fn count_bookings(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Newest first.
    async fn list_actions(&self, offset: i64, limit: i64) -> StoreResult<Vec<AdminActionView>>;

    async fn count_actions(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn find_subscription(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Option<NotificationSubscription>>;

    async fn create_subscription(&self, subscription: NewSubscription) -> StoreResult<NotificationSubscription>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Festivals that have not ended, by start date.
    async fn upcoming_festivals(&self, now: DateTime<Utc>) -> StoreResult<Vec<Festival>>;

    async fn feature_flags(&self) -> StoreResult<Vec<FeatureFlag>>;
}
