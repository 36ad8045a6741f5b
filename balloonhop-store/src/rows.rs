//! Row shapes as sqlx reads them, and their conversion into core models.
//! Enumerations are stored as text and parsed on the way out.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use balloonhop_core::models::{
    AdminAction, AdminActionView, AdminIdentity, Booking, ConnectAccountStatus, Flight, LaunchLocation, PilotApplication,
    PilotProfile, User,
};
use balloonhop_core::StoreError;

pub(crate) const USER_COLUMNS: &str = "user_id, first_name, last_name, email, phone_number, home_zip_code, \
     password_hash, role, created_at, updated_at";

pub(crate) const PILOT_COLUMNS: &str = "pilot_id, user_id, status, stripe_connect_account_id, \
     stripe_account_status, created_at, updated_at";

pub(crate) const APPLICATION_COLUMNS: &str =
    "application_id, pilot_id, pilot_license_number, license_verification_status, created_at";

pub(crate) const FLIGHT_COLUMNS: &str = "flight_id, pilot_id, launch_longitude, launch_latitude, \
     meetup_timestamp, estimated_duration_minutes, price_per_seat_cents, total_seats, seats_reserved, \
     description, status, platform_fee_bps, stripe_product_id, stripe_price_id, stripe_payment_link_id, \
     created_at, updated_at";

pub(crate) const BOOKING_COLUMNS: &str = "booking_id, flight_id, passenger_id, number_of_seats, \
     total_amount_paid_cents, platform_fee_cents, pilot_payout_cents, payment_status, \
     stripe_payment_intent_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    user_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: String,
    home_zip_code: Option<String>,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            user_id: row.user_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone_number: row.phone_number,
            home_zip_code: row.home_zip_code,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PilotRow {
    pilot_id: Uuid,
    user_id: Uuid,
    status: String,
    stripe_connect_account_id: Option<String>,
    stripe_account_status: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PilotRow> for PilotProfile {
    type Error = StoreError;

    fn try_from(row: PilotRow) -> Result<Self, Self::Error> {
        Ok(PilotProfile {
            pilot_id: row.pilot_id,
            user_id: row.user_id,
            status: row.status.parse()?,
            stripe_connect_account_id: row.stripe_connect_account_id,
            stripe_account_status: row.stripe_account_status.map(|s| s.parse::<ConnectAccountStatus>()).transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ApplicationRow {
    application_id: Uuid,
    pilot_id: Uuid,
    pilot_license_number: String,
    license_verification_status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for PilotApplication {
    type Error = StoreError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(PilotApplication {
            application_id: row.application_id,
            pilot_id: row.pilot_id,
            pilot_license_number: row.pilot_license_number,
            license_verification_status: row.license_verification_status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FlightRow {
    flight_id: Uuid,
    pilot_id: Uuid,
    launch_longitude: f64,
    launch_latitude: f64,
    meetup_timestamp: DateTime<Utc>,
    estimated_duration_minutes: i32,
    price_per_seat_cents: i64,
    total_seats: i32,
    seats_reserved: i32,
    description: Option<String>,
    status: String,
    platform_fee_bps: i32,
    stripe_product_id: Option<String>,
    stripe_price_id: Option<String>,
    stripe_payment_link_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FlightRow> for Flight {
    type Error = StoreError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        Ok(Flight {
            flight_id: row.flight_id,
            pilot_id: row.pilot_id,
            launch_location: LaunchLocation::point(row.launch_longitude, row.launch_latitude),
            meetup_timestamp: row.meetup_timestamp,
            estimated_duration_minutes: row.estimated_duration_minutes,
            price_per_seat_cents: row.price_per_seat_cents,
            total_seats: row.total_seats,
            seats_reserved: row.seats_reserved,
            description: row.description,
            status: row.status.parse()?,
            platform_fee_bps: row.platform_fee_bps,
            stripe_product_id: row.stripe_product_id,
            stripe_price_id: row.stripe_price_id,
            stripe_payment_link_id: row.stripe_payment_link_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    booking_id: Uuid,
    flight_id: Uuid,
    passenger_id: Uuid,
    number_of_seats: i32,
    total_amount_paid_cents: i64,
    platform_fee_cents: i64,
    pilot_payout_cents: i64,
    payment_status: String,
    stripe_payment_intent_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            booking_id: row.booking_id,
            flight_id: row.flight_id,
            passenger_id: row.passenger_id,
            number_of_seats: row.number_of_seats,
            total_amount_paid_cents: row.total_amount_paid_cents,
            platform_fee_cents: row.platform_fee_cents,
            pilot_payout_cents: row.pilot_payout_cents,
            payment_status: row.payment_status.parse()?,
            stripe_payment_intent_id: row.stripe_payment_intent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `admin_actions` left-joined with the acting user.
#[derive(sqlx::FromRow)]
pub(crate) struct AdminActionRow {
    action_id: Uuid,
    admin_id: Uuid,
    action_type: String,
    target_id: Uuid,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
    admin_first_name: Option<String>,
    admin_last_name: Option<String>,
    admin_email: Option<String>,
}

impl TryFrom<AdminActionRow> for AdminActionView {
    type Error = StoreError;

    fn try_from(row: AdminActionRow) -> Result<Self, Self::Error> {
        let admin = match (row.admin_first_name, row.admin_last_name, row.admin_email) {
            (Some(first_name), Some(last_name), Some(email)) => Some(AdminIdentity {
                first_name,
                last_name,
                email,
            }),
            _ => None,
        };
        Ok(AdminActionView {
            action: AdminAction {
                action_id: row.action_id,
                admin_id: row.admin_id,
                action_type: row.action_type.parse()?,
                target_id: row.target_id,
                details: row.details,
                created_at: row.created_at,
            },
            admin,
        })
    }
}

pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
