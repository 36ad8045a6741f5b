use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use balloonhop_shared::money::{self, Cents};

use garde::Validate;

use crate::validation::{trimmed, trimmed_opt, Checked, Now, ValidationErrors};

pub const DEFAULT_PLATFORM_FEE_BPS: i32 = 1000;

text_enum!(FlightStatus, "flight status", {
    Upcoming => "UPCOMING",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

impl FlightStatus {
    pub fn is_bookable(&self) -> bool {
        matches!(self, FlightStatus::Upcoming)
    }
}

/// GeoJSON point, `[longitude, latitude]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchLocation {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl LaunchLocation {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub flight_id: Uuid,
    pub pilot_id: Uuid,
    pub launch_location: LaunchLocation,
    pub meetup_timestamp: DateTime<Utc>,
    pub estimated_duration_minutes: i32,
    pub price_per_seat_cents: Cents,
    pub total_seats: i32,
    pub seats_reserved: i32,
    pub description: Option<String>,
    pub status: FlightStatus,
    pub platform_fee_bps: i32,
    pub stripe_product_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_payment_link_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flight {
    pub fn seats_remaining(&self) -> i32 {
        (self.total_seats - self.seats_reserved).max(0)
    }

    pub fn view(&self) -> FlightView<'_> {
        FlightView {
            flight: self,
            seats_remaining: self.seats_remaining(),
        }
    }
}

/// Wire form of a flight: every stored field plus `seatsRemaining`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightView<'a> {
    #[serde(flatten)]
    pub flight: &'a Flight,
    pub seats_remaining: i32,
}

#[derive(Debug, Clone)]
pub struct NewFlight {
    pub pilot_id: Uuid,
    pub launch_location: LaunchLocation,
    pub meetup_timestamp: DateTime<Utc>,
    pub estimated_duration_minutes: i32,
    pub price_per_seat_cents: Cents,
    pub total_seats: i32,
    pub description: Option<String>,
    pub platform_fee_bps: i32,
}

impl NewFlight {
    pub fn into_flight(self, now: DateTime<Utc>) -> Flight {
        Flight {
            flight_id: Uuid::new_v4(),
            pilot_id: self.pilot_id,
            launch_location: self.launch_location,
            meetup_timestamp: self.meetup_timestamp,
            estimated_duration_minutes: self.estimated_duration_minutes,
            price_per_seat_cents: self.price_per_seat_cents,
            total_seats: self.total_seats,
            seats_reserved: 0,
            description: self.description,
            status: FlightStatus::Upcoming,
            platform_fee_bps: self.platform_fee_bps,
            stripe_product_id: None,
            stripe_price_id: None,
            stripe_payment_link_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[garde(context(Now))]
#[serde(rename_all = "camelCase")]
pub struct CreateFlightRequest {
    #[serde(default)]
    #[garde(custom(geo_point))]
    pub launch_location: LaunchLocation,
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(custom(in_future))]
    pub meetup_timestamp: String,
    #[serde(default)]
    #[garde(range(min = 1, max = 1440))]
    pub estimated_duration_minutes: i64,
    #[serde(default)]
    #[garde(custom(seat_price))]
    pub price_per_seat: f64,
    #[serde(default)]
    #[garde(range(min = 1, max = 50))]
    pub total_seats: i64,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[garde(length(chars, max = 1000))]
    pub description: Option<String>,
}

fn geo_point(loc: &LaunchLocation, _: &Now) -> garde::Result {
    if loc.kind != "Point" {
        return Err(garde::Error::new("expected a GeoJSON Point"));
    }
    if !(-180.0..=180.0).contains(&loc.longitude()) || !(-90.0..=90.0).contains(&loc.latitude()) {
        return Err(garde::Error::new("coordinates must be [longitude, latitude]"));
    }
    Ok(())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|ts| ts.with_timezone(&Utc))
}

fn in_future(raw: &str, now: &Now) -> garde::Result {
    match parse_timestamp(raw) {
        None => Err(garde::Error::new("not a valid RFC 3339 datetime")),
        Some(ts) if ts <= now.0 => Err(garde::Error::new("meetup timestamp must be in the future")),
        Some(_) => Ok(()),
    }
}

fn seat_price(dollars: &f64, _: &Now) -> garde::Result {
    if *dollars > 10_000.0 {
        return Err(garde::Error::new("greater than 10000"));
    }
    match money::dollars_to_cents(*dollars) {
        Some(cents) if cents > 0 => Ok(()),
        _ => Err(garde::Error::new("must be greater than 0")),
    }
}

/// A checked flight that still needs its pilot and fee attached.
#[derive(Debug, Clone)]
pub struct FlightDraft {
    pub launch_location: LaunchLocation,
    pub meetup_timestamp: DateTime<Utc>,
    pub estimated_duration_minutes: i32,
    pub price_per_seat_cents: Cents,
    pub total_seats: i32,
    pub description: Option<String>,
}

impl FlightDraft {
    pub fn for_pilot(self, pilot_id: Uuid, platform_fee_bps: i32) -> NewFlight {
        NewFlight {
            pilot_id,
            launch_location: self.launch_location,
            meetup_timestamp: self.meetup_timestamp,
            estimated_duration_minutes: self.estimated_duration_minutes,
            price_per_seat_cents: self.price_per_seat_cents,
            total_seats: self.total_seats,
            description: self.description,
            platform_fee_bps,
        }
    }
}

impl CreateFlightRequest {
    pub fn validate_at(self, now: DateTime<Utc>) -> Result<FlightDraft, ValidationErrors> {
        self.check_with(&Now(now))
    }
}

impl Checked for CreateFlightRequest {
    type Output = FlightDraft;

    fn normalize(self) -> Result<FlightDraft, ValidationErrors> {
        let meetup_timestamp = parse_timestamp(&self.meetup_timestamp)
            .ok_or_else(|| ValidationErrors::field("meetupTimestamp", "not a valid RFC 3339 datetime"))?;
        let price_per_seat_cents = money::dollars_to_cents(self.price_per_seat)
            .ok_or_else(|| ValidationErrors::field("pricePerSeat", "must be greater than 0"))?;
        let minutes = i32::try_from(self.estimated_duration_minutes)
            .map_err(|_| ValidationErrors::field("estimatedDurationMinutes", "out of range"))?;
        let seats =
            i32::try_from(self.total_seats).map_err(|_| ValidationErrors::field("totalSeats", "out of range"))?;
        Ok(FlightDraft {
            launch_location: self.launch_location,
            meetup_timestamp,
            estimated_duration_minutes: minutes,
            price_per_seat_cents,
            total_seats: seats,
            description: self.description.filter(|d| !d.is_empty()),
        })
    }
}
