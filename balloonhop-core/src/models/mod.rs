/// Error returned when a stored enum column holds an unknown value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Enums persisted as TEXT columns: serde uses the same SCREAMING_SNAKE_CASE
/// spelling as `as_str`/`FromStr`.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::models::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod admin;
pub mod booking;
pub mod catalog;
pub mod flight;
pub mod notification;
pub mod pilot;
pub mod user;

pub use admin::{AdminAction, AdminActionDraft, AdminActionType, AdminActionView, AdminIdentity};
pub use booking::{Booking, CreateBookingRequest, PaymentStatus, ReservationRequest};
pub use catalog::{FeatureFlag, Festival};
pub use flight::{CreateFlightRequest, Flight, FlightDraft, FlightStatus, FlightView, LaunchLocation, NewFlight};
pub use notification::{NewSubscription, NotificationSubscription, SubscribeRequest};
pub use pilot::{
    ConnectAccountStatus, LicenseVerificationStatus, PilotApplication, PilotDetails, PilotProfile,
    PilotStatus, PilotSummary, StatusChange, UserSummary,
};
pub use user::{
    Login, LoginRequest, NewUser, PilotRegisterRequest, PilotRegistration, Role, Signup, SignupRequest, User,
};
