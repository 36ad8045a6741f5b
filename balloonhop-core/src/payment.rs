use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use balloonhop_shared::money::Cents;

use crate::error::PaymentError;
use crate::models::ConnectAccountStatus;

/// Routes the charge to a pilot's connected account, keeping the platform fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub account_id: String,
    pub application_fee_cents: Cents,
}

#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub amount_cents: Cents,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
    pub destination: Option<Destination>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectAccount {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
}

impl ConnectAccount {
    pub fn derived_status(&self) -> ConnectAccountStatus {
        if self.charges_enabled && self.payouts_enabled {
            ConnectAccountStatus::Active
        } else if self.charges_enabled {
            ConnectAccountStatus::Pending
        } else if self.details_submitted {
            ConnectAccountStatus::Restricted
        } else {
            ConnectAccountStatus::Pending
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlightProductRequest {
    pub flight_id: Uuid,
    pub pilot_id: Uuid,
    pub connect_account_id: String,
    pub description: String,
    pub price_per_seat_cents: Cents,
    pub total_seats: i32,
    pub currency: String,
}

impl FlightProductRequest {
    /// Payment links keep 10% of the seat price for the platform.
    pub fn application_fee_cents(&self) -> Cents {
        self.price_per_seat_cents / 10
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightProduct {
    pub product_id: String,
    pub price_id: String,
    pub payment_link_id: String,
    pub payment_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, PaymentError>;

    async fn create_connect_account(&self, email: &str, country: &str) -> Result<ConnectAccount, PaymentError>;

    /// Returns the hosted onboarding URL.
    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, PaymentError>;

    async fn retrieve_account(&self, account_id: &str) -> Result<ConnectAccount, PaymentError>;

    async fn create_flight_product(&self, request: &FlightProductRequest) -> Result<FlightProduct, PaymentError>;
}
