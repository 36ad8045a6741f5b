//! Stripe REST client and the development stand-in used without a secret key.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use balloonhop_core::payment::{
    ConnectAccount, FlightProduct, FlightProductRequest, PaymentGateway, PaymentIntent, PaymentIntentRequest,
};
use balloonhop_core::PaymentError;

const STRIPE_API_VERSION: &str = "2024-04-10";

type Form = Vec<(String, String)>;

fn param(form: &mut Form, key: impl Into<String>, value: impl ToString) {
    form.push((key.into(), value.to_string()));
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UrlObject {
    id: Option<String>,
    url: String,
}

#[derive(Clone)]
pub struct StripeGateway {
    http_client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeGateway {
    pub fn new(http_client: reqwest::Client, secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http_client,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &Form,
        connected_account: Option<&str>,
    ) -> Result<T, PaymentError> {
        let mut request = self
            .http_client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", STRIPE_API_VERSION)
            .form(form);
        if let Some(account) = connected_account {
            request = request.header("Stripe-Account", account);
        }
        debug!(path, "Stripe POST");
        Self::decode(request.send().await).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PaymentError> {
        let request = self
            .http_client
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", STRIPE_API_VERSION);
        debug!(path, "Stripe GET");
        Self::decode(request.send().await).await
    }

    async fn decode<T: DeserializeOwned>(
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T, PaymentError> {
        let response = response.map_err(|e| PaymentError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| PaymentError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, PaymentError> {
        let mut form = Form::new();
        param(&mut form, "amount", request.amount_cents);
        param(&mut form, "currency", &request.currency);
        param(&mut form, "automatic_payment_methods[enabled]", true);
        for (key, value) in &request.metadata {
            param(&mut form, format!("metadata[{}]", key), value);
        }
        if let Some(destination) = &request.destination {
            param(&mut form, "application_fee_amount", destination.application_fee_cents);
            param(&mut form, "transfer_data[destination]", &destination.account_id);
        }

        let intent: PaymentIntent = self.post("/payment_intents", &form, None).await?;
        info!(intent_id = %intent.id, amount = request.amount_cents, "Payment intent created");
        Ok(intent)
    }

    async fn create_connect_account(&self, email: &str, country: &str) -> Result<ConnectAccount, PaymentError> {
        let mut form = Form::new();
        param(&mut form, "type", "express");
        param(&mut form, "country", country);
        param(&mut form, "email", email);
        param(&mut form, "business_type", "individual");
        param(&mut form, "capabilities[card_payments][requested]", true);
        param(&mut form, "capabilities[transfers][requested]", true);
        self.post("/accounts", &form, None).await
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, PaymentError> {
        let mut form = Form::new();
        param(&mut form, "account", account_id);
        param(&mut form, "refresh_url", refresh_url);
        param(&mut form, "return_url", return_url);
        param(&mut form, "type", "account_onboarding");
        let link: UrlObject = self.post("/account_links", &form, None).await?;
        Ok(link.url)
    }

    async fn retrieve_account(&self, account_id: &str) -> Result<ConnectAccount, PaymentError> {
        self.get(&format!("/accounts/{}", account_id)).await
    }

    async fn create_flight_product(&self, request: &FlightProductRequest) -> Result<FlightProduct, PaymentError> {
        let account = Some(request.connect_account_id.as_str());

        let mut form = Form::new();
        param(&mut form, "name", format!("Hot Air Balloon Flight - {}", request.description));
        param(&mut form, "description", &request.description);
        param(&mut form, "metadata[flightId]", request.flight_id);
        param(&mut form, "metadata[pilotId]", request.pilot_id);
        param(&mut form, "metadata[totalSeats]", request.total_seats);
        let product: IdOnly = self.post("/products", &form, account).await?;

        let mut form = Form::new();
        param(&mut form, "product", &product.id);
        param(&mut form, "unit_amount", request.price_per_seat_cents);
        param(&mut form, "currency", &request.currency);
        param(&mut form, "metadata[flightId]", request.flight_id);
        param(&mut form, "metadata[pilotId]", request.pilot_id);
        let price: IdOnly = self.post("/prices", &form, account).await?;

        let mut form = Form::new();
        param(&mut form, "line_items[0][price]", &price.id);
        param(&mut form, "line_items[0][quantity]", 1);
        param(&mut form, "application_fee_amount", request.application_fee_cents());
        param(&mut form, "metadata[flightId]", request.flight_id);
        param(&mut form, "metadata[pilotId]", request.pilot_id);
        let link: UrlObject = self.post("/payment_links", &form, account).await?;

        Ok(FlightProduct {
            product_id: product.id,
            price_id: price.id,
            payment_link_id: link.id.unwrap_or_default(),
            payment_url: link.url,
        })
    }
}

/// Fabricates ids so bookings work without a payment provider.
#[derive(Debug, Clone, Default)]
pub struct DevGateway;

#[async_trait]
impl PaymentGateway for DevGateway {
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, PaymentError> {
        let id = format!("pi_dummy_{}", Uuid::new_v4().simple());
        debug!(intent_id = %id, amount = request.amount_cents, "Dummy payment intent");
        Ok(PaymentIntent {
            client_secret: Some(format!("{}_secret", id)),
            id,
        })
    }

    async fn create_connect_account(&self, _email: &str, _country: &str) -> Result<ConnectAccount, PaymentError> {
        Ok(ConnectAccount {
            id: format!("acct_dummy_{}", Uuid::new_v4().simple()),
            charges_enabled: false,
            payouts_enabled: false,
            details_submitted: false,
        })
    }

    async fn create_account_link(
        &self,
        _account_id: &str,
        _refresh_url: &str,
        return_url: &str,
    ) -> Result<String, PaymentError> {
        Ok(return_url.to_string())
    }

    async fn retrieve_account(&self, account_id: &str) -> Result<ConnectAccount, PaymentError> {
        Ok(ConnectAccount {
            id: account_id.to_string(),
            charges_enabled: false,
            payouts_enabled: false,
            details_submitted: false,
        })
    }

    async fn create_flight_product(&self, request: &FlightProductRequest) -> Result<FlightProduct, PaymentError> {
        let suffix = request.flight_id.simple();
        Ok(FlightProduct {
            product_id: format!("prod_dummy_{}", suffix),
            price_id: format!("price_dummy_{}", suffix),
            payment_link_id: format!("plink_dummy_{}", suffix),
            payment_url: String::new(),
        })
    }
}
