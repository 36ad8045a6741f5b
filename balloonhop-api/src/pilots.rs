use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use balloonhop_core::models::{
    ConnectAccountStatus, CreateFlightRequest, Flight, PilotProfile, PilotStatus, PilotSummary,
};
use balloonhop_core::notify::{NotifyOutcome, NotifyPassengers};
use balloonhop_core::payment::FlightProductRequest;

use crate::error::AppError;
use crate::extract::{optional_json, Valid};
use crate::middleware::{require_pilot, AuthUser};
use crate::state::AppState;

const DEFAULT_NOTIFY_MESSAGE: &str =
    "Update on your hot air balloon flight. Please check the app for the latest details.";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub account_id: String,
    pub account_link: String,
    pub status: ConnectAccountStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeStatusResponse {
    pub connected: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotifyRequest {
    pub message: Option<String>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let pilot_only = Router::new()
        .route("/pilots/connect-stripe", post(connect_stripe))
        .route("/pilots/stripe-status", get(stripe_status))
        .route("/pilots/flights", post(create_flight).get(list_my_flights))
        .route("/pilots/flights/{flight_id}/notify", post(notify_passengers))
        .route_layer(middleware::from_fn_with_state(state, require_pilot));

    Router::new()
        .route("/pilots", get(list_pilots))
        .merge(pilot_only)
}

fn pilot_of(auth: &AuthUser) -> Result<&PilotProfile, AppError> {
    auth.pilot
        .as_ref()
        .ok_or_else(|| AppError::AuthorizationError("Pilot access required".to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /pilots
pub async fn list_pilots(State(state): State<AppState>) -> Result<Json<Vec<PilotSummary>>, AppError> {
    Ok(Json(state.pilots.list_approved_pilots().await?))
}

/// POST /pilots/connect-stripe
/// Creates the pilot's Connect account and returns a hosted onboarding link.
pub async fn connect_stripe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ConnectResponse>, AppError> {
    let pilot = pilot_of(&auth)?;

    let account = state
        .payments
        .create_connect_account(&auth.email, &state.settings.connect_country)
        .await
        .map_err(|e| {
            tracing::error!(pilot_id = %pilot.pilot_id, error = %e, "Connect account creation failed");
            AppError::BadGateway("Failed to create Stripe Connect account".to_string())
        })?;

    let refresh_url = format!("{}/pilot/onboarding", state.settings.frontend_url);
    let return_url = format!("{}/pilot/dashboard", state.settings.frontend_url);
    let account_link = state
        .payments
        .create_account_link(&account.id, &refresh_url, &return_url)
        .await
        .map_err(|e| {
            tracing::error!(account_id = %account.id, error = %e, "Account link creation failed");
            AppError::BadGateway("Failed to create Stripe Connect account".to_string())
        })?;

    let profile = state
        .pilots
        .link_connect_account(pilot.pilot_id, &account.id, ConnectAccountStatus::Pending)
        .await
        .map_err(|e| AppError::conflict_or_internal(e, "Stripe account already linked to another pilot"))?;

    tracing::info!(pilot_id = %profile.pilot_id, account_id = %account.id, "Connect account linked");
    Ok(Json(ConnectResponse {
        account_id: account.id,
        account_link,
        status: ConnectAccountStatus::Pending,
    }))
}

/// GET /pilots/stripe-status
pub async fn stripe_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<StripeStatusResponse>, AppError> {
    let pilot = pilot_of(&auth)?;

    let Some(account_id) = pilot.stripe_connect_account_id.clone() else {
        return Ok(Json(StripeStatusResponse {
            connected: false,
            status: "NOT_CONNECTED".to_string(),
            account_id: None,
            charges_enabled: false,
            payouts_enabled: false,
            details_submitted: false,
        }));
    };

    let account = state.payments.retrieve_account(&account_id).await.map_err(|e| {
        tracing::error!(%account_id, error = %e, "Failed to retrieve Connect account");
        AppError::BadGateway("Failed to get Stripe status".to_string())
    })?;

    let status = account.derived_status();
    if pilot.stripe_account_status != Some(status) {
        state.pilots.update_connect_status(pilot.pilot_id, status).await?;
    }

    Ok(Json(StripeStatusResponse {
        connected: true,
        status: status.to_string(),
        account_id: Some(account_id),
        charges_enabled: account.charges_enabled,
        payouts_enabled: account.payouts_enabled,
        details_submitted: account.details_submitted,
    }))
}

/// POST /pilots/flights
pub async fn create_flight(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Valid(draft): Valid<CreateFlightRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let pilot = pilot_of(&auth)?;
    if pilot.status != PilotStatus::Approved {
        return Err(AppError::AuthorizationError(
            "Pilot is not approved to create flights".to_string(),
        ));
    }

    let mut flight = state
        .flights
        .create_flight(draft.for_pilot(pilot.pilot_id, state.settings.platform_fee_bps))
        .await?;
    tracing::info!(flight_id = %flight.flight_id, pilot_id = %pilot.pilot_id, "Flight created");

    if let Some(account_id) = pilot.payout_account() {
        flight = attach_product(&state, flight, account_id).await;
    }

    Ok((StatusCode::CREATED, Json(serde_json::to_value(flight.view())?)))
}

/// Best effort: the flight stays bookable through payment intents if the
/// payment link cannot be created.
async fn attach_product(state: &AppState, flight: Flight, account_id: &str) -> Flight {
    let request = FlightProductRequest {
        flight_id: flight.flight_id,
        pilot_id: flight.pilot_id,
        connect_account_id: account_id.to_string(),
        description: flight
            .description
            .clone()
            .unwrap_or_else(|| flight.meetup_timestamp.format("%Y-%m-%d %H:%M UTC").to_string()),
        price_per_seat_cents: flight.price_per_seat_cents,
        total_seats: flight.total_seats,
        currency: state.settings.currency.clone(),
    };

    let product = match state.payments.create_flight_product(&request).await {
        Ok(product) => product,
        Err(err) => {
            tracing::warn!(flight_id = %flight.flight_id, error = %err, "Failed to create payment link");
            return flight;
        }
    };

    match state.flights.attach_stripe_product(flight.flight_id, &product).await {
        Ok(updated) => updated,
        Err(err) => {
            tracing::warn!(flight_id = %flight.flight_id, error = %err, "Failed to store payment link");
            flight
        }
    }
}

/// GET /pilots/flights
pub async fn list_my_flights(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Value>>, AppError> {
    let pilot = pilot_of(&auth)?;
    let flights = state.flights.list_pilot_flights(pilot.pilot_id).await?;
    let views = flights
        .iter()
        .map(|f| serde_json::to_value(f.view()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

/// POST /pilots/flights/{flightId}/notify
pub async fn notify_passengers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(flight_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<NotifyOutcome>, AppError> {
    let pilot = pilot_of(&auth)?;

    // Another pilot's flight is reported as missing.
    let flight = state
        .flights
        .get_flight(flight_id)
        .await?
        .filter(|f| f.pilot_id == pilot.pilot_id)
        .ok_or_else(|| AppError::NotFoundError("Flight not found".to_string()))?;

    let request: NotifyRequest = optional_json(&body)?;
    let message = request
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_NOTIFY_MESSAGE.to_string());

    let phone_numbers = state.bookings.passenger_phone_numbers(flight.flight_id).await?;
    let outcome = state
        .notifier
        .notify_passengers(NotifyPassengers {
            phone_numbers,
            device_tokens: Vec::new(),
            message,
            deep_link_url: Some(format!("{}/flights/{}", state.settings.frontend_url, flight.flight_id)),
        })
        .await
        .map_err(|e| AppError::BadGateway(e.to_string()))?;

    tracing::info!(flight_id = %flight.flight_id, count = outcome.count, "Passengers notified");
    Ok(Json(outcome))
}
