use axum::{body::Bytes, extract::State, http::HeaderMap, routing::post, Json, Router};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;

use balloonhop_core::payment::ConnectAccount;

use crate::error::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const SIGNATURE_TOLERANCE_SECONDS: i64 = 300;

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    Malformed,
    Expired,
    Mismatch,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/stripe", post(handle_stripe_webhook))
}

// ============================================================================
// Signature Verification
// ============================================================================

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a `t=<unix>,v1=<hex>[,v1=<hex>]` header. Any matching `v1` passes.
pub fn verify_signature(header: &str, payload: &[u8], secret: &str, now: i64) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    let skew = now.checked_sub(timestamp).and_then(i64::checked_abs);
    if skew.map_or(true, |skew| skew > SIGNATURE_TOLERANCE_SECONDS) {
        return Err(SignatureError::Expired);
    }

    for candidate in candidates {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::Mismatch)
}

// ============================================================================
// Handler
// ============================================================================

/// POST /webhooks/stripe
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let Some(secret) = state.settings.webhook_secret.as_deref() else {
        tracing::warn!("Stripe webhook received but no webhook secret is configured");
        return Ok(Json(json!({ "received": true })));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::ValidationError("Missing signature".to_string()))?;

    if let Err(err) = verify_signature(signature, &body, secret, chrono::Utc::now().timestamp()) {
        tracing::warn!(?err, "Webhook signature verification failed");
        return Err(AppError::ValidationError("Webhook Error".to_string()));
    }

    let event: StripeEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Undecodable webhook payload");
        AppError::ValidationError("Webhook Error".to_string())
    })?;

    tracing::info!(event_id = ?event.id, event_type = %event.event_type, "Stripe webhook received");
    state
        .metrics
        .webhook_events
        .with_label_values(&[event.event_type.as_str()])
        .inc();

    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            if let Some(intent_id) = object_id(&event.data.object) {
                state.booking_service.confirm_payment(intent_id).await?;
            }
        }
        "payment_intent.payment_failed" => {
            if let Some(intent_id) = object_id(&event.data.object) {
                state.booking_service.fail_payment(intent_id).await?;
            }
        }
        "account.updated" => {
            let account: ConnectAccount = serde_json::from_value(event.data.object)
                .map_err(|_| AppError::ValidationError("Webhook Error".to_string()))?;
            update_connect_account(&state, &account).await?;
        }
        other => tracing::debug!(event_type = other, "Unhandled webhook event"),
    }

    Ok(Json(json!({ "received": true })))
}

fn object_id(object: &Value) -> Option<&str> {
    object.get("id").and_then(Value::as_str)
}

async fn update_connect_account(state: &AppState, account: &ConnectAccount) -> Result<(), AppError> {
    let Some(pilot) = state.pilots.find_pilot_by_connect_account(&account.id).await? else {
        tracing::warn!(account_id = %account.id, "No pilot for updated Connect account");
        return Ok(());
    };
    let status = account.derived_status();
    state.pilots.update_connect_status(pilot.pilot_id, status).await?;
    tracing::info!(pilot_id = %pilot.pilot_id, %status, "Connect account status updated");
    Ok(())
}
