use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};

use balloonhop_core::models::SubscribeRequest;

use crate::error::AppError;
use crate::extract::Valid;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/notifications/subscribe", post(subscribe))
}

/// POST /notifications/subscribe
/// Idempotent on email or phone number.
pub async fn subscribe(
    State(state): State<AppState>,
    Valid(subscription): Valid<SubscribeRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let existing = state
        .notifications
        .find_subscription(subscription.email.as_deref(), subscription.phone_number.as_deref())
        .await?;
    if existing.is_some() {
        return Ok((StatusCode::OK, Json(json!({ "ok": true, "alreadySubscribed": true }))));
    }

    let created = state.notifications.create_subscription(subscription).await?;
    tracing::info!(subscription_id = %created.subscription_id, "Notification subscription created");
    Ok((StatusCode::CREATED, Json(json!({ "ok": true }))))
}
