use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use balloonhop_core::models::{PilotProfile, Role};

use crate::error::AppError;
use crate::state::AppState;

pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// The caller, resolved from a verified bearer token and a live user row.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub pilot: Option<PilotProfile>,
}

// ============================================================================
// Token Resolution
// ============================================================================

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = bearer_token(headers)
        .ok_or_else(|| AppError::AuthenticationError("Access token required".to_string()))?;

    let claims = state
        .auth
        .tokens
        .verify(token)
        .map_err(|_| AppError::AuthorizationError("Invalid or expired token".to_string()))?;

    let user = state
        .users
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("Invalid token - user not found".to_string()))?;

    let pilot = match user.role {
        Role::Pilot => state.pilots.find_pilot_by_user(user.user_id).await?,
        _ => None,
    };

    Ok(AuthUser {
        user_id: user.user_id,
        email: user.email,
        role: user.role,
        pilot,
    })
}

// ============================================================================
// Middleware
// ============================================================================

pub async fn require_user(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn require_pilot(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    let user = authenticate(&state, req.headers()).await?;
    if user.role != Role::Pilot || user.pilot.is_none() {
        return Err(AppError::AuthorizationError("Pilot access required".to_string()));
    }
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn require_admin(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    let user = authenticate(&state, req.headers()).await?;
    if user.role != Role::Admin {
        return Err(AppError::AuthorizationError("Admin access required".to_string()));
    }

    let Some(expected) = state.auth.admin_secret.as_deref() else {
        tracing::error!("Admin request rejected: no admin secret configured");
        return Err(AppError::ServiceUnavailable(
            "Admin authentication not configured".to_string(),
        ));
    };
    let provided = req
        .headers()
        .get(ADMIN_SECRET_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        tracing::warn!(admin_id = %user.user_id, "Invalid admin secret");
        return Err(AppError::AuthenticationError("Invalid admin secret".to_string()));
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
