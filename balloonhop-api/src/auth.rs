use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;

use balloonhop_core::auth::{hash_password_blocking, verify_password_blocking};
use balloonhop_core::models::{
    LoginRequest, PilotProfile, PilotRegisterRequest, Role, SignupRequest, User,
};
use balloonhop_shared::Masked;

use crate::error::AppError;
use crate::extract::Valid;
use crate::middleware::{auth_rate_limit, require_user, AuthUser};
use crate::state::AppState;

const DUPLICATE_USER: &str = "User with this email or phone number already exists";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pilot: Option<PilotProfile>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub pilot: Option<PilotProfile>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/signup/password", post(signup))
        .route("/auth/login/password", post(login))
        .route("/auth/pilot/register", post(register_pilot))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_rate_limit));

    let me = Router::new()
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, require_user));

    public.merge(me)
}

async fn ensure_unused(state: &AppState, email: &str, phone_number: &str) -> Result<(), AppError> {
    if state.users.find_user_by_email(email).await?.is_some()
        || state.users.find_user_by_phone(phone_number).await?.is_some()
    {
        return Err(AppError::ConflictError(DUPLICATE_USER.to_string()));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/signup/password
pub async fn signup(
    State(state): State<AppState>,
    Valid(signup): Valid<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    ensure_unused(&state, &signup.email, &signup.phone_number).await?;

    let hash = hash_password_blocking(signup.password.clone()).await?;
    let user = state
        .users
        .create_user(signup.into_new_user(hash, Role::Passenger))
        .await
        .map_err(|e| AppError::conflict_or_internal(e, DUPLICATE_USER))?;

    let token = state.auth.tokens.issue(&user)?;
    tracing::info!(user_id = %user.user_id, email = %Masked(user.email.as_str()), "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user,
            pilot: None,
        }),
    ))
}

/// POST /auth/login/password
pub async fn login(
    State(state): State<AppState>,
    Valid(login): Valid<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::AuthenticationError("Invalid email or password".to_string());

    let user = state.users.find_user_by_email(&login.email).await?.ok_or_else(invalid)?;
    if !verify_password_blocking(login.password, user.password_hash.clone()).await? {
        tracing::warn!(email = %Masked(login.email.as_str()), "Failed login");
        return Err(invalid());
    }

    let pilot = match user.role {
        Role::Pilot => state.pilots.find_pilot_by_user(user.user_id).await?,
        _ => None,
    };
    let token = state.auth.tokens.issue(&user)?;
    Ok(Json(AuthResponse { token, user, pilot }))
}

/// POST /auth/pilot/register
pub async fn register_pilot(
    State(state): State<AppState>,
    Valid(registration): Valid<PilotRegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let signup = registration.signup;
    ensure_unused(&state, &signup.email, &signup.phone_number).await?;

    let hash = hash_password_blocking(signup.password.clone()).await?;
    let record = state
        .users
        .register_pilot(signup.into_new_user(hash, Role::Pilot), registration.pilot_license_number)
        .await
        .map_err(|e| AppError::conflict_or_internal(e, DUPLICATE_USER))?;

    let token = state.auth.tokens.issue(&record.user)?;
    tracing::info!(
        pilot_id = %record.pilot.pilot_id,
        application_id = %record.application.application_id,
        "Pilot registered, awaiting approval"
    );

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: record.user,
            pilot: Some(record.pilot),
        }),
    ))
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> Result<Json<MeResponse>, AppError> {
    let user = state
        .users
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;
    Ok(Json(MeResponse { user, pilot: auth.pilot }))
}
