use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

/// Socket peer when served with connect info, else the first forwarded hop.
fn client_ip(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    req.headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn limit(state: &AppState, scope: &str, max: u64, req: Request, next: Next) -> Response {
    let key = format!("ratelimit:{}:{}", scope, client_ip(&req));
    let window = state.settings.rate_limit.window_seconds;

    match state.rate_limiter.hit(&key, max, window).await {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            tracing::warn!(%key, "Rate limit exceeded");
            AppError::TooManyRequests("Too many requests, please try again later.".to_string()).into_response()
        }
        Err(err) => {
            // Fail open
            tracing::warn!(error = %err, "Rate limiter unavailable");
            next.run(req).await
        }
    }
}

pub async fn global_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let max = state.settings.rate_limit.global_limit(state.settings.environment);
    limit(&state, "global", max, req, next).await
}

/// Only failed attempts count towards the auth limit.
pub async fn auth_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let max = state.settings.rate_limit.auth_max;
    let window = state.settings.rate_limit.window_seconds;
    let key = format!("ratelimit:auth:{}", client_ip(&req));

    match state.rate_limiter.current(&key, window).await {
        Ok(count) if count >= max => {
            tracing::warn!(%key, "Auth rate limit exceeded");
            return AppError::TooManyRequests(
                "Too many authentication attempts, please try again later.".to_string(),
            )
            .into_response();
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "Rate limiter unavailable"),
    }

    let response = next.run(req).await;
    if response.status().is_client_error() || response.status().is_server_error() {
        if let Err(err) = state.rate_limiter.hit(&key, max, window).await {
            tracing::warn!(error = %err, "Rate limiter unavailable");
        }
    }
    response
}
