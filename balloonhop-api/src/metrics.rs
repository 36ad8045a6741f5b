use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::state::AppState;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub seats_reserved: IntCounter,
    pub reservation_rejections: IntCounterVec,
    pub webhook_events: IntCounterVec,
    pub http_requests: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("balloonhop".to_string()), None)?;

        let bookings_created = IntCounter::new("bookings_created_total", "Bookings created")?;
        let seats_reserved = IntCounter::new("seats_reserved_total", "Seats reserved by new bookings")?;
        let reservation_rejections = IntCounterVec::new(
            Opts::new("reservation_rejections_total", "Refused seat reservations"),
            &["reason"],
        )?;
        let webhook_events = IntCounterVec::new(
            Opts::new("webhook_events_total", "Verified Stripe webhook events"),
            &["event_type"],
        )?;
        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP responses by status class"),
            &["status"],
        )?;

        registry.register(Box::new(bookings_created.clone()))?;
        registry.register(Box::new(seats_reserved.clone()))?;
        registry.register(Box::new(reservation_rejections.clone()))?;
        registry.register(Box::new(webhook_events.clone()))?;
        registry.register(Box::new(http_requests.clone()))?;

        Ok(Self {
            registry,
            bookings_created,
            seats_reserved,
            reservation_rejections,
            webhook_events,
            http_requests,
        })
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

pub async fn track_http_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    state
        .metrics
        .http_requests
        .with_label_values(&[status_class(response.status())])
        .inc();
    response
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(err) => {
            tracing::error!("Failed to encode metrics: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
