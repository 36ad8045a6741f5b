mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use balloonhop_core::payment::{
    ConnectAccount, FlightProduct, FlightProductRequest, PaymentGateway, PaymentIntent, PaymentIntentRequest,
};
use balloonhop_core::PaymentError;

use common::{booking_body, test_config, TestApp};

/// A provider that is down for payment intents.
struct DownGateway;

#[async_trait]
impl PaymentGateway for DownGateway {
    async fn create_payment_intent(&self, _request: &PaymentIntentRequest) -> Result<PaymentIntent, PaymentError> {
        Err(PaymentError::Provider {
            status: 500,
            message: "api_error".to_string(),
        })
    }

    async fn create_connect_account(&self, _email: &str, _country: &str) -> Result<ConnectAccount, PaymentError> {
        Err(PaymentError::Transport("down".to_string()))
    }

    async fn create_account_link(&self, _account_id: &str, _refresh: &str, _ret: &str) -> Result<String, PaymentError> {
        Err(PaymentError::Transport("down".to_string()))
    }

    async fn retrieve_account(&self, _account_id: &str) -> Result<ConnectAccount, PaymentError> {
        Err(PaymentError::Transport("down".to_string()))
    }

    async fn create_flight_product(&self, _request: &FlightProductRequest) -> Result<FlightProduct, PaymentError> {
        Err(PaymentError::Transport("down".to_string()))
    }
}

#[tokio::test]
async fn test_booking_reserves_seats_and_prices_total() {
    let app = TestApp::new();
    let flight = app.seed_flight(4, 25_000).await;
    let (passenger_id, _) = app.signup_passenger().await;

    let (status, body) = app
        .post("/bookings", booking_body(flight.flight_id, passenger_id, 3), None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let booking = &body["booking"];
    assert_eq!(booking["totalAmountPaidCents"], 75_000);
    assert_eq!(booking["platformFeeCents"], 7_500);
    assert_eq!(booking["pilotPayoutCents"], 67_500);
    assert_eq!(booking["paymentStatus"], "PENDING");
    assert!(booking["stripePaymentIntentId"].as_str().unwrap().starts_with("pi_dummy_"));
    assert!(body["clientSecret"].as_str().unwrap().ends_with("_secret"));

    let (_, flight_body) = app.get(&format!("/flights/{}", flight.flight_id), None).await;
    assert_eq!(flight_body["seatsReserved"], 3);
    assert_eq!(flight_body["seatsRemaining"], 1);
}

#[tokio::test]
async fn test_oversized_booking_is_rejected_without_mutation() {
    let app = TestApp::new();
    let flight = app.seed_flight(4, 25_000).await;
    let (passenger_id, _) = app.signup_passenger().await;

    let (status, _) = app
        .post("/bookings", booking_body(flight.flight_id, passenger_id, 3), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/bookings", booking_body(flight.flight_id, passenger_id, 2), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Not enough seats available");

    assert_eq!(app.seats_reserved(flight.flight_id).await, 3);
    let bookings = app.state.bookings.list_flight_bookings(flight.flight_id).await.unwrap();
    assert_eq!(bookings.len(), 1);
}

#[tokio::test]
async fn test_booking_lookup_failures() {
    let app = TestApp::new();
    let flight = app.seed_flight(4, 10_000).await;
    let (passenger_id, _) = app.signup_passenger().await;

    let (status, body) = app
        .post("/bookings", booking_body(Uuid::new_v4(), passenger_id, 1), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Flight not found");

    let (status, body) = app
        .post("/bookings", booking_body(flight.flight_id, Uuid::new_v4(), 1), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Passenger not found");

    app.store
        .set_flight_status(flight.flight_id, balloonhop_core::models::FlightStatus::Cancelled)
        .await
        .unwrap();
    let (status, body) = app
        .post("/bookings", booking_body(flight.flight_id, passenger_id, 1), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Flight is not available for booking");
    assert_eq!(app.seats_reserved(flight.flight_id).await, 0);
}

#[tokio::test]
async fn test_invalid_booking_body_reports_field_errors() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/bookings", json!({ "flightId": "123", "numberOfSeats": 0 }), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields = body["error"]["fieldErrors"].as_object().unwrap();
    assert!(fields.contains_key("flightId"));
    assert!(fields.contains_key("passengerId"));
    assert!(fields.contains_key("numberOfSeats"));
}

#[tokio::test]
async fn test_concurrent_bookings_never_oversell() {
    let app = Arc::new(TestApp::new());
    let flight = app.seed_flight(5, 20_000).await;
    let (passenger_id, _) = app.signup_passenger().await;

    let mut handles = Vec::new();
    for _ in 0..12 {
        let app = app.clone();
        let body = booking_body(flight.flight_id, passenger_id, 2);
        handles.push(tokio::spawn(async move { app.post("/bookings", body, None).await.0 }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::BAD_REQUEST => {}
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(created, 2);
    assert_eq!(app.seats_reserved(flight.flight_id).await, 4);
}

#[tokio::test]
async fn test_payment_failure_releases_reservation() {
    let app = TestApp::build(test_config(), Arc::new(DownGateway));
    let flight = app.seed_flight(4, 25_000).await;
    let (passenger_id, _) = app.signup_passenger().await;

    let (status, body) = app
        .post("/bookings", booking_body(flight.flight_id, passenger_id, 2), None)
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to create payment");

    assert_eq!(app.seats_reserved(flight.flight_id).await, 0);
    let bookings = app.state.bookings.list_flight_bookings(flight.flight_id).await.unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].payment_status, balloonhop_core::models::PaymentStatus::Cancelled);
}

#[tokio::test]
async fn test_metrics_count_bookings() {
    let app = TestApp::new();
    let flight = app.seed_flight(2, 10_000).await;
    let (passenger_id, _) = app.signup_passenger().await;

    app.post("/bookings", booking_body(flight.flight_id, passenger_id, 1), None)
        .await;
    app.post("/bookings", booking_body(flight.flight_id, passenger_id, 5), None)
        .await;

    let text = app.state.metrics.render().unwrap();
    assert!(text.contains("balloonhop_bookings_created_total 1"), "{text}");
    assert!(text.contains("balloonhop_seats_reserved_total 1"), "{text}");
    assert!(text.contains("reason=\"insufficient_seats\""), "{text}");
}
