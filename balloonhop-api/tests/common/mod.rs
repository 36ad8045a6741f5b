#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use balloonhop_api::{app, AppState};
use balloonhop_core::models::{Flight, LaunchLocation, NewFlight, Role, User};
use balloonhop_core::payment::PaymentGateway;
use balloonhop_store::app_config::Config;
use balloonhop_store::{DevGateway, LogNotifier, MemoryRateLimiter, MemoryStore, Repositories};

pub const ADMIN_SECRET: &str = "test-admin-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub fn test_config() -> Config {
    let mut config = Config::from_toml(include_str!("../../../config/default.toml")).unwrap();
    config.database.url = "memory://".to_string();
    config.auth.admin_secret = Some(ADMIN_SECRET.to_string());
    config.stripe.webhook_secret = Some(WEBHOOK_SECRET.to_string());
    config.rate_limit.auth_max = 10_000;
    config.rate_limit.global_max = Some(10_000);
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(test_config(), Arc::new(DevGateway))
    }

    pub fn build(config: Config, payments: Arc<dyn PaymentGateway>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            &config,
            Repositories::memory(store.clone()),
            payments,
            Arc::new(LogNotifier::new(false)),
            Arc::new(MemoryRateLimiter::new()),
        )
        .unwrap();
        Self {
            router: app(state.clone()),
            state,
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// GET as a given client address, for per-IP limits.
    pub async fn get_from(&self, path: &str, client_ip: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header("x-forwarded-for", client_ip)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post(&self, path: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn admin_post(&self, path: &str, body: Value, token: &str, secret: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token));
        if let Some(secret) = secret {
            builder = builder.header("x-admin-secret", secret);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    /// Signs up a passenger through the API and returns `(user_id, token)`.
    pub async fn signup_passenger(&self) -> (Uuid, String) {
        let (status, body) = self.post("/auth/signup/password", signup_body(), None).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (user_id(&body), body["token"].as_str().unwrap().to_string())
    }

    /// Registers a pilot and has an admin approve it. Returns `(pilot_id, token)`.
    pub async fn approved_pilot(&self) -> (Uuid, String) {
        let (pilot_id, token) = self.pending_pilot().await;
        let admin_token = self.admin_token().await;
        let (status, body) = self
            .admin_post(
                &format!("/admin/pilots/{}/approve", pilot_id),
                json!({ "notes": "license checked" }),
                &admin_token,
                Some(ADMIN_SECRET),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (pilot_id, token)
    }

    pub async fn pending_pilot(&self) -> (Uuid, String) {
        let mut body = signup_body();
        body["pilotLicenseNumber"] = json!("FAA-123456");
        body["zipCode"] = json!("87107");
        let (status, body) = self.post("/auth/pilot/register", body, None).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let pilot_id = body["pilot"]["pilotId"].as_str().unwrap().parse().unwrap();
        (pilot_id, body["token"].as_str().unwrap().to_string())
    }

    /// Admins have no signup route; they are seeded directly.
    pub async fn admin_token(&self) -> String {
        let now = Utc::now();
        let admin = self
            .store
            .insert_user(User {
                user_id: Uuid::new_v4(),
                first_name: "Ada".to_string(),
                last_name: "Admin".to_string(),
                email: format!("admin-{}@balloonhop.test", Uuid::new_v4().simple()),
                phone_number: format!("+1505{}", &Uuid::new_v4().simple().to_string()[..7]),
                home_zip_code: None,
                password_hash: "unused".to_string(),
                role: Role::Admin,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        self.state.auth.tokens.issue(&admin).unwrap()
    }

    pub async fn seed_flight(&self, total_seats: i32, price_per_seat_cents: i64) -> Flight {
        let flight = NewFlight {
            pilot_id: Uuid::new_v4(),
            launch_location: LaunchLocation::point(-106.5942, 35.1961),
            meetup_timestamp: Utc::now() + Duration::days(2),
            estimated_duration_minutes: 90,
            price_per_seat_cents,
            total_seats,
            description: Some("Sunrise over the Rio Grande".to_string()),
            platform_fee_bps: 1000,
        }
        .into_flight(Utc::now());
        self.store.insert_flight(flight).await
    }

    pub async fn seats_reserved(&self, flight_id: Uuid) -> i64 {
        let (status, body) = self.get(&format!("/flights/{}", flight_id), None).await;
        assert_eq!(status, StatusCode::OK);
        body["seatsReserved"].as_i64().unwrap()
    }
}

pub fn signup_body() -> Value {
    let tag = Uuid::new_v4().simple().to_string();
    json!({
        "firstName": "Pat",
        "lastName": "Passenger",
        "email": format!("pat-{}@example.com", tag),
        "phoneNumber": format!("+1505{}", &tag[..7]),
        "password": "hunter2hunter2",
    })
}

pub fn user_id(body: &Value) -> Uuid {
    body["user"]["userId"].as_str().unwrap().parse().unwrap()
}

pub fn booking_body(flight_id: Uuid, passenger_id: Uuid, seats: i64) -> Value {
    json!({
        "flightId": flight_id,
        "passengerId": passenger_id,
        "numberOfSeats": seats,
    })
}
