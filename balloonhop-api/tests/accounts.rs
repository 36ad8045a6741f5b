mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use balloonhop_core::models::{FeatureFlag, Festival};
use balloonhop_store::DevGateway;

use common::{signup_body, test_config, TestApp, ADMIN_SECRET};

fn flight_body() -> Value {
    json!({
        "launchLocation": { "type": "Point", "coordinates": [-106.5942, 35.1961] },
        "meetupTimestamp": (Utc::now() + Duration::days(3)).to_rfc3339(),
        "estimatedDurationMinutes": 60,
        "pricePerSeat": 249.99,
        "totalSeats": 6,
        "description": "Fiesta park launch"
    })
}

#[tokio::test]
async fn test_signup_login_and_me() {
    let app = TestApp::new();
    let signup = signup_body();

    let (status, body) = app.post("/auth/signup/password", signup.clone(), None).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["role"], "PASSENGER");
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = app
        .post(
            "/auth/login/password",
            json!({ "email": signup["email"], "password": signup["password"] }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], signup["email"]);
    assert!(me["pilot"].is_null());
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = TestApp::new();
    let first = signup_body();
    let (status, _) = app.post("/auth/signup/password", first.clone(), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut same_email = signup_body();
    same_email["email"] = first["email"].clone();
    let (status, _) = app.post("/auth/signup/password", same_email, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut same_phone = signup_body();
    same_phone["phoneNumber"] = first["phoneNumber"].clone();
    let (status, body) = app.post("/auth/signup/password", same_phone, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User with this email or phone number already exists");
}

#[tokio::test]
async fn test_bad_credentials_and_tokens() {
    let app = TestApp::new();
    let signup = signup_body();
    app.post("/auth/signup/password", signup.clone(), None).await;

    let (status, body) = app
        .post(
            "/auth/login/password",
            json!({ "email": signup["email"], "password": "wrong-password" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, _) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/auth/me", Some("not.a.token")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unapproved_pilot_cannot_create_flights() {
    let app = TestApp::new();
    let (_, token) = app.pending_pilot().await;

    let (status, body) = app.post("/pilots/flights", flight_body(), Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Pilot is not approved to create flights");

    let (_, flights) = app.get("/flights", None).await;
    assert_eq!(flights.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_passenger_cannot_use_pilot_routes() {
    let app = TestApp::new();
    let (_, token) = app.signup_passenger().await;

    let (status, body) = app.post("/pilots/flights", flight_body(), Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Pilot access required");
}

#[tokio::test]
async fn test_approved_pilot_creates_and_lists_flights() {
    let app = TestApp::new();
    let (pilot_id, token) = app.approved_pilot().await;

    let (status, flight) = app.post("/pilots/flights", flight_body(), Some(&token)).await;
    assert_eq!(status, StatusCode::CREATED, "{flight}");
    assert_eq!(flight["pilotId"], pilot_id.to_string());
    assert_eq!(flight["pricePerSeatCents"], 24_999);
    assert_eq!(flight["seatsRemaining"], 6);
    assert_eq!(flight["status"], "UPCOMING");

    let (status, mine) = app.get("/pilots/flights", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (_, pilots) = app.get("/pilots", None).await;
    assert_eq!(pilots[0]["pilotId"], pilot_id.to_string());

    let (status, body) = app.post("/pilots/flights", json!({ "totalSeats": 99 }), Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["fieldErrors"]["totalSeats"].is_array());
}

#[tokio::test]
async fn test_pilot_stripe_onboarding() {
    let app = TestApp::new();
    let (_, token) = app.approved_pilot().await;

    let (status, body) = app.get("/pilots/stripe-status", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], false);
    assert_eq!(body["status"], "NOT_CONNECTED");

    let (status, body) = app.post("/pilots/connect-stripe", json!({}), Some(&token)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["accountId"].as_str().unwrap().starts_with("acct_dummy_"));
    assert_eq!(body["status"], "PENDING");

    let (status, body) = app.get("/pilots/stripe-status", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], true);
}

#[tokio::test]
async fn test_notify_only_own_flights() {
    let app = TestApp::new();
    let (_, token) = app.approved_pilot().await;
    let (_, flight) = app.post("/pilots/flights", flight_body(), Some(&token)).await;
    let flight_id = flight["flightId"].as_str().unwrap().to_string();

    let (passenger_id, _) = app.signup_passenger().await;
    let (status, _) = app
        .post("/bookings", common::booking_body(flight_id.parse().unwrap(), passenger_id, 1), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(&format!("/pilots/flights/{}/notify", flight_id), json!({ "message": "Winds look good" }), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!({ "sent": true, "count": 1 }));

    let other = app.seed_flight(3, 10_000).await;
    let (status, _) = app
        .post(&format!("/pilots/flights/{}/notify", other.flight_id), json!({}), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_requires_valid_secret() {
    let app = TestApp::new();
    let (pilot_id, _) = app.pending_pilot().await;
    let admin = app.admin_token().await;
    let path = format!("/admin/pilots/{}/approve", pilot_id);

    let (status, _) = app.admin_post(&path, json!({}), &admin, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.admin_post(&path, json!({}), &admin, Some("wrong-secret")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid admin secret");

    let (_, passenger_token) = app.signup_passenger().await;
    let (status, _) = app.admin_post(&path, json!({}), &passenger_token, Some(ADMIN_SECRET)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut config = test_config();
    config.auth.admin_secret = None;
    let unconfigured = TestApp::build(config, Arc::new(DevGateway));
    let admin = unconfigured.admin_token().await;
    let (status, body) = unconfigured.admin_post(&path, json!({}), &admin, Some(ADMIN_SECRET)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Admin authentication not configured");
}

#[tokio::test]
async fn test_admin_transitions_are_audited() {
    let app = TestApp::new();
    let (pilot_id, _) = app.pending_pilot().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .admin_post(
            &format!("/admin/pilots/{}/approve", pilot_id),
            json!({ "notes": "Commercial certificate on file" }),
            &admin,
            Some(ADMIN_SECRET),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Pilot approved successfully");
    assert_eq!(body["pilot"]["status"], "APPROVED");

    let (status, _) = app
        .admin_post(&format!("/admin/pilots/{}/approve", pilot_id), json!({}), &admin, Some(ADMIN_SECRET))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .admin_post(
            &format!("/admin/pilots/{}/suspend", pilot_id),
            json!({ "reason": "Lapsed medical" }),
            &admin,
            Some(ADMIN_SECRET),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Pilot suspended successfully");

    let (status, _) = app
        .admin_post(
            &format!("/admin/pilots/{}/reject", uuid::Uuid::new_v4()),
            json!({}),
            &admin,
            Some(ADMIN_SECRET),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let actions = app.state.admin.list_actions(0, 10).await.unwrap();
    assert_eq!(actions.len(), 2);
    let suspended = actions
        .iter()
        .map(|a| serde_json::to_value(a).unwrap())
        .find(|a| a["actionType"] == "PILOT_SUSPENDED")
        .unwrap();
    assert_eq!(suspended["actionType"], "PILOT_SUSPENDED");
    assert_eq!(suspended["details"]["reason"], "Lapsed medical");
    assert!(suspended["details"]["pilotEmail"].is_string());
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = TestApp::new();
    let (status, body) = app.get("/no/such/route", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not Found" }));

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_subscribe_is_idempotent() {
    let app = TestApp::new();
    let body = json!({ "email": "fiesta@example.com", "zipCode": "87107" });

    let (status, first) = app.post("/notifications/subscribe", body.clone(), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first, json!({ "ok": true }));

    let (status, second) = app.post("/notifications/subscribe", body, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["alreadySubscribed"], true);

    let (status, _) = app.post("/notifications/subscribe", json!({ "zipCode": "87107" }), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_limit_counts_only_failed_attempts() {
    let mut config = test_config();
    config.rate_limit.auth_max = 2;
    let app = TestApp::build(config, Arc::new(DevGateway));

    for _ in 0..4 {
        let (status, body) = app.post("/auth/signup/password", signup_body(), None).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let wrong = json!({ "email": "nobody@example.com", "password": "not-the-password" });
    for _ in 0..2 {
        let (status, _) = app.post("/auth/login/password", wrong.clone(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = app.post("/auth/login/password", wrong, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many authentication attempts, please try again later.");

    let (status, _) = app.post("/auth/signup/password", signup_body(), None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = app.get("/flights", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_global_limit_is_per_client() {
    let mut config = test_config();
    config.rate_limit.global_max = Some(3);
    let app = TestApp::build(config, Arc::new(DevGateway));

    for _ in 0..3 {
        let (status, _) = app.get_from("/health", "203.0.113.7").await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app.get_from("/health", "203.0.113.7").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests, please try again later.");

    let (status, _) = app.get_from("/health", "203.0.113.8").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_upcoming_festivals_are_ordered_by_start() {
    let app = TestApp::new();
    let (status, body) = app.get("/festivals/upcoming", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let now = Utc::now();
    let festival = |name: &str, starts_in: i64, ends_in: i64| Festival {
        festival_id: uuid::Uuid::new_v4(),
        name: name.to_string(),
        location: "Albuquerque, NM".to_string(),
        start_date: now + Duration::days(starts_in),
        end_date: now + Duration::days(ends_in),
        description: None,
    };
    app.store.insert_festival(festival("Autumn Rally", 30, 32)).await;
    app.store.insert_festival(festival("Last Year", -370, -360)).await;
    app.store.insert_festival(festival("Fiesta", -2, 1)).await;
    app.store.insert_festival(festival("Spring Glow", 5, 6)).await;

    let (status, body) = app.get("/festivals/upcoming", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Fiesta", "Spring Glow", "Autumn Rally"]);
    assert!(body[0]["startDate"].is_string());
    assert!(body[0]["endDate"].is_string());
}

#[tokio::test]
async fn test_feature_flags_are_listed() {
    let app = TestApp::new();
    let (status, body) = app.get("/health/flags", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let flag = |key: &str, enabled: bool| FeatureFlag {
        key: key.to_string(),
        enabled,
        description: None,
    };
    app.store.set_feature_flag(flag("sms_notifications", false)).await;
    app.store.set_feature_flag(flag("festival_banner", true)).await;
    app.store.set_feature_flag(flag("sms_notifications", true)).await;

    let (status, body) = app.get("/health/flags", None).await;
    assert_eq!(status, StatusCode::OK);
    let flags = body.as_array().unwrap();
    assert_eq!(flags.len(), 2);
    assert_eq!(flags[0]["key"], "festival_banner");
    assert_eq!(flags[1]["key"], "sms_notifications");
    assert_eq!(flags[1]["enabled"], true);
}

#[tokio::test]
async fn test_overlong_email_is_a_field_error() {
    let app = TestApp::new();
    let mut body = signup_body();
    body["email"] = json!(format!("pat@{}com", format!("{}.", "a".repeat(60)).repeat(5)));

    let (status, body) = app.post("/auth/signup/password", body, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["fieldErrors"]["email"].is_array(), "{body}");
}
