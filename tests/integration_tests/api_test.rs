//! HTTP API tests
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use termin::api::{BookingServer, USER_HEADER};
use termin::config::Config;
use termin::models::{AssignmentMode, BookingMode};

use crate::common::{harness, solo_profile, staff, team_profile, Harness};

fn router(h: &Harness) -> Router {
    BookingServer::with_service(Config::default(), h.service.clone()).build_router()
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn calendar() -> Harness {
    harness(
        solo_profile("salon", BookingMode::Calendar, "09:00", "17:00"),
        Vec::new(),
    )
}

#[tokio::test]
async fn test_health() {
    let h = calendar();
    let (status, body) = send(&router(&h), "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_availability_endpoint() {
    let h = calendar();
    let (status, body) = send(
        &router(&h),
        "GET",
        "/api/profiles/salon/availability?serviceId=cut&date=2024-03-04",
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["pollIntervalSecs"], 30);
    let slots = body["data"]["slots"].as_array().unwrap();
    assert_eq!(slots[0]["start"], "09:00");
    assert_eq!(slots[0]["end"], "09:45");
    assert_eq!(slots[0]["status"], "free");
    assert_eq!(slots.last().unwrap()["start"], "16:00");
}

#[tokio::test]
async fn test_availability_validation_and_not_found() {
    let h = calendar();
    let router = router(&h);

    let (status, body) = send(
        &router,
        "GET",
        "/api/profiles/salon/availability?serviceId=cut&date=04.03.2024",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = send(
        &router,
        "GET",
        "/api/profiles/nobody/availability?serviceId=cut&date=2024-03-04",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_conflict_and_status_flow() {
    let h = calendar();
    let router = router(&h);
    let payload = json!({
        "profileId": "salon",
        "serviceId": "cut",
        "date": "2024-03-04",
        "fromTime": "10:00"
    });

    let (status, _) = send(&router, "POST", "/api/reservations", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
        send(&router, "POST", "/api/reservations", Some("anna"), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["outcome"], "reserved");
    assert_eq!(body["data"]["reservation"]["status"], "oczekująca");
    assert_eq!(body["data"]["reservation"]["toTime"], "10:45");
    let id = body["data"]["reservation"]["id"].as_str().unwrap().to_string();

    let (status, body) =
        send(&router, "POST", "/api/reservations", Some("bart"), Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "slot_unavailable");

    let uri = format!("/api/reservations/{id}/status");
    let (status, _) = send(
        &router,
        "PATCH",
        &uri,
        Some("anna"),
        Some(json!({"status": "zaakceptowana"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &router,
        "PATCH",
        &uri,
        Some("salon-owner"),
        Some(json!({"status": "accepted"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "zaakceptowana");

    let (status, body) = send(
        &router,
        "PATCH",
        &uri,
        Some("salon-owner"),
        Some(json!({"status": "odrzucona"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "invalid_transition");

    let (status, _) = send(&router, "GET", &format!("/api/reservations/{id}"), Some("anna"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, "GET", &format!("/api/reservations/{id}"), Some("eve"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let h = calendar();
    let (status, body) = send(
        &router(&h),
        "POST",
        "/api/reservations",
        Some("anna"),
        Some(json!({"profileId": "salon", "fromTime": "ten"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_open_profile_inquiry_is_accepted() {
    let h = harness(
        solo_profile("studio", BookingMode::RequestOpen, "09:00", "17:00"),
        Vec::new(),
    );
    let (status, body) = send(
        &router(&h),
        "POST",
        "/api/reservations",
        Some("anna"),
        Some(json!({"profileId": "studio", "note": "Do you shoot weddings?"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["outcome"], "inquiryForwarded");
}

#[tokio::test]
async fn test_day_reservation_endpoints() {
    let h = harness(
        solo_profile("dj", BookingMode::RequestBlocking, "09:00", "17:00"),
        Vec::new(),
    );
    let router = router(&h);
    let payload = json!({"profileId": "dj", "date": "2024-03-04"});

    let (status, body) =
        send(&router, "POST", "/api/day-reservations", Some("anna"), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["dateOnly"], true);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) =
        send(&router, "POST", "/api/day-reservations", Some("anna"), Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "duplicate_request");

    send(
        &router,
        "PATCH",
        &format!("/api/reservations/{id}/status"),
        Some("dj-owner"),
        Some(json!({"status": "zaakceptowana"})),
    )
    .await;
    let (status, body) = send(&router, "GET", "/api/profiles/dj/unavailable-days", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!(["2024-03-04"]));
}

#[tokio::test]
async fn test_profile_and_staff_directory() {
    let h = harness(team_profile("salon", AssignmentMode::UserPick), Vec::new());
    let router = router(&h);
    let owner = Some("salon-owner");

    let member = serde_json::to_value(staff("anna", "salon", &["cut"], "09:00", "12:00")).unwrap();
    let (status, _) = send(&router, "PUT", "/api/profiles/salon/staff/anna", owner, Some(member.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, "PUT", "/api/profiles/salon/staff/bart", owner, Some(member)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&router, "GET", "/api/profiles/salon/staff", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &router,
        "GET",
        "/api/profiles/salon/availability?serviceId=cut&date=2024-03-04&staffId=anna",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slots"][0]["staffId"], "anna");

    let (status, _) = send(&router, "DELETE", "/api/profiles/salon/staff/anna", owner, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&router, "DELETE", "/api/profiles/salon/staff/anna", owner, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut profile = serde_json::to_value(team_profile("salon", AssignmentMode::AutoAssign)).unwrap();
    let (status, body) = send(&router, "PUT", "/api/profiles/salon", owner, Some(profile.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["team"]["assignmentMode"], "auto-assign");

    profile["id"] = json!("other");
    let (status, _) = send(&router, "PUT", "/api/profiles/salon", owner, Some(profile)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_directory_writes_are_owner_only() {
    let h = calendar();
    let router = router(&h);
    let booking = json!({
        "profileId": "salon",
        "serviceId": "cut",
        "date": "2024-03-04",
        "fromTime": "10:00"
    });
    let (_, body) = send(&router, "POST", "/api/reservations", Some("anna"), Some(booking)).await;
    let id = body["data"]["reservation"]["id"].as_str().unwrap().to_string();

    let mut hijacked = serde_json::to_value(solo_profile(
        "salon",
        BookingMode::Calendar,
        "09:00",
        "17:00",
    ))
    .unwrap();
    hijacked["ownerId"] = json!("mallory");

    let (status, _) = send(&router, "PUT", "/api/profiles/salon", None, Some(hijacked.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) =
        send(&router, "PUT", "/api/profiles/salon", Some("mallory"), Some(hijacked.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "permission");

    // The owner cannot hand the profile away either
    let (status, _) =
        send(&router, "PUT", "/api/profiles/salon", Some("salon-owner"), Some(hijacked)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        "PATCH",
        &format!("/api/reservations/{id}/status"),
        Some("mallory"),
        Some(json!({"status": "zaakceptowana"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let member = serde_json::to_value(staff("zoe", "salon", &["cut"], "09:00", "12:00")).unwrap();
    let (status, _) =
        send(&router, "PUT", "/api/profiles/salon/staff/zoe", Some("mallory"), Some(member.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&router, "PUT", "/api/profiles/salon/staff/zoe", None, Some(member)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&router, "DELETE", "/api/profiles/salon/staff/zoe", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(&router, "GET", "/api/profiles/salon", None, None).await;
    assert_eq!(body["data"]["ownerId"], "salon-owner");
}

#[tokio::test]
async fn test_oversized_service_duration_rejected() {
    let h = calendar();
    let mut profile =
        serde_json::to_value(solo_profile("salon", BookingMode::Calendar, "09:00", "17:00")).unwrap();
    profile["services"][0]["duration"] = json!({"value": 80_000_000, "unit": "hours"});

    let (status, body) =
        send(&router(&h), "PUT", "/api/profiles/salon", Some("salon-owner"), Some(profile)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_staff_filter_on_solo_profile_is_validation_error() {
    let h = calendar();
    let (status, body) = send(
        &router(&h),
        "GET",
        "/api/profiles/salon/availability?serviceId=cut&date=2024-03-04&staffId=anna",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let _ = termin::metrics::init_metrics();
    let h = calendar();
    let router = router(&h);
    send(&router, "GET", "/api/health", None, None).await;

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("termin_api_requests_total"));
}
