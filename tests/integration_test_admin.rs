mod common;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use common::{date, parse_body, TestApp};
use karaoke_booking::domain::models::payment::PaymentStatus;
use serde_json::json;

fn customer() -> serde_json::Value {
    json!({ "firstName": "Walk", "lastName": "In", "email": "Walk.In@Example.com", "phone": "" })
}

#[tokio::test]
async fn test_admin_routes_require_admin_claim() {
    let app = TestApp::new().await;

    let res = app.admin_get(None, "/api/v1/admin/bookings?date=2025-11-18").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(parse_body(res).await["code"], "permission_denied");

    let staff = app.admin_token("staff-7", false);
    let res = app.admin_get(Some(&staff), "/api/v1/admin/bookings?date=2025-11-18").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.admin_get(Some("not-a-jwt"), "/api/v1/admin/availability?date=2025-11-18").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Rejected before the body is even looked at
    let res = app.admin_post(&staff, "/api/v1/admin/bookings", json!({})).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_upsert_creates_then_moves_booking() {
    let app = TestApp::new().await;
    let token = app.admin_token("manager-1", true);

    let res = app.admin_post(&token, "/api/v1/admin/bookings", json!({
        "roomId": "large",
        "date": "2025-11-18",
        "startTime": "21:00",
        "duration": 2,
        "partySize": 12,
        "customerInfo": customer()
    })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let created = parse_body(res).await;
    let booking_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "confirmed");
    assert_eq!(created["paymentStatus"], "not_required");
    assert_eq!(created["totalCost"], app.quote("large", 12, 2));
    assert_eq!(created["depositAmount"], 0);
    assert!(created["paymentReference"].is_null());
    assert_eq!(created["customer"]["email"], "walk.in@example.com");

    // Same booking, new slot and a manual price
    let res = app.admin_post(&token, "/api/v1/admin/bookings", json!({
        "bookingId": booking_id,
        "roomId": "medium",
        "date": "2025-11-19",
        "startTime": "20:00",
        "duration": 1,
        "partySize": 8,
        "totalCost": 5000,
        "customerInfo": customer()
    })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let moved = parse_body(res).await;
    assert_eq!(moved["id"], booking_id.as_str());
    assert_eq!(moved["roomId"], "medium");
    assert_eq!(moved["roomName"], "Medium");
    assert_eq!(moved["totalCost"], 5000);
    assert_eq!(moved["remainingBalance"], 5000);

    let res = app.admin_post(&token, "/api/v1/admin/bookings", json!({
        "bookingId": "missing",
        "roomId": "medium",
        "date": "2025-11-19",
        "startTime": "20:00",
        "duration": 1,
        "partySize": 8,
        "customerInfo": customer()
    })).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_cancel_ignores_notice_window_and_is_idempotent() {
    let app = TestApp::new().await;
    let token = app.admin_token("manager-1", true);
    let booking_id = app.seed_booking("small", date(2025, 11, 18), "20:00", "21:00", "a@example.com").await;

    // One hour before start
    app.clock.set(Utc.with_ymd_and_hms(2025, 11, 18, 19, 0, 0).unwrap());

    let uri = format!("/api/v1/admin/bookings/{}/cancel", booking_id);
    let res = app.admin_post(&token, &uri, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancelledBy"], "admin:manager-1");
    assert!(body["cancelledAt"].is_string());

    let res = app.admin_post(&token, &uri, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(parse_body(res).await["cancelledBy"], "admin:manager-1");
}

#[tokio::test]
async fn test_admin_rebook_may_override_price() {
    let app = TestApp::new().await;
    let token = app.admin_token("manager-1", true);
    let booking_id = app.seed_booking("small", date(2025, 11, 18), "20:00", "21:00", "a@example.com").await;

    let res = app.admin_post(&token, &format!("/api/v1/admin/bookings/{}/rebook", booking_id), json!({
        "newDate": "2025-11-18",
        "newStartTime": "22:00",
        "newDuration": 2,
        "totalCost": 0
    })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["startTime"], "22:00");
    assert_eq!(body["endTime"], "00:00");
    assert_eq!(body["totalCost"], 0);

    let res = app.admin_post(&token, &format!("/api/v1/admin/bookings/{}/rebook", booking_id), json!({
        "newDate": "2025-11-18",
        "newStartTime": "22:00",
        "newDuration": 2,
        "totalCost": -5
    })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_capture_settles_deposit() {
    let app = TestApp::new().await;
    let token = app.admin_token("manager-1", true);

    let res = app.post_json("/api/v1/bookings", json!({
        "roomId": "small",
        "date": "2025-11-18",
        "startTime": "20:00",
        "duration": 1,
        "partySize": 2,
        "totalCost": app.quote("small", 2, 1),
        "depositAmount": 1500,
        "customerInfo": customer()
    })).await;
    let created = parse_body(res).await;
    let booking_id = created["bookingId"].as_str().unwrap();
    let reference = created["clientSecret"].as_str().unwrap().trim_end_matches("_secret").to_string();
    app.payments.set_status(&reference, PaymentStatus::RequiresCapture);

    let res = app.admin_post(&token, &format!("/api/v1/admin/bookings/{}/capture", booking_id), json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["paymentStatus"], "succeeded");
    assert_eq!(body["paymentReference"], reference.as_str());

    // Nothing to capture on an unpaid booking
    let unpaid = app.seed_booking("small", date(2025, 11, 18), "22:00", "23:00", "b@example.com").await;
    let res = app.admin_post(&token, &format!("/api/v1/admin/bookings/{}/capture", unpaid), json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_day_views() {
    let app = TestApp::new().await;
    let token = app.admin_token("manager-1", true);
    let tuesday = date(2025, 11, 18);

    let late = app.seed_booking("small", tuesday, "00:30", "01:30", "late@example.com").await;
    let early = app.seed_booking("party", tuesday, "18:00", "20:00", "early@example.com").await;
    let middle = app.seed_booking("medium", tuesday, "22:00", "23:00", "mid@example.com").await;

    let res = app.admin_get(Some(&token), "/api/v1/admin/bookings?date=2025-11-18").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    let order: Vec<&str> = body["bookings"].as_array().unwrap().iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec![early.as_str(), middle.as_str(), late.as_str()]);

    let res = app.admin_get(Some(&token), "/api/v1/admin/availability?date=2025-11-18").await;
    assert_eq!(res.status(), StatusCode::OK);
    let grid = parse_body(res).await;
    assert_eq!(grid["open"], true);

    let party = grid["rooms"].as_array().unwrap().iter()
        .find(|r| r["roomId"] == "party")
        .unwrap()
        .clone();
    let remaining = |start: &str| {
        party["slots"].as_array().unwrap().iter()
            .find(|s| s["startTime"] == start)
            .map(|s| s["remainingUnits"].as_u64().unwrap())
    };
    assert_eq!(remaining("18:00"), Some(0));
    assert_eq!(remaining("19:30"), Some(0));
    assert_eq!(remaining("20:00"), Some(1));
    assert_eq!(remaining("01:00"), Some(1));
    assert_eq!(remaining("01:30"), None);
}
