use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::{Datelike, Duration, Utc};
use fieldserv_api::middleware::auth::{AdminClaims, CustomerClaims};
use fieldserv_api::state::AuthConfig;
use fieldserv_api::{app, AppState};
use fieldserv_core::artifacts::InMemoryCompletionStore;
use fieldserv_core::notify::MockNotificationSender;
use fieldserv_core::payment::MockPaymentGateway;
use fieldserv_order::{EngineConfig, SchedulingCoordinator};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

fn test_state() -> AppState {
    let coordinator = Arc::new(SchedulingCoordinator::new(
        EngineConfig::default(),
        Arc::new(MockPaymentGateway),
        Arc::new(MockNotificationSender::default()),
        Arc::new(InMemoryCompletionStore::default()),
    ));
    AppState {
        coordinator,
        auth: AuthConfig {
            secret: SECRET.to_string(),
            expiration: 3600,
        },
    }
}

fn customer_token(sub: &str) -> String {
    let claims = CustomerClaims {
        sub: sub.to_string(),
        role: "GUEST".to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn admin_token() -> String {
    let claims = AdminClaims {
        sub: "admin-1".to_string(),
        role: "ADMIN".to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn booking_payload(date: &str, time: &str) -> Value {
    json!({
        "service_type": "MAINTENANCE",
        "location_address": "台北市中山區南京東路100號",
        "unit_count": 2,
        "notes": null,
        "preferred_date": date,
        "preferred_time": time,
        "contact_name": "王小明",
        "contact_phone": "0912345678",
    })
}

fn upcoming_date() -> String {
    (Utc::now().date_naive() + Duration::days(7)).to_string()
}

#[tokio::test]
async fn guest_login_returns_token() {
    let app = app(test_state());
    let response = app
        .oneshot(request("POST", "/v1/auth/guest", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn order_routes_require_a_token() {
    let app = app(test_state());
    let response = app
        .oneshot(request(
            "POST",
            "/v1/orders",
            None,
            Some(booking_payload(&upcoming_date(), "09:00:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_customer_tokens() {
    let app = app(test_state());
    let token = customer_token("guest-a");
    let response = app
        .oneshot(request("GET", "/v1/admin/orders", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn calendar_is_public_and_lists_every_day() {
    let app = app(test_state());
    let next_month = Utc::now().date_naive() + Duration::days(32);
    let uri = format!(
        "/v1/calendar/MAINTENANCE/{}/{}",
        next_month.year(),
        next_month.month()
    );
    let response = app.oneshot(request("GET", &uri, None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let days = json_body(response).await;
    let days = days.as_array().unwrap();
    assert!(days.len() >= 28);
    assert!(days[0]["date"].is_string());
}

#[tokio::test]
async fn off_grid_capacity_query_is_rejected() {
    let app = app(test_state());
    let uri = format!(
        "/v1/capacity/check?date={}&time=09:30:00&service_type=MAINTENANCE&unit_count=1",
        upcoming_date()
    );
    let response = app.oneshot(request("GET", &uri, None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_flow_over_http() {
    let app = app(test_state());
    let customer = customer_token("guest-flow");
    let admin = admin_token();
    let date = upcoming_date();

    // Create the order
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/orders",
            Some(&customer),
            Some(booking_payload(&date, "09:00:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = json_body(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"], 3000);
    assert!(order["order_number"].as_str().unwrap().starts_with("FS"));

    // Open a checkout session
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/orders/{order_id}/checkout"),
            Some(&customer),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = json_body(response).await;
    assert_eq!(session["amount"], 3000);

    // Provider confirms payment via webhook
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/webhooks/payments",
            None,
            Some(json!({"event_type": "payment_confirmed", "order_id": order_id})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Admin schedules the preferred slot
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/admin/orders/{order_id}/schedule"),
            Some(&admin),
            Some(json!({"date": date, "time": "09:00:00"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = json_body(response).await;
    assert_eq!(outcome["order"]["status"], "scheduled");
    assert_eq!(outcome["email_sent"], true);
    assert_eq!(outcome["order"]["schedule"]["estimated_end_time"], "11:00:00");

    // Upload the completion report and close out
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/admin/orders/{order_id}/completion-report"),
            Some(&admin),
            Some(json!({"filename": "report.pdf", "content": "signed off"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/admin/orders/{order_id}/complete"),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let completed = json_body(response).await;
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["total_amount"], 3000);
}

#[tokio::test]
async fn cancellation_flow_over_http() {
    let app = app(test_state());
    let customer = customer_token("guest-cancel");
    let date = upcoming_date();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/orders",
            Some(&customer),
            Some(booking_payload(&date, "10:00:00")),
        ))
        .await
        .unwrap();
    let order = json_body(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    app.clone()
        .oneshot(request(
            "POST",
            "/v1/webhooks/payments",
            None,
            Some(json!({"event_type": "payment_confirmed", "order_id": order_id})),
        ))
        .await
        .unwrap();

    // Customer asks to cancel, order parks in precancel
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/orders/{order_id}/cancel"),
            Some(&customer),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = json_body(response).await;
    assert_eq!(order["status"], "precancel");
    assert_eq!(order["payment_status"], "paid");

    // Provider confirms the refund, order reaches terminal cancelled
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/webhooks/payments",
            None,
            Some(json!({
                "event_type": "refund_confirmed",
                "order_id": order_id,
                "operator": "admin-1",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let admin = admin_token();
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/admin/orders/{order_id}"),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    let order = json_body(response).await;
    assert_eq!(order["status"], "cancelled");
    assert_eq!(order["payment_status"], "refunded");
}

#[tokio::test]
async fn customers_cannot_see_each_others_orders() {
    let app = app(test_state());
    let owner = customer_token("guest-owner");
    let stranger = customer_token("guest-stranger");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/orders",
            Some(&owner),
            Some(booking_payload(&upcoming_date(), "11:00:00")),
        ))
        .await
        .unwrap();
    let order = json_body(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/orders/{order_id}"),
            Some(&stranger),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/orders/{order_id}"),
            Some(&owner),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn overbooked_slot_returns_conflict() {
    let app = app(test_state());
    let customer = customer_token("guest-conflict");
    let date = upcoming_date();

    // Saturate the roster: three maintenance orders of 8 units each occupy
    // all three workers from 08:00 for five hours.
    for _ in 0..3 {
        let mut payload = booking_payload(&date, "08:00:00");
        payload["unit_count"] = json!(8);
        let response = app
            .clone()
            .oneshot(request("POST", "/v1/orders", Some(&customer), Some(payload)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/orders",
            Some(&customer),
            Some(booking_payload(&date, "09:00:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
