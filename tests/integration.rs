use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hyperlocal_delivery::api::rest::router;
use hyperlocal_delivery::config::Settings;
use hyperlocal_delivery::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(Settings::default(), 1024)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_radius_zone(app: &axum::Router) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/delivery/zones",
            json!({
                "name": "Gulberg",
                "geometry": {
                    "type": "radius",
                    "center": [74.3, 31.5],
                    "radius_km": 5.0
                },
                "fees": { "base_fee": 40.0, "free_delivery_threshold": 500.0 },
                "schedule": [
                    {
                        "weekday": "Mon",
                        "slots": [
                            { "start": "09:00:00", "end": "11:00:00", "max_orders": 10, "current_orders": 4 },
                            { "start": "11:00:00", "end": "13:00:00", "max_orders": 10, "current_orders": 10 }
                        ]
                    }
                ],
                "express_delivery": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn create_partner(app: &axum::Router, name: &str, max_active: usize) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/partners",
            json!({
                "name": name,
                "vehicle": "Motorbike",
                "location": [74.3, 31.5],
                "max_active_deliveries": max_active
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn create_delivery(app: &axum::Router) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/delivery/create",
            json!({
                "order_id": Uuid::new_v4(),
                "pickup": [74.3, 31.5],
                "dropoff": [74.35, 31.55]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn set_status(
    app: &axum::Router,
    delivery_id: &str,
    partner_id: &str,
    status: &str,
    extra: Value,
) -> axum::response::Response {
    let mut body = json!({ "partner_id": partner_id, "status": status });
    if let (Some(map), Some(extra_map)) = (body.as_object_mut(), extra.as_object()) {
        for (key, value) in extra_map {
            map.insert(key.clone(), value.clone());
        }
    }
    app.clone()
        .oneshot(json_request(
            "PUT",
            &format!("/delivery/status/{delivery_id}"),
            body,
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["zones"], 0);
    assert_eq!(body["partners"], 0);
    assert_eq!(body["deliveries"], 0);
    assert_eq!(body["routes"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("active_deliveries"));
}

#[tokio::test]
async fn availability_inside_and_outside_radius() {
    let app = setup();
    create_radius_zone(&app).await;

    // ~3 km from the zone center
    let response = app
        .clone()
        .oneshot(get_request("/delivery/check-availability?lat=31.527&lng=74.3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["available"], true);
    assert_eq!(body["zone"]["name"], "Gulberg");

    // ~40 km from the zone center
    let response = app
        .clone()
        .oneshot(get_request("/delivery/check-availability?lat=31.86&lng=74.3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["available"], false);
    assert!(body.get("zone").is_none());
}

#[tokio::test]
async fn availability_requires_point_or_pincode() {
    let app = setup();
    let response = app
        .oneshot(get_request("/delivery/check-availability?lat=31.5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pincode_zone_answers_pincode_queries() {
    let app = setup();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/delivery/zones",
            json!({
                "name": "Old City",
                "geometry": { "type": "pincodes", "codes": ["54000", "54600"] },
                "fees": { "base_fee": 30.0, "free_delivery_threshold": null }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/delivery/check-availability?pincode=54600"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["available"], true);

    let response = app
        .oneshot(get_request("/delivery/check-availability?pincode=75000"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["available"], false);
}

#[tokio::test]
async fn slots_filter_full_windows_and_report_remaining() {
    let app = setup();
    let zone = create_radius_zone(&app).await;
    let zone_id = zone["id"].as_str().unwrap();

    // 2026-08-24 is a Monday
    let response = app
        .clone()
        .oneshot(get_request(&format!(
            "/delivery/zones/{zone_id}/slots?date=2026-08-24"
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let slots = body.as_array().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0]["remaining"], 6);

    // no schedule configured for Tuesday
    let response = app
        .oneshot(get_request(&format!(
            "/delivery/zones/{zone_id}/slots?date=2026-08-25"
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn zone_with_degenerate_polygon_is_rejected() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/delivery/zones",
            json!({
                "name": "Broken",
                "geometry": { "type": "polygon", "ring": [[74.3, 31.5], [74.4, 31.5]] },
                "fees": { "base_fee": 30.0, "free_delivery_threshold": null }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_partner_empty_name_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/partners",
            json!({
                "name": "  ",
                "vehicle": "Car",
                "location": [74.3, 31.5]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn partner_cannot_be_set_busy_directly() {
    let app = setup();
    let partner = create_partner(&app, "Asif", 3).await;
    let id = partner["id"].as_str().unwrap();

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/partners/{id}/status"),
            json!({ "status": "Busy" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delivery_is_created_pending_with_four_digit_otp() {
    let app = setup();
    let delivery = create_delivery(&app).await;

    assert_eq!(delivery["status"], "pending");
    assert!(delivery["partner"].is_null());
    assert_eq!(delivery["delivery_attempts"], 0);

    let otp = delivery["otp"].as_str().unwrap();
    assert_eq!(otp.len(), 4);
    assert!(otp.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn assignment_over_capacity_returns_conflict() {
    let app = setup();
    let partner = create_partner(&app, "Bilal", 1).await;
    let partner_id = partner["id"].as_str().unwrap().to_string();

    let first = create_delivery(&app).await;
    let second = create_delivery(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/delivery/{}/assign", first["id"].as_str().unwrap()),
            json!({ "partner_id": partner_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "assigned");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/delivery/{}/assign", second["id"].as_str().unwrap()),
            json!({ "partner_id": partner_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.oneshot(get_request("/partners")).await.unwrap();
    let partners = body_json(response).await;
    let partner = &partners.as_array().unwrap()[0];
    assert_eq!(partner["active_deliveries"].as_array().unwrap().len(), 1);
    assert_eq!(partner["status"], "Busy");
}

#[tokio::test]
async fn status_update_from_unassigned_partner_is_forbidden() {
    let app = setup();
    let partner = create_partner(&app, "Noor", 3).await;
    let partner_id = partner["id"].as_str().unwrap().to_string();
    let stranger = create_partner(&app, "Omar", 3).await;
    let stranger_id = stranger["id"].as_str().unwrap().to_string();

    let delivery = create_delivery(&app).await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/delivery/{delivery_id}/assign"),
            json!({ "partner_id": partner_id }),
        ))
        .await
        .unwrap();

    let response = set_status(&app, &delivery_id, &stranger_id, "picking_up", json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn full_delivery_lifecycle() {
    let app = setup();
    let partner = create_partner(&app, "Hamza", 3).await;
    let partner_id = partner["id"].as_str().unwrap().to_string();

    let delivery = create_delivery(&app).await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();
    let otp = delivery["otp"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/delivery/{delivery_id}/assign"),
            json!({ "partner_id": partner_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for status in ["picking_up", "picked_up", "on_the_way"] {
        let response = set_status(&app, &delivery_id, &partner_id, status, json!({})).await;
        assert_eq!(response.status(), StatusCode::OK, "transition to {status}");
    }

    // location ping while en route appends history and computes an ETA
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/delivery/partner/location",
            json!({ "partner_id": partner_id, "location": [74.32, 31.52] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/delivery/{delivery_id}")))
        .await
        .unwrap();
    let tracked = body_json(response).await;
    assert_eq!(tracked["location_history"].as_array().unwrap().len(), 1);
    assert!(!tracked["eta"].is_null());

    for status in ["nearby", "arrived"] {
        let response = set_status(&app, &delivery_id, &partner_id, status, json!({})).await;
        assert_eq!(response.status(), StatusCode::OK, "transition to {status}");
    }

    // wrong OTP is a plain negative result
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/delivery/verify-otp/{delivery_id}"),
            json!({ "code": "no" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["verified"], false);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/delivery/verify-otp/{delivery_id}"),
            json!({ "code": otp }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["verified"], true);

    // delivered requires proof in the same call
    let response = set_status(&app, &delivery_id, &partner_id, "delivered", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = set_status(
        &app,
        &delivery_id,
        &partner_id,
        "delivered",
        json!({ "proof_of_delivery": { "receiver_name": "Sana", "signature": null, "photo_url": null } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "delivered");
    assert!(!body["delivered_at"].is_null());

    // partner freed up again
    let response = app.clone().oneshot(get_request("/partners")).await.unwrap();
    let partners = body_json(response).await;
    let partner = &partners.as_array().unwrap()[0];
    assert_eq!(partner["active_deliveries"].as_array().unwrap().len(), 0);

    // rating only works after delivery
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/partners/{partner_id}/rate"),
            json!({ "delivery_id": delivery_id, "score": 5.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["rating"], 5.0);
    assert_eq!(body["rating_count"], 1);
}

#[tokio::test]
async fn skipping_states_is_rejected_with_conflict() {
    let app = setup();
    let partner = create_partner(&app, "Zain", 3).await;
    let partner_id = partner["id"].as_str().unwrap().to_string();

    let delivery = create_delivery(&app).await;
    let delivery_id = delivery["id"].as_str().unwrap().to_string();

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/delivery/{delivery_id}/assign"),
            json!({ "partner_id": partner_id }),
        ))
        .await
        .unwrap();

    let response = set_status(
        &app,
        &delivery_id,
        &partner_id,
        "delivered",
        json!({ "proof_of_delivery": { "receiver_name": "x", "signature": null, "photo_url": null } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(get_request(&format!("/delivery/{delivery_id}")))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "assigned");
}

#[tokio::test]
async fn chat_messages_append_without_status_changes() {
    let app = setup();
    let delivery = create_delivery(&app).await;
    let delivery_id = delivery["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/delivery/{delivery_id}/chat"),
            json!({ "sender": "customer", "text": "please ring the bell" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request(&format!("/delivery/{delivery_id}")))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["chat"].as_array().unwrap().len(), 1);
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn route_flow_from_creation_to_performance() {
    let app = setup();
    let driver = create_partner(&app, "Driver Dara", 3).await;
    let driver_id = driver["id"].as_str().unwrap().to_string();

    let order_a = Uuid::new_v4();
    let order_b = Uuid::new_v4();
    let order_c = Uuid::new_v4();

    // A(0,0), B(0,1), C(10,10): nearest-neighbor order is A, B, C
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/route/create",
            json!({
                "warehouse": [0.0, 0.0],
                "delivery_date": "2026-08-27",
                "orders": [
                    { "order_id": order_a, "destination": [0.0, 0.0], "priority": "normal", "time_window": null },
                    { "order_id": order_c, "destination": [10.0, 10.0], "priority": "normal", "time_window": null },
                    { "order_id": order_b, "destination": [1.0, 0.0], "priority": "high", "time_window": null }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let route = body_json(response).await;
    let route_id = route["id"].as_str().unwrap().to_string();

    let visit_order: Vec<String> = route["waypoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["order_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        visit_order,
        vec![
            order_a.to_string(),
            order_b.to_string(),
            order_c.to_string()
        ]
    );
    assert_eq!(route["status"], "planned");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/route/{route_id}/assign-driver"),
            json!({ "driver_id": driver_id, "vehicle": "van-2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "active");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/route/{route_id}/delivery-status"),
            json!({ "driver_id": driver_id, "order_id": order_a, "status": "delivered" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // only the assigned driver may complete the route
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/route/{route_id}/complete"),
            json!({ "driver_id": Uuid::new_v4() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/route/{route_id}/complete"),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let performance = body_json(response).await;
    assert_eq!(performance["total_stops"], 3);
    assert_eq!(performance["delivered"], 1);
    assert_eq!(performance["on_time"], 1);
}

#[tokio::test]
async fn reroute_disruption_reorders_only_pending_stops() {
    let app = setup();
    let driver = create_partner(&app, "Driver Rafi", 3).await;
    let driver_id = driver["id"].as_str().unwrap().to_string();

    let orders: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    let order_bodies: Vec<Value> = orders
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "order_id": id,
                "destination": [i as f64, 0.0],
                "priority": "normal",
                "time_window": null
            })
        })
        .collect();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/route/create",
            json!({
                "warehouse": [0.0, 0.0],
                "delivery_date": "2026-08-27",
                "orders": order_bodies
            }),
        ))
        .await
        .unwrap();
    let route = body_json(response).await;
    let route_id = route["id"].as_str().unwrap().to_string();

    app.clone()
        .oneshot(json_request(
            "PUT",
            &format!("/route/{route_id}/assign-driver"),
            json!({ "driver_id": driver_id, "vehicle": null }),
        ))
        .await
        .unwrap();

    for order_id in &orders[..2] {
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/route/{route_id}/delivery-status"),
                json!({ "driver_id": driver_id, "order_id": order_id, "status": "delivered" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/route/{route_id}/update"),
            json!({ "type": "reroute", "new_eta": null, "note": "road closed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rerouted = body_json(response).await;

    let waypoints = rerouted["waypoints"].as_array().unwrap();
    let completed: Vec<(String, u64)> = waypoints
        .iter()
        .filter(|w| w["completed"] == true)
        .map(|w| {
            (
                w["order_id"].as_str().unwrap().to_string(),
                w["sequence"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        completed,
        vec![(orders[0].to_string(), 1), (orders[1].to_string(), 2)]
    );

    let mut sequences: Vec<u64> = waypoints
        .iter()
        .map(|w| w["sequence"].as_u64().unwrap())
        .collect();
    sequences.sort_unstable();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);

    assert_eq!(rerouted["events"].as_array().unwrap().len(), 1);
}
