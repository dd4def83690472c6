//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cad_client::InMemoryCadSplitter;
use metrics_exporter_prometheus::PrometheusHandle;
use record_store::InMemoryRecordStore;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    cad: InMemoryCadSplitter,
}

fn setup() -> TestApp {
    let cad = InMemoryCadSplitter::new();
    let state = Arc::new(AppState::new(InMemoryRecordStore::new(), Arc::new(cad.clone())));
    TestApp {
        app: api::create_app(state, get_metrics_handle()),
        cad,
    }
}

#[derive(Clone)]
struct User {
    id: String,
    email: String,
    account_type: &'static str,
}

impl User {
    fn new(name: &str, account_type: &'static str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: format!("{name}@example.com"),
            account_type,
        }
    }

    fn creator() -> Self {
        Self::new("creator", "creator")
    }

    fn manufacturer(name: &str) -> Self {
        Self::new(name, "manufacturer")
    }
}

fn request(method: &str, uri: &str, user: Option<&User>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder
            .header("x-user-id", &user.id)
            .header("x-user-email", &user.email)
            .header("x-account-type", user.account_type);
    }
    builder
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn get(app: &axum::Router, uri: &str, user: &User) -> (StatusCode, Value) {
    send(app, request("GET", uri, Some(user)).body(Body::empty()).unwrap()).await
}

async fn post(app: &axum::Router, uri: &str, user: &User, body: Value) -> (StatusCode, Value) {
    send(
        app,
        request("POST", uri, Some(user))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn create_order(app: &axum::Router, creator: &User) -> String {
    let (status, json) = post(
        app,
        "/api/orders/drafts",
        creator,
        json!({
            "title": "Gearbox housing",
            "description": "Aluminium, anodised",
            "quantity": 20,
            "due_date": "2099-06-01",
            "tags": [1, 100]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["order"]["id"].as_str().unwrap().to_string()
}

fn offer_body(unit_cost: i64) -> Value {
    json!({
        "unit_cost": unit_cost,
        "projected_cost": unit_cost * 20,
        "projected_units": 20,
        "shipping_cost": 1500,
        "lead_time_days": 14
    })
}

async fn claimed_order(app: &axum::Router, creator: &User, maker: &User) -> String {
    let order_id = create_order(app, creator).await;
    let (_, offer) = post(app, &format!("/api/orders/{order_id}/offers"), maker, offer_body(900)).await;
    let offer_id = offer["offer"]["id"].as_str().unwrap().to_string();
    let (status, _) = post(app, &format!("/api/offers/{offer_id}/accept"), creator, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    order_id
}

#[tokio::test]
async fn test_health_check() {
    let TestApp { app, .. } = setup();

    let (status, json) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let TestApp { app, .. } = setup();

    let (status, json) = send(
        &app,
        request("GET", "/api/orders/unclaimed", None)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].as_str().unwrap().contains("x-user-id"));
}

#[tokio::test]
async fn test_create_and_get_order() {
    let TestApp { app, .. } = setup();
    let creator = User::creator();

    let order_id = create_order(&app, &creator).await;
    let (status, json) = get(&app, &format!("/api/orders/{order_id}"), &creator).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["title"], "Gearbox housing");
    assert_eq!(json["order"]["status"], "Order Created");
    assert_eq!(json["order"]["creator"]["email"], "creator@example.com");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let TestApp { app, .. } = setup();
    let creator = User::creator();

    let (status, json) = send(
        &app,
        request("POST", "/api/orders/drafts", Some(&creator))
            .header("content-type", "application/json")
            .body(Body::from("{\"title\": "))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_validation_and_role_errors() {
    let TestApp { app, .. } = setup();
    let creator = User::creator();
    let maker = User::manufacturer("maker");

    let (status, json) = post(
        &app,
        "/api/orders/drafts",
        &creator,
        json!({ "title": "  ", "quantity": 1, "due_date": "2099-01-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, _) = post(
        &app,
        "/api/orders/drafts",
        &maker,
        json!({ "title": "Bracket", "quantity": 1, "due_date": "2099-01-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_and_unknown_order_ids() {
    let TestApp { app, .. } = setup();
    let creator = User::creator();

    let (status, _) = get(&app, "/api/orders/not-a-uuid", &creator).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get(&app, &format!("/api/orders/{}", Uuid::new_v4()), &creator).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_offer_arbitration_over_http() {
    let TestApp { app, .. } = setup();
    let creator = User::creator();
    let first = User::manufacturer("first");
    let second = User::manufacturer("second");
    let order_id = create_order(&app, &creator).await;
    let offers_uri = format!("/api/orders/{order_id}/offers");

    let (status, a) = post(&app, &offers_uri, &first, offer_body(900)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, b) = post(&app, &offers_uri, &second, offer_body(850)).await;
    let a_id = a["offer"]["id"].as_str().unwrap();
    let b_id = b["offer"]["id"].as_str().unwrap();

    let (_, open) = get(&app, &offers_uri, &creator).await;
    assert_eq!(open["offers"].as_array().unwrap().len(), 2);

    let (status, accepted) =
        post(&app, &format!("/api/offers/{b_id}/accept"), &creator, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["offer"]["is_accepted"], true);
    assert_eq!(accepted["order"]["status"], "Order Accepted");
    assert_eq!(accepted["order"]["manufacturer"]["email"], "second@example.com");

    let (status, json) =
        post(&app, &format!("/api/offers/{a_id}/accept"), &creator, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].is_string());

    let (_, open) = get(&app, &offers_uri, &creator).await;
    assert!(open["offers"].as_array().unwrap().is_empty());

    let (_, unclaimed) = get(&app, "/api/orders/unclaimed", &first).await;
    assert!(unclaimed["orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_offer_missing_term_is_rejected() {
    let TestApp { app, .. } = setup();
    let creator = User::creator();
    let maker = User::manufacturer("maker");
    let order_id = create_order(&app, &creator).await;

    let (status, json) = post(
        &app,
        &format!("/api/orders/{order_id}/offers"),
        &maker,
        json!({ "unit_cost": 900 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("projected_cost"));
}

#[tokio::test]
async fn test_status_advance_and_shipping() {
    let TestApp { app, .. } = setup();
    let creator = User::creator();
    let maker = User::manufacturer("maker");
    let order_id = claimed_order(&app, &creator, &maker).await;
    let status_uri = format!("/api/orders/{order_id}/status");

    let (status, _) = post(&app, &status_uri, &creator, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Empty body is accepted
    let (status, json) = send(
        &app,
        request("POST", &status_uri, Some(&maker))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["status"], "Machine Setup");

    post(&app, &status_uri, &maker, json!({})).await;
    post(&app, &status_uri, &maker, json!({})).await;
    let (status, json) = post(
        &app,
        &status_uri,
        &maker,
        json!({ "shipping": { "carrier": "UPS", "tracking_number": "1Z999" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["status"], "Shipped");

    let (status, json) = get(&app, &format!("/api/orders/{order_id}/shipping"), &creator).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["shipping"]["shipping_info"]["carrier"], "UPS");

    let (status, json) = post(
        &app,
        &format!("/api/orders/{order_id}/shipping"),
        &creator,
        json!({
            "delivery_address": {
                "street": "1 Main St",
                "city": "Springfield",
                "state": "IL",
                "postal_code": "62701",
                "country": "US"
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["shipping"]["delivery_address"]["city"], "Springfield");

    post(&app, &status_uri, &maker, json!({})).await;
    let (status, _) = post(&app, &status_uri, &maker, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_archive_hides_order() {
    let TestApp { app, .. } = setup();
    let creator = User::creator();
    let maker = User::manufacturer("maker");
    let order_id = create_order(&app, &creator).await;

    let (status, _) = post(&app, &format!("/api/orders/{order_id}/archive"), &maker, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) =
        post(&app, &format!("/api/orders/{order_id}/archive"), &creator, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["is_archived"], true);

    let (_, unclaimed) = get(&app, "/api/orders/unclaimed", &maker).await;
    assert!(unclaimed["orders"].as_array().unwrap().is_empty());

    let (_, mine) = get(&app, "/api/orders", &creator).await;
    assert_eq!(mine["orders"].as_array().unwrap().len(), 1);
}

fn assembly_body(name: &str, parts: &[&str]) -> Value {
    let metadata: serde_json::Map<String, Value> = parts
        .iter()
        .map(|part| {
            (
                part.to_string(),
                json!({ "storage_path": format!("cad/housing/{part}.step") }),
            )
        })
        .collect();
    json!({ "name": name, "part_ids": parts, "part_metadata": metadata })
}

#[tokio::test]
async fn test_assemblies_and_specifications() {
    let TestApp { app, .. } = setup();
    let creator = User::creator();
    let order_id = create_order(&app, &creator).await;
    let assemblies_uri = format!("/api/orders/{order_id}/assemblies");

    let (status, lid) = post(&app, &assemblies_uri, &creator, assembly_body("Lid", &["lid"])).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lid["assembly"]["parts"][0]["name"], "lid.step");
    let (_, base) = post(
        &app,
        &assemblies_uri,
        &creator,
        assembly_body("Base", &["base", "bolt"]),
    )
    .await;
    let lid_id = lid["assembly"]["id"].as_str().unwrap().to_string();
    let base_id = base["assembly"]["id"].as_str().unwrap().to_string();

    let (status, json) = post(
        &app,
        &format!("{assemblies_uri}/build-order"),
        &creator,
        json!({ "assembly_ids": [base_id, lid_id] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["assemblies"][0]["name"], "Base");
    assert_eq!(json["assemblies"][1]["build_order"], 1);

    let (status, _) = post(
        &app,
        &format!("{assemblies_uri}/build-order"),
        &creator,
        json!({ "assembly_ids": [base_id] }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let specs_uri = format!("/api/assemblies/{base_id}/specifications");
    for quantity in [2, 4] {
        let (status, _) = post(
            &app,
            &specs_uri,
            &creator,
            json!({
                "order_id": order_id,
                "part_id": "bolt",
                "quantity": quantity,
                "specification": { "material": "steel" }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, json) = get(&app, &specs_uri, &creator).await;
    let specifications = json["specifications"].as_array().unwrap();
    assert_eq!(specifications.len(), 1);
    assert_eq!(specifications[0]["quantity"], 4);

    let (status, json) = post(
        &app,
        &format!("/api/assemblies/{base_id}/status"),
        &creator,
        json!({ "completed": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["assembly"]["specifications_completed"], true);
}

fn multipart_request(uri: &str, user: &User, file: &str) -> Request<Body> {
    let boundary = "foundry-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"housing.step\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {file}\r\n\
         --{boundary}--\r\n"
    );
    request("POST", uri, Some(user))
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_split_cad_file() {
    let TestApp { app, cad } = setup();
    let creator = User::creator();
    let order_id = create_order(&app, &creator).await;
    let uri = format!("/api/orders/{order_id}/parts/split");

    let (status, json) = send(&app, multipart_request(&uri, &creator, "lid.step\nbase.step")).await;

    assert_eq!(status, StatusCode::OK);
    let parts = json["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["name"], "lid.step");
    assert_eq!(parts[0]["hierarchy"], json!(["parts", order_id]));
    assert_eq!(cad.upload_count().await, 1);
}

#[tokio::test]
async fn test_split_failure_is_bad_gateway() {
    let TestApp { app, cad } = setup();
    let creator = User::creator();
    let stranger = User::creator();
    let order_id = create_order(&app, &creator).await;
    let uri = format!("/api/orders/{order_id}/parts/split");

    let (status, _) = send(&app, multipart_request(&uri, &stranger, "lid.step")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    cad.fail_next(1).await;
    let (status, json) = send(&app, multipart_request(&uri, &creator, "lid.step")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let TestApp { app, .. } = setup();
    let creator = User::creator();
    create_order(&app, &creator).await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
