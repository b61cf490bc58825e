mod common;

use common::TestApp;
use serde_json::{json, Value};

async fn create_product(app: &TestApp, name: &str, price: &str, stock: i32) -> String {
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/products",
            Some(json!({ "name": name, "price": price, "stock": stock })),
        )
        .await;
    assert_eq!(status, 201, "product creation failed: {body}");
    body["data"]["id"].as_str().expect("product id").to_string()
}

async fn create_payment(app: &TestApp, product_id: &str, key: &str) -> (u16, Value) {
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/payments",
            Some(json!({
                "product_id": product_id,
                "payment_method": "card",
                "user_id": "user-1",
                "idempotency_key": key,
            })),
        )
        .await;
    (status.as_u16(), body)
}

async fn product_stock(app: &TestApp, product_id: &str) -> i64 {
    let (status, body) = app
        .request("GET", &format!("/api/v1/products/{product_id}"), None)
        .await;
    assert_eq!(status, 200);
    body["data"]["stock"].as_i64().expect("stock")
}

async fn set_status(app: &TestApp, payment_id: &str, status_value: &str) -> (u16, Value) {
    let (status, body) = app
        .request(
            "PUT",
            &format!("/api/v1/payments/{payment_id}/status"),
            Some(json!({ "status": status_value })),
        )
        .await;
    (status.as_u16(), body)
}

#[tokio::test]
async fn payment_walks_the_full_lifecycle() {
    let app = TestApp::new().await;
    let product_id = create_product(&app, "Desk lamp", "10", 2).await;

    let (status, body) = create_payment(&app, &product_id, "walk-1").await;
    assert_eq!(status, 201, "{body}");
    let payment_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "initialized");
    assert_eq!(body["data"]["amount"], "10");
    assert_eq!(product_stock(&app, &product_id).await, 1);

    for next in ["user_set", "payment_processing", "complete"] {
        let (status, body) = set_status(&app, &payment_id, next).await;
        assert_eq!(status, 200, "transition to {next} failed: {body}");
        assert_eq!(body["data"]["status"], next);
    }

    // Terminal state: no further transitions.
    let (status, body) = set_status(&app, &payment_id, "complete").await;
    assert_eq!(status, 400, "{body}");
}

#[tokio::test]
async fn transitions_cannot_skip_states() {
    let app = TestApp::new().await;
    let product_id = create_product(&app, "Mug", "10", 1).await;
    let (_, body) = create_payment(&app, &product_id, "skip-1").await;
    let payment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = set_status(&app, &payment_id, "payment_processing").await;
    assert_eq!(status, 400);
    let message = body["message"].as_str().unwrap();
    assert!(
        message.contains("user_set"),
        "rejection should name the valid next state, got: {message}"
    );

    let (status, _) = set_status(&app, &payment_id, "complete").await;
    assert_eq!(status, 400);

    // The failed attempts changed nothing.
    let (_, body) = app
        .request("GET", &format!("/api/v1/payments/{payment_id}"), None)
        .await;
    assert_eq!(body["data"]["status"], "initialized");
}

#[tokio::test]
async fn oversell_is_rejected_and_cancel_restocks() {
    let app = TestApp::new().await;
    let product_id = create_product(&app, "Poster", "10", 1).await;

    let (status, body) = create_payment(&app, &product_id, "first").await;
    assert_eq!(status, 201);
    let first_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(product_stock(&app, &product_id).await, 0);

    // Stock is exhausted; a second buyer is turned away.
    let (status, body) = create_payment(&app, &product_id, "second").await;
    assert_eq!(status, 422, "{body}");
    assert_eq!(product_stock(&app, &product_id).await, 0);

    // Cancelling the first reservation frees the unit again.
    let (status, body) = app
        .request("POST", &format!("/api/v1/payments/{first_id}/cancel"), None)
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["id"], first_id.as_str());
    assert_eq!(product_stock(&app, &product_id).await, 1);

    // The cancelled payment is gone.
    let (status, _) = app
        .request("GET", &format!("/api/v1/payments/{first_id}"), None)
        .await;
    assert_eq!(status, 404);

    let (status, _) = create_payment(&app, &product_id, "third").await;
    assert_eq!(status, 201);
    assert_eq!(product_stock(&app, &product_id).await, 0);
}

#[tokio::test]
async fn creation_is_idempotent_per_key() {
    let app = TestApp::new().await;
    let product_id = create_product(&app, "Notebook", "10", 5).await;

    let (status, first) = create_payment(&app, &product_id, "retry-me").await;
    assert_eq!(status, 201);
    let (status, second) = create_payment(&app, &product_id, "retry-me").await;
    assert_eq!(status, 201);

    assert_eq!(first["data"]["id"], second["data"]["id"]);
    // Exactly one unit was reserved across both calls.
    assert_eq!(product_stock(&app, &product_id).await, 4);
}

#[tokio::test]
async fn cancel_requires_initialized_status() {
    let app = TestApp::new().await;
    let product_id = create_product(&app, "Headphones", "10", 1).await;
    let (_, body) = create_payment(&app, &product_id, "locked-in").await;
    let payment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = set_status(&app, &payment_id, "user_set").await;
    assert_eq!(status, 200);

    let (status, body) = app
        .request("POST", &format!("/api/v1/payments/{payment_id}/cancel"), None)
        .await;
    assert_eq!(status, 409, "{body}");

    // Neither the payment nor the stock moved.
    let (_, body) = app
        .request("GET", &format!("/api/v1/payments/{payment_id}"), None)
        .await;
    assert_eq!(body["data"]["status"], "user_set");
    assert_eq!(product_stock(&app, &product_id).await, 0);
}

#[tokio::test]
async fn total_sums_only_completed_payments() {
    let app = TestApp::new().await;

    let (status, body) = app.request("GET", "/api/v1/payments/total", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], "0");

    // Binary-exact decimals keep SQLite's REAL storage faithful.
    let cheap = create_product(&app, "Sticker", "10", 5).await;
    let fancy = create_product(&app, "Print", "25.25", 5).await;

    let (_, p1) = create_payment(&app, &cheap, "sum-1").await;
    let (_, p2) = create_payment(&app, &fancy, "sum-2").await;
    let (_, _p3) = create_payment(&app, &fancy, "sum-3").await;

    for payment in [&p1, &p2] {
        let id = payment["data"]["id"].as_str().unwrap();
        for next in ["user_set", "payment_processing", "complete"] {
            let (status, _) = set_status(&app, id, next).await;
            assert_eq!(status, 200);
        }
    }
    // p3 stays initialized and must not count.

    let (status, body) = app.request("GET", "/api/v1/payments/total", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], "35.25");
}

#[tokio::test]
async fn listing_filters_by_status_and_orders_newest_first() {
    let app = TestApp::new().await;
    let product_id = create_product(&app, "Cable", "10", 3).await;

    let (_, first) = create_payment(&app, &product_id, "list-1").await;
    let first_id = first["data"]["id"].as_str().unwrap().to_string();
    let (_, second) = create_payment(&app, &product_id, "list-2").await;
    let second_id = second["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = set_status(&app, &first_id, "user_set").await;
    assert_eq!(status, 200);

    let (status, body) = app.request("GET", "/api/v1/payments", None).await;
    assert_eq!(status, 200);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    // Joined product snapshot rides along.
    assert_eq!(items[0]["product"]["name"], "Cable");

    let (status, body) = app
        .request("GET", "/api/v1/payments?status=initialized", None)
        .await;
    assert_eq!(status, 200);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], second_id.as_str());

    let (status, body) = app
        .request("GET", "/api/v1/payments?status=refunded", None)
        .await;
    assert_eq!(status, 400, "{body}");
}

#[tokio::test]
async fn missing_resources_return_not_found() {
    let app = TestApp::new().await;

    let ghost = uuid::Uuid::new_v4();
    let (status, _) = app
        .request("GET", &format!("/api/v1/payments/{ghost}"), None)
        .await;
    assert_eq!(status, 404);

    let (status, body) = create_payment(&app, &ghost.to_string(), "no-product").await;
    assert_eq!(status, 404, "{body}");

    let (status, _) = app
        .request("POST", &format!("/api/v1/payments/{ghost}/cancel"), None)
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn product_stock_cannot_go_negative() {
    let app = TestApp::new().await;
    let product_id = create_product(&app, "Stand", "10", 2).await;

    let (status, body) = app
        .request(
            "PUT",
            &format!("/api/v1/products/{product_id}/stock"),
            Some(json!({ "stock": -1 })),
        )
        .await;
    assert_eq!(status, 400, "{body}");
    assert_eq!(product_stock(&app, &product_id).await, 2);

    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/v1/products/{product_id}/stock"),
            Some(json!({ "stock": 7 })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(product_stock(&app, &product_id).await, 7);
}

#[tokio::test]
async fn error_responses_echo_the_request_id() {
    let app = TestApp::new().await;

    let ghost = uuid::Uuid::new_v4();
    let (status, body) = app
        .request("GET", &format!("/api/v1/payments/{ghost}"), None)
        .await;
    assert_eq!(status, 404);
    assert!(
        body["request_id"].as_str().is_some_and(|id| !id.is_empty()),
        "error body should carry a request id: {body}"
    );
}
