//! Order placement, totals, lifecycle, and access rules through the API.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};
use storehouse_core::{EntryKind, OrderStatus, ResourceKind};
use storehouse_integration_tests::TestApp;

fn two_items() -> Value {
    json!({
        "shipping_address": "1 Dock Rd",
        "invoice_address": "1 Dock Rd",
        "products": [
            {"product_id": 1, "amount": 1, "price": 5.0},
            {"product_id": 2, "amount": 1, "price": 6.0}
        ],
        "shipping_price": 2.0
    })
}

async fn place(app: &TestApp, token: &str) -> i64 {
    let response = app.post("/api/order", Some(token), two_items()).await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    response.body["id"].as_i64().unwrap()
}

fn total(body: &Value) -> f64 {
    body["total"].as_f64().unwrap()
}

#[tokio::test]
async fn test_total_is_recomputed_after_patch() {
    let app = TestApp::new().await;
    let (_, user) = app.register("ann@example.com").await;
    let (_, staff) = app.staff("staff@example.com").await;

    let created = app.post("/api/order", Some(&user), two_items()).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert!((total(&created.body) - 13.0).abs() < 1e-9);
    assert_eq!(created.body["status"], OrderStatus::Created.code());
    let id = created.body["id"].as_i64().unwrap();

    let patched = app
        .patch(
            &format!("/api/order/{id}"),
            Some(&staff),
            json!({"shipping_price": 10.5, "total": 1.0}),
        )
        .await;
    assert_eq!(patched.status, StatusCode::NO_CONTENT);

    let order = app.get(&format!("/api/order/{id}"), Some(&user)).await;
    assert_eq!(order.status, StatusCode::OK);
    assert!((total(&order.body) - 21.5).abs() < 1e-9);
    assert_eq!(order.body["products"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_line_items_are_rejected() {
    let app = TestApp::new().await;
    let (_, user) = app.register("ann@example.com").await;

    let mut body = two_items();
    body["products"][0]["amount"] = json!(0);
    let response = app.post("/api/order", Some(&user), body).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let anonymous = app.post("/api/order", None, two_items()).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_patch_cannot_store_negative_amounts_or_shipping() {
    let app = TestApp::new().await;
    let (_, user) = app.register("ann@example.com").await;
    let (_, staff) = app.staff("staff@example.com").await;
    let id = place(&app, &user).await;
    let uri = format!("/api/order/{id}");

    let negative_amount = app
        .patch(
            &uri,
            Some(&staff),
            json!({"products": [{"product_id": 1, "amount": -5, "price": 3}]}),
        )
        .await;
    assert_eq!(negative_amount.status, StatusCode::BAD_REQUEST);
    assert!(negative_amount.body["error"].is_string());

    let negative_shipping = app
        .patch(&uri, Some(&staff), json!({"shipping_price": -1}))
        .await;
    assert_eq!(negative_shipping.status, StatusCode::BAD_REQUEST);

    let order = app.get(&uri, Some(&user)).await;
    assert!((total(&order.body) - 13.0).abs() < 1e-9);
    assert_eq!(order.body["products"][0]["amount"], 1);
}

#[tokio::test]
async fn test_orders_are_visible_to_owner_and_staff_only() {
    let app = TestApp::new().await;
    let (ann_id, ann) = app.register("ann@example.com").await;
    let (_, bob) = app.register("bob@example.com").await;
    let (_, staff) = app.staff("staff@example.com").await;
    let id = place(&app, &ann).await;

    let uri = format!("/api/order/{id}");
    assert_eq!(app.get(&uri, Some(&ann)).await.status, StatusCode::OK);
    assert_eq!(app.get(&uri, Some(&bob)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get(&uri, Some(&staff)).await.status, StatusCode::OK);
    assert_eq!(app.get("/api/order/999", Some(&staff)).await.status, StatusCode::NOT_FOUND);

    let mine = app
        .get(&format!("/api/account/{}/orders", ann_id.as_i64()), Some(&ann))
        .await;
    assert_eq!(mine.status, StatusCode::OK);
    assert_eq!(mine.body.as_array().unwrap().len(), 1);
    assert_eq!(mine.body[0]["order_by"], json!(ann_id.as_i64()));
}

#[tokio::test]
async fn test_listing_requires_staff() {
    let app = TestApp::new().await;
    let (_, user) = app.register("ann@example.com").await;
    let (_, staff) = app.staff("staff@example.com").await;
    for _ in 0..3 {
        place(&app, &user).await;
    }

    assert_eq!(
        app.get("/api/order", Some(&user)).await.status,
        StatusCode::UNAUTHORIZED
    );

    let page = app.get("/api/order?limit=2&page=2", Some(&staff)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["hits"], 3);
    assert_eq!(page.body["pages"], 2);
    assert_eq!(page.body["data"].as_array().unwrap().len(), 1);

    let fallback = app.get("/api/order?limit=lots", Some(&staff)).await;
    assert_eq!(fallback.status, StatusCode::OK);
    assert_eq!(fallback.body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_status_follows_lifecycle() {
    let app = TestApp::new().await;
    let (_, user) = app.register("ann@example.com").await;
    let (_, staff) = app.staff("staff@example.com").await;
    let id = place(&app, &user).await;
    let uri = format!("/api/order/{id}");

    let skip = app
        .patch(&uri, Some(&staff), json!({"status": OrderStatus::Shipped.code()}))
        .await;
    assert_eq!(skip.status, StatusCode::BAD_REQUEST);

    let unknown = app.patch(&uri, Some(&staff), json!({"status": 42})).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let paid = app
        .patch(&uri, Some(&staff), json!({"status": OrderStatus::Paid.code()}))
        .await;
    assert_eq!(paid.status, StatusCode::NO_CONTENT);

    let by_user = app
        .patch(&uri, Some(&user), json!({"status": OrderStatus::InRealisation.code()}))
        .await;
    assert_eq!(by_user.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cancel_only_from_open_states() {
    let app = TestApp::new().await;
    let (_, user) = app.register("ann@example.com").await;
    let id = place(&app, &user).await;
    let uri = format!("/api/order/{id}/cancel");

    let first = app.request(axum::http::Method::POST, &uri, Some(&user), None).await;
    assert_eq!(first.status, StatusCode::NO_CONTENT);

    let again = app.request(axum::http::Method::POST, &uri, Some(&user), None).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let order = app.get(&format!("/api/order/{id}"), Some(&user)).await;
    assert_eq!(order.body["status"], OrderStatus::Canceled.code());
}

#[tokio::test]
async fn test_staff_cancels_every_open_order_of_an_account() {
    let app = TestApp::new().await;
    let (ann_id, ann) = app.register("ann@example.com").await;
    let (_, staff) = app.staff("staff@example.com").await;
    let first = place(&app, &ann).await;
    let second = place(&app, &ann).await;

    let completed = place(&app, &ann).await;
    app.execute(&format!(
        "UPDATE orders SET status = {} WHERE id = {completed}",
        OrderStatus::Completed.code()
    ))
    .await;

    let uri = format!("/api/account/{}/orders/cancel", ann_id.as_i64());
    let by_user = app.request(axum::http::Method::POST, &uri, Some(&ann), None).await;
    assert_eq!(by_user.status, StatusCode::UNAUTHORIZED);

    let response = app.request(axum::http::Method::POST, &uri, Some(&staff), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    for id in [first, second] {
        let order = app.get(&format!("/api/order/{id}"), Some(&ann)).await;
        assert_eq!(order.body["status"], OrderStatus::Canceled.code());
        let kinds: Vec<EntryKind> = app
            .audit(ResourceKind::Order, id)
            .await
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![EntryKind::Creation, EntryKind::Modification]);
    }
    let untouched = app.get(&format!("/api/order/{completed}"), Some(&ann)).await;
    assert_eq!(untouched.body["status"], OrderStatus::Completed.code());
}

#[tokio::test]
async fn test_staff_removes_order() {
    let app = TestApp::new().await;
    let (_, user) = app.register("ann@example.com").await;
    let (staff_id, staff) = app.staff("staff@example.com").await;
    let id = place(&app, &user).await;
    let uri = format!("/api/order/{id}");

    assert_eq!(app.delete(&uri, Some(&user)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.delete(&uri, Some(&staff)).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, Some(&staff)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, Some(&staff)).await.status, StatusCode::NOT_FOUND);

    let entries = app.audit(ResourceKind::Order, id).await;
    let deletion = entries.iter().find(|e| e.kind == EntryKind::Deletion).unwrap();
    assert_eq!(deletion.executor, staff_id);
}
