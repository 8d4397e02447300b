//! Catalogue access rules through the API.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use storehouse_integration_tests::TestApp;

#[tokio::test]
async fn test_catalogue_is_public_but_changes_need_staff() {
    let app = TestApp::new().await;
    let (_, user) = app.register("ann@example.com").await;
    let (_, staff) = app.staff("staff@example.com").await;
    let product = json!({"name": "Pineapple", "price": 4.5, "images": ["front.png", "side;1.png"]});

    let empty = app.get("/api/product", None).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body, json!({"hits": 0, "pages": 0, "data": []}));

    assert_eq!(
        app.post("/api/product", None, product.clone()).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.post("/api/product", Some(&user), product.clone()).await.status,
        StatusCode::UNAUTHORIZED
    );

    let created = app.post("/api/product", Some(&staff), product).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["id"].as_i64().unwrap();

    let fetched = app.get(&format!("/api/product/{id}"), None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["name"], "Pineapple");
    assert_eq!(fetched.body["images"], json!(["front.png", "side;1.png"]));

    let listing = app.get("/api/product", None).await;
    assert_eq!(listing.body["hits"], 1);
    assert_eq!(listing.body["data"][0]["id"], json!(id));
}

#[tokio::test]
async fn test_patch_and_remove() {
    let app = TestApp::new().await;
    let (_, staff) = app.staff("staff@example.com").await;
    let created = app
        .post("/api/product", Some(&staff), json!({"name": "Kiwi", "price": 1.0}))
        .await;
    let uri = format!("/api/product/{}", created.body["id"].as_i64().unwrap());

    let mismatch = app.patch(&uri, Some(&staff), json!({"price": "free"})).await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);

    let negative = app.patch(&uri, Some(&staff), json!({"price": -1})).await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let patched = app
        .patch(&uri, Some(&staff), json!({"price": 3, "images": ["k.png"]}))
        .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["price"], 3.0);
    assert_eq!(patched.body["images"], json!(["k.png"]));
    assert_eq!(patched.body["name"], "Kiwi");

    assert_eq!(app.delete(&uri, Some(&staff)).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.patch(&uri, Some(&staff), json!({"price": 2})).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_invalid_product_payloads() {
    let app = TestApp::new().await;
    let (_, staff) = app.staff("staff@example.com").await;

    let blank = app
        .post("/api/product", Some(&staff), json!({"name": "  ", "price": 1.0}))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let missing_price = app
        .post("/api/product", Some(&staff), json!({"name": "Fig"}))
        .await;
    assert_eq!(missing_price.status, StatusCode::BAD_REQUEST);

    assert_eq!(
        app.get("/api/product/x1", None).await.status,
        StatusCode::BAD_REQUEST
    );
}
