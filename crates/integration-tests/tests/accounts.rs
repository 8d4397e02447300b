//! Registration, login, sessions, and account removal through the API.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;
use storehouse_core::{EntryKind, ResourceKind};
use storehouse_integration_tests::{PASSWORD, TestApp, session_of};

#[tokio::test]
async fn test_register_returns_token_and_cookie() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/account/register",
            None,
            json!({
                "email": "ann@example.com",
                "password": PASSWORD,
                "name": "Ann",
                "surname": "Lee",
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let (id, token) = session_of(&response);
    assert_eq!(token.len(), 128);
    let cookie = response.set_cookie.unwrap();
    assert!(cookie.starts_with(&format!("token={token};")));

    let me = app.get("/api/account/@me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["id"], json!(id.as_i64()));
    assert_eq!(me.body["email"], "ann@example.com");
    assert_eq!(me.body["type"], 1);
    assert!(me.body.get("password_digest").is_none());
}

#[tokio::test]
async fn test_cookie_token_authenticates() {
    let app = TestApp::new().await;
    let (_, token) = app.register("cookie@example.com").await;

    let request = Request::builder()
        .uri("/api/account/@me")
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["email"], "cookie@example.com");
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let app = TestApp::new().await;
    app.register("dup@example.com").await;

    let again = app
        .post(
            "/api/account/register",
            None,
            json!({"email": "dup@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["error"], "Resource already exists");
}

#[tokio::test]
async fn test_registration_validation() {
    let app = TestApp::new().await;

    let weak = app
        .post(
            "/api/account/register",
            None,
            json!({"email": "weak@example.com", "password": "password"}),
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);

    let bad_email = app
        .post(
            "/api/account/register",
            None,
            json!({"email": "not-an-email", "password": PASSWORD}),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let malformed = app
        .post("/api/account/register", None, json!({"password": PASSWORD}))
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert!(malformed.body["error"].is_string());
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::new().await;
    app.register("ann@example.com").await;

    let wrong = app
        .post(
            "/api/account/login",
            None,
            json!({"email": "ann@example.com", "password": "Wr0ng!pass"}),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let unknown = app
        .post(
            "/api/account/login",
            None,
            json!({"email": "nobody@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_or_bogus_token_is_unauthorized() {
    let app = TestApp::new().await;
    let response = app.get("/api/account/@me", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Unauthorized");

    let response = app.get("/api/account/@me", Some("nope")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_expires_after_window() {
    let app = TestApp::new().await;
    let (_, token) = app.register("late@example.com").await;

    app.age_sessions(31).await;
    let response = app.get("/api/account/@me", Some(&token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_use_slides_expiry() {
    let app = TestApp::new().await;
    let (_, token) = app.register("busy@example.com").await;

    app.age_sessions(10).await;
    let stale = "SELECT COUNT(*) FROM sessions \
                 WHERE updated_at < datetime(CURRENT_TIMESTAMP, '-5 minutes')";
    assert_eq!(app.scalar(stale).await, 1);

    let response = app.get("/api/account/@me", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.scalar(stale).await, 0);
}

#[tokio::test]
async fn test_logout_ends_only_that_session() {
    let app = TestApp::new().await;
    let (_, first) = app.register("two@example.com").await;
    let login = app
        .post(
            "/api/account/login",
            None,
            json!({"email": "two@example.com", "password": PASSWORD}),
        )
        .await;
    let (_, second) = session_of(&login);

    let response = app.get("/api/account/logout", Some(&first)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.set_cookie.unwrap().contains("Max-Age=0"));

    assert_eq!(
        app.get("/api/account/@me", Some(&first)).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.get("/api/account/@me", Some(&second)).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_other_accounts_are_off_limits() {
    let app = TestApp::new().await;
    let (ann, _) = app.register("ann@example.com").await;
    let (_, bob) = app.register("bob@example.com").await;
    let (_, staff) = app.staff("staff@example.com").await;

    let uri = format!("/api/account/{}", ann.as_i64());
    assert_eq!(app.get(&uri, Some(&bob)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get(&uri, Some(&staff)).await.status, StatusCode::OK);
    assert_eq!(
        app.get("/api/account/abc", Some(&staff)).await.status,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_profile_patch_ignores_protected_fields() {
    let app = TestApp::new().await;
    let (id, token) = app.register("ann@example.com").await;

    let response = app
        .patch(
            &format!("/api/account/{}", id.as_i64()),
            Some(&token),
            json!({"name": "Anna", "type": 2, "id": 99, "password_digest": "x"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "Anna");
    assert_eq!(response.body["type"], 1);
    assert_eq!(response.body["id"], json!(id.as_i64()));

    let mismatch = app
        .patch(
            &format!("/api/account/{}", id.as_i64()),
            Some(&token),
            json!({"name": 5}),
        )
        .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_change() {
    let app = TestApp::new().await;
    let (id, token) = app.register("ann@example.com").await;
    let uri = format!("/api/account/{}/password", id.as_i64());

    let weak = app.post(&uri, Some(&token), json!({"password": "short"})).await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);

    let ok = app.post(&uri, Some(&token), json!({"password": "N3w!password"})).await;
    assert_eq!(ok.status, StatusCode::NO_CONTENT);

    let login = app
        .post(
            "/api/account/login",
            None,
            json!({"email": "ann@example.com", "password": "N3w!password"}),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);

    let entries = app.audit(ResourceKind::AccountPassword, id.as_i64()).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::Modification);
}

#[tokio::test]
async fn test_removal_cascades_to_every_session() {
    let app = TestApp::new().await;
    let (id, first) = app.register("gone@example.com").await;
    let login = app
        .post(
            "/api/account/login",
            None,
            json!({"email": "gone@example.com", "password": PASSWORD}),
        )
        .await;
    let (_, second) = session_of(&login);

    let response = app
        .delete(&format!("/api/account/{}", id.as_i64()), Some(&first))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    for token in [&first, &second] {
        assert_eq!(
            app.get("/api/account/@me", Some(token)).await.status,
            StatusCode::UNAUTHORIZED
        );
    }

    let account_deletions: Vec<_> = app
        .audit(ResourceKind::Account, id.as_i64())
        .await
        .into_iter()
        .filter(|e| e.kind == EntryKind::Deletion)
        .collect();
    assert_eq!(account_deletions.len(), 1);
    assert_eq!(account_deletions[0].executor, id);

    let session_deletions = app
        .audit(ResourceKind::Session, id.as_i64())
        .await
        .into_iter()
        .filter(|e| e.kind == EntryKind::Deletion)
        .count();
    assert_eq!(session_deletions, 1);

    // the scrambled email frees the address
    app.register("gone@example.com").await;
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;
    let live = app.get("/health", None).await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, json!("ok"));
    assert_eq!(app.get("/health/ready", None).await.status, StatusCode::OK);
}
