//! Integration tests for Storehouse.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storehouse-integration-tests
//! ```
//!
//! Every test builds its own [`TestApp`]: the full axum router over a private
//! in-memory `SQLite` database, driven with `tower::ServiceExt::oneshot`. No
//! server, network, or external database is needed.
//!
//! # Test Categories
//!
//! - `accounts` - registration, login, sessions, removal cascade
//! - `orders` - order lifecycle and totals
//! - `products` - catalogue access rules
//! - `audit` - one ledger entry per successful mutation

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use storehouse_core::{AccountId, ResourceKind};
use storehouse_server::config::{DEFAULT_SESSION_WINDOW_MINUTES, ServerConfig};
use storehouse_server::db::{self, Db, Dialect};
use storehouse_server::models::AuditEntry;
use storehouse_server::routes;
use storehouse_server::services::{HashError, Hasher, Services};
use storehouse_server::state::AppState;
use tower::ServiceExt;

/// A password every helper account uses; satisfies the strength rule.
pub const PASSWORD: &str = "Str0ng!pass";

/// Hashing stand-in: fast and deterministic.
#[derive(Debug, Clone, Copy)]
pub struct PlainHasher;

impl Hasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        digest.strip_prefix("plain:") == Some(password)
    }
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
}

/// The router plus direct access to its database and services.
pub struct TestApp {
    pub router: Router,
    pub db: Db,
    pub services: Services,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = db::open_in_memory().await.unwrap();
        let services = Services::new(
            db.clone(),
            Arc::new(PlainHasher),
            DEFAULT_SESSION_WINDOW_MINUTES,
        )
        .await
        .unwrap();
        let config = ServerConfig {
            debug: false,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            dialect: Dialect::Sqlite,
            database_url: SecretString::from("sqlite::memory:".to_owned()),
            session_window_minutes: DEFAULT_SESSION_WINDOW_MINUTES,
            sentry_dsn: None,
        };
        let state = AppState::new(config, db.clone(), services.clone());
        Self {
            router: routes::app(state),
            db,
            services,
        }
    }

    /// Send one request; `token` goes in the `Authorization` header.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send(request).await
    }

    /// Send a prepared request.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            set_cookie,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register a user through the API; returns its id and token.
    pub async fn register(&self, email: &str) -> (AccountId, String) {
        let response = self
            .post(
                "/api/account/register",
                None,
                serde_json::json!({
                    "email": email,
                    "password": PASSWORD,
                    "name": "Test",
                    "surname": "User",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        session_of(&response)
    }

    /// Provision a staff account the way the CLI does, then log in.
    pub async fn staff(&self, email: &str) -> (AccountId, String) {
        self.services
            .accounts
            .create_staff(email, PASSWORD, "Staff".to_owned(), "Member".to_owned())
            .await
            .unwrap();
        let response = self
            .post(
                "/api/account/login",
                None,
                serde_json::json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        session_of(&response)
    }

    /// Ledger entries for one resource, oldest first.
    pub async fn audit(&self, resource: ResourceKind, id: i64) -> Vec<AuditEntry> {
        self.services.audit.entries_for(resource, id).await.unwrap()
    }

    /// Move every session's last use `minutes` into the past.
    pub async fn age_sessions(&self, minutes: i64) {
        let sql = format!(
            "UPDATE sessions SET updated_at = datetime(CURRENT_TIMESTAMP, '-{minutes} minutes')"
        );
        sqlx::query(&sql).execute(self.db.pool()).await.unwrap();
    }

    /// First column of the first row of a raw query, as an integer.
    pub async fn scalar(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(self.db.pool())
            .await
            .unwrap()
    }

    /// Run raw SQL against the test database.
    pub async fn execute(&self, sql: &str) {
        sqlx::query(sql).execute(self.db.pool()).await.unwrap();
    }
}

/// `(id, token)` from a register or login response.
#[must_use]
pub fn session_of(response: &TestResponse) -> (AccountId, String) {
    let id = response.body["id"].as_i64().unwrap();
    let token = response.body["token"].as_str().unwrap().to_owned();
    (AccountId::new(id), token)
}
