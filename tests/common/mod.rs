//! Test fixtures: an in-process stand-in for the payment gateway, document
//! store, identity provider and mail API, plus request helpers.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use base64::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;

pub use checkout_server::config::Config;
pub use checkout_server::payment::sign_payment;
pub use checkout_server::server::{router, AppState};

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";
pub const SERVICE_TOKEN: &str = "service-token";
pub const MAIL_KEY: &str = "mail-key";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct Upstream {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Upstream {
    pub fn requests_to(&self, fragment: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path.contains(fragment))
            .cloned()
            .collect()
    }

    /// Wait for a request made from a background task.
    pub async fn wait_for(&self, fragment: &str) -> Option<Recorded> {
        for _ in 0..50 {
            if let Some(found) = self.requests_to(fragment).into_iter().next() {
                return Some(found);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }

    fn handle(&self, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        let path = uri.path().to_string();

        self.requests.lock().unwrap().push(Recorded {
            method,
            path: path.clone(),
            query: uri.query().map(String::from),
            headers: headers.clone(),
            body: body.clone(),
        });

        if path == "/v1/orders" {
            return gateway_order(&headers, &body);
        }
        if let Some(rest) = path.strip_prefix("/v1/payments/") {
            if let Some(payment_id) = rest.strip_suffix("/refund") {
                return gateway_refund(payment_id, &body);
            }
        }
        if let Some(item) =
            path.strip_prefix("/v1/projects/test-project/databases/(default)/documents/products/")
        {
            return catalog_document(item);
        }
        if path == "/v1/accounts:lookup" {
            return account_lookup(&body);
        }
        if path == "/v1/accounts:update" {
            return account_update(&headers, &body);
        }
        if path == "/emails" {
            return (StatusCode::OK, Json(json!({ "id": "email_1" }))).into_response();
        }

        StatusCode::NOT_FOUND.into_response()
    }
}

fn gateway_order(headers: &HeaderMap, body: &Value) -> Response {
    let expected = format!(
        "Basic {}",
        BASE64_STANDARD.encode(format!("{KEY_ID}:{KEY_SECRET}"))
    );
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "code": "BAD_REQUEST_ERROR", "description": "Authentication failed" } })),
        )
            .into_response();
    }
    if body["receipt"] == "reject" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": "BAD_REQUEST_ERROR", "description": "Receipt rejected" } })),
        )
            .into_response();
    }

    Json(json!({
        "id": "order_test123",
        "entity": "order",
        "amount": body["amount"],
        "currency": body["currency"],
        "receipt": body["receipt"],
        "status": "created",
    }))
    .into_response()
}

fn gateway_refund(payment_id: &str, body: &Value) -> Response {
    let amount = body["amount"].as_u64().unwrap_or(50_000);
    Json(json!({
        "id": "rfnd_test1",
        "entity": "refund",
        "payment_id": payment_id,
        "amount": amount,
        "status": "processed",
    }))
    .into_response()
}

fn catalog_document(item: &str) -> Response {
    let price = match item {
        "tshirt" => json!({ "integerValue": "499" }),
        "mug" => json!({ "doubleValue": 149.5 }),
        "yacht" => json!({ "integerValue": "1000000000000" }),
        "broken" => json!({ "stringValue": "ask us" }),
        _ => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": { "code": 404, "status": "NOT_FOUND" } })),
            )
                .into_response();
        }
    };
    Json(json!({
        "name": format!("projects/test-project/databases/(default)/documents/products/{item}"),
        "fields": { "name": { "stringValue": item }, "price": price },
    }))
    .into_response()
}

fn account_lookup(body: &Value) -> Response {
    let sub = body["idToken"]
        .as_str()
        .and_then(|t| t.split('.').nth(1))
        .and_then(|p| BASE64_URL_SAFE_NO_PAD.decode(p).ok())
        .and_then(|b| serde_json::from_slice::<Value>(&b).ok())
        .and_then(|claims| claims["sub"].as_str().map(String::from))
        .unwrap_or_default();

    let user = match sub.as_str() {
        "alice" => json!({ "localId": "alice", "email": "alice@example.com" }),
        "bob" => json!({ "localId": "bob" }),
        "admin" => json!({
            "localId": "admin",
            "email": "admin@example.com",
            "customAttributes": "{\"admin\":true}",
        }),
        "boot" => json!({ "localId": "boot", "email": "boot@example.com" }),
        "disabled" => json!({ "localId": "disabled", "disabled": true }),
        "keyless" => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": { "code": 400, "message": "API key not valid. Please pass a valid API key." } })),
            )
                .into_response();
        }
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": { "code": 400, "message": "INVALID_ID_TOKEN" } })),
            )
                .into_response();
        }
    };
    Json(json!({ "kind": "identitytoolkit#GetAccountInfoResponse", "users": [user] }))
        .into_response()
}

fn account_update(headers: &HeaderMap, body: &Value) -> Response {
    let expected = format!("Bearer {SERVICE_TOKEN}");
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if body["localId"] == "ghost" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": 400, "message": "USER_NOT_FOUND" } })),
        )
            .into_response();
    }
    Json(json!({ "localId": body["localId"] })).into_response()
}

pub async fn spawn_upstream() -> (String, Upstream) {
    // reqwest picks up proxy settings from the environment when a client is built
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");

    let upstream = Upstream::default();
    let handler_state = upstream.clone();

    let app = Router::new().fallback(
        move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let upstream = handler_state.clone();
            async move { upstream.handle(method, uri, headers, body) }
        },
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), upstream)
}

pub fn test_config(base: &str) -> Config {
    let config = Config::from_toml_str(&format!(
        r#"
        [razorpay]
        key_id = "{KEY_ID}"
        key_secret = "{KEY_SECRET}"
        api_base = "{base}"

        [catalog]
        base_url = "{base}"
        project_id = "test-project"

        [identity]
        base_url = "{base}"
        api_key = "test-api-key"
        access_token = "{SERVICE_TOKEN}"
        bootstrap_admins = ["boot"]

        [mail]
        enabled = true
        api_url = "{base}/emails"
        api_key = "{MAIL_KEY}"
        from = "shop@example.com"
        "#
    ))
    .unwrap();
    config.validate().unwrap();
    config
}

pub async fn test_app() -> (Router, Upstream) {
    let (base, upstream) = spawn_upstream().await;
    let state = AppState::new(test_config(&base)).unwrap();
    (router(Arc::new(state)), upstream)
}

fn jwt_with(claims: Value) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = BASE64_URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.dGVzdC1zaWduYXR1cmU")
}

/// An unexpired ID token for `sub`; the stand-in identity provider decides who it is.
pub fn id_token(sub: &str) -> String {
    jwt_with(json!({ "sub": sub, "exp": chrono::Utc::now().timestamp() + 3600 }))
}

pub fn expired_token(sub: &str) -> String {
    jwt_with(json!({ "sub": sub, "exp": chrono::Utc::now().timestamp() - 60 }))
}

pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Bytes) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes)
}

pub async fn call_json(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = call(app, method, uri, token, body).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
