//! SessionGuard against a mock auth service served by axum.

use std::net::SocketAddr;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use policy_console::{
    ConsoleConfig, FileTokenStore, MemoryTokenStore, SessionGuard, SessionOutcome, TokenStore,
};
use serde_json::{json, Value};

const TOKEN: &str = "good-token";

async fn me(headers: HeaderMap) -> Response {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    match bearer.strip_prefix("Bearer ") {
        Some(TOKEN) => Json(json!({
            "id": 1,
            "email": "admin@example.com",
            "first_name": "Ada",
            "roles": ["admin"]
        }))
        .into_response(),
        Some("flaky-token") => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token"}))).into_response(),
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "secret" {
        Json(json!({
            "access_token": TOKEN,
            "token_type": "bearer",
            "user": {"email": body["email"], "roles": []}
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect email or password"})),
        )
            .into_response()
    }
}

async fn spawn_auth() -> SocketAddr {
    let app = Router::new()
        .route("/users/me", get(me))
        .route("/auth/login", post(login));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config(addr: SocketAddr) -> ConsoleConfig {
    let base = format!("http://{}", addr);
    ConsoleConfig::from_lookup(|key| match key {
        "POLICY_API_BASE" => Some(base.clone()),
        "POLICY_TOKEN_FILE" => Some("/nonexistent/token".to_string()),
        _ => None,
    })
    .unwrap()
}

#[tokio::test]
async fn valid_token_yields_session_with_user() {
    let addr = spawn_auth().await;
    let guard = SessionGuard::new(config(addr), MemoryTokenStore::with_token(TOKEN));

    let session = guard.require().await.unwrap();
    let user = session.user().unwrap();
    assert_eq!(user.email, "admin@example.com");
    assert_eq!(user.roles, vec!["admin".to_string()]);
    assert!(session.client().has_token());
}

#[tokio::test]
async fn rejected_token_redirects_to_login_page() {
    let addr = spawn_auth().await;
    let guard = SessionGuard::new(config(addr), MemoryTokenStore::with_token("stale"));

    match guard.enter().await.unwrap() {
        SessionOutcome::RedirectToLogin(redirect) => {
            assert_eq!(redirect.login_url, format!("http://{}/auth.html", addr))
        }
        SessionOutcome::Authenticated(_) => panic!("expected redirect"),
    }
}

#[tokio::test]
async fn probe_failure_still_loads_page() {
    let addr = spawn_auth().await;
    let guard = SessionGuard::new(config(addr), MemoryTokenStore::with_token("flaky-token"));

    let session = guard.require().await.unwrap();
    assert!(session.user().is_none());
}

#[tokio::test]
async fn login_stores_token_and_logout_clears_it() {
    let addr = spawn_auth().await;
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("creds").join("token");
    let cfg = config(addr).with_token_file(&token_file);
    let guard = SessionGuard::from_config(cfg);

    assert!(guard.require().await.unwrap_err().is_login_required());

    let client = guard.anonymous_client().unwrap();
    let user = guard
        .login(&client, " admin@example.com ", "secret")
        .await
        .unwrap();
    assert_eq!(user.unwrap().email, "admin@example.com");
    assert_eq!(
        FileTokenStore::new(&token_file).load().unwrap().as_deref(),
        Some(TOKEN)
    );
    assert!(guard.require().await.unwrap().user().is_some());

    guard.logout().unwrap();
    assert!(!token_file.exists());
    assert!(guard.require().await.unwrap_err().is_login_required());
}

#[tokio::test]
async fn bad_credentials_are_a_form_error() {
    let addr = spawn_auth().await;
    let guard = SessionGuard::new(config(addr), MemoryTokenStore::new());
    let client = guard.anonymous_client().unwrap();

    let err = guard
        .login(&client, "admin@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(!err.is_login_required());
    assert_eq!(err.to_string(), "HTTP 401: Incorrect email or password");

    let err = guard.login(&client, "", "x").await.unwrap_err();
    assert_eq!(err.to_string(), "Email and password are required");
}
