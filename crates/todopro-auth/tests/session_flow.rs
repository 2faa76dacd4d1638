//! End-to-end session flows against a mock backend.

use std::sync::Arc;

use base64::Engine as _;
use serde_json::json;
use tempfile::TempDir;
use todopro_auth::{FileStore, KeyValueStore, SessionManager, SessionStorage, TOKEN_KEY, USER_KEY};
use todopro_core::ReqwestApiClient;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_expiring_in(secs: i64) -> String {
    let enc = |s: &str| base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(s);
    let exp = chrono::Utc::now().timestamp() + secs;
    format!(
        "{}.{}.signature",
        enc(r#"{"alg":"HS256","typ":"JWT"}"#),
        enc(&format!(r#"{{"sub":"1","exp":{exp}}}"#))
    )
}

fn build(server: &MockServer, storage: &SessionStorage) -> SessionManager {
    let client = ReqwestApiClient::new(server.uri()).with_bearer_source(Arc::new(storage.clone()));
    SessionManager::new(Arc::new(client), storage.clone())
}

#[tokio::test]
async fn login_then_restart_restores_session() {
    let server = MockServer::start().await;
    let token = token_expiring_in(3_600);

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "x"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "user": {"id": 1, "email": "a@b.com", "first_name": "Ada"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("session.json");
    let storage = SessionStorage::file(&file);
    let mgr = build(&server, &storage);
    assert!(mgr.load_persisted_session().is_none());

    let user = mgr.login("a@b.com", "x").await.unwrap();
    assert_eq!(user.field("email").as_deref(), Some("a@b.com"));
    assert!(mgr.is_authenticated());

    let raw = FileStore::new(&file);
    assert_eq!(raw.get(TOKEN_KEY).as_deref(), Some(token.as_str()));
    assert!(raw.get(USER_KEY).is_some());

    // A new process over the same file.
    let restarted = build(&server, &SessionStorage::file(&file));
    assert!(!restarted.is_authenticated());
    let session = restarted.load_persisted_session().unwrap();
    assert_eq!(session.token, token);
    assert_eq!(session.user, user);
    assert!(restarted.is_authenticated());
}

#[tokio::test]
async fn rejected_login_leaves_storage_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Incorrect email or password"})),
        )
        .mount(&server)
        .await;

    let storage = SessionStorage::in_memory();
    let mgr = build(&server, &storage);
    let err = mgr.login("a@b.com", "wrong").await.unwrap_err();
    assert_eq!(err.reason(), "Incorrect email or password");
    assert!(storage.token().is_none());
    assert!(storage.user_json().is_none());
}

#[tokio::test]
async fn logout_sends_bearer_and_clears_on_server_error() {
    let server = MockServer::start().await;
    let token = token_expiring_in(3_600);

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let storage = SessionStorage::in_memory();
    storage
        .set_session(&token, &todopro_auth::User::new(json!({"id": 1})))
        .unwrap();
    let mgr = build(&server, &storage);
    assert!(mgr.load_persisted_session().is_some());

    mgr.logout().await;
    assert!(storage.token().is_none());
    assert!(storage.user_json().is_none());
    assert!(!mgr.is_authenticated());
}

#[tokio::test]
async fn expired_session_is_purged_at_startup() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("session.json");
    let storage = SessionStorage::file(&file);
    storage
        .set_session(&token_expiring_in(-10), &todopro_auth::User::new(json!({"id": 1})))
        .unwrap();

    let mgr = build(&server, &storage);
    assert!(mgr.load_persisted_session().is_none());
    assert!(!file.exists());
    assert!(!mgr.is_authenticated());
}

#[tokio::test]
async fn verify_and_me_roundtrip() {
    let server = MockServer::start().await;
    let token = token_expiring_in(3_600);

    Mock::given(method("POST"))
        .and(path("/auth/verify"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": true,
            "user": {"id": 1, "email": "a@b.com"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "email": "a@b.com"})))
        .mount(&server)
        .await;

    let storage = SessionStorage::in_memory();
    storage
        .set_session(&token, &todopro_auth::User::new(json!({"id": 1})))
        .unwrap();
    let mgr = build(&server, &storage);

    let verified = mgr.verify_token(&token).await.unwrap();
    assert_eq!(verified.field("email").as_deref(), Some("a@b.com"));
    let me = mgr.current_user().await.unwrap();
    assert_eq!(me.field("id").as_deref(), Some("1"));
    assert_eq!(mgr.usable_token().as_deref(), Some(token.as_str()));
}
