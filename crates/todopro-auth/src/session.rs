//! Session manager.
//!
//! Single source of truth for "is there a usable authenticated session".
//! Persisted state lives in [`SessionStorage`]; the in-memory user mirrors
//! what a UI would hold in its auth context.
//!
//! Lifecycle:
//! - created by [`SessionManager::login`] / [`SessionManager::register`]
//! - restored once at startup by [`SessionManager::load_persisted_session`]
//! - destroyed by [`SessionManager::logout`], or at load time when the token
//!   is expired or undecodable
//!
//! There is no refresh flow: an expired session ends and the user logs in
//! again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::json;
use todopro_core::{ApiClient, ApiError, ApiRequest};
use tracing::{debug, info, warn};

use crate::errors::AuthError;
use crate::storage::SessionStorage;
use crate::token::{decode_claims, now_secs};
use crate::types::{Session, TokenResponse, User, VerifyResponse};

/// Fallback reason when login fails without a server detail.
pub const LOGIN_FALLBACK: &str = "Invalid credentials";

/// Fallback reason when registration fails without a server detail.
pub const REGISTER_FALLBACK: &str = "Registration failed";

/// Default window before expiry in which [`SessionManager::usable_token`]
/// stops handing out the token.
pub const DEFAULT_EXPIRY_MARGIN_SECS: i64 = 300;

/// Client-side session state machine.
pub struct SessionManager {
    client: Arc<dyn ApiClient>,
    storage: SessionStorage,
    user: RwLock<Option<User>>,
    initialized: AtomicBool,
    expiry_margin_secs: i64,
}

impl SessionManager {
    /// Create a manager over an API client and session storage.
    ///
    /// Nothing is read from storage until [`Self::load_persisted_session`].
    pub fn new(client: Arc<dyn ApiClient>, storage: SessionStorage) -> Self {
        Self {
            client,
            storage,
            user: RwLock::new(None),
            initialized: AtomicBool::new(false),
            expiry_margin_secs: DEFAULT_EXPIRY_MARGIN_SECS,
        }
    }

    /// Override the expiry margin used by [`Self::usable_token`].
    #[must_use]
    pub fn with_expiry_margin(mut self, secs: i64) -> Self {
        self.expiry_margin_secs = secs.max(0);
        self
    }

    /// The underlying session storage.
    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    /// Snapshot of the in-memory user.
    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    /// Whether [`Self::load_persisted_session`] has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// A stored token exists and a user is held in memory.
    pub fn is_authenticated(&self) -> bool {
        self.storage.token().is_some() && self.user.read().is_some()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Startup
    // ─────────────────────────────────────────────────────────────────────

    /// Restore the session persisted by a previous run.
    ///
    /// Never contacts the network. An undecodable or expired token purges
    /// both keys, as does a user record left behind without a token. A valid
    /// token with a missing or unparseable user yields `None` and leaves the
    /// token stored.
    pub fn load_persisted_session(&self) -> Option<Session> {
        let session = self.restore_at(now_secs());
        self.initialized.store(true, Ordering::Release);
        session
    }

    fn restore_at(&self, now: i64) -> Option<Session> {
        let Some(token) = self.storage.token() else {
            if self.storage.user_json().is_some() {
                warn!("persisted user without a token, clearing session");
                self.purge();
            } else {
                debug!("no persisted token");
            }
            return None;
        };

        match decode_claims(&token) {
            Ok(claims) if claims.is_expired_at(now) => {
                info!(exp = claims.exp, now, "persisted token expired, clearing session");
                self.purge();
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("persisted token unreadable, clearing session: {e}");
                self.purge();
                return None;
            }
        }

        let Some(user_json) = self.storage.user_json() else {
            debug!("token present but no persisted user");
            return None;
        };

        let user = match serde_json::from_str::<Option<User>>(&user_json) {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("persisted user is null");
                return None;
            }
            Err(e) => {
                warn!("persisted user unreadable: {e}");
                return None;
            }
        };

        *self.user.write() = Some(user.clone());
        debug!("session restored");
        Some(Session { token, user })
    }

    fn purge(&self) {
        if let Err(e) = self.storage.clear_session() {
            warn!("failed to clear persisted session: {e}");
        }
        *self.user.write() = None;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Credential exchange
    // ─────────────────────────────────────────────────────────────────────

    /// Log in with email and password.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let body = json!({
            "email": email,
            "password": password,
        });
        self.exchange("/auth/login", body, LOGIN_FALLBACK).await
    }

    /// Register a new account; on success the user is logged in.
    #[tracing::instrument(skip_all)]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, AuthError> {
        let body = json!({
            "email": email,
            "password": password,
            "first_name": first_name,
            "last_name": last_name,
        });
        self.exchange("/auth/register", body, REGISTER_FALLBACK).await
    }

    /// POST credentials, then persist the returned token and user together.
    async fn exchange(
        &self,
        path: &str,
        body: serde_json::Value,
        fallback: &str,
    ) -> Result<User, AuthError> {
        let response = self.client.post(path, body).await.map_err(|source| {
            warn!(path, "auth request failed: {source}");
            AuthError::Rejected {
                reason: source.user_message(fallback),
                source,
            }
        })?;

        let TokenResponse { access_token, user } =
            decode(response).map_err(|e| invalid_response(e, fallback))?;

        self.storage.set_session(&access_token, &user)?;
        *self.user.write() = Some(user.clone());
        info!(path, "session established");
        Ok(user)
    }

    /// End the session.
    ///
    /// The remote logout is best effort; local state is always cleared and
    /// the call cannot fail.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self) {
        if let Err(e) = self.client.send(ApiRequest::post("/auth/logout")).await {
            warn!("remote logout failed, clearing local session anyway: {e}");
        }
        self.purge();
        info!("logged out");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Server-side checks
    // ─────────────────────────────────────────────────────────────────────

    /// Ask the server whether `token` is valid; returns its user if so.
    #[tracing::instrument(skip_all)]
    pub async fn verify_token(&self, token: &str) -> Option<User> {
        let request = ApiRequest::post("/auth/verify").json(json!({})).bearer(token);
        match self.client.send(request).await.and_then(decode::<VerifyResponse>) {
            Ok(VerifyResponse {
                valid: true,
                user: Some(user),
            }) => Some(user),
            Ok(_) => None,
            Err(e) => {
                debug!("token verification failed: {e}");
                None
            }
        }
    }

    /// Fetch the profile of the current token's owner.
    #[tracing::instrument(skip_all)]
    pub async fn current_user(&self) -> Option<User> {
        match self.client.get("/auth/me").await.and_then(decode::<Option<User>>) {
            Ok(user) => user,
            Err(e) => {
                debug!("current user lookup failed: {e}");
                None
            }
        }
    }

    /// The stored token, unless it is unreadable or expires within the
    /// configured margin.
    pub fn usable_token(&self) -> Option<String> {
        self.usable_token_at(now_secs())
    }

    fn usable_token_at(&self, now: i64) -> Option<String> {
        let token = self.storage.token()?;
        match decode_claims(&token) {
            Ok(claims)
                if !claims.is_expired_at(now)
                    && claims.remaining_at(now) >= self.expiry_margin_secs =>
            {
                Some(token)
            }
            Ok(claims) => {
                debug!(remaining = claims.remaining_at(now), "token expiring soon");
                None
            }
            Err(e) => {
                warn!("stored token unreadable: {e}");
                None
            }
        }
    }
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(value)?)
}

fn invalid_response(source: ApiError, fallback: &str) -> AuthError {
    match source {
        ApiError::Decode(source) => AuthError::InvalidResponse {
            reason: fallback.to_string(),
            source,
        },
        other => AuthError::Rejected {
            reason: other.user_message(fallback),
            source: other,
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore, TOKEN_KEY, USER_KEY};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use base64::Engine as _;
    use serde_json::Value;

    type Handler = Box<dyn Fn(&ApiRequest) -> Result<Value, ApiError> + Send + Sync>;

    struct MockApi {
        handler: Handler,
        calls: Mutex<Vec<ApiRequest>>,
    }

    impl MockApi {
        fn new(handler: impl Fn(&ApiRequest) -> Result<Value, ApiError> + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                handler: Box::new(handler),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn paths(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|r| r.path.clone()).collect()
        }
    }

    #[async_trait]
    impl ApiClient for MockApi {
        async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
            let result = (self.handler)(&request);
            self.calls.lock().unwrap().push(request);
            result
        }
    }

    fn offline() -> Arc<MockApi> {
        MockApi::new(|_| {
            Err(ApiError::Transport {
                message: "connection refused".into(),
            })
        })
    }

    fn token_with_exp(exp: i64) -> String {
        let enc = |s: &str| base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(s);
        format!(
            "{}.{}.sig",
            enc(r#"{"alg":"HS256","typ":"JWT"}"#),
            enc(&format!(r#"{{"sub":"1","exp":{exp}}}"#))
        )
    }

    fn user() -> User {
        User::new(serde_json::json!({"id": 1, "email": "a@b.com"}))
    }

    fn manager_with(store: Arc<MemoryStore>, api: Arc<MockApi>) -> SessionManager {
        SessionManager::new(api, SessionStorage::new(store))
    }

    #[test]
    fn restore_valid_session() {
        let store = Arc::new(MemoryStore::new());
        let token = token_with_exp(2_000);
        SessionStorage::new(store.clone()).set_session(&token, &user()).unwrap();

        let mgr = manager_with(store, offline());
        let session = mgr.restore_at(1_000).unwrap();
        assert_eq!(session.token, token);
        assert_eq!(session.user, user());
        assert!(mgr.is_authenticated());
    }

    #[test]
    fn restore_expired_purges_both_keys() {
        let store = Arc::new(MemoryStore::new());
        SessionStorage::new(store.clone())
            .set_session(&token_with_exp(1_000), &user())
            .unwrap();

        let mgr = manager_with(store.clone(), offline());
        assert!(mgr.restore_at(1_000).is_none());
        assert!(store.get(TOKEN_KEY).is_none());
        assert!(store.get(USER_KEY).is_none());
        assert!(!mgr.is_authenticated());
    }

    #[test]
    fn restore_malformed_token_purges() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_many(&[(TOKEN_KEY, "garbage"), (USER_KEY, r#"{"id":1}"#)])
            .unwrap();

        let mgr = manager_with(store.clone(), offline());
        assert!(mgr.restore_at(1_000).is_none());
        assert!(store.get(TOKEN_KEY).is_none());
        assert!(store.get(USER_KEY).is_none());
    }

    #[test]
    fn restore_missing_user_keeps_token() {
        let store = Arc::new(MemoryStore::new());
        let token = token_with_exp(2_000);
        store.set_many(&[(TOKEN_KEY, token.as_str())]).unwrap();

        let mgr = manager_with(store.clone(), offline());
        assert!(mgr.restore_at(1_000).is_none());
        assert_eq!(store.get(TOKEN_KEY), Some(token));
        assert!(!mgr.is_authenticated());
    }

    #[test]
    fn restore_orphan_user_is_cleared() {
        let store = Arc::new(MemoryStore::new());
        store.set_many(&[(USER_KEY, r#"{"id":1}"#)]).unwrap();

        let mgr = manager_with(store.clone(), offline());
        assert!(mgr.load_persisted_session().is_none());
        assert!(store.get(USER_KEY).is_none());
        assert!(store.get(TOKEN_KEY).is_none());
        assert!(!mgr.is_authenticated());
    }

    #[test]
    fn restore_unparseable_user_keeps_token() {
        let store = Arc::new(MemoryStore::new());
        let token = token_with_exp(2_000);
        store
            .set_many(&[(TOKEN_KEY, token.as_str()), (USER_KEY, "{not json")])
            .unwrap();

        let mgr = manager_with(store.clone(), offline());
        assert!(mgr.restore_at(1_000).is_none());
        assert!(store.get(TOKEN_KEY).is_some());
    }

    #[test]
    fn load_marks_initialized() {
        let mgr = SessionManager::new(offline(), SessionStorage::in_memory());
        assert!(!mgr.is_initialized());
        assert!(mgr.load_persisted_session().is_none());
        assert!(mgr.is_initialized());
    }

    #[test]
    fn stale_user_without_token_is_unauthenticated() {
        let store = Arc::new(MemoryStore::new());
        SessionStorage::new(store.clone())
            .set_session(&token_with_exp(2_000), &user())
            .unwrap();
        let mgr = manager_with(store.clone(), offline());
        let _ = mgr.restore_at(1_000).unwrap();

        store.remove_many(&[TOKEN_KEY]).unwrap();
        assert!(mgr.user().is_some());
        assert!(!mgr.is_authenticated());
    }

    #[test]
    fn token_without_user_is_unauthenticated() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_many(&[(TOKEN_KEY, token_with_exp(i64::MAX).as_str())])
            .unwrap();
        let mgr = manager_with(store, offline());
        assert!(!mgr.is_authenticated());
    }

    #[tokio::test]
    async fn login_persists_pair() {
        let token = token_with_exp(now_secs() + 3_600);
        let reply = token.clone();
        let api = MockApi::new(move |_| Ok(serde_json::json!({"access_token": reply, "user": {"id": 1}})));
        let store = Arc::new(MemoryStore::new());
        let mgr = manager_with(store.clone(), api.clone());

        let user = mgr.login("a@b.com", "x").await.unwrap();
        assert_eq!(user.field("id").as_deref(), Some("1"));
        assert_eq!(store.get(TOKEN_KEY), Some(token));
        assert_eq!(store.get(USER_KEY).as_deref(), Some(r#"{"id":1}"#));
        assert!(mgr.is_authenticated());
        assert_eq!(api.paths(), vec!["/auth/login"]);
    }

    #[tokio::test]
    async fn login_failure_uses_server_detail() {
        let api = MockApi::new(|_| {
            Err(ApiError::from_status(
                401,
                r#"{"detail":"Incorrect email or password"}"#.into(),
            ))
        });
        let store = Arc::new(MemoryStore::new());
        let mgr = manager_with(store.clone(), api);

        let err = mgr.login("a@b.com", "bad").await.unwrap_err();
        assert_eq!(err.reason(), "Incorrect email or password");
        assert!(store.get(TOKEN_KEY).is_none());
        assert!(!mgr.is_authenticated());
    }

    #[tokio::test]
    async fn login_failure_falls_back() {
        let mgr = SessionManager::new(offline(), SessionStorage::in_memory());
        let err = mgr.login("a@b.com", "x").await.unwrap_err();
        assert_matches!(err, AuthError::Rejected { .. });
        assert_eq!(err.reason(), LOGIN_FALLBACK);
    }

    #[tokio::test]
    async fn login_malformed_response_is_invalid() {
        let api = MockApi::new(|_| Ok(serde_json::json!({"user": {"id": 1}})));
        let store = Arc::new(MemoryStore::new());
        let mgr = manager_with(store.clone(), api);

        let err = mgr.login("a@b.com", "x").await.unwrap_err();
        assert_matches!(err, AuthError::InvalidResponse { .. });
        assert_eq!(err.reason(), LOGIN_FALLBACK);
        assert!(store.get(TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn login_null_user_is_invalid() {
        let token = token_with_exp(now_secs() + 3_600);
        let api = MockApi::new(move |_| Ok(serde_json::json!({"access_token": token, "user": null})));
        let store = Arc::new(MemoryStore::new());
        let mgr = manager_with(store.clone(), api);

        let err = mgr.login("a@b.com", "x").await.unwrap_err();
        assert_matches!(err, AuthError::InvalidResponse { .. });
        assert!(store.get(TOKEN_KEY).is_none());
        assert!(store.get(USER_KEY).is_none());
        assert!(!mgr.is_authenticated());
    }

    #[tokio::test]
    async fn register_sends_snake_case_names() {
        let token = token_with_exp(now_secs() + 3_600);
        let api = MockApi::new(move |req| {
            assert_eq!(
                req.body,
                Some(serde_json::json!({
                    "email": "a@b.com",
                    "password": "x",
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                }))
            );
            Ok(serde_json::json!({"access_token": token, "user": {"id": 2}}))
        });
        let mgr = SessionManager::new(api.clone(), SessionStorage::in_memory());
        let user = mgr.register("a@b.com", "x", "Ada", "Lovelace").await.unwrap();
        assert_eq!(user.field("id").as_deref(), Some("2"));
        assert!(mgr.is_authenticated());
        assert_eq!(api.paths(), vec!["/auth/register"]);
    }

    #[tokio::test]
    async fn register_failure_falls_back() {
        let api = MockApi::new(|_| Err(ApiError::from_status(500, String::new())));
        let mgr = SessionManager::new(api, SessionStorage::in_memory());
        let err = mgr.register("a@b.com", "x", "Ada", "L").await.unwrap_err();
        assert_eq!(err.reason(), REGISTER_FALLBACK);
    }

    #[tokio::test]
    async fn logout_clears_even_when_remote_fails() {
        let store = Arc::new(MemoryStore::new());
        SessionStorage::new(store.clone())
            .set_session(&token_with_exp(now_secs() + 3_600), &user())
            .unwrap();
        let api = offline();
        let mgr = manager_with(store.clone(), api.clone());
        assert!(mgr.load_persisted_session().is_some());

        mgr.logout().await;
        assert!(store.get(TOKEN_KEY).is_none());
        assert!(store.get(USER_KEY).is_none());
        assert!(mgr.user().is_none());
        assert!(!mgr.is_authenticated());
        assert_eq!(api.paths(), vec!["/auth/logout"]);
    }

    #[tokio::test]
    async fn verify_token_sends_explicit_bearer() {
        let api = MockApi::new(|req| {
            assert_eq!(req.bearer.as_deref(), Some("tok"));
            assert_eq!(req.body, Some(serde_json::json!({})));
            Ok(serde_json::json!({"valid": true, "user": {"id": 3}}))
        });
        let mgr = SessionManager::new(api, SessionStorage::in_memory());
        let user = mgr.verify_token("tok").await.unwrap();
        assert_eq!(user.field("id").as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn verify_token_invalid_is_none() {
        let api = MockApi::new(|_| Ok(serde_json::json!({"valid": false, "user": {"id": 3}})));
        let mgr = SessionManager::new(api, SessionStorage::in_memory());
        assert!(mgr.verify_token("tok").await.is_none());
        assert!(SessionManager::new(offline(), SessionStorage::in_memory())
            .verify_token("tok")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn current_user_swallows_errors() {
        let api = MockApi::new(|_| Ok(serde_json::json!({"id": 9, "email": "z@b.com"})));
        let mgr = SessionManager::new(api, SessionStorage::in_memory());
        assert_eq!(mgr.current_user().await.unwrap().display_name(), "z@b.com");

        let mgr = SessionManager::new(offline(), SessionStorage::in_memory());
        assert!(mgr.current_user().await.is_none());
    }

    #[test]
    fn usable_token_respects_margin() {
        let storage = SessionStorage::in_memory();
        let token = token_with_exp(1_000);
        storage.set_session(&token, &user()).unwrap();
        let mgr = SessionManager::new(offline(), storage).with_expiry_margin(300);

        assert_eq!(mgr.usable_token_at(600), Some(token.clone()));
        assert!(mgr.usable_token_at(701).is_none());
        assert!(mgr.usable_token_at(1_000).is_none());
    }

    #[test]
    fn usable_token_zero_margin_still_rejects_expired() {
        let storage = SessionStorage::in_memory();
        storage.set_session(&token_with_exp(1_000), &user()).unwrap();
        let mgr = SessionManager::new(offline(), storage).with_expiry_margin(0);
        assert!(mgr.usable_token_at(999).is_some());
        assert!(mgr.usable_token_at(1_000).is_none());
    }

    #[test]
    fn usable_token_none_for_garbage() {
        let store = Arc::new(MemoryStore::new());
        store.set_many(&[(TOKEN_KEY, "garbage")]).unwrap();
        let mgr = manager_with(store, offline());
        assert!(mgr.usable_token().is_none());
    }
}
