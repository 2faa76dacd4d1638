//! HTTP client abstraction.
//!
//! The session manager and task store only ever see [`ApiClient`], so tests
//! can swap in a mock and production code uses
//! [`ReqwestApiClient`](crate::http::ReqwestApiClient).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ApiError;

/// HTTP verbs used by the REST API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Upper-case verb name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request against the API, relative to the client's base URL.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    /// HTTP verb.
    pub method: Method,
    /// Path starting with `/`, e.g. `/tasks/3`.
    pub path: String,
    /// Optional JSON body.
    pub body: Option<Value>,
    /// Explicit bearer token, overriding the client's [`BearerSource`].
    pub bearer: Option<String>,
}

impl ApiRequest {
    /// Create a request with no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    /// `GET path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// `POST path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// `PUT path`.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// `DELETE path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Send this request with an explicit bearer token.
    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Supplies the bearer token attached to outgoing requests.
pub trait BearerSource: Send + Sync {
    /// Current token, or `None` to send the request unauthenticated.
    fn bearer_token(&self) -> Option<String>;
}

/// JSON-over-HTTP client for the REST API.
///
/// Implementations return the decoded JSON body on 2xx (`Value::Null` for an
/// empty body) and an [`ApiError`] otherwise.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Send a request and return the response body.
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;

    /// `GET path`.
    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    /// `POST path` with a JSON body.
    async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiRequest::post(path).json(body)).await
    }

    /// `PUT path` with a JSON body.
    async fn put(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiRequest::put(path).json(body)).await
    }

    /// `DELETE path`.
    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct RecordingClient {
        seen: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl ApiClient for RecordingClient {
        async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
            self.seen.lock().unwrap().push(request);
            Ok(Value::Null)
        }
    }

    #[test]
    fn builder_sets_fields() {
        let req = ApiRequest::post("/auth/verify")
            .json(serde_json::json!({}))
            .bearer("tok");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path, "/auth/verify");
        assert_eq!(req.body, Some(serde_json::json!({})));
        assert_eq!(req.bearer.as_deref(), Some("tok"));
    }

    #[test]
    fn method_display() {
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert_eq!(Method::Put.as_str(), "PUT");
    }

    #[tokio::test]
    async fn provided_helpers_route_through_send() {
        let client = RecordingClient {
            seen: Mutex::new(Vec::new()),
        };
        let _ = client.get("/tasks").await.unwrap();
        let _ = client.put("/tasks/1", serde_json::json!({"completed": true})).await.unwrap();
        let _ = client.delete("/tasks/1").await.unwrap();

        let seen = client.seen.lock().unwrap();
        let methods: Vec<Method> = seen.iter().map(|r| r.method).collect();
        assert_eq!(methods, vec![Method::Get, Method::Put, Method::Delete]);
        assert_eq!(seen[1].body, Some(serde_json::json!({"completed": true})));
        assert!(seen[2].body.is_none());
    }
}
