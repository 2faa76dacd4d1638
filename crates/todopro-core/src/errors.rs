//! API error types.
//!
//! Every failed HTTP exchange ends up as an [`ApiError`]. Non-2xx responses
//! keep the server's `detail` message (`FastAPI` style error bodies) so callers
//! can show it to the user instead of a generic fallback.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, timeout).
    #[error("request failed: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("request failed with status code {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-supplied `detail` message, if the body carried one.
        detail: Option<String>,
        /// Raw response body.
        body: String,
    },

    /// The response body was not the JSON the caller expected.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Build a [`ApiError::Status`] from a status code and raw body.
    pub fn from_status(status: u16, body: String) -> Self {
        let detail = extract_detail(&body);
        Self::Status {
            status,
            detail,
            body,
        }
    }

    /// HTTP status code, if the server responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-supplied `detail` message, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Message suitable for display: the server's detail, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}

/// Pull a human-readable `detail` out of an error body.
///
/// Accepts `{"detail": "..."}` and the validation shape
/// `{"detail": [{"msg": "..."}, ...]}` (messages joined with `"; "`).
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn status_display() {
        let err = ApiError::from_status(500, String::new());
        assert_eq!(err.to_string(), "request failed with status code 500");
    }

    #[test]
    fn detail_from_string_body() {
        let err = ApiError::from_status(401, r#"{"detail":"Incorrect email or password"}"#.into());
        assert_eq!(err.detail(), Some("Incorrect email or password"));
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn detail_from_validation_body() {
        let body = r#"{"detail":[{"loc":["body","email"],"msg":"field required"},{"msg":"too short"}]}"#;
        let err = ApiError::from_status(422, body.into());
        assert_eq!(err.detail(), Some("field required; too short"));
    }

    #[test]
    fn detail_absent_for_plain_text() {
        let err = ApiError::from_status(502, "Bad Gateway".into());
        assert!(err.detail().is_none());
        assert_eq!(err.user_message("Failed to fetch tasks"), "Failed to fetch tasks");
    }

    #[test]
    fn blank_detail_ignored() {
        let err = ApiError::from_status(400, r#"{"detail":"  "}"#.into());
        assert!(err.detail().is_none());
    }

    #[test]
    fn user_message_prefers_detail() {
        let err = ApiError::from_status(400, r#"{"detail":"Email already registered"}"#.into());
        assert_eq!(err.user_message("Registration failed"), "Email already registered");
    }

    #[test]
    fn transport_has_no_status() {
        let err = ApiError::Transport {
            message: "connection refused".into(),
        };
        assert!(err.status().is_none());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn decode_error_conversion() {
        let json_err = serde_json::from_str::<Value>("{bad}").unwrap_err();
        let err = ApiError::from(json_err);
        assert_matches!(err, ApiError::Decode(_));
    }
}
