//! Auth error types.

use todopro_core::ApiError;

/// Errors returned by login and registration.
///
/// The `Display` text is the user-facing reason.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The API rejected the request or could not be reached.
    #[error("{reason}")]
    Rejected {
        /// Server `detail` message, or the operation's fallback text.
        reason: String,
        /// Underlying API failure.
        #[source]
        source: ApiError,
    },

    /// The API answered 2xx but the body lacked a token or user.
    #[error("{reason}")]
    InvalidResponse {
        /// The operation's fallback text.
        reason: String,
        /// Decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// The session could not be written to storage.
    #[error("failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// User-displayable reason for the failure.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Errors from the persisted key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons a bearer token's claims could not be read.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Not three dot-separated segments.
    #[error("token is not a three-segment JWT")]
    Malformed,

    /// Payload segment is not valid base64url.
    #[error("token payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload segment is not a JSON object.
    #[error("token payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload has no numeric `exp` claim.
    #[error("token payload has no exp claim")]
    MissingExp,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
