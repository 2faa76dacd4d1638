//! Task store error types.

use thiserror::Error;
use todopro_core::ApiError;

use crate::types::TaskId;

/// Errors returned by [`TaskStore`](crate::TaskStore) operations.
///
/// The `Display` text is what the store records as its error indicator.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The API request failed.
    #[error("{message}")]
    Api {
        /// Server `detail` message, or the operation's fallback text.
        message: String,
        /// Underlying API failure.
        #[source]
        source: ApiError,
    },

    /// The API answered 2xx with a body that is not a task (or task list).
    #[error("{message}")]
    InvalidResponse {
        /// The operation's fallback text.
        message: String,
        /// Decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// No task with this identifier in the local list.
    #[error("Task not found: {0}")]
    NotFound(TaskId),
}

impl TaskError {
    /// Wrap an API failure, preferring the server's detail over `fallback`.
    pub(crate) fn api(source: ApiError, fallback: &str) -> Self {
        match source {
            ApiError::Decode(source) => Self::InvalidResponse {
                message: fallback.to_string(),
                source,
            },
            source => Self::Api {
                message: source.user_message(fallback),
                source,
            },
        }
    }

    /// HTTP status of the failed request, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { source, .. } => source.status(),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
