//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial JSON file only needs the keys it overrides.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings type for the `TodoPro` client.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoproSettings {
    /// REST API connection settings.
    pub api: ApiSettings,
    /// Session persistence and token expiry settings.
    pub auth: AuthSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// REST API connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Base URL of the backend, without trailing slash.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 30_000,
            user_agent: "todopro/0.1".to_string(),
        }
    }
}

/// Session persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Session file path. `None` means `~/.todopro/session.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_file: Option<String>,
    /// A token expiring within this many seconds is not handed out for use.
    pub expiry_margin_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_file: None,
            expiry_margin_secs: 300,
        }
    }
}

impl AuthSettings {
    /// Resolve the session file path.
    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .as_ref()
            .map_or_else(|| crate::loader::data_dir().join("session.json"), PathBuf::from)
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `tracing` filter directive (e.g. `"warn"`, `"todopro_tasks=debug"`).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(TodoproSettings::default()).unwrap();
        assert_eq!(json["api"]["baseUrl"], "http://localhost:8000");
        assert_eq!(json["api"]["timeoutMs"], 30_000);
        assert_eq!(json["auth"]["expiryMarginSecs"], 300);
        assert!(json["auth"].get("sessionFile").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: TodoproSettings =
            serde_json::from_str(r#"{"api": {"baseUrl": "https://todo.example.com"}}"#).unwrap();
        assert_eq!(settings.api.base_url, "https://todo.example.com");
        assert_eq!(settings.api.timeout_ms, 30_000);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn explicit_session_file_wins() {
        let auth = AuthSettings {
            session_file: Some("/tmp/custom.json".into()),
            ..Default::default()
        };
        assert_eq!(auth.session_path(), PathBuf::from("/tmp/custom.json"));
    }

    #[test]
    fn default_session_file_under_data_dir() {
        let path = AuthSettings::default().session_path();
        assert!(path.ends_with(".todopro/session.json"));
    }
}
