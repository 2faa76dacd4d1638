//! Auth data types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A user profile as returned by the API.
///
/// The client does not depend on its shape beyond it being a JSON object;
/// accessors read the fields the backend is known to send.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct User(Value);

impl<'de> Deserialize<'de> for User {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let profile = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self(Value::Object(profile)))
    }
}

impl User {
    /// Wrap a JSON profile.
    pub fn new(profile: Value) -> Self {
        Self(profile)
    }

    /// The raw JSON profile.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// A string (or numeric) field of the profile.
    pub fn field(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// `"First Last"` if present, else the email, else the id.
    pub fn display_name(&self) -> String {
        let full: Vec<String> = ["first_name", "last_name"]
            .iter()
            .filter_map(|k| self.field(k))
            .filter(|s| !s.is_empty())
            .collect();
        if !full.is_empty() {
            return full.join(" ");
        }
        self.field("email")
            .or_else(|| self.field("id"))
            .unwrap_or_else(|| "unknown user".to_string())
    }
}

/// A restored or freshly issued session.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// Profile associated with the token.
    pub user: User,
}

/// Response of login and registration.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub user: User,
}

/// Response of `POST /auth/verify`.
#[derive(Debug, Deserialize)]
pub(crate) struct VerifyResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub user: Option<User>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
