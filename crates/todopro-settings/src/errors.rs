//! Errors raised while reading `settings.json`.

use thiserror::Error;

/// Why the settings file could not be turned into [`TodoproSettings`](crate::TodoproSettings).
///
/// A missing file is not an error; only an unreadable or malformed one is.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON, or does not fit the settings shape.
    #[error("malformed settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shorthand for settings results.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn unreadable_file_keeps_os_message() {
        let err: SettingsError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_matches!(err, SettingsError::Io(_));
        assert_eq!(err.to_string(), "cannot read settings file: denied");
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let json_err = serde_json::from_str::<crate::TodoproSettings>(r#"{"api": 5}"#).unwrap_err();
        let err = SettingsError::from(json_err);
        assert!(err.to_string().starts_with("malformed settings JSON"));
    }
}
