//! Reading `~/.todopro/settings.json` and `TODOPRO_*` variables.
//!
//! The user file only needs the keys it changes: it is overlaid onto the
//! serialized defaults with [`deep_merge`], and env variables are applied
//! last. A JSON `null` in the file means "keep the default".

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::TodoproSettings;

/// Resolve the client data directory (`~/.todopro`).
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".todopro")
}

/// Resolve the path to the settings file (`~/.todopro/settings.json`).
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TodoproSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<TodoproSettings> {
    let mut settings = load_file_layers(path)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

/// Defaults merged with the user file, without env overrides.
fn load_file_layers(path: &Path) -> Result<TodoproSettings> {
    let defaults = serde_json::to_value(TodoproSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Overlay `overlay` onto `base`.
///
/// Nested objects are combined key by key. Any other value in `overlay`
/// (arrays included) wins outright, except `null`, which leaves `base`
/// untouched.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map.into_iter().filter(|(_, v)| !v.is_null()) {
                let combined = match base_map.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = base_map.insert(key, combined);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Apply environment variable overrides using `lookup` to read variables.
///
/// Invalid values are ignored with a warning (file/default value stays).
pub fn apply_env_overrides<F>(settings: &mut TodoproSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.string("TODOPRO_API_BASE_URL") {
        settings.api.base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = env.u64_in("TODOPRO_TIMEOUT_MS", 100, 600_000) {
        settings.api.timeout_ms = v;
    }
    if let Some(v) = env.string("TODOPRO_SESSION_FILE") {
        settings.auth.session_file = Some(v);
    }
    if let Some(v) = env.i64_in("TODOPRO_EXPIRY_MARGIN_SECS", 0, 86_400) {
        settings.auth.expiry_margin_secs = v;
    }
    if let Some(v) = env.string("TODOPRO_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("TODOPRO_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as an `i64` within an inclusive range.
pub fn parse_i64_range(val: &str, min: i64, max: i64) -> Option<i64> {
    let n: i64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64_in(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }

    fn i64_in(&self, name: &str, min: i64, max: i64) -> Option<i64> {
        let val = (self.lookup)(name)?;
        let result = parse_i64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid i64 env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
