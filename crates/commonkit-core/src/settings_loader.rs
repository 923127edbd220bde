//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `COMMONKIT_DEBUG` | `debug` |
//! | `COMMONKIT_LOG_LEVEL` | `log_level` |
//! | `COMMONKIT_OBFUSCATION_CHAR` | `obfuscation.char` |
//! | `COMMONKIT_OBFUSCATION_CUTOFF` | `obfuscation.cutoff` |
//! | `COMMONKIT_MAX_UPLOAD_SIZE` | `upload.max_upload_size` |
//! | `COMMONKIT_CSV_DELIMITER` | `upload.csv_delimiter` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use commonkit_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/commonkit.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::CommonkitError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, CommonkitError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| CommonkitError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_into_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, CommonkitError> {
    let content = read_config_file(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, CommonkitError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<Settings, CommonkitError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| CommonkitError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_into_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, CommonkitError> {
    let content = read_config_file(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// Values that fail to parse are ignored with a warning.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("COMMONKIT_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("COMMONKIT_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("COMMONKIT_OBFUSCATION_CHAR") {
        match single_char(&val) {
            Some(c) => settings.obfuscation.char = c,
            None => {
                tracing::warn!(value = %val, "COMMONKIT_OBFUSCATION_CHAR must be one character");
            }
        }
    }

    if let Some(val) = lookup("COMMONKIT_OBFUSCATION_CUTOFF") {
        match val.parse::<i64>() {
            Ok(cutoff) => settings.obfuscation.cutoff = cutoff,
            Err(_) => {
                tracing::warn!(value = %val, "COMMONKIT_OBFUSCATION_CUTOFF is not an integer");
            }
        }
    }

    if let Some(val) = lookup("COMMONKIT_MAX_UPLOAD_SIZE") {
        match val.parse::<usize>() {
            Ok(size) => settings.upload.max_upload_size = size,
            Err(_) => tracing::warn!(value = %val, "COMMONKIT_MAX_UPLOAD_SIZE is not a size"),
        }
    }

    if let Some(val) = lookup("COMMONKIT_CSV_DELIMITER") {
        match single_char(&val) {
            Some(c) => settings.upload.csv_delimiter = c,
            None => tracing::warn!(value = %val, "COMMONKIT_CSV_DELIMITER must be one character"),
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn single_char(value: &str) -> Option<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn read_config_file(path: &Path, kind: &str) -> Result<String, CommonkitError> {
    tracing::info!(path = %path.display(), "loading {kind} settings");
    std::fs::read_to_string(path).map_err(|e| {
        CommonkitError::ConfigurationError(format!(
            "Failed to read {kind} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_into_defaults(value: serde_json::Value, kind: &str) -> Result<Settings, CommonkitError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        CommonkitError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        CommonkitError::ConfigurationError(format!(
            "Failed to deserialize settings from {kind}: {e}"
        ))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
