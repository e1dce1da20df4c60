//! Default config-file generation with allow-list validation.
//!
//! The generated file is a flat `key: value` document. Overrides are checked
//! against a fixed allow-list, and recognized keys against their value
//! domains, before anything touches the disk: a single bad entry fails the
//! whole write.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use burrow_core::NgrokVersion;

/// Keys a generated config file may contain.
pub const ALLOWED_KEYS: &[&str] = &[
    "api_key",
    "authtoken",
    "log_format",
    "log_level",
    "region",
    "version",
    "web_addr",
];

/// Errors from config generation and validation.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("config key not allowed: {key}")]
    DisallowedKey { key: String },

    #[error("invalid value for {key}: {value} ({reason})")]
    DisallowedValue {
        key: String,
        value: String,
        reason: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Validate overrides against the allow-list and constrained value domains.
pub fn validate_overrides(
    overrides: &HashMap<String, String>,
) -> Result<(), ConfigValidationError> {
    for (key, value) in overrides {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            return Err(ConfigValidationError::DisallowedKey { key: key.clone() });
        }
        let reason = match key.as_str() {
            "log_format" if value != "logfmt" => {
                Some("only logfmt output can be tailed for readiness")
            }
            "log_level" if value != "info" => Some("readiness markers are logged at info"),
            "web_addr" if value.eq_ignore_ascii_case("false") => {
                Some("the local web API cannot be disabled")
            }
            _ => None,
        };
        if let Some(reason) = reason {
            return Err(ConfigValidationError::DisallowedValue {
                key: key.clone(),
                value: value.clone(),
                reason,
            });
        }
    }
    Ok(())
}

/// Write a minimal valid config file at `path`: the hard-coded baseline
/// merged with `overrides`, overrides winning.
///
/// Side-effect-free on failure: validation runs first, and nothing is
/// written when any override is rejected.
pub fn install_default_config(
    path: &Path,
    overrides: &HashMap<String, String>,
    version: NgrokVersion,
) -> Result<(), ConfigValidationError> {
    validate_overrides(overrides)?;

    let mut entries: BTreeMap<&str, &str> = BTreeMap::new();
    entries.insert("version", version.config_value());
    entries.insert("region", "us");
    for (key, value) in overrides {
        entries.insert(key, value);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut rendered = String::new();
    for (key, value) in &entries {
        rendered.push_str(key);
        rendered.push_str(": ");
        rendered.push_str(value);
        rendered.push('\n');
    }
    std::fs::write(path, rendered)?;
    info!(path = %path.display(), "default agent config written");
    Ok(())
}

/// Flat key/value view of an existing config file.
pub fn read_config(path: &Path) -> Result<HashMap<String, String>, ConfigValidationError> {
    let content = std::fs::read_to_string(path)?;
    let mut map = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(map)
}

/// Re-validate a config file that already exists on disk, e.g. one the user
/// edited by hand since it was generated.
pub fn validate_config_file(path: &Path) -> Result<(), ConfigValidationError> {
    validate_overrides(&read_config(path)?)
}
