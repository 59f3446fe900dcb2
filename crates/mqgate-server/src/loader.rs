//! Configuration loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`GatewayConfig::default()`]
//! 2. If the config file exists, deep-merge its values over defaults
//! 3. Apply `MQGATE_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::GatewayConfig;

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Config file was not valid JSON, or did not match the schema.
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolve the path to the config file (`~/.mqgate/config.json`).
#[must_use]
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".mqgate").join("config.json")
}

/// Load configuration from the default path with env var overrides.
pub fn load_config() -> Result<GatewayConfig, LoaderError> {
    load_config_from_path(&config_path())
}

/// Load configuration from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_config_from_path(path: &Path) -> Result<GatewayConfig, LoaderError> {
    let defaults = serde_json::to_value(GatewayConfig::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading config from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "config file not found, using defaults");
        defaults
    };

    let mut config: GatewayConfig = serde_json::from_value(merged)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded configuration.
///
/// Integers must parse and fall within range; invalid values are ignored
/// with a warning (falling back to file/default).
pub fn apply_env_overrides(config: &mut GatewayConfig) {
    if let Some(v) = read_env_string("MQGATE_TCP_HOST") {
        config.tcp.host = v;
    }
    if let Some(v) = read_env_u16("MQGATE_TCP_PORT", 0, 65535) {
        config.tcp.port = v;
    }
    if let Some(v) = read_env_string("MQGATE_WS_HOST") {
        config.ws.host = v;
    }
    if let Some(v) = read_env_u16("MQGATE_WS_PORT", 0, 65535) {
        config.ws.port = v;
    }
    if let Some(v) = read_env_usize("MQGATE_BRIDGE_CAPACITY", 1, 65_536) {
        config.bridge_outbound_capacity = v;
    }
    if let Some(v) = read_env_usize("MQGATE_OBSERVER_QUEUE", 1, 65_536) {
        config.observer_queue_capacity = v;
    }
}

/// Parse a string as a `u16` within a range.
#[must_use]
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
#[must_use]
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}
