//! Configuration module.
//!
//! Loads and validates `imgroute.toml`. Stock defaults are serialised to a
//! TOML table and the user's file is merged on top of it, so a config file
//! only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [probes]
//! cache = false          # Probe each backend once per process
//! disabled = []          # Class names forced unavailable, e.g. ["RustImage"]
//!
//! [encoding]
//! jpeg_quality = 85      # save_as_jpeg default (1-100)
//! avif_quality = 80      # save_as_avif default (1-100)
//! avif_speed = 6         # rav1e speed (1-10, higher is faster)
//!
//! [resize]
//! filter = "lanczos3"    # nearest | triangle | catmull-rom | gaussian | lanczos3
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::registry::AvailabilityChecker;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Program configuration loaded from `imgroute.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Backend availability probing.
    pub probes: ProbeConfig,
    /// Encoder defaults for the `save_as_*` operations.
    pub encoding: EncodingConfig,
    /// Resampling used by `resize`.
    pub resize: ResizeConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.encoding.jpeg_quality) {
            return Err(ConfigError::Validation(
                "encoding.jpeg_quality must be 1-100".into(),
            ));
        }
        if !(1..=100).contains(&self.encoding.avif_quality) {
            return Err(ConfigError::Validation(
                "encoding.avif_quality must be 1-100".into(),
            ));
        }
        if !(1..=10).contains(&self.encoding.avif_speed) {
            return Err(ConfigError::Validation(
                "encoding.avif_speed must be 1-10".into(),
            ));
        }
        if let Some(name) = self.probes.disabled.iter().find(|n| n.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "probes.disabled contains an empty class name: {name:?}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Memoise probe results for the lifetime of the process.
    pub cache: bool,
    /// Class names that always report unavailable.
    pub disabled: Vec<String>,
}

impl ProbeConfig {
    /// Build the availability checker this section describes.
    pub fn checker(&self) -> AvailabilityChecker {
        let checker = if self.cache {
            AvailabilityChecker::memoized()
        } else {
            AvailabilityChecker::new()
        };
        checker.with_disabled(self.disabled.iter().cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    pub jpeg_quality: u32,
    pub avif_quality: u32,
    pub avif_speed: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            avif_quality: 80,
            avif_speed: 6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub filter: FilterName,
}

/// Resampling filters accepted in `resize.filter`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterName {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to defaults when it doesn't exist.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `imgroute.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgroute configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Backend availability
# ---------------------------------------------------------------------------
[probes]
# Probe each image class once and reuse the answer for the rest of the run.
# When false, availability is re-checked for every routed operation.
cache = false

# Image classes to treat as unavailable, e.g. ["RustImage", "Av1Frame"].
# Operations are routed around them.
disabled = []

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# Quality used by save_as_jpeg when no quality argument is given (1-100).
jpeg_quality = 85

# Quality used by save_as_avif when no quality argument is given (1-100).
avif_quality = 80

# rav1e encoder speed (1-10). Lower is slower and smaller.
avif_speed = 6

# ---------------------------------------------------------------------------
# Resizing
# ---------------------------------------------------------------------------
[resize]
# Resampling filter: nearest, triangle, catmull-rom, gaussian, lanczos3
filter = "lanczos3"
"##
}
