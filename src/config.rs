//! Configuration loading, validation and merging.
//!
//! Settings come from three layers, later layers winning:
//!
//! ```text
//! stock defaults  →  config.toml  →  command-line flags
//! ```
//!
//! The config file is `--config FILE` when given, otherwise
//! `<user config dir>/datestamp/config.toml` if it exists
//! (`~/.config/datestamp/config.toml` on Linux).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [text]
//! margin_percent = 2.0        # Margin, % of the shorter image side
//! width_percent = 30          # Text block width, % of image width
//! height_percent = 25         # Text block height, % of image height
//! height_policy = "shrink"    # "shrink" or "accept-overflow"
//! # font = "DejaVuSans.ttf"   # Font file or bare name (omit for built-in face)
//!
//! [output]
//! suffix = "_watermarked"     # Added before the extension
//! quality = 95                # JPEG quality (1-100)
//! rename_to_date = false      # Name outputs after the capture date
//!
//! [processing]
//! max_processes = 4           # Parallel workers (omit for one per CPU core)
//! ```
//!
//! Config files are sparse and unknown keys are rejected.

use crate::codec::Quality;
use crate::fit::HeightPolicy;
use crate::naming::DEFAULT_SUFFIX;
use crate::pipeline::StampSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Tool configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StampConfig {
    /// Text sizing and placement.
    pub text: TextConfig,
    /// Output naming and encoding.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub margin_percent: f32,
    pub width_percent: u32,
    pub height_percent: u32,
    pub height_policy: HeightPolicy,
    /// Font file path or bare file name looked up in the system font dirs.
    pub font: Option<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            margin_percent: 2.0,
            width_percent: 30,
            height_percent: 25,
            height_policy: HeightPolicy::default(),
            font: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub suffix: String,
    pub quality: u32,
    pub rename_to_date: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            quality: Quality::default().value() as u32,
            rename_to_date: false,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Number of parallel workers; one per CPU core when absent.
    pub max_processes: Option<usize>,
}

impl StampConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let text = &self.text;
        if !(1..=100).contains(&text.width_percent) {
            return Err(ConfigError::Validation(
                "text.width_percent must be 1-100".into(),
            ));
        }
        if !(1..=100).contains(&text.height_percent) {
            return Err(ConfigError::Validation(
                "text.height_percent must be 1-100".into(),
            ));
        }
        if !text.margin_percent.is_finite() || !(0.0..=50.0).contains(&text.margin_percent) {
            return Err(ConfigError::Validation(
                "text.margin_percent must be 0-50".into(),
            ));
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.output.suffix.contains(std::path::is_separator) {
            return Err(ConfigError::Validation(
                "output.suffix must not contain path separators".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The per-job settings this config describes.
    pub fn stamp_settings(&self) -> StampSettings {
        StampSettings {
            margin_percent: self.text.margin_percent,
            width_percent: self.text.width_percent,
            height_percent: self.text.height_percent,
            height_policy: self.text.height_policy,
            suffix: self.output.suffix.clone(),
            quality: Quality::new(self.output.quality),
            rename_to_date: self.output.rename_to_date,
        }
    }
}

/// Worker count for a directory run.
///
/// An explicit `max_processes` (or `-j`) is used as given; unset means one
/// worker per available core.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    config
        .max_processes
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .max(1)
}

/// The stock default config as a `toml::Value::Table`, the base layer for
/// merging user overrides.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(StampConfig::default())?)
}

/// Lay a user config over the stock one.
///
/// A `[text]` section in the user file only replaces the keys it names; the
/// rest of the section keeps its stock values. A scalar replaces whatever
/// the stock config had under that key.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    let toml::Value::Table(user) = overlay else {
        return overlay;
    };
    let toml::Value::Table(mut sections) = base else {
        return toml::Value::Table(user);
    };
    for (key, value) in user {
        let layered = match sections.remove(&key) {
            Some(stock) => merge_toml(stock, value),
            None => value,
        };
        sections.insert(key, layered);
    }
    toml::Value::Table(sections)
}

/// Where the config lives when `--config` is not given.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("datestamp").join(CONFIG_FILE_NAME))
}

/// Parse a config file as a raw TOML value.
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

/// Turn the stock table plus an optional user table into a checked
/// [`StampConfig`].
pub fn resolve_config(
    stock: toml::Value,
    user: Option<toml::Value>,
) -> Result<StampConfig, ConfigError> {
    let config: StampConfig = user.into_iter().fold(stock, merge_toml).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config: `explicit` must exist, the default location may not.
pub fn load_config(explicit: Option<&Path>) -> Result<StampConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str(&content)?)
        }
        None => match default_config_path() {
            Some(path) => load_raw_config(&path)?,
            None => None,
        },
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// A fully-commented stock `config.toml`, printed by `--gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# datestamp configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override them.
#
# Location: pass --config FILE, or place this file at
#   Linux:   ~/.config/datestamp/config.toml
#   macOS:   ~/Library/Application Support/datestamp/config.toml
#   Windows: %APPDATA%\datestamp\config.toml
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Text sizing and placement
# ---------------------------------------------------------------------------
[text]
# Distance from the bottom and right edges, as a percentage of the shorter
# image side.
margin_percent = 2.0

# Maximum width of the date block, as a percentage of the image width.
# The largest font size whose wrapped text fits this width is chosen.
width_percent = 30

# Maximum height of the date block, as a percentage of the image height.
height_percent = 25

# What to do when the width-fitting text is taller than height_percent:
#   "shrink"          - shrink the font until it also fits the height
#   "accept-overflow" - keep the width-fitting size
height_policy = "shrink"

# Font file. A bare file name is searched for in the system font
# directories. Without a font the built-in bitmap face is used.
# font = "DejaVuSans.ttf"

# ---------------------------------------------------------------------------
# Output files
# ---------------------------------------------------------------------------
[output]
# Appended to the file name before the extension.
suffix = "_watermarked"

# JPEG quality (1-100). PNG output is always lossless.
quality = 95

# Name outputs after the capture date (2021-07-04_10_20_30.jpg) when writing
# into a directory.
rename_to_date = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Parallel workers. Omit to use one per CPU core.
# max_processes = 4
"##
}
