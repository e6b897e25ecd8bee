//! # Persistence Module
//!
//! ## Why This Module Exists
//! JoyMon remembers its settings between runs: where output files go, how the
//! crosshair is drawn, which buttons start and stop a recording, and where the
//! window was last placed. This module defines that settings record and the
//! store that reads and writes it.
//!
//! ## Key Abstractions
//! - [`Config`]: the in-memory record the rest of the application works with
//! - [`StoredConfig`]: the flat key/value shape written to disk, keeping the
//!   historic key names so older files keep loading
//! - [`config_store::ConfigStore`]: file location plus load/save
//!
//! ## Error Handling Strategy
//! Every field has a default, so a missing key never prevents startup. A file
//! that cannot be read or parsed surfaces as [`ConfigError`] and the caller
//! decides whether to continue with [`Config::default`].

pub mod config_store;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Highest button index a device can report.
pub const MAX_BUTTONS: u32 = 32;

/// Smallest timer period the tick loop honours, in milliseconds.
pub const MIN_TIMER_MS: u64 = 10;

/// Longest timer period, so a vanishingly small rate still ticks.
pub const MAX_TIMER_MS: u64 = 3_600_000;

/// Fastest sample rate the timer allows.
pub const MAX_SAMPLE_RATE: f64 = 1000.0 / MIN_TIMER_MS as f64;

pub const POINTER_SIZE_MAX: u32 = 50;

pub const FILE_PATTERN_MAX: usize = 259;
pub const BANNER_COMMENT_MAX: usize = 1023;
pub const LABEL_MAX: usize = 127;

const DEFAULT_TRIGGER_BUTTON: u32 = 7;
const DEFAULT_SAMPLE_RATE: f64 = 2.0;
const DEFAULT_AXIS_MAGNITUDE: i32 = 1000;
const DEFAULT_POINTER_SIZE: u32 = 2;

const DEFAULT_BANNER_COMMENT: &str = "time,x-axis,y-axis,report status set to firing button 1 \
(when pressed writes 1 to file; otherwise writes 0); \
Double-click button 7 to stop; Adds increment on end of file to prevent inadvertent overwriting of file; \
To view file contents change extension to .csv or .txt and open into Excel or text editor.";

/// Errors raised while loading, saving or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No configuration directory available on this platform")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Which axis, if any, is pinned to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisSuppression {
    #[default]
    None,
    X,
    Y,
}

/// Last known window placement, in screen points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowGeometry {
    /// Geometry is only restored when it is on-screen and not collapsed.
    pub fn is_restorable(&self) -> bool {
        self.x >= 0 && self.y >= 0 && self.width >= 200 && self.height >= 200
    }
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 273,
            height: 329,
        }
    }
}

/// User settings for the monitor.
///
/// Mutated only by the config dialog's confirm action, then persisted. Button
/// indices are 1-based; a `secondary_button` of 0 means no secondary button.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(from = "StoredConfig", into = "StoredConfig")]
pub struct Config {
    pub show_axes: bool,
    pub show_filename: bool,
    pub write_banner: bool,
    pub log_only_on_change: bool,
    pub remember_window: bool,
    pub sound_feedback: bool,
    pub suppress_axis: AxisSuppression,
    /// Marker radius as a percentage of the smaller view dimension.
    pub pointer_size: u32,
    pub axis_magnitude: i32,
    /// Samples per second while recording.
    pub sample_rate: f64,
    pub trigger_button: u32,
    pub secondary_button: u32,
    pub file_pattern: String,
    pub banner_comment: String,
    pub label_pos_x: String,
    pub label_neg_x: String,
    pub label_pos_y: String,
    pub label_neg_y: String,
    pub window: WindowGeometry,
}

impl Config {
    pub fn has_secondary_button(&self) -> bool {
        self.secondary_button != 0
    }

    /// Period between samples, within [`MIN_TIMER_MS`]..=[`MAX_TIMER_MS`].
    ///
    /// A rate that is not a positive number falls back to the default.
    pub fn tick_interval(&self) -> std::time::Duration {
        let rate = sanitized_rate(self.sample_rate);
        let millis = (1000.0 / rate).clamp(MIN_TIMER_MS as f64, MAX_TIMER_MS as f64);
        std::time::Duration::from_secs_f64(millis / 1000.0)
    }

    pub fn start_prompt(&self) -> String {
        format!("Click button {} to start", self.trigger_button)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_axes: false,
            show_filename: true,
            write_banner: true,
            log_only_on_change: false,
            remember_window: true,
            sound_feedback: true,
            suppress_axis: AxisSuppression::None,
            pointer_size: DEFAULT_POINTER_SIZE,
            axis_magnitude: DEFAULT_AXIS_MAGNITUDE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            trigger_button: DEFAULT_TRIGGER_BUTTON,
            secondary_button: 1,
            file_pattern: default_file_pattern(),
            banner_comment: DEFAULT_BANNER_COMMENT.to_string(),
            label_pos_x: "Friendly".to_string(),
            label_neg_x: "Unfriendly".to_string(),
            label_pos_y: "Dominant".to_string(),
            label_neg_y: "Submissive".to_string(),
            window: WindowGeometry::default(),
        }
    }
}

fn default_file_pattern() -> String {
    dirs::document_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Study 1")
        .join("Male41.")
        .to_string_lossy()
        .into_owned()
}

/// On-disk shape of [`Config`].
///
/// Field names follow the historic registry value names. Flags are written as
/// 0/1 integers and the sample rate as a float.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "PascalCase", default)]
pub struct StoredConfig {
    #[serde(with = "flag")]
    show_axes: bool,
    #[serde(with = "flag", alias = "ShowFileName")]
    show_filename: bool,
    #[serde(with = "flag")]
    output_file_banner: bool,
    #[serde(with = "flag")]
    output_only_changes: bool,
    #[serde(with = "flag")]
    remember_window: bool,
    #[serde(with = "flag")]
    sound_feedback: bool,
    #[serde(with = "flag")]
    suppress_x: bool,
    #[serde(with = "flag")]
    suppress_y: bool,
    ellipse_size: u32,
    #[serde(rename = "XYMinMax")]
    xy_min_max: i32,
    #[serde(with = "tick_rate")]
    ticks_per_sec: f64,
    joystick_button: u32,
    #[serde(rename = "Button2")]
    button2: u32,
    window_position_x: i32,
    window_position_y: i32,
    window_size_x: i32,
    window_size_y: i32,
    file_pattern: String,
    banner_comment: String,
    label_pos_x: String,
    label_neg_x: String,
    label_pos_y: String,
    label_neg_y: String,
}

impl Default for StoredConfig {
    fn default() -> Self {
        Config::default().into()
    }
}

impl From<Config> for StoredConfig {
    fn from(config: Config) -> Self {
        Self {
            show_axes: config.show_axes,
            show_filename: config.show_filename,
            output_file_banner: config.write_banner,
            output_only_changes: config.log_only_on_change,
            remember_window: config.remember_window,
            sound_feedback: config.sound_feedback,
            suppress_x: config.suppress_axis == AxisSuppression::X,
            suppress_y: config.suppress_axis == AxisSuppression::Y,
            ellipse_size: config.pointer_size,
            xy_min_max: config.axis_magnitude,
            ticks_per_sec: config.sample_rate,
            joystick_button: config.trigger_button,
            button2: config.secondary_button,
            window_position_x: config.window.x,
            window_position_y: config.window.y,
            window_size_x: config.window.width,
            window_size_y: config.window.height,
            file_pattern: truncated(config.file_pattern, FILE_PATTERN_MAX),
            banner_comment: truncated(config.banner_comment, BANNER_COMMENT_MAX),
            label_pos_x: truncated(config.label_pos_x, LABEL_MAX),
            label_neg_x: truncated(config.label_neg_x, LABEL_MAX),
            label_pos_y: truncated(config.label_pos_y, LABEL_MAX),
            label_neg_y: truncated(config.label_neg_y, LABEL_MAX),
        }
    }
}

impl From<StoredConfig> for Config {
    fn from(stored: StoredConfig) -> Self {
        let trigger_button = if (1..=MAX_BUTTONS).contains(&stored.joystick_button) {
            stored.joystick_button
        } else {
            DEFAULT_TRIGGER_BUTTON
        };
        let secondary_button = if stored.button2 <= MAX_BUTTONS {
            stored.button2
        } else {
            0
        };

        let axis_magnitude = if stored.xy_min_max > 0 {
            stored.xy_min_max
        } else {
            DEFAULT_AXIS_MAGNITUDE
        };
        let pointer_size = if (1..=POINTER_SIZE_MAX).contains(&stored.ellipse_size) {
            stored.ellipse_size
        } else {
            DEFAULT_POINTER_SIZE
        };

        // SuppressX wins when both are set; the dialog only ever sets one.
        let suppress_axis = if stored.suppress_x {
            AxisSuppression::X
        } else if stored.suppress_y {
            AxisSuppression::Y
        } else {
            AxisSuppression::None
        };

        Self {
            show_axes: stored.show_axes,
            show_filename: stored.show_filename,
            write_banner: stored.output_file_banner,
            log_only_on_change: stored.output_only_changes,
            remember_window: stored.remember_window,
            sound_feedback: stored.sound_feedback,
            suppress_axis,
            pointer_size,
            axis_magnitude,
            sample_rate: sanitized_rate(stored.ticks_per_sec),
            trigger_button,
            secondary_button,
            file_pattern: truncated(stored.file_pattern, FILE_PATTERN_MAX),
            banner_comment: truncated(stored.banner_comment, BANNER_COMMENT_MAX),
            label_pos_x: truncated(stored.label_pos_x, LABEL_MAX),
            label_neg_x: truncated(stored.label_neg_x, LABEL_MAX),
            label_pos_y: truncated(stored.label_pos_y, LABEL_MAX),
            label_neg_y: truncated(stored.label_neg_y, LABEL_MAX),
            window: WindowGeometry {
                x: stored.window_position_x,
                y: stored.window_position_y,
                width: stored.window_size_x,
                height: stored.window_size_y,
            },
        }
    }
}

/// Positive finite rates are capped at [`MAX_SAMPLE_RATE`]; anything else
/// becomes the default.
fn sanitized_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate.min(MAX_SAMPLE_RATE)
    } else {
        DEFAULT_SAMPLE_RATE
    }
}

pub(crate) fn truncated(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}

/// Booleans stored as 0/1. `true`/`false` are accepted on read.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Int(i64),
        Bool(bool),
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match RawFlag::deserialize(deserializer)? {
            RawFlag::Int(value) => value != 0,
            RawFlag::Bool(value) => value,
        })
    }
}

/// `TicksPerSec` was once stored as a whole number; it is now a float.
mod tick_rate {
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::info;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRate {
        Legacy(i64),
        Current(f64),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(match RawRate::deserialize(deserializer)? {
            RawRate::Legacy(value) => {
                info!("Migrating integer TicksPerSec value {}", value);
                value as f64
            }
            RawRate::Current(value) => value,
        })
    }
}
