//! # Recorder Module
//!
//! Writes joystick samples to numbered text files while a session is active.
//!
//! ## File Layout
//! ```text
//! # File created at Tue Oct 19 14:03:11 2026
//! # Axes magnitude: 1000
//! # Ticks / second: 2.0
//! # <banner comment>
//! 0.000,12,-340,0
//! 0.501,15,-338,1
//! ```
//! The banner is optional. The fourth column is only present when a secondary
//! button is configured.

pub mod file_recorder;

pub use file_recorder::LogSession;

use crate::persistence::Config;
use std::path::PathBuf;

/// Candidate suffixes per pattern: `000` through `999`.
pub const MAX_FILE_INDEX: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Error creating output file `{path}`: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error creating output file: all of `{pattern}000` to `{pattern}999` already exist")]
    Exhausted { pattern: String },

    #[error("Error writing output file `{path}`: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Values a session needs from the configuration, captured at start.
#[derive(Clone, Debug, PartialEq)]
pub struct RecorderSettings {
    pub file_pattern: String,
    pub write_banner: bool,
    pub banner_comment: String,
    pub axis_magnitude: i32,
    pub sample_rate: f64,
    pub log_only_on_change: bool,
    pub secondary_configured: bool,
}

impl From<&Config> for RecorderSettings {
    fn from(config: &Config) -> Self {
        Self {
            file_pattern: config.file_pattern.clone(),
            write_banner: config.write_banner,
            banner_comment: config.banner_comment.clone(),
            axis_magnitude: config.axis_magnitude,
            sample_rate: config.sample_rate,
            log_only_on_change: config.log_only_on_change,
            secondary_configured: config.has_secondary_button(),
        }
    }
}
