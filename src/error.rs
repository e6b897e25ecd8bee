use crate::controller::PollerError;
use crate::persistence::ConfigError;
use crate::recorder::RecorderError;

/// Failures the user gets told about.
///
/// Wraps the per-module errors. [`JoyMonError::is_fatal`] tells the UI whether
/// the application closes once the notification is acknowledged.
#[derive(Debug, thiserror::Error)]
pub enum JoyMonError {
    /// No joystick found at startup. The display keeps running with neutral readings.
    #[error("Joystick not found. The display stays centred until one is connected. ({0})")]
    DeviceUnavailable(#[source] PollerError),

    #[error("Error reading input state. The monitor will now exit. ({0})")]
    DeviceReadFailure(#[source] PollerError),

    #[error("Problems reading the config. Restored config may be incomplete. ({0})")]
    ConfigLoadFailure(#[source] ConfigError),

    #[error("Problems writing the config. Saved config may be incomplete. ({0})")]
    ConfigSaveFailure(#[source] ConfigError),

    #[error("{0}")]
    FileCreateFailure(#[source] RecorderError),

    #[error("Error writing output file. The monitor will now exit. ({0})")]
    FileWriteFailure(#[source] RecorderError),
}

impl JoyMonError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JoyMonError::DeviceReadFailure(_) | JoyMonError::FileWriteFailure(_)
        )
    }
}
