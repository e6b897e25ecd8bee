//! Controller subsystem for joystick input handling
//!
//! Three pieces, polled once per UI tick:
//!
//! 1. [`gilrs_backend`] - talks to the platform gamepad API
//! 2. [`device_poller`] - scales readings and buffers button transitions
//! 3. [`trigger`] - turns trigger-button transitions into start/stop decisions
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Backend ──► DevicePoller ──► AxisReading ──► recorder / crosshair
//!                              │
//!                              └──► ButtonTransition ──► TriggerMachine
//! ```
//!
//! Everything runs on the UI thread; there is no background collection.

pub mod device_poller;
pub mod gilrs_backend;
pub mod trigger;

pub use device_poller::{DevicePoller, PollerSettings, Polling};
pub use trigger::{SecondaryLatch, TriggerDecision, TriggerMachine};

/// Unscaled device state as reported by a backend.
///
/// Axes are in `-1.0..=1.0`. Y follows the raw device convention: positive
/// means the stick is pulled towards the user (screen-down).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawState {
    pub x: f32,
    pub y: f32,
    /// Bit `n` set means button `n + 1` is held.
    pub buttons: u32,
}

/// One scaled reading, axes within `±axis_magnitude`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisReading {
    pub x: i32,
    pub y: i32,
    pub buttons: u32,
}

impl AxisReading {
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Y as shown and logged: up is positive.
    pub fn display_y(&self) -> i32 {
        -self.y
    }
}

/// A button going down or up. `button` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTransition {
    pub button: u32,
    pub pressed: bool,
}

/// Errors from device access
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("Failed to initialize joystick input: {0}")]
    InitializationError(String),

    #[error("No joystick found: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to read joystick state: {0}")]
    ReadFailure(String),
}

/// Platform access used by [`DevicePoller`].
pub trait JoystickBackend {
    /// Whether a device is currently selected.
    fn is_present(&self) -> bool;

    /// Moves every button transition the platform queued since the last call
    /// into `sink`, oldest first.
    fn collect_transitions(&mut self, sink: &mut Vec<ButtonTransition>);

    fn read_state(&mut self) -> Result<RawState, PollerError>;

    /// Searches for a device again, replacing the current selection.
    fn reacquire(&mut self) -> Result<(), PollerError>;

    /// Buttons the selected device exposes, if known.
    fn button_count(&self) -> Option<u32>;

    fn device_name(&self) -> Option<String>;
}
