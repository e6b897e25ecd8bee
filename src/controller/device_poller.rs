use statum::{machine, state};
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

use super::{AxisReading, ButtonTransition, JoystickBackend, PollerError, RawState};
use crate::persistence::{AxisSuppression, Config, MAX_BUTTONS};

/// Transitions kept between drains before the oldest are dropped.
pub const EVENT_BUFFER_CAPACITY: usize = 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct PollerSettings {
    pub axis_magnitude: i32,
    pub suppression: AxisSuppression,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            axis_magnitude: 1000,
            suppression: AxisSuppression::None,
        }
    }
}

impl From<&Config> for PollerSettings {
    fn from(config: &Config) -> Self {
        Self {
            axis_magnitude: config.axis_magnitude,
            suppression: config.suppress_axis,
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum PollerState {
    Acquiring,
    Polling,
}

#[machine]
pub struct DevicePoller<S: PollerState> {
    backend: Box<dyn JoystickBackend>,

    settings: PollerSettings,

    // Transitions collected but not yet drained
    pending: VecDeque<ButtonTransition>,
}

impl<S: PollerState> DevicePoller<S> {
    pub fn update_settings(&mut self, settings: PollerSettings) {
        debug!("Poller settings updated: {:?}", settings);
        self.settings = settings;
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }
}

impl DevicePoller<Acquiring> {
    pub fn create(backend: Box<dyn JoystickBackend>, settings: PollerSettings) -> Self {
        debug!("Creating DevicePoller with settings: {:?}", settings);
        Self::new(backend, settings, VecDeque::new())
    }

    /// Makes sure a device is selected and starts polling.
    ///
    /// A missing joystick is not fatal: the poller keeps running and reports
    /// neutral readings so the display stays usable.
    pub fn acquire(mut self) -> DevicePoller<Polling> {
        if !self.backend.is_present() {
            if let Err(e) = self.backend.reacquire() {
                warn!("{}, continuing with neutral readings", e);
            }
        }

        match self.backend.device_name() {
            Some(name) => info!("Polling joystick: {}", name),
            None => warn!("No joystick connected, continuing in idle mode"),
        }

        self.transition()
    }
}

impl DevicePoller<Polling> {
    pub fn is_present(&self) -> bool {
        self.backend.is_present()
    }

    pub fn device_name(&self) -> Option<String> {
        self.backend.device_name()
    }

    /// Buttons the device reports, or the maximum when nothing is connected.
    pub fn button_count(&self) -> u32 {
        self.backend.button_count().unwrap_or(MAX_BUTTONS)
    }

    /// Reads the current axes and buttons.
    ///
    /// On a failed read the device is re-acquired and the read retried once;
    /// a second failure is returned as [`PollerError::ReadFailure`].
    pub fn poll(&mut self) -> Result<AxisReading, PollerError> {
        self.collect();

        if !self.backend.is_present() {
            return Ok(AxisReading::neutral());
        }

        let raw = match self.backend.read_state() {
            Ok(raw) => raw,
            Err(first) => {
                warn!("Joystick read failed ({}), re-acquiring", first);
                self.backend
                    .reacquire()
                    .and_then(|_| self.backend.read_state())
                    .map_err(|e| {
                        error!("Joystick read failed after re-acquire: {}", e);
                        PollerError::ReadFailure(e.to_string())
                    })?
            }
        };

        Ok(self.scale(raw))
    }

    /// Returns every button transition since the previous call, oldest first.
    pub fn drain_events(&mut self) -> Vec<ButtonTransition> {
        self.collect();
        self.pending.drain(..).collect()
    }

    fn collect(&mut self) {
        let mut fresh = Vec::new();
        self.backend.collect_transitions(&mut fresh);

        for transition in fresh {
            if self.pending.len() == EVENT_BUFFER_CAPACITY {
                warn!("Button event buffer full, dropping oldest event");
                self.pending.pop_front();
            }
            debug!("Queued button transition: {:?}", transition);
            self.pending.push_back(transition);
        }
    }

    fn scale(&self, raw: RawState) -> AxisReading {
        // A non-positive magnitude would invert the clamp bounds
        let magnitude = self.settings.axis_magnitude.max(1);
        let scale_axis = |value: f32| -> i32 {
            let scaled = (value as f64 * magnitude as f64).round() as i64;
            scaled.clamp(-(magnitude as i64), magnitude as i64) as i32
        };

        let mut reading = AxisReading {
            x: scale_axis(raw.x),
            y: scale_axis(raw.y),
            buttons: raw.buttons,
        };

        match self.settings.suppression {
            AxisSuppression::X => reading.x = 0,
            AxisSuppression::Y => reading.y = 0,
            AxisSuppression::None => {}
        }

        reading
    }
}
