use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use tracing::{debug, error, info, warn};

use super::{ButtonTransition, JoystickBackend, PollerError, RawState};

/// Button numbering exposed to the user, 1-based in this order.
const BUTTON_ORDER: [Button; 19] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::Mode,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
    Button::C,
    Button::Z,
];

/// Joystick access through gilrs, following the first connected gamepad.
pub struct GilrsBackend {
    gilrs: Gilrs,
    active_gamepad: Option<GamepadId>,
}

impl GilrsBackend {
    pub fn new() -> Result<Self, PollerError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(PollerError::InitializationError(e.to_string()));
            }
        };

        let active_gamepad = find_first_gamepad(&gilrs);
        Ok(Self {
            gilrs,
            active_gamepad,
        })
    }
}

/// Picks the first connected gamepad, if any.
pub fn find_first_gamepad(gilrs: &Gilrs) -> Option<GamepadId> {
    let mut found = None;
    for (id, gamepad) in gilrs.gamepads() {
        debug!("  ID: {}, Name: {}, UUID: {:?}", id, gamepad.name(), gamepad.uuid());
        if found.is_none() && gamepad.is_connected() {
            found = Some(id);
        }
    }
    found
}

/// 1-based index of a gilrs button, if it is one we number.
pub fn button_index(button: Button) -> Option<u32> {
    BUTTON_ORDER
        .iter()
        .position(|candidate| *candidate == button)
        .map(|idx| idx as u32 + 1)
}

impl JoystickBackend for GilrsBackend {
    fn is_present(&self) -> bool {
        self.active_gamepad.is_some()
    }

    fn collect_transitions(&mut self, sink: &mut Vec<ButtonTransition>) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if self.active_gamepad.is_none() {
                if let EventType::Connected = event {
                    info!("Joystick connected, selecting {}", id);
                    self.active_gamepad = Some(id);
                }
            }
            if self.active_gamepad != Some(id) {
                continue;
            }

            match event {
                EventType::ButtonPressed(button, _) => {
                    if let Some(index) = button_index(button) {
                        sink.push(ButtonTransition {
                            button: index,
                            pressed: true,
                        });
                    }
                }
                EventType::ButtonReleased(button, _) => {
                    if let Some(index) = button_index(button) {
                        sink.push(ButtonTransition {
                            button: index,
                            pressed: false,
                        });
                    }
                }
                EventType::Disconnected => {
                    warn!("Joystick {} disconnected", id);
                }
                _ => {}
            }
        }
    }

    fn read_state(&mut self) -> Result<RawState, PollerError> {
        let id = self
            .active_gamepad
            .ok_or_else(|| PollerError::DeviceUnavailable("no gamepad selected".to_string()))?;
        let gamepad = self
            .gilrs
            .connected_gamepad(id)
            .ok_or_else(|| PollerError::ReadFailure(format!("gamepad {} is not connected", id)))?;

        let mut buttons = 0u32;
        for (idx, button) in BUTTON_ORDER.iter().enumerate() {
            if gamepad.is_pressed(*button) {
                buttons |= 1 << idx;
            }
        }

        // gilrs reports up as positive; the raw convention is screen-down.
        Ok(RawState {
            x: gamepad.value(Axis::LeftStickX),
            y: -gamepad.value(Axis::LeftStickY),
            buttons,
        })
    }

    fn reacquire(&mut self) -> Result<(), PollerError> {
        self.active_gamepad = find_first_gamepad(&self.gilrs);
        match self.active_gamepad {
            Some(id) => {
                info!("Re-acquired joystick {}", id);
                Ok(())
            }
            None => Err(PollerError::DeviceUnavailable(
                "no connected gamepad".to_string(),
            )),
        }
    }

    fn button_count(&self) -> Option<u32> {
        self.active_gamepad.map(|_| BUTTON_ORDER.len() as u32)
    }

    fn device_name(&self) -> Option<String> {
        let id = self.active_gamepad?;
        self.gilrs
            .connected_gamepad(id)
            .map(|gamepad| gamepad.name().to_string())
    }
}
