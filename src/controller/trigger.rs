//! Start/stop detection for the trigger button, plus the secondary-button latch.
//!
//! A single press starts a recording. Stopping takes two presses no more than
//! [`DOUBLE_PRESS_WINDOW`] apart, once the recording has run for
//! [`MIN_SESSION_AGE`]. After any press, a new recording cannot start until
//! [`RETRIGGER_LOCKOUT`] has passed, so the tail of a stop gesture never
//! reopens a file.
//!
//! Times are offsets from an arbitrary fixed origin (the app start).

use std::time::Duration;
use tracing::{debug, info};

pub const RETRIGGER_LOCKOUT: Duration = Duration::from_secs(3);
pub const MIN_SESSION_AGE: Duration = Duration::from_secs(2);
pub const DOUBLE_PRESS_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Latch {
    Idle,
    ArmedDown,
}

/// What the caller should do after a trigger transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Ignore,
    StartSession,
    StopSession,
}

#[derive(Debug, Clone)]
pub struct TriggerMachine {
    latch: Latch,
    last_click: Option<Duration>,
    session_started: Option<Duration>,
}

impl Default for TriggerMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerMachine {
    pub fn new() -> Self {
        Self {
            latch: Latch::Idle,
            last_click: None,
            session_started: None,
        }
    }

    pub fn is_held(&self) -> bool {
        self.latch == Latch::ArmedDown
    }

    /// Feeds one trigger-button transition.
    ///
    /// `logging` is whether a session is currently open. A `StartSession`
    /// decision may still fail on the caller's side; the machine does not need
    /// to hear about it, the session simply stays closed.
    pub fn on_transition(&mut self, pressed: bool, now: Duration, logging: bool) -> TriggerDecision {
        match (self.latch, pressed) {
            (Latch::Idle, true) => {
                self.latch = Latch::ArmedDown;
                let decision = self.decide(now, logging);
                self.last_click = Some(now);
                decision
            }
            (Latch::ArmedDown, false) => {
                self.latch = Latch::Idle;
                TriggerDecision::Ignore
            }
            _ => TriggerDecision::Ignore,
        }
    }

    fn decide(&mut self, now: Duration, logging: bool) -> TriggerDecision {
        let since_click = self.last_click.map(|last| now.saturating_sub(last));

        if !logging {
            if since_click.map_or(true, |gap| gap >= RETRIGGER_LOCKOUT) {
                info!("Trigger pressed at {:.3}s, starting session", now.as_secs_f64());
                self.session_started = Some(now);
                return TriggerDecision::StartSession;
            }
            debug!("Trigger press inside re-trigger lockout, ignored");
            return TriggerDecision::Ignore;
        }

        let age = self
            .session_started
            .map(|started| now.saturating_sub(started))
            .unwrap_or(Duration::MAX);
        if age >= MIN_SESSION_AGE && since_click.is_some_and(|gap| gap <= DOUBLE_PRESS_WINDOW) {
            info!("Double press at {:.3}s, stopping session", now.as_secs_f64());
            self.session_started = None;
            return TriggerDecision::StopSession;
        }

        debug!("Trigger press during session, waiting for a second press");
        TriggerDecision::Ignore
    }
}

/// Remembers a secondary-button press until the next sample consumes it.
#[derive(Debug, Clone, Default)]
pub struct SecondaryLatch {
    pending: bool,
}

impl SecondaryLatch {
    /// Records a transition. Returns `true` when a press was latched.
    pub fn on_transition(&mut self, pressed: bool) -> bool {
        if pressed {
            self.pending = true;
        }
        pressed
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns the flag and clears it.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    /// Press and release at `t`, returning the press decision.
    fn click(machine: &mut TriggerMachine, t: f64, logging: bool) -> TriggerDecision {
        let decision = machine.on_transition(true, at(t), logging);
        machine.on_transition(false, at(t + 0.05), logging);
        decision
    }

    #[test]
    fn first_press_starts() {
        let mut machine = TriggerMachine::new();
        assert_eq!(click(&mut machine, 0.0, false), TriggerDecision::StartSession);
    }

    #[test]
    fn double_press_after_two_seconds_stops() {
        let mut machine = TriggerMachine::new();
        assert_eq!(click(&mut machine, 0.0, false), TriggerDecision::StartSession);
        assert_eq!(click(&mut machine, 2.5, true), TriggerDecision::Ignore);
        assert_eq!(click(&mut machine, 3.0, true), TriggerDecision::StopSession);
    }

    #[test]
    fn presses_too_far_apart_do_not_stop() {
        let mut machine = TriggerMachine::new();
        click(&mut machine, 0.0, false);
        assert_eq!(click(&mut machine, 2.5, true), TriggerDecision::Ignore);
        assert_eq!(click(&mut machine, 4.0, true), TriggerDecision::Ignore);
    }

    #[test]
    fn second_press_exactly_one_second_later_stops() {
        let mut machine = TriggerMachine::new();
        click(&mut machine, 0.0, false);
        assert_eq!(click(&mut machine, 1.5, true), TriggerDecision::Ignore);
        assert_eq!(click(&mut machine, 2.5, true), TriggerDecision::StopSession);
    }

    #[test]
    fn session_exactly_two_seconds_old_can_stop() {
        let mut machine = TriggerMachine::new();
        click(&mut machine, 0.0, false);
        assert_eq!(click(&mut machine, 1.5, true), TriggerDecision::Ignore);
        assert_eq!(click(&mut machine, 2.0, true), TriggerDecision::StopSession);
    }

    #[test]
    fn double_press_in_young_session_is_ignored() {
        let mut machine = TriggerMachine::new();
        click(&mut machine, 0.0, false);
        assert_eq!(click(&mut machine, 1.0, true), TriggerDecision::Ignore);
        assert_eq!(click(&mut machine, 1.5, true), TriggerDecision::Ignore);
    }

    #[test]
    fn restart_lockout_is_three_seconds() {
        let mut machine = TriggerMachine::new();
        click(&mut machine, 0.0, false);
        click(&mut machine, 2.5, true);
        assert_eq!(click(&mut machine, 3.0, true), TriggerDecision::StopSession);

        assert_eq!(click(&mut machine, 5.9, false), TriggerDecision::Ignore);
        // The rejected press resets the lockout clock.
        assert_eq!(click(&mut machine, 9.0, false), TriggerDecision::StartSession);
    }

    #[test]
    fn restart_exactly_three_seconds_after_stop_is_accepted() {
        let mut machine = TriggerMachine::new();
        click(&mut machine, 0.0, false);
        click(&mut machine, 2.5, true);
        click(&mut machine, 3.0, true);
        assert_eq!(click(&mut machine, 6.0, false), TriggerDecision::StartSession);
    }

    #[test]
    fn restart_at_two_point_nine_seconds_is_rejected() {
        let mut machine = TriggerMachine::new();
        click(&mut machine, 0.0, false);
        click(&mut machine, 2.5, true);
        click(&mut machine, 3.0, true);
        assert_eq!(click(&mut machine, 5.9, false), TriggerDecision::Ignore);
    }

    #[test]
    fn press_while_held_is_ignored() {
        let mut machine = TriggerMachine::new();
        assert_eq!(
            machine.on_transition(true, at(0.0), false),
            TriggerDecision::StartSession
        );
        assert!(machine.is_held());
        assert_eq!(
            machine.on_transition(true, at(5.0), true),
            TriggerDecision::Ignore
        );
        machine.on_transition(false, at(5.1), true);
        assert!(!machine.is_held());
    }

    #[test]
    fn failed_start_leaves_machine_ready_after_lockout() {
        let mut machine = TriggerMachine::new();
        assert_eq!(click(&mut machine, 0.0, false), TriggerDecision::StartSession);
        // Caller could not open a file, so the next press still sees NotLogging.
        assert_eq!(click(&mut machine, 3.0, false), TriggerDecision::StartSession);
    }

    #[test]
    fn secondary_latch_is_consumed_once() {
        let mut latch = SecondaryLatch::default();
        assert!(!latch.take());
        assert!(latch.on_transition(true));
        assert!(!latch.on_transition(false));
        assert!(latch.is_pending());
        assert!(latch.take());
        assert!(!latch.take());
    }
}
