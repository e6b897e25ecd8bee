//! Per-frame monitor logic without any egui types.
//!
//! [`Monitor::tick`] is called once per repaint. It polls the device, feeds
//! button transitions through the trigger machine, opens and closes recording
//! sessions and writes samples when they are due. The app shell only renders
//! the result and shows notices.

use chrono::Local;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::controller::{
    AxisReading, ButtonTransition, DevicePoller, PollerSettings, Polling, SecondaryLatch,
    TriggerDecision, TriggerMachine,
};
use crate::error::JoyMonError;
use crate::persistence::Config;
use crate::recorder::{LogSession, RecorderSettings};

/// Audible feedback the shell should give.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    SessionStarted,
    SessionStopped,
    SecondaryPressed,
}

/// What happened during one tick.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub cues: Vec<Cue>,
    /// Non-fatal problems to show the user.
    pub notices: Vec<JoyMonError>,
}

pub struct Monitor {
    config: Config,
    poller: DevicePoller<Polling>,
    trigger: TriggerMachine,
    secondary: SecondaryLatch,
    session: Option<LogSession>,
    next_sample: Duration,
    reading: AxisReading,
    message: String,
    read_failure_logged: bool,
    /// Set while the config is being edited.
    starts_blocked: bool,
}

impl Monitor {
    pub fn new(config: Config, mut poller: DevicePoller<Polling>) -> Self {
        poller.update_settings(PollerSettings::from(&config));
        let message = config.start_prompt();
        Self {
            config,
            poller,
            trigger: TriggerMachine::new(),
            secondary: SecondaryLatch::default(),
            session: None,
            next_sample: Duration::ZERO,
            reading: AxisReading::neutral(),
            message,
            read_failure_logged: false,
            starts_blocked: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Latest scaled reading.
    pub fn reading(&self) -> AxisReading {
        self.reading
    }

    pub fn is_logging(&self) -> bool {
        self.session.is_some()
    }

    /// Status line shown under the view.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn button_count(&self) -> u32 {
        self.poller.button_count()
    }

    /// While blocked, trigger presses cannot open a new session.
    pub fn block_starts(&mut self, blocked: bool) {
        self.starts_blocked = blocked;
    }

    /// Replaces the configuration. A running session keeps the settings it
    /// was started with.
    pub fn apply_config(&mut self, config: Config) {
        self.poller.update_settings(PollerSettings::from(&config));
        self.config = config;
        if !self.is_logging() {
            self.message = self.config.start_prompt();
        }
    }

    /// Advances the monitor to `now`, measured from an arbitrary fixed epoch.
    ///
    /// Returns an error only for failures that end the application.
    pub fn tick(&mut self, now: Duration) -> Result<TickOutcome, JoyMonError> {
        let mut outcome = TickOutcome::default();

        self.reading = match self.poller.poll() {
            Ok(reading) => {
                self.read_failure_logged = false;
                reading
            }
            Err(e) if self.is_logging() => {
                self.abandon_session();
                return Err(JoyMonError::DeviceReadFailure(e));
            }
            Err(e) => {
                if !self.read_failure_logged {
                    warn!("Joystick read failed while idle: {}", e);
                    self.read_failure_logged = true;
                }
                AxisReading::neutral()
            }
        };

        for transition in self.poller.drain_events() {
            self.handle_transition(transition, now, &mut outcome);
        }

        if self.is_logging() && now >= self.next_sample {
            self.write_sample(now)?;
        }

        Ok(outcome)
    }

    fn handle_transition(
        &mut self,
        transition: ButtonTransition,
        now: Duration,
        outcome: &mut TickOutcome,
    ) {
        if transition.button == self.config.trigger_button {
            let logging = self.is_logging();
            match self.trigger.on_transition(transition.pressed, now, logging) {
                TriggerDecision::StartSession if self.starts_blocked => {
                    debug!("Trigger ignored while the config dialog is open");
                }
                TriggerDecision::StartSession => self.start_session(now, outcome),
                TriggerDecision::StopSession => self.stop_session(outcome),
                TriggerDecision::Ignore => {}
            }
        } else if self.config.has_secondary_button()
            && transition.button == self.config.secondary_button
            && self.secondary.on_transition(transition.pressed)
            && self.config.sound_feedback
        {
            outcome.cues.push(Cue::SecondaryPressed);
        }
    }

    fn start_session(&mut self, now: Duration, outcome: &mut TickOutcome) {
        match LogSession::start(RecorderSettings::from(&self.config), Local::now()) {
            Ok(session) => {
                self.message = if self.config.show_filename {
                    format!("Writing to {}", session.path().display())
                } else {
                    String::new()
                };
                // Presses made before the session do not mark its first sample
                self.secondary.take();
                self.next_sample = now;
                self.session = Some(session);
                outcome.cues.push(Cue::SessionStarted);
            }
            Err(e) => {
                error!("Could not start recording: {}", e);
                outcome.notices.push(JoyMonError::FileCreateFailure(e));
            }
        }
    }

    fn stop_session(&mut self, outcome: &mut TickOutcome) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.stop() {
                outcome.notices.push(JoyMonError::FileWriteFailure(e));
            }
        }
        self.message = self.config.start_prompt();
        outcome.cues.push(Cue::SessionStopped);
    }

    fn write_sample(&mut self, now: Duration) -> Result<(), JoyMonError> {
        let flag = self.secondary.take();
        let AxisReading { x, y, .. } = self.reading;

        if let Some(session) = self.session.as_mut() {
            let elapsed = session.elapsed();
            if let Err(e) = session.write_sample(elapsed, x, y, flag) {
                self.abandon_session();
                return Err(JoyMonError::FileWriteFailure(e));
            }
        }

        let interval = self.config.tick_interval();
        self.next_sample += interval;
        if self.next_sample <= now {
            self.next_sample = now + interval;
        }
        Ok(())
    }

    /// Closes the session without reporting flush errors; used when the
    /// application is about to exit on another failure.
    fn abandon_session(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.stop() {
                warn!("Closing output file failed: {}", e);
            }
        }
        self.message = self.config.start_prompt();
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if self.session.is_some() {
            info!("Closing recording on exit");
            self.abandon_session();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::device_poller::tests::{poller, raw, shared, FakeBackend};
    use crate::controller::{PollerError, RawState};
    use crate::recorder::file_recorder::tests::full_disk_session;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fs;
    use std::rc::Rc;

    type Reads = Rc<RefCell<VecDeque<Result<RawState, PollerError>>>>;
    type Presses = Rc<RefCell<Vec<ButtonTransition>>>;

    fn setup(config: Config) -> (Monitor, Reads, Presses) {
        let reads: Reads = shared(VecDeque::new());
        let presses: Presses = shared(Vec::new());
        let backend = FakeBackend {
            present: true,
            reads: reads.clone(),
            transitions: presses.clone(),
            ..FakeBackend::default()
        };
        let poller = poller(backend, PollerSettings::from(&config));
        (Monitor::new(config, poller), reads, presses)
    }

    fn config_in(dir: &tempfile::TempDir) -> Config {
        Config {
            file_pattern: dir.path().join("run").to_string_lossy().into_owned(),
            write_banner: false,
            secondary_button: 0,
            ..Config::default()
        }
    }

    fn click(presses: &Presses, button: u32) {
        presses.borrow_mut().extend([
            ButtonTransition {
                button,
                pressed: true,
            },
            ButtonTransition {
                button,
                pressed: false,
            },
        ]);
    }

    fn secs(value: f64) -> Duration {
        Duration::from_secs_f64(value)
    }

    #[test]
    fn trigger_starts_and_double_press_stops() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let trigger = config.trigger_button;
        let (mut monitor, reads, presses) = setup(config);

        assert_eq!(monitor.message(), "Click button 7 to start");

        reads.borrow_mut().push_back(raw(0.5, 0.25));
        click(&presses, trigger);
        let outcome = monitor.tick(secs(10.0)).unwrap();
        assert_eq!(outcome.cues, vec![Cue::SessionStarted]);
        assert!(monitor.is_logging());
        let path = dir.path().join("run000");
        assert_eq!(monitor.message(), format!("Writing to {}", path.display()));

        click(&presses, trigger);
        monitor.tick(secs(12.5)).unwrap();
        assert!(monitor.is_logging());

        click(&presses, trigger);
        let outcome = monitor.tick(secs(13.0)).unwrap();
        assert_eq!(outcome.cues, vec![Cue::SessionStopped]);
        assert!(!monitor.is_logging());
        assert_eq!(monitor.message(), "Click button 7 to start");

        let contents = fs::read_to_string(path).unwrap();
        let first = contents.lines().next().unwrap();
        assert!(first.ends_with(",500,-250"), "unexpected line {first}");
    }

    #[test]
    fn unchanged_samples_are_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            log_only_on_change: true,
            ..config_in(&dir)
        };
        let trigger = config.trigger_button;
        let (mut monitor, _reads, presses) = setup(config);

        click(&presses, trigger);
        for step in 0..10 {
            monitor.tick(secs(5.0 + step as f64)).unwrap();
        }
        drop(monitor);

        let contents = fs::read_to_string(dir.path().join("run000")).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn secondary_press_marks_next_sample() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            sound_feedback: true,
            secondary_button: 1,
            ..config_in(&dir)
        };
        let (trigger, secondary) = (config.trigger_button, config.secondary_button);
        let (mut monitor, _reads, presses) = setup(config);

        click(&presses, trigger);
        monitor.tick(secs(5.0)).unwrap();
        click(&presses, secondary);
        let outcome = monitor.tick(secs(5.5)).unwrap();
        assert_eq!(outcome.cues, vec![Cue::SecondaryPressed]);
        monitor.tick(secs(6.0)).unwrap();
        drop(monitor);

        let contents = fs::read_to_string(dir.path().join("run000")).unwrap();
        let flags: Vec<&str> = contents
            .lines()
            .map(|line| line.rsplit(',').next().unwrap())
            .collect();
        assert_eq!(flags, vec!["0", "1", "0"]);
    }

    #[test]
    fn file_create_failure_is_reported_and_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            file_pattern: dir
                .path()
                .join("missing")
                .join("run")
                .to_string_lossy()
                .into_owned(),
            ..Config::default()
        };
        let trigger = config.trigger_button;
        let (mut monitor, _reads, presses) = setup(config);

        click(&presses, trigger);
        let outcome = monitor.tick(secs(5.0)).unwrap();
        assert!(!monitor.is_logging());
        assert!(outcome.cues.is_empty());
        assert!(matches!(
            outcome.notices.as_slice(),
            [JoyMonError::FileCreateFailure(_)]
        ));
    }

    #[test]
    fn read_failure_ends_a_running_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let trigger = config.trigger_button;
        let (mut monitor, reads, presses) = setup(config);

        click(&presses, trigger);
        monitor.tick(secs(5.0)).unwrap();
        assert!(monitor.is_logging());

        // Reacquire is not allowed by the fake, so the retry fails too.
        reads
            .borrow_mut()
            .push_back(Err(PollerError::ReadFailure("unplugged".to_string())));
        let err = monitor.tick(secs(5.5)).unwrap_err();
        assert!(matches!(err, JoyMonError::DeviceReadFailure(_)));
        assert!(err.is_fatal());
        assert!(!monitor.is_logging());
    }

    #[test]
    fn write_failure_ends_the_session_and_is_fatal() {
        let config = Config {
            secondary_button: 0,
            ..Config::default()
        };
        let settings = RecorderSettings::from(&config);
        let (mut monitor, _reads, _presses) = setup(config);
        monitor.session = Some(full_disk_session(settings));
        monitor.next_sample = secs(1.0);

        let err = monitor.tick(secs(1.0)).unwrap_err();
        assert!(matches!(err, JoyMonError::FileWriteFailure(_)));
        assert!(err.is_fatal());
        assert!(!monitor.is_logging());
        assert_eq!(monitor.message(), "Click button 7 to start");
    }

    #[test]
    fn blocked_trigger_does_not_start_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let trigger = config.trigger_button;
        let (mut monitor, _reads, presses) = setup(config);

        monitor.block_starts(true);
        click(&presses, trigger);
        let outcome = monitor.tick(secs(5.0)).unwrap();
        assert!(outcome.cues.is_empty());
        assert!(!monitor.is_logging());
        assert!(!dir.path().join("run000").exists());

        monitor.block_starts(false);
        click(&presses, trigger);
        monitor.tick(secs(8.0)).unwrap();
        assert!(monitor.is_logging());
    }

    #[test]
    fn read_failure_while_idle_reads_neutral() {
        let (mut monitor, reads, _presses) = setup(Config::default());
        reads.borrow_mut().push_back(raw(1.0, 1.0));
        monitor.tick(secs(1.0)).unwrap();
        assert_eq!(monitor.reading().x, 1000);

        reads
            .borrow_mut()
            .push_back(Err(PollerError::ReadFailure("glitch".to_string())));
        monitor.tick(secs(1.1)).unwrap();
        assert_eq!(monitor.reading(), AxisReading::neutral());
    }
}
