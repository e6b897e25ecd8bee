//! # Joystick Monitor User Interface
//!
//! The egui shell around [`monitor::Monitor`]. Each frame it advances the
//! monitor, draws the crosshair view and the status line, and hosts the config
//! dialog and the notification windows.
//!
//! ## Layout
//! - **Central panel**: crosshair view inside a bordered frame
//! - **Bottom panel**: status message, Config and Close buttons (hidden while
//!   a recording is running or a modal is up)
//! - **Modals**: config dialog, about box and notices block the main window
//!
//! ## Timing
//! The frame loop is the only tick source. A repaint is requested after the
//! sample interval, and at least every 100 ms so button presses are picked up
//! while idle.
//!
//! ## Failures
//! Problems are queued as notices and shown one at a time. Acknowledging a
//! fatal notice closes the application.

pub mod common;
pub mod config_dialog;
pub mod crosshair;
pub mod monitor;

use eframe::egui::{self, Align, Id, Layout, Modal, Sense, ViewportCommand};
use std::collections::VecDeque;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::JoyMonError;
use crate::persistence::config_store::ConfigStore;
use crate::persistence::WindowGeometry;

use self::common::view_frame;
use self::config_dialog::{ConfigDialog, DialogOutcome, Validated};
use self::crosshair::{paint, CrosshairRenderer};
use self::monitor::{Cue, Monitor};

pub const APP_NAME: &str = "Joystick Monitor";

/// Upper bound on the repaint interval while idle.
const MAX_REPAINT_INTERVAL: Duration = Duration::from_millis(100);

/// One modal message waiting for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub text: String,
    /// Close the application once acknowledged.
    pub fatal: bool,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fatal: false,
        }
    }
}

impl From<JoyMonError> for Notice {
    fn from(error: JoyMonError) -> Self {
        Self {
            fatal: error.is_fatal(),
            text: error.to_string(),
        }
    }
}

pub struct JoyMonApp {
    monitor: Monitor,
    store: ConfigStore,
    renderer: CrosshairRenderer,
    dialog: Option<ConfigDialog>,
    notices: VecDeque<Notice>,
    /// Reference point for tick timestamps.
    epoch: Instant,
    /// A fatal error happened; stop ticking and wait for the notice to close.
    halted: bool,
}

impl JoyMonApp {
    /// `startup_notices` are problems found before the window opened.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        monitor: Monitor,
        store: ConfigStore,
        startup_notices: Vec<JoyMonError>,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Light);

        let mut app = Self {
            monitor,
            store,
            renderer: CrosshairRenderer::new(),
            dialog: None,
            notices: VecDeque::new(),
            epoch: Instant::now(),
            halted: false,
        };
        for notice in startup_notices {
            app.push_notice(notice);
        }
        app
    }

    fn push_notice(&mut self, error: JoyMonError) {
        if error.is_fatal() {
            error!("{}", error);
        } else {
            warn!("{}", error);
        }
        self.notices.push_back(Notice::from(error));
    }

    fn run_tick(&mut self) {
        match self.monitor.tick(self.epoch.elapsed()) {
            Ok(outcome) => {
                for cue in outcome.cues {
                    debug!("Cue: {:?}", cue);
                    ring_bell(cue);
                }
                for notice in outcome.notices {
                    if notice.is_fatal() {
                        self.halted = true;
                    }
                    self.push_notice(notice);
                }
            }
            Err(e) => {
                self.halted = true;
                self.push_notice(e);
            }
        }
    }

    fn apply_config(&mut self, ctx: &egui::Context, validated: Validated) {
        let Validated {
            mut config,
            warning,
        } = validated;

        if let Some(warning) = warning {
            warn!("{}", warning);
            self.notices.push_back(Notice::warning(warning));
        }

        if config.remember_window {
            if let Some(geometry) = window_geometry(ctx) {
                config.window = geometry;
            }
        }

        match self.store.save(&config) {
            Ok(()) => info!("Configuration saved to {}", self.store.path().display()),
            Err(e) => self.push_notice(JoyMonError::ConfigSaveFailure(e)),
        }

        self.monitor.apply_config(config);
    }

    fn show_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = self.dialog.as_mut() else {
            return;
        };

        match dialog.show(ctx, self.monitor.button_count()) {
            DialogOutcome::Open => {}
            DialogOutcome::Cancelled => {
                debug!("Config dialog cancelled");
                self.dialog = None;
            }
            DialogOutcome::Confirmed(validated) => {
                self.dialog = None;
                self.apply_config(ctx, validated);
            }
        }
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.notices.front() else {
            return;
        };

        let response = Modal::new(Id::new("notice")).show(ctx, |ui| {
            ui.set_max_width(260.0);
            ui.heading(APP_NAME);
            ui.label(&notice.text);
            ui.button("OK").clicked()
        });
        let acknowledged = response.inner || response.should_close();

        if acknowledged {
            if let Some(notice) = self.notices.pop_front() {
                if notice.fatal {
                    info!("Closing after fatal error");
                    ctx.send_viewport_cmd(ViewportCommand::Close);
                }
            }
        }
    }
}

impl eframe::App for JoyMonApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let interval = self
            .monitor
            .config()
            .tick_interval()
            .min(MAX_REPAINT_INTERVAL);
        ctx.request_repaint_after(interval);

        if !self.halted {
            self.monitor.block_starts(self.dialog.is_some());
            self.run_tick();
        }

        egui::TopBottomPanel::bottom("status_panel")
            .show_separator_line(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(self.monitor.message());

                    if self.monitor.is_logging()
                        || self.dialog.is_some()
                        || !self.notices.is_empty()
                    {
                        return;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.button("Close").clicked() {
                            info!("Close requested");
                            ctx.send_viewport_cmd(ViewportCommand::Close);
                        }
                        if ui.button("Config").clicked() {
                            self.dialog = Some(ConfigDialog::new(self.monitor.config()));
                        }
                    });
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            view_frame().show(ui, |ui| {
                let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::hover());
                let commands = self.renderer.render(
                    response.rect.size(),
                    self.monitor.reading(),
                    self.monitor.is_logging(),
                    self.monitor.config(),
                );
                paint(&painter, response.rect, &commands);
            });
        });

        self.show_dialog(ctx);
        self.show_notice(ctx);
    }
}

/// Outer position and inner size of the main window, when the backend reports them.
fn window_geometry(ctx: &egui::Context) -> Option<WindowGeometry> {
    ctx.input(|i| {
        let viewport = i.viewport();
        let outer = viewport.outer_rect?;
        let inner = viewport.inner_rect?;
        Some(WindowGeometry {
            x: outer.min.x.round() as i32,
            y: outer.min.y.round() as i32,
            width: inner.width().round() as i32,
            height: inner.height().round() as i32,
        })
    })
}

/// Terminal bell as the audible cue.
fn ring_bell(cue: Cue) {
    let mut stderr = std::io::stderr();
    if let Err(e) = stderr.write_all(b"\x07").and_then(|_| stderr.flush()) {
        debug!("Bell for {:?} failed: {}", cue, e);
    }
}
