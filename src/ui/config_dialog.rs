use eframe::egui::{self, Color32, Id, Modal, TextEdit, Ui};
use tracing::{debug, info, warn};

use super::common::form_row;
use super::APP_NAME;
use crate::persistence::{
    truncated, AxisSuppression, Config, ConfigError, BANNER_COMMENT_MAX, FILE_PATTERN_MAX,
    LABEL_MAX, MAX_SAMPLE_RATE, POINTER_SIZE_MAX,
};

/// Editable copy of the configuration.
///
/// Flags, strings and the suppression choice are edited in place; numeric
/// fields are kept as text until the dialog is confirmed.
#[derive(Debug, Clone)]
pub struct ConfigDraft {
    pub config: Config,
    pub sample_rate: String,
    pub trigger_button: String,
    pub secondary_button: String,
    pub axis_magnitude: String,
    pub pointer_size: String,
}

/// A draft that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub config: Config,
    /// Set when a value had to be adjusted.
    pub warning: Option<String>,
}

impl ConfigDraft {
    pub fn from_config(config: &Config) -> Self {
        Self {
            config: config.clone(),
            sample_rate: config.sample_rate.to_string(),
            trigger_button: config.trigger_button.to_string(),
            secondary_button: config.secondary_button.to_string(),
            axis_magnitude: config.axis_magnitude.to_string(),
            pointer_size: config.pointer_size.to_string(),
        }
    }

    /// Checks the numeric fields in dialog order and returns the first problem.
    ///
    /// `button_count` is the number of buttons on the current device.
    pub fn validate(&self, button_count: u32) -> Result<Validated, ConfigError> {
        let mut config = self.config.clone();
        let mut warning = None;

        let rate = self
            .sample_rate
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "Ticks per second must be a floating point number greater than zero."
                        .to_string(),
                )
            })?;
        if rate > MAX_SAMPLE_RATE {
            warning = Some(format!(
                "Warning: Your clock cannot exceed {} ticks per second.",
                MAX_SAMPLE_RATE
            ));
            config.sample_rate = MAX_SAMPLE_RATE;
        } else {
            config.sample_rate = rate;
        }

        config.trigger_button = parse_int(&self.trigger_button)
            .filter(|button| (1..=button_count as i64).contains(button))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "Joystick button to start & stop writing must be between 1 and {} inclusive",
                    button_count
                ))
            })? as u32;

        config.secondary_button = parse_int(&self.secondary_button)
            .filter(|button| (0..=button_count as i64).contains(button))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "Joystick button to monitor must be between 0 and {} inclusive",
                    button_count
                ))
            })? as u32;

        if config.trigger_button == config.secondary_button {
            return Err(ConfigError::Invalid(
                "The button to start & stop writing cannot be the same as the button to monitor"
                    .to_string(),
            ));
        }

        config.axis_magnitude = parse_int(&self.axis_magnitude)
            .filter(|magnitude| *magnitude > 0 && *magnitude <= i32::MAX as i64)
            .ok_or_else(|| {
                ConfigError::Invalid("Axis magnitude must be greater than zero.".to_string())
            })? as i32;

        config.pointer_size = parse_int(&self.pointer_size)
            .filter(|size| (1..=POINTER_SIZE_MAX as i64).contains(size))
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "Pointer size (the radius) must be between 1 and 50 inclusive.".to_string(),
                )
            })? as u32;

        config.file_pattern = truncated(config.file_pattern, FILE_PATTERN_MAX);
        config.banner_comment = truncated(config.banner_comment, BANNER_COMMENT_MAX);
        config.label_pos_x = truncated(config.label_pos_x, LABEL_MAX);
        config.label_neg_x = truncated(config.label_neg_x, LABEL_MAX);
        config.label_pos_y = truncated(config.label_pos_y, LABEL_MAX);
        config.label_neg_y = truncated(config.label_neg_y, LABEL_MAX);

        Ok(Validated { config, warning })
    }
}

fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

#[derive(Debug)]
pub enum DialogOutcome {
    Open,
    Cancelled,
    Confirmed(Validated),
}

/// Modal editor for every configuration field, with an about box.
pub struct ConfigDialog {
    draft: ConfigDraft,
    error: Option<String>,
    show_about: bool,
}

impl ConfigDialog {
    pub fn new(config: &Config) -> Self {
        debug!("Opening config dialog");
        Self {
            draft: ConfigDraft::from_config(config),
            error: None,
            show_about: false,
        }
    }

    /// Escape or a click outside the dialog counts as Cancel.
    pub fn show(&mut self, ctx: &egui::Context, button_count: u32) -> DialogOutcome {
        let mut outcome = DialogOutcome::Open;

        let response = Modal::new(Id::new("config_dialog")).show(ctx, |ui| {
            ui.set_width(320.0);
            ui.heading("Configuration");
            self.render_fields(ui);

            if let Some(error) = &self.error {
                ui.colored_label(Color32::RED, error);
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("OK").clicked() {
                    match self.draft.validate(button_count) {
                        Ok(validated) => {
                            info!("Configuration accepted");
                            outcome = DialogOutcome::Confirmed(validated);
                        }
                        Err(e) => {
                            warn!("Configuration rejected: {}", e);
                            self.error = Some(e.to_string());
                        }
                    }
                }
                if ui.button("Cancel").clicked() {
                    outcome = DialogOutcome::Cancelled;
                }
                if ui.button("About").clicked() {
                    self.show_about = true;
                }
            });
        });

        if self.show_about {
            let about = Modal::new(Id::new("about_box")).show(ctx, |ui| {
                ui.heading(APP_NAME);
                ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                ui.button("OK").clicked()
            });
            if about.inner || about.should_close() {
                self.show_about = false;
            }
        } else if response.should_close() && matches!(outcome, DialogOutcome::Open) {
            outcome = DialogOutcome::Cancelled;
        }

        outcome
    }

    fn render_fields(&mut self, ui: &mut Ui) {
        let draft = &mut self.draft;

        form_row(ui, "Output file", |ui| {
            ui.text_edit_singleline(&mut draft.config.file_pattern);
        });

        ui.checkbox(&mut draft.config.remember_window, "Remember window position");
        ui.checkbox(&mut draft.config.show_filename, "Show file name");
        ui.checkbox(&mut draft.config.write_banner, "Write banner");
        ui.checkbox(&mut draft.config.log_only_on_change, "Only log changes");
        ui.checkbox(&mut draft.config.show_axes, "Show coordinates");
        ui.checkbox(&mut draft.config.sound_feedback, "Sound feedback");

        form_row(ui, "Suppress axis", |ui| {
            let suppress = &mut draft.config.suppress_axis;
            ui.radio_value(suppress, AxisSuppression::None, "None");
            ui.radio_value(suppress, AxisSuppression::X, "X");
            ui.radio_value(suppress, AxisSuppression::Y, "Y");
        });

        let numeric = [
            ("Ticks per second", &mut draft.sample_rate),
            ("Start/stop button", &mut draft.trigger_button),
            ("Monitored button", &mut draft.secondary_button),
            ("Axis magnitude", &mut draft.axis_magnitude),
            ("Pointer size", &mut draft.pointer_size),
        ];
        for (label, text) in numeric {
            form_row(ui, label, |ui| {
                ui.add(TextEdit::singleline(text).desired_width(60.0));
            });
        }

        ui.label("Banner comment");
        ui.add(TextEdit::multiline(&mut draft.config.banner_comment).desired_rows(3));

        let labels = [
            ("+X label", &mut draft.config.label_pos_x),
            ("-X label", &mut draft.config.label_neg_x),
            ("+Y label", &mut draft.config.label_pos_y),
            ("-Y label", &mut draft.config.label_neg_y),
        ];
        for (label, text) in labels {
            form_row(ui, label, |ui| {
                ui.text_edit_singleline(text);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ConfigDraft {
        ConfigDraft::from_config(&Config::default())
    }

    fn message(result: Result<Validated, ConfigError>) -> String {
        match result {
            Err(ConfigError::Invalid(message)) => message,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn defaults_pass_unchanged() {
        let validated = draft().validate(12).unwrap();
        assert_eq!(validated.config, Config::default());
        assert_eq!(validated.warning, None);
    }

    fn frame(
        ctx: &egui::Context,
        dialog: &mut ConfigDialog,
        events: Vec<egui::Event>,
    ) -> DialogOutcome {
        let mut outcome = DialogOutcome::Open;
        let input = egui::RawInput {
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| outcome = dialog.show(ctx, 12));
        outcome
    }

    #[test]
    fn dialog_is_a_modal_that_escape_cancels() {
        let ctx = egui::Context::default();
        let mut dialog = ConfigDialog::new(&Config::default());

        assert!(matches!(frame(&ctx, &mut dialog, Vec::new()), DialogOutcome::Open));

        let escape = egui::Event::Key {
            key: egui::Key::Escape,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        };
        assert!(matches!(
            frame(&ctx, &mut dialog, vec![escape]),
            DialogOutcome::Cancelled
        ));
    }

    #[test]
    fn fractional_sample_rate_is_kept() {
        let config = Config {
            sample_rate: 7.25,
            ..Config::default()
        };
        let d = ConfigDraft::from_config(&config);
        assert_eq!(d.sample_rate, "7.25");
        assert_eq!(d.validate(12).unwrap().config.sample_rate, 7.25);
    }

    #[test]
    fn sample_rate_must_be_positive() {
        for text in ["0", "-1", "fast", ""] {
            let mut d = draft();
            d.sample_rate = text.to_string();
            assert!(message(d.validate(12)).starts_with("Ticks per second"));
        }
    }

    #[test]
    fn fast_sample_rate_is_clamped_with_warning() {
        let mut d = draft();
        d.sample_rate = "250".to_string();
        let validated = d.validate(12).unwrap();
        assert_eq!(validated.config.sample_rate, 100.0);
        assert_eq!(
            validated.warning.as_deref(),
            Some("Warning: Your clock cannot exceed 100 ticks per second.")
        );
    }

    #[test]
    fn buttons_are_checked_against_the_device() {
        let mut d = draft();
        d.trigger_button = "13".to_string();
        assert_eq!(
            message(d.validate(12)),
            "Joystick button to start & stop writing must be between 1 and 12 inclusive"
        );

        let mut d = draft();
        d.secondary_button = "13".to_string();
        assert!(message(d.validate(12)).starts_with("Joystick button to monitor"));

        let mut d = draft();
        d.secondary_button = "0".to_string();
        assert_eq!(d.validate(12).unwrap().config.secondary_button, 0);
    }

    #[test]
    fn trigger_and_secondary_must_differ() {
        let mut d = draft();
        d.trigger_button = "3".to_string();
        d.secondary_button = "3".to_string();
        assert!(message(d.validate(12)).contains("cannot be the same"));
    }

    #[test]
    fn first_failing_field_is_reported() {
        let mut d = draft();
        d.axis_magnitude = "0".to_string();
        d.pointer_size = "51".to_string();
        assert_eq!(
            message(d.validate(12)),
            "Axis magnitude must be greater than zero."
        );

        d.axis_magnitude = "500".to_string();
        assert!(message(d.validate(12)).starts_with("Pointer size"));
    }
}
