//! # UI Common Components
//!
//! Shared colours and small widgets used by the main view and the dialogs.

use eframe::egui::{self, Color32, Frame, Stroke};

/// Colour palette for the monitor.
///
/// The crosshair view is drawn on white with a blue crosshair; the marker turns
/// red while a recording is running.
pub struct UiColors;

impl UiColors {
    /// Crosshair view background, also used to erase the old marker
    pub const VIEW_BG: Color32 = Color32::WHITE;

    pub const CROSSHAIR: Color32 = Color32::from_rgb(0x0f, 0x0f, 0xff);

    pub const LABEL: Color32 = Color32::BLACK;

    pub const READOUT: Color32 = Color32::from_rgb(0x00, 0xf0, 0x00);

    /// Marker fill while idle
    pub const MARKER_IDLE: Color32 = Color32::from_rgb(0xf0, 0xf0, 0xf0);

    /// Marker fill while recording
    pub const MARKER_ACTIVE: Color32 = Color32::from_rgb(0xff, 0x00, 0x00);

    pub const BORDER: Color32 = Color32::from_rgb(60, 60, 60);
}

/// Bordered frame around the crosshair view.
pub fn view_frame() -> Frame {
    Frame::new()
        .stroke(Stroke::new(1.0, UiColors::BORDER))
        .fill(UiColors::VIEW_BG)
        .inner_margin(0)
        .outer_margin(2)
}

/// Single labelled row in a form.
pub fn form_row(ui: &mut egui::Ui, label: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    ui.horizontal(|ui| {
        ui.label(label);
        add_contents(ui);
    });
}
