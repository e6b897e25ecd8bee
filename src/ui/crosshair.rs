//! Crosshair view: turns the current reading into drawing commands.
//!
//! Rendering is split from painting so the geometry can be checked without a
//! window. [`CrosshairRenderer::render`] produces commands in view-local
//! coordinates (origin top-left); [`paint`] replays them onto an egui painter.

use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2};

use super::common::UiColors;
use crate::controller::AxisReading;
use crate::persistence::{AxisSuppression, Config};

/// Gap between the crosshair ends and the view edge.
const CROSSHAIR_INSET: f32 = 15.0;
const LABEL_MARGIN: f32 = 2.0;
const READOUT_LINE: f32 = 16.0;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    EraseMarker {
        center: Pos2,
        radius: f32,
    },
    Line {
        from: Pos2,
        to: Pos2,
        color: Color32,
    },
    Label {
        pos: Pos2,
        anchor: Align2,
        text: String,
        color: Color32,
    },
    Marker {
        center: Pos2,
        radius: f32,
        fill: Color32,
        outline: Color32,
    },
}

/// Marker radius in pixels: a percentage of the smaller view dimension.
pub fn marker_radius(size: Vec2, pointer_size: u32) -> f32 {
    (size.x.min(size.y) * pointer_size as f32 / 100.0).max(1.0)
}

/// Maps an axis value in `[-magnitude, magnitude]` onto `[radius, extent - radius]`.
///
/// Zero lands on `extent / 2` exactly; values beyond the magnitude are clamped
/// so the marker never crosses the view edge.
pub fn map_axis(value: i32, magnitude: i32, extent: f32, radius: f32) -> f32 {
    let center = extent / 2.0;
    if magnitude <= 0 {
        return center;
    }
    let travel = (center - radius).max(0.0);
    let fraction = (value as f32 / magnitude as f32).clamp(-1.0, 1.0);
    center + fraction * travel
}

/// Draws the crosshair, labels, marker and optional readouts.
///
/// Remembers only where the marker was last drawn, so it can be erased.
#[derive(Debug, Default)]
pub struct CrosshairRenderer {
    last_marker: Option<(Pos2, f32)>,
}

impl CrosshairRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &mut self,
        size: Vec2,
        reading: AxisReading,
        logging: bool,
        config: &Config,
    ) -> Vec<DrawCommand> {
        let mut commands = Vec::new();
        let radius = marker_radius(size, config.pointer_size);
        let center = Pos2::new(size.x / 2.0, size.y / 2.0);

        if let Some((old, old_radius)) = self.last_marker {
            commands.push(DrawCommand::EraseMarker {
                center: old,
                radius: old_radius,
            });
        }

        // Vertical line, shortened to a tick when Y is pinned
        let (top, bottom) = if config.suppress_axis == AxisSuppression::Y {
            (center.y - radius - 3.0, center.y + radius + 3.0)
        } else {
            (CROSSHAIR_INSET, size.y - CROSSHAIR_INSET)
        };
        commands.push(DrawCommand::Line {
            from: Pos2::new(center.x, top),
            to: Pos2::new(center.x, bottom),
            color: UiColors::CROSSHAIR,
        });

        let (left, right) = if config.suppress_axis == AxisSuppression::X {
            (center.x - radius - 2.0, center.x + radius + 2.0)
        } else {
            (0.0, size.x)
        };
        commands.push(DrawCommand::Line {
            from: Pos2::new(left, center.y),
            to: Pos2::new(right, center.y),
            color: UiColors::CROSSHAIR,
        });

        let labels = [
            (
                &config.label_neg_x,
                Pos2::new(LABEL_MARGIN, center.y + LABEL_MARGIN),
                Align2::LEFT_TOP,
            ),
            (
                &config.label_pos_x,
                Pos2::new(size.x - LABEL_MARGIN, center.y + LABEL_MARGIN),
                Align2::RIGHT_TOP,
            ),
            (
                &config.label_neg_y,
                Pos2::new(center.x, size.y - LABEL_MARGIN),
                Align2::CENTER_BOTTOM,
            ),
            (
                &config.label_pos_y,
                Pos2::new(center.x, LABEL_MARGIN),
                Align2::CENTER_TOP,
            ),
        ];
        for (text, pos, anchor) in labels {
            if !text.is_empty() {
                commands.push(DrawCommand::Label {
                    pos,
                    anchor,
                    text: text.clone(),
                    color: UiColors::LABEL,
                });
            }
        }

        // Raw Y grows downwards, which is also screen-down.
        let marker = Pos2::new(
            map_axis(reading.x, config.axis_magnitude, size.x, radius),
            map_axis(reading.y, config.axis_magnitude, size.y, radius),
        );
        commands.push(DrawCommand::Marker {
            center: marker,
            radius,
            fill: if logging {
                UiColors::MARKER_ACTIVE
            } else {
                UiColors::MARKER_IDLE
            },
            outline: UiColors::CROSSHAIR,
        });
        self.last_marker = Some((marker, radius));

        if config.show_axes {
            commands.push(DrawCommand::Label {
                pos: Pos2::new(LABEL_MARGIN + 2.0, LABEL_MARGIN),
                anchor: Align2::LEFT_TOP,
                text: format!("X: {}", reading.x),
                color: UiColors::READOUT,
            });
            commands.push(DrawCommand::Label {
                pos: Pos2::new(LABEL_MARGIN + 2.0, LABEL_MARGIN + READOUT_LINE),
                anchor: Align2::LEFT_TOP,
                text: format!("Y: {}", reading.display_y()),
                color: UiColors::READOUT,
            });
        }

        commands
    }
}

/// Replays commands inside `rect`.
pub fn paint(painter: &Painter, rect: Rect, commands: &[DrawCommand]) {
    let origin = rect.min.to_vec2();
    for command in commands {
        match command {
            DrawCommand::EraseMarker { center, radius } => {
                painter.circle_filled(*center + origin, *radius + 1.0, UiColors::VIEW_BG);
            }
            DrawCommand::Line { from, to, color } => {
                painter.line_segment([*from + origin, *to + origin], Stroke::new(1.0, *color));
            }
            DrawCommand::Label {
                pos,
                anchor,
                text,
                color,
            } => {
                painter.text(
                    *pos + origin,
                    *anchor,
                    text,
                    FontId::proportional(12.0),
                    *color,
                );
            }
            DrawCommand::Marker {
                center,
                radius,
                fill,
                outline,
            } => {
                painter.circle(
                    *center + origin,
                    *radius,
                    *fill,
                    Stroke::new(1.0, *outline),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(commands: &[DrawCommand]) -> (Pos2, f32, Color32) {
        commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Marker {
                    center,
                    radius,
                    fill,
                    ..
                } => Some((*center, *radius, *fill)),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn zero_maps_to_exact_center() {
        for magnitude in [1, 7, 1000, 32767] {
            assert_eq!(map_axis(0, magnitude, 301.0, 6.0), 150.5);
            assert_eq!(map_axis(0, magnitude, 200.0, 4.0), 100.0);
        }
    }

    #[test]
    fn full_deflection_stays_inside_the_view() {
        for magnitude in [1, 7, 1000, 32767] {
            assert_eq!(map_axis(magnitude, magnitude, 200.0, 4.0), 196.0);
            assert_eq!(map_axis(-magnitude, magnitude, 200.0, 4.0), 4.0);
            // Out-of-range readings are clamped as well.
            assert_eq!(map_axis(magnitude * 2, magnitude, 200.0, 4.0), 196.0);
        }
    }

    #[test]
    fn marker_color_follows_logging_state() {
        let config = Config::default();
        let size = Vec2::new(200.0, 200.0);
        let mut renderer = CrosshairRenderer::new();

        let idle = renderer.render(size, AxisReading::neutral(), false, &config);
        assert_eq!(marker(&idle).2, UiColors::MARKER_IDLE);

        let active = renderer.render(size, AxisReading::neutral(), true, &config);
        assert_eq!(marker(&active).2, UiColors::MARKER_ACTIVE);
    }

    #[test]
    fn previous_marker_is_erased_first() {
        let config = Config::default();
        let size = Vec2::new(200.0, 200.0);
        let mut renderer = CrosshairRenderer::new();

        let first = renderer.render(
            size,
            AxisReading {
                x: 1000,
                y: 0,
                buttons: 0,
            },
            false,
            &config,
        );
        assert!(!matches!(first[0], DrawCommand::EraseMarker { .. }));

        let (old_center, old_radius, _) = marker(&first);
        let second = renderer.render(size, AxisReading::neutral(), false, &config);
        assert_eq!(
            second[0],
            DrawCommand::EraseMarker {
                center: old_center,
                radius: old_radius
            }
        );
    }

    #[test]
    fn readout_shows_inverted_y() {
        let config = Config {
            show_axes: true,
            ..Config::default()
        };
        let mut renderer = CrosshairRenderer::new();
        let commands = renderer.render(
            Vec2::new(200.0, 200.0),
            AxisReading {
                x: 3,
                y: 100,
                buttons: 0,
            },
            false,
            &config,
        );

        let texts: Vec<&str> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Label { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(texts.contains(&"X: 3"));
        assert!(texts.contains(&"Y: -100"));
    }

    #[test]
    fn pinned_axis_draws_a_short_tick() {
        let config = Config {
            suppress_axis: AxisSuppression::X,
            label_neg_x: String::new(),
            ..Config::default()
        };
        let size = Vec2::new(200.0, 200.0);
        let mut renderer = CrosshairRenderer::new();
        let commands = renderer.render(size, AxisReading::neutral(), false, &config);

        let radius = marker_radius(size, config.pointer_size);
        assert!(commands.contains(&DrawCommand::Line {
            from: Pos2::new(100.0 - radius - 2.0, 100.0),
            to: Pos2::new(100.0 + radius + 2.0, 100.0),
            color: UiColors::CROSSHAIR,
        }));
        assert!(!commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Label { text, .. } if text == "Unfriendly")));
    }
}
