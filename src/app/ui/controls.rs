use std::ops::RangeInclusive;
use std::path::PathBuf;

use eframe::egui::{self, Key, Response, Ui};

use crate::community::{DataSource, NodeKind, write_sample_csv};
use crate::config::LayoutConfig;

use super::super::ViewModel;

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f32,
    negative_secs: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

fn default_slider_key_step(min: f32, max: f32) -> f32 {
    ((max - min) / 200.0).max(0.0005)
}

fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    min: f32,
    max: f32,
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    let mut hold_state = ui.ctx().data(|data| {
        data.get_temp::<SliderKeyHoldState>(state_id)
            .unwrap_or_default()
    });

    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down {
        hold_state.positive_secs + delta_time
    } else {
        0.0
    };
    hold_state.negative_secs = if decrease_down {
        hold_state.negative_secs + delta_time
    } else {
        0.0
    };
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        return false;
    }

    let hold_secs = if direction > 0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);
    let step = default_slider_key_step(min, max);

    let old_value = *value;
    *value = (*value + direction as f32 * step * speed * delta_time).clamp(min, max);
    ui.ctx().request_repaint();
    (*value - old_value).abs() > f32::EPSILON
}

fn layout_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hover: &str,
) -> bool {
    let (min, max) = (*range.start(), *range.end());
    let slider = ui
        .add(
            egui::Slider::new(value, range)
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if slider.hovered() {
        slider.request_focus();
    }
    slider.changed() | apply_slider_arrow_acceleration(ui, &slider, value, min, max)
}

impl ViewModel {
    fn draw_data_source(&mut self, ui: &mut Ui, reload_request: &mut Option<DataSource>, is_loading: bool) {
        ui.label("Event table (CSV) or graph JSON")
            .on_hover_text("Rows of initiator, participant, topic, venue and time.");
        ui.text_edit_singleline(&mut self.data_path_input);
        ui.horizontal(|ui| {
            let path = self.data_path_input.trim();
            if ui
                .add_enabled(!is_loading && !path.is_empty(), egui::Button::new("Load"))
                .clicked()
            {
                *reload_request = Some(DataSource::File(PathBuf::from(path)));
            }
            if ui
                .add_enabled(!is_loading, egui::Button::new("Open sample"))
                .clicked()
            {
                *reload_request = Some(DataSource::Sample);
            }
        });

        ui.add_space(4.0);
        ui.label("Export CSV template");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.export_path_input);
            if ui.button("Write").clicked() {
                let path = PathBuf::from(self.export_path_input.trim());
                self.status = Some(match write_sample_csv(&path) {
                    Ok(()) => {
                        log::info!("wrote sample CSV to {}", path.display());
                        format!("Wrote template to {}", path.display())
                    }
                    Err(error) => format!("{error:#}"),
                });
            }
        });

        if let Some(status) = &self.status {
            ui.colored_label(egui::Color32::from_rgb(240, 190, 120), status);
        }
    }

    fn draw_summary(&self, ui: &mut Ui) {
        let summary = &self.summary;
        egui::Grid::new("summary_grid")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for kind in NodeKind::ALL {
                    let count = match kind {
                        NodeKind::Member => summary.member_count,
                        NodeKind::Event => summary.event_count,
                        NodeKind::Space => summary.space_count,
                    };
                    ui.label(kind.label());
                    ui.label(count.to_string());
                    ui.end_row();
                }
                ui.label("Edges");
                ui.label(summary.edge_count.to_string());
                ui.end_row();
            });

        if !summary.events_by_space.is_empty() {
            ui.collapsing("Events per space", |ui| {
                for (space, count) in &summary.events_by_space {
                    ui.label(format!("{space}: {count}"));
                }
            });
        }
        if !summary.member_participation.is_empty() {
            ui.collapsing("Most active members", |ui| {
                for (member, count) in summary.member_participation.iter().take(10) {
                    ui.label(format!("{member}: {count}"));
                }
            });
        }
    }

    fn draw_layout_tuning(&mut self, ui: &mut Ui) {
        let layout = &mut self.layout;
        let mut changed = false;

        changed |= layout_slider(
            ui,
            &mut layout.base_link_distance,
            10.0..=200.0,
            "Link distance",
            "Base rest length; member→event links are twice as long, event→space 2.5×.",
        );
        changed |= layout_slider(
            ui,
            &mut layout.charge_strength,
            -800.0..=0.0,
            "Charge",
            "Many-body repulsion between every pair of nodes.",
        );
        changed |= layout_slider(
            ui,
            &mut layout.charge_distance_max,
            50.0..=800.0,
            "Charge range",
            "Pairs farther apart than this exert no repulsion.",
        );
        changed |= layout_slider(
            ui,
            &mut layout.collision_radius,
            0.0..=60.0,
            "Collision radius",
            "Nodes keep at least twice this distance between centres.",
        );
        changed |= layout_slider(
            ui,
            &mut layout.time_x_strength,
            0.0..=1.0,
            "Timeline pull",
            "How strongly timed events move toward their date on the x axis.",
        );
        changed |= layout_slider(
            ui,
            &mut layout.time_y_strength,
            0.0..=1.0,
            "Band pull",
            "How strongly timed events move toward the timeline band.",
        );
        changed |= layout_slider(
            ui,
            &mut layout.free_pull_strength,
            0.0..=0.5,
            "Centre pull",
            "Weak pull of untimed nodes toward the canvas centre.",
        );
        changed |= layout_slider(
            ui,
            &mut layout.velocity_decay,
            0.05..=0.95,
            "Velocity decay",
            "Friction applied to every node each tick.",
        );

        if ui.button("Restore defaults").clicked() {
            *layout = LayoutConfig {
                margins: layout.margins,
                ..LayoutConfig::default()
            };
            changed = true;
        }

        if changed {
            self.apply_layout_config();
        }
    }

    pub(in crate::app) fn draw_controls(
        &mut self,
        ui: &mut Ui,
        reload_request: &mut Option<DataSource>,
        is_loading: bool,
    ) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        self.draw_data_source(ui, reload_request, is_loading);
        ui.separator();

        ui.label("Search")
            .on_hover_text("Fuzzy-highlight matching nodes while nothing is selected.");
        ui.text_edit_singleline(&mut self.search)
            .on_hover_text("Matching is on node names and ids; positions are untouched.");

        ui.separator();

        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Advance the layout one tick per frame until it settles.");
        ui.checkbox(&mut self.show_labels, "Show all labels")
            .on_hover_text("Otherwise only selected, highlighted and hovered nodes are labelled.");
        ui.checkbox(&mut self.show_time_axis, "Show timeline")
            .on_hover_text("Draw time gridlines and the bottom axis when events carry times.");

        ui.collapsing("Physics tuning", |ui| self.draw_layout_tuning(ui));

        ui.separator();
        ui.heading("Summary");
        self.draw_summary(ui);
    }
}
