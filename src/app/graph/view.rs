use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{
    self, Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Stroke, Ui, pos2, vec2,
};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::config::Margins;
use crate::util::truncate_label;

use super::super::render_utils::{
    EDGE_BASE_OPACITY, EDGE_COLOR, EDGE_DIM_OPACITY, HIGHLIGHT_COLOR, HIGHLIGHT_EDGE_WIDTH,
    LABEL_DIM_OPACITY, NODE_DIM_OPACITY, SEARCH_COLOR, SELECTED_COLOR, blend_color,
    dashed_vertical, draw_arrow, draw_background, draw_node_shape, edge_visible, edge_width,
    node_color, node_radius, node_shape, with_opacity,
};
use super::super::timeline::TimeScale;
use super::super::transform::ZoomTransform;
use super::super::{SearchMatchCache, ViewModel};

const AXIS_TICKS: usize = 8;
const LABEL_MAX_CHARS: usize = 24;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Dashed gridlines at the rescaled tick positions, spanning the drawable band.
fn draw_time_grid(
    painter: &Painter,
    rect: Rect,
    scale: &TimeScale,
    transform: ZoomTransform,
    margins: Margins,
) {
    let top = rect.top() + transform.apply_y(margins.top);
    let bottom = rect.top() + transform.apply_y(rect.height() - margins.bottom);
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(233, 236, 239, 40));
    for tick in scale.ticks(AXIS_TICKS) {
        let x = rect.left() + scale.map(tick);
        if x >= rect.left() && x <= rect.right() {
            dashed_vertical(painter, x, top.max(rect.top()), bottom.min(rect.bottom()), stroke);
        }
    }
}

/// Axis band pinned to the bottom of the canvas; only its tick positions follow the zoom.
fn draw_time_axis(
    painter: &Painter,
    rect: Rect,
    scale: &TimeScale,
    margins: Margins,
    pointer: Option<Pos2>,
) {
    let band = Rect::from_min_max(pos2(rect.left(), rect.bottom() - margins.bottom), rect.max);
    painter.rect_filled(band, 0.0, Color32::from_rgb(28, 33, 41));
    painter.line_segment(
        [band.left_top(), band.right_top()],
        Stroke::new(1.0, Color32::from_rgb(60, 70, 80)),
    );

    let axis_y = band.top() + 10.0;
    let tick_stroke = Stroke::new(1.0, Color32::from_gray(150));
    for tick in scale.ticks(AXIS_TICKS) {
        let x = rect.left() + scale.map(tick);
        if x < rect.left() || x > rect.right() {
            continue;
        }
        painter.line_segment([pos2(x, band.top()), pos2(x, axis_y)], tick_stroke);
        painter.text(
            pos2(x, axis_y + 2.0),
            Align2::CENTER_TOP,
            TimeScale::tick_label(tick),
            FontId::proportional(11.0),
            Color32::from_gray(170),
        );
    }

    painter.text(
        pos2(rect.center().x, rect.bottom() - 6.0),
        Align2::CENTER_BOTTOM,
        "Timeline",
        FontId::proportional(13.0),
        Color32::from_gray(220),
    );

    if let Some(pointer) = pointer.filter(|pointer| band.contains(*pointer)) {
        let stamp = scale.invert(pointer.x - rect.left());
        painter.line_segment(
            [pos2(pointer.x, band.top()), pos2(pointer.x, axis_y + 16.0)],
            Stroke::new(1.0, HIGHLIGHT_COLOR),
        );
        painter.text(
            pos2(pointer.x + 4.0, band.top() - 4.0),
            Align2::LEFT_BOTTOM,
            TimeScale::tick_label(stamp),
            FontId::proportional(12.0),
            HIGHLIGHT_COLOR,
        );
    }
}

impl ViewModel {
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        if self.controller.selected().is_some() {
            return None;
        }

        let search_query = self.search.trim();
        if search_query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.graph_revision == self.graph_revision
            && cached.query == search_query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let simulation = self.simulation.as_ref()?;
        let matcher = SkimMatcherV2::default();
        let matches = simulation
            .nodes()
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                fuzzy_match_score(&matcher, &node.label, search_query)
                    .or_else(|| fuzzy_match_score(&matcher, &node.id, search_query))
                    .map(|_| index)
            })
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: search_query.to_owned(),
            graph_revision: self.graph_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        if self.controller.resize(rect.size()) {
            self.graph_dirty = true;
        }
        if self.graph_dirty {
            self.rebuild_layout();
        }

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect);

        self.handle_graph_zoom(ui, rect, &response);

        let moving = self.step_simulation();
        let search_matches = self.cached_search_matches();
        let transform = self.controller.transform();
        let margins = self.layout.margins;
        let show_labels = self.show_labels;
        let show_time_axis = self.show_time_axis;

        let Some(simulation) = self.simulation.as_ref() else {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No nodes to lay out. Load an event table or open the sample.",
                FontId::proportional(14.0),
                Color32::from_gray(200),
            );
            return;
        };

        if moving || response.dragged() {
            ui.ctx().request_repaint();
        }

        let scratch = &mut self.view_scratch;
        scratch.screen_positions.clear();
        scratch.screen_radii.clear();
        for node in simulation.nodes() {
            scratch
                .screen_positions
                .push(rect.min + self.controller.layout_to_canvas(node.position));
            scratch
                .screen_radii
                .push((node_radius(node.kind) * transform.k).max(1.5));
        }
        Self::visible_indices_into(
            rect,
            &scratch.screen_positions,
            &scratch.screen_radii,
            &mut scratch.visible_indices,
        );

        let hovered = Self::hovered_index(
            ui,
            &scratch.visible_indices,
            &scratch.screen_positions,
            &scratch.screen_radii,
        );
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let grabbed = if response.drag_started_by(egui::PointerButton::Primary) {
            ui.input(|input| input.pointer.press_origin())
                .and_then(|origin| {
                    Self::node_at(
                        origin,
                        &scratch.visible_indices,
                        &scratch.screen_positions,
                        &scratch.screen_radii,
                    )
                })
                .map(|(index, _)| index)
        } else {
            None
        };

        let pending_selection = if response.clicked_by(egui::PointerButton::Primary) {
            Some(hovered.map(|(index, _)| simulation.nodes()[index].id.clone()))
        } else {
            None
        };

        let time_scale = simulation
            .time_scale()
            .filter(|_| show_time_axis)
            .map(|scale| scale.rescaled(transform));
        if let Some(scale) = &time_scale {
            draw_time_grid(&painter, rect, scale, transform, margins);
        }

        let highlight = self.controller.highlight();
        let selection_active = highlight.is_active();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());

        for sim_edge in simulation.edges() {
            let Some(edge) = self.graph.edges.get(sim_edge.edge) else {
                continue;
            };
            let start = scratch.screen_positions[sim_edge.source];
            let end = scratch.screen_positions[sim_edge.target];
            if !edge_visible(rect, start, end, 4.0) {
                continue;
            }

            let highlighted = highlight.emphasizes_edge(sim_edge.edge);
            let (width, color) = if highlighted {
                (HIGHLIGHT_EDGE_WIDTH, SELECTED_COLOR)
            } else if selection_active {
                (edge_width(edge.value), with_opacity(EDGE_COLOR, EDGE_DIM_OPACITY))
            } else {
                (edge_width(edge.value), with_opacity(EDGE_COLOR, EDGE_BASE_OPACITY))
            };
            draw_arrow(
                &painter,
                start,
                end,
                scratch.screen_radii[sim_edge.target],
                width * transform.k.sqrt(),
                color,
            );
        }

        let hovered_index = hovered.map(|(index, _)| index);
        for &index in &scratch.visible_indices {
            let node = &simulation.nodes()[index];
            let position = scratch.screen_positions[index];
            let radius = scratch.screen_radii[index];

            let is_selected = highlight.selected.as_deref() == Some(node.id.as_str());
            let is_highlighted = highlight.downstream.nodes.contains(&node.id);
            let is_search_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&index));
            let emphasized = is_selected || is_highlighted;

            let base_color = node_color(node.kind);
            let (fill, opacity) = if is_selected {
                (SELECTED_COLOR, 1.0)
            } else if is_highlighted {
                (HIGHLIGHT_COLOR, 1.0)
            } else if selection_active {
                (base_color, NODE_DIM_OPACITY)
            } else if is_search_match {
                (blend_color(base_color, SEARCH_COLOR, 0.65), 1.0)
            } else if search_active {
                (base_color, NODE_DIM_OPACITY * 2.0)
            } else {
                (base_color, 1.0)
            };

            let stroke_width = if is_selected {
                3.0
            } else if is_highlighted {
                2.0
            } else {
                1.5
            };
            let stroke_color = if hovered_index == Some(index) {
                Color32::from_rgb(255, 230, 160)
            } else {
                Color32::WHITE
            };
            draw_node_shape(
                &painter,
                node_shape(node.kind),
                position,
                radius,
                with_opacity(fill, opacity),
                Stroke::new(stroke_width, with_opacity(stroke_color, opacity)),
            );

            if show_labels || emphasized || hovered_index == Some(index) {
                let label_opacity = if selection_active && !emphasized {
                    LABEL_DIM_OPACITY
                } else {
                    1.0
                };
                painter.text(
                    position + vec2(0.0, radius + 3.0),
                    Align2::CENTER_TOP,
                    truncate_label(&node.label, LABEL_MAX_CHARS),
                    FontId::proportional(10.0),
                    with_opacity(Color32::from_gray(225), label_opacity),
                );
            }
        }

        if let Some(scale) = &time_scale {
            let pointer = ui.input(|input| input.pointer.hover_pos());
            draw_time_axis(&painter, rect, scale, margins, pointer);
        }

        if let Some(index) = hovered_index {
            let node = &simulation.nodes()[index];
            let readout = match &node.time {
                Some(time) => format!("{}\n{time}", node.id),
                None => node.id.clone(),
            };
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                readout,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        self.handle_node_drag(rect, &response, grabbed);
        self.handle_graph_pan(&response);

        if let Some(selected) = pending_selection {
            self.apply_graph_selection(selected);
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::community::DataSource;
    use crate::config::AppConfig;

    fn model() -> ViewModel {
        let mut model =
            ViewModel::new(DataSource::Sample.load().unwrap(), DataSource::Sample, &AppConfig::default());
        model.controller.resize(vec2(900.0, 600.0));
        model.rebuild_layout();
        model
    }

    #[test]
    fn search_matches_labels_case_insensitively() {
        let mut model = model();
        model.search = "CAFE".to_owned();
        let matches = model.cached_search_matches().unwrap();
        assert!(!matches.is_empty());

        let simulation = model.simulation.as_ref().unwrap();
        for index in matches.iter() {
            let node = &simulation.nodes()[*index];
            assert!(fuzzy_match_score(&SkimMatcherV2::default(), &node.id, "cafe").is_some());
        }
    }

    #[test]
    fn search_is_suspended_while_something_is_selected() {
        let mut model = model();
        model.search = "cafe".to_owned();
        let first = model.simulation.as_ref().unwrap().nodes()[0].id.clone();
        model.apply_graph_selection(Some(first));
        assert!(model.cached_search_matches().is_none());
    }

    #[test]
    fn search_cache_is_reused_until_the_layout_changes() {
        let mut model = model();
        model.search = "cafe".to_owned();
        let first = model.cached_search_matches().unwrap();
        let second = model.cached_search_matches().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        model.rebuild_layout();
        let third = model.cached_search_matches().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
