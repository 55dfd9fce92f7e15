use eframe::egui::{self, Pos2, Rect, Ui, Vec2};

use crate::community::Edge;

use super::super::ViewModel;
use super::super::highlight::HighlightState;
use super::super::physics::Simulation;
use super::super::render_utils::circle_visible;
use super::super::transform::ZoomTransform;

const MIN_VIEWPORT: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct DragState {
    index: usize,
    /// Offset from the pointer to the node centre, in layout units.
    grab_offset: Vec2,
}

/// Selection, viewport size, pan/zoom and drag state for one canvas.
#[derive(Debug, Default)]
pub(in crate::app) struct InteractionController {
    highlight: HighlightState,
    size: Vec2,
    transform: ZoomTransform,
    drag: Option<DragState>,
}

impl InteractionController {
    pub fn selected(&self) -> Option<&str> {
        self.highlight.selected.as_deref()
    }

    pub fn highlight(&self) -> &HighlightState {
        &self.highlight
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    pub fn dragged_index(&self) -> Option<usize> {
        self.drag.map(|drag| drag.index)
    }

    /// Clicking the selected node clears the selection; any other node replaces it.
    pub fn click_node(&mut self, id: &str, edges: &[Edge]) {
        if self.selected() == Some(id) {
            self.select(None, edges);
        } else {
            self.select(Some(id), edges);
        }
    }

    pub fn click_background(&mut self) {
        self.highlight = HighlightState::default();
    }

    pub fn select(&mut self, id: Option<&str>, edges: &[Edge]) {
        self.highlight = HighlightState::for_selection(id, edges);
    }

    /// Recomputes the highlight against a replaced graph, dropping a selection whose
    /// node no longer exists.
    pub fn refresh_selection(&mut self, edges: &[Edge], exists: impl Fn(&str) -> bool) {
        let selected = self.highlight.selected.take().filter(|id| exists(id));
        self.select(selected.as_deref(), edges);
    }

    /// Returns `true` when the size changed enough to warrant a layout rebuild.
    pub fn resize(&mut self, size: Vec2) -> bool {
        let size = size.max(Vec2::splat(MIN_VIEWPORT));
        if (size - self.size).length_sq() < 0.25 {
            return false;
        }
        self.size = size;
        true
    }

    /// `anchor` is in canvas coordinates.
    pub fn zoom_at(&mut self, anchor: Vec2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.transform = self.transform.scale_about(anchor, factor);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.transform = self.transform.translate(delta);
    }

    pub fn reset_view(&mut self) {
        self.transform = ZoomTransform::IDENTITY;
    }

    pub fn canvas_to_layout(&self, canvas: Vec2) -> Vec2 {
        self.transform.invert(canvas)
    }

    pub fn layout_to_canvas(&self, layout: Vec2) -> Vec2 {
        self.transform.apply(layout)
    }

    /// Pins the node under the pointer and warms the simulation so neighbours react.
    pub fn begin_drag(&mut self, simulation: &mut Simulation, index: usize, pointer: Vec2) {
        let Some(node) = simulation.nodes().get(index) else {
            return;
        };
        let position = node.position;
        let layout_pointer = self.canvas_to_layout(pointer);

        self.drag = Some(DragState {
            index,
            grab_offset: position - layout_pointer,
        });
        simulation.set_alpha_target(simulation.config().drag_alpha_target);
        simulation.pin(index, position);
    }

    pub fn drag_to(&mut self, simulation: &mut Simulation, pointer: Vec2) {
        let Some(drag) = self.drag else {
            return;
        };
        let position = self.canvas_to_layout(pointer) + drag.grab_offset;
        simulation.pin(drag.index, position);
    }

    /// Releases the pin and lets alpha decay back toward settlement.
    pub fn end_drag(&mut self, simulation: &mut Simulation) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        simulation.set_alpha_target(0.0);
        simulation.unpin(drag.index);
    }

    /// Forgets a drag whose simulation was torn down. The node indices it held belong
    /// to the old instance.
    pub fn discard_drag(&mut self) {
        self.drag = None;
    }
}

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.controller.zoom_at(pointer - rect.min, zoom_factor);
    }

    /// Background drags pan; a primary drag that grabbed a node moves the node instead.
    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        let background_drag = response.dragged_by(egui::PointerButton::Primary)
            && self.controller.dragged_index().is_none();
        if background_drag
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.controller.pan(response.drag_delta());
        }
    }

    pub(in crate::app) fn handle_node_drag(
        &mut self,
        rect: Rect,
        response: &egui::Response,
        grabbed: Option<usize>,
    ) {
        let Some(simulation) = self.simulation.as_mut() else {
            return;
        };
        let pointer = response.interact_pointer_pos().map(|pointer| pointer - rect.min);

        if response.drag_started_by(egui::PointerButton::Primary)
            && let (Some(index), Some(pointer)) = (grabbed, pointer)
        {
            self.controller.begin_drag(simulation, index, pointer);
        }

        if response.dragged_by(egui::PointerButton::Primary)
            && let Some(pointer) = pointer
        {
            self.controller.drag_to(simulation, pointer);
        }

        if response.drag_stopped() {
            self.controller.end_drag(simulation);
        }
    }

    pub(in crate::app) fn visible_indices_into(
        rect: Rect,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
        visible_indices: &mut Vec<usize>,
    ) {
        visible_indices.clear();
        visible_indices.extend(
            (0..screen_positions.len())
                .filter(|&index| circle_visible(rect, screen_positions[index], screen_radii[index])),
        );
    }

    pub(in crate::app) fn node_at(
        point: Pos2,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<(usize, f32)> {
        visible_indices
            .iter()
            .filter_map(|index| {
                let distance = screen_positions[*index].distance(point);
                if distance <= screen_radii[*index] {
                    Some((*index, distance))
                } else {
                    None
                }
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub(in crate::app) fn hovered_index(
        ui: &Ui,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<(usize, f32)> {
        let pointer_pos = ui.input(|input| input.pointer.hover_pos());
        pointer_pos.and_then(|pointer| {
            Self::node_at(pointer, visible_indices, screen_positions, screen_radii)
        })
    }

    pub(in crate::app) fn apply_graph_selection(&mut self, clicked: Option<String>) {
        match clicked {
            Some(id) => self.controller.click_node(&id, &self.graph.edges),
            None => self.controller.click_background(),
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::community::graph::Relationship;
    use crate::community::{GraphData, Node, NodeKind};
    use crate::config::LayoutConfig;

    fn graph() -> GraphData {
        GraphData {
            nodes: vec![
                Node::new("A", NodeKind::Member, "A"),
                Node::new("E", NodeKind::Event, "E"),
                Node::new("B", NodeKind::Member, "B"),
                Node::new("V", NodeKind::Space, "V"),
            ],
            edges: vec![
                Edge::new("A", "E", Relationship::Initiates),
                Edge::new("E", "B", Relationship::Participates),
                Edge::new("V", "E", Relationship::Hosts),
            ],
        }
    }

    #[test]
    fn clicking_twice_toggles_selection_off() {
        let graph = graph();
        let mut controller = InteractionController::default();

        controller.click_node("A", &graph.edges);
        assert_eq!(controller.selected(), Some("A"));
        assert!(controller.highlight().downstream.nodes.contains("B"));

        controller.click_node("A", &graph.edges);
        assert_eq!(controller.selected(), None);
        assert!(controller.highlight().downstream.nodes.is_empty());
        assert!(controller.highlight().downstream.edges.is_empty());
    }

    #[test]
    fn clicking_another_node_moves_selection() {
        let graph = graph();
        let mut controller = InteractionController::default();
        controller.click_node("A", &graph.edges);
        controller.click_node("V", &graph.edges);
        assert_eq!(controller.selected(), Some("V"));
        assert!(controller.highlight().emphasizes_edge(2));
        assert!(!controller.highlight().emphasizes_edge(0));
    }

    #[test]
    fn background_click_clears_selection() {
        let graph = graph();
        let mut controller = InteractionController::default();
        controller.click_node("E", &graph.edges);
        controller.click_background();
        assert_eq!(controller.highlight(), &HighlightState::default());
    }

    #[test]
    fn refresh_drops_vanished_selection() {
        let graph = graph();
        let mut controller = InteractionController::default();
        controller.click_node("A", &graph.edges);
        controller.refresh_selection(&graph.edges, |id| id != "A");
        assert_eq!(controller.selected(), None);

        controller.click_node("E", &graph.edges);
        controller.refresh_selection(&graph.edges, |_| true);
        assert_eq!(controller.selected(), Some("E"));
    }

    #[test]
    fn resize_reports_only_real_changes() {
        let mut controller = InteractionController::default();
        assert!(controller.resize(vec2(800.0, 600.0)));
        assert!(!controller.resize(vec2(800.1, 600.0)));
        assert!(controller.resize(vec2(640.0, 600.0)));
        assert_eq!(controller.size(), vec2(640.0, 600.0));
    }

    #[test]
    fn zoom_and_pan_leave_layout_positions_alone() {
        let graph = graph();
        let mut simulation = Simulation::new(&graph, vec2(800.0, 600.0), LayoutConfig::default());
        let before = simulation.nodes().iter().map(|node| node.position).collect::<Vec<_>>();

        let mut controller = InteractionController::default();
        controller.zoom_at(vec2(100.0, 100.0), 2.0);
        controller.pan(vec2(30.0, -10.0));
        let after = simulation.nodes().iter().map(|node| node.position).collect::<Vec<_>>();
        assert_eq!(before, after);

        let point = vec2(250.0, 125.0);
        let round_trip = controller.canvas_to_layout(controller.layout_to_canvas(point));
        assert!((round_trip - point).length() < 1e-3);

        simulation.stop();
    }

    #[test]
    fn drag_pins_then_releases_node() {
        let graph = graph();
        let mut simulation = Simulation::new(&graph, vec2(800.0, 600.0), LayoutConfig::default());
        let mut controller = InteractionController::default();

        let start = simulation.nodes()[1].position;
        controller.begin_drag(&mut simulation, 1, start);
        assert_eq!(controller.dragged_index(), Some(1));

        controller.drag_to(&mut simulation, vec2(300.0, 200.0));
        simulation.tick();
        assert_eq!(simulation.nodes()[1].position, vec2(300.0, 200.0));

        controller.end_drag(&mut simulation);
        assert!(simulation.nodes()[1].pinned.is_none());
        assert_eq!(controller.dragged_index(), None);
    }

    #[test]
    fn drag_reheats_a_settled_simulation() {
        let graph = graph();
        let mut simulation = Simulation::new(&graph, vec2(800.0, 600.0), LayoutConfig::default());
        while simulation.tick() {}

        let mut controller = InteractionController::default();
        let position = simulation.nodes()[0].position;
        controller.begin_drag(&mut simulation, 0, position);
        assert!(simulation.tick());
    }

    #[test]
    fn discarded_drag_never_touches_the_new_simulation() {
        let graph = graph();
        let mut old = Simulation::new(&graph, vec2(800.0, 600.0), LayoutConfig::default());
        let mut controller = InteractionController::default();
        let position = old.nodes()[2].position;
        controller.begin_drag(&mut old, 2, position);

        old.stop();
        controller.discard_drag();
        let mut fresh = Simulation::new(&graph, vec2(640.0, 480.0), LayoutConfig::default());
        controller.drag_to(&mut fresh, vec2(10.0, 10.0));
        controller.end_drag(&mut fresh);
        assert!(fresh.nodes().iter().all(|node| node.pinned.is_none()));
    }
}
