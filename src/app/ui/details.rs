use eframe::egui::{self, RichText, Ui};

use crate::community::{NodeKind, format_timestamp};

use super::super::ViewModel;

struct DownstreamEntry {
    id: String,
    label: String,
    kind: NodeKind,
}

impl ViewModel {
    fn downstream_entries(&self) -> Vec<DownstreamEntry> {
        let mut entries = self
            .controller
            .highlight()
            .downstream
            .nodes
            .iter()
            .filter_map(|id| self.graph.node(id))
            .map(|node| DownstreamEntry {
                id: node.id.clone(),
                label: node.label().to_owned(),
                kind: node.kind,
            })
            .collect::<Vec<_>>();
        entries.sort_by(|left, right| {
            left.kind
                .label()
                .cmp(right.kind.label())
                .then_with(|| left.label.cmp(&right.label))
        });
        entries
    }

    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        if let Some((start, end)) = self.summary.time_range {
            ui.small(format!(
                "Events span {} to {}",
                format_timestamp(start, "%Y-%m-%d"),
                format_timestamp(end, "%Y-%m-%d")
            ));
        }

        let Some(selected_id) = self.controller.selected().map(str::to_owned) else {
            ui.label("Click a node to highlight everything downstream of it.");
            return;
        };

        let Some(node) = self.graph.node(&selected_id) else {
            ui.label("Selected node no longer exists in the graph.");
            return;
        };

        ui.label(RichText::new(node.label()).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);
        ui.label(format!("Kind: {}", node.kind));
        if let Some(time) = &node.time {
            ui.label(format!("Time: {time}"));
        }

        let outgoing = self
            .graph
            .edges
            .iter()
            .filter(|edge| edge.source == selected_id)
            .count();
        let incoming = self
            .graph
            .edges
            .iter()
            .filter(|edge| edge.target == selected_id)
            .count();
        ui.label(format!("Outgoing links: {outgoing}"));
        ui.label(format!("Incoming links: {incoming}"));

        if let Some(simulation) = &self.simulation
            && let Some(index) = simulation.node_index(&selected_id)
        {
            let sim_node = &simulation.nodes()[index];
            let pinned = if sim_node.pinned.is_some() { " (pinned)" } else { "" };
            ui.label(format!(
                "Layout position: {:.0}, {:.0}{pinned}",
                sim_node.position.x, sim_node.position.y
            ));
        }

        let entries = self.downstream_entries();

        ui.separator();
        ui.label(RichText::new(format!("Downstream ({})", entries.len())).strong());
        if entries.is_empty() {
            ui.label("Nothing is reachable from this node.");
            return;
        }

        let mut next_selection = None;
        egui::ScrollArea::vertical()
            .id_salt("downstream_scroll")
            .max_height(280.0)
            .auto_shrink([false, true])
            .show_rows(ui, 22.0, entries.len(), |ui, row_range| {
                for entry in &entries[row_range] {
                    let text = format!("{}  [{}]", entry.label, entry.kind);
                    if ui.link(text).on_hover_text(entry.id.as_str()).clicked() {
                        next_selection = Some(entry.id.clone());
                    }
                }
            });

        if let Some(id) = next_selection {
            self.apply_graph_selection(Some(id));
        }
    }
}
