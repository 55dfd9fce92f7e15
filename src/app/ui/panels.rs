use std::cell::Cell;
use std::rc::Rc;

use eframe::egui::{self, Align, Context, Layout};

use crate::community::{DataSource, GraphData, GraphSummary};
use crate::config::AppConfig;

use super::super::graph::InteractionController;
use super::super::physics::SimulationState;
use super::super::{ChatState, TickStats, ViewModel, ViewScratch};

impl ViewModel {
    pub(in crate::app) fn new(graph: GraphData, source: DataSource, config: &AppConfig) -> Self {
        let summary = GraphSummary::from_graph(&graph);
        let data_path_input = match &source {
            DataSource::File(path) => path.display().to_string(),
            DataSource::Sample => String::new(),
        };

        Self {
            graph,
            summary,
            source,
            layout: config.layout,
            assistant_config: config.assistant.clone(),
            controller: InteractionController::default(),
            simulation: None,
            graph_dirty: true,
            graph_revision: 0,
            tick_stats: Rc::new(Cell::new(TickStats::default())),
            live_physics: true,
            show_labels: true,
            show_time_axis: true,
            search: String::new(),
            search_match_cache: None,
            view_scratch: ViewScratch::default(),
            data_path_input,
            export_path_input: "sample_community_events.csv".to_owned(),
            status: None,
            chat: ChatState::default(),
        }
    }

    fn simulation_status_text(&self) -> Option<String> {
        let simulation = self.simulation.as_ref()?;
        let stats = self.tick_stats.get();
        let state = match simulation.state() {
            SimulationState::Running => "running",
            SimulationState::Settled => "settled",
            SimulationState::Stopped => "stopped",
        };
        let viewport = simulation.viewport();
        Some(format!(
            "layout {state} | alpha {:.3} | ticks {} | {:.0}x{:.0}",
            stats.alpha, stats.ticks, viewport.x, viewport.y
        ))
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_request: &mut Option<DataSource>,
        is_loading: bool,
    ) {
        self.poll_chat(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Community graph");
                    ui.separator();
                    ui.label(format!("source: {}", self.source));
                    ui.label(format!("nodes: {}", self.graph.nodes.len()));
                    ui.label(format!("edges: {}", self.graph.edges.len()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload data"));
                    if reload_button.clicked() {
                        *reload_request = Some(self.source.clone());
                    }
                    if ui.button("Rebuild layout").clicked() {
                        self.graph_dirty = true;
                    }
                    if ui.button("Reset view").clicked() {
                        self.controller.reset_view();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(status) = self.simulation_status_text() {
                            ui.label(status);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui, reload_request, is_loading));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.draw_details(ui);
                    ui.separator();
                    self.draw_chat(ui);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Loading community graph...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }
}
