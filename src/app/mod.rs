use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Pos2};

use crate::assistant::ChatHandle;
use crate::community::{DataSource, GraphData, GraphSummary};
use crate::config::{AppConfig, AssistantConfig, LayoutConfig};

mod graph;
mod highlight;
mod physics;
mod render_utils;
mod timeline;
mod transform;
mod ui;

use self::graph::InteractionController;
use self::physics::Simulation;

type LoadResult = Result<(DataSource, GraphData), String>;

pub struct CommunityGraphApp {
    source: DataSource,
    config: AppConfig,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

/// Latest tick observed through the simulation's listener.
#[derive(Clone, Copy, Debug, Default)]
struct TickStats {
    ticks: u64,
    alpha: f32,
}

struct ViewModel {
    graph: GraphData,
    summary: GraphSummary,
    source: DataSource,
    layout: LayoutConfig,
    assistant_config: AssistantConfig,
    controller: InteractionController,
    simulation: Option<Simulation>,
    graph_dirty: bool,
    graph_revision: u64,
    tick_stats: Rc<Cell<TickStats>>,
    live_physics: bool,
    show_labels: bool,
    show_time_axis: bool,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    view_scratch: ViewScratch,
    data_path_input: String,
    export_path_input: String,
    status: Option<String>,
    chat: ChatState,
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Arc<HashSet<usize>>,
}

#[derive(Default)]
struct ViewScratch {
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    visible_indices: Vec<usize>,
}

struct ChatTurn {
    question: String,
    answer: String,
    error: Option<String>,
    done: bool,
}

#[derive(Default)]
struct ChatState {
    input: String,
    turns: Vec<ChatTurn>,
    active: Option<ChatHandle>,
    provider_label: Option<String>,
}

impl CommunityGraphApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, source: DataSource, config: AppConfig) -> Self {
        let state = Self::start_load(source.clone());
        Self {
            source,
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(source: DataSource) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = source
                .load()
                .map(|graph| (source, graph))
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: DataSource) -> AppState {
        log::info!("loading graph from {source}");
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }
}

impl eframe::App for CommunityGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok((source, graph))) => {
                        self.source = source.clone();
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(
                            graph,
                            source,
                            &self.config,
                        ))));
                    }
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Loading community graph from {}...", self.source));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load community graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    ui.horizontal(|ui| {
                        if ui.button("Retry").clicked() {
                            transition = Some(Self::start_load(self.source.clone()));
                        }
                        if ui.button("Open sample").clicked() {
                            transition = Some(Self::start_load(DataSource::Sample));
                        }
                    });
                });
            }
            AppState::Ready(model) => {
                let mut reload_request = None;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_request, is_reloading);

                if let Some(source) = reload_request
                    && self.reload_rx.is_none()
                {
                    log::info!("reloading graph from {source}");
                    self.reload_rx = Some(Self::spawn_load(source));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok((source, graph))) => {
                            self.source = source.clone();
                            model.replace_graph(graph, source);
                        }
                        Ok(Err(error)) => {
                            log::warn!("reload failed: {error}");
                            model.status = Some(error);
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.status = Some("Background load worker disconnected".to_owned());
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
