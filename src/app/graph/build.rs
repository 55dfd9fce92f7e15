use std::rc::Rc;

use crate::community::{DataSource, GraphData, GraphSummary};

use super::super::physics::{Simulation, SimulationState};
use super::super::{TickStats, ViewModel};

/// Below this the canvas has not been laid out yet.
const MIN_LAYOUT_EXTENT: f32 = 40.0;

impl ViewModel {
    /// Swaps in a freshly loaded graph. The layout is rebuilt on the next frame.
    pub(in crate::app) fn replace_graph(&mut self, graph: GraphData, source: DataSource) {
        self.summary = GraphSummary::from_graph(&graph);
        self.graph = graph;
        self.source = source;
        self.status = None;

        let index_by_id = self.graph.index_by_id();
        self.controller
            .refresh_selection(&self.graph.edges, |id| index_by_id.contains_key(id));
        self.graph_dirty = true;
    }

    /// Tears down the running simulation and starts a new one over the current graph and
    /// canvas size. Positions restart from the initial spiral.
    pub(in crate::app) fn rebuild_layout(&mut self) {
        if let Some(mut previous) = self.simulation.take() {
            previous.stop();
        }
        self.controller.discard_drag();
        self.graph_revision = self.graph_revision.wrapping_add(1);
        self.search_match_cache = None;
        self.graph_dirty = false;

        let size = self.controller.size();
        if self.graph.is_empty() || size.x < MIN_LAYOUT_EXTENT || size.y < MIN_LAYOUT_EXTENT {
            return;
        }

        let mut simulation = Simulation::new(&self.graph, size, self.layout);
        self.tick_stats.set(TickStats::default());
        let stats = Rc::clone(&self.tick_stats);
        simulation.subscribe(move |tick| {
            let previous = stats.get();
            stats.set(TickStats {
                ticks: previous.ticks + 1,
                alpha: tick.alpha,
            });
        });

        log::info!(
            "rebuilt layout for {} nodes at {:.0}x{:.0} (revision {})",
            self.graph.nodes.len(),
            size.x,
            size.y,
            self.graph_revision
        );
        self.simulation = Some(simulation);
    }

    /// Pushes edited force parameters into the live simulation without resetting positions.
    pub(in crate::app) fn apply_layout_config(&mut self) {
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.set_config(self.layout);
        }
    }

    /// Advances one frame if the simulation is still moving. Returns whether it did.
    pub(in crate::app) fn step_simulation(&mut self) -> bool {
        if !self.live_physics {
            return false;
        }
        let Some(simulation) = self.simulation.as_mut() else {
            return false;
        };
        let Some(ticket) = simulation.schedule() else {
            return false;
        };
        let moved = simulation.run(ticket);
        if simulation.state() == SimulationState::Settled {
            log::debug!(
                "layout settled after {} ticks (alpha {:.4})",
                self.tick_stats.get().ticks,
                simulation.alpha()
            );
        }
        moved
    }
}
