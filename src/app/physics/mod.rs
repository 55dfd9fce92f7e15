mod forces;
mod links;
mod quadtree;

use std::sync::atomic::{AtomicU64, Ordering};

use eframe::egui::{Vec2, vec2};

use crate::community::{GraphData, NodeKind};
use crate::config::LayoutConfig;
use crate::util::stable_pair;

use super::timeline::TimeScale;
use forces::{
    ChargeParams, CollisionParams, PositionTarget, accumulate_charge_for_node,
    accumulate_collision_pairs, apply_center, apply_links, apply_position_targets,
};
use links::LinkDistancePolicy;
use quadtree::QuadNode;

const INITIAL_RADIUS: f32 = 10.0;
const JITTER_SCALE: f32 = 1e-3;

static NEXT_SIMULATION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum SimulationState {
    Running,
    Settled,
    Stopped,
}

pub(in crate::app) struct SimNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub time: Option<String>,
    pub timestamp: Option<i64>,
    pub position: Vec2,
    pub velocity: Vec2,
    pub pinned: Option<Vec2>,
}

pub(in crate::app) struct SimEdge {
    /// Index into the source `GraphData::edges`.
    pub edge: usize,
    pub source: usize,
    pub target: usize,
    pub distance: f32,
    strength: f32,
    bias: f32,
}

/// Fully resolved positions handed to tick listeners.
pub(in crate::app) struct Tick<'a> {
    pub alpha: f32,
    pub positions: &'a [Vec2],
}

/// Ticket for one externally driven frame; only honoured by the live simulation that
/// issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct ScheduledTick {
    simulation: u64,
}

type TickListener = Box<dyn FnMut(&Tick<'_>)>;

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    predicted: Vec<Vec2>,
    deltas: Vec<Vec2>,
    jitters: Vec<Vec2>,
    targets: Vec<PositionTarget>,
}

pub(in crate::app) struct Simulation {
    id: u64,
    nodes: Vec<SimNode>,
    edges: Vec<SimEdge>,
    viewport: Vec2,
    config: LayoutConfig,
    time_scale: Option<TimeScale>,
    alpha: f32,
    alpha_target: f32,
    state: SimulationState,
    listeners: Vec<TickListener>,
    scratch: PhysicsScratch,
}

fn initial_position(index: usize, center: Vec2) -> Vec2 {
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
    let angle = index as f32 * golden_angle;
    center + vec2(angle.cos(), angle.sin()) * radius
}

fn clamp_axis(value: f32, margin: f32, extent: f32) -> f32 {
    if extent <= margin * 2.0 {
        return extent * 0.5;
    }
    value.clamp(margin, extent - margin)
}

impl Simulation {
    pub fn new(graph: &GraphData, viewport: Vec2, config: LayoutConfig) -> Self {
        let center = viewport * 0.5;
        let index_by_id = graph.index_by_id();

        let nodes = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| SimNode {
                id: node.id.clone(),
                kind: node.kind,
                label: node.label().to_owned(),
                time: node.time.clone(),
                timestamp: node.timestamp(),
                position: initial_position(index, center),
                velocity: Vec2::ZERO,
                pinned: None,
            })
            .collect::<Vec<_>>();

        let mut degree = vec![0usize; nodes.len()];
        let mut resolved = Vec::with_capacity(graph.edges.len());
        for (edge_index, edge) in graph.edges.iter().enumerate() {
            let (Some(&source), Some(&target)) = (
                index_by_id.get(edge.source.as_str()),
                index_by_id.get(edge.target.as_str()),
            ) else {
                log::warn!(
                    "ignoring edge {} -> {} with a missing endpoint",
                    edge.source,
                    edge.target
                );
                continue;
            };
            degree[source] += 1;
            degree[target] += 1;
            resolved.push((edge_index, source, target));
        }

        let policy = LinkDistancePolicy {
            base: config.base_link_distance,
        };
        let edges = resolved
            .into_iter()
            .map(|(edge, source, target)| {
                let (source_degree, target_degree) = (degree[source] as f32, degree[target] as f32);
                SimEdge {
                    edge,
                    source,
                    target,
                    distance: policy.distance(nodes[source].kind, nodes[target].kind),
                    strength: 1.0 / source_degree.min(target_degree).max(1.0),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect::<Vec<_>>();

        let time_scale = TimeScale::from_nodes(&graph.nodes, viewport.x, config.margins);

        let mut scratch = PhysicsScratch::default();
        scratch.jitters = nodes
            .iter()
            .map(|node| {
                let (x, y) = stable_pair(&node.id);
                vec2(x, y) * JITTER_SCALE
            })
            .collect();

        let mut simulation = Self {
            id: NEXT_SIMULATION_ID.fetch_add(1, Ordering::Relaxed),
            nodes,
            edges,
            viewport,
            config,
            time_scale,
            alpha: 1.0,
            alpha_target: 0.0,
            state: SimulationState::Running,
            listeners: Vec::new(),
            scratch,
        };
        simulation.clamp_positions();
        simulation.refresh_position_targets();

        log::debug!(
            "simulation {} started with {} nodes, {} edges, time axis: {}",
            simulation.id,
            simulation.nodes.len(),
            simulation.edges.len(),
            simulation.time_scale.is_some()
        );
        simulation
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn time_scale(&self) -> Option<&TimeScale> {
        self.time_scale.as_ref()
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SimEdge] {
        &self.edges
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    /// Registers a callback observing every completed tick until the simulation stops.
    pub fn subscribe(&mut self, listener: impl FnMut(&Tick<'_>) + 'static) {
        if self.state == SimulationState::Stopped {
            return;
        }
        self.listeners.push(Box::new(listener));
    }

    pub fn schedule(&self) -> Option<ScheduledTick> {
        (self.state == SimulationState::Running).then_some(ScheduledTick {
            simulation: self.id,
        })
    }

    /// Runs a previously scheduled frame. Tickets from another or a stopped instance do
    /// nothing.
    pub fn run(&mut self, ticket: ScheduledTick) -> bool {
        if ticket.simulation != self.id {
            return false;
        }
        self.tick()
    }

    pub fn tick(&mut self) -> bool {
        if self.state != SimulationState::Running {
            return false;
        }

        self.step();

        self.scratch.positions.clear();
        self.scratch
            .positions
            .extend(self.nodes.iter().map(|node| node.position));
        let tick = Tick {
            alpha: self.alpha,
            positions: &self.scratch.positions,
        };
        for listener in &mut self.listeners {
            listener(&tick);
        }

        if self.alpha <= self.config.alpha_min {
            self.state = SimulationState::Settled;
            log::debug!("simulation {} settled", self.id);
        }
        true
    }

    /// Resumes ticking after settlement; a stopped simulation stays stopped.
    pub fn restart(&mut self) {
        if self.state == SimulationState::Settled {
            self.state = SimulationState::Running;
            log::debug!("simulation {} reheated", self.id);
        }
    }

    pub fn set_alpha_target(&mut self, alpha_target: f32) {
        self.alpha_target = alpha_target.clamp(0.0, 1.0);
    }

    pub fn set_config(&mut self, config: LayoutConfig) {
        if self.config == config {
            return;
        }

        let policy = LinkDistancePolicy {
            base: config.base_link_distance,
        };
        for edge in &mut self.edges {
            edge.distance = policy.distance(self.nodes[edge.source].kind, self.nodes[edge.target].kind);
        }
        if let Some(scale) = self.time_scale {
            let start = config.margins.left;
            let end = (self.viewport.x - config.margins.right).max(start + 1.0);
            self.time_scale = Some(TimeScale::new(scale.domain(), (start, end)));
        }

        self.config = config;
        self.refresh_position_targets();
        self.alpha = self.alpha.max(self.config.alpha_min * 10.0);
        self.restart();
    }

    pub fn pin(&mut self, index: usize, position: Vec2) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.pinned = Some(position);
            self.restart();
        }
    }

    pub fn unpin(&mut self, index: usize) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.pinned = None;
        }
    }

    /// Terminal and idempotent. Drops every listener so nothing observes a later frame.
    pub fn stop(&mut self) {
        if self.state == SimulationState::Stopped {
            return;
        }
        self.state = SimulationState::Stopped;
        self.listeners.clear();
        log::debug!("simulation {} stopped", self.id);
    }

    fn refresh_position_targets(&mut self) {
        let targets = &mut self.scratch.targets;
        targets.clear();

        let Some(scale) = self.time_scale else {
            return;
        };

        let config = &self.config;
        let margins = config.margins;
        let center = self.viewport * 0.5;
        let drawable_height = (self.viewport.y - margins.top - margins.bottom).max(0.0);
        let band_y = margins.top + drawable_height * config.timeline_band.clamp(0.0, 1.0);

        targets.extend(self.nodes.iter().map(|node| match (node.kind, node.timestamp) {
            (NodeKind::Event, Some(timestamp)) => PositionTarget {
                target: vec2(scale.map(timestamp), band_y),
                strength: vec2(config.time_x_strength, config.time_y_strength),
            },
            _ => PositionTarget {
                target: center,
                strength: Vec2::splat(config.free_pull_strength),
            },
        }));
    }

    fn step(&mut self) {
        let node_count = self.nodes.len();
        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        if node_count == 0 {
            return;
        }

        let alpha = self.alpha;
        let config = self.config;
        let scratch = &mut self.scratch;

        scratch.positions.clear();
        scratch.positions.extend(self.nodes.iter().map(|node| node.position));
        scratch.velocities.clear();
        scratch.velocities.extend(self.nodes.iter().map(|node| node.velocity));

        apply_links(
            &self.edges,
            &scratch.positions,
            &mut scratch.velocities,
            &scratch.jitters,
            alpha,
        );

        if let Some(quadtree) = QuadNode::build(&scratch.positions) {
            let params = ChargeParams {
                strength: config.charge_strength,
                theta_sq: config.charge_theta * config.charge_theta,
                distance_min_sq: 1.0,
                distance_max_sq: config.charge_distance_max * config.charge_distance_max,
            };
            for (index, velocity) in scratch.velocities.iter_mut().enumerate() {
                accumulate_charge_for_node(
                    &quadtree,
                    index,
                    &scratch.positions,
                    &scratch.jitters,
                    params,
                    alpha,
                    velocity,
                );
            }
        }

        apply_center(
            &mut scratch.positions,
            self.viewport * 0.5,
            config.center_strength.clamp(0.0, 1.0),
        );

        scratch.predicted.clear();
        scratch.predicted.extend(
            scratch
                .positions
                .iter()
                .zip(&scratch.velocities)
                .map(|(position, velocity)| *position + *velocity),
        );
        scratch.deltas.clear();
        scratch.deltas.resize(node_count, Vec2::ZERO);
        if config.collision_radius > 0.0
            && let Some(quadtree) = QuadNode::build(&scratch.predicted)
        {
            accumulate_collision_pairs(
                &quadtree,
                &quadtree,
                true,
                &scratch.predicted,
                &scratch.jitters,
                CollisionParams {
                    collision_strength: config.collision_strength,
                    min_distance: config.collision_radius * 2.0,
                },
                &mut scratch.deltas,
            );
        }
        for (velocity, delta) in scratch.velocities.iter_mut().zip(&scratch.deltas) {
            *velocity += *delta;
        }

        apply_position_targets(
            &scratch.targets,
            &scratch.positions,
            &mut scratch.velocities,
            alpha,
        );

        let retain = 1.0 - config.velocity_decay.clamp(0.0, 1.0);
        for ((node, position), velocity) in self
            .nodes
            .iter_mut()
            .zip(&scratch.positions)
            .zip(&scratch.velocities)
        {
            if let Some(pinned) = node.pinned {
                node.position = pinned;
                node.velocity = Vec2::ZERO;
            } else {
                node.velocity = *velocity * retain;
                node.position = *position + node.velocity;
            }
        }

        self.clamp_positions();
    }

    fn clamp_positions(&mut self) {
        let margin = self.config.boundary_margin;
        for node in &mut self.nodes {
            node.position.x = clamp_axis(node.position.x, margin, self.viewport.x);
            node.position.y = clamp_axis(node.position.y, margin, self.viewport.y);
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;
    use crate::community::graph::Relationship;
    use crate::community::{Edge, Node};
    use crate::config::Margins;

    fn scenario() -> GraphData {
        GraphData {
            nodes: vec![
                Node::new("member:A", NodeKind::Member, "A"),
                Node::new("member:B", NodeKind::Member, "B"),
                Node::new("event:E@2025-09-24 09:45", NodeKind::Event, "E")
                    .with_time("2025-09-24 09:45"),
                Node::new("event:F@2025-10-14 19:30", NodeKind::Event, "F")
                    .with_time("2025-10-14 19:30"),
                Node::new("space:V", NodeKind::Space, "V"),
            ],
            edges: vec![
                Edge::new("member:A", "event:E@2025-09-24 09:45", Relationship::Initiates),
                Edge::new("event:E@2025-09-24 09:45", "member:B", Relationship::Participates),
                Edge::new("space:V", "event:E@2025-09-24 09:45", Relationship::Hosts),
                Edge::new("space:V", "event:F@2025-10-14 19:30", Relationship::Hosts),
            ],
        }
    }

    fn assert_within_bounds(simulation: &Simulation) {
        let margin = simulation.config().boundary_margin;
        let viewport = simulation.viewport();
        for node in simulation.nodes() {
            assert!(node.position.x >= margin && node.position.x <= viewport.x - margin);
            assert!(node.position.y >= margin && node.position.y <= viewport.y - margin);
        }
    }

    #[test]
    fn runs_until_settled_then_stops_ticking() {
        let mut simulation = Simulation::new(&scenario(), vec2(800.0, 600.0), LayoutConfig::default());
        let mut ticks = 0;
        while simulation.tick() {
            ticks += 1;
            assert!(ticks < 1000, "simulation never settled");
        }
        assert_eq!(simulation.state(), SimulationState::Settled);
        assert!(simulation.alpha() < simulation.config().alpha_min);
        assert!(!simulation.tick());
        assert!(simulation.schedule().is_none());
    }

    #[test]
    fn positions_stay_inside_margins_every_tick() {
        let mut simulation = Simulation::new(&scenario(), vec2(300.0, 200.0), LayoutConfig::default());
        assert_within_bounds(&simulation);
        for _ in 0..50 {
            simulation.tick();
            assert_within_bounds(&simulation);
        }
    }

    #[test]
    fn timed_events_drift_toward_chronological_order() {
        let graph = scenario();
        let mut simulation = Simulation::new(&graph, vec2(1000.0, 700.0), LayoutConfig::default());
        while simulation.tick() {}

        let early = simulation.node_index("event:E@2025-09-24 09:45").unwrap();
        let late = simulation.node_index("event:F@2025-10-14 19:30").unwrap();
        assert!(simulation.nodes()[early].position.x < simulation.nodes()[late].position.x);
    }

    #[test]
    fn untimed_graph_has_no_time_axis() {
        let graph = GraphData {
            nodes: vec![
                Node::new("member:A", NodeKind::Member, "A"),
                Node::new("event:E@", NodeKind::Event, "E"),
            ],
            edges: vec![Edge::new("member:A", "event:E@", Relationship::Initiates)],
        };
        let simulation = Simulation::new(&graph, vec2(800.0, 600.0), LayoutConfig::default());
        assert!(simulation.time_scale().is_none());
    }

    #[test]
    fn pinned_node_holds_its_position() {
        let mut simulation = Simulation::new(&scenario(), vec2(800.0, 600.0), LayoutConfig::default());
        simulation.pin(0, vec2(123.0, 321.0));
        for _ in 0..10 {
            simulation.tick();
        }
        assert_eq!(simulation.nodes()[0].position, vec2(123.0, 321.0));

        simulation.unpin(0);
        simulation.tick();
        assert!(simulation.nodes()[0].pinned.is_none());
    }

    #[test]
    fn alpha_target_keeps_simulation_warm_and_restart_reheats() {
        let mut simulation = Simulation::new(&scenario(), vec2(800.0, 600.0), LayoutConfig::default());
        while simulation.tick() {}
        assert_eq!(simulation.state(), SimulationState::Settled);

        simulation.set_alpha_target(0.3);
        simulation.restart();
        for _ in 0..500 {
            assert!(simulation.tick());
        }
        assert!((simulation.alpha() - 0.3).abs() < 0.01);

        simulation.set_alpha_target(0.0);
        let mut ticks = 0;
        while simulation.tick() {
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert_eq!(simulation.state(), SimulationState::Settled);
    }

    #[test]
    fn listeners_see_resolved_positions() {
        let mut simulation = Simulation::new(&scenario(), vec2(800.0, 600.0), LayoutConfig::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        simulation.subscribe(move |tick| sink.borrow_mut().push(tick.positions.to_vec()));

        simulation.tick();
        let positions = simulation.nodes().iter().map(|node| node.position).collect::<Vec<_>>();
        assert_eq!(seen.borrow().last(), Some(&positions));
    }

    #[test]
    fn stop_is_idempotent_and_silences_scheduled_ticks() {
        let mut simulation = Simulation::new(&scenario(), vec2(800.0, 600.0), LayoutConfig::default());
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        simulation.subscribe(move |_| counter.set(counter.get() + 1));

        let ticket = simulation.schedule().unwrap();
        simulation.stop();
        simulation.stop();

        assert!(!simulation.run(ticket));
        assert!(!simulation.tick());
        simulation.restart();
        assert_eq!(simulation.state(), SimulationState::Stopped);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn tickets_do_not_cross_simulations() {
        let graph = scenario();
        let old = Simulation::new(&graph, vec2(800.0, 600.0), LayoutConfig::default());
        let mut fresh = Simulation::new(&graph, vec2(800.0, 600.0), LayoutConfig::default());
        let stale = old.schedule().unwrap();
        assert!(!fresh.run(stale));
        let ticket = fresh.schedule().unwrap();
        assert!(fresh.run(ticket));
    }

    #[test]
    fn config_change_reheats_and_rescales_links() {
        let mut simulation = Simulation::new(&scenario(), vec2(800.0, 600.0), LayoutConfig::default());
        while simulation.tick() {}

        let config = LayoutConfig {
            base_link_distance: 80.0,
            ..LayoutConfig::default()
        };
        simulation.set_config(config);
        assert_eq!(simulation.state(), SimulationState::Running);
        assert_eq!(simulation.edges()[0].distance, 160.0);
    }

    #[test]
    fn margin_edits_keep_the_time_range_increasing() {
        let mut simulation = Simulation::new(&scenario(), vec2(400.0, 600.0), LayoutConfig::default());
        let config = LayoutConfig {
            margins: Margins {
                left: 300.0,
                right: 200.0,
                ..Margins::default()
            },
            ..LayoutConfig::default()
        };
        simulation.set_config(config);

        let scale = simulation.time_scale().unwrap();
        assert_eq!(scale.range(), (300.0, 301.0));
        let (early, late) = scale.domain();
        assert!(scale.map(early) < scale.map(late));
    }

    #[test]
    fn settles_when_alpha_reaches_alpha_min_exactly() {
        let config = LayoutConfig {
            alpha_min: 0.0,
            alpha_decay: 1.0,
            ..LayoutConfig::default()
        };
        let mut simulation = Simulation::new(&scenario(), vec2(800.0, 600.0), config);
        assert!(simulation.tick());
        assert_eq!(simulation.alpha(), 0.0);
        assert_eq!(simulation.state(), SimulationState::Settled);
    }

    #[test]
    fn empty_graph_settles_quietly() {
        let mut simulation =
            Simulation::new(&GraphData::default(), vec2(800.0, 600.0), LayoutConfig::default());
        while simulation.tick() {}
        assert_eq!(simulation.state(), SimulationState::Settled);
    }

    proptest! {
        #[test]
        fn clamp_holds_for_any_viewport(
            width in 60.0f32..2000.0,
            height in 60.0f32..2000.0,
            ticks in 1usize..40,
        ) {
            let mut simulation =
                Simulation::new(&scenario(), vec2(width, height), LayoutConfig::default());
            for _ in 0..ticks {
                simulation.tick();
            }
            let margin = simulation.config().boundary_margin;
            for node in simulation.nodes() {
                prop_assert!(node.position.x >= margin && node.position.x <= width - margin);
                prop_assert!(node.position.y >= margin && node.position.y <= height - margin);
            }
        }
    }
}
