use std::collections::HashMap;
use std::fmt::Write;

use super::graph::{GraphData, NodeKind, Relationship};
use super::time::format_timestamp;

#[derive(Clone, Debug, PartialEq)]
pub struct GraphSummary {
    pub member_count: usize,
    pub event_count: usize,
    pub space_count: usize,
    pub edge_count: usize,
    pub events_by_space: Vec<(String, usize)>,
    pub member_participation: Vec<(String, usize)>,
    pub time_range: Option<(i64, i64)>,
}

/// Ranks per-node counts, labelling each node only after counting so that distinct
/// nodes sharing a display name stay separate entries.
fn ranked_labels(graph: &GraphData, counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let index_by_id = graph.index_by_id();
    let mut entries = counts
        .into_iter()
        .filter_map(|(id, count)| {
            let &index = index_by_id.get(id)?;
            Some((graph.nodes[index].label(), id, count))
        })
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| {
        b.2.cmp(&a.2)
            .then_with(|| a.0.cmp(b.0))
            .then_with(|| a.1.cmp(b.1))
    });
    entries
        .into_iter()
        .map(|(label, _, count)| (label.to_owned(), count))
        .collect()
}

impl GraphSummary {
    pub fn from_graph(graph: &GraphData) -> Self {
        let mut events_by_space: HashMap<&str, usize> = HashMap::new();
        let mut participation: HashMap<&str, usize> = graph
            .nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Member)
            .map(|node| (node.id.as_str(), 0))
            .collect();

        for edge in &graph.edges {
            match edge.relationship {
                Relationship::Hosts => {
                    *events_by_space.entry(edge.source.as_str()).or_default() += 1;
                }
                Relationship::Initiates => {
                    *participation.entry(edge.source.as_str()).or_default() += 1;
                }
                Relationship::Participates => {
                    *participation.entry(edge.target.as_str()).or_default() += 1;
                }
                Relationship::Other(_) => {}
            }
        }

        let time_range = graph
            .nodes
            .iter()
            .filter_map(|node| node.timestamp())
            .fold(None, |range: Option<(i64, i64)>, timestamp| {
                Some(match range {
                    Some((min, max)) => (min.min(timestamp), max.max(timestamp)),
                    None => (timestamp, timestamp),
                })
            });

        Self {
            member_count: graph.count_kind(NodeKind::Member),
            event_count: graph.count_kind(NodeKind::Event),
            space_count: graph.count_kind(NodeKind::Space),
            edge_count: graph.edges.len(),
            events_by_space: ranked_labels(graph, events_by_space),
            member_participation: ranked_labels(graph, participation),
            time_range,
        }
    }

    pub fn node_count(&self) -> usize {
        self.member_count + self.event_count + self.space_count
    }

    /// Plain-text context block handed to the assistant.
    pub fn to_context(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(
            text,
            "Nodes: {} (members: {}, events: {}, spaces: {})",
            self.node_count(),
            self.member_count,
            self.event_count,
            self.space_count
        );
        let _ = writeln!(text, "Edges: {}", self.edge_count);

        let spaces = self
            .events_by_space
            .iter()
            .map(|(space, count)| format!("{space} ({count})"))
            .collect::<Vec<_>>();
        let _ = writeln!(text, "Events per space: {}", spaces.join(", "));

        let members = self
            .member_participation
            .iter()
            .take(3)
            .map(|(member, count)| format!("{member} ({count})"))
            .collect::<Vec<_>>();
        let _ = writeln!(text, "Most active members: {}", members.join(", "));

        match self.time_range {
            Some((start, end)) => {
                let _ = writeln!(
                    text,
                    "Time range: {} to {}",
                    format_timestamp(start, "%Y-%m-%d"),
                    format_timestamp(end, "%Y-%m-%d")
                );
            }
            None => {
                let _ = writeln!(text, "Time range: unknown");
            }
        }

        text
    }
}
