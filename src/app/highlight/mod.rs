use std::collections::HashSet;

use crate::community::Edge;

mod collect;

use self::collect::{collect_downstream, forward_adjacency};

/// Everything downstream of a start node. The start node itself is never part of
/// `nodes`, even when a cycle leads back to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct Reachable {
    pub nodes: HashSet<String>,
    /// Indices into the edge slice the traversal ran over.
    pub edges: HashSet<usize>,
}

pub(in crate::app) fn reachable(start_id: &str, edges: &[Edge]) -> Reachable {
    let adjacency = forward_adjacency(edges);
    let mut related_nodes = HashSet::new();
    let mut related_edges = HashSet::new();
    collect_downstream(&adjacency, start_id, &mut related_nodes, &mut related_edges);

    Reachable {
        nodes: related_nodes.into_iter().map(str::to_owned).collect(),
        edges: related_edges,
    }
}

/// Emphasis derived from the current selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct HighlightState {
    pub selected: Option<String>,
    pub downstream: Reachable,
}

impl HighlightState {
    pub fn for_selection(selected: Option<&str>, edges: &[Edge]) -> Self {
        match selected {
            Some(id) => Self {
                selected: Some(id.to_owned()),
                downstream: reachable(id, edges),
            },
            None => Self::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.selected.is_some()
    }

    /// Selected node or anything downstream of it.
    pub fn emphasizes_node(&self, id: &str) -> bool {
        self.selected.as_deref() == Some(id) || self.downstream.nodes.contains(id)
    }

    pub fn emphasizes_edge(&self, edge_index: usize) -> bool {
        self.downstream.edges.contains(&edge_index)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::community::graph::Relationship;

    fn edge(source: &str, target: &str) -> Edge {
        Edge::new(source, target, Relationship::Other("link".to_owned()))
    }

    fn ids(values: &[&str]) -> HashSet<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    fn scenario() -> Vec<Edge> {
        vec![
            Edge::new("A", "E", Relationship::Initiates),
            Edge::new("E", "B", Relationship::Participates),
            Edge::new("V", "E", Relationship::Hosts),
        ]
    }

    #[test]
    fn initiator_reaches_event_and_participants() {
        let result = reachable("A", &scenario());
        assert_eq!(result.nodes, ids(&["E", "B"]));
        assert_eq!(result.edges, HashSet::from([0, 1]));
    }

    #[test]
    fn venue_reaches_the_same_downstream_through_its_own_edge() {
        let result = reachable("V", &scenario());
        assert_eq!(result.nodes, ids(&["E", "B"]));
        assert_eq!(result.edges, HashSet::from([2, 1]));
    }

    #[test]
    fn upstream_nodes_are_not_reachable() {
        let result = reachable("E", &scenario());
        assert_eq!(result.nodes, ids(&["B"]));
        assert!(reachable("B", &scenario()).nodes.is_empty());
    }

    #[test]
    fn cycles_terminate_and_exclude_start() {
        let edges = vec![edge("A", "B"), edge("B", "A")];
        let result = reachable("A", &edges);
        assert_eq!(result.nodes, ids(&["B"]));
        assert_eq!(result.edges, HashSet::from([0, 1]));
    }

    #[test]
    fn unknown_start_is_empty() {
        assert_eq!(reachable("missing", &scenario()), Reachable::default());
    }

    #[test]
    fn deep_chains_do_not_recurse() {
        let edges = (0..10_000)
            .map(|index| edge(&format!("n{index}"), &format!("n{}", index + 1)))
            .collect::<Vec<_>>();
        let result = reachable("n0", &edges);
        assert_eq!(result.nodes.len(), 10_000);
        assert_eq!(result.edges.len(), 10_000);
    }

    #[test]
    fn highlight_state_tracks_selection() {
        let state = HighlightState::for_selection(Some("A"), &scenario());
        assert!(state.is_active());
        assert!(state.emphasizes_node("A"));
        assert!(state.emphasizes_node("B"));
        assert!(!state.emphasizes_node("V"));
        assert!(state.emphasizes_edge(0));
        assert!(!state.emphasizes_edge(2));

        assert!(!HighlightState::for_selection(None, &scenario()).is_active());
    }

    proptest! {
        #[test]
        fn reachable_set_is_closed_under_outgoing_edges(
            pairs in prop::collection::vec((0u8..12, 0u8..12), 0..40),
            start in 0u8..12,
        ) {
            let edges = pairs
                .iter()
                .map(|(source, target)| edge(&format!("n{source}"), &format!("n{target}")))
                .collect::<Vec<_>>();
            let start = format!("n{start}");
            let result = reachable(&start, &edges);
            let in_scope = |id: &str| id == start || result.nodes.contains(id);

            prop_assert!(!result.nodes.contains(&start));
            for (index, edge) in edges.iter().enumerate() {
                prop_assert_eq!(result.edges.contains(&index), in_scope(&edge.source));
                if result.edges.contains(&index) {
                    prop_assert!(in_scope(&edge.target));
                }
            }
            for node in &result.nodes {
                prop_assert!(result.edges.iter().any(|index| edges[*index].target == *node));
            }
        }
    }
}
