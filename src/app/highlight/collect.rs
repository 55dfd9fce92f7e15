use std::collections::{HashMap, HashSet};

use crate::community::Edge;

/// Outgoing `(target, edge index)` pairs keyed by source id.
pub(super) fn forward_adjacency(edges: &[Edge]) -> HashMap<&str, Vec<(&str, usize)>> {
    let mut adjacency: HashMap<&str, Vec<(&str, usize)>> = HashMap::new();
    for (index, edge) in edges.iter().enumerate() {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push((edge.target.as_str(), index));
    }
    adjacency
}

pub(super) fn collect_downstream<'a>(
    adjacency: &HashMap<&'a str, Vec<(&'a str, usize)>>,
    start_id: &'a str,
    related_nodes: &mut HashSet<&'a str>,
    related_edges: &mut HashSet<usize>,
) {
    let mut stack = vec![start_id];
    let mut visited = HashSet::from([start_id]);

    while let Some(node_id) = stack.pop() {
        let Some(neighbors) = adjacency.get(node_id) else {
            continue;
        };

        for &(next_id, edge_index) in neighbors {
            related_edges.insert(edge_index);
            if next_id != start_id {
                related_nodes.insert(next_id);
            }
            if visited.insert(next_id) {
                stack.push(next_id);
            }
        }
    }
}
