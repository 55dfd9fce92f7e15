use crate::community::NodeKind;

/// Rest length of an edge, decided by the kinds of its endpoints only.
///
/// Member→event fan-in edges are long and event→member fan-out edges are short, so
/// each event sits closer to its participants than to its initiators and venues.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LinkDistancePolicy {
    pub base: f32,
}

impl Default for LinkDistancePolicy {
    fn default() -> Self {
        Self { base: 50.0 }
    }
}

impl LinkDistancePolicy {
    pub fn factor(source: NodeKind, target: NodeKind) -> f32 {
        match (source, target) {
            (NodeKind::Member, NodeKind::Event) => 2.0,
            (NodeKind::Event, NodeKind::Member) => 1.0,
            (NodeKind::Event, NodeKind::Space) => 2.5,
            _ => 1.0,
        }
    }

    pub fn distance(self, source: NodeKind, target: NodeKind) -> f32 {
        self.base * Self::factor(source, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_overrides_specific_pairs() {
        let policy = LinkDistancePolicy::default();
        assert_eq!(policy.distance(NodeKind::Member, NodeKind::Event), 100.0);
        assert_eq!(policy.distance(NodeKind::Event, NodeKind::Member), 50.0);
        assert_eq!(policy.distance(NodeKind::Event, NodeKind::Space), 125.0);
        assert_eq!(policy.distance(NodeKind::Space, NodeKind::Event), 50.0);
        assert_eq!(policy.distance(NodeKind::Member, NodeKind::Member), 50.0);
    }

    #[test]
    fn distance_depends_only_on_kind_pair() {
        let policy = LinkDistancePolicy { base: 64.0 };
        let pairs = NodeKind::ALL
            .iter()
            .flat_map(|&source| NodeKind::ALL.iter().map(move |&target| (source, target)))
            .collect::<Vec<_>>();

        let forward = pairs
            .iter()
            .map(|&(source, target)| policy.distance(source, target))
            .collect::<Vec<_>>();
        let backward = pairs
            .iter()
            .rev()
            .map(|&(source, target)| policy.distance(source, target))
            .collect::<Vec<_>>();

        assert_eq!(forward, backward.into_iter().rev().collect::<Vec<_>>());
    }
}
