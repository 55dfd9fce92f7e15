use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::time::event_timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[serde(alias = "person")]
    Member,
    #[serde(alias = "act")]
    Event,
    #[serde(alias = "area")]
    Space,
}

impl NodeKind {
    pub const ALL: [NodeKind; 3] = [NodeKind::Member, NodeKind::Event, NodeKind::Space];

    pub fn label(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Event => "event",
            Self::Space => "space",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Relationship {
    Initiates,
    Participates,
    Hosts,
    Other(String),
}

impl Relationship {
    pub fn label(&self) -> &str {
        match self {
            Self::Initiates => "initiates",
            Self::Participates => "participates",
            Self::Hosts => "hosts",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for Relationship {
    fn from(value: String) -> Self {
        match value.trim() {
            "initiates" => Self::Initiates,
            "participates" => Self::Participates,
            "hosts" => Self::Hosts,
            _ => Self::Other(value),
        }
    }
}

impl From<Relationship> for String {
    fn from(value: Relationship) -> Self {
        match value {
            Relationship::Other(label) => label,
            known => known.label().to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub time: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            time: None,
        }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        let time = time.into();
        self.time = (!time.trim().is_empty()).then_some(time);
        self
    }

    /// Display label: events fall back to the topic before `@`, everything else to the
    /// name after the `type:` prefix.
    pub fn label(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }

        let id = self.id.as_str();
        let stripped = id.split_once(':').map(|(_, rest)| rest);
        match self.kind {
            NodeKind::Event => {
                let topic = stripped.unwrap_or(id);
                topic.split('@').next().filter(|topic| !topic.is_empty()).unwrap_or(id)
            }
            _ => stripped.filter(|name| !name.is_empty()).unwrap_or(id),
        }
    }

    /// Parsed timestamp, only meaningful for event nodes.
    pub fn timestamp(&self) -> Option<i64> {
        if self.kind != NodeKind::Event {
            return None;
        }
        self.time.as_deref().and_then(event_timestamp)
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.trim().is_empty()))
}

fn default_edge_value() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(alias = "type")]
    pub relationship: Relationship,
    #[serde(default = "default_edge_value")]
    pub value: f32,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship: Relationship,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship,
            value: 1.0,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("duplicate node id {0:?}")]
    DuplicateNode(String),
    #[error("edge #{index} references missing {endpoint} node {id:?}")]
    DanglingEdge {
        index: usize,
        endpoint: &'static str,
        id: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphData {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn index_by_id(&self) -> HashMap<&str, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.as_str(), index))
            .collect()
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|node| node.kind == kind).count()
    }

    pub fn clamp_edge_values(&mut self) {
        for edge in &mut self.edges {
            if !edge.value.is_finite() || edge.value < 1.0 {
                edge.value = 1.0;
            }
        }
    }

    /// Boundary check for the layout core, which assumes referential integrity.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }

        for (index, edge) in self.edges.iter().enumerate() {
            if !ids.contains(edge.source.as_str()) {
                return Err(GraphError::DanglingEdge {
                    index,
                    endpoint: "source",
                    id: edge.source.clone(),
                });
            }
            if !ids.contains(edge.target.as_str()) {
                return Err(GraphError::DanglingEdge {
                    index,
                    endpoint: "target",
                    id: edge.target.clone(),
                });
            }
        }

        Ok(())
    }
}
