use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::graph::GraphData;
use super::parse::{SAMPLE_CSV, parse_event_rows};

/// Where a graph comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    Sample,
    File(PathBuf),
}

impl DataSource {
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Sample, Self::File)
    }

    pub fn load(&self) -> Result<GraphData> {
        match self {
            Self::Sample => sample_graph(),
            Self::File(path) => load_graph(path),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample => f.write_str("built-in sample"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub fn load_graph(path: &Path) -> Result<GraphData> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read graph input {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

    let mut graph = if is_json {
        serde_json::from_str::<GraphData>(&text)
            .with_context(|| format!("invalid graph JSON in {}", path.display()))?
    } else {
        parse_event_rows(&text)
            .with_context(|| format!("failed to build graph from rows in {}", path.display()))?
    };

    graph.clamp_edge_values();
    graph
        .validate()
        .with_context(|| format!("graph from {} failed validation", path.display()))?;

    log::info!(
        "loaded {} nodes and {} edges from {}",
        graph.nodes.len(),
        graph.edges.len(),
        path.display()
    );
    Ok(graph)
}

pub fn sample_graph() -> Result<GraphData> {
    let graph = parse_event_rows(SAMPLE_CSV).context("built-in sample rows are malformed")?;
    graph.validate()?;
    Ok(graph)
}

pub fn write_sample_csv(path: &Path) -> Result<()> {
    fs::write(path, SAMPLE_CSV)
        .with_context(|| format!("failed to write sample CSV to {}", path.display()))
}
