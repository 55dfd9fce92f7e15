mod collect;
pub(crate) mod graph;
mod parse;
mod summary;
mod time;

pub use collect::{DataSource, write_sample_csv};
#[cfg(test)]
pub(crate) use collect::sample_graph;
pub use graph::{Edge, GraphData, Node, NodeKind};
pub use summary::GraphSummary;
pub use time::format_timestamp;
