use std::collections::HashMap;

use anyhow::{Result, anyhow};

use super::graph::{Edge, GraphData, Node, NodeKind, Relationship};

const INITIATOR_HEADERS: [&str; 2] = ["initiator", "发起人姓名"];
const PARTICIPANT_HEADERS: [&str; 2] = ["participant", "参与人姓名"];
const TOPIC_HEADERS: [&str; 2] = ["topic", "活动主题"];
const VENUE_HEADERS: [&str; 2] = ["venue", "活动场地"];
const TIME_HEADERS: [&str; 2] = ["time", "活动时间"];

const NAME_SEPARATORS: [char; 4] = [';', '|', '、', '；'];

pub const SAMPLE_CSV: &str = "\
initiator,participant,topic,venue,time
Alice,Oscar,Intro to Blockchain,Library Room 3,2025-09-24 09:45
Charlie,Quinn,Tauri for Desktop Apps,Cafe 706,2025-09-17 19:30
Fiona,Laura,Creative Coding Jam,Community Hall,2025-10-14 19:30
George,Rita,Web3 and Society,Cafe 706,2025-10-02 09:45
Hannah,Nina,Co-Learning Kickoff,Online Zoom Room,2025-09-24 15:15
Bob,Judy,Holacracy in Startups,Community Hall,2025-10-11 19:00
Ethan,Kevin,Holacracy in Startups,Community Hall,2025-09-26 17:00
Alice,Nina,Global Hackathon Trends,Library Room 3,2025-09-18 16:45
Diana,Paula,Creative Coding Jam,Library Room 3,2025-09-28 11:45
Hannah,Oscar,Tauri for Desktop Apps,Cafe 706,2025-10-11 13:15
";

struct Columns {
    initiator: usize,
    participant: usize,
    topic: usize,
    venue: usize,
    time: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &[String]) -> Result<Self> {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|header| aliases.iter().any(|alias| header.eq_ignore_ascii_case(alias)))
        };
        let require = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| anyhow!("missing required column {:?}", aliases[0]))
        };

        Ok(Self {
            initiator: require(&INITIATOR_HEADERS)?,
            participant: require(&PARTICIPANT_HEADERS)?,
            topic: require(&TOPIC_HEADERS)?,
            venue: require(&VENUE_HEADERS)?,
            time: find(&TIME_HEADERS),
        })
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.split(',')
        .map(|field| {
            let field = field.trim();
            field
                .strip_prefix('"')
                .and_then(|inner| inner.strip_suffix('"'))
                .unwrap_or(field)
                .trim()
                .to_owned()
        })
        .collect()
}

fn split_names(field: &str) -> Vec<&str> {
    field
        .split(NAME_SEPARATORS)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    edges: Vec<Edge>,
    edge_index: HashMap<(String, String, Relationship), usize>,
}

impl GraphBuilder {
    fn node(&mut self, id: String, kind: NodeKind, name: &str, time: Option<&str>) -> String {
        if !self.node_index.contains_key(&id) {
            let mut node = Node::new(id.clone(), kind, name);
            if let Some(time) = time {
                node = node.with_time(time);
            }
            self.node_index.insert(id.clone(), self.nodes.len());
            self.nodes.push(node);
        }
        id
    }

    fn member(&mut self, name: &str) -> String {
        self.node(format!("member:{name}"), NodeKind::Member, name, None)
    }

    fn space(&mut self, name: &str) -> String {
        self.node(format!("space:{name}"), NodeKind::Space, name, None)
    }

    fn event(&mut self, topic: &str, time: &str) -> String {
        self.node(
            format!("event:{topic}@{time}"),
            NodeKind::Event,
            topic,
            Some(time),
        )
    }

    fn edge(&mut self, source: &str, target: &str, relationship: Relationship) {
        let key = (source.to_owned(), target.to_owned(), relationship.clone());
        if let Some(&index) = self.edge_index.get(&key) {
            self.edges[index].value += 1.0;
            return;
        }

        self.edge_index.insert(key, self.edges.len());
        self.edges.push(Edge::new(source, target, relationship));
    }

    fn finish(self) -> GraphData {
        GraphData {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

/// Builds the member/event/space graph from delimited event rows.
pub fn parse_event_rows(text: &str) -> Result<GraphData> {
    let mut lines = text
        .lines()
        .map(|line| line.trim_start_matches('\u{feff}'))
        .filter(|line| !line.trim().is_empty());

    let header_line = lines.next().ok_or_else(|| anyhow!("input has no header row"))?;
    let columns = Columns::from_headers(&split_fields(header_line))?;

    let mut builder = GraphBuilder::default();
    let mut skipped = 0usize;

    for (row_number, line) in lines.enumerate() {
        let values = split_fields(line);
        let field = |index: usize| values.get(index).map(String::as_str).unwrap_or("");

        let initiators = split_names(field(columns.initiator));
        let participants = split_names(field(columns.participant));
        let topic = field(columns.topic);
        let venue = field(columns.venue);
        let time = columns.time.map(field).unwrap_or("");

        if initiators.is_empty() || participants.is_empty() || topic.is_empty() || venue.is_empty()
        {
            log::debug!("skipping incomplete row {}: {line:?}", row_number + 2);
            skipped += 1;
            continue;
        }

        let event_id = builder.event(topic, time);
        let space_id = builder.space(venue);

        for initiator in initiators {
            let member_id = builder.member(initiator);
            builder.edge(&member_id, &event_id, Relationship::Initiates);
        }
        for participant in participants {
            let member_id = builder.member(participant);
            builder.edge(&event_id, &member_id, Relationship::Participates);
        }
        builder.edge(&space_id, &event_id, Relationship::Hosts);
    }

    if skipped > 0 {
        log::info!("skipped {skipped} incomplete rows");
    }

    Ok(builder.finish())
}
