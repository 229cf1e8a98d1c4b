use std::collections::HashSet;

use serde::Deserialize;

use crate::ir::{Cluster, Graph, GraphEdge, GraphNode};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid graph JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },

    #[error("id `{id}` is used by both a node and a cluster")]
    AmbiguousId { id: String },

    #[error("{kind} at index {index} has an empty id")]
    EmptyId { kind: &'static str, index: usize },
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
    #[serde(default)]
    clusters: Vec<RawCluster>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: String,
    #[serde(default)]
    data: Option<RawNodeData>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default, alias = "iconUrl")]
    icon_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNodeData {
    #[serde(default)]
    label: Option<String>,
    #[serde(default, rename = "iconUrl", alias = "icon_url")]
    icon_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    #[serde(default)]
    id: Option<String>,
    source: String,
    target: String,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCluster {
    #[serde(alias = "id")]
    cluster_id: String,
    #[serde(default, alias = "label")]
    cluster_label: Option<String>,
    #[serde(default, alias = "nodes")]
    cluster_nodes: Vec<String>,
    #[serde(default, alias = "parent")]
    cluster_parent: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) if value.trim().is_empty() => Vec::new(),
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values.into_iter().filter(|v| !v.trim().is_empty()).collect(),
        }
    }
}

/// Parses a diagram graph in either the `cluster_*` or the short `id/label/nodes/parent`
/// cluster schema and normalises it into a [`Graph`].
pub fn parse_graph_json(input: &str) -> Result<Graph, ParseError> {
    let raw: RawGraph = serde_json::from_str(input)?;
    normalize(raw)
}

pub fn parse_graph_value(value: serde_json::Value) -> Result<Graph, ParseError> {
    let raw: RawGraph = serde_json::from_value(value)?;
    normalize(raw)
}

fn normalize(raw: RawGraph) -> Result<Graph, ParseError> {
    let mut graph = Graph::new();
    let mut node_ids: HashSet<String> = HashSet::new();

    for (index, node) in raw.nodes.into_iter().enumerate() {
        let id = node.id.trim().to_string();
        if id.is_empty() {
            return Err(ParseError::EmptyId { kind: "node", index });
        }
        if !node_ids.insert(id.clone()) {
            return Err(ParseError::DuplicateId { kind: "node", id });
        }
        let data = node.data.unwrap_or_default();
        let label = data
            .label
            .or(node.label)
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| id.clone());
        graph.nodes.push(GraphNode {
            id,
            label,
            icon_url: data.icon_url.or(node.icon_url),
        });
    }

    let mut cluster_ids: HashSet<String> = HashSet::new();
    for (index, cluster) in raw.clusters.into_iter().enumerate() {
        let id = cluster.cluster_id.trim().to_string();
        if id.is_empty() {
            return Err(ParseError::EmptyId { kind: "cluster", index });
        }
        if node_ids.contains(&id) {
            return Err(ParseError::AmbiguousId { id });
        }
        if !cluster_ids.insert(id.clone()) {
            return Err(ParseError::DuplicateId { kind: "cluster", id });
        }
        let label = cluster
            .cluster_label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| id.clone());
        graph.clusters.push(Cluster {
            id,
            label,
            node_ids: cluster.cluster_nodes,
            parent_ids: cluster.cluster_parent.map(OneOrMany::into_vec).unwrap_or_default(),
        });
    }

    let mut edge_ids: HashSet<String> = HashSet::new();
    for (index, edge) in raw.edges.into_iter().enumerate() {
        let id = match edge.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => format!("{}->{}#{}", edge.source, edge.target, index),
        };
        if !edge_ids.insert(id.clone()) {
            return Err(ParseError::DuplicateId { kind: "edge", id });
        }
        graph.edges.push(GraphEdge {
            id,
            source: edge.source,
            target: edge.target,
            label: edge.label.filter(|label| !label.trim().is_empty()),
        });
    }

    Ok(graph)
}
