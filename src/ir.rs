use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "TB", alias = "TD")]
    TopBottom,
    #[serde(rename = "RL")]
    RightLeft,
    #[serde(rename = "BT")]
    BottomTop,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "LR" => Some(Self::LeftRight),
            "TB" | "TD" => Some(Self::TopBottom),
            "RL" => Some(Self::RightLeft),
            "BT" => Some(Self::BottomTop),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::LeftRight => "LR",
            Self::TopBottom => "TB",
            Self::RightLeft => "RL",
            Self::BottomTop => "BT",
        }
    }

    /// True when ranks advance along the x axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }

    /// True when ranks advance toward negative coordinates.
    pub fn is_reversed(self) -> bool {
        matches!(self, Self::RightLeft | Self::BottomTop)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    /// Direct members in declaration order. May name leaf nodes or other clusters.
    pub node_ids: Vec<String>,
    pub parent_ids: Vec<String>,
}

/// Normalised diagram graph shared by every layout stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub clusters: Vec<Cluster>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn cluster(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }

    pub fn node_index(&self) -> BTreeMap<&str, &GraphNode> {
        self.nodes
            .iter()
            .map(|node| (node.id.as_str(), node))
            .collect()
    }

    /// Adds a node if it is not present yet and returns its index.
    pub fn ensure_node(&mut self, id: &str, label: Option<&str>) -> usize {
        if let Some(idx) = self.nodes.iter().position(|node| node.id == id) {
            if let Some(label) = label {
                self.nodes[idx].label = label.to_string();
            }
            return idx;
        }
        self.nodes.push(GraphNode {
            id: id.to_string(),
            label: label.unwrap_or(id).to_string(),
            icon_url: None,
        });
        self.nodes.len() - 1
    }

    pub fn add_edge(&mut self, source: &str, target: &str, label: Option<&str>) {
        let id = format!("{source}->{target}#{}", self.edges.len());
        self.edges.push(GraphEdge {
            id,
            source: source.to_string(),
            target: target.to_string(),
            label: label.map(str::to_string),
        });
    }

    pub fn add_cluster(&mut self, id: &str, label: &str, node_ids: &[&str], parent: Option<&str>) {
        self.clusters.push(Cluster {
            id: id.to_string(),
            label: label.to_string(),
            node_ids: node_ids.iter().map(|id| id.to_string()).collect(),
            parent_ids: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
        });
    }
}
