use std::collections::{BTreeMap, BTreeSet, HashSet};

use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};

use crate::ir::Direction;

use super::types::Rect;

#[derive(Debug, Clone, PartialEq)]
pub struct PackItem {
    pub id: String,
    pub width: f32,
    pub height: f32,
}

impl PackItem {
    pub fn new(id: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PackEdge {
    pub source: String,
    pub target: String,
}

impl PackEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackParams {
    pub direction: Direction,
    pub node_separation: f32,
    pub rank_separation: f32,
    pub edge_separation: f32,
    pub margin_x: f32,
    pub margin_y: f32,
}

#[derive(Debug, Clone, Default)]
pub struct PackResult {
    /// Top-left boxes keyed by item id.
    pub boxes: BTreeMap<String, Rect>,
    /// Items the layout library did not place; they sit at the origin.
    pub missing: Vec<String>,
}

impl PackResult {
    /// Smallest rectangle covering every packed box.
    pub fn span(&self) -> Option<Rect> {
        self.boxes.values().copied().reduce(|acc, rect| acc.union(&rect))
    }
}

/// Packs fixed-size boxes into a layered arrangement.
///
/// Edges whose endpoints are not both items are ignored, as are self-loops and
/// repeated pairs; none of them affects the placement.
pub fn pack(items: &[PackItem], edges: &[PackEdge], params: &PackParams) -> PackResult {
    let mut result = PackResult::default();
    if items.is_empty() {
        return result;
    }

    let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
        DagreGraph::new(Some(GraphOption {
            directed: Some(true),
            multigraph: Some(false),
            compound: Some(false),
        }));

    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some(dagre_rankdir(params.direction).to_string());
    graph_config.nodesep = Some(params.node_separation);
    graph_config.ranksep = Some(params.rank_separation);
    graph_config.edgesep = Some(params.edge_separation);
    graph_config.marginx = Some(params.margin_x);
    graph_config.marginy = Some(params.margin_y);
    dagre_graph.set_graph(graph_config);

    let mut item_ids: BTreeSet<&str> = BTreeSet::new();
    for item in items {
        if !item_ids.insert(item.id.as_str()) {
            continue;
        }
        let mut node = DagreNode::default();
        node.width = item.width.max(1.0);
        node.height = item.height.max(1.0);
        dagre_graph.set_node(item.id.clone(), Some(node));
    }

    let mut edge_set: HashSet<(&str, &str)> = HashSet::new();
    for edge in edges {
        if edge.source == edge.target
            || !item_ids.contains(edge.source.as_str())
            || !item_ids.contains(edge.target.as_str())
        {
            continue;
        }
        if !edge_set.insert((edge.source.as_str(), edge.target.as_str())) {
            continue;
        }
        let from = edge.source.clone();
        let to = edge.target.clone();
        let _ = dagre_graph.set_edge(&from, &to, Some(DagreEdge::default()), None);
    }

    dagre_layout::run_layout(&mut dagre_graph);

    for item in items {
        if result.boxes.contains_key(&item.id) {
            continue;
        }
        let placed = dagre_graph
            .node(&item.id)
            .filter(|node| node.x.is_finite() && node.y.is_finite());
        let rect = match placed {
            Some(node) => Rect::new(
                node.x - item.width / 2.0,
                node.y - item.height / 2.0,
                item.width,
                item.height,
            ),
            None => {
                result.missing.push(item.id.clone());
                Rect::new(0.0, 0.0, item.width, item.height)
            }
        };
        result.boxes.insert(item.id.clone(), rect);
    }

    result
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::TopBottom => "tb",
        Direction::BottomTop => "bt",
        Direction::LeftRight => "lr",
        Direction::RightLeft => "rl",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(direction: Direction) -> PackParams {
        PackParams {
            direction,
            node_separation: 50.0,
            rank_separation: 80.0,
            edge_separation: 20.0,
            margin_x: 20.0,
            margin_y: 20.0,
        }
    }

    #[test]
    fn empty_input_packs_nothing() {
        let result = pack(&[], &[], &params(Direction::LeftRight));
        assert!(result.boxes.is_empty());
        assert!(result.span().is_none());
    }

    #[test]
    fn left_right_places_targets_after_sources() {
        let items = [PackItem::new("a", 100.0, 60.0), PackItem::new("b", 100.0, 60.0)];
        let edges = [PackEdge::new("a", "b")];
        let result = pack(&items, &edges, &params(Direction::LeftRight));
        let a = result.boxes["a"];
        let b = result.boxes["b"];
        assert!(b.x >= a.right());
        assert_eq!(a.width, 100.0);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn top_bottom_places_targets_below_sources() {
        let items = [PackItem::new("a", 100.0, 60.0), PackItem::new("b", 100.0, 60.0)];
        let edges = [PackEdge::new("a", "b")];
        let result = pack(&items, &edges, &params(Direction::TopBottom));
        assert!(result.boxes["b"].y >= result.boxes["a"].bottom());
    }

    #[test]
    fn foreign_and_self_edges_are_ignored() {
        let items = [PackItem::new("a", 40.0, 40.0), PackItem::new("b", 40.0, 40.0)];
        let edges = [
            PackEdge::new("a", "a"),
            PackEdge::new("a", "elsewhere"),
            PackEdge::new("a", "b"),
            PackEdge::new("a", "b"),
        ];
        let result = pack(&items, &edges, &params(Direction::LeftRight));
        assert_eq!(result.boxes.len(), 2);
    }

    #[test]
    fn unconnected_items_do_not_overlap() {
        let items: Vec<PackItem> = (0..5)
            .map(|i| PackItem::new(format!("n{i}"), 120.0, 80.0))
            .collect();
        let result = pack(&items, &[], &params(Direction::LeftRight));
        let boxes: Vec<Rect> = result.boxes.values().copied().collect();
        for (i, a) in boxes.iter().enumerate() {
            for b in &boxes[i + 1..] {
                assert!(a.overlap_x(b) <= 0.0 || a.overlap_y(b) <= 0.0);
            }
        }
    }
}
