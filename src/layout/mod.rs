pub mod clusters;
pub mod collision;
pub mod edges;
mod error;
pub mod hierarchy;
pub mod packing;
pub mod routing;
pub(crate) mod types;
pub use error::LayoutError;
pub use types::*;

use std::collections::BTreeMap;

use crate::config::LayoutConfig;
use crate::ir::Graph;
use crate::text_metrics::{FontTextMeasurer, TextMeasurer};

use clusters::layout_clusters;
use edges::prepare_edges;
use hierarchy::ClusterHierarchy;
use routing::{RoutingScene, route_edges};

/// Lays out `graph` measuring labels with system fonts.
pub fn compute_layout(graph: &Graph, config: &LayoutConfig) -> Result<Layout, LayoutError> {
    compute_layout_with(graph, config, &FontTextMeasurer)
}

/// Full pipeline: hierarchy, edge preparation, recursive cluster packing,
/// collision resolution and routing.
pub fn compute_layout_with(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &dyn TextMeasurer,
) -> Result<Layout, LayoutError> {
    let (hierarchy, mut warnings) = ClusterHierarchy::build(graph, config.multi_parent)?;
    let (valid_edges, prepared, edge_warnings) = prepare_edges(graph, &hierarchy);
    warnings.extend(edge_warnings);

    let placement = layout_clusters(graph, &hierarchy, &valid_edges, config);
    warnings.extend(placement.warnings.iter().cloned());

    let scene = RoutingScene {
        nodes: &placement.nodes,
        clusters: &placement.clusters,
        hierarchy: &hierarchy,
        direction: config.direction,
    };
    let edges = route_edges(&prepared, &scene, &config.routing, measurer);

    let mut nodes = BTreeMap::new();
    for node in &graph.nodes {
        let rect = match placement.nodes.get(&node.id) {
            Some(rect) => *rect,
            None => {
                if !warnings
                    .iter()
                    .any(|w| matches!(w, LayoutWarning::MissingPosition { id } if id == &node.id))
                {
                    warnings.push(LayoutWarning::MissingPosition { id: node.id.clone() });
                }
                Rect::new(0.0, 0.0, config.node_width, config.node_height)
            }
        };
        nodes.insert(
            node.id.clone(),
            NodeLayout {
                id: node.id.clone(),
                label: node.label.clone(),
                icon_url: node.icon_url.clone(),
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                cluster: hierarchy.immediate_cluster(&node.id).map(str::to_string),
            },
        );
    }

    let clusters = hierarchy
        .topological_order()
        .iter()
        .filter_map(|id| {
            let rect = placement.clusters.get(id)?;
            let label = graph
                .cluster(id)
                .map(|c| c.label.clone())
                .unwrap_or_else(|| id.clone());
            Some(ClusterLayout {
                id: id.clone(),
                label,
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                depth: hierarchy.depth(id),
                parent: hierarchy.parent(id).map(str::to_string),
                padding: placement.paddings.get(id).copied().unwrap_or(0.0),
                empty: placement.empty.contains(id),
            })
        })
        .collect();

    let mut layout = Layout {
        direction: config.direction,
        nodes,
        clusters,
        edges,
        relative_positions: placement.relative,
        width: 0.0,
        height: 0.0,
        warnings,
    };
    fit_to_origin(&mut layout);

    for warning in &layout.warnings {
        tracing::warn!(?warning, "layout degraded");
    }
    tracing::debug!(
        nodes = layout.nodes.len(),
        clusters = layout.clusters.len(),
        edges = layout.edges.len(),
        width = layout.width,
        height = layout.height,
        "layout complete"
    );
    Ok(layout)
}

/// Moves the drawing so its top-left extent (including edge detours) sits at
/// the origin, and records the overall size.
fn fit_to_origin(layout: &mut Layout) {
    let mut min = (f32::MAX, f32::MAX);
    let mut max = (f32::MIN, f32::MIN);
    let mut include = |x: f32, y: f32| {
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x), max.1.max(y));
    };
    for rect in layout
        .nodes
        .values()
        .map(NodeLayout::rect)
        .chain(layout.clusters.iter().map(ClusterLayout::rect))
    {
        include(rect.x, rect.y);
        include(rect.right(), rect.bottom());
    }
    for edge in &layout.edges {
        for &(x, y) in &edge.points {
            include(x, y);
        }
    }
    if min.0 > max.0 {
        return;
    }

    let (dx, dy) = (-min.0, -min.1);
    for node in layout.nodes.values_mut() {
        node.x += dx;
        node.y += dy;
    }
    for cluster in &mut layout.clusters {
        cluster.x += dx;
        cluster.y += dy;
    }
    for edge in &mut layout.edges {
        for point in &mut edge.points {
            point.0 += dx;
            point.1 += dy;
        }
        if let Some(anchor) = edge.label_anchor.as_mut() {
            anchor.0 += dx;
            anchor.1 += dy;
        }
        if let Some(gap) = edge.label_gap.as_mut() {
            gap.rect = gap.rect.translate(dx, dy);
        }
    }
    layout.width = max.0 - min.0;
    layout.height = max.1 - min.1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MultiParentPolicy;
    use crate::text_metrics::FixedWidthMeasurer;

    fn layout(graph: &Graph) -> Layout {
        compute_layout_with(graph, &LayoutConfig::default(), &FixedWidthMeasurer::default())
            .unwrap()
    }

    #[test]
    fn empty_graph_lays_out_to_nothing() {
        let result = layout(&Graph::new());
        assert!(result.nodes.is_empty());
        assert_eq!((result.width, result.height), (0.0, 0.0));
    }

    #[test]
    fn single_edge_is_routed_between_nodes() {
        let mut graph = Graph::new();
        graph.ensure_node("client", Some("Client"));
        graph.ensure_node("api", Some("API"));
        graph.add_edge("client", "api", Some("HTTPS"));
        let result = layout(&graph);
        assert_eq!(result.edges.len(), 1);
        let edge = &result.edges[0];
        assert!(edge.points.len() >= 2);
        assert!(edge.label_anchor.is_some());
        assert!(result.width > 0.0 && result.height > 0.0);
        for node in result.nodes.values() {
            assert!(node.x >= -1e-3 && node.y >= -1e-3);
        }
    }

    #[test]
    fn cyclic_clusters_fail() {
        let mut graph = Graph::new();
        graph.add_cluster("a", "A", &[], Some("b"));
        graph.add_cluster("b", "B", &[], Some("a"));
        let err = compute_layout_with(
            &graph,
            &LayoutConfig::default(),
            &FixedWidthMeasurer::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::CyclicHierarchy { .. }));
    }

    #[test]
    fn first_parent_policy_keeps_going() {
        let mut graph = Graph::new();
        graph.ensure_node("n", None);
        graph.add_cluster("x", "X", &["z"], None);
        graph.add_cluster("y", "Y", &["z"], None);
        graph.add_cluster("z", "Z", &["n"], None);
        let config = LayoutConfig {
            multi_parent: MultiParentPolicy::First,
            ..LayoutConfig::default()
        };
        let result =
            compute_layout_with(&graph, &config, &FixedWidthMeasurer::default()).unwrap();
        assert_eq!(result.cluster("z").and_then(|c| c.parent.as_deref()), Some("x"));
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn dropped_edges_surface_as_warnings() {
        let mut graph = Graph::new();
        graph.ensure_node("a", None);
        graph.add_edge("a", "missing", None);
        let result = layout(&graph);
        assert!(result.edges.is_empty());
        assert!(matches!(
            result.warnings.as_slice(),
            [LayoutWarning::DroppedEdge { .. }]
        ));
    }
}
