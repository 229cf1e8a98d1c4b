use std::collections::{BTreeMap, BTreeSet};

use crate::config::{LayoutConfig, SpacingInput, SpacingPair};
use crate::ir::{Graph, GraphEdge};

use super::collision::resolve_collisions;
use super::hierarchy::ClusterHierarchy;
use super::packing::{PackEdge, PackItem, PackParams, pack};
use super::types::{LayoutWarning, Rect};

const SINGLETON_PREFIX: &str = "__single__";

/// Absolute geometry produced by the recursive cluster pass.
#[derive(Debug, Clone, Default)]
pub struct ClusterPlacement {
    pub nodes: BTreeMap<String, Rect>,
    pub clusters: BTreeMap<String, Rect>,
    /// `parent -> child -> offset` from the parent's top-left corner.
    pub relative: BTreeMap<String, BTreeMap<String, (f32, f32)>>,
    pub paddings: BTreeMap<String, f32>,
    pub empty: BTreeSet<String>,
    pub warnings: Vec<LayoutWarning>,
}

/// Lays out every cluster bottom-up, packs the top-level blocks, separates them
/// and resolves absolute coordinates top-down.
pub fn layout_clusters(
    graph: &Graph,
    hierarchy: &ClusterHierarchy,
    edges: &[GraphEdge],
    config: &LayoutConfig,
) -> ClusterPlacement {
    let mut placement = ClusterPlacement::default();
    let mut sizes: BTreeMap<String, (f32, f32)> = BTreeMap::new();

    for (depth, clusters) in hierarchy.clusters_by_depth().into_iter().rev() {
        for cluster in clusters {
            layout_one_cluster(
                graph,
                hierarchy,
                edges,
                config,
                cluster,
                depth,
                &mut sizes,
                &mut placement,
            );
        }
    }

    let blocks = layout_top_level(graph, hierarchy, edges, config, &sizes, &mut placement);

    for (block_id, block) in &blocks {
        if let Some(node_id) = block_id.strip_prefix(SINGLETON_PREFIX) {
            let (x, y) = centred_in(block, config.node_width, config.node_height);
            placement.nodes.insert(
                node_id.to_string(),
                Rect::new(x, y, config.node_width, config.node_height),
            );
        } else if let Some(&(w, h)) = sizes.get(block_id) {
            let (x, y) = centred_in(block, w, h);
            place_subtree(block_id, (x, y), hierarchy, config, &sizes, &mut placement);
        }
    }

    normalise_origin(&mut placement);
    placement
}

#[allow(clippy::too_many_arguments)]
fn layout_one_cluster(
    graph: &Graph,
    hierarchy: &ClusterHierarchy,
    edges: &[GraphEdge],
    config: &LayoutConfig,
    cluster: &str,
    depth: usize,
    sizes: &mut BTreeMap<String, (f32, f32)>,
    placement: &mut ClusterPlacement,
) {
    let padding = cluster_padding(graph, hierarchy, edges, config, cluster, depth);
    placement.paddings.insert(cluster.to_string(), padding);

    let gap = config.child_cluster_gap;
    let mut items: Vec<PackItem> = hierarchy
        .direct_leaves(cluster)
        .iter()
        .map(|leaf| PackItem::new(leaf.clone(), config.node_width, config.node_height))
        .collect();
    for child in hierarchy.children(cluster) {
        let (w, h) = sizes.get(child).copied().unwrap_or((padding * 2.0, padding * 2.0));
        items.push(PackItem::new(child.clone(), w + gap, h + gap));
    }

    if items.is_empty() {
        placement.empty.insert(cluster.to_string());
        sizes.insert(cluster.to_string(), (padding * 2.0, padding * 2.0));
        placement.relative.insert(cluster.to_string(), BTreeMap::new());
        return;
    }

    let relations = relation_edges(hierarchy, edges, Some(cluster));
    let spacing = SpacingInput {
        depth,
        items: items.len(),
        edges: relations.len(),
        average_size: 0.0,
    };
    let params = pack_params(config, &config.cluster_spacing, spacing, true);
    let packed = pack(&items, &relations, &params);
    record_missing(&packed.missing, &mut placement.warnings);

    let Some(span) = packed.span() else {
        return;
    };

    let mut relative = BTreeMap::new();
    for item in &items {
        let Some(rect) = packed.boxes.get(&item.id) else {
            continue;
        };
        let mut x = rect.x - span.x + padding / 2.0;
        let mut y = rect.y - span.y + padding / 2.0;
        if hierarchy.is_cluster(&item.id) {
            x += gap / 2.0;
            y += gap / 2.0;
        }
        relative.insert(item.id.clone(), (x, y));
    }

    sizes.insert(
        cluster.to_string(),
        (span.width + padding, span.height + padding),
    );
    placement.relative.insert(cluster.to_string(), relative);
}

fn layout_top_level(
    graph: &Graph,
    hierarchy: &ClusterHierarchy,
    edges: &[GraphEdge],
    config: &LayoutConfig,
    sizes: &BTreeMap<String, (f32, f32)>,
    placement: &mut ClusterPlacement,
) -> BTreeMap<String, Rect> {
    let mut items = Vec::new();
    let mut total_size = 0.0f32;
    let mut root_count = 0usize;
    for root in hierarchy.roots() {
        let (w, h) = sizes.get(root).copied().unwrap_or((0.0, 0.0));
        total_size += w + h;
        root_count += 1;
        let margin = config.top_level_separation;
        items.push(PackItem::new(root, w + margin, h + margin));
    }
    for node in &graph.nodes {
        if hierarchy.immediate_cluster(&node.id).is_none() {
            let margin = config.singleton_margin;
            items.push(PackItem::new(
                block_id(hierarchy, &node.id),
                config.node_width + margin,
                config.node_height + margin,
            ));
        }
    }
    if items.is_empty() {
        return BTreeMap::new();
    }

    let relations: Vec<PackEdge> = relation_edges(hierarchy, edges, None)
        .into_iter()
        .map(|edge| {
            PackEdge::new(
                block_id(hierarchy, &edge.source),
                block_id(hierarchy, &edge.target),
            )
        })
        .collect();

    let average_size = if root_count > 0 {
        total_size / root_count as f32
    } else {
        0.0
    };
    let spacing = SpacingInput {
        depth: 0,
        items: items.len(),
        edges: relations.len(),
        average_size,
    };
    let params = pack_params(config, &config.block_spacing, spacing, false);
    let packed = pack(&items, &relations, &params);
    record_missing(&packed.missing, &mut placement.warnings);

    let mut blocks = packed.boxes;
    let report = resolve_collisions(&mut blocks, &config.collision);
    for (first, second) in report.residual {
        placement
            .warnings
            .push(LayoutWarning::ResidualOverlap { first, second });
    }
    blocks
}

/// Pack items are addressed by their own id, except unclustered nodes, which
/// get a pseudo block id at the top level.
fn block_id(hierarchy: &ClusterHierarchy, id: &str) -> String {
    if hierarchy.is_cluster(id) {
        id.to_string()
    } else {
        format!("{SINGLETON_PREFIX}{id}")
    }
}

/// Edges between distinct direct items of `container`, with endpoints
/// resolved through containment.
fn relation_edges(
    hierarchy: &ClusterHierarchy,
    edges: &[GraphEdge],
    container: Option<&str>,
) -> Vec<PackEdge> {
    let mut relations = Vec::new();
    let mut seen = BTreeSet::new();
    for edge in edges {
        let (Some(source), Some(target)) = (
            hierarchy.item_under(&edge.source, container),
            hierarchy.item_under(&edge.target, container),
        ) else {
            continue;
        };
        if source == target || !seen.insert((source, target)) {
            continue;
        }
        relations.push(PackEdge::new(source, target));
    }
    relations
}

fn pack_params(
    config: &LayoutConfig,
    spacing: &SpacingPair,
    input: SpacingInput,
    allow_override: bool,
) -> PackParams {
    let node_separation = config
        .node_separation
        .filter(|_| allow_override)
        .unwrap_or_else(|| spacing.node.resolve(input));
    let rank_separation = config
        .rank_separation
        .filter(|_| allow_override)
        .unwrap_or_else(|| spacing.rank.resolve(input));
    PackParams {
        direction: config.direction,
        node_separation,
        rank_separation,
        edge_separation: config.edge_separation,
        margin_x: config.margin_x,
        margin_y: config.margin_y,
    }
}

/// Padding grows with the number of leaves, the edges crossing the boundary
/// and the label length, and shrinks with depth.
fn cluster_padding(
    graph: &Graph,
    hierarchy: &ClusterHierarchy,
    edges: &[GraphEdge],
    config: &LayoutConfig,
    cluster: &str,
    depth: usize,
) -> f32 {
    if let Some(&fixed) = config.cluster_padding.get(cluster) {
        return fixed.max(0.0);
    }
    let leaves = hierarchy.descendant_leaves(cluster).map_or(0, |set| set.len());
    let boundary = edges
        .iter()
        .filter(|edge| {
            let inside_source = hierarchy.item_under(&edge.source, Some(cluster)).is_some();
            let inside_target = hierarchy.item_under(&edge.target, Some(cluster)).is_some();
            inside_source != inside_target
        })
        .count();
    let label_len = graph
        .cluster(cluster)
        .map_or(0, |c| c.label.chars().count());
    adaptive_padding(depth, leaves, boundary, label_len, config)
}

fn adaptive_padding(
    depth: usize,
    leaves: usize,
    boundary: usize,
    label_len: usize,
    config: &LayoutConfig,
) -> f32 {
    let base = (100.0 - depth as f32 * 15.0).max(config.padding_min);
    let per_leaf = match leaves {
        0..=2 => 20.0,
        3..=5 => 16.0,
        _ => 14.0,
    };
    let per_edge = match boundary {
        0..=2 => 25.0,
        3..=5 => 20.0,
        _ => 18.0,
    };
    let label = (label_len as f32 - 10.0).max(0.0) * 2.0;
    let raw = base + leaves as f32 * per_leaf + boundary as f32 * per_edge + label;
    let upper = config.padding_max.min(200.0 + leaves as f32 * 15.0).max(base);
    raw.clamp(base, upper)
}

fn centred_in(block: &Rect, width: f32, height: f32) -> (f32, f32) {
    (
        block.x + (block.width - width) / 2.0,
        block.y + (block.height - height) / 2.0,
    )
}

fn place_subtree(
    cluster: &str,
    origin: (f32, f32),
    hierarchy: &ClusterHierarchy,
    config: &LayoutConfig,
    sizes: &BTreeMap<String, (f32, f32)>,
    placement: &mut ClusterPlacement,
) {
    let (w, h) = sizes.get(cluster).copied().unwrap_or((0.0, 0.0));
    placement
        .clusters
        .insert(cluster.to_string(), Rect::new(origin.0, origin.1, w, h));

    let offsets: Vec<(String, (f32, f32))> = placement
        .relative
        .get(cluster)
        .map(|children| children.iter().map(|(id, pos)| (id.clone(), *pos)).collect())
        .unwrap_or_default();
    for (child, (dx, dy)) in offsets {
        let position = (origin.0 + dx, origin.1 + dy);
        if hierarchy.is_cluster(&child) {
            place_subtree(&child, position, hierarchy, config, sizes, placement);
        } else {
            placement.nodes.insert(
                child,
                Rect::new(position.0, position.1, config.node_width, config.node_height),
            );
        }
    }
}

fn record_missing(missing: &[String], warnings: &mut Vec<LayoutWarning>) {
    for id in missing {
        let id = id.strip_prefix(SINGLETON_PREFIX).unwrap_or(id);
        warnings.push(LayoutWarning::MissingPosition { id: id.to_string() });
    }
}

/// Shifts everything so the top-left-most box starts at the origin.
fn normalise_origin(placement: &mut ClusterPlacement) {
    let bounds = placement
        .nodes
        .values()
        .chain(placement.clusters.values())
        .copied()
        .reduce(|acc, rect| acc.union(&rect));
    let Some(bounds) = bounds else {
        return;
    };
    let (dx, dy) = (-bounds.x, -bounds.y);
    for rect in placement.nodes.values_mut().chain(placement.clusters.values_mut()) {
        *rect = rect.translate(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MultiParentPolicy;

    fn build(graph: &Graph) -> (ClusterHierarchy, ClusterPlacement) {
        let (hierarchy, _) = ClusterHierarchy::build(graph, MultiParentPolicy::Reject).unwrap();
        let placement = layout_clusters(graph, &hierarchy, &graph.edges, &LayoutConfig::default());
        (hierarchy, placement)
    }

    #[test]
    fn padding_stays_within_bounds() {
        let config = LayoutConfig::default();
        for depth in 0..6 {
            for leaves in [0, 1, 4, 30] {
                for boundary in [0, 3, 40] {
                    let p = adaptive_padding(depth, leaves, boundary, 40, &config);
                    assert!((config.padding_min..=config.padding_max).contains(&p));
                }
            }
        }
    }

    #[test]
    fn padding_shrinks_with_depth() {
        let config = LayoutConfig::default();
        let shallow = adaptive_padding(0, 2, 1, 5, &config);
        let deep = adaptive_padding(2, 2, 1, 5, &config);
        assert!(deep < shallow);
    }

    #[test]
    fn padding_override_wins() {
        let mut graph = Graph::new();
        graph.ensure_node("a", None);
        graph.add_cluster("vpc", "VPC", &["a"], None);
        let (hierarchy, _) = ClusterHierarchy::build(&graph, MultiParentPolicy::Reject).unwrap();
        let mut config = LayoutConfig::default();
        config.cluster_padding.insert("vpc".to_string(), 75.0);
        let placement = layout_clusters(&graph, &hierarchy, &graph.edges, &config);
        assert_eq!(placement.paddings["vpc"], 75.0);
        let vpc = placement.clusters["vpc"];
        assert_eq!(vpc.width, config.node_width + 75.0);
    }

    #[test]
    fn empty_cluster_gets_placeholder_box() {
        let mut graph = Graph::new();
        graph.add_cluster("zone", "Zone", &[], None);
        let (_, placement) = build(&graph);
        let pad = placement.paddings["zone"];
        let zone = placement.clusters["zone"];
        assert_eq!((zone.width, zone.height), (pad * 2.0, pad * 2.0));
        assert!(placement.empty.contains("zone"));
    }

    #[test]
    fn nested_clusters_contain_their_descendants() {
        let mut graph = Graph::new();
        for id in ["user", "lb", "api", "db"] {
            graph.ensure_node(id, None);
        }
        graph.add_cluster("vpc", "VPC", &["lb", "api"], None);
        graph.add_cluster("private", "Private", &["db"], Some("vpc"));
        graph.add_edge("user", "lb", None);
        graph.add_edge("lb", "api", None);
        graph.add_edge("api", "db", None);
        let (hierarchy, placement) = build(&graph);

        for node in ["lb", "api", "db"] {
            for ancestor in hierarchy.ancestors(node) {
                assert!(placement.clusters[ancestor].contains_rect(&placement.nodes[node], 0.5));
            }
        }
        assert!(placement.clusters["vpc"].contains_rect(&placement.clusters["private"], 0.5));
        assert!(placement.relative["vpc"].contains_key("private"));
        assert!(placement.nodes.contains_key("user"));
    }

    #[test]
    fn unclustered_nodes_do_not_overlap_clusters() {
        let mut graph = Graph::new();
        for id in ["a", "b", "c"] {
            graph.ensure_node(id, None);
        }
        graph.add_cluster("zone", "Zone", &["a", "b"], None);
        graph.add_edge("c", "a", None);
        let (_, placement) = build(&graph);
        let zone = placement.clusters["zone"];
        let c = placement.nodes["c"];
        assert!(zone.overlap_x(&c) <= 0.0 || zone.overlap_y(&c) <= 0.0);
        let origin = placement
            .nodes
            .values()
            .chain(placement.clusters.values())
            .fold((f32::MAX, f32::MAX), |acc, r| (acc.0.min(r.x), acc.1.min(r.y)));
        assert!(origin.0.abs() < 1e-3 && origin.1.abs() < 1e-3);
    }
}
