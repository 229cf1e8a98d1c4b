use archlayout::layout::{EdgeKind, Rect};
use archlayout::{
    FixedWidthMeasurer, Graph, Layout, LayoutConfig, LayoutWarning, compute_layout_with,
    parse_graph_json,
};
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> Graph {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = fs::read_to_string(&path).expect("fixture read failed");
    parse_graph_json(&input).expect("fixture parse failed")
}

fn layout(graph: &Graph) -> Layout {
    compute_layout_with(graph, &LayoutConfig::default(), &FixedWidthMeasurer::default())
        .expect("layout failed")
}

fn overlaps(a: &Rect, b: &Rect) -> bool {
    let eps = 1e-3;
    a.x < b.right() - eps && b.x < a.right() - eps && a.y < b.bottom() - eps && b.y < a.bottom() - eps
}

fn assert_contained(layout: &Layout) {
    for node in layout.nodes.values() {
        let mut current = node.cluster.clone();
        while let Some(id) = current {
            let cluster = layout.cluster(&id).expect("ancestor cluster missing");
            assert!(
                cluster.rect().contains_rect(&node.rect(), 0.5),
                "node {} escapes cluster {}",
                node.id,
                cluster.id
            );
            current = cluster.parent.clone();
        }
    }
    for cluster in &layout.clusters {
        if let Some(parent) = cluster.parent.as_deref() {
            let parent = layout.cluster(parent).expect("parent cluster missing");
            assert!(
                parent.rect().contains_rect(&cluster.rect(), 0.5),
                "cluster {} escapes {}",
                cluster.id,
                parent.id
            );
        }
    }
}

fn top_level_rects(layout: &Layout) -> Vec<(String, Rect)> {
    let mut rects: Vec<(String, Rect)> = layout
        .clusters
        .iter()
        .filter(|c| c.parent.is_none())
        .map(|c| (c.id.clone(), c.rect()))
        .collect();
    rects.extend(
        layout
            .nodes
            .values()
            .filter(|n| n.cluster.is_none())
            .map(|n| (n.id.clone(), n.rect())),
    );
    rects
}

fn forty_node_graph() -> Graph {
    let mut graph = Graph::new();
    for zone in 0..5 {
        let members: Vec<String> = (0..6).map(|i| format!("z{zone}n{i}")).collect();
        for id in &members {
            graph.ensure_node(id, Some(&format!("Service {id}")));
        }
        let refs: Vec<&str> = members.iter().map(String::as_str).collect();
        graph.add_cluster(&format!("zone{zone}"), &format!("Zone {zone}"), &refs, None);
        for i in 1..6 {
            graph.add_edge(&members[0], &members[i], Some("mTLS"));
        }
    }
    for i in 0..10 {
        graph.ensure_node(&format!("ext{i}"), Some(&format!("External {i}")));
        graph.add_edge(&format!("ext{i}"), &format!("z{}n0", i % 5), Some("HTTPS"));
    }
    graph.add_edge("z0n3", "z1n4", Some("gRPC"));
    graph.add_edge("z2n1", "z4n2", None);
    graph
}

#[test]
fn full_cluster_coverage_aggregates_edges() {
    let result = layout(&fixture("aggregation.json"));
    assert_eq!(result.edges.len(), 1);
    let edge = &result.edges[0];
    assert_eq!(edge.kind, EdgeKind::Aggregated);
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("A", "n3"));
    assert_eq!(edge.label.as_deref(), Some("SQL, TLS"));
    assert_eq!(edge.members, vec!["e1".to_string(), "e2".to_string()]);
    assert!(edge.arrow_end && !edge.arrow_start);
}

#[test]
fn partial_cluster_coverage_keeps_leaf_edges() {
    let result = layout(&fixture("partial_coverage.json"));
    assert_eq!(result.edges.len(), 1);
    let edge = &result.edges[0];
    assert_eq!(edge.kind, EdgeKind::Simple);
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("n1", "n3"));
    assert_eq!(edge.label.as_deref(), Some("SQL"));
}

#[test]
fn reciprocal_edges_merge_into_one() {
    let result = layout(&fixture("reciprocal.json"));
    assert_eq!(result.edges.len(), 1);
    let edge = &result.edges[0];
    assert_eq!(edge.kind, EdgeKind::Bidirectional);
    assert_eq!(edge.label.as_deref(), Some("Request / Response"));
    assert!(edge.arrow_start && edge.arrow_end);
}

#[test]
fn nested_clusters_contain_descendants() {
    let result = layout(&fixture("nested.json"));
    assert!(
        result
            .warnings
            .iter()
            .all(|w| matches!(w, LayoutWarning::ResidualOverlap { .. })),
        "{:?}",
        result.warnings
    );
    assert_eq!(result.clusters.len(), 3);
    let ids: Vec<&str> = result.clusters.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["cloud", "vpc", "private"]);
    assert_eq!(result.cluster("private").map(|c| c.depth), Some(2));
    assert_eq!(result.nodes["db"].cluster.as_deref(), Some("private"));
    assert_contained(&result);
    assert!(result.edges.iter().all(|e| e.points.len() >= 2));
}

#[test]
fn top_level_blocks_do_not_overlap() {
    for name in ["aggregation.json", "nested.json", "reciprocal.json"] {
        let result = layout(&fixture(name));
        if result
            .warnings
            .iter()
            .any(|w| matches!(w, LayoutWarning::ResidualOverlap { .. }))
        {
            continue;
        }
        let rects = top_level_rects(&result);
        for (i, (a_id, a)) in rects.iter().enumerate() {
            for (b_id, b) in rects.iter().skip(i + 1) {
                assert!(!overlaps(a, b), "{name}: {a_id} overlaps {b_id}");
            }
        }
    }
}

#[test]
fn forty_node_graph_is_deterministic() {
    let graph = forty_node_graph();
    assert_eq!(graph.nodes.len(), 40);
    let first = layout(&graph);
    let second = layout(&graph);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_contained(&first);
    for node in first.nodes.values() {
        assert!(node.x.is_finite() && node.y.is_finite());
    }
}

#[test]
fn every_direction_keeps_containment() {
    let graph = fixture("nested.json");
    for token in ["LR", "TB", "RL", "BT"] {
        let config = LayoutConfig {
            direction: archlayout::Direction::from_token(token).unwrap(),
            ..LayoutConfig::default()
        };
        let result =
            compute_layout_with(&graph, &config, &FixedWidthMeasurer::default()).unwrap();
        assert_contained(&result);
    }
}

#[test]
fn layout_serializes_for_consumers() {
    let result = layout(&fixture("nested.json"));
    let value = serde_json::to_value(&result).unwrap();
    assert!(value["nodes"]["api"]["x"].is_number());
    assert!(value["clusters"].as_array().is_some_and(|c| c.len() == 3));
    assert!(value["relative_positions"]["private"]["api"].is_array());
}
