use std::collections::{BTreeMap, BTreeSet};

use crate::ir::{Graph, GraphEdge};

use super::hierarchy::ClusterHierarchy;
use super::types::{EdgeKind, LayoutWarning};

/// An edge ready for routing, possibly standing in for several input edges.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: Option<String>,
    pub kind: EdgeKind,
    pub members: Vec<String>,
    pub arrow_start: bool,
    pub arrow_end: bool,
}

impl PreparedEdge {
    fn simple(edge: &GraphEdge) -> Self {
        Self {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            label: edge.label.clone(),
            kind: EdgeKind::Simple,
            members: vec![edge.id.clone()],
            arrow_start: false,
            arrow_end: true,
        }
    }
}

/// Drops edges with unknown endpoints and self-loops.
pub fn sanitize_edges(
    graph: &Graph,
    hierarchy: &ClusterHierarchy,
) -> (Vec<GraphEdge>, Vec<LayoutWarning>) {
    let known = |id: &str| hierarchy.is_node(id) || hierarchy.is_cluster(id);
    let mut kept = Vec::with_capacity(graph.edges.len());
    let mut warnings = Vec::new();
    for edge in &graph.edges {
        if let Some(missing) = [&edge.source, &edge.target]
            .into_iter()
            .find(|id| !known(id))
        {
            warnings.push(LayoutWarning::DroppedEdge {
                edge: edge.id.clone(),
                missing: missing.clone(),
            });
            continue;
        }
        if edge.source == edge.target {
            warnings.push(LayoutWarning::SelfLoop {
                edge: edge.id.clone(),
            });
            continue;
        }
        kept.push(edge.clone());
    }
    (kept, warnings)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Flow {
    Outgoing,
    Incoming,
}

/// Collapses parallel leaf edges into one cluster-level edge when every leaf
/// of the cluster connects to the same external endpoint.
///
/// Outer clusters are tried first and each input edge is consumed at most once.
/// Partial coverage leaves the individual edges untouched.
pub fn aggregate_edges(edges: &[GraphEdge], hierarchy: &ClusterHierarchy) -> Vec<PreparedEdge> {
    let mut consumed = vec![false; edges.len()];
    let mut aggregated: Vec<(usize, PreparedEdge)> = Vec::new();

    for cluster in hierarchy.topological_order() {
        let Some(leaves) = hierarchy.descendant_leaves(cluster) else {
            continue;
        };
        if leaves.len() < 2 {
            continue;
        }
        let ancestors = hierarchy.ancestors(cluster);
        for flow in [Flow::Outgoing, Flow::Incoming] {
            // external endpoint -> (edge indices, leaves covered), first-seen order
            let mut groups: Vec<(String, Vec<usize>, BTreeSet<&str>)> = Vec::new();
            for (index, edge) in edges.iter().enumerate() {
                if consumed[index] {
                    continue;
                }
                let (leaf, other) = match flow {
                    Flow::Outgoing => (edge.source.as_str(), edge.target.as_str()),
                    Flow::Incoming => (edge.target.as_str(), edge.source.as_str()),
                };
                if !leaves.contains(leaf)
                    || other == cluster
                    || ancestors.contains(&other)
                    || hierarchy.item_under(other, Some(cluster)).is_some()
                {
                    continue;
                }
                match groups.iter_mut().find(|(id, _, _)| id == other) {
                    Some((_, members, covered)) => {
                        members.push(index);
                        covered.insert(leaf);
                    }
                    None => groups.push((other.to_string(), vec![index], BTreeSet::from([leaf]))),
                }
            }

            for (other, members, covered) in groups {
                if covered.len() != leaves.len() {
                    continue;
                }
                for &index in &members {
                    consumed[index] = true;
                }
                let (source, target) = match flow {
                    Flow::Outgoing => (cluster.clone(), other),
                    Flow::Incoming => (other, cluster.clone()),
                };
                let first = members.iter().copied().min().unwrap_or(0);
                tracing::debug!(
                    cluster = %cluster,
                    edges = members.len(),
                    "aggregated parallel edges"
                );
                aggregated.push((
                    first,
                    PreparedEdge {
                        id: format!("{source}=>{target}"),
                        label: join_labels(members.iter().map(|&i| &edges[i])),
                        members: members.iter().map(|&i| edges[i].id.clone()).collect(),
                        source,
                        target,
                        kind: EdgeKind::Aggregated,
                        arrow_start: false,
                        arrow_end: true,
                    },
                ));
            }
        }
    }

    let mut ordered: Vec<(usize, PreparedEdge)> = edges
        .iter()
        .enumerate()
        .filter(|(index, _)| !consumed[*index])
        .map(|(index, edge)| (index, PreparedEdge::simple(edge)))
        .chain(aggregated)
        .collect();
    ordered.sort_by_key(|(index, _)| *index);
    ordered.into_iter().map(|(_, edge)| edge).collect()
}

/// Distinct labels in first-seen order, joined with `", "`.
fn join_labels<'a>(edges: impl Iterator<Item = &'a GraphEdge>) -> Option<String> {
    let mut labels: Vec<&str> = Vec::new();
    for edge in edges {
        if let Some(label) = edge.label.as_deref() {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
    }
    if labels.is_empty() {
        None
    } else {
        Some(labels.join(", "))
    }
}

/// Pairs `A -> B` with the first unpaired `B -> A` into one bidirectional edge.
pub fn merge_reciprocal(edges: Vec<PreparedEdge>) -> Vec<PreparedEdge> {
    let mut partner: BTreeMap<usize, usize> = BTreeMap::new();
    let mut taken = vec![false; edges.len()];
    for i in 0..edges.len() {
        if taken[i] {
            continue;
        }
        let reverse = (i + 1..edges.len()).find(|&j| {
            !taken[j] && edges[j].source == edges[i].target && edges[j].target == edges[i].source
        });
        if let Some(j) = reverse {
            taken[i] = true;
            taken[j] = true;
            partner.insert(i, j);
        }
    }

    let mut slots: Vec<Option<PreparedEdge>> = edges.into_iter().map(Some).collect();
    let mut merged = Vec::with_capacity(slots.len());
    for i in 0..slots.len() {
        let Some(edge) = slots[i].take() else {
            continue;
        };
        let Some(&j) = partner.get(&i) else {
            merged.push(edge);
            continue;
        };
        let Some(reverse) = slots[j].take() else {
            merged.push(edge);
            continue;
        };
        let label = match (edge.label.as_deref(), reverse.label.as_deref()) {
            (Some(a), Some(b)) if a == b => Some(a.to_string()),
            (Some(a), Some(b)) => Some(format!("{a} / {b}")),
            (Some(a), None) => Some(a.to_string()),
            (None, Some(b)) => Some(b.to_string()),
            (None, None) => None,
        };
        let mut members = edge.members;
        members.extend(reverse.members);
        merged.push(PreparedEdge {
            id: format!("{}<>{}", edge.id, reverse.id),
            source: edge.source,
            target: edge.target,
            label,
            kind: EdgeKind::Bidirectional,
            members,
            arrow_start: true,
            arrow_end: true,
        });
    }
    merged
}

/// Sanitising, aggregation and reciprocal merging in one step.
pub fn prepare_edges(
    graph: &Graph,
    hierarchy: &ClusterHierarchy,
) -> (Vec<GraphEdge>, Vec<PreparedEdge>, Vec<LayoutWarning>) {
    let (valid, warnings) = sanitize_edges(graph, hierarchy);
    let prepared = merge_reciprocal(aggregate_edges(&valid, hierarchy));
    (valid, prepared, warnings)
}
