use std::collections::{BTreeMap, BTreeSet};

use crate::config::MultiParentPolicy;
use crate::ir::Graph;

use super::error::LayoutError;
use super::types::LayoutWarning;

/// Static view of the cluster tree for one layout run.
///
/// Every lookup is precomputed in [`ClusterHierarchy::build`]; nothing is
/// recomputed per query.
#[derive(Debug, Clone, Default)]
pub struct ClusterHierarchy {
    order: Vec<String>,
    nodes: BTreeSet<String>,
    parent: BTreeMap<String, String>,
    children: BTreeMap<String, Vec<String>>,
    direct_leaves: BTreeMap<String, Vec<String>>,
    descendants: BTreeMap<String, BTreeSet<String>>,
    node_cluster: BTreeMap<String, String>,
    depth: BTreeMap<String, usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl ClusterHierarchy {
    pub fn build(
        graph: &Graph,
        policy: MultiParentPolicy,
    ) -> Result<(Self, Vec<LayoutWarning>), LayoutError> {
        let mut warnings = Vec::new();
        let cluster_ids: BTreeSet<&str> = graph.clusters.iter().map(|c| c.id.as_str()).collect();
        let nodes: BTreeSet<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();

        // Nesting can be declared from either side: `parent` on the child, or the
        // child's id listed among the parent's members.
        let mut declared: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for cluster in &graph.clusters {
            let entry = declared.entry(cluster.id.as_str()).or_default();
            for parent in &cluster.parent_ids {
                if !entry.contains(&parent.as_str()) {
                    entry.push(parent.as_str());
                }
            }
        }
        for cluster in &graph.clusters {
            for member in &cluster.node_ids {
                if cluster_ids.contains(member.as_str()) {
                    let entry = declared.entry(member.as_str()).or_default();
                    if !entry.contains(&cluster.id.as_str()) {
                        entry.push(cluster.id.as_str());
                    }
                }
            }
        }

        let mut parent: BTreeMap<String, String> = BTreeMap::new();
        for cluster in &graph.clusters {
            let mut known: Vec<&str> = Vec::new();
            for candidate in declared.get(cluster.id.as_str()).into_iter().flatten() {
                if cluster_ids.contains(candidate) {
                    known.push(*candidate);
                } else {
                    warnings.push(LayoutWarning::UnknownParent {
                        cluster: cluster.id.clone(),
                        parent: candidate.to_string(),
                    });
                }
            }
            match known.as_slice() {
                [] => {}
                [only] => {
                    parent.insert(cluster.id.clone(), only.to_string());
                }
                [first, rest @ ..] => match policy {
                    MultiParentPolicy::Reject => {
                        return Err(LayoutError::MultipleParents {
                            cluster: cluster.id.clone(),
                            parents: known.iter().map(|p| p.to_string()).collect(),
                        });
                    }
                    MultiParentPolicy::First => {
                        warnings.push(LayoutWarning::ExtraParentsIgnored {
                            cluster: cluster.id.clone(),
                            kept: first.to_string(),
                            ignored: rest.iter().map(|p| p.to_string()).collect(),
                        });
                        parent.insert(cluster.id.clone(), first.to_string());
                    }
                },
            }
        }

        let mut node_cluster: BTreeMap<String, String> = BTreeMap::new();
        let mut direct_leaves: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for cluster in &graph.clusters {
            let leaves = direct_leaves.entry(cluster.id.clone()).or_default();
            for member in &cluster.node_ids {
                if cluster_ids.contains(member.as_str()) {
                    continue;
                }
                if !nodes.contains(member) {
                    warnings.push(LayoutWarning::UnknownClusterMember {
                        cluster: cluster.id.clone(),
                        member: member.clone(),
                    });
                    continue;
                }
                match node_cluster.get(member) {
                    Some(kept) if kept == &cluster.id => {}
                    Some(kept) => warnings.push(LayoutWarning::DuplicateMembership {
                        node: member.clone(),
                        kept: kept.clone(),
                        ignored: cluster.id.clone(),
                    }),
                    None => {
                        node_cluster.insert(member.clone(), cluster.id.clone());
                        leaves.push(member.clone());
                    }
                }
            }
        }

        let order = topological_sort(graph, &parent)?;

        let mut depth: BTreeMap<String, usize> = BTreeMap::new();
        let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for id in &order {
            let d = match parent.get(id) {
                Some(p) => depth.get(p).copied().unwrap_or(0) + 1,
                None => 0,
            };
            depth.insert(id.clone(), d);
            children.entry(id.clone()).or_default();
        }
        for cluster in &graph.clusters {
            if let Some(p) = parent.get(&cluster.id) {
                children.entry(p.clone()).or_default().push(cluster.id.clone());
            }
        }

        let mut descendants: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for id in order.iter().rev() {
            let mut set: BTreeSet<String> = direct_leaves
                .get(id)
                .map(|leaves| leaves.iter().cloned().collect())
                .unwrap_or_default();
            for child in children.get(id).into_iter().flatten() {
                if let Some(child_set) = descendants.get(child) {
                    set.extend(child_set.iter().cloned());
                }
            }
            descendants.insert(id.clone(), set);
        }

        Ok((
            Self {
                order,
                nodes,
                parent,
                children,
                direct_leaves,
                descendants,
                node_cluster,
                depth,
            },
            warnings,
        ))
    }

    /// Cluster ids with every parent before its children; ties keep input order.
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    pub fn is_cluster(&self, id: &str) -> bool {
        self.depth.contains_key(id)
    }

    pub fn is_node(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn descendant_leaves(&self, cluster: &str) -> Option<&BTreeSet<String>> {
        self.descendants.get(cluster)
    }

    pub fn immediate_cluster(&self, node: &str) -> Option<&str> {
        self.node_cluster.get(node).map(String::as_str)
    }

    pub fn depth(&self, cluster: &str) -> usize {
        self.depth.get(cluster).copied().unwrap_or(0)
    }

    pub fn parent(&self, cluster: &str) -> Option<&str> {
        self.parent.get(cluster).map(String::as_str)
    }

    pub fn children(&self, cluster: &str) -> &[String] {
        self.children.get(cluster).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn direct_leaves(&self, cluster: &str) -> &[String] {
        self.direct_leaves.get(cluster).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> + '_ {
        self.order
            .iter()
            .filter(|id| !self.parent.contains_key(id.as_str()))
            .map(String::as_str)
    }

    /// Enclosing cluster of a node, or parent of a cluster.
    pub fn container(&self, id: &str) -> Option<&str> {
        if self.is_cluster(id) {
            self.parent(id)
        } else {
            self.immediate_cluster(id)
        }
    }

    /// Every enclosing cluster of `id`, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self.container(id);
        while let Some(cluster) = current {
            chain.push(cluster);
            current = self.parent(cluster);
        }
        chain
    }

    pub fn top_level_cluster(&self, node: &str) -> Option<&str> {
        self.ancestors(node).last().copied()
    }

    /// The direct item of `container` (or of the top level when `None`) that
    /// holds `id`, which may be `id` itself.
    pub fn item_under<'a>(&'a self, id: &'a str, container: Option<&str>) -> Option<&'a str> {
        if !self.is_node(id) && !self.is_cluster(id) {
            return None;
        }
        let mut current = id;
        loop {
            let holder = self.container(current);
            if holder == container {
                return Some(current);
            }
            current = holder?;
        }
    }

    /// Clusters grouped by depth; each group keeps topological order.
    pub fn clusters_by_depth(&self) -> BTreeMap<usize, Vec<&str>> {
        let mut grouped: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for id in &self.order {
            grouped.entry(self.depth(id)).or_default().push(id.as_str());
        }
        grouped
    }

    pub fn max_depth(&self) -> usize {
        self.depth.values().copied().max().unwrap_or(0)
    }
}

fn topological_sort(
    graph: &Graph,
    parent: &BTreeMap<String, String>,
) -> Result<Vec<String>, LayoutError> {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut order = Vec::with_capacity(graph.clusters.len());

    for cluster in &graph.clusters {
        // Walk up to the first visited ancestor, then emit the chain top-down.
        let mut chain: Vec<&str> = Vec::new();
        let mut current = Some(cluster.id.as_str());
        while let Some(id) = current {
            match marks.get(id) {
                Some(Mark::Done) => break,
                Some(Mark::Visiting) => {
                    return Err(LayoutError::CyclicHierarchy {
                        cluster: id.to_string(),
                    });
                }
                None => {
                    marks.insert(id, Mark::Visiting);
                    chain.push(id);
                    current = parent.get(id).map(String::as_str);
                }
            }
        }
        for id in chain.into_iter().rev() {
            marks.insert(id, Mark::Done);
            order.push(id.to_string());
        }
    }

    Ok(order)
}
