use std::collections::BTreeMap;

use crate::config::RoutingConfig;
use crate::ir::Direction;
use crate::text_metrics::TextMeasurer;

use super::edges::PreparedEdge;
use super::hierarchy::ClusterHierarchy;
use super::types::{EdgeLayout, EdgeSide, LabelGap, Rect};

// ── Geometry tolerances ─────────────────────────────────────────────
const EPS: f32 = 1e-4;

// ── Obstacle avoidance ──────────────────────────────────────────────
/// Rounds of widening a detour lane to clear obstacles the lane itself hits.
const DETOUR_ROUNDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Role {
    Source,
    Target,
}

/// Placed geometry the router reads.
pub struct RoutingScene<'a> {
    pub nodes: &'a BTreeMap<String, Rect>,
    pub clusters: &'a BTreeMap<String, Rect>,
    pub hierarchy: &'a ClusterHierarchy,
    pub direction: Direction,
}

impl RoutingScene<'_> {
    fn rect(&self, id: &str) -> Option<Rect> {
        self.nodes
            .get(id)
            .or_else(|| self.clusters.get(id))
            .copied()
    }

    fn is_cluster(&self, id: &str) -> bool {
        !self.nodes.contains_key(id) && self.clusters.contains_key(id)
    }

    /// Node boxes other than the endpoints, and cluster boxes that enclose
    /// neither endpoint.
    fn obstacles_for(&self, source: &str, target: &str) -> Vec<Rect> {
        let mut enclosing = self.hierarchy.ancestors(source);
        enclosing.extend(self.hierarchy.ancestors(target));
        let nodes = self
            .nodes
            .iter()
            .filter(|(id, _)| id.as_str() != source && id.as_str() != target)
            .map(|(_, rect)| *rect);
        let clusters = self
            .clusters
            .iter()
            .filter(|(id, _)| {
                id.as_str() != source && id.as_str() != target && !enclosing.contains(&id.as_str())
            })
            .map(|(_, rect)| *rect);
        nodes.chain(clusters).collect()
    }
}

struct EndpointPlan {
    rect: Rect,
    is_cluster: bool,
    side: EdgeSide,
    offset: f32,
}

/// Routes every prepared edge against the placed boxes.
pub fn route_edges(
    edges: &[PreparedEdge],
    scene: &RoutingScene<'_>,
    config: &RoutingConfig,
    measurer: &dyn TextMeasurer,
) -> Vec<EdgeLayout> {
    let mut plans: Vec<Option<(EndpointPlan, EndpointPlan)>> = Vec::with_capacity(edges.len());
    for edge in edges {
        let (Some(source), Some(target)) = (scene.rect(&edge.source), scene.rect(&edge.target))
        else {
            tracing::debug!(edge = %edge.id, "edge endpoint has no placed box");
            plans.push(None);
            continue;
        };
        let source_cluster = scene.is_cluster(&edge.source);
        let target_cluster = scene.is_cluster(&edge.target);
        let (mut source_side, mut target_side) = select_sides(&source, &target, scene.direction);
        if source_cluster {
            source_side = boundary_point_toward(&source, target.center()).1;
        }
        if target_cluster {
            target_side = boundary_point_toward(&target, source.center()).1;
        }
        plans.push(Some((
            EndpointPlan {
                rect: source,
                is_cluster: source_cluster,
                side: source_side,
                offset: 0.0,
            },
            EndpointPlan {
                rect: target,
                is_cluster: target_cluster,
                side: target_side,
                offset: 0.0,
            },
        )));
    }

    assign_fan_offsets(edges, &mut plans, config);

    let mut routed = Vec::with_capacity(edges.len());
    for (edge, plan) in edges.iter().zip(plans) {
        let Some((source, target)) = plan else {
            continue;
        };
        let start = anchor_point(&source, target.rect.center(), config.endpoint_offset);
        let end = anchor_point(&target, source.rect.center(), config.endpoint_offset);
        let obstacles = scene.obstacles_for(&edge.source, &edge.target);
        let (points, rerouted) =
            route_around(start, source.side, end, target.side, &obstacles, config);
        let (label_anchor, label_gap) = match edge.label.as_deref() {
            Some(label) => label_geometry(&points, label, config, measurer),
            None => (None, None),
        };
        if rerouted {
            tracing::debug!(edge = %edge.id, "edge rerouted around obstacles");
        }
        routed.push(EdgeLayout {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            label: edge.label.clone(),
            kind: edge.kind,
            members: edge.members.clone(),
            points,
            arrow_start: edge.arrow_start,
            arrow_end: edge.arrow_end,
            source_side: source.side,
            target_side: target.side,
            label_anchor,
            label_gap,
            rerouted,
        });
    }
    routed
}

/// Exit and entry sides for a pair of boxes.
///
/// The flow axis follows the direction; a target behind the source flips the
/// sides, and boxes stacked within one rank connect across the other axis.
pub fn select_sides(source: &Rect, target: &Rect, direction: Direction) -> (EdgeSide, EdgeSide) {
    let (sx, sy) = source.center();
    let (tx, ty) = target.center();
    let stacked = if direction.is_horizontal() {
        source.overlap_x(target) > EPS
    } else {
        source.overlap_y(target) > EPS
    };
    let horizontal = direction.is_horizontal() != stacked;
    if horizontal {
        if tx >= sx {
            (EdgeSide::Right, EdgeSide::Left)
        } else {
            (EdgeSide::Left, EdgeSide::Right)
        }
    } else if ty >= sy {
        (EdgeSide::Bottom, EdgeSide::Top)
    } else {
        (EdgeSide::Top, EdgeSide::Bottom)
    }
}

/// Where the ray from the box centre toward `toward` leaves the box.
pub fn boundary_point_toward(rect: &Rect, toward: (f32, f32)) -> ((f32, f32), EdgeSide) {
    let (cx, cy) = rect.center();
    let dx = toward.0 - cx;
    let dy = toward.1 - cy;
    if dx.abs() < EPS && dy.abs() < EPS {
        return ((rect.right(), cy), EdgeSide::Right);
    }
    let tx = if dx.abs() > EPS {
        (rect.width / 2.0) / dx.abs()
    } else {
        f32::INFINITY
    };
    let ty = if dy.abs() > EPS {
        (rect.height / 2.0) / dy.abs()
    } else {
        f32::INFINITY
    };
    if tx <= ty {
        let side = if dx > 0.0 { EdgeSide::Right } else { EdgeSide::Left };
        ((cx + dx * tx, cy + dy * tx), side)
    } else {
        let side = if dy > 0.0 { EdgeSide::Bottom } else { EdgeSide::Top };
        ((cx + dx * ty, cy + dy * ty), side)
    }
}

/// Symmetric offsets for `count` siblings sharing one side of length `side_len`.
/// Offsets increase with the sibling index and the whole fan stays within
/// `fan_span_ratio` of the side.
pub fn fan_offsets(count: usize, side_len: f32, config: &RoutingConfig) -> Vec<f32> {
    if count <= 1 {
        return vec![0.0; count];
    }
    let gaps = (count - 1) as f32;
    let spacing = config
        .fan_spacing
        .min(side_len.max(0.0) * config.fan_span_ratio / gaps);
    let centre = gaps / 2.0;
    (0..count).map(|idx| (idx as f32 - centre) * spacing).collect()
}

fn assign_fan_offsets(
    edges: &[PreparedEdge],
    plans: &mut [Option<(EndpointPlan, EndpointPlan)>],
    config: &RoutingConfig,
) {
    let mut groups: BTreeMap<(&str, EdgeSide, Role), Vec<usize>> = BTreeMap::new();
    for (idx, (edge, plan)) in edges.iter().zip(plans.iter()).enumerate() {
        let Some((source, target)) = plan else {
            continue;
        };
        groups
            .entry((edge.source.as_str(), source.side, Role::Source))
            .or_default()
            .push(idx);
        groups
            .entry((edge.target.as_str(), target.side, Role::Target))
            .or_default()
            .push(idx);
    }

    for ((_, side, role), members) in groups {
        if members.len() < 2 {
            continue;
        }
        let Some(Some((source, target))) = plans.get(members[0]) else {
            continue;
        };
        let rect = match role {
            Role::Source => source.rect,
            Role::Target => target.rect,
        };
        let side_len = match side {
            EdgeSide::Left | EdgeSide::Right => rect.height,
            EdgeSide::Top | EdgeSide::Bottom => rect.width,
        };
        let offsets = fan_offsets(members.len(), side_len, config);
        for (idx, offset) in members.into_iter().zip(offsets) {
            if let Some(Some((source, target))) = plans.get_mut(idx) {
                match role {
                    Role::Source => source.offset = offset,
                    Role::Target => target.offset = offset,
                }
            }
        }
    }
}

/// First (or last) path point: on the chosen side, shifted by the fan offset,
/// `endpoint_offset` outside the boundary.
fn anchor_point(plan: &EndpointPlan, other_center: (f32, f32), endpoint_offset: f32) -> (f32, f32) {
    let rect = &plan.rect;
    let base = if plan.is_cluster {
        boundary_point_toward(rect, other_center).0
    } else {
        let (cx, cy) = rect.center();
        match plan.side {
            EdgeSide::Left => (rect.x, cy),
            EdgeSide::Right => (rect.right(), cy),
            EdgeSide::Top => (cx, rect.y),
            EdgeSide::Bottom => (cx, rect.bottom()),
        }
    };
    let shifted = apply_port_offset(base, plan.side, plan.offset);
    let clamped = match plan.side {
        EdgeSide::Left | EdgeSide::Right => (shifted.0, shifted.1.clamp(rect.y, rect.bottom())),
        EdgeSide::Top | EdgeSide::Bottom => (shifted.0.clamp(rect.x, rect.right()), shifted.1),
    };
    port_stub_point(clamped, plan.side, endpoint_offset)
}

pub(super) fn apply_port_offset(point: (f32, f32), side: EdgeSide, offset: f32) -> (f32, f32) {
    match side {
        EdgeSide::Left | EdgeSide::Right => (point.0, point.1 + offset),
        EdgeSide::Top | EdgeSide::Bottom => (point.0 + offset, point.1),
    }
}

pub(super) fn port_stub_point(point: (f32, f32), side: EdgeSide, length: f32) -> (f32, f32) {
    match side {
        EdgeSide::Left => (point.0 - length, point.1),
        EdgeSide::Right => (point.0 + length, point.1),
        EdgeSide::Top => (point.0, point.1 - length),
        EdgeSide::Bottom => (point.0, point.1 + length),
    }
}

fn side_is_horizontal_exit(side: EdgeSide) -> bool {
    matches!(side, EdgeSide::Left | EdgeSide::Right)
}

/// Straight orthogonal connection: a Z-shape through the midpoint when both
/// ends exit on the same axis, an L-shape otherwise.
fn orthogonal_path(
    start: (f32, f32),
    start_side: EdgeSide,
    end: (f32, f32),
    end_side: EdgeSide,
) -> Vec<(f32, f32)> {
    match (side_is_horizontal_exit(start_side), side_is_horizontal_exit(end_side)) {
        (true, true) => {
            let mid = (start.0 + end.0) / 2.0;
            vec![start, (mid, start.1), (mid, end.1), end]
        }
        (false, false) => {
            let mid = (start.1 + end.1) / 2.0;
            vec![start, (start.0, mid), (end.0, mid), end]
        }
        (true, false) => vec![start, (end.0, start.1), end],
        (false, true) => vec![start, (start.0, end.1), end],
    }
}

fn detour_path(
    start: (f32, f32),
    start_side: EdgeSide,
    end: (f32, f32),
    end_side: EdgeSide,
    lane: f32,
    stub: f32,
) -> Vec<(f32, f32)> {
    let s = port_stub_point(start, start_side, stub);
    let e = port_stub_point(end, end_side, stub);
    if side_is_horizontal_exit(start_side) {
        vec![start, s, (s.0, lane), (e.0, lane), e, end]
    } else {
        vec![start, s, (lane, s.1), (lane, e.1), e, end]
    }
}

/// Lane coordinate just outside every obstacle in `hit`, on the requested side.
fn corridor_lane(
    hit: &[Rect],
    start: (f32, f32),
    end: (f32, f32),
    lane_is_y: bool,
    leading: bool,
    margin: f32,
) -> f32 {
    match (lane_is_y, leading) {
        (true, true) => hit.iter().map(|r| r.y).fold(start.1.min(end.1), f32::min) - margin,
        (true, false) => hit.iter().map(Rect::bottom).fold(start.1.max(end.1), f32::max) + margin,
        (false, true) => hit.iter().map(|r| r.x).fold(start.0.min(end.0), f32::min) - margin,
        (false, false) => hit.iter().map(Rect::right).fold(start.0.max(end.0), f32::max) + margin,
    }
}

fn blocking_obstacles(points: &[(f32, f32)], obstacles: &[Rect], clearance: f32) -> Vec<Rect> {
    obstacles
        .iter()
        .filter(|rect| {
            let band = rect.inflate(clearance);
            points
                .windows(2)
                .any(|seg| segment_intersects_rect(seg[0], seg[1], &band))
        })
        .copied()
        .collect()
}

/// Takes the straight corridor when clear, otherwise the top (left) corridor,
/// then the bottom (right) one. With no clear option, the candidate touching
/// the fewest obstacles wins.
fn route_around(
    start: (f32, f32),
    start_side: EdgeSide,
    end: (f32, f32),
    end_side: EdgeSide,
    obstacles: &[Rect],
    config: &RoutingConfig,
) -> (Vec<(f32, f32)>, bool) {
    let straight = compress_path(&orthogonal_path(start, start_side, end, end_side));
    let blocking = blocking_obstacles(&straight, obstacles, config.obstacle_clearance);
    if blocking.is_empty() {
        return (straight, false);
    }

    let lane_is_y = side_is_horizontal_exit(start_side);
    let mut best = (straight, blocking.len(), false);
    for leading in [true, false] {
        let mut hit = blocking.clone();
        for _ in 0..DETOUR_ROUNDS {
            let lane = corridor_lane(&hit, start, end, lane_is_y, leading, config.corridor_margin);
            let path = compress_path(&detour_path(
                start,
                start_side,
                end,
                end_side,
                lane,
                config.corridor_margin,
            ));
            let crossed = blocking_obstacles(&path, obstacles, config.obstacle_clearance);
            if crossed.is_empty() {
                return (path, true);
            }
            if crossed.len() < best.1 {
                best = (path, crossed.len(), true);
            }
            let before = hit.len();
            for rect in crossed {
                if !hit.contains(&rect) {
                    hit.push(rect);
                }
            }
            if hit.len() == before {
                break;
            }
        }
    }
    (best.0, best.2)
}

pub(super) fn compress_path(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    for &point in points {
        if let Some(&last) = out.last() {
            if (point.0 - last.0).abs() <= EPS && (point.1 - last.1).abs() <= EPS {
                continue;
            }
        }
        if out.len() >= 2 {
            let prev = out[out.len() - 2];
            let curr = out[out.len() - 1];
            let same_x = (prev.0 - curr.0).abs() <= EPS && (curr.0 - point.0).abs() <= EPS;
            let same_y = (prev.1 - curr.1).abs() <= EPS && (curr.1 - point.1).abs() <= EPS;
            if same_x || same_y {
                out.pop();
            }
        }
        out.push(point);
    }
    out
}

pub(super) fn path_length(points: &[(f32, f32)]) -> f32 {
    points
        .windows(2)
        .map(|seg| {
            let dx = seg[1].0 - seg[0].0;
            let dy = seg[1].1 - seg[0].1;
            (dx * dx + dy * dy).sqrt()
        })
        .sum()
}

/// Point at arc length `distance`, plus whether its segment runs horizontally.
fn point_at_length(points: &[(f32, f32)], distance: f32) -> Option<((f32, f32), bool)> {
    let mut remaining = distance.max(0.0);
    let mut last = None;
    for seg in points.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;
        let len = (dx * dx + dy * dy).sqrt();
        if len <= EPS {
            continue;
        }
        let horizontal = dx.abs() >= dy.abs();
        if remaining <= len {
            let t = remaining / len;
            return Some(((a.0 + dx * t, a.1 + dy * t), horizontal));
        }
        remaining -= len;
        last = Some((b, horizontal));
    }
    last.or_else(|| points.first().map(|p| (*p, true)))
}

/// Label anchor at the arc-length midpoint and the cut-out the label needs,
/// unless the cut-out would crowd an arrowhead.
fn label_geometry(
    points: &[(f32, f32)],
    label: &str,
    config: &RoutingConfig,
    measurer: &dyn TextMeasurer,
) -> (Option<(f32, f32)>, Option<LabelGap>) {
    let total = path_length(points);
    let Some((anchor, horizontal)) = point_at_length(points, total / 2.0) else {
        return (None, None);
    };
    let text_width =
        measurer.measure_text(label, config.label_font_size, &config.label_font_family);
    let width = text_width + config.label_gap_padding * 2.0;
    let height = config.label_height;
    let along = if horizontal { width } else { height };
    let start = total / 2.0 - along / 2.0;
    let end = total / 2.0 + along / 2.0;
    if start < config.label_min_arrow_distance || end > total - config.label_min_arrow_distance {
        return (Some(anchor), None);
    }
    let rect = Rect::new(anchor.0 - width / 2.0, anchor.1 - height / 2.0, width, height);
    (
        Some(anchor),
        Some(LabelGap {
            rect,
            start,
            end,
            path_length: total,
        }),
    )
}

pub(super) fn segment_intersects_rect(a: (f32, f32), b: (f32, f32), rect: &Rect) -> bool {
    let min_x = a.0.min(b.0);
    let max_x = a.0.max(b.0);
    let min_y = a.1.min(b.1);
    let max_y = a.1.max(b.1);
    if max_x < rect.x || min_x > rect.right() || max_y < rect.y || min_y > rect.bottom() {
        return false;
    }
    if rect.contains_point(a) || rect.contains_point(b) {
        return true;
    }
    let corners = [
        (rect.x, rect.y),
        (rect.right(), rect.y),
        (rect.right(), rect.bottom()),
        (rect.x, rect.bottom()),
    ];
    (0..4).any(|idx| segments_intersect(a, b, corners[idx], corners[(idx + 1) % 4]))
}

pub(super) fn segments_intersect(
    a: (f32, f32),
    b: (f32, f32),
    c: (f32, f32),
    d: (f32, f32),
) -> bool {
    fn orient(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
        (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
    }
    fn on_segment(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
        c.0 >= a.0.min(b.0) - 1e-6
            && c.0 <= a.0.max(b.0) + 1e-6
            && c.1 >= a.1.min(b.1) - 1e-6
            && c.1 <= a.1.max(b.1) + 1e-6
    }
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);
    if (o1 > 0.0 && o2 < 0.0 || o1 < 0.0 && o2 > 0.0)
        && (o3 > 0.0 && o4 < 0.0 || o3 < 0.0 && o4 > 0.0)
    {
        return true;
    }
    (o1.abs() <= 1e-6 && on_segment(a, b, c))
        || (o2.abs() <= 1e-6 && on_segment(a, b, d))
        || (o3.abs() <= 1e-6 && on_segment(c, d, a))
        || (o4.abs() <= 1e-6 && on_segment(c, d, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MultiParentPolicy;
    use crate::ir::Graph;
    use crate::layout::types::EdgeKind;
    use crate::text_metrics::FixedWidthMeasurer;

    fn edge(id: &str, source: &str, target: &str, label: Option<&str>) -> PreparedEdge {
        PreparedEdge {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            label: label.map(str::to_string),
            kind: EdgeKind::Simple,
            members: vec![id.to_string()],
            arrow_start: false,
            arrow_end: true,
        }
    }

    fn scene_graph(ids: &[&str]) -> Graph {
        let mut graph = Graph::new();
        for id in ids {
            graph.ensure_node(id, None);
        }
        graph
    }

    #[test]
    fn sides_follow_flow_and_flip_backwards() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(300.0, 20.0, 100.0, 100.0);
        assert_eq!(
            select_sides(&a, &b, Direction::LeftRight),
            (EdgeSide::Right, EdgeSide::Left)
        );
        assert_eq!(
            select_sides(&b, &a, Direction::LeftRight),
            (EdgeSide::Left, EdgeSide::Right)
        );
        let below = Rect::new(10.0, 300.0, 100.0, 100.0);
        assert_eq!(
            select_sides(&a, &below, Direction::TopBottom),
            (EdgeSide::Bottom, EdgeSide::Top)
        );
    }

    #[test]
    fn stacked_boxes_use_cross_axis() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let below = Rect::new(20.0, 300.0, 100.0, 100.0);
        assert_eq!(
            select_sides(&a, &below, Direction::LeftRight),
            (EdgeSide::Bottom, EdgeSide::Top)
        );
    }

    #[test]
    fn boundary_point_lies_on_the_box() {
        let rect = Rect::new(0.0, 0.0, 200.0, 100.0);
        let (point, side) = boundary_point_toward(&rect, (500.0, 50.0));
        assert_eq!(side, EdgeSide::Right);
        assert!((point.0 - 200.0).abs() < 1e-3 && (point.1 - 50.0).abs() < 1e-3);
        let (point, side) = boundary_point_toward(&rect, (100.0, -400.0));
        assert_eq!(side, EdgeSide::Top);
        assert!(point.1.abs() < 1e-3);
    }

    #[test]
    fn fan_offsets_are_symmetric_and_monotonic() {
        let config = RoutingConfig::default();
        for count in 2..8 {
            let offsets = fan_offsets(count, 180.0, &config);
            assert_eq!(offsets.len(), count);
            for pair in offsets.windows(2) {
                assert!(pair[1] > pair[0]);
            }
            for idx in 0..count {
                assert!((offsets[idx] + offsets[count - 1 - idx]).abs() < 1e-4);
            }
            let span = offsets[count - 1] - offsets[0];
            assert!(span <= 180.0 * config.fan_span_ratio + 1e-3);
        }
        assert_eq!(fan_offsets(1, 100.0, &config), vec![0.0]);
    }

    #[test]
    fn compress_removes_collinear_points() {
        let points = [(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 0.0), (10.0, 8.0)];
        assert_eq!(compress_path(&points), vec![(0.0, 0.0), (10.0, 0.0), (10.0, 8.0)]);
    }

    #[test]
    fn fan_out_separates_sibling_edges() {
        let graph = scene_graph(&["a", "b", "c", "d"]);
        let (hierarchy, _) = ClusterHierarchy::build(&graph, MultiParentPolicy::Reject).unwrap();
        let nodes: BTreeMap<String, Rect> = [
            ("a", Rect::new(0.0, 200.0, 160.0, 180.0)),
            ("b", Rect::new(500.0, 0.0, 160.0, 180.0)),
            ("c", Rect::new(500.0, 200.0, 160.0, 180.0)),
            ("d", Rect::new(500.0, 400.0, 160.0, 180.0)),
        ]
        .into_iter()
        .map(|(id, r)| (id.to_string(), r))
        .collect();
        let clusters = BTreeMap::new();
        let scene = RoutingScene {
            nodes: &nodes,
            clusters: &clusters,
            hierarchy: &hierarchy,
            direction: Direction::LeftRight,
        };
        let edges = [
            edge("e1", "a", "b", None),
            edge("e2", "a", "c", None),
            edge("e3", "a", "d", None),
        ];
        let config = RoutingConfig::default();
        let routed = route_edges(&edges, &scene, &config, &FixedWidthMeasurer::default());
        let starts: Vec<f32> = routed.iter().map(|e| e.points[0].1).collect();
        assert!(starts[0] < starts[1] && starts[1] < starts[2]);
        assert!(((starts[0] + starts[2]) / 2.0 - starts[1]).abs() < 1e-3);
        assert!((routed[0].points[0].0 - (160.0 + config.endpoint_offset)).abs() < 1e-3);
    }

    #[test]
    fn blocked_corridor_takes_a_detour() {
        let graph = scene_graph(&["a", "wall", "b"]);
        let (hierarchy, _) = ClusterHierarchy::build(&graph, MultiParentPolicy::Reject).unwrap();
        let nodes: BTreeMap<String, Rect> = [
            ("a", Rect::new(0.0, 0.0, 100.0, 100.0)),
            ("wall", Rect::new(250.0, -20.0, 100.0, 140.0)),
            ("b", Rect::new(500.0, 0.0, 100.0, 100.0)),
        ]
        .into_iter()
        .map(|(id, r)| (id.to_string(), r))
        .collect();
        let clusters = BTreeMap::new();
        let scene = RoutingScene {
            nodes: &nodes,
            clusters: &clusters,
            hierarchy: &hierarchy,
            direction: Direction::LeftRight,
        };
        let config = RoutingConfig::default();
        let routed = route_edges(
            &[edge("e", "a", "b", None)],
            &scene,
            &config,
            &FixedWidthMeasurer::default(),
        );
        let route = &routed[0];
        assert!(route.rerouted);
        let wall = nodes["wall"];
        for seg in route.points.windows(2) {
            assert!(!segment_intersects_rect(seg[0], seg[1], &wall));
        }
        // The upper corridor is tried first.
        assert!(route.points.iter().any(|p| p.1 < wall.y));
    }

    #[test]
    fn label_sits_at_arc_length_midpoint_with_gap() {
        let config = RoutingConfig::default();
        let measurer = FixedWidthMeasurer::default();
        let points = [(0.0, 0.0), (400.0, 0.0)];
        let (anchor, gap) = label_geometry(&points, "HTTPS", &config, &measurer);
        assert_eq!(anchor, Some((200.0, 0.0)));
        let gap = gap.unwrap();
        let expected = measurer.measure_text("HTTPS", config.label_font_size, "")
            + config.label_gap_padding * 2.0;
        assert!((gap.end - gap.start - expected).abs() < 1e-3);
        assert!((gap.start + gap.end - 400.0).abs() < 1e-3);
    }

    #[test]
    fn label_gap_is_skipped_near_arrowheads() {
        let config = RoutingConfig::default();
        let points = [(0.0, 0.0), (60.0, 0.0)];
        let (anchor, gap) = label_geometry(
            &points,
            "a rather long protocol label",
            &config,
            &FixedWidthMeasurer::default(),
        );
        assert!(anchor.is_some());
        assert!(gap.is_none());
    }
}
