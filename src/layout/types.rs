use std::collections::BTreeMap;

use serde::Serialize;

use crate::ir::Direction;

/// Axis-aligned box; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn inflate(&self, pad: f32) -> Self {
        Self::new(
            self.x - pad,
            self.y - pad,
            self.width + pad * 2.0,
            self.height + pad * 2.0,
        )
    }

    /// Signed overlap along x; negative values are the gap between the boxes.
    pub fn overlap_x(&self, other: &Rect) -> f32 {
        self.right().min(other.right()) - self.x.max(other.x)
    }

    /// Signed overlap along y; negative values are the gap between the boxes.
    pub fn overlap_y(&self, other: &Rect) -> f32 {
        self.bottom().min(other.bottom()) - self.y.max(other.y)
    }

    pub fn contains_rect(&self, other: &Rect, tolerance: f32) -> bool {
        other.x >= self.x - tolerance
            && other.y >= self.y - tolerance
            && other.right() <= self.right() + tolerance
            && other.bottom() <= self.bottom() + tolerance
    }

    pub fn contains_point(&self, point: (f32, f32)) -> bool {
        point.0 >= self.x && point.0 <= self.right() && point.1 >= self.y && point.1 <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeLayout {
    pub id: String,
    pub label: String,
    pub icon_url: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Immediate enclosing cluster, if any.
    pub cluster: Option<String>,
}

impl NodeLayout {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterLayout {
    pub id: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub depth: usize,
    pub parent: Option<String>,
    pub padding: f32,
    /// No direct leaves and no child clusters; rendered as a placeholder.
    pub empty: bool,
}

impl ClusterLayout {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EdgeSide {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeKind {
    Simple,
    /// Reciprocal pair rendered as one line with arrowheads at both ends.
    Bidirectional,
    /// Parallel leaf edges collapsed onto a cluster endpoint.
    Aggregated,
}

/// Cut-out along the path where the label is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelGap {
    pub rect: Rect,
    /// Arc-length position where the gap starts.
    pub start: f32,
    /// Arc-length position where the gap ends.
    pub end: f32,
    pub path_length: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeLayout {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: Option<String>,
    pub kind: EdgeKind,
    /// Ids of the input edges this edge stands for.
    pub members: Vec<String>,
    pub points: Vec<(f32, f32)>,
    pub arrow_start: bool,
    pub arrow_end: bool,
    pub source_side: EdgeSide,
    pub target_side: EdgeSide,
    pub label_anchor: Option<(f32, f32)>,
    pub label_gap: Option<LabelGap>,
    /// The straight corridor was blocked and a detour was taken.
    pub rerouted: bool,
}

/// Non-fatal conditions that degrade the drawing without aborting the layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutWarning {
    DroppedEdge { edge: String, missing: String },
    SelfLoop { edge: String },
    MissingPosition { id: String },
    ResidualOverlap { first: String, second: String },
    UnknownClusterMember { cluster: String, member: String },
    UnknownParent { cluster: String, parent: String },
    DuplicateMembership { node: String, kept: String, ignored: String },
    ExtraParentsIgnored { cluster: String, kept: String, ignored: Vec<String> },
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub direction: Direction,
    pub nodes: BTreeMap<String, NodeLayout>,
    /// Parents before children.
    pub clusters: Vec<ClusterLayout>,
    pub edges: Vec<EdgeLayout>,
    /// `parent -> child -> (x, y)` relative to the parent's local origin.
    pub relative_positions: BTreeMap<String, BTreeMap<String, (f32, f32)>>,
    pub width: f32,
    pub height: f32,
    pub warnings: Vec<LayoutWarning>,
}

impl Layout {
    pub fn cluster(&self, id: &str) -> Option<&ClusterLayout> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }

    /// Bounding box of every node and cluster.
    pub fn bounds(&self) -> Option<Rect> {
        self.nodes
            .values()
            .map(NodeLayout::rect)
            .chain(self.clusters.iter().map(ClusterLayout::rect))
            .reduce(|acc, rect| acc.union(&rect))
    }
}
