use crate::ir::Direction;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Config {
    pub fn theme(&self) -> Theme {
        Theme::for_mode(self.render.dark_mode)
    }
}

/// What to do with a cluster that lists more than one parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiParentPolicy {
    /// Fail the layout with `LayoutError::MultipleParents`.
    #[default]
    Reject,
    /// Keep the first listed parent and record a warning.
    First,
}

/// Linear spacing model clamped to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingRule {
    pub min: f32,
    pub base: f32,
    pub per_depth: f32,
    pub per_item: f32,
    pub per_edge: f32,
    pub per_size: f32,
    pub max: f32,
}

impl Default for SpacingRule {
    fn default() -> Self {
        Self {
            min: 0.0,
            base: 0.0,
            per_depth: 0.0,
            per_item: 0.0,
            per_edge: 0.0,
            per_size: 0.0,
            max: f32::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpacingInput {
    pub depth: usize,
    pub items: usize,
    pub edges: usize,
    pub average_size: f32,
}

impl SpacingRule {
    pub fn resolve(&self, input: SpacingInput) -> f32 {
        let raw = self.base
            + self.per_depth * input.depth as f32
            + self.per_item * input.items as f32
            + self.per_edge * input.edges as f32
            + self.per_size * input.average_size;
        raw.clamp(self.min, self.max.max(self.min))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingPair {
    pub node: SpacingRule,
    pub rank: SpacingRule,
}

impl SpacingPair {
    fn cluster_default() -> Self {
        Self {
            node: SpacingRule {
                min: 200.0,
                base: 180.0,
                per_depth: 20.0,
                per_item: 4.0,
                per_edge: 3.0,
                max: 320.0,
                ..SpacingRule::default()
            },
            rank: SpacingRule {
                min: 280.0,
                base: 240.0,
                per_depth: 30.0,
                per_item: 4.0,
                per_edge: 4.0,
                max: 420.0,
                ..SpacingRule::default()
            },
        }
    }

    fn block_default() -> Self {
        Self {
            node: SpacingRule {
                min: 300.0,
                base: 250.0,
                per_size: 0.3,
                max: 500.0,
                ..SpacingRule::default()
            },
            rank: SpacingRule {
                min: 380.0,
                base: 320.0,
                per_size: 0.4,
                max: 600.0,
                ..SpacingRule::default()
            },
        }
    }
}

impl Default for SpacingPair {
    fn default() -> Self {
        Self::cluster_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub iterations: usize,
    pub gap_ratio: f32,
    pub min_gap: f32,
    pub max_gap: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            gap_ratio: 0.15,
            min_gap: 60.0,
            max_gap: 200.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Distance between a node boundary and the first path point.
    pub endpoint_offset: f32,
    /// Separation per sibling between fanned-out edges.
    pub fan_spacing: f32,
    /// Fraction of a side the whole fan may occupy.
    pub fan_span_ratio: f32,
    pub obstacle_clearance: f32,
    pub corridor_margin: f32,
    pub label_font_size: f32,
    pub label_font_family: String,
    pub label_height: f32,
    pub label_gap_padding: f32,
    pub label_min_arrow_distance: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            endpoint_offset: 6.0,
            fan_spacing: 14.0,
            fan_span_ratio: 0.8,
            obstacle_clearance: 16.0,
            corridor_margin: 30.0,
            label_font_size: 14.0,
            label_font_family: "Inter, system-ui, sans-serif".to_string(),
            label_height: 26.0,
            label_gap_padding: 8.0,
            label_min_arrow_distance: 24.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub direction: Direction,
    pub node_width: f32,
    pub node_height: f32,
    /// Overrides the derived in-cluster node separation when set.
    pub node_separation: Option<f32>,
    /// Overrides the derived in-cluster rank separation when set.
    pub rank_separation: Option<f32>,
    pub edge_separation: f32,
    pub margin_x: f32,
    pub margin_y: f32,
    pub child_cluster_gap: f32,
    pub top_level_separation: f32,
    pub singleton_margin: f32,
    pub padding_min: f32,
    pub padding_max: f32,
    pub cluster_padding: BTreeMap<String, f32>,
    pub multi_parent: MultiParentPolicy,
    pub cluster_spacing: SpacingPair,
    pub block_spacing: SpacingPair,
    pub collision: CollisionConfig,
    pub routing: RoutingConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::LeftRight,
            node_width: 160.0,
            node_height: 180.0,
            node_separation: None,
            rank_separation: None,
            edge_separation: 20.0,
            margin_x: 20.0,
            margin_y: 20.0,
            child_cluster_gap: 40.0,
            top_level_separation: 80.0,
            singleton_margin: 80.0,
            padding_min: 60.0,
            padding_max: 400.0,
            cluster_padding: BTreeMap::new(),
            multi_parent: MultiParentPolicy::Reject,
            cluster_spacing: SpacingPair::cluster_default(),
            block_spacing: SpacingPair::block_default(),
            collision: CollisionConfig::default(),
            routing: RoutingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub dark_mode: bool,
    /// Varies the cluster palette between sessions; layout geometry ignores it.
    pub seed: u64,
    pub canvas_padding: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dark_mode: false,
            seed: 0,
            canvas_padding: 40.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    direction: Option<String>,
    node_separation: Option<f32>,
    rank_separation: Option<f32>,
    edge_separation: Option<f32>,
    margin_x: Option<f32>,
    margin_y: Option<f32>,
    node_width: Option<f32>,
    node_height: Option<f32>,
    padding: Option<BTreeMap<String, f32>>,
    multi_parent: Option<MultiParentPolicy>,
    dark_mode: Option<bool>,
    seed: Option<u64>,
    collision: Option<CollisionConfig>,
    routing: Option<RoutingConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 config document and merges it over the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(token) = parsed.direction.as_deref() {
        config.layout.direction = Direction::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("unknown direction `{token}` (expected LR, TB, RL or BT)"))?;
    }
    if parsed.node_separation.is_some() {
        config.layout.node_separation = parsed.node_separation;
    }
    if parsed.rank_separation.is_some() {
        config.layout.rank_separation = parsed.rank_separation;
    }
    if let Some(v) = parsed.edge_separation {
        config.layout.edge_separation = v;
    }
    if let Some(v) = parsed.margin_x {
        config.layout.margin_x = v;
    }
    if let Some(v) = parsed.margin_y {
        config.layout.margin_y = v;
    }
    if let Some(v) = parsed.node_width {
        config.layout.node_width = v;
    }
    if let Some(v) = parsed.node_height {
        config.layout.node_height = v;
    }
    if let Some(v) = parsed.padding {
        config.layout.cluster_padding = v;
    }
    if let Some(v) = parsed.multi_parent {
        config.layout.multi_parent = v;
    }
    if let Some(v) = parsed.dark_mode {
        config.render.dark_mode = v;
    }
    if let Some(v) = parsed.seed {
        config.render.seed = v;
    }
    if let Some(v) = parsed.collision {
        config.layout.collision = v;
    }
    if let Some(v) = parsed.routing {
        config.layout.routing = v;
    }

    Ok(config)
}
