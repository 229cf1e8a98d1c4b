#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod parser;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, MultiParentPolicy, RenderConfig, load_config, parse_config};
pub use ir::{Cluster, Direction, Graph, GraphEdge, GraphNode};
pub use layout::{Layout, LayoutError, LayoutWarning, compute_layout, compute_layout_with};
pub use parser::{ParseError, parse_graph_json};
pub use render::render_svg;
pub use text_metrics::{FixedWidthMeasurer, FontTextMeasurer, TextMeasurer};
pub use theme::Theme;

/// Parses graph JSON and lays it out.
pub fn layout_json(input: &str, config: &Config) -> anyhow::Result<Layout> {
    let graph = parse_graph_json(input)?;
    Ok(compute_layout(&graph, &config.layout)?)
}

/// Parses graph JSON, lays it out and renders SVG.
pub fn render_svg_from_json(input: &str, config: &Config) -> anyhow::Result<String> {
    let layout = layout_json(input, config)?;
    Ok(render_svg(&layout, &config.theme(), &config.render))
}
