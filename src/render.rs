use crate::config::RenderConfig;
use crate::layout::{ClusterLayout, EdgeLayout, Layout, NodeLayout};
use crate::theme::{Theme, palette_index};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

const ICON_SIZE: f32 = 64.0;
const CLUSTER_LABEL_INSET: f32 = 14.0;

pub fn render_svg(layout: &Layout, theme: &Theme, config: &RenderConfig) -> String {
    let mut svg = String::new();
    let pad = config.canvas_padding.max(0.0);
    let width = layout.width + pad * 2.0;
    let height = layout.height + pad * 2.0;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow-end\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"7\" markerHeight=\"7\" orient=\"auto\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.edge_color
    ));
    svg.push_str(&format!(
        "<marker id=\"arrow-start\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"7\" markerHeight=\"7\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.edge_color
    ));
    svg.push_str("</defs>");
    svg.push_str(&format!("<g transform=\"translate({pad:.2} {pad:.2})\">"));

    let colors = cluster_colors(&layout.clusters, theme, config.seed);
    for cluster in &layout.clusters {
        svg.push_str(&cluster_svg(cluster, colors.get(cluster.id.as_str()).copied(), theme));
    }
    for edge in &layout.edges {
        svg.push_str(&edge_svg(edge, theme));
    }
    for node in layout.nodes.values() {
        svg.push_str(&node_svg(node, theme));
    }

    svg.push_str("</g></svg>");
    svg
}

/// Palette slot per cluster; parents are visited first so children can avoid
/// their parent's colour.
fn cluster_colors<'a>(
    clusters: &'a [ClusterLayout],
    theme: &Theme,
    seed: u64,
) -> BTreeMap<&'a str, usize> {
    let mut colors: BTreeMap<&str, usize> = BTreeMap::new();
    let len = theme.cluster_palette.len();
    for cluster in clusters {
        let parent_index = cluster
            .parent
            .as_deref()
            .and_then(|parent| colors.get(parent).copied());
        let index = palette_index(&cluster.id, cluster.depth, parent_index, len, seed);
        colors.insert(cluster.id.as_str(), index);
    }
    colors
}

fn cluster_svg(cluster: &ClusterLayout, color: Option<usize>, theme: &Theme) -> String {
    let palette = color.and_then(|idx| theme.cluster_color(idx));
    let (border, tint) = match palette {
        Some(c) => (c.border.as_str(), c.tint.as_str()),
        None => (theme.node_border.as_str(), theme.empty_cluster_tint.as_str()),
    };
    let fill = if cluster.empty {
        theme.empty_cluster_tint.as_str()
    } else {
        tint
    };
    let dash = if cluster.empty {
        " stroke-dasharray=\"8 6\""
    } else {
        ""
    };
    let mut out = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"12\" ry=\"12\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\"{}/>",
        cluster.x, cluster.y, cluster.width, cluster.height, fill, border, dash
    );
    out.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
        cluster.x + CLUSTER_LABEL_INSET,
        cluster.y + CLUSTER_LABEL_INSET + theme.cluster_font_size,
        theme.font_family,
        theme.cluster_font_size,
        border,
        escape_xml(&cluster.label)
    ));
    out
}

fn edge_svg(edge: &EdgeLayout, theme: &Theme) -> String {
    let d = points_to_path(&edge.points);
    let mut attrs = String::new();
    if edge.arrow_end {
        attrs.push_str(" marker-end=\"url(#arrow-end)\"");
    }
    if edge.arrow_start {
        attrs.push_str(" marker-start=\"url(#arrow-start)\"");
    }
    if let Some(gap) = &edge.label_gap {
        let tail = (gap.path_length - gap.end).max(0.0);
        attrs.push_str(&format!(
            " stroke-dasharray=\"{:.2} {:.2} {:.2}\"",
            gap.start,
            gap.end - gap.start,
            tail
        ));
    }
    let mut out = format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.6\"{} />",
        d, theme.edge_color, attrs
    );

    if let (Some(label), Some((x, y))) = (edge.label.as_deref(), edge.label_anchor) {
        if edge.label_gap.is_none() {
            // No cut-out: keep the text legible over the line.
            let w = label.chars().count() as f32 * theme.font_size * 0.6 + 8.0;
            let h = theme.font_size + 8.0;
            out.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{}\"/>",
                x - w / 2.0,
                y - h / 2.0,
                theme.background
            ));
        }
        out.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            y + theme.font_size * 0.35,
            theme.font_family,
            theme.font_size,
            theme.edge_label_color,
            escape_xml(label)
        ));
    }
    out
}

fn node_svg(node: &NodeLayout, theme: &Theme) -> String {
    let mut out = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"10\" ry=\"10\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
        node.x, node.y, node.width, node.height, theme.node_fill, theme.node_border
    );
    let center_x = node.x + node.width / 2.0;
    let label_y = match node.icon_url.as_deref() {
        Some(href) => {
            let icon_y = node.y + node.height * 0.25;
            out.push_str(&format!(
                "<image href=\"{}\" x=\"{:.2}\" y=\"{:.2}\" width=\"{ICON_SIZE}\" height=\"{ICON_SIZE}\"/>",
                escape_xml(href),
                center_x - ICON_SIZE / 2.0,
                icon_y
            ));
            icon_y + ICON_SIZE + theme.node_font_size * 1.5
        }
        None => node.y + node.height / 2.0 + theme.node_font_size * 0.35,
    };
    out.push_str(&format!(
        "<text x=\"{center_x:.2}\" y=\"{label_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        theme.font_family,
        theme.node_font_size,
        theme.text_color,
        escape_xml(&node.label)
    ));
    out
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::Graph;
    use crate::layout::compute_layout_with;
    use crate::text_metrics::FixedWidthMeasurer;

    fn sample_layout() -> Layout {
        let mut graph = Graph::new();
        graph.ensure_node("A", Some("Alpha & Co"));
        graph.ensure_node("B", Some("Beta"));
        graph.add_cluster("vpc", "VPC", &["B"], None);
        graph.add_edge("A", "B", Some("go"));
        graph.add_edge("B", "A", Some("back"));
        compute_layout_with(&graph, &LayoutConfig::default(), &FixedWidthMeasurer::default())
            .unwrap()
    }

    #[test]
    fn render_svg_basic() {
        let layout = sample_layout();
        let svg = render_svg(&layout, &Theme::light(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Alpha &amp; Co"));
        assert!(svg.contains(">VPC</text>"));
        assert!(svg.contains("marker-start=\"url(#arrow-start)\""));
        assert!(svg.contains("go / back"));
    }

    #[test]
    fn dark_mode_changes_background_only() {
        let layout = sample_layout();
        let light = render_svg(&layout, &Theme::light(), &RenderConfig::default());
        let dark = render_svg(&layout, &Theme::dark(), &RenderConfig::default());
        assert_ne!(light, dark);
        assert!(dark.contains(&Theme::dark().background));
    }

    #[test]
    fn rendering_is_deterministic() {
        let layout = sample_layout();
        let config = RenderConfig {
            seed: 42,
            ..RenderConfig::default()
        };
        assert_eq!(
            render_svg(&layout, &Theme::light(), &config),
            render_svg(&layout, &Theme::light(), &config)
        );
    }

    #[test]
    fn child_cluster_color_differs_from_parent() {
        let clusters = vec![
            ClusterLayout {
                id: "outer".to_string(),
                label: "Outer".to_string(),
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 100.0,
                depth: 0,
                parent: None,
                padding: 60.0,
                empty: false,
            },
            ClusterLayout {
                id: "inner".to_string(),
                label: "Inner".to_string(),
                x: 10.0,
                y: 10.0,
                width: 50.0,
                height: 50.0,
                depth: 1,
                parent: Some("outer".to_string()),
                padding: 60.0,
                empty: true,
            },
        ];
        let theme = Theme::light();
        for seed in 0..16 {
            let colors = cluster_colors(&clusters, &theme, seed);
            assert_ne!(colors["outer"], colors["inner"]);
        }
    }
}
