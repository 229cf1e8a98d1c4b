use archlayout::{Config, FixedWidthMeasurer, Layout, compute_layout_with, parse_config, parse_graph_json, render_svg};
use wasm_bindgen::prelude::*;

fn to_js(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Options use the same camelCase keys as the CLI config file.
fn load_options(options_json: Option<String>) -> Result<Config, JsValue> {
    match options_json {
        Some(raw) if !raw.trim().is_empty() => parse_config(&raw).map_err(to_js),
        _ => Ok(Config::default()),
    }
}

// Browsers expose no system font database, so labels use the fixed-width estimate.
fn layout(graph_json: &str, config: &Config) -> Result<Layout, JsValue> {
    let graph = parse_graph_json(graph_json).map_err(to_js)?;
    compute_layout_with(&graph, &config.layout, &FixedWidthMeasurer::default()).map_err(to_js)
}

#[wasm_bindgen]
pub fn layout_diagram_json(graph_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = load_options(options_json)?;
    let layout = layout(graph_json, &config)?;
    serde_json::to_string(&layout).map_err(to_js)
}

#[wasm_bindgen]
pub fn render_diagram_svg(graph_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = load_options(options_json)?;
    let layout = layout(graph_json, &config)?;
    Ok(render_svg(&layout, &config.theme(), &config.render))
}
