use crate::config::{Config, load_config};
use crate::ir::Direction;
use crate::layout::{Layout, compute_layout};
use crate::parser::parse_graph_json;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "archlayout",
    version,
    about = "Hierarchical layout and edge routing for architecture diagrams"
)]
pub struct Args {
    /// Input graph JSON file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Flow direction: LR, TB, RL or BT
    #[arg(short = 'd', long = "direction")]
    pub direction: Option<String>,

    /// Dark styling for SVG output
    #[arg(long = "dark")]
    pub dark: bool,

    /// Palette seed for cluster colours
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Print layout warnings to stderr
    #[arg(long = "warnings")]
    pub warnings: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = apply_overrides(load_config(args.config.as_deref())?, &args)?;

    let input = read_input(args.input.as_deref())?;
    let graph = parse_graph_json(&input)?;
    let layout = compute_layout(&graph, &config.layout)?;

    if args.warnings {
        report_warnings(&layout);
    }

    let output = match args.output_format {
        OutputFormat::Svg => render_svg(&layout, &config.theme(), &config.render),
        OutputFormat::Json => serde_json::to_string_pretty(&layout)?,
    };
    write_output_svg(&output, args.output.as_deref())?;
    Ok(())
}

fn apply_overrides(mut config: Config, args: &Args) -> Result<Config> {
    if let Some(token) = args.direction.as_deref() {
        config.layout.direction = Direction::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("unknown direction `{token}` (expected LR, TB, RL or BT)"))?;
    }
    if args.dark {
        config.render.dark_mode = true;
    }
    if let Some(seed) = args.seed {
        config.render.seed = seed;
    }
    Ok(config)
}

fn report_warnings(layout: &Layout) {
    for warning in &layout.warnings {
        match serde_json::to_string(warning) {
            Ok(text) => eprintln!("warning: {text}"),
            Err(_) => eprintln!("warning: {warning:?}"),
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
