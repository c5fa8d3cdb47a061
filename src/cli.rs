use crate::config::load_config;
use crate::ir::{Filters, PersistedPositions, Snapshot, load_positions};
use crate::layout::compute_layout;
use crate::layout_dump::{layout_json, write_layout_dump, write_positions};
use crate::render::{render_svg, write_output_png, write_output_svg};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "netdoc-topo",
    version,
    about = "Lay out and render a network topology snapshot"
)]
pub struct Args {
    /// Snapshot JSON file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Saved node positions to reuse
    #[arg(long = "positions")]
    pub positions: Option<PathBuf>,

    /// Write the resulting node positions here
    #[arg(long = "save-positions")]
    pub save_positions: Option<PathBuf>,

    /// Only show devices of this type
    #[arg(long = "device-type")]
    pub device_type: Option<String>,

    /// Only show devices in this category (IT, OT, ...)
    #[arg(long = "category")]
    pub category: Option<String>,

    /// Only show devices in this network range type
    #[arg(long = "network-range")]
    pub network_range: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

impl Args {
    pub fn filters(&self) -> Filters {
        Filters {
            device_type: self.device_type.clone(),
            category: self.category.clone(),
            network_range_type: self.network_range.clone(),
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    execute(&args)
}

pub fn execute(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref()).context("failed to load config")?;
    let snapshot = read_snapshot(args.input.as_deref())?;
    let persisted = match args.positions.as_deref() {
        Some(path) => load_positions(path)?,
        None => PersistedPositions::new(),
    };

    let filters = args.filters();
    if !filters.is_empty() {
        tracing::info!(?filters, "applying display filters");
    }

    let layout = compute_layout(
        &snapshot,
        &filters,
        &persisted,
        &config.theme,
        &config.layout,
    );
    tracing::info!(
        devices = snapshot.devices.len(),
        connections = snapshot.connections.len(),
        nodes = layout.nodes.len(),
        edges = layout.edges.len(),
        diagnostics = layout.diagnostics.len(),
        "layout computed"
    );

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &config.theme, &config.layout);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&layout, &config.theme, &config.layout);
            write_output_png(&svg, &output, &config.render)?;
        }
        OutputFormat::Json => match args.output.as_deref() {
            Some(path) => write_layout_dump(path, &layout)?,
            None => println!("{}", layout_json(&layout)?),
        },
    }

    if let Some(path) = args.save_positions.as_deref() {
        write_positions(path, &layout)
            .with_context(|| format!("failed to save positions to {}", path.display()))?;
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn read_snapshot(path: Option<&Path>) -> Result<Snapshot> {
    match path {
        Some(path) if path != Path::new("-") => Ok(Snapshot::from_path(path)?),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(Snapshot::from_json_str(&buf)?)
        }
    }
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
