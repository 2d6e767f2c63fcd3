// SPDX-License-Identifier: MIT OR Apache-2.0
//! Terrain Engine command line
//!
//! Loads a terrain graph (or builds a demo or mountain preset), executes it
//! and optionally saves the graph or exports the result as PNG.
//!
//! ```text
//! terrain_engine [--config PATH] [--demo | --preset NAME | GRAPH.json] [--save PATH] [--export PNG]
//! ```

use std::path::PathBuf;
use terrain_engine_editor::{
    export_artifact, EditorConfig, EditorSession, GraphCommand, MountainPreset, CONFIG_FILE_NAME,
};
use terrain_engine_graph::{Artifact, INPUT_PIN, OUTPUT_PIN};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error>;

const USAGE: &str =
    "Usage: terrain_engine [--config PATH] [--demo | --preset NAME | GRAPH.json] [--save PATH] [--export PNG]";

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    graph: Option<PathBuf>,
    demo: bool,
    preset: Option<MountainPreset>,
    save: Option<PathBuf>,
    export: Option<PathBuf>,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let mut args = Self::default();
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| iter.next().map(PathBuf::from).ok_or_else(|| format!("{flag} requires a path"));
            match arg.as_str() {
                "--config" => args.config = Some(value("--config")?),
                "--save" => args.save = Some(value("--save")?),
                "--export" => args.export = Some(value("--export")?),
                "--demo" => args.demo = true,
                "--preset" => {
                    let name = iter.next().ok_or("--preset requires a name")?;
                    args.preset = Some(MountainPreset::from_name(&name).ok_or_else(|| {
                        let known: Vec<_> = MountainPreset::ALL.iter().map(|p| p.name()).collect();
                        format!("Unknown preset '{name}', expected one of: {}", known.join(", "))
                    })?);
                }
                flag if flag.starts_with("--") => return Err(format!("Unknown option: {flag}")),
                path => {
                    if args.graph.replace(PathBuf::from(path)).is_some() {
                        return Err("Only one graph file may be given".to_string());
                    }
                }
            }
        }
        if args.graph.is_some() && args.preset.is_some() {
            return Err("--preset cannot be combined with a graph file".to_string());
        }
        if args.graph.is_none() && args.preset.is_none() {
            args.demo = true;
        }
        Ok(args)
    }
}

fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    let config_path = args.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let config = match EditorConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    init_tracing(&config);
    tracing::info!("Starting Terrain Engine v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, &config) {
        tracing::error!("Terrain Engine failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(config: &EditorConfig) {
    let directive = config.log_filter.as_deref().unwrap_or("terrain_engine_editor=debug");
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for part in directive.split(',').filter(|part| !part.trim().is_empty()) {
        match part.trim().parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring log filter directive '{part}': {e}"),
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(args: &Args, config: &EditorConfig) -> Result<(), BoxError> {
    let mut session = EditorSession::new(config);

    match &args.graph {
        Some(path) => {
            let report = session.load(path)?;
            tracing::info!(
                "Loaded {} nodes and {} connections from {}",
                report.nodes_loaded,
                report.connections_loaded,
                path.display()
            );
            for skipped in &report.skipped {
                tracing::warn!("Skipped while loading: {skipped}");
            }
        }
        None => {
            if let Some(preset) = args.preset {
                let output = preset.build(&mut session, config.default_resolution)?;
                tracing::debug!("{preset}: {}", preset.description());
                tracing::debug!("Terminal node: {output}");
            } else if args.demo {
                build_demo(&mut session, config.default_resolution)?;
            }
        }
    }

    if config.execute_on_load || args.export.is_some() {
        session.execute()?;
        match session.result() {
            Some(artifact) => {
                log_result(&artifact);
                if let Some(path) = &args.export {
                    export_artifact(&artifact, path)?;
                    tracing::info!("Exported result to {}", path.display());
                }
            }
            None => tracing::warn!("Graph produced no result"),
        }
    }

    if let Some(path) = &args.save {
        session.save(path)?;
    }
    Ok(())
}

/// Perlin noise, terraced, rescaled into an output node
fn build_demo(session: &mut EditorSession, resolution: u32) -> Result<(), BoxError> {
    let noise = session.create_node("PerlinNoise", [0.0, 0.0])?;
    session.apply(GraphCommand::set_int(noise, "width", i64::from(resolution)))?;
    session.apply(GraphCommand::set_int(noise, "height", i64::from(resolution)))?;
    session.apply(GraphCommand::set_int(noise, "seed", 1337))?;

    let terrace = session.create_node("Terrace", [250.0, 0.0])?;
    let scale = session.create_node("Scale", [500.0, 0.0])?;
    session.apply(GraphCommand::set_float(scale, "scale", 0.5))?;
    session.apply(GraphCommand::set_float(scale, "bias", 0.5))?;
    let output = session.create_node("Output", [750.0, 0.0])?;

    for (from, to) in [(noise, terrace), (terrace, scale), (scale, output)] {
        session.connect(from, OUTPUT_PIN, to, INPUT_PIN)?;
    }

    tracing::info!(
        "Built demo graph with {} nodes at {resolution}x{resolution}",
        session.graph().node_count()
    );
    tracing::debug!("Terminal node: {output}");
    Ok(())
}

fn log_result(artifact: &Artifact) {
    let (width, height) = artifact.dimensions();
    match artifact {
        Artifact::Heightfield(field) => tracing::info!(
            "Result: {width}x{height} heightfield, range [{:.4}, {:.4}]",
            field.min(),
            field.max()
        ),
        Artifact::Image(_) => tracing::info!("Result: {width}x{height} image"),
    }
}
