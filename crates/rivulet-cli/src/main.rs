//! CLI binary for inspecting and validating Rivulet pipeline snapshots.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use rivulet_graph::{
    BuilderDefaults, MixerOptions, PipelineState, RssOptions, Snapshot, StreamBuilder,
};
use rivulet_types::StreamId;

#[derive(Parser)]
#[command(name = "rivulet", version, about = "Stream graph tools for personal content pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with builder defaults
    #[arg(long, global = true)]
    defaults: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a pipeline snapshot
    Validate {
        /// Path to the snapshot .json file
        snapshot: PathBuf,
    },

    /// Print the execution order of a pipeline snapshot
    Order {
        /// Path to the snapshot .json file
        snapshot: PathBuf,
    },

    /// Show the upstream and downstream streams of one stream
    Lineage {
        /// Path to the snapshot .json file
        snapshot: PathBuf,

        /// Stream id to inspect
        id: String,
    },

    /// Show information about a pipeline snapshot
    Info {
        /// Path to the snapshot .json file
        snapshot: PathBuf,
    },

    /// Write a sample pipeline snapshot (feed -> mixer -> limiter)
    Demo {
        /// Output file path (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate { snapshot } => {
            cmd_validate(&snapshot)?;
        }
        Commands::Order { snapshot } => {
            cmd_order(&snapshot)?;
        }
        Commands::Lineage { snapshot, id } => {
            cmd_lineage(&snapshot, &id)?;
        }
        Commands::Info { snapshot } => {
            cmd_info(&snapshot)?;
        }
        Commands::Demo { output } => {
            let defaults = load_defaults(cli.defaults.as_deref())?;
            cmd_demo(defaults, output.as_deref())?;
        }
    }

    Ok(())
}

fn load_pipeline(path: &Path) -> anyhow::Result<PipelineState> {
    let snapshot = Snapshot::load(path)?
        .with_context(|| format!("no snapshot found at {}", path.display()))?;
    Ok(PipelineState::from_snapshot(snapshot)?)
}

fn load_defaults(path: Option<&Path>) -> anyhow::Result<BuilderDefaults> {
    let Some(path) = path else {
        return Ok(BuilderDefaults::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read defaults from {}", path.display()))?;
    let defaults = serde_json::from_str(&json)
        .with_context(|| format!("invalid defaults file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Loaded builder defaults");
    Ok(defaults)
}

fn cmd_validate(path: &Path) -> anyhow::Result<()> {
    let state = load_pipeline(path)?;
    let result = state.validate();

    if result.errors.is_empty() && result.warnings.is_empty() {
        println!("Pipeline is valid");
        return Ok(());
    }

    for err in &result.errors {
        println!("[ERROR] {}: {}", kind_name(&err.kind), err.message);
    }
    for warn in &result.warnings {
        println!("[WARN] {}: {}", kind_name(&warn.kind), warn.message);
    }

    if !result.is_valid {
        std::process::exit(1);
    }
    Ok(())
}

/// Snake-case name of a finding kind, as it appears in serialized results.
fn kind_name<T: serde::Serialize>(kind: &T) -> String {
    match serde_json::to_value(kind) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::from("unknown"),
    }
}

fn cmd_order(path: &Path) -> anyhow::Result<()> {
    let state = load_pipeline(path)?;
    let order = state.topological_order().into_complete()?;

    for (i, id) in order.iter().enumerate() {
        println!("{:>3}. {}", i + 1, describe(&state, id));
    }
    Ok(())
}

fn cmd_lineage(path: &Path, id: &str) -> anyhow::Result<()> {
    let state = load_pipeline(path)?;
    let id = StreamId::from(id);
    if state.stream(&id).is_none() {
        anyhow::bail!("unknown stream '{id}'");
    }

    println!("Stream: {}", describe(&state, &id));
    println!("\nUpstream:");
    for up in state.upstream_of(&id) {
        println!("  {}", describe(&state, &up));
    }
    println!("\nDownstream:");
    for down in state.downstream_of(&id) {
        println!("  {}", describe(&state, &down));
    }
    Ok(())
}

fn cmd_info(path: &Path) -> anyhow::Result<()> {
    let state = load_pipeline(path)?;

    println!("Streams: {}", state.registry().len());
    println!("Sources: {}", state.sources().count());
    println!("Transforms: {}", state.transforms().count());
    println!("Edges: {}", state.graph().all_edges().len());
    if let Some(output) = state.output_stream() {
        println!("Output: {} ({})", output.id, output.name);
    }

    println!("\nStreams:");
    for stream in state.registry().iter() {
        let inputs: Vec<&str> = stream.input_ids().iter().map(StreamId::as_str).collect();
        if inputs.is_empty() {
            println!("  {} [{}] type={}", stream.id, stream.name, stream.type_name());
        } else {
            println!(
                "  {} [{}] type={} inputs={}",
                stream.id,
                stream.name,
                stream.type_name(),
                inputs.join(",")
            );
        }
    }

    Ok(())
}

fn describe(state: &PipelineState, id: &StreamId) -> String {
    match state.stream(id) {
        Some(stream) => format!("{} ({}, {})", id, stream.name, stream.type_name()),
        None => format!("{id} (unregistered)"),
    }
}

/// Feed -> Mixer -> Limiter, with the limiter as output.
fn build_demo(defaults: BuilderDefaults) -> anyhow::Result<PipelineState> {
    let builder = StreamBuilder::new(defaults);
    let feed = builder.create_rss_source(
        "Hacker News",
        "https://news.ycombinator.com/rss",
        RssOptions::default(),
    )?;
    let mixer = builder.create_mixer("Morning Mix", vec![feed.id.clone()], MixerOptions::default())?;
    let limiter = builder.create_limiter("Top 5", mixer.id.clone(), 5, None)?;
    let output = limiter.id.clone();

    let mut state = PipelineState::new();
    state.add_stream(feed)?;
    state.add_stream(mixer)?;
    state.add_stream(limiter)?;
    state.set_output(Some(output))?;
    Ok(state)
}

fn cmd_demo(defaults: BuilderDefaults, output: Option<&Path>) -> anyhow::Result<()> {
    let snapshot = build_demo(defaults)?.snapshot();
    match output {
        Some(path) => {
            snapshot.save(path)?;
            println!("Wrote demo pipeline to {}", path.display());
        }
        None => println!("{}", snapshot.to_json()?),
    }
    Ok(())
}
