//! rulebook - resolve a scenario and print the resulting object state

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use rulebook::{DocumentExt, EngineConfig, Scenario};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rules resolution scenario runner
#[derive(Parser, Debug)]
#[command(name = "rulebook", version, about = "Resolve a rulebook scenario")]
struct Args {
    /// Scenario document (JSON)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Engine configuration (TOML); RULEBOOK_* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print only the part of the final state at this path (e.g. `objects[0].health`)
    #[arg(short, long)]
    query: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rulebook=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(args.json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!args.json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let config = EngineConfig::load(args.config.as_deref()).context("loading configuration")?;
    let scenario = Scenario::from_file(&args.scenario)?;
    let mut encounter = scenario.load()?;
    let resolved = encounter.run(&config, &scenario.subevents)?;
    info!(steps = resolved.len(), "scenario resolved");

    let state = encounter.state()?;
    let output = match &args.query {
        Some(path) => state
            .seek(path)
            .with_context(|| format!("querying {}", path))?
            .to_canonical_string(),
        None => state.to_canonical_string(),
    };
    println!("{}", output);
    Ok(())
}
