//! Apnea pipeline CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use apnea_cli::{pipeline, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Segment(args) => pipeline::segment(&args)?,
        Commands::Label(args) => pipeline::label(&args)?,
        Commands::Batch(args) => pipeline::batch(&args)?,
        Commands::Consolidate(args) => pipeline::consolidate(&args)?,
    }

    Ok(())
}
