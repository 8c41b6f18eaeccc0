//! Command-line surface for the apnea detection pipeline.

use clap::{Parser, Subcommand};

pub mod pipeline;

pub use pipeline::{BatchArgs, ConsolidateArgs, LabelArgs, SegmentArgs};

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "apnea", about = "ECG apnea detection pipeline", version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Pipeline stages exposed as subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Segment a raw signal file into an epoch store
    Segment(SegmentArgs),
    /// Assign training labels from ground-truth apnea intervals
    Label(LabelArgs),
    /// Classify every stored epoch and write the alert log
    Batch(BatchArgs),
    /// Consolidate an alert log into apnea events
    Consolidate(ConsolidateArgs),
}
