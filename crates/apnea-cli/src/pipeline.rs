//! Pipeline subcommand implementations.
//!
//! Each subcommand is one stage of the offline pipeline; raw signals are
//! raw little-endian f64 sample files, tabular data is CSV.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::info;

use apnea_core::traits::EpochStore;
use apnea_detect::store::{
    read_alert_log_csv, read_intervals_csv, read_samples_f64le, write_events_csv, CsvAlertLog,
    DirEpochStore,
};
use apnea_detect::{
    assign_epoch_labels, run_batch, AlertConsolidator, BatchConfig, ClassifierService,
    DEFAULT_ALERT_THRESHOLD, DEFAULT_MAX_GAP,
};
use apnea_signal::{EpochSegmenter, DEFAULT_FS, DETECTION_EPOCH_SECS};

// ── segment ──────────────────────────────────────────────────────────────────

/// Arguments for `apnea segment`.
#[derive(Args, Debug)]
pub struct SegmentArgs {
    /// Raw signal file (little-endian f64 samples)
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// Output epoch store directory
    #[arg(long, value_name = "DIR")]
    pub output: PathBuf,

    /// Sampling rate in Hz
    #[arg(long, default_value_t = DEFAULT_FS)]
    pub fs: f64,

    /// Epoch duration in seconds (use 60 for the new-patient pipeline)
    #[arg(long, default_value_t = DETECTION_EPOCH_SECS)]
    pub epoch_secs: u32,
}

/// Segment a raw recording into per-epoch files.
pub fn segment(args: &SegmentArgs) -> anyhow::Result<()> {
    let signal = read_samples_f64le(&args.input)
        .with_context(|| format!("reading signal from {}", args.input.display()))?;
    info!(samples = signal.len(), "signal loaded");

    let segmenter = EpochSegmenter::new(args.fs, args.epoch_secs);
    let epochs = segmenter.segment(&signal);
    if epochs.is_empty() {
        info!(
            "signal shorter than one epoch ({} samples needed), nothing to store",
            segmenter.epoch_len()
        );
        return Ok(());
    }

    let store = DirEpochStore::create(&args.output, args.fs, args.epoch_secs)
        .with_context(|| format!("creating epoch store at {}", args.output.display()))?;
    for epoch in &epochs {
        store.put(epoch)?;
    }
    let discarded = segmenter.remainder(&signal).len();
    info!(
        epochs = epochs.len(),
        discarded_samples = discarded,
        "epochs stored at {}",
        args.output.display()
    );
    Ok(())
}

// ── label ────────────────────────────────────────────────────────────────────

/// Arguments for `apnea label`.
#[derive(Args, Debug)]
pub struct LabelArgs {
    /// Epoch store directory produced by `segment`
    #[arg(long, value_name = "DIR")]
    pub epochs: PathBuf,

    /// Ground-truth intervals CSV (columns: start_sec, end_sec)
    #[arg(long, value_name = "PATH")]
    pub intervals: PathBuf,

    /// Output labels CSV (columns: epoch, label)
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
struct LabelRow {
    epoch: u64,
    label: usize,
}

/// Assign per-epoch integer labels from apnea intervals.
pub fn label(args: &LabelArgs) -> anyhow::Result<()> {
    let store = DirEpochStore::open(&args.epochs)
        .with_context(|| format!("opening epoch store at {}", args.epochs.display()))?;
    let intervals = read_intervals_csv(&args.intervals)
        .with_context(|| format!("reading intervals from {}", args.intervals.display()))?;

    let num_epochs = store.len();
    let labels = assign_epoch_labels(&intervals, f64::from(store.epoch_secs()), num_epochs);

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for (i, epoch_label) in labels.iter().enumerate() {
        writer.serialize(LabelRow {
            epoch: i as u64 + 1,
            label: epoch_label.as_index(),
        })?;
    }
    writer.flush()?;

    let apnea = labels
        .iter()
        .filter(|l| l.as_index() == 2)
        .count();
    let warnings = labels
        .iter()
        .filter(|l| l.as_index() == 1)
        .count();
    info!(
        epochs = num_epochs,
        apnea,
        warnings,
        "labels written to {}",
        args.output.display()
    );
    Ok(())
}

// ── batch ────────────────────────────────────────────────────────────────────

/// Arguments for `apnea batch`.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Epoch store directory produced by `segment`
    #[arg(long, value_name = "DIR")]
    pub epochs: PathBuf,

    /// Classifier model artifact (JSON forest)
    #[arg(long, value_name = "PATH")]
    pub model: PathBuf,

    /// Output alert-log CSV (columns: epoch, label, probability)
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// Alarm threshold on prediction confidence
    #[arg(long, default_value_t = DEFAULT_ALERT_THRESHOLD)]
    pub threshold: f64,
}

/// Classify every stored epoch and write the alert log.
pub fn batch(args: &BatchArgs) -> anyhow::Result<()> {
    let store = DirEpochStore::open(&args.epochs)
        .with_context(|| format!("opening epoch store at {}", args.epochs.display()))?;
    let classifier = ClassifierService::from_model_file(&args.model)?;

    // A rerun replaces the previous log rather than appending to it
    if args.output.exists() {
        std::fs::remove_file(&args.output)
            .with_context(|| format!("replacing {}", args.output.display()))?;
    }
    let mut log = CsvAlertLog::open(&args.output)?;
    let config = BatchConfig {
        alert_threshold: args.threshold,
    };
    let outcome = run_batch(&store, &classifier, &mut log, &config)?;
    info!(
        classified = outcome.classified,
        skipped = outcome.skipped.len(),
        alarms = outcome.alarms,
        "alert log written to {}",
        args.output.display()
    );
    Ok(())
}

// ── consolidate ──────────────────────────────────────────────────────────────

/// Arguments for `apnea consolidate`.
#[derive(Args, Debug)]
pub struct ConsolidateArgs {
    /// Alert-log CSV produced by `batch`
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// Output events CSV (columns: start_epoch, end_epoch, duration_epochs)
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// Gap tolerance in epochs
    #[arg(long, default_value_t = DEFAULT_MAX_GAP)]
    pub max_gap: u64,
}

/// Consolidate an alert log into apnea events.
pub fn consolidate(args: &ConsolidateArgs) -> anyhow::Result<()> {
    let records = read_alert_log_csv(&args.input)
        .with_context(|| format!("reading alert log from {}", args.input.display()))?;

    let events = AlertConsolidator::new(args.max_gap).consolidate_records(&records);
    write_events_csv(&args.output, &events)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(
        events = events.len(),
        "consolidated apnea events written to {}",
        args.output.display()
    );
    Ok(())
}
