//! Batch inference over a stored recording.
//!
//! Walks an [`EpochStore`] in index order, extracts features, classifies,
//! and appends one [`AlertRecord`] per classified epoch to an
//! [`AlertLog`]. A failing epoch is logged and skipped — one malformed
//! window must never abort the run. Alert-set predictions at or above
//! the probability threshold are surfaced at warn level and counted.

use apnea_core::error::CoreError;
use apnea_core::traits::{AlertLog, EpochStore};
use apnea_core::types::AlertRecord;
use apnea_signal::features::FeatureExtractor;
use tracing::{info, warn};

use crate::classifier::{Classifier, ClassifierService};

/// Probability threshold above which an alert-set prediction is
/// surfaced as an alarm.
pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.6;

/// Batch run configuration.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    /// Alarm threshold on the prediction confidence.
    pub alert_threshold: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

/// Summary of one batch inference run.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Number of epochs classified and logged.
    pub classified: usize,
    /// Epoch indices skipped because feature extraction failed.
    pub skipped: Vec<u64>,
    /// Number of alert-set predictions at or above the threshold.
    pub alarms: usize,
}

/// Classify every epoch in `store` and append the records to `log`.
///
/// Epochs are processed in ascending index order, so the log stays
/// sorted for the consolidator. Extraction is independent per epoch and
/// could fan out across workers; results would only need re-sorting by
/// index before consolidation.
///
/// # Errors
///
/// Storage errors reading epochs or appending records, and prediction
/// failures, abort the run. Per-epoch extraction failures do not.
pub fn run_batch(
    store: &dyn EpochStore,
    classifier: &ClassifierService,
    log: &mut dyn AlertLog,
    config: &BatchConfig,
) -> Result<BatchOutcome, CoreError> {
    let mut outcome = BatchOutcome {
        classified: 0,
        skipped: Vec::new(),
        alarms: 0,
    };

    for index in store.indices() {
        let epoch = store.get(index)?;
        let features = match FeatureExtractor::new(epoch.fs).extract(&epoch.samples) {
            Ok(features) => features,
            Err(e) => {
                warn!(epoch = index, "skipping epoch, feature extraction failed: {e}");
                outcome.skipped.push(index);
                continue;
            }
        };

        let prediction = classifier.predict(&features)?;
        let record = AlertRecord {
            epoch: index,
            label: prediction.label,
            probability: prediction.confidence,
        };

        if record.is_alert() && record.probability >= config.alert_threshold {
            warn!(
                epoch = index,
                label = record.label.as_str(),
                probability = record.probability,
                "alert triggered"
            );
            outcome.alarms += 1;
        }

        log.append(record)?;
        outcome.classified += 1;
    }

    info!(
        classified = outcome.classified,
        skipped = outcome.skipped.len(),
        alarms = outcome.alarms,
        "batch inference complete"
    );
    Ok(outcome)
}
