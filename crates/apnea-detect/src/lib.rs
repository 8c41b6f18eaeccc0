//! Classification and alerting for ECG-based apnea detection.
//!
//! The inference half of the pipeline:
//!
//! 1. **Model** ([`model::ForestModel`]): an externally trained decision
//!    forest, loaded from a JSON artifact and validated against the
//!    feature schema.
//! 2. **Classifier adapter** ([`classifier::ClassifierService`]): the
//!    uniform `features → (label, confidence)` contract, with named-map
//!    validation for HTTP callers.
//! 3. **Label assignment** ([`labels`]): training-time mapping of
//!    ground-truth intervals to per-epoch labels.
//! 4. **Batch inference** ([`batch`]): store → feature → prediction →
//!    alert log, skipping malformed epochs.
//! 5. **Alert consolidation** ([`consolidate::AlertConsolidator`]): the
//!    gap-tolerant state machine grouping alert epochs into events.
//! 6. **Storage** ([`store`]): in-memory and file-backed epoch stores
//!    and alert logs behind the `apnea-core` traits.
//!
//! # Example
//!
//! ```
//! use apnea_core::types::{AlertRecord, EpochLabel};
//! use apnea_detect::AlertConsolidator;
//!
//! let records = vec![
//!     AlertRecord { epoch: 3, label: EpochLabel::Apnea, probability: 0.9 },
//!     AlertRecord { epoch: 4, label: EpochLabel::PreApneaWarning, probability: 0.7 },
//!     AlertRecord { epoch: 9, label: EpochLabel::Apnea, probability: 0.8 },
//! ];
//! let events = AlertConsolidator::default().consolidate_records(&records);
//! assert_eq!(events.len(), 2);
//! assert_eq!(events[0].duration_epochs, 2);
//! ```

pub mod batch;
pub mod classifier;
pub mod consolidate;
pub mod labels;
pub mod model;
pub mod store;

pub use batch::{run_batch, BatchConfig, BatchOutcome, DEFAULT_ALERT_THRESHOLD};
pub use classifier::{Classifier, ClassifierService};
pub use consolidate::{AlertConsolidator, DEFAULT_MAX_GAP};
pub use labels::assign_epoch_labels;
pub use model::{DecisionTree, ForestModel, TreeNode, NUM_CLASSES};
pub use store::{
    CsvAlertLog, DirEpochStore, MemoryAlertLog, MemoryEpochStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
