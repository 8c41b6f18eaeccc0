//! Core domain types for ECG-based sleep apnea detection.
//!
//! This crate defines the vocabulary shared by every stage of the
//! pipeline — epochs, labels, alert records, consolidated events — plus
//! the error taxonomy and the storage traits that keep the algorithms
//! independent of any particular backing store.
//!
//! # Pipeline
//!
//! raw signal → segmenter → [`Epoch`]s → feature extractor → classifier →
//! per-epoch [`AlertRecord`]s → consolidator → [`ApneaEvent`]s.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CoreError, CoreResult, InferenceError, SignalError, StorageError};
pub use traits::{AlertLog, EpochStore};
pub use types::{AlertRecord, ApneaEvent, ApneaInterval, Epoch, EpochLabel, Prediction};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
