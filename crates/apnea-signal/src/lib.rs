//! Signal processing for ECG-based apnea detection.
//!
//! This crate turns a continuous single-lead ECG recording into
//! classification-ready feature vectors:
//!
//! 1. **Segmentation** ([`EpochSegmenter`]): fixed-duration,
//!    non-overlapping windows with 1-based indices.
//! 2. **Time-domain stats** ([`stats`]): mean, population std, min/max,
//!    median, skewness, excess kurtosis.
//! 3. **Spectral band powers** ([`spectral`]): Welch PSD with half-open
//!    VLF/LF/HF band sums.
//! 4. **Nonlinear measures** ([`entropy`]): approximate and sample
//!    entropy with an explicit degenerate-signal fallback.
//!
//! # Example
//!
//! ```
//! use apnea_signal::{EpochSegmenter, FeatureExtractor};
//!
//! let seg = EpochSegmenter::new(100.0, 15);
//! let signal: Vec<f64> = (0..4500).map(|i| (i as f64 * 0.07).sin()).collect();
//! let epochs = seg.segment(&signal);
//! assert_eq!(epochs.len(), 3);
//!
//! let extractor = FeatureExtractor::new(100.0);
//! let features = extractor.extract_epoch(&epochs[0]).unwrap();
//! assert!(features.sample_entropy.is_finite());
//! ```

pub mod entropy;
pub mod features;
pub mod segment;
pub mod spectral;
pub mod stats;

pub use features::{
    BaselineFeatures, EpochFeatures, FeatureExtractor, FEATURE_NAMES, NUM_FEATURES,
};
pub use segment::{
    EpochSegmenter, DEFAULT_FS, DETECTION_EPOCH_SECS, NEW_PATIENT_EPOCH_SECS,
};
pub use spectral::{welch_psd, PowerSpectrum, HF_BAND, LF_BAND, VLF_BAND};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
