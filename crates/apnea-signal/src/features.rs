//! Per-epoch feature vectors and the extractor that produces them.
//!
//! Two schemas exist, for two model families:
//!
//! - [`EpochFeatures`]: the classification-ready 12-field schema
//!   (time-domain stats, HRV band powers, entropy measures).
//! - [`BaselineFeatures`]: the legacy 7-field schema used by the older
//!   binary apnea model.
//!
//! The schemas are NOT interchangeable and must never be mixed for a
//! given model. Field order is a wire contract: classifiers bind columns
//! positionally, so conversion to the positional form is always
//! schema-defined, never input-defined.

use std::collections::HashMap;

use apnea_core::error::{InferenceError, SignalError};
use apnea_core::types::Epoch;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entropy::{app_entropy, sample_entropy};
use crate::spectral::welch_psd;
use crate::stats;

/// Number of fields in the classification schema.
pub const NUM_FEATURES: usize = 12;

/// Field names of the classification schema, in contract order.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "mean",
    "std",
    "min",
    "max",
    "median",
    "skewness",
    "kurtosis",
    "power_vlf",
    "power_lf",
    "power_hf",
    "app_entropy",
    "sample_entropy",
];

/// Classification-ready feature vector for one epoch (12 fields).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochFeatures {
    /// Arithmetic mean of the epoch samples.
    pub mean: f64,
    /// Population standard deviation (N denominator).
    pub std: f64,
    /// Minimum sample value.
    pub min: f64,
    /// Maximum sample value.
    pub max: f64,
    /// Median sample value.
    pub median: f64,
    /// Biased sample skewness.
    pub skewness: f64,
    /// Biased excess kurtosis.
    pub kurtosis: f64,
    /// Welch band power over [0.003, 0.04) Hz.
    pub power_vlf: f64,
    /// Welch band power over [0.04, 0.15) Hz.
    pub power_lf: f64,
    /// Welch band power over [0.15, 0.4) Hz.
    pub power_hf: f64,
    /// Approximate entropy, m = 2 (0.0 for degenerate epochs).
    pub app_entropy: f64,
    /// Sample entropy, m = 2 (0.0 for degenerate epochs).
    pub sample_entropy: f64,
}

impl EpochFeatures {
    /// Positional array in schema order — the exact column layout the
    /// classifier was trained against.
    #[must_use]
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.mean,
            self.std,
            self.min,
            self.max,
            self.median,
            self.skewness,
            self.kurtosis,
            self.power_vlf,
            self.power_lf,
            self.power_hf,
            self.app_entropy,
            self.sample_entropy,
        ]
    }

    /// Build from a name-keyed map, validating the full schema.
    ///
    /// The resulting positional order depends only on the schema, never
    /// on the map's iteration order.
    ///
    /// # Errors
    ///
    /// [`InferenceError::MissingFeatures`] naming every absent field.
    pub fn from_named(map: &HashMap<String, f64>) -> Result<Self, InferenceError> {
        let missing: Vec<String> = FEATURE_NAMES
            .iter()
            .filter(|name| !map.contains_key(**name))
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(InferenceError::MissingFeatures { missing });
        }

        Ok(Self {
            mean: map["mean"],
            std: map["std"],
            min: map["min"],
            max: map["max"],
            median: map["median"],
            skewness: map["skewness"],
            kurtosis: map["kurtosis"],
            power_vlf: map["power_vlf"],
            power_lf: map["power_lf"],
            power_hf: map["power_hf"],
            app_entropy: map["app_entropy"],
            sample_entropy: map["sample_entropy"],
        })
    }
}

/// Legacy 7-field schema for the older binary model family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineFeatures {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Minimum sample value.
    pub min: f64,
    /// Maximum sample value.
    pub max: f64,
    /// Median sample value.
    pub median: f64,
    /// 25th percentile.
    pub p25: f64,
    /// 75th percentile.
    pub p75: f64,
}

impl BaselineFeatures {
    /// Field names of the legacy schema, in contract order.
    pub const FIELD_NAMES: [&'static str; 7] =
        ["mean", "std", "min", "max", "median", "p25", "p75"];

    /// Positional array in legacy schema order.
    #[must_use]
    pub fn to_array(&self) -> [f64; 7] {
        [
            self.mean, self.std, self.min, self.max, self.median, self.p25, self.p75,
        ]
    }
}

/// Feature extractor for fixed-rate epochs.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    fs: f64,
}

impl FeatureExtractor {
    /// Create an extractor for signals sampled at `fs` Hz.
    #[must_use]
    pub fn new(fs: f64) -> Self {
        Self { fs }
    }

    /// Sampling rate this extractor assumes.
    #[must_use]
    pub fn fs(&self) -> f64 {
        self.fs
    }

    /// Extract the classification feature vector from one epoch's samples.
    ///
    /// Degenerate nonlinear measures (constant or too-short epochs) fall
    /// back to 0.0 for BOTH entropy fields rather than aborting — a
    /// malformed epoch must never take down a batch run. Only the named
    /// degeneracy is tolerated; structural problems still propagate.
    ///
    /// # Errors
    ///
    /// [`SignalError::InsufficientSamples`] when the epoch is too short
    /// to estimate a spectrum.
    pub fn extract(&self, samples: &[f64]) -> Result<EpochFeatures, SignalError> {
        let spectrum = welch_psd(samples, self.fs)?;
        let (power_vlf, power_lf, power_hf) = spectrum.hrv_band_powers();

        let (app_ent, samp_ent) = match (app_entropy(samples), sample_entropy(samples)) {
            (Ok(a), Ok(s)) => (a, s),
            (a, s) => {
                let reason = a.err().or(s.err()).map(|e| e.to_string()).unwrap_or_default();
                debug!("entropy fallback to 0.0: {reason}");
                (0.0, 0.0)
            }
        };

        Ok(EpochFeatures {
            mean: stats::mean(samples),
            std: stats::population_std(samples),
            min: stats::min(samples),
            max: stats::max(samples),
            median: stats::median(samples),
            skewness: stats::skewness(samples),
            kurtosis: stats::kurtosis(samples),
            power_vlf,
            power_lf,
            power_hf,
            app_entropy: app_ent,
            sample_entropy: samp_ent,
        })
    }

    /// Extract from an [`Epoch`], using the epoch's own sampling rate.
    ///
    /// # Errors
    ///
    /// Same as [`FeatureExtractor::extract`].
    pub fn extract_epoch(&self, epoch: &Epoch) -> Result<EpochFeatures, SignalError> {
        Self::new(epoch.fs).extract(&epoch.samples)
    }

    /// Extract the legacy 7-field vector (time-domain stats only).
    #[must_use]
    pub fn extract_baseline(&self, samples: &[f64]) -> BaselineFeatures {
        BaselineFeatures {
            mean: stats::mean(samples),
            std: stats::population_std(samples),
            min: stats::min(samples),
            max: stats::max(samples),
            median: stats::median(samples),
            p25: stats::percentile(samples, 25.0),
            p75: stats::percentile(samples, 75.0),
        }
    }

    /// Feature matrix for a batch of epochs: one row per epoch, columns
    /// in schema order. Epochs that fail extraction are skipped; the
    /// returned index list identifies the rows that were produced.
    pub fn feature_matrix(&self, epochs: &[Epoch]) -> (Array2<f64>, Vec<u64>) {
        let mut rows: Vec<f64> = Vec::with_capacity(epochs.len() * NUM_FEATURES);
        let mut kept = Vec::with_capacity(epochs.len());

        for epoch in epochs {
            match self.extract_epoch(epoch) {
                Ok(features) => {
                    rows.extend_from_slice(&features.to_array());
                    kept.push(epoch.index);
                }
                Err(e) => {
                    debug!(epoch = epoch.index, "skipping epoch in feature matrix: {e}");
                }
            }
        }

        let matrix = Array2::from_shape_vec((kept.len(), NUM_FEATURES), rows)
            .expect("row count matches kept epochs");
        (matrix, kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signal(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / 100.0;
                (2.0 * std::f64::consts::PI * 1.2 * t).sin()
                    + 0.3 * (2.0 * std::f64::consts::PI * 0.25 * t).sin()
            })
            .collect()
    }

    #[test]
    fn schema_has_twelve_fields_in_contract_order() {
        assert_eq!(FEATURE_NAMES.len(), NUM_FEATURES);
        assert_eq!(FEATURE_NAMES[0], "mean");
        assert_eq!(FEATURE_NAMES[7], "power_vlf");
        assert_eq!(FEATURE_NAMES[11], "sample_entropy");
    }

    #[test]
    fn to_array_follows_schema_order() {
        let features = EpochFeatures {
            mean: 1.0,
            std: 2.0,
            min: 3.0,
            max: 4.0,
            median: 5.0,
            skewness: 6.0,
            kurtosis: 7.0,
            power_vlf: 8.0,
            power_lf: 9.0,
            power_hf: 10.0,
            app_entropy: 11.0,
            sample_entropy: 12.0,
        };
        let array = features.to_array();
        assert_eq!(array[0], 1.0);
        assert_eq!(array[7], 8.0);
        assert_eq!(array[11], 12.0);
    }

    #[test]
    fn from_named_is_input_order_independent() {
        let extractor = FeatureExtractor::new(100.0);
        let features = extractor.extract(&test_signal(1500)).unwrap();

        let forward: HashMap<String, f64> = FEATURE_NAMES
            .iter()
            .zip(features.to_array())
            .map(|(name, value)| ((*name).to_string(), value))
            .collect();
        let mut reversed = HashMap::new();
        for (name, value) in FEATURE_NAMES.iter().zip(features.to_array()).rev() {
            reversed.insert((*name).to_string(), value);
        }

        let a = EpochFeatures::from_named(&forward).unwrap();
        let b = EpochFeatures::from_named(&reversed).unwrap();
        assert_eq!(a.to_array(), b.to_array());
        assert_eq!(a.to_array(), features.to_array());
    }

    #[test]
    fn from_named_reports_all_missing_fields() {
        let mut map = HashMap::new();
        map.insert("mean".to_string(), 0.1);
        map.insert("std".to_string(), 0.2);

        let err = EpochFeatures::from_named(&map).unwrap_err();
        match err {
            InferenceError::MissingFeatures { missing } => {
                assert_eq!(missing.len(), 10);
                assert!(missing.contains(&"power_vlf".to_string()));
                assert!(missing.contains(&"sample_entropy".to_string()));
                assert!(!missing.contains(&"mean".to_string()));
            }
            other => panic!("expected MissingFeatures, got {other:?}"),
        }
    }

    #[test]
    fn constant_epoch_falls_back_to_zero_entropies() {
        let extractor = FeatureExtractor::new(100.0);
        let features = extractor.extract(&vec![1.0; 1500]).unwrap();
        assert_eq!(features.app_entropy, 0.0);
        assert_eq!(features.sample_entropy, 0.0);
        // The rest of the vector is still meaningful
        assert!((features.mean - 1.0).abs() < 1e-12);
        assert!((features.std - 0.0).abs() < 1e-12);
    }

    #[test]
    fn realistic_epoch_produces_finite_vector() {
        let extractor = FeatureExtractor::new(100.0);
        let features = extractor.extract(&test_signal(1500)).unwrap();
        for value in features.to_array() {
            assert!(value.is_finite());
        }
        assert!(features.sample_entropy > 0.0);
        assert!(features.power_hf >= 0.0);
    }

    #[test]
    fn empty_epoch_is_an_error_not_a_panic() {
        let extractor = FeatureExtractor::new(100.0);
        assert!(matches!(
            extractor.extract(&[]),
            Err(SignalError::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn baseline_schema_matches_legacy_order() {
        let extractor = FeatureExtractor::new(100.0);
        let features = extractor.extract_baseline(&[1.0, 2.0, 3.0, 4.0]);
        let array = features.to_array();
        assert_eq!(BaselineFeatures::FIELD_NAMES[5], "p25");
        assert!((array[5] - 1.75).abs() < 1e-12);
        assert!((array[6] - 3.25).abs() < 1e-12);
    }

    #[test]
    fn feature_matrix_skips_unusable_epochs() {
        let extractor = FeatureExtractor::new(2.0);
        let good = Epoch::new(1, test_signal(6), 2.0, 3).unwrap();
        let bad = Epoch {
            index: 2,
            samples: vec![],
            fs: 2.0,
            duration_secs: 3,
        };
        let good2 = Epoch::new(3, test_signal(6), 2.0, 3).unwrap();

        let (matrix, kept) = extractor.feature_matrix(&[good, bad, good2]);
        assert_eq!(kept, vec![1, 3]);
        assert_eq!(matrix.dim(), (2, NUM_FEATURES));
    }
}
