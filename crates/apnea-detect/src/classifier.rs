//! Classifier adapter over an externally trained model.
//!
//! [`ClassifierService`] is constructed once at process start from a
//! model artifact, is read-only thereafter, and can be shared across
//! concurrent request handlers without synchronization.

use std::collections::HashMap;
use std::path::Path;

use apnea_core::error::InferenceError;
use apnea_core::types::{EpochLabel, Prediction};
use apnea_signal::features::EpochFeatures;
use tracing::info;

use crate::model::ForestModel;

/// Uniform classification contract: features in, label + confidence out.
pub trait Classifier: Send + Sync {
    /// Classify one epoch's feature vector.
    ///
    /// Confidence is the maximum per-class probability emitted by the
    /// underlying model.
    ///
    /// # Errors
    ///
    /// Returns an error when the model emits an unusable distribution.
    fn predict(&self, features: &EpochFeatures) -> Result<Prediction, InferenceError>;
}

/// The production classifier: a loaded decision forest behind the
/// [`Classifier`] contract.
#[derive(Debug, Clone)]
pub struct ClassifierService {
    model: ForestModel,
}

impl ClassifierService {
    /// Wrap an already-loaded model.
    #[must_use]
    pub fn new(model: ForestModel) -> Self {
        Self { model }
    }

    /// Load the model artifact at `path` and wrap it.
    ///
    /// # Errors
    ///
    /// Propagates [`InferenceError::ModelLoadFailed`] /
    /// [`InferenceError::SchemaMismatch`]; callers treat these as fatal
    /// at startup.
    pub fn from_model_file(path: &Path) -> Result<Self, InferenceError> {
        let model = ForestModel::load(path)?;
        info!(
            model = %model.name,
            version = %model.version,
            trees = model.num_trees(),
            "classifier model loaded"
        );
        Ok(Self::new(model))
    }

    /// The underlying model.
    #[must_use]
    pub fn model(&self) -> &ForestModel {
        &self.model
    }

    /// Classify a name-keyed feature map, validating the schema first.
    ///
    /// The positional binding is schema-defined, so key order in the map
    /// never affects the result.
    ///
    /// # Errors
    ///
    /// [`InferenceError::MissingFeatures`] naming every absent field, or
    /// a prediction failure.
    pub fn predict_named(
        &self,
        features: &HashMap<String, f64>,
    ) -> Result<Prediction, InferenceError> {
        let features = EpochFeatures::from_named(features)?;
        self.predict(&features)
    }
}

impl Classifier for ClassifierService {
    fn predict(&self, features: &EpochFeatures) -> Result<Prediction, InferenceError> {
        let proba = self.model.predict_proba(features);

        let mut best = 0_usize;
        let mut confidence = proba[0];
        for (class, &p) in proba.iter().enumerate().skip(1) {
            // Strict comparison: ties resolve to the lowest class index
            if p > confidence {
                best = class;
                confidence = p;
            }
        }

        if !confidence.is_finite() {
            return Err(InferenceError::InferenceFailed {
                message: format!("non-finite class probabilities: {proba:?}"),
            });
        }

        let label = EpochLabel::from_index(best).ok_or_else(|| InferenceError::InferenceFailed {
            message: format!("class index {best} outside label set"),
        })?;

        Ok(Prediction { label, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionTree, TreeNode, NUM_CLASSES};
    use apnea_signal::features::FEATURE_NAMES;

    fn leaf(value: [f64; NUM_CLASSES]) -> TreeNode {
        TreeNode {
            feature: -1,
            threshold: 0.0,
            left: -1,
            right: -1,
            value: value.to_vec(),
        }
    }

    /// Forest with one stump: split on `std` (column 1) at 0.5.
    fn service() -> ClassifierService {
        let tree = DecisionTree {
            nodes: vec![
                TreeNode {
                    feature: 1,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                    value: vec![],
                },
                leaf([0.5, 2.5, 7.0]),
                leaf([9.0, 0.5, 0.5]),
            ],
        };
        ClassifierService::new(ForestModel {
            name: "test".into(),
            version: "0".into(),
            feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            trees: vec![tree],
        })
    }

    fn features_with_std(std: f64) -> EpochFeatures {
        EpochFeatures {
            mean: 0.0,
            std,
            min: 0.0,
            max: 0.0,
            median: 0.0,
            skewness: 0.0,
            kurtosis: 0.0,
            power_vlf: 0.0,
            power_lf: 0.0,
            power_hf: 0.0,
            app_entropy: 0.0,
            sample_entropy: 0.0,
        }
    }

    #[test]
    fn predicts_apnea_for_low_variance() {
        let pred = service().predict(&features_with_std(0.1)).unwrap();
        assert_eq!(pred.label, EpochLabel::Apnea);
        assert!((pred.confidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn predicts_normal_for_high_variance() {
        let pred = service().predict(&features_with_std(2.0)).unwrap();
        assert_eq!(pred.label, EpochLabel::Normal);
        assert!((pred.confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn prediction_is_deterministic() {
        let svc = service();
        let features = features_with_std(0.3);
        let first = svc.predict(&features).unwrap();
        for _ in 0..10 {
            let again = svc.predict(&features).unwrap();
            assert_eq!(again.label, first.label);
            assert!((again.confidence - first.confidence).abs() < 1e-15);
        }
    }

    #[test]
    fn tie_breaks_to_lowest_class_index() {
        let tree = DecisionTree {
            nodes: vec![leaf([1.0, 1.0, 1.0])],
        };
        let svc = ClassifierService::new(ForestModel {
            name: "tie".into(),
            version: "0".into(),
            feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            trees: vec![tree],
        });
        let pred = svc.predict(&features_with_std(0.0)).unwrap();
        assert_eq!(pred.label, EpochLabel::Normal);
    }

    #[test]
    fn predict_named_validates_schema() {
        let svc = service();
        let mut map = HashMap::new();
        map.insert("mean".to_string(), 0.0);

        let err = svc.predict_named(&map).unwrap_err();
        match err {
            InferenceError::MissingFeatures { missing } => {
                assert!(missing.contains(&"std".to_string()));
                assert_eq!(missing.len(), 11);
            }
            other => panic!("expected MissingFeatures, got {other:?}"),
        }
    }

    #[test]
    fn predict_named_matches_positional_prediction() {
        let svc = service();
        let features = features_with_std(0.1);
        let map: HashMap<String, f64> = FEATURE_NAMES
            .iter()
            .zip(features.to_array())
            .map(|(name, value)| ((*name).to_string(), value))
            .collect();

        let named = svc.predict_named(&map).unwrap();
        let positional = svc.predict(&features).unwrap();
        assert_eq!(named.label, positional.label);
        assert!((named.confidence - positional.confidence).abs() < 1e-15);
    }

    #[test]
    fn confidence_is_in_unit_interval() {
        let pred = service().predict(&features_with_std(0.5)).unwrap();
        assert!(pred.confidence >= 0.0 && pred.confidence <= 1.0);
    }
}
