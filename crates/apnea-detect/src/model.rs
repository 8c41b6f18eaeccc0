//! Decision-forest model artifact.
//!
//! The classifier itself is trained externally (random-forest or
//! gradient-boosting family) and exported to a JSON artifact: an
//! ensemble of flat decision trees whose leaves carry per-class
//! distributions. Inference averages the normalized leaf distributions
//! across trees (soft voting).
//!
//! The artifact embeds the feature schema it was trained against; a
//! mismatch with the pipeline's schema is a load-time failure, never a
//! silent column misbinding.

use std::path::Path;

use apnea_core::error::InferenceError;
use serde::{Deserialize, Serialize};

use apnea_signal::features::{EpochFeatures, FEATURE_NAMES, NUM_FEATURES};

/// Number of output classes (Normal, Pre-apnea Warning, Apnea).
pub const NUM_CLASSES: usize = 3;

/// One node of a flattened decision tree.
///
/// Exporter convention: internal nodes have `feature >= 0` and child
/// indices; leaves carry `feature = -1`, `left = right = -1`, and a
/// per-class sample distribution in `value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Feature column index, or -1 for a leaf.
    pub feature: i32,
    /// Split threshold; samples with `x[feature] <= threshold` go left.
    #[serde(default)]
    pub threshold: f64,
    /// Left child index, or -1 for a leaf.
    pub left: i32,
    /// Right child index, or -1 for a leaf.
    pub right: i32,
    /// Per-class distribution (leaves; empty on internal nodes).
    #[serde(default)]
    pub value: Vec<f64>,
}

/// One flattened decision tree, root at node 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Flat node array.
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk the tree for one feature row and return the leaf's
    /// normalized class distribution.
    fn leaf_distribution(&self, row: &[f64; NUM_FEATURES]) -> [f64; NUM_CLASSES] {
        let mut idx = 0_usize;
        loop {
            let node = &self.nodes[idx];
            if node.feature < 0 {
                return normalize(&node.value);
            }
            let x = row[node.feature as usize];
            idx = if x <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

/// Normalize a leaf sample distribution into probabilities.
fn normalize(value: &[f64]) -> [f64; NUM_CLASSES] {
    let mut out = [0.0; NUM_CLASSES];
    let total: f64 = value.iter().take(NUM_CLASSES).sum();
    if total > 0.0 {
        for (slot, v) in out.iter_mut().zip(value.iter()) {
            *slot = v / total;
        }
    } else {
        // Uninformative leaf: uniform distribution
        out = [1.0 / NUM_CLASSES as f64; NUM_CLASSES];
    }
    out
}

/// A loaded decision-forest model, immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    /// Human-readable model name.
    pub name: String,
    /// Model artifact version.
    pub version: String,
    /// Feature names the model was trained with, in column order.
    pub feature_names: Vec<String>,
    /// The tree ensemble.
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    /// Load and validate a model artifact from a JSON file.
    ///
    /// # Errors
    ///
    /// [`InferenceError::ModelLoadFailed`] when the file is unreadable
    /// or malformed, [`InferenceError::SchemaMismatch`] when it was
    /// trained against a different feature schema.
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let display = path.display().to_string();
        let contents =
            std::fs::read_to_string(path).map_err(|e| InferenceError::ModelLoadFailed {
                path: display.clone(),
                reason: e.to_string(),
            })?;
        let model: ForestModel =
            serde_json::from_str(&contents).map_err(|e| InferenceError::ModelLoadFailed {
                path: display.clone(),
                reason: e.to_string(),
            })?;
        model.validate(&display)?;
        Ok(model)
    }

    /// Validate schema and tree structure.
    fn validate(&self, path: &str) -> Result<(), InferenceError> {
        if self.feature_names != FEATURE_NAMES {
            return Err(InferenceError::SchemaMismatch {
                expected: self.feature_names.clone(),
                actual: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            });
        }
        if self.trees.is_empty() {
            return Err(InferenceError::ModelLoadFailed {
                path: path.to_string(),
                reason: "model contains no trees".into(),
            });
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(InferenceError::ModelLoadFailed {
                    path: path.to_string(),
                    reason: format!("tree {t} is empty"),
                });
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                if node.feature >= 0 {
                    let n = tree.nodes.len() as i32;
                    if node.left < 0 || node.left >= n || node.right < 0 || node.right >= n {
                        return Err(InferenceError::ModelLoadFailed {
                            path: path.to_string(),
                            reason: format!("tree {t} node {i} has out-of-range children"),
                        });
                    }
                    if node.feature as usize >= NUM_FEATURES {
                        return Err(InferenceError::ModelLoadFailed {
                            path: path.to_string(),
                            reason: format!(
                                "tree {t} node {i} splits on feature {} (schema has {NUM_FEATURES})",
                                node.feature
                            ),
                        });
                    }
                } else if node.value.len() < NUM_CLASSES {
                    return Err(InferenceError::ModelLoadFailed {
                        path: path.to_string(),
                        reason: format!(
                            "tree {t} leaf {i} has {} class values, need {NUM_CLASSES}",
                            node.value.len()
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Per-class probabilities for one feature vector: the mean of the
    /// normalized leaf distributions across all trees.
    #[must_use]
    pub fn predict_proba(&self, features: &EpochFeatures) -> [f64; NUM_CLASSES] {
        let row = features.to_array();
        let mut acc = [0.0; NUM_CLASSES];
        for tree in &self.trees {
            let dist = tree.leaf_distribution(&row);
            for (slot, p) in acc.iter_mut().zip(dist) {
                *slot += p;
            }
        }
        let inv = 1.0 / self.trees.len() as f64;
        for slot in &mut acc {
            *slot *= inv;
        }
        acc
    }

    /// Number of trees in the ensemble.
    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}
