use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::ModelError;
use crate::model::ModelScorer;
use crate::signals::types::FeatureVector;

pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Rows with `features[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Contribution to the log-odds margin, learning rate already applied.
    Leaf { value: f64 },
}

/// One regression tree, root at index 0. Children always sit after their
/// parent, which rules out cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if features[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    fn validate(&self, tree_idx: usize, feature_count: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Malformed(format!("tree {} has no nodes", tree_idx)));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(ModelError::Malformed(format!(
                        "tree {} node {}: non-finite leaf value",
                        tree_idx, idx
                    )));
                }
                Node::Leaf { .. } => {}
                Node::Split { feature, threshold, left, right } => {
                    if feature >= feature_count {
                        return Err(ModelError::Malformed(format!(
                            "tree {} node {}: feature index {} out of range",
                            tree_idx, idx, feature
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::Malformed(format!(
                            "tree {} node {}: NaN threshold",
                            tree_idx, idx
                        )));
                    }
                    let in_order = |child: usize| child > idx && child < self.nodes.len();
                    if !in_order(left) || !in_order(right) {
                        return Err(ModelError::Malformed(format!(
                            "tree {} node {}: invalid child link ({}, {})",
                            tree_idx, idx, left, right
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Gradient-boosted trees with a logistic link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    pub version: u32,
    pub feature_names: Vec<String>,
    /// Prior log-odds added before any tree.
    pub base_score: f64,
    pub trees: Vec<Tree>,
    /// Gain-based importance per feature, normalised to sum to 1.
    pub feature_importance: Vec<f64>,
    pub training_samples: usize,
    pub trained_at: DateTime<Utc>,
}

impl GradientBoostedClassifier {
    /// Load and validate a persisted artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let model = Self::from_json(&contents)?;
        info!(
            "Loaded model from {} ({} trees, trained on {} samples at {})",
            path.display(),
            model.trees.len(),
            model.training_samples,
            model.trained_at.to_rfc3339()
        );
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Reject artifacts that would silently mis-score live signals.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != ARTIFACT_VERSION {
            return Err(ModelError::Malformed(format!(
                "unsupported artifact version {}",
                self.version
            )));
        }

        let expected = FeatureVector::names();
        if self.feature_names != expected {
            return Err(ModelError::ShapeMismatch {
                expected,
                actual: self.feature_names.clone(),
            });
        }

        if !self.base_score.is_finite() {
            return Err(ModelError::Malformed("non-finite base score".to_string()));
        }

        let feature_count = self.feature_names.len();
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(idx, feature_count)?;
        }
        Ok(())
    }

    /// Raw log-odds margin.
    pub fn predict_margin(&self, features: &FeatureVector) -> f64 {
        let values = features.as_slice();
        self.base_score + self.trees.iter().map(|tree| tree.predict(values)).sum::<f64>()
    }

    /// Importance paired with feature name, highest first.
    pub fn ranked_importance(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.feature_importance.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

pub(crate) fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

impl ModelScorer for GradientBoostedClassifier {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let probability = sigmoid(self.predict_margin(features));
        if !probability.is_finite() {
            return Err(ModelError::InvalidOutput(probability));
        }
        Ok(probability.clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        "gradient-boosted-trees"
    }
}
