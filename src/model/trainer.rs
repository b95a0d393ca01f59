use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ModelError;
use crate::model::booster::{sigmoid, GradientBoostedClassifier, Node, Tree, ARTIFACT_VERSION};
use crate::signals::types::{FeatureVector, FEATURE_COUNT};

const MIN_HESSIAN: f64 = 1e-16;
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Booster hyperparameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoosterParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Minimum hessian sum allowed in a child.
    pub min_child_weight: f64,
    /// Fraction of rows sampled per tree.
    pub subsample: f64,
    /// Fraction of features sampled per tree.
    pub colsample_bytree: f64,
    /// L2 regularisation on leaf weights.
    pub reg_lambda: f64,
    pub seed: u64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 5,
            learning_rate: 0.1,
            min_child_weight: 3.0,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_lambda: 1.0,
            seed: 42,
        }
    }
}

impl BoosterParams {
    fn validate(&self) -> Result<(), ModelError> {
        let fraction = |v: f64| v > 0.0 && v <= 1.0;
        if !fraction(self.subsample) || !fraction(self.colsample_bytree) {
            return Err(ModelError::Training(
                "subsample and colsample_bytree must be in (0, 1]".to_string(),
            ));
        }
        if self.learning_rate.is_nan()
            || self.learning_rate <= 0.0
            || self.reg_lambda < 0.0
            || self.min_child_weight < 0.0
        {
            return Err(ModelError::Training(format!("invalid booster params: {:?}", self)));
        }
        Ok(())
    }
}

/// Fits a `GradientBoostedClassifier` on a labelled feature matrix.
pub struct Trainer {
    params: BoosterParams,
}

/// Per-row first and second order gradients of the log loss.
struct Gradients {
    grad: Vec<f64>,
    hess: Vec<f64>,
}

impl Trainer {
    pub fn new(params: BoosterParams) -> Self {
        Self { params }
    }

    /// Deterministic for a fixed `seed`.
    pub fn fit(
        &self,
        features: &[FeatureVector],
        labels: &[bool],
    ) -> Result<GradientBoostedClassifier, ModelError> {
        self.params.validate()?;
        if features.is_empty() {
            return Err(ModelError::Training("no training rows".to_string()));
        }
        if features.len() != labels.len() {
            return Err(ModelError::Training(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let targets: Vec<f64> = labels.iter().map(|&win| if win { 1.0 } else { 0.0 }).collect();
        let positive_rate =
            (targets.iter().sum::<f64>() / targets.len() as f64).clamp(1e-6, 1.0 - 1e-6);
        let base_score = (positive_rate / (1.0 - positive_rate)).ln();

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut margins = vec![base_score; features.len()];
        let mut importance = [0.0f64; FEATURE_COUNT];
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for round in 0..self.params.n_estimators {
            let gradients = log_loss_gradients(&margins, &targets);
            let rows = self.sample_rows(&mut rng, features.len());
            let columns = self.sample_columns(&mut rng);

            let mut builder = TreeBuilder {
                params: &self.params,
                features,
                gradients: &gradients,
                columns: &columns,
                nodes: Vec::new(),
                importance: &mut importance,
            };
            builder.grow(rows, 0);
            let tree = Tree { nodes: builder.nodes };

            for (margin, row) in margins.iter_mut().zip(features) {
                *margin += tree.predict(row.as_slice());
            }
            trees.push(tree);

            if round % 10 == 0 {
                debug!("round {}: train logloss {:.5}", round, log_loss(&margins, &targets));
            }
        }

        let total_gain: f64 = importance.iter().sum();
        let feature_importance = importance
            .iter()
            .map(|gain| if total_gain > 0.0 { gain / total_gain } else { 0.0 })
            .collect();

        info!(
            "Fitted {} trees on {} rows (train logloss {:.4})",
            trees.len(),
            features.len(),
            log_loss(&margins, &targets)
        );

        Ok(GradientBoostedClassifier {
            version: ARTIFACT_VERSION,
            feature_names: FeatureVector::names(),
            base_score,
            trees,
            feature_importance,
            training_samples: features.len(),
            trained_at: Utc::now(),
        })
    }

    fn sample_rows(&self, rng: &mut StdRng, n: usize) -> Vec<usize> {
        let rows: Vec<usize> = (0..n)
            .filter(|_| rng.gen::<f64>() < self.params.subsample)
            .collect();
        if rows.is_empty() {
            (0..n).collect()
        } else {
            rows
        }
    }

    fn sample_columns(&self, rng: &mut StdRng) -> Vec<usize> {
        let keep = ((self.params.colsample_bytree * FEATURE_COUNT as f64).round() as usize)
            .clamp(1, FEATURE_COUNT);
        let mut columns: Vec<usize> = (0..FEATURE_COUNT).collect();
        columns.shuffle(rng);
        columns.truncate(keep);
        columns.sort_unstable();
        columns
    }
}

fn log_loss_gradients(margins: &[f64], targets: &[f64]) -> Gradients {
    let (grad, hess) = margins
        .iter()
        .zip(targets)
        .map(|(&m, &y)| {
            let p = sigmoid(m);
            (p - y, (p * (1.0 - p)).max(MIN_HESSIAN))
        })
        .unzip();
    Gradients { grad, hess }
}

/// Mean binary cross-entropy of margins against 0/1 targets.
pub(crate) fn log_loss(margins: &[f64], targets: &[f64]) -> f64 {
    if margins.is_empty() {
        return 0.0;
    }
    let total: f64 = margins
        .iter()
        .zip(targets)
        .map(|(&m, &y)| {
            let p = sigmoid(m).clamp(1e-15, 1.0 - 1e-15);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / margins.len() as f64
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

struct TreeBuilder<'a> {
    params: &'a BoosterParams,
    features: &'a [FeatureVector],
    gradients: &'a Gradients,
    columns: &'a [usize],
    nodes: Vec<Node>,
    importance: &'a mut [f64; FEATURE_COUNT],
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `rows`, returning the index of its root.
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        let (g, h) = self.sums(&rows);
        let leaf = Node::Leaf {
            value: -g / (h + self.params.reg_lambda) * self.params.learning_rate,
        };
        self.nodes.push(leaf);

        if depth >= self.params.max_depth || rows.len() < 2 {
            return idx;
        }

        let Some(split) = self.best_split(&rows, g, h) else {
            return idx;
        };

        self.importance[split.feature] += split.gain;
        let left = self.grow(split.left, depth + 1);
        let right = self.grow(split.right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), &r| {
            (g + self.gradients.grad[r], h + self.gradients.hess[r])
        })
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<Split> {
        let lambda = self.params.reg_lambda;
        let min_child = self.params.min_child_weight;
        let parent_score = g * g / (h + lambda);

        let mut best: Option<(usize, f64, f64)> = None;
        for &feature in self.columns {
            let mut sorted = rows.to_vec();
            sorted.sort_by(|&a, &b| self.value(a, feature).total_cmp(&self.value(b, feature)));

            let (mut gl, mut hl) = (0.0, 0.0);
            for pair in sorted.windows(2) {
                let (cur, next) = (pair[0], pair[1]);
                gl += self.gradients.grad[cur];
                hl += self.gradients.hess[cur];

                let (a, b) = (self.value(cur, feature), self.value(next, feature));
                if a == b {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < min_child || hr < min_child {
                    continue;
                }

                let gain = 0.5 * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent_score);
                if gain > MIN_SPLIT_GAIN && best.map_or(true, |(_, _, best_gain)| gain > best_gain) {
                    let mid = a + (b - a) / 2.0;
                    let threshold = if mid < b { mid } else { a };
                    best = Some((feature, threshold, gain));
                }
            }
        }

        let (feature, threshold, gain) = best?;
        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.value(r, feature) <= threshold);
        Some(Split { feature, threshold, gain, left, right })
    }

    fn value(&self, row: usize, feature: usize) -> f64 {
        self.features[row].as_slice()[feature]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelScorer;
    use crate::signals::features;
    use crate::signals::types::{RawSignal, Side};

    fn row(adx: f64, side: Side) -> FeatureVector {
        features::build(&RawSignal {
            symbol: "TEST".to_string(),
            side,
            rsi: 50.0,
            macd: 0.0,
            macd_signal: 0.0,
            ema_alignment: 0.0,
            atr_percent: 1.0,
            volume_ratio: 1.0,
            cvd: 0.0,
            adx,
            price: 100.0,
        })
        .unwrap()
    }

    /// Wins exactly when adx > 25.
    fn separable() -> (Vec<FeatureVector>, Vec<bool>) {
        (0..200)
            .map(|i| {
                let adx = 10.0 + (i % 40) as f64;
                let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                (row(adx, side), adx > 25.0)
            })
            .unzip()
    }

    #[test]
    fn test_learns_separable_rule() {
        let (x, y) = separable();
        let model = Trainer::new(BoosterParams::default()).fit(&x, &y).unwrap();

        let strong = model.predict_probability(&row(40.0, Side::Buy)).unwrap();
        let weak = model.predict_probability(&row(12.0, Side::Sell)).unwrap();
        assert!(strong > 0.8, "strong trend probability {}", strong);
        assert!(weak < 0.2, "weak trend probability {}", weak);

        let ranked = model.ranked_importance();
        assert_eq!(ranked[0].0, "adx");
        model.validate().unwrap();
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = separable();
        let a = Trainer::new(BoosterParams::default()).fit(&x, &y).unwrap();
        let b = Trainer::new(BoosterParams::default()).fit(&x, &y).unwrap();
        assert_eq!(a.trees, b.trees);
        assert_eq!(a.base_score.to_bits(), b.base_score.to_bits());
    }

    #[test]
    fn test_depth_limit() {
        let (x, y) = separable();
        let params = BoosterParams { max_depth: 1, n_estimators: 5, ..BoosterParams::default() };
        let model = Trainer::new(params).fit(&x, &y).unwrap();
        for tree in &model.trees {
            assert!(tree.nodes.len() <= 3);
        }
    }

    #[test]
    fn test_single_class_gives_constant_model() {
        let x: Vec<FeatureVector> = (0..20).map(|i| row(i as f64, Side::Buy)).collect();
        let y = vec![true; 20];
        let model = Trainer::new(BoosterParams::default()).fit(&x, &y).unwrap();
        let p = model.predict_probability(&row(5.0, Side::Buy)).unwrap();
        assert!(p > 0.99);
    }

    #[test]
    fn test_rejects_bad_input() {
        let trainer = Trainer::new(BoosterParams::default());
        assert!(matches!(trainer.fit(&[], &[]), Err(ModelError::Training(_))));
        assert!(matches!(
            trainer.fit(&[row(10.0, Side::Buy)], &[true, false]),
            Err(ModelError::Training(_))
        ));

        let bad = Trainer::new(BoosterParams { subsample: 0.0, ..BoosterParams::default() });
        assert!(bad.fit(&[row(10.0, Side::Buy)], &[true]).is_err());
    }

    #[test]
    fn test_log_loss() {
        assert!((log_loss(&[0.0], &[1.0]) - 2f64.ln()).abs() < 1e-12);
        assert!(log_loss(&[10.0], &[1.0]) < 1e-4);
        assert_eq!(log_loss(&[], &[]), 0.0);
    }
}
