use std::sync::Arc;

use crate::error::{ModelError, ScoringError};
use crate::model::ModelScorer;
use crate::signals::features;
use crate::signals::rule_based::RuleBasedScorer;
use crate::signals::types::{Confidence, RawSignal, ScoreResult};

pub const DEFAULT_MIN_PROBABILITY: f64 = 0.6;

/// Where probabilities come from. Chosen once when the process starts.
#[derive(Clone)]
pub enum ActiveScorer {
    Model(Arc<dyn ModelScorer>),
    RuleBased(RuleBasedScorer),
}

impl ActiveScorer {
    /// Model when one loaded, heuristic otherwise.
    pub fn from_model(model: Option<Arc<dyn ModelScorer>>) -> Self {
        match model {
            Some(model) => ActiveScorer::Model(model),
            None => ActiveScorer::RuleBased(RuleBasedScorer::new()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ActiveScorer::Model(model) => model.name(),
            ActiveScorer::RuleBased(_) => "rule-based",
        }
    }
}

impl std::fmt::Debug for ActiveScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ActiveScorer({})", self.name())
    }
}

/// Turns a signal into a probability, a recommendation and a confidence tier.
#[derive(Debug, Clone)]
pub struct ScoringPolicy {
    scorer: ActiveScorer,
    min_probability: f64,
}

impl ScoringPolicy {
    pub fn new(scorer: ActiveScorer, min_probability: f64) -> Self {
        Self { scorer, min_probability }
    }

    pub fn model_loaded(&self) -> bool {
        matches!(self.scorer, ActiveScorer::Model(_))
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    pub fn min_probability(&self) -> f64 {
        self.min_probability
    }

    pub fn evaluate(&self, signal: &RawSignal) -> Result<ScoreResult, ScoringError> {
        // Built in both modes so an invalid signal is rejected the same way
        let features = features::build(signal)?;

        let probability = match &self.scorer {
            ActiveScorer::Model(model) => {
                let p = model
                    .predict_probability(&features)
                    .map_err(ScoringError::Model)?;
                if !(0.0..=1.0).contains(&p) {
                    return Err(ScoringError::Model(ModelError::InvalidOutput(p)));
                }
                p
            }
            ActiveScorer::RuleBased(rules) => rules.score(signal),
        };

        Ok(ScoreResult {
            symbol: signal.symbol.clone(),
            side: signal.side,
            probability,
            recommended: probability >= self.min_probability,
            confidence: Confidence::from_probability(probability),
        })
    }
}
