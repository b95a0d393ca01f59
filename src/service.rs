use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::model::{GradientBoostedClassifier, ModelScorer};
use crate::signals::{ActiveScorer, RawSignal, ScoreResult, ScoringPolicy, SignalRequest};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_loaded: bool,
}

/// Request/response orchestration for single-signal scoring.
#[derive(Debug, Clone)]
pub struct SignalService {
    policy: ScoringPolicy,
}

impl SignalService {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    /// Load the model artifact once and pick the scorer for the process
    /// lifetime. A missing or unusable artifact leaves the service in
    /// fallback mode.
    pub fn from_config(config: &ScoringConfig) -> Self {
        let model = load_model(&config.model_path);
        let policy = ScoringPolicy::new(ActiveScorer::from_model(model), config.min_probability);
        info!(
            "Signal service ready: scorer={}, min_probability={:.0}%",
            policy.scorer_name(),
            policy.min_probability() * 100.0
        );
        Self::new(policy)
    }

    pub fn model_loaded(&self) -> bool {
        self.policy.model_loaded()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy",
            model_loaded: self.model_loaded(),
        }
    }

    pub fn predict(&self, request: SignalRequest) -> Result<ScoreResult, ScoringError> {
        let signal = RawSignal::try_from(request)?;
        self.score(&signal)
    }

    pub fn score(&self, signal: &RawSignal) -> Result<ScoreResult, ScoringError> {
        match self.policy.evaluate(signal) {
            Ok(result) => {
                info!(
                    "Signal {} {}: {:.2}% ({})",
                    result.symbol,
                    result.side,
                    result.probability * 100.0,
                    result.confidence
                );
                Ok(result)
            }
            Err(e) => {
                error!("Prediction error for {} {}: {}", signal.symbol, signal.side, e);
                Err(e)
            }
        }
    }
}

/// `None` means fallback mode; load problems are logged, never fatal.
pub fn load_model(path: &str) -> Option<Arc<dyn ModelScorer>> {
    if !Path::new(path).exists() {
        warn!("Model not found at {} - using fallback mode", path);
        return None;
    }

    match GradientBoostedClassifier::load(path) {
        Ok(model) => {
            info!("Model loaded from {}", path);
            Some(Arc::new(model))
        }
        Err(e) => {
            error!("Failed to load model: {} - using fallback mode", e);
            None
        }
    }
}
