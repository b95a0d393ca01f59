pub mod booster;
pub mod trainer;

use crate::error::ModelError;
use crate::signals::types::FeatureVector;

pub use booster::GradientBoostedClassifier;
pub use trainer::{BoosterParams, Trainer};

/// A trained binary classifier. Loaded once, then shared read-only between
/// requests.
pub trait ModelScorer: Send + Sync {
    /// Probability (0.0 to 1.0) that the signal wins.
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ModelError>;

    /// Model name/type, for logs
    fn name(&self) -> &str;
}
