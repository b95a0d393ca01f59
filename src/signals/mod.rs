pub mod features;
pub mod policy;
pub mod rule_based;
pub mod types;

pub use policy::{ActiveScorer, ScoringPolicy, DEFAULT_MIN_PROBABILITY};
pub use rule_based::RuleBasedScorer;
pub use types::{Confidence, FeatureVector, RawSignal, ScoreResult, Side, SignalRequest};
