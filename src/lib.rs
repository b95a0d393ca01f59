//! Trading signal classifier: scores signals with a trained booster or a
//! rule-based fallback, and trains the booster offline.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod signals;
pub mod training;

pub use error::{DataUnavailableError, ModelError, ScoringError, ValidationError};
pub use service::SignalService;
pub use signals::{Confidence, RawSignal, ScoreResult, Side};
