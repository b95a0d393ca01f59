use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(ValidationError::InvalidSide(other.to_string())),
        }
    }
}

/// A proposed trade and its indicator snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    pub symbol: String,
    pub side: Side,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    /// Distance from EMA as %
    pub ema_alignment: f64,
    /// ATR as % of price
    pub atr_percent: f64,
    /// Current volume / average volume
    pub volume_ratio: f64,
    /// Cumulative volume delta
    pub cvd: f64,
    pub adx: f64,
    pub price: f64,
}

impl RawSignal {
    /// Every numeric field with its wire name, in request order.
    pub fn numeric_fields(&self) -> [(&'static str, f64); 9] {
        [
            ("rsi", self.rsi),
            ("macd", self.macd),
            ("macd_signal", self.macd_signal),
            ("ema_alignment", self.ema_alignment),
            ("atr_percent", self.atr_percent),
            ("volume_ratio", self.volume_ratio),
            ("cvd", self.cvd),
            ("adx", self.adx),
            ("price", self.price),
        ]
    }

    /// Reject NaN and infinite indicators, reporting the first offender.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.numeric_fields().into_iter().find(|(_, v)| !v.is_finite()) {
            Some((field, value)) => Err(ValidationError::NonFinite { field, value }),
            None => Ok(()),
        }
    }
}

/// Wire form of a scoring request. `side` stays a string until validated so
/// that an unknown side is reported as a validation failure, not a decode one.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalRequest {
    pub symbol: String,
    pub side: String,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub ema_alignment: f64,
    pub atr_percent: f64,
    pub volume_ratio: f64,
    pub cvd: f64,
    pub adx: f64,
    pub price: f64,
}

impl TryFrom<SignalRequest> for RawSignal {
    type Error = ValidationError;

    fn try_from(req: SignalRequest) -> Result<Self, Self::Error> {
        let signal = RawSignal {
            side: req.side.parse()?,
            symbol: req.symbol,
            rsi: req.rsi,
            macd: req.macd,
            macd_signal: req.macd_signal,
            ema_alignment: req.ema_alignment,
            atr_percent: req.atr_percent,
            volume_ratio: req.volume_ratio,
            cvd: req.cvd,
            adx: req.adx,
            price: req.price,
        };
        signal.validate()?;
        Ok(signal)
    }
}

/// Column names of the feature matrix, in order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "rsi",
    "macd",
    "macd_signal",
    "macd_histogram",
    "ema_alignment",
    "atr_percent",
    "volume_ratio",
    "cvd",
    "adx",
    "side_encoded",
];

pub const FEATURE_COUNT: usize = 10;

/// Ordered model input. Only constructed through `features::build`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub(crate) [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.0[idx])
    }

    pub fn names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|n| n.to_string()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Lower bounds are closed: 0.8 is HIGH, 0.6 is MEDIUM.
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.8 {
            Confidence::High
        } else if probability >= 0.6 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub symbol: String,
    pub side: Side,
    pub probability: f64,
    pub recommended: bool,
    pub confidence: Confidence,
}
