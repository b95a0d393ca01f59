use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signals::types::RawSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordOrigin {
    Historical,
    Synthetic,
}

/// One closed trade with the indicator snapshot taken at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub signal: RawSignal,
    pub pnl: f64,
    /// Explicit outcome label; when absent the label is `pnl > 0`.
    pub win: Option<bool>,
    pub closed_at: Option<DateTime<Utc>>,
    pub origin: RecordOrigin,
}

impl TrainingRecord {
    pub fn label(&self) -> bool {
        self.win.unwrap_or(self.pnl > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::types::Side;

    fn record(pnl: f64, win: Option<bool>) -> TrainingRecord {
        TrainingRecord {
            signal: RawSignal {
                symbol: "BTCUSDT".to_string(),
                side: Side::Buy,
                rsi: 50.0,
                macd: 0.0,
                macd_signal: 0.0,
                ema_alignment: 0.0,
                atr_percent: 1.0,
                volume_ratio: 1.0,
                cvd: 0.0,
                adx: 20.0,
                price: 100.0,
            },
            pnl,
            win,
            closed_at: None,
            origin: RecordOrigin::Historical,
        }
    }

    #[test]
    fn test_label_from_pnl() {
        assert!(record(12.5, None).label());
        assert!(!record(-3.0, None).label());
        // Break-even is a loss
        assert!(!record(0.0, None).label());
    }

    #[test]
    fn test_explicit_label_wins() {
        assert!(!record(12.5, Some(false)).label());
        assert!(record(-3.0, Some(true)).label());
    }
}
