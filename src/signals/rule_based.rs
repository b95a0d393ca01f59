use crate::signals::types::{RawSignal, Side};

/// Points are hundredths of probability; summed as integers, divided once.
const BASE_POINTS: u32 = 50;

/// Deterministic fallback used when no trained classifier is loaded.
///
/// Starts from 0.5 and only adds points for confirming conditions:
/// 1. RSI momentum band for the side
/// 2. ADX trend strength
/// 3. CVD order flow agreeing with the side
/// 4. Volume above average
/// 5. EMA alignment agreeing with the side
///
/// The result never drops below the base score.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedScorer;

impl RuleBasedScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, signal: &RawSignal) -> f64 {
        let points = BASE_POINTS
            + momentum_points(signal.side, signal.rsi)
            + trend_points(signal.adx)
            + order_flow_points(signal.side, signal.cvd)
            + volume_points(signal.volume_ratio)
            + alignment_points(signal.side, signal.ema_alignment);

        (f64::from(points) / 100.0).clamp(0.0, 1.0)
    }
}

fn momentum_points(side: Side, rsi: f64) -> u32 {
    let in_band = (40.0..=60.0).contains(&rsi);
    match side {
        Side::Buy if in_band => 10,
        // Oversold - good for longs
        Side::Buy if rsi < 30.0 => 5,
        Side::Sell if in_band => 10,
        // Overbought - good for shorts
        Side::Sell if rsi > 70.0 => 5,
        _ => 0,
    }
}

fn trend_points(adx: f64) -> u32 {
    if adx > 25.0 {
        15
    } else if adx > 20.0 {
        8
    } else {
        0
    }
}

fn order_flow_points(side: Side, cvd: f64) -> u32 {
    if confirms(side, cvd) {
        10
    } else {
        0
    }
}

fn volume_points(volume_ratio: f64) -> u32 {
    if volume_ratio > 1.2 {
        10
    } else {
        0
    }
}

fn alignment_points(side: Side, ema_alignment: f64) -> u32 {
    if confirms(side, ema_alignment) {
        10
    } else {
        0
    }
}

/// Positive values confirm longs, negative values confirm shorts. Zero confirms neither.
pub(crate) fn confirms(side: Side, value: f64) -> bool {
    match side {
        Side::Buy => value > 0.0,
        Side::Sell => value < 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::types::Confidence;

    fn neutral(side: Side) -> RawSignal {
        RawSignal {
            symbol: "BTCUSDT".to_string(),
            side,
            rsi: 35.0,
            macd: 0.0,
            macd_signal: 0.0,
            ema_alignment: 0.0,
            atr_percent: 1.0,
            volume_ratio: 1.0,
            cvd: 0.0,
            adx: 10.0,
            price: 1000.0,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_all_confirmations_buy() {
        // Every bonus fires: 0.5 + 0.55 = 1.05, clamped
        let signal = RawSignal {
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            rsi: 50.0,
            macd: 0.1,
            macd_signal: 0.05,
            ema_alignment: 1.0,
            atr_percent: 1.5,
            volume_ratio: 1.5,
            cvd: 100.0,
            adx: 30.0,
            price: 50000.0,
        };
        assert_eq!(RuleBasedScorer::new().score(&signal), 1.0);
    }

    #[test]
    fn test_no_confirmations_sell() {
        let signal = RawSignal {
            rsi: 50.0,
            ..neutral(Side::Sell)
        };
        // RSI 50 is in band for sells too; move it out to get the bare base
        let bare = RawSignal { rsi: 65.0, ..signal.clone() };
        assert_eq!(RuleBasedScorer::new().score(&bare), 0.5);
        assert!(approx(RuleBasedScorer::new().score(&signal), 0.6));
    }

    #[test]
    fn test_momentum_branches() {
        assert_eq!(momentum_points(Side::Buy, 40.0), 10);
        assert_eq!(momentum_points(Side::Buy, 60.0), 10);
        assert_eq!(momentum_points(Side::Buy, 25.0), 5);
        assert_eq!(momentum_points(Side::Buy, 30.0), 0);
        assert_eq!(momentum_points(Side::Buy, 75.0), 0);

        assert_eq!(momentum_points(Side::Sell, 45.0), 10);
        assert_eq!(momentum_points(Side::Sell, 75.0), 5);
        assert_eq!(momentum_points(Side::Sell, 70.0), 0);
        assert_eq!(momentum_points(Side::Sell, 20.0), 0);
    }

    #[test]
    fn test_trend_thresholds_exclusive() {
        assert_eq!(trend_points(30.0), 15);
        assert_eq!(trend_points(25.0), 8);
        assert_eq!(trend_points(21.0), 8);
        assert_eq!(trend_points(20.0), 0);
    }

    #[test]
    fn test_equal_totals_share_confidence_band() {
        let scorer = RuleBasedScorer::new();

        // RSI band + CVD + volume: 0.5 + 0.10 * 3
        let three_tens = RawSignal {
            rsi: 50.0,
            cvd: 100.0,
            volume_ratio: 1.5,
            ..neutral(Side::Buy)
        };
        // Oversold + strong trend + CVD: 0.5 + 0.05 + 0.15 + 0.10
        let mixed = RawSignal {
            rsi: 25.0,
            adx: 30.0,
            cvd: 100.0,
            ..neutral(Side::Buy)
        };
        assert_eq!(scorer.score(&three_tens), 0.8);
        assert_eq!(scorer.score(&mixed), 0.8);
        assert_eq!(Confidence::from_probability(scorer.score(&three_tens)), Confidence::High);
        assert_eq!(Confidence::from_probability(scorer.score(&mixed)), Confidence::High);

        let sell_band = RawSignal { rsi: 50.0, ..neutral(Side::Sell) };
        assert_eq!(scorer.score(&sell_band), 0.6);
        assert_eq!(Confidence::from_probability(scorer.score(&sell_band)), Confidence::Medium);
    }

    #[test]
    fn test_directional_confirmations() {
        let scorer = RuleBasedScorer::new();

        let buy = RawSignal { cvd: 10.0, ema_alignment: 0.5, ..neutral(Side::Buy) };
        assert!(approx(scorer.score(&buy), 0.7));

        let sell = RawSignal { cvd: -10.0, ema_alignment: -0.5, ..neutral(Side::Sell) };
        assert!(approx(scorer.score(&sell), 0.7));

        // Wrong direction earns nothing
        let contrary = RawSignal { cvd: 10.0, ema_alignment: 0.5, ..neutral(Side::Sell) };
        assert_eq!(scorer.score(&contrary), 0.5);
    }

    #[test]
    fn test_volume_confirmation() {
        let scorer = RuleBasedScorer::new();
        let at = RawSignal { volume_ratio: 1.2, ..neutral(Side::Buy) };
        let above = RawSignal { volume_ratio: 1.21, ..neutral(Side::Buy) };
        assert_eq!(scorer.score(&at), 0.5);
        assert!(approx(scorer.score(&above), 0.6));
    }

    #[test]
    fn test_score_bounds_and_determinism() {
        let scorer = RuleBasedScorer::new();
        for side in [Side::Buy, Side::Sell] {
            for rsi in [0.0, 25.0, 35.0, 50.0, 65.0, 80.0, 100.0] {
                for adx in [0.0, 22.0, 40.0] {
                    for cvd in [-500.0, 0.0, 500.0] {
                        for volume_ratio in [0.5, 1.5] {
                            let signal = RawSignal {
                                rsi,
                                adx,
                                cvd,
                                volume_ratio,
                                ema_alignment: cvd / 100.0,
                                ..neutral(side)
                            };
                            let score = scorer.score(&signal);
                            assert!((0.5..=1.0).contains(&score), "score {} out of range", score);
                            assert_eq!(score.to_bits(), scorer.score(&signal).to_bits());
                        }
                    }
                }
            }
        }
    }
}
