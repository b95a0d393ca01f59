use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::signals::rule_based::confirms;
use crate::signals::types::{RawSignal, Side};
use crate::training::types::{RecordOrigin, TrainingRecord};

pub const SYNTHETIC_SYMBOL: &str = "SYNTHETIC";

/// Bootstrap dataset generator for when real trade outcomes are scarce.
///
/// Indicator values are drawn uniformly from plausible ranges and the outcome
/// is sampled from [`win_probability`]. The random source is injected so a
/// fixed seed always yields the same dataset.
pub struct SyntheticGenerator<R: Rng> {
    rng: R,
}

impl SyntheticGenerator<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SyntheticGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self, samples: usize) -> Vec<TrainingRecord> {
        info!("Generating {} synthetic trades for training...", samples);
        (0..samples).map(|_| self.sample()).collect()
    }

    fn sample(&mut self) -> TrainingRecord {
        let rng = &mut self.rng;

        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let macd = rng.gen_range(-0.5..0.5);
        let signal = RawSignal {
            symbol: SYNTHETIC_SYMBOL.to_string(),
            side,
            rsi: rng.gen_range(20.0..80.0),
            macd,
            macd_signal: macd + rng.gen_range(-0.2..0.2),
            ema_alignment: rng.gen_range(-2.0..2.0),
            atr_percent: rng.gen_range(0.5..3.0),
            volume_ratio: rng.gen_range(0.5..2.0),
            cvd: rng.gen_range(-1000.0..1000.0),
            adx: rng.gen_range(10.0..50.0),
            price: rng.gen_range(20000.0..100000.0),
        };

        let win = rng.gen::<f64>() < win_probability(&signal);
        let pnl = if win {
            rng.gen_range(5.0..50.0)
        } else {
            rng.gen_range(-30.0..-5.0)
        };

        TrainingRecord {
            signal,
            pnl,
            win: Some(win),
            closed_at: None,
            origin: RecordOrigin::Synthetic,
        }
    }
}

/// Ground-truth win probability used to label synthetic trades.
///
/// Deliberately separate from the serving heuristic: it rewards RSI
/// mean-reversion entries, penalises chasing extremes, and weights volume
/// lower.
pub fn win_probability(signal: &RawSignal) -> f64 {
    let mut p = 0.5;

    match signal.side {
        Side::Buy => {
            if signal.rsi < 40.0 {
                p += 0.10;
            } else if signal.rsi > 70.0 {
                p -= 0.15;
            }
        }
        Side::Sell => {
            if signal.rsi > 60.0 {
                p += 0.10;
            } else if signal.rsi < 30.0 {
                p -= 0.15;
            }
        }
    }

    if signal.adx > 25.0 {
        p += 0.15;
    }
    if confirms(signal.side, signal.cvd) {
        p += 0.10;
    }
    if signal.volume_ratio > 1.2 {
        p += 0.05;
    }
    if confirms(signal.side, signal.ema_alignment) {
        p += 0.10;
    }

    p
}
