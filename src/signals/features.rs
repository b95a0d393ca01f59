use crate::error::ValidationError;
use crate::signals::types::{FeatureVector, RawSignal, Side};

/// Build the model input for a signal.
///
/// This is the only place features are derived. The training matrix and live
/// scoring both go through here, so column order and derived values can never
/// drift apart.
pub fn build(signal: &RawSignal) -> Result<FeatureVector, ValidationError> {
    signal.validate()?;

    let side_encoded = match signal.side {
        Side::Buy => 1.0,
        Side::Sell => 0.0,
    };

    Ok(FeatureVector([
        signal.rsi,
        signal.macd,
        signal.macd_signal,
        signal.macd - signal.macd_signal,
        signal.ema_alignment,
        signal.atr_percent,
        signal.volume_ratio,
        signal.cvd,
        signal.adx,
        side_encoded,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::types::{FEATURE_COUNT, FEATURE_NAMES};

    fn signal(side: Side) -> RawSignal {
        RawSignal {
            symbol: "BTCUSDT".to_string(),
            side,
            rsi: 55.0,
            macd: 0.25,
            macd_signal: 0.1,
            ema_alignment: -0.4,
            atr_percent: 1.2,
            volume_ratio: 0.9,
            cvd: -350.0,
            adx: 22.0,
            price: 64000.0,
        }
    }

    #[test]
    fn test_feature_layout() {
        let features = build(&signal(Side::Buy)).unwrap();
        assert_eq!(features.as_slice().len(), FEATURE_COUNT);
        assert_eq!(FEATURE_NAMES.len(), FEATURE_COUNT);
        assert_eq!(
            features.as_slice(),
            &[55.0, 0.25, 0.1, 0.25 - 0.1, -0.4, 1.2, 0.9, -350.0, 22.0, 1.0]
        );
    }

    #[test]
    fn test_macd_histogram_and_side() {
        let buy = build(&signal(Side::Buy)).unwrap();
        let sell = build(&signal(Side::Sell)).unwrap();
        assert_eq!(buy.get("macd_histogram"), Some(0.25 - 0.1));
        assert_eq!(buy.get("side_encoded"), Some(1.0));
        assert_eq!(sell.get("side_encoded"), Some(0.0));
        assert_eq!(buy.get("price"), None);
    }

    #[test]
    fn test_build_is_bit_identical() {
        let a = build(&signal(Side::Sell)).unwrap();
        let b = build(&signal(Side::Sell)).unwrap();
        let bits = |f: &FeatureVector| f.as_slice().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_build_rejects_non_finite() {
        let mut s = signal(Side::Buy);
        s.cvd = f64::NEG_INFINITY;
        let err = build(&s).unwrap_err();
        assert_eq!(err.field(), "cvd");
    }
}
