use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::debug;

use common::Candle;

use crate::math::{synthesize_series, TREND_PERIOD};

/// Reference prices for the synthesizer, by base asset.
const REFERENCE_PRICES: &[(&str, f64)] = &[
    ("BTC", 58_000.0),
    ("ETH", 3_500.0),
    ("ADA", 0.5),
    ("SOL", 150.0),
    ("DOT", 25.0),
    ("MATIC", 1.2),
    ("AVAX", 35.0),
    ("LINK", 15.0),
    ("UNI", 8.0),
    ("ATOM", 12.0),
    ("LTC", 95.0),
    ("XRP", 0.6),
    ("DOGE", 0.08),
    ("BNB", 320.0),
    ("TRX", 0.12),
];

const FALLBACK_PRICE: f64 = 100.0;

/// Half-width of the synthetic high/low wick around the candle body.
const WICK: f64 = 0.0005;

/// Base price the synthesizer centres a pair on.
/// `"ETH/USDT"` → ETH reference; unknown assets use 100.
pub fn base_price_for(symbol: &str) -> f64 {
    let base = symbol
        .split(['/', '-', ':'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_uppercase();
    REFERENCE_PRICES
        .iter()
        .find(|(asset, _)| *asset == base)
        .map(|(_, price)| *price)
        .unwrap_or(FALLBACK_PRICE)
}

/// Deterministic fallback candle generator.
///
/// Produces a plausible-looking series when the engine's candle feed is
/// unavailable. Output for a given `(symbol, length, end)` is always the same.
/// Callers must label the result as synthetic.
#[derive(Debug, Clone)]
pub struct DemoDataSynthesizer {
    step: Duration,
}

impl Default for DemoDataSynthesizer {
    fn default() -> Self {
        Self::new(Duration::minutes(1))
    }
}

impl DemoDataSynthesizer {
    pub fn new(step: Duration) -> Self {
        let step = if step <= Duration::zero() {
            Duration::minutes(1)
        } else {
            step
        };
        Self { step }
    }

    /// `length` candles spaced by the step, the last one in the bucket containing `end`.
    pub fn candles(&self, symbol: &str, length: usize, end: DateTime<Utc>) -> Vec<Candle> {
        let step_ms = self.step.num_milliseconds();
        let end_ms = end.timestamp_millis();
        let last_bucket = end_ms - end_ms.rem_euclid(step_ms);
        // Phase follows the wall clock so consecutive refreshes drift along the curve.
        let seed_phase = (last_bucket / step_ms).rem_euclid(TREND_PERIOD as i64) as f64;

        let base = base_price_for(symbol);
        let closes = synthesize_series(base, length, seed_phase);
        debug!(symbol, base, length, "Synthesizing demo candles");

        let mut prev_close: Option<f64> = None;
        closes
            .iter()
            .enumerate()
            .filter_map(|(i, &close)| {
                let offset = (length - 1 - i) as i64 * step_ms;
                let timestamp = Utc.timestamp_millis_opt(last_bucket - offset).single()?;
                let open = prev_close.unwrap_or(close);
                prev_close = Some(close);
                Some(Candle {
                    timestamp,
                    open,
                    high: open.max(close) * (1.0 + WICK),
                    low: open.min(close) * (1.0 - WICK),
                    close,
                    volume: 1_000.0 + 500.0 * ((i as f64 + seed_phase) * 0.7).sin().abs(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 30).unwrap()
    }

    #[test]
    fn reference_prices_by_base_asset() {
        assert_eq!(base_price_for("BTC/USDT"), 58_000.0);
        assert_eq!(base_price_for("eth/usdt"), 3_500.0);
        assert_eq!(base_price_for("DOGE-USD"), 0.08);
        assert_eq!(base_price_for("FOO/USDT"), 100.0);
        assert_eq!(base_price_for(""), 100.0);
    }

    #[test]
    fn candles_end_at_requested_bucket_and_are_spaced() {
        let synth = DemoDataSynthesizer::default();
        let candles = synth.candles("SOL/USDT", 30, at(10, 15));
        assert_eq!(candles.len(), 30);
        assert_eq!(candles.last().unwrap().timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap());
        for pair in candles.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::minutes(1));
            assert_eq!(pair[1].open, pair[0].close);
        }
    }

    #[test]
    fn candles_are_well_formed() {
        let synth = DemoDataSynthesizer::default();
        for c in synth.candles("BTC/USDT", 100, at(9, 0)) {
            assert!(c.low <= c.open.min(c.close));
            assert!(c.high >= c.open.max(c.close));
            assert!(c.volume > 0.0);
        }
    }

    #[test]
    fn same_inputs_same_candles() {
        let synth = DemoDataSynthesizer::default();
        assert_eq!(
            synth.candles("ETH/USDT", 40, at(12, 0)),
            synth.candles("ETH/USDT", 40, at(12, 0))
        );
    }
}
