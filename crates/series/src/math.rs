use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Period of the fast moving average line.
pub const FAST_PERIOD: usize = 9;
/// Period of the slow moving average line.
pub const SLOW_PERIOD: usize = 21;

/// Trend amplitude of synthesized series, as a fraction of the base price.
pub const TREND_AMPLITUDE: f64 = 0.005;
/// Length of one full trend cycle, in samples.
pub const TREND_PERIOD: f64 = 63.0;
/// Noise bound of synthesized series, as a fraction of the base price.
pub const NOISE_AMPLITUDE: f64 = 0.001;

/// Simple moving average aligned to the input.
///
/// Output has the same length as `prices`. Index `i` is `None` while fewer
/// than `period` values are available (`i < period - 1`), otherwise the mean
/// of the `period` values ending at `i`. A zero period yields all `None`.
pub fn moving_average(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || prices.len() < period {
        return vec![None; prices.len()];
    }

    let mut out = vec![None; period - 1];
    out.extend(
        prices
            .windows(period)
            .map(|w| Some(w.iter().sum::<f64>() / period as f64)),
    );
    out
}

/// Deterministic stand-in price curve around `base_price`.
///
/// A slow sine trend (`base_price * 0.005` amplitude, ~63 sample period)
/// plus uniform noise bounded by `base_price * 0.001`. `seed_phase` shifts
/// the sine and seeds the noise, so equal inputs always give equal output.
/// Only used when live data is unavailable.
pub fn synthesize_series(base_price: f64, length: usize, seed_phase: f64) -> Vec<f64> {
    let amplitude = base_price * TREND_AMPLITUDE;
    let noise = base_price * NOISE_AMPLITUDE;
    let mut rng = StdRng::seed_from_u64(seed_phase.to_bits());

    (0..length)
        .map(|i| {
            let angle = std::f64::consts::TAU * (i as f64 + seed_phase) / TREND_PERIOD;
            let jitter: f64 = rng.gen_range(-1.0..=1.0);
            base_price + amplitude * angle.sin() + noise * jitter
        })
        .collect()
}
