use chrono::{DateTime, Utc};
use serde::Serialize;

use common::{Candle, ChartPoint, Trade, TradeMarker};

use crate::math::{moving_average, FAST_PERIOD, SLOW_PERIOD};

/// Chart-ready output of one refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub points: Vec<ChartPoint>,
    pub markers: Vec<TradeMarker>,
}

/// Minute-resolution label a candle or trade is matched on (`HH:MM`, UTC).
pub fn time_label(ts: &DateTime<Utc>) -> String {
    ts.format("%H:%M").to_string()
}

/// Joins a candle series with the trade log.
///
/// Trades are pinned to the first chart point carrying the same `HH:MM`
/// label. The join is display-only: several trades in one minute share a
/// point, trades outside the visible window are dropped, and candles from
/// different days with the same label resolve to the earliest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartBuilder {
    fast_period: usize,
    slow_period: usize,
}

impl Default for ChartBuilder {
    fn default() -> Self {
        Self::new(FAST_PERIOD, SLOW_PERIOD)
    }
}

impl ChartBuilder {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        assert!(
            fast_period >= 1 && slow_period >= 1,
            "moving average periods must be >= 1"
        );
        Self {
            fast_period,
            slow_period,
        }
    }

    /// Fewest candles that still yield at least one chart point.
    pub fn min_candles(&self) -> usize {
        self.fast_period.max(self.slow_period)
    }

    pub fn build(&self, candles: &[Candle], trades: &[Trade]) -> ChartSeries {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let fast = moving_average(&closes, self.fast_period);
        let slow = moving_average(&closes, self.slow_period);

        // Leading points without both averages are never emitted.
        let points: Vec<ChartPoint> = candles
            .iter()
            .enumerate()
            .filter_map(|(index, candle)| {
                Some(ChartPoint {
                    time_label: time_label(&candle.timestamp),
                    price: candle.close,
                    fast_ma: fast[index]?,
                    slow_ma: slow[index]?,
                    index,
                    timestamp: candle.timestamp,
                })
            })
            .collect();

        let markers = trades
            .iter()
            .filter_map(|trade| {
                let label = time_label(&trade.timestamp);
                points
                    .iter()
                    .find(|p| p.time_label == label)
                    .map(|p| TradeMarker {
                        chart_index: p.index,
                        price: trade.price,
                        side: trade.side,
                    })
            })
            .collect();

        ChartSeries { points, markers }
    }
}

/// Build a chart with the default fast/slow periods.
pub fn build_chart(candles: &[Candle], trades: &[Trade]) -> ChartSeries {
    ChartBuilder::default().build(candles, trades)
}

/// Trades belonging to the charted pair.
pub fn trades_for_symbol(trades: &[Trade], symbol: &str) -> Vec<Trade> {
    trades
        .iter()
        .filter(|t| t.symbol == symbol)
        .cloned()
        .collect()
}
