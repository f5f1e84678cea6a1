pub mod aligner;
pub mod demo;
pub mod math;
pub mod stats;

pub use aligner::{build_chart, time_label, trades_for_symbol, ChartBuilder, ChartSeries};
pub use demo::{base_price_for, DemoDataSynthesizer};
pub use math::{moving_average, synthesize_series, FAST_PERIOD, SLOW_PERIOD};
pub use stats::{latest_trades, PerformanceStats, RECENT_TRADES};
