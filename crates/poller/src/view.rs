use chrono::{DateTime, Utc};
use serde::Serialize;

use common::{Balance, BotPerformance, PriceQuote, Trade};
use control::Mode;
use series::{ChartSeries, PerformanceStats};

/// Where the charted candles came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    Live,
    /// Generated locally because the engine had no usable candles.
    Synthetic { reason: String },
}

impl DataSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::Synthetic { .. })
    }
}

/// Everything the console renders, as of the latest refresh of each kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LiveView {
    /// Cadence polling runs at; `None` while polling is stopped.
    pub mode: Option<Mode>,
    pub running: bool,
    pub balance: Option<Balance>,
    pub trades: Vec<Trade>,
    pub chart_symbol: String,
    pub chart: ChartSeries,
    pub chart_source: DataSource,
    /// Latest quote for `chart_symbol`; kept when a fetch fails.
    pub current_price: Option<PriceQuote>,
    /// Engine-computed summary; kept from the last successful fetch.
    pub performance: Option<BotPerformance>,
    /// Derived locally from `trades`.
    pub stats: PerformanceStats,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The view plus the cancellation epoch it is guarded by.
#[derive(Debug, Default)]
pub(crate) struct ViewState {
    pub(crate) view: LiveView,
    pub(crate) epoch: u64,
}
