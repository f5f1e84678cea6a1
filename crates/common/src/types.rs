use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TradingConfig;

/// One OHLCV bucket as returned by the engine's `ohlcv` endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(with = "flexible_ts")]
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Side of an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    #[serde(alias = "BUY")]
    Buy,
    #[serde(alias = "SELL")]
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status the engine reports for a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    #[default]
    Executed,
    Open,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeStatus::Executed => write!(f, "EXECUTED"),
            TradeStatus::Open => write!(f, "OPEN"),
            TradeStatus::Cancelled => write!(f, "CANCELLED"),
            TradeStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A trade recorded by the remote engine. Read-only on this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(with = "flexible_ts")]
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: TradeSide,
    pub price: f64,
    pub size: f64,
    #[serde(default)]
    pub pnl: f64,
    #[serde(default)]
    pub status: TradeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
}

impl Trade {
    pub fn is_executed(&self) -> bool {
        self.status == TradeStatus::Executed
    }

    /// Notional committed to the trade.
    pub fn capital_used(&self) -> f64 {
        self.price * self.size
    }

    /// Return on the committed notional, in percent. Zero when nothing was committed.
    pub fn roi_pct(&self) -> f64 {
        let capital = self.capital_used();
        if capital > 0.0 {
            self.pnl / capital * 100.0
        } else {
            0.0
        }
    }
}

/// One renderable sample of the price chart. Produced only by the series aligner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time_label: String,
    pub price: f64,
    pub fast_ma: f64,
    pub slow_ma: f64,
    /// Position of the source candle in the fetched sequence.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
}

/// A trade pinned onto the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeMarker {
    pub chart_index: usize,
    pub price: f64,
    pub side: TradeSide,
}

/// Which endpoint `start` is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartVariant {
    Standard,
    Fast,
    SuperAggressive,
}

impl StartVariant {
    pub fn path(&self) -> &'static str {
        match self {
            StartVariant::Standard => "/api/start",
            StartVariant::Fast => "/api/start-fast",
            StartVariant::SuperAggressive => "/api/start-super-aggressive",
        }
    }
}

impl std::fmt::Display for StartVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartVariant::Standard => write!(f, "start"),
            StartVariant::Fast => write!(f, "start-fast"),
            StartVariant::SuperAggressive => write!(f, "start-super-aggressive"),
        }
    }
}

/// Engine reply to a start/stop request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}

/// Candle request parameters. Chosen by the active mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartQuery {
    pub timeframe: &'static str,
    pub limit: usize,
    /// Use the faster-cadence OHLCV endpoint.
    pub fast: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    #[serde(default)]
    pub running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub balance: f64,
}

/// Summary the engine computes about its own session. Every field is optional;
/// older engines omit some of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotPerformance {
    #[serde(default)]
    pub total_trades: Option<u64>,
    #[serde(default)]
    pub win_rate: Option<f64>,
    #[serde(default)]
    pub total_pnl: Option<f64>,
    #[serde(default)]
    pub consecutive_losses: Option<u32>,
    #[serde(default)]
    pub kill_switch_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub symbol: String,
    pub years: u32,
    pub risk: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub multi_pair_mode: bool,
    pub symbols: Vec<String>,
    pub aggressive_mode: bool,
}

impl BacktestRequest {
    pub fn from_config(config: &TradingConfig, years: u32) -> Self {
        Self {
            symbol: config.symbol.clone(),
            years,
            risk: config.risk,
            stop_loss: config.stop_loss,
            take_profit: config.take_profit,
            multi_pair_mode: config.multi_pair_mode,
            symbols: config.symbols.clone(),
            aggressive_mode: config.aggressive_mode,
        }
    }
}

/// Backtest output. The engine's report shape is not fixed, so everything
/// besides the optional headline message is kept as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestSummary {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub api_key: String,
    pub api_secret: String,
    pub exchange: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionProbe {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    #[serde(with = "flexible_ts")]
    pub timestamp: DateTime<Utc>,
}

/// Reason a start request was refused before reaching the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartRejection {
    EmptySymbol,
    EmptySymbolSet,
    TooFewPairsForSuperAggressive { have: usize },
}

impl std::fmt::Display for StartRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartRejection::EmptySymbol => write!(f, "select a trading pair before starting"),
            StartRejection::EmptySymbolSet => {
                write!(f, "multi-pair mode needs at least one trading pair")
            }
            StartRejection::TooFewPairsForSuperAggressive { have } => write!(
                f,
                "super-aggressive mode needs at least 3 trading pairs (have {have})"
            ),
        }
    }
}

/// Timestamps arrive as epoch milliseconds from the candle feed and as
/// strings (RFC 3339 or the RFC 2822 form Flask emits) from the trade log.
pub mod flexible_ts {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(ts.timestamp_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(i64),
            Float(f64),
            Text(String),
        }

        match Raw::deserialize(d)? {
            Raw::Millis(ms) => from_millis(ms),
            Raw::Float(ms) => from_millis(ms as i64),
            Raw::Text(s) => parse_text(&s).ok_or_else(|| {
                de::Error::custom(format!("unrecognised timestamp '{s}'"))
            }),
        }
    }

    fn from_millis<E: de::Error>(ms: i64) -> Result<DateTime<Utc>, E> {
        Utc.timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| E::custom(format!("timestamp out of range: {ms}")))
    }

    fn parse_text(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(ms) = s.parse::<i64>() {
            return Utc.timestamp_millis_opt(ms).single();
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }
        // Naive ISO form written by Python's datetime.isoformat()
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
