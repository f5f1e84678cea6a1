use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{
    Ack, BacktestRequest, BacktestSummary, Balance, BotPerformance, Candle, ChartQuery,
    ConnectionProbe, ConnectionRequest, EngineBackend, EngineStatus, Error, PriceQuote, Result,
    StartVariant, Trade, TradeSide, TradeStatus, TradingConfig, STARTING_BALANCE,
};

/// In-memory engine.
///
/// Holds a configuration, a running flag, a trade log and per-pair candles.
/// Nothing leaves the process. Each group of endpoints can be switched to
/// fail so callers' recovery paths can be exercised.
#[derive(Default)]
pub struct PaperBackend {
    config: Arc<RwLock<TradingConfig>>,
    running: Arc<RwLock<bool>>,
    trades: Arc<RwLock<Vec<Trade>>>,
    /// Candle history per pair, oldest first.
    candles: Arc<RwLock<HashMap<String, Vec<Candle>>>>,
    last_start: Arc<RwLock<Option<(StartVariant, TradingConfig)>>>,
    calls: Arc<RwLock<HashMap<&'static str, usize>>>,
    fail_config: AtomicBool,
    fail_market: AtomicBool,
    fail_trades: AtomicBool,
    fail_control: AtomicBool,
    latency_ms: AtomicU64,
}

impl PaperBackend {
    pub fn new() -> Self {
        info!(balance = STARTING_BALANCE, "PaperBackend initialized");
        Self::default()
    }

    pub async fn set_config(&self, config: TradingConfig) {
        *self.config.write().await = config;
    }

    pub async fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.candles.write().await.insert(symbol.to_string(), candles);
    }

    /// Append a trade to the log and return its id.
    pub async fn record_trade(
        &self,
        symbol: &str,
        side: TradeSide,
        price: f64,
        size: f64,
        pnl: f64,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.trades.write().await.push(Trade {
            id: Some(id.clone()),
            timestamp: Utc::now(),
            symbol: symbol.to_string(),
            side,
            price,
            size,
            pnl,
            status: TradeStatus::Executed,
            stop_loss: None,
            take_profit: None,
        });
        debug!(%symbol, %side, price, size, pnl, "Paper trade recorded");
        id
    }

    pub async fn push_trade(&self, trade: Trade) {
        self.trades.write().await.push(trade);
    }

    /// Variant and payload of the most recent start request.
    pub async fn last_start(&self) -> Option<(StartVariant, TradingConfig)> {
        self.last_start.read().await.clone()
    }

    /// How many times an endpoint was hit, by method name.
    pub async fn calls(&self, method: &str) -> usize {
        self.calls.read().await.get(method).copied().unwrap_or(0)
    }

    /// `fetch_config` / `save_config`.
    pub fn fail_config(&self, on: bool) {
        self.fail_config.store(on, Ordering::SeqCst);
    }

    /// `ohlcv` / `current_price`.
    pub fn fail_market_data(&self, on: bool) {
        self.fail_market.store(on, Ordering::SeqCst);
    }

    /// `trades` / `bot_performance`.
    pub fn fail_trades(&self, on: bool) {
        self.fail_trades.store(on, Ordering::SeqCst);
    }

    /// `start` / `stop` / `backtest`.
    pub fn fail_control(&self, on: bool) {
        self.fail_control.store(on, Ordering::SeqCst);
    }

    /// Delay applied before every call completes.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn enter(&self, method: &'static str, fail: Option<&AtomicBool>) -> Result<()> {
        *self.calls.write().await.entry(method).or_default() += 1;
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        match fail {
            Some(flag) if flag.load(Ordering::SeqCst) => {
                Err(Error::Http(format!("paper engine: {method} unavailable")))
            }
            _ => Ok(()),
        }
    }

    async fn executed_trades(&self) -> Vec<Trade> {
        self.trades
            .read()
            .await
            .iter()
            .filter(|t| t.is_executed())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EngineBackend for PaperBackend {
    async fn fetch_config(&self) -> Result<TradingConfig> {
        self.enter("fetch_config", Some(&self.fail_config)).await?;
        Ok(self.config.read().await.clone())
    }

    async fn save_config(&self, config: &TradingConfig) -> Result<()> {
        self.enter("save_config", Some(&self.fail_config)).await?;
        *self.config.write().await = config.clone();
        Ok(())
    }

    async fn start(&self, variant: StartVariant, config: &TradingConfig) -> Result<Ack> {
        self.enter("start", Some(&self.fail_control)).await?;
        let mut running = self.running.write().await;
        if *running {
            return Err(Error::Remote("Bot is already running".into()));
        }
        *running = true;
        *self.last_start.write().await = Some((variant, config.clone()));
        info!(%variant, symbol = %config.symbol, "Paper engine started");
        Ok(Ack {
            message: format!("Paper trading started ({variant})"),
        })
    }

    async fn stop(&self) -> Result<Ack> {
        self.enter("stop", Some(&self.fail_control)).await?;
        *self.running.write().await = false;
        info!("Paper engine stopped");
        Ok(Ack {
            message: "Paper trading stopped".into(),
        })
    }

    async fn backtest(&self, request: &BacktestRequest) -> Result<BacktestSummary> {
        self.enter("backtest", Some(&self.fail_control)).await?;
        let mut details = serde_json::Map::new();
        details.insert("symbol".into(), request.symbol.clone().into());
        details.insert("years".into(), request.years.into());
        details.insert("total_trades".into(), 0.into());
        Ok(BacktestSummary {
            message: Some("Paper engine has no historical data; nothing simulated".into()),
            details,
        })
    }

    async fn trades(&self) -> Result<Vec<Trade>> {
        self.enter("trades", Some(&self.fail_trades)).await?;
        Ok(self.trades.read().await.clone())
    }

    async fn balance(&self) -> Result<Balance> {
        self.enter("balance", None).await?;
        let pnl: f64 = self.executed_trades().await.iter().map(|t| t.pnl).sum();
        Ok(Balance {
            balance: STARTING_BALANCE + pnl,
        })
    }

    async fn status(&self) -> Result<EngineStatus> {
        self.enter("status", None).await?;
        Ok(EngineStatus {
            running: *self.running.read().await,
        })
    }

    async fn bot_performance(&self) -> Result<BotPerformance> {
        self.enter("bot_performance", Some(&self.fail_trades)).await?;
        let executed = self.executed_trades().await;
        let wins = executed.iter().filter(|t| t.pnl > 0.0).count();
        let consecutive_losses = executed
            .iter()
            .rev()
            .take_while(|t| t.pnl < 0.0)
            .count() as u32;
        let threshold = self.config.read().await.kill_switch_threshold;
        Ok(BotPerformance {
            total_trades: Some(executed.len() as u64),
            win_rate: (!executed.is_empty())
                .then(|| wins as f64 / executed.len() as f64 * 100.0),
            total_pnl: Some(executed.iter().map(|t| t.pnl).sum()),
            consecutive_losses: Some(consecutive_losses),
            kill_switch_active: Some(consecutive_losses >= threshold),
        })
    }

    async fn ohlcv(&self, symbol: &str, query: &ChartQuery) -> Result<Vec<Candle>> {
        let method = if query.fast { "ohlcv_fast" } else { "ohlcv" };
        self.enter(method, Some(&self.fail_market)).await?;
        let candles = self.candles.read().await;
        let series = candles.get(symbol).map(Vec::as_slice).unwrap_or_default();
        let skip = series.len().saturating_sub(query.limit);
        Ok(series[skip..].to_vec())
    }

    async fn current_price(&self, symbol: &str) -> Result<PriceQuote> {
        self.enter("current_price", Some(&self.fail_market)).await?;
        self.candles
            .read()
            .await
            .get(symbol)
            .and_then(|c| c.last())
            .map(|c| PriceQuote {
                symbol: symbol.to_string(),
                price: c.close,
                timestamp: c.timestamp,
            })
            .ok_or_else(|| Error::Remote(format!("No price available for {symbol}")))
    }

    async fn test_connection(&self, request: &ConnectionRequest) -> Result<ConnectionProbe> {
        self.enter("test_connection", None).await?;
        let ok = !request.api_key.trim().is_empty() && !request.api_secret.trim().is_empty();
        Ok(ConnectionProbe {
            success: ok,
            balance: ok.then_some(STARTING_BALANCE),
            message: Some(if ok {
                format!("Paper connection to {} accepted", request.exchange)
            } else {
                "Missing API credentials".into()
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(minute: i64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(minute),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[tokio::test]
    async fn ohlcv_returns_the_latest_limit_candles() {
        let backend = PaperBackend::new();
        backend
            .set_candles("BTC/USDT", (0..10).map(|m| candle(m, m as f64)).collect())
            .await;
        let query = ChartQuery {
            timeframe: "1m",
            limit: 3,
            fast: false,
        };

        let got = backend.ohlcv("BTC/USDT", &query).await.unwrap();

        assert_eq!(got.iter().map(|c| c.close).collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);
        assert!(backend.ohlcv("ETH/USDT", &query).await.unwrap().is_empty());
        assert_eq!(backend.current_price("BTC/USDT").await.unwrap().price, 9.0);
    }

    #[tokio::test]
    async fn double_start_is_refused() {
        let backend = PaperBackend::new();
        let cfg = TradingConfig::default();
        backend.start(StartVariant::Standard, &cfg).await.unwrap();
        let err = backend.start(StartVariant::Standard, &cfg).await.unwrap_err();
        assert_eq!(err.to_string(), "Bot is already running");
    }

    #[tokio::test]
    async fn balance_and_performance_follow_the_trade_log() {
        let backend = PaperBackend::new();
        backend.record_trade("BTC/USDT", TradeSide::Buy, 100.0, 1.0, 25.0).await;
        backend.record_trade("BTC/USDT", TradeSide::Sell, 100.0, 1.0, -5.0).await;
        backend.record_trade("BTC/USDT", TradeSide::Sell, 100.0, 1.0, -5.0).await;

        assert_eq!(backend.balance().await.unwrap().balance, 10_015.0);
        let perf = backend.bot_performance().await.unwrap();
        assert_eq!(perf.total_trades, Some(3));
        assert_eq!(perf.consecutive_losses, Some(2));
        assert_eq!(perf.kill_switch_active, Some(false));
    }

    #[tokio::test]
    async fn failure_injection_is_scoped() {
        let backend = PaperBackend::new();
        backend.fail_market_data(true);
        let query = ChartQuery {
            timeframe: "1m",
            limit: 60,
            fast: true,
        };
        assert!(backend.ohlcv("BTC/USDT", &query).await.unwrap_err().is_transport());
        assert!(backend.trades().await.is_ok());
        assert_eq!(backend.calls("ohlcv_fast").await, 1);
    }
}
