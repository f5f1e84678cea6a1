use async_trait::async_trait;

use crate::{
    Ack, BacktestRequest, BacktestSummary, Balance, BotPerformance, Candle, ChartQuery,
    ConnectionProbe, ConnectionRequest, EngineStatus, PriceQuote, Result, StartVariant, Trade,
    TradingConfig,
};

/// The request/response boundary to the remote trading engine.
///
/// `remote::HttpBackend` implements this against the engine's HTTP API.
/// `paper::PaperBackend` implements it in memory for offline sessions and tests.
///
/// Only `control::ConfigStore` calls `fetch_config`/`save_config`; everything
/// else on this trait is read-only or an explicit operator action.
#[async_trait]
pub trait EngineBackend: Send + Sync {
    /// Fetch the stored configuration. May be partial; the caller normalizes.
    async fn fetch_config(&self) -> Result<TradingConfig>;

    /// Persist the full configuration.
    async fn save_config(&self, config: &TradingConfig) -> Result<()>;

    /// Start the engine on the given endpoint variant.
    async fn start(&self, variant: StartVariant, config: &TradingConfig) -> Result<Ack>;

    async fn stop(&self) -> Result<Ack>;

    async fn backtest(&self, request: &BacktestRequest) -> Result<BacktestSummary>;

    async fn trades(&self) -> Result<Vec<Trade>>;

    async fn balance(&self) -> Result<Balance>;

    async fn status(&self) -> Result<EngineStatus>;

    async fn bot_performance(&self) -> Result<BotPerformance>;

    /// Candles for `symbol`, oldest first.
    async fn ohlcv(&self, symbol: &str, query: &ChartQuery) -> Result<Vec<Candle>>;

    async fn current_price(&self, symbol: &str) -> Result<PriceQuote>;

    async fn test_connection(&self, request: &ConnectionRequest) -> Result<ConnectionProbe>;
}
