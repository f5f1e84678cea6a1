use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{
    Ack, BacktestRequest, BacktestSummary, Balance, BotPerformance, Candle, ChartQuery,
    ConnectionProbe, ConnectionRequest, EngineBackend, EngineStatus, Error, PriceQuote, Result,
    StartVariant, Trade, TradingConfig,
};

/// Client for the trading engine's HTTP API.
pub struct HttpBackend {
    base_url: String,
    http: Client,
}

impl HttpBackend {
    /// `timeout` bounds each whole request; `None` keeps the transport default.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().use_rustls_tls();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String> {
        let resp = request.send().await.map_err(|e| Error::Http(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Remote(error_message(status, &body)));
        }
        Ok(body)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        debug!(%path, "GET");
        let body = self.send(self.http.get(self.url(path)).query(query)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: Option<&B>,
    ) -> Result<T> {
        debug!(%path, "POST");
        let mut request = self.http.post(self.url(path));
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        let body = self.send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl EngineBackend for HttpBackend {
    async fn fetch_config(&self) -> Result<TradingConfig> {
        self.get("/api/config", &[]).await
    }

    async fn save_config(&self, config: &TradingConfig) -> Result<()> {
        let _: serde_json::Value = self.post("/api/config", Some(config)).await?;
        Ok(())
    }

    async fn start(&self, variant: StartVariant, config: &TradingConfig) -> Result<Ack> {
        self.post(variant.path(), Some(config)).await
    }

    async fn stop(&self) -> Result<Ack> {
        self.post::<(), _>("/api/stop", None).await
    }

    async fn backtest(&self, request: &BacktestRequest) -> Result<BacktestSummary> {
        self.post("/api/backtest", Some(request)).await
    }

    async fn trades(&self) -> Result<Vec<Trade>> {
        self.get("/api/trades", &[]).await
    }

    async fn balance(&self) -> Result<Balance> {
        self.get("/api/balance", &[]).await
    }

    async fn status(&self) -> Result<EngineStatus> {
        self.get("/api/status", &[]).await
    }

    async fn bot_performance(&self) -> Result<BotPerformance> {
        self.get("/api/bot-performance", &[]).await
    }

    async fn ohlcv(&self, symbol: &str, query: &ChartQuery) -> Result<Vec<Candle>> {
        let path = if query.fast { "/api/ohlcv-fast" } else { "/api/ohlcv" };
        let limit = query.limit.to_string();
        let request = self.http.get(self.url(path)).query(&[
            ("symbol", symbol),
            ("timeframe", query.timeframe),
            ("limit", limit.as_str()),
        ]);
        debug!(%path, %symbol, limit = query.limit, "GET");
        let body = self.send(request).await?;
        parse_candles(&body)
    }

    async fn current_price(&self, symbol: &str) -> Result<PriceQuote> {
        self.get("/api/current-price", &[("symbol", symbol)]).await
    }

    async fn test_connection(&self, request: &ConnectionRequest) -> Result<ConnectionProbe> {
        self.post("/api/test-connection", Some(request)).await
    }
}

// ─── Response helpers ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CandleBody {
    Bare(Vec<Candle>),
    Wrapped { data: Vec<Candle> },
}

/// The engine's own `{"error": ...}` text when present, otherwise the raw reply.
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(e) if !e.error.trim().is_empty() => e.error,
        _ => format!("HTTP {status}: {body}"),
    }
}

/// Candle replies come either bare or wrapped as `{symbol, timeframe, data}`.
fn parse_candles(body: &str) -> Result<Vec<Candle>> {
    match serde_json::from_str::<CandleBody>(body) {
        Ok(CandleBody::Bare(c)) | Ok(CandleBody::Wrapped { data: c }) => Ok(c),
        Err(_) => Err(Error::Remote(format!("unexpected candle payload: {body}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_text_is_surfaced_verbatim() {
        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"error": "Bot is already running"}"#);
        assert_eq!(msg, "Bot is already running");
    }

    #[test]
    fn non_json_error_falls_back_to_status_and_body() {
        let msg = error_message(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(msg, "HTTP 502 Bad Gateway: upstream down");
    }

    #[test]
    fn candles_parse_bare_and_wrapped() {
        let bare = r#"[{"timestamp": 1700000000000, "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 3}]"#;
        let wrapped = r#"{"symbol": "BTC/USDT", "timeframe": "1m", "data":
            [{"timestamp": 1700000000000, "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 3}]}"#;

        let a = parse_candles(bare).unwrap();
        let b = parse_candles(wrapped).unwrap();

        assert_eq!(a, b);
        assert_eq!(a[0].close, 1.5);
        assert!(parse_candles(r#"{"nope": true}"#).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let backend = HttpBackend::new("http://localhost:5000/", None).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:5000");
        assert_eq!(backend.url("/api/status"), "http://localhost:5000/api/status");
    }

    #[tokio::test]
    async fn unreachable_engine_is_a_transport_error() {
        let backend =
            HttpBackend::new("http://127.0.0.1:9", Some(Duration::from_millis(500))).unwrap();
        let err = backend.status().await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "{err:?}");
        assert!(err.is_transport());
    }
}
