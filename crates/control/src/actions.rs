//! Operator actions that reach the engine without changing the stored
//! configuration.

use tracing::{info, warn};

use common::{
    Ack, BacktestRequest, BacktestSummary, ConnectionProbe, ConnectionRequest, EngineBackend,
    Error, Result, TradingConfig,
};

use crate::start::{validate_for_start, StartRequest};

pub const DEFAULT_BACKTEST_YEARS: u32 = 1;

/// Validate, apply the mode's floors, send to the matching start endpoint.
pub async fn start_engine(backend: &dyn EngineBackend, config: &TradingConfig) -> Result<Ack> {
    validate_for_start(config)?;
    let request = StartRequest::for_config(config);
    info!(
        variant = %request.variant,
        symbol = %request.config.symbol,
        pairs = request.config.symbols.len(),
        risk = request.config.risk,
        "Starting engine"
    );
    let ack = backend.start(request.variant, &request.config).await.map_err(|e| {
        warn!("Start failed: {e}");
        e
    })?;
    info!(message = %ack.message, "Engine started");
    Ok(ack)
}

pub async fn stop_engine(backend: &dyn EngineBackend) -> Result<Ack> {
    let ack = backend.stop().await?;
    info!(message = %ack.message, "Engine stopped");
    Ok(ack)
}

pub async fn run_backtest(
    backend: &dyn EngineBackend,
    config: &TradingConfig,
    years: Option<u32>,
) -> Result<BacktestSummary> {
    let years = years.unwrap_or(DEFAULT_BACKTEST_YEARS);
    if years == 0 {
        return Err(Error::Validation("backtest needs at least 1 year".into()));
    }
    let request = BacktestRequest::from_config(config, years);
    info!(symbol = %request.symbol, years, "Running backtest");
    backend.backtest(&request).await
}

/// Probe the exchange with the configured credentials.
pub async fn test_connection(
    backend: &dyn EngineBackend,
    config: &TradingConfig,
) -> Result<ConnectionProbe> {
    if !config.has_credentials() {
        return Err(Error::Validation(
            "set api_key and api_secret before testing the connection".into(),
        ));
    }
    let request = ConnectionRequest {
        api_key: config.api_key.clone(),
        api_secret: config.api_secret.clone(),
        exchange: config.exchange.clone(),
    };
    let probe = backend.test_connection(&request).await?;
    info!(exchange = %request.exchange, success = probe.success, "Connection tested");
    Ok(probe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{StartRejection, StartVariant};
    use paper::PaperBackend;

    #[tokio::test]
    async fn rejected_start_never_reaches_the_engine() {
        let backend = PaperBackend::new();
        let cfg = TradingConfig {
            symbol: "".into(),
            symbols: vec!["".into()],
            ..TradingConfig::default()
        };

        let err = start_engine(&backend, &cfg).await.unwrap_err();

        assert!(matches!(
            err,
            Error::StartRejected(StartRejection::EmptySymbol)
        ));
        assert!(backend.last_start().await.is_none());
        assert!(!backend.status().await.unwrap().running);
    }

    #[tokio::test]
    async fn start_sends_floored_payload_to_mode_endpoint() {
        let backend = PaperBackend::new();
        let cfg = TradingConfig {
            aggressive_mode: true,
            risk: 0.5,
            ..TradingConfig::default()
        };

        start_engine(&backend, &cfg).await.unwrap();

        let (variant, sent) = backend.last_start().await.unwrap();
        assert_eq!(variant, StartVariant::Fast);
        assert_eq!(sent.risk, 2.0);
        assert!(backend.status().await.unwrap().running);

        stop_engine(&backend).await.unwrap();
        assert!(!backend.status().await.unwrap().running);
    }

    #[tokio::test]
    async fn backtest_defaults_to_one_year() {
        let backend = PaperBackend::new();
        let summary = run_backtest(&backend, &TradingConfig::default(), None)
            .await
            .unwrap();
        assert_eq!(summary.details.get("years"), Some(&serde_json::json!(1)));
        assert!(run_backtest(&backend, &TradingConfig::default(), Some(0))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn connection_test_needs_credentials() {
        let backend = PaperBackend::new();
        let err = test_connection(&backend, &TradingConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let cfg = TradingConfig {
            api_key: "k".into(),
            api_secret: "s".into(),
            ..TradingConfig::default()
        };
        assert!(test_connection(&backend, &cfg).await.unwrap().success);
    }
}
