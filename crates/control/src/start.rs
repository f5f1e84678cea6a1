use common::{StartRejection, StartVariant, TradingConfig, MIN_PAIRS_SUPER_AGGRESSIVE};

use crate::mode::Mode;

/// Refuse configurations the engine cannot start with.
pub fn validate_for_start(config: &TradingConfig) -> Result<(), StartRejection> {
    if config.multi_pair_mode {
        if config.symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(StartRejection::EmptySymbolSet);
        }
    } else if config.symbol.trim().is_empty() {
        return Err(StartRejection::EmptySymbol);
    }
    if config.super_aggressive_mode && config.symbols.len() < MIN_PAIRS_SUPER_AGGRESSIVE {
        return Err(StartRejection::TooFewPairsForSuperAggressive {
            have: config.symbols.len(),
        });
    }
    Ok(())
}

/// What gets sent to the engine on start.
///
/// The payload is a copy of the stored configuration with the mode's
/// parameter floors applied. The stored configuration keeps the operator's
/// values.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub variant: StartVariant,
    pub config: TradingConfig,
}

impl StartRequest {
    pub fn for_config(config: &TradingConfig) -> Self {
        let mode = Mode::of(config);
        let mut payload = config.clone();
        if let Some(floors) = mode.floors() {
            payload.risk = payload.risk.max(floors.risk);
            payload.stop_loss = payload.stop_loss.max(floors.stop_loss);
            payload.take_profit = payload.take_profit.max(floors.take_profit);
        }
        Self {
            variant: mode.start_variant(),
            config: payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(multi: bool, symbol: &str, symbols: &[&str]) -> TradingConfig {
        TradingConfig {
            multi_pair_mode: multi,
            symbol: symbol.into(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            ..TradingConfig::default()
        }
    }

    #[test]
    fn each_rejection_is_distinct() {
        assert_eq!(
            validate_for_start(&config(false, "", &[""])),
            Err(StartRejection::EmptySymbol)
        );
        assert_eq!(
            validate_for_start(&config(true, "", &[])),
            Err(StartRejection::EmptySymbolSet)
        );
        let mut sa = config(true, "BTC/USDT", &["BTC/USDT", "ETH/USDT"]);
        sa.super_aggressive_mode = true;
        assert_eq!(
            validate_for_start(&sa),
            Err(StartRejection::TooFewPairsForSuperAggressive { have: 2 })
        );
        assert!(validate_for_start(&config(false, "BTC/USDT", &["BTC/USDT"])).is_ok());
    }

    #[test]
    fn super_aggressive_payload_raises_floors_on_a_copy() {
        let mut cfg = config(true, "BTC/USDT", &["BTC/USDT", "ETH/USDT", "ADA/USDT"]);
        cfg.super_aggressive_mode = true;
        cfg.risk = 1.0;
        cfg.stop_loss = 2.0;
        cfg.take_profit = 4.0;

        let req = StartRequest::for_config(&cfg);

        assert_eq!(req.variant, StartVariant::SuperAggressive);
        assert_eq!(req.config.risk, 3.0);
        assert_eq!(req.config.stop_loss, 2.0);
        assert_eq!(req.config.take_profit, 4.0);
        assert_eq!(cfg.risk, 1.0);
    }

    #[test]
    fn aggressive_and_conservative_payloads() {
        let mut cfg = config(false, "BTC/USDT", &["BTC/USDT"]);
        cfg.risk = 1.0;
        cfg.stop_loss = 1.0;
        cfg.take_profit = 1.0;

        let plain = StartRequest::for_config(&cfg);
        assert_eq!(plain.variant, StartVariant::Standard);
        assert_eq!(plain.config.risk, 1.0);

        cfg.aggressive_mode = true;
        let fast = StartRequest::for_config(&cfg);
        assert_eq!(fast.variant, StartVariant::Fast);
        assert_eq!(
            (fast.config.risk, fast.config.stop_loss, fast.config.take_profit),
            (2.0, 1.5, 2.0)
        );
    }
}
