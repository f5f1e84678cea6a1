use serde::{Deserialize, Serialize};

/// Maximum pairs in super-aggressive mode.
pub const MAX_PAIRS_SUPER_AGGRESSIVE: usize = 15;
/// Maximum pairs in every other multi-pair configuration.
pub const MAX_PAIRS: usize = 8;
/// Minimum pairs super-aggressive mode operates on.
pub const MIN_PAIRS_SUPER_AGGRESSIVE: usize = 3;

pub const DEFAULT_SYMBOL: &str = "BTC/USDT";

/// Pairs used to fill the set when super-aggressive mode needs more of them.
pub const SEED_PAIRS: &[&str] = &["BTC/USDT", "ETH/USDT", "ADA/USDT", "SOL/USDT", "DOT/USDT"];

/// Paper account size the engine starts every session with.
pub const STARTING_BALANCE: f64 = 10_000.0;

/// Strategy the remote engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    #[default]
    DefaultMa,
    Custom,
}

impl std::fmt::Display for StrategyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyType::DefaultMa => write!(f, "default_ma"),
            StrategyType::Custom => write!(f, "custom"),
        }
    }
}

/// Market the engine trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    #[default]
    Spot,
    Futures,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Spot => write!(f, "spot"),
            TradingMode::Futures => write!(f, "futures"),
        }
    }
}

/// The operator's trading configuration.
///
/// Fields are public for reading and serialization. Mutation goes through
/// `control::ConfigStore::change`, which keeps the mode and pair-set
/// invariants intact; nothing else in the workspace writes to a stored
/// configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub symbol: String,
    pub symbols: Vec<String>,
    pub multi_pair_mode: bool,
    pub aggressive_mode: bool,
    pub super_aggressive_mode: bool,
    pub risk: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub trade_amount: f64,
    pub kill_switch_threshold: u32,
    pub strategy_type: StrategyType,
    pub exchange: String,
    pub api_key: String,
    pub api_secret: String,
    pub trading_mode: TradingMode,
    pub leverage: u32,
    pub real_mode: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: DEFAULT_SYMBOL.to_string(),
            symbols: vec![DEFAULT_SYMBOL.to_string()],
            multi_pair_mode: false,
            aggressive_mode: false,
            super_aggressive_mode: false,
            risk: 1.0,
            stop_loss: 1.0,
            take_profit: 2.0,
            trade_amount: 100.0,
            kill_switch_threshold: 3,
            strategy_type: StrategyType::DefaultMa,
            exchange: "binance".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            trading_mode: TradingMode::Spot,
            leverage: 1,
            real_mode: false,
        }
    }
}

impl TradingConfig {
    /// The pair charts and status lines are shown for.
    pub fn primary_symbol(&self) -> &str {
        if self.multi_pair_mode {
            self.symbols.first().map(String::as_str).unwrap_or(&self.symbol)
        } else {
            &self.symbol
        }
    }

    /// Copy with credentials blanked, for anything written outside the engine.
    pub fn without_credentials(&self) -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            ..self.clone()
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_secret.trim().is_empty()
    }
}

impl std::fmt::Debug for TradingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(s: &str) -> &'static str {
            if s.is_empty() {
                ""
            } else {
                "***"
            }
        }
        f.debug_struct("TradingConfig")
            .field("symbol", &self.symbol)
            .field("symbols", &self.symbols)
            .field("multi_pair_mode", &self.multi_pair_mode)
            .field("aggressive_mode", &self.aggressive_mode)
            .field("super_aggressive_mode", &self.super_aggressive_mode)
            .field("risk", &self.risk)
            .field("stop_loss", &self.stop_loss)
            .field("take_profit", &self.take_profit)
            .field("trade_amount", &self.trade_amount)
            .field("kill_switch_threshold", &self.kill_switch_threshold)
            .field("strategy_type", &self.strategy_type)
            .field("exchange", &self.exchange)
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .field("trading_mode", &self.trading_mode)
            .field("leverage", &self.leverage)
            .field("real_mode", &self.real_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_payload_fills_defaults() {
        let cfg: TradingConfig =
            serde_json::from_str(r#"{"symbol": "ETH/USDT", "risk": 2.5}"#).unwrap();
        assert_eq!(cfg.symbol, "ETH/USDT");
        assert_eq!(cfg.risk, 2.5);
        // symbols missing on the wire: default until normalized
        assert_eq!(cfg.symbols, vec![DEFAULT_SYMBOL.to_string()]);
        assert_eq!(cfg.trading_mode, TradingMode::Spot);
    }

    #[test]
    fn debug_output_hides_credentials() {
        let cfg = TradingConfig {
            api_key: "key-123".into(),
            api_secret: "secret-456".into(),
            ..TradingConfig::default()
        };
        let out = format!("{cfg:?}");
        assert!(!out.contains("key-123"));
        assert!(!out.contains("secret-456"));
    }

    #[test]
    fn primary_symbol_follows_pair_set_in_multi_mode() {
        let cfg = TradingConfig {
            symbol: "BTC/USDT".into(),
            symbols: vec!["ETH/USDT".into(), "BTC/USDT".into()],
            multi_pair_mode: true,
            ..TradingConfig::default()
        };
        assert_eq!(cfg.primary_symbol(), "ETH/USDT");
    }
}
