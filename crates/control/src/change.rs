use common::{Error, Result, StrategyType, TradingMode};

/// One operator edit to the trading configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    Symbol(String),
    Symbols(Vec<String>),
    AddSymbol(String),
    RemoveSymbol(String),
    MultiPairMode(bool),
    AggressiveMode(bool),
    SuperAggressiveMode(bool),
    Risk(f64),
    StopLoss(f64),
    TakeProfit(f64),
    TradeAmount(f64),
    KillSwitchThreshold(u32),
    StrategyType(StrategyType),
    Exchange(String),
    ApiKey(String),
    ApiSecret(String),
    TradingMode(TradingMode),
    Leverage(u32),
    RealMode(bool),
}

/// Field names accepted by [`ConfigChange::parse`].
pub const FIELDS: &[&str] = &[
    "symbol",
    "symbols",
    "add_symbol",
    "remove_symbol",
    "multi_pair_mode",
    "aggressive_mode",
    "super_aggressive_mode",
    "risk",
    "stop_loss",
    "take_profit",
    "trade_amount",
    "kill_switch_threshold",
    "strategy_type",
    "exchange",
    "api_key",
    "api_secret",
    "trading_mode",
    "leverage",
    "real_mode",
];

impl ConfigChange {
    /// Parse an operator-supplied `field value` pair.
    ///
    /// Field names follow the configuration's wire names. `symbols` takes a
    /// comma-separated list.
    pub fn parse(field: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        let change = match field.trim().to_lowercase().as_str() {
            "symbol" => ConfigChange::Symbol(value.to_string()),
            "symbols" => ConfigChange::Symbols(
                value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            "add_symbol" => ConfigChange::AddSymbol(value.to_string()),
            "remove_symbol" => ConfigChange::RemoveSymbol(value.to_string()),
            "multi_pair_mode" => ConfigChange::MultiPairMode(parse_bool(field, value)?),
            "aggressive_mode" => ConfigChange::AggressiveMode(parse_bool(field, value)?),
            "super_aggressive_mode" => {
                ConfigChange::SuperAggressiveMode(parse_bool(field, value)?)
            }
            "risk" => ConfigChange::Risk(parse_num(field, value)?),
            "stop_loss" => ConfigChange::StopLoss(parse_num(field, value)?),
            "take_profit" => ConfigChange::TakeProfit(parse_num(field, value)?),
            "trade_amount" => ConfigChange::TradeAmount(parse_num(field, value)?),
            "kill_switch_threshold" => ConfigChange::KillSwitchThreshold(parse_num(field, value)?),
            "strategy_type" => ConfigChange::StrategyType(match value.to_lowercase().as_str() {
                "default_ma" | "default" => StrategyType::DefaultMa,
                "custom" => StrategyType::Custom,
                other => {
                    return Err(Error::Validation(format!(
                        "strategy_type must be 'default_ma' or 'custom', got '{other}'"
                    )))
                }
            }),
            "exchange" => ConfigChange::Exchange(value.to_lowercase()),
            "api_key" => ConfigChange::ApiKey(value.to_string()),
            "api_secret" => ConfigChange::ApiSecret(value.to_string()),
            "trading_mode" => ConfigChange::TradingMode(match value.to_lowercase().as_str() {
                "spot" => TradingMode::Spot,
                "futures" => TradingMode::Futures,
                other => {
                    return Err(Error::Validation(format!(
                        "trading_mode must be 'spot' or 'futures', got '{other}'"
                    )))
                }
            }),
            "leverage" => ConfigChange::Leverage(parse_num(field, value)?),
            "real_mode" => ConfigChange::RealMode(parse_bool(field, value)?),
            other => {
                return Err(Error::Validation(format!(
                    "unknown field '{other}' (expected one of: {})",
                    FIELDS.join(", ")
                )))
            }
        };
        change.validate()?;
        Ok(change)
    }

    /// Wire name of the field this change targets.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigChange::Symbol(_) => "symbol",
            ConfigChange::Symbols(_) => "symbols",
            ConfigChange::AddSymbol(_) => "add_symbol",
            ConfigChange::RemoveSymbol(_) => "remove_symbol",
            ConfigChange::MultiPairMode(_) => "multi_pair_mode",
            ConfigChange::AggressiveMode(_) => "aggressive_mode",
            ConfigChange::SuperAggressiveMode(_) => "super_aggressive_mode",
            ConfigChange::Risk(_) => "risk",
            ConfigChange::StopLoss(_) => "stop_loss",
            ConfigChange::TakeProfit(_) => "take_profit",
            ConfigChange::TradeAmount(_) => "trade_amount",
            ConfigChange::KillSwitchThreshold(_) => "kill_switch_threshold",
            ConfigChange::StrategyType(_) => "strategy_type",
            ConfigChange::Exchange(_) => "exchange",
            ConfigChange::ApiKey(_) => "api_key",
            ConfigChange::ApiSecret(_) => "api_secret",
            ConfigChange::TradingMode(_) => "trading_mode",
            ConfigChange::Leverage(_) => "leverage",
            ConfigChange::RealMode(_) => "real_mode",
        }
    }

    /// Value-level checks that do not depend on the current configuration.
    pub fn validate(&self) -> Result<()> {
        match self {
            ConfigChange::Risk(v)
            | ConfigChange::StopLoss(v)
            | ConfigChange::TakeProfit(v)
            | ConfigChange::TradeAmount(v) => {
                if !v.is_finite() || *v <= 0.0 {
                    return Err(Error::Validation(format!(
                        "{} must be a positive number, got {v}",
                        self.field()
                    )));
                }
            }
            ConfigChange::KillSwitchThreshold(0) | ConfigChange::Leverage(0) => {
                return Err(Error::Validation(format!("{} must be at least 1", self.field())));
            }
            ConfigChange::Symbols(list) if list.iter().all(|s| s.trim().is_empty()) => {
                return Err(Error::Validation("symbols needs at least one pair".into()));
            }
            ConfigChange::AddSymbol(s) | ConfigChange::RemoveSymbol(s) if s.trim().is_empty() => {
                return Err(Error::Validation(format!("{} needs a pair", self.field())));
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(Error::Validation(format!(
            "{field} expects true/false, got '{other}'"
        ))),
    }
}

fn parse_num<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| Error::Validation(format!("{field} expects a number, got '{value}'")))
}
