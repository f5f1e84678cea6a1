use std::ops::RangeInclusive;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use common::{
    ChartQuery, Error, Result, StartVariant, TradingConfig, MAX_PAIRS, MAX_PAIRS_SUPER_AGGRESSIVE,
    MIN_PAIRS_SUPER_AGGRESSIVE, SEED_PAIRS,
};

use crate::ConfigChange;

/// Operating cadence of the configuration. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Conservative,
    Aggressive,
    SuperAggressive,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Conservative => write!(f, "conservative"),
            Mode::Aggressive => write!(f, "aggressive"),
            Mode::SuperAggressive => write!(f, "super-aggressive"),
        }
    }
}

/// Refresh intervals for each kind of polled data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceProfile {
    pub status: Duration,
    pub config: Duration,
    pub chart: Duration,
    pub stats: Duration,
}

/// Recommended `risk`/`stop_loss`/`take_profit` ranges for a mode.
/// Advisory only.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBand {
    pub risk: RangeInclusive<f64>,
    pub stop_loss: RangeInclusive<f64>,
    pub take_profit: RangeInclusive<f64>,
}

impl ParameterBand {
    /// Human-readable notes for every parameter outside the band.
    pub fn advisories(&self, config: &TradingConfig) -> Vec<String> {
        [
            ("risk", config.risk, &self.risk),
            ("stop_loss", config.stop_loss, &self.stop_loss),
            ("take_profit", config.take_profit, &self.take_profit),
        ]
        .into_iter()
        .filter(|(_, value, band)| !band.contains(value))
        .map(|(name, value, band)| {
            format!(
                "{name} {value}% is outside the recommended {:.1}–{:.1}%",
                band.start(),
                band.end()
            )
        })
        .collect()
    }
}

/// Lower bounds raised into the start payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterFloors {
    pub risk: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Mode {
    pub fn of(config: &TradingConfig) -> Self {
        if config.super_aggressive_mode {
            Mode::SuperAggressive
        } else if config.aggressive_mode {
            Mode::Aggressive
        } else {
            Mode::Conservative
        }
    }

    pub fn cadence(&self) -> CadenceProfile {
        let secs = Duration::from_secs;
        match self {
            Mode::Conservative => CadenceProfile {
                status: secs(3),
                config: secs(30),
                chart: secs(10),
                stats: secs(15),
            },
            Mode::Aggressive => CadenceProfile {
                status: secs(2),
                config: secs(30),
                chart: secs(5),
                stats: secs(10),
            },
            Mode::SuperAggressive => CadenceProfile {
                status: secs(1),
                config: secs(30),
                chart: secs(2),
                stats: secs(5),
            },
        }
    }

    pub fn chart_query(&self) -> ChartQuery {
        match self {
            Mode::Conservative => ChartQuery {
                timeframe: "1m",
                limit: 100,
                fast: false,
            },
            Mode::Aggressive | Mode::SuperAggressive => ChartQuery {
                timeframe: "1m",
                limit: 60,
                fast: true,
            },
        }
    }

    pub fn parameter_band(&self) -> ParameterBand {
        match self {
            Mode::Conservative => ParameterBand {
                risk: 0.5..=2.0,
                stop_loss: 1.0..=3.0,
                take_profit: 2.0..=5.0,
            },
            Mode::Aggressive => ParameterBand {
                risk: 2.0..=3.5,
                stop_loss: 1.5..=3.0,
                take_profit: 2.0..=4.0,
            },
            Mode::SuperAggressive => ParameterBand {
                risk: 3.0..=5.0,
                stop_loss: 1.5..=2.5,
                take_profit: 2.5..=4.0,
            },
        }
    }

    pub fn start_variant(&self) -> StartVariant {
        match self {
            Mode::Conservative => StartVariant::Standard,
            Mode::Aggressive => StartVariant::Fast,
            Mode::SuperAggressive => StartVariant::SuperAggressive,
        }
    }

    pub fn floors(&self) -> Option<ParameterFloors> {
        match self {
            Mode::Conservative => None,
            Mode::Aggressive => Some(ParameterFloors {
                risk: 2.0,
                stop_loss: 1.5,
                take_profit: 2.0,
            }),
            Mode::SuperAggressive => Some(ParameterFloors {
                risk: 3.0,
                stop_loss: 1.5,
                take_profit: 2.5,
            }),
        }
    }
}

/// The mode / pair-set state machine.
///
/// `apply` is the only way a stored configuration changes: it writes the
/// edited field, runs the mode transition the edit triggers, then
/// re-derives everything else through [`normalize`]. The edited field wins;
/// other fields adapt to it.
pub struct ModeController;

impl ModeController {
    pub fn apply(current: &TradingConfig, change: &ConfigChange) -> Result<TradingConfig> {
        change.validate()?;
        let mut next = current.clone();

        match change {
            ConfigChange::Symbol(symbol) => {
                let symbol = symbol.trim();
                next.symbol = symbol.to_string();
                if next.multi_pair_mode && !symbol.is_empty() {
                    let limit = pair_limit(next.super_aggressive_mode);
                    if !next.symbols.iter().any(|s| s.trim() == symbol)
                        && clean_pairs(&next.symbols).len() >= limit
                    {
                        return Err(Error::Validation(format!(
                            "pair limit reached ({limit}); remove a pair before switching to {symbol}"
                        )));
                    }
                    next.symbols.retain(|s| s.trim() != symbol);
                    next.symbols.insert(0, symbol.to_string());
                }
            }
            ConfigChange::Symbols(list) => {
                next.multi_pair_mode = true;
                next.symbols = list.clone();
            }
            ConfigChange::AddSymbol(pair) => {
                let pair = pair.trim();
                next.multi_pair_mode = true;
                if !next.symbols.iter().any(|s| s.trim() == pair) {
                    let limit = pair_limit(next.super_aggressive_mode);
                    if clean_pairs(&next.symbols).len() >= limit {
                        return Err(Error::Validation(format!(
                            "pair limit reached ({limit}); remove a pair first"
                        )));
                    }
                    next.symbols.push(pair.to_string());
                }
            }
            ConfigChange::RemoveSymbol(pair) => {
                let pair = pair.trim();
                if next.symbols.iter().any(|s| s.trim() == pair) {
                    if !next.multi_pair_mode || clean_pairs(&next.symbols).len() <= 1 {
                        return Err(Error::Validation(
                            "cannot remove the only trading pair".into(),
                        ));
                    }
                    next.symbols.retain(|s| s.trim() != pair);
                }
            }
            ConfigChange::MultiPairMode(on) => {
                next.multi_pair_mode = *on;
                if !on {
                    next.super_aggressive_mode = false;
                }
            }
            ConfigChange::AggressiveMode(on) => {
                next.aggressive_mode = *on;
                if *on {
                    next.super_aggressive_mode = false;
                }
            }
            ConfigChange::SuperAggressiveMode(on) => {
                next.super_aggressive_mode = *on;
                if *on {
                    next.aggressive_mode = false;
                    if !next.multi_pair_mode {
                        next.multi_pair_mode = true;
                        next.symbols = vec![next.symbol.clone()];
                    }
                    next.symbols = seed_pairs(&next.symbols, &next.symbol);
                }
            }
            ConfigChange::Risk(v) => next.risk = *v,
            ConfigChange::StopLoss(v) => next.stop_loss = *v,
            ConfigChange::TakeProfit(v) => next.take_profit = *v,
            ConfigChange::TradeAmount(v) => next.trade_amount = *v,
            ConfigChange::KillSwitchThreshold(v) => next.kill_switch_threshold = *v,
            ConfigChange::StrategyType(v) => next.strategy_type = *v,
            ConfigChange::Exchange(v) => next.exchange = v.trim().to_string(),
            ConfigChange::ApiKey(v) => next.api_key = v.trim().to_string(),
            ConfigChange::ApiSecret(v) => next.api_secret = v.trim().to_string(),
            ConfigChange::TradingMode(v) => next.trading_mode = *v,
            ConfigChange::Leverage(v) => next.leverage = *v,
            ConfigChange::RealMode(v) => next.real_mode = *v,
        }

        let next = normalize(next);
        if Mode::of(&next) != Mode::of(current) {
            debug!(
                field = change.field(),
                from = %Mode::of(current),
                to = %Mode::of(&next),
                "Mode transition"
            );
        }
        Ok(next)
    }
}

/// Re-derive every dependent field so the pair-set and mode invariants hold.
///
/// Pure and idempotent. Applied to every edit and to every configuration
/// fetched from the engine, which may be partial or inconsistent.
pub fn normalize(mut config: TradingConfig) -> TradingConfig {
    config.symbol = config.symbol.trim().to_string();
    config.symbols = clean_pairs(&config.symbols);

    if config.aggressive_mode && config.super_aggressive_mode {
        config.aggressive_mode = false;
    }
    if config.super_aggressive_mode && !config.multi_pair_mode {
        config.multi_pair_mode = true;
    }

    if config.multi_pair_mode {
        if config.symbols.is_empty() && !config.symbol.is_empty() {
            config.symbols.push(config.symbol.clone());
        }
        if let Some(first) = config.symbols.first() {
            config.symbol = first.clone();
        }
    } else {
        if config.symbol.is_empty() {
            if let Some(first) = config.symbols.first() {
                config.symbol = first.clone();
            }
        }
        config.symbols = vec![config.symbol.clone()];
    }

    if config.super_aggressive_mode && config.symbols.len() < MIN_PAIRS_SUPER_AGGRESSIVE {
        config.super_aggressive_mode = false;
    }

    config
        .symbols
        .truncate(pair_limit(config.super_aggressive_mode));

    if config.leverage == 0 {
        config.leverage = 1;
    }
    if config.kill_switch_threshold == 0 {
        config.kill_switch_threshold = 1;
    }

    config
}

/// Describe the first invariant the configuration breaks, if any.
pub fn invariant_violation(config: &TradingConfig) -> Option<&'static str> {
    if config.symbols.is_empty() && !config.multi_pair_mode {
        return Some("single-pair configuration has no pair");
    }
    if !config.multi_pair_mode && config.symbols != [config.symbol.clone()] {
        return Some("single-pair configuration must hold exactly its symbol");
    }
    if config.multi_pair_mode
        && config.symbols.first().is_some_and(|first| *first != config.symbol)
    {
        return Some("primary symbol must lead the pair set");
    }
    if config.aggressive_mode && config.super_aggressive_mode {
        return Some("aggressive and super-aggressive are both on");
    }
    if config.super_aggressive_mode
        && (!config.multi_pair_mode || config.symbols.len() < MIN_PAIRS_SUPER_AGGRESSIVE)
    {
        return Some("super-aggressive needs multi-pair mode and at least 3 pairs");
    }
    let mut seen = std::collections::HashSet::new();
    if !config.symbols.iter().all(|s| seen.insert(s)) {
        return Some("duplicate pair in the pair set");
    }
    if config.symbols.len() > pair_limit(config.super_aggressive_mode) {
        return Some("too many pairs for the active mode");
    }
    None
}

fn pair_limit(super_aggressive: bool) -> usize {
    if super_aggressive {
        MAX_PAIRS_SUPER_AGGRESSIVE
    } else {
        MAX_PAIRS
    }
}

/// Trimmed, non-empty, first occurrence wins.
fn clean_pairs(pairs: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(pairs.len());
    for pair in pairs.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if !out.iter().any(|p| p == pair) {
            out.push(pair.to_string());
        }
    }
    out
}

/// Fill the pair set up to the super-aggressive minimum, keeping existing
/// pairs in order and the primary symbol first.
fn seed_pairs(pairs: &[String], primary: &str) -> Vec<String> {
    let mut out = clean_pairs(pairs);
    let primary = primary.trim();
    if out.is_empty() && !primary.is_empty() {
        out.push(primary.to_string());
    }
    for seed in SEED_PAIRS {
        if out.len() >= MIN_PAIRS_SUPER_AGGRESSIVE {
            break;
        }
        if !out.iter().any(|p| p == seed) {
            out.push(seed.to_string());
        }
    }
    out
}
