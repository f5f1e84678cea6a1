use proptest::prelude::*;

use common::{StrategyType, TradingConfig, TradingMode, MAX_PAIRS_SUPER_AGGRESSIVE};
use control::{invariant_violation, normalize, ConfigChange, Mode, ModeController};

const PAIRS: &[&str] = &[
    "BTC/USDT", "ETH/USDT", "ADA/USDT", "SOL/USDT", "DOT/USDT", "XRP/USDT", "BNB/USDT",
    "DOGE/USDT", "AVAX/USDT", "LINK/USDT", "LTC/USDT", "ATOM/USDT", "UNI/USDT", "NEAR/USDT",
    "APT/USDT", "ARB/USDT", "OP/USDT", "FIL/USDT", " ETH/USDT ", "",
];

fn pair() -> impl Strategy<Value = String> {
    prop::sample::select(PAIRS).prop_map(str::to_string)
}

fn change() -> impl Strategy<Value = ConfigChange> {
    prop_oneof![
        pair().prop_map(ConfigChange::Symbol),
        prop::collection::vec(pair(), 0..20).prop_map(ConfigChange::Symbols),
        pair().prop_map(ConfigChange::AddSymbol),
        pair().prop_map(ConfigChange::RemoveSymbol),
        any::<bool>().prop_map(ConfigChange::MultiPairMode),
        any::<bool>().prop_map(ConfigChange::AggressiveMode),
        any::<bool>().prop_map(ConfigChange::SuperAggressiveMode),
        (-1.0f64..10.0).prop_map(ConfigChange::Risk),
        (0.1f64..10.0).prop_map(ConfigChange::StopLoss),
        (0u32..10).prop_map(ConfigChange::Leverage),
        prop_oneof![Just(StrategyType::DefaultMa), Just(StrategyType::Custom)]
            .prop_map(ConfigChange::StrategyType),
        prop_oneof![Just(TradingMode::Spot), Just(TradingMode::Futures)]
            .prop_map(ConfigChange::TradingMode),
    ]
}

fn run(changes: &[ConfigChange]) -> TradingConfig {
    changes
        .iter()
        .fold(normalize(TradingConfig::default()), |cfg, c| {
            ModeController::apply(&cfg, c).unwrap_or(cfg)
        })
}

proptest! {
    #[test]
    fn every_reachable_config_is_consistent(changes in prop::collection::vec(change(), 0..40)) {
        let cfg = run(&changes);
        prop_assert!(invariant_violation(&cfg).is_none(), "{:?} after {:?}", cfg, changes);
        prop_assert!(cfg.symbols.len() <= MAX_PAIRS_SUPER_AGGRESSIVE);
        prop_assert!(!(cfg.aggressive_mode && cfg.super_aggressive_mode));
    }

    #[test]
    fn changes_are_idempotent(
        prefix in prop::collection::vec(change(), 0..20),
        last in change(),
    ) {
        let cfg = run(&prefix);
        if let Ok(once) = ModeController::apply(&cfg, &last) {
            let twice = ModeController::apply(&once, &last).unwrap_or_else(|_| once.clone());
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalize_is_idempotent(
        symbol in pair(),
        symbols in prop::collection::vec(pair(), 0..20),
        multi in any::<bool>(),
        aggressive in any::<bool>(),
        super_aggressive in any::<bool>(),
    ) {
        let raw = TradingConfig {
            symbol,
            symbols,
            multi_pair_mode: multi,
            aggressive_mode: aggressive,
            super_aggressive_mode: super_aggressive,
            ..TradingConfig::default()
        };
        let once = normalize(raw);
        prop_assert_eq!(normalize(once.clone()), once);
    }

    #[test]
    fn enabling_super_aggressive_always_leaves_enough_pairs(
        prefix in prop::collection::vec(change(), 0..20),
    ) {
        let cfg = run(&prefix);
        let sa = ModeController::apply(&cfg, &ConfigChange::SuperAggressiveMode(true)).unwrap();
        prop_assert_eq!(Mode::of(&sa), Mode::SuperAggressive);
        prop_assert!(sa.multi_pair_mode);
        prop_assert!(sa.symbols.len() >= 3);
        if cfg.symbols.len() < 3 {
            prop_assert_eq!(sa.symbols.len(), 3);
        }
    }
}

#[test]
fn super_aggressive_from_single_pair_seeds_defaults() {
    let cfg = TradingConfig {
        symbol: "BTC/USDT".into(),
        symbols: vec!["BTC/USDT".into()],
        multi_pair_mode: false,
        ..TradingConfig::default()
    };

    let next = ModeController::apply(&cfg, &ConfigChange::SuperAggressiveMode(true)).unwrap();

    assert!(next.multi_pair_mode);
    assert!(next.super_aggressive_mode);
    assert!(!next.aggressive_mode);
    assert_eq!(next.symbols, vec!["BTC/USDT", "ETH/USDT", "ADA/USDT"]);
}
