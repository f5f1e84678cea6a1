pub mod actions;
pub mod cache;
pub mod change;
pub mod mode;
pub mod start;
pub mod store;

pub use actions::{run_backtest, start_engine, stop_engine, test_connection, DEFAULT_BACKTEST_YEARS};
pub use cache::ConfigCache;
pub use change::{ConfigChange, FIELDS};
pub use mode::{
    invariant_violation, normalize, CadenceProfile, Mode, ModeController, ParameterBand,
    ParameterFloors,
};
pub use start::{validate_for_start, StartRequest};
pub use store::{ConfigStore, LoadOutcome};
