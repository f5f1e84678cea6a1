pub mod backend;
pub mod config;
pub mod error;
pub mod trading_config;
pub mod types;

pub use backend::EngineBackend;
pub use config::{BackendKind, Config};
pub use error::{Error, Result};
pub use trading_config::*;
pub use types::*;
