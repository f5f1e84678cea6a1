use thiserror::Error;

use crate::StartRejection;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid value: {0}")]
    Validation(String),

    #[error("Start rejected: {0}")]
    StartRejected(StartRejection),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{0}")]
    Remote(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for failures of the remote call itself (unreachable engine,
    /// non-2xx reply, undecodable body). Read paths recover from these.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Remote(_) | Error::Json(_))
    }

    /// True for failures detected locally before anything was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::StartRejected(_))
    }
}

impl From<StartRejection> for Error {
    fn from(reason: StartRejection) -> Self {
        Error::StartRejected(reason)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
