use std::path::PathBuf;
use std::time::Duration;

/// Which `EngineBackend` the console talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The remote engine's HTTP API.
    Http,
    /// In-memory engine, no network.
    Paper,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Http => write!(f, "http"),
            BackendKind::Paper => write!(f, "paper"),
        }
    }
}

/// Console settings loaded from environment variables at startup.
/// Unparsable values cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub backend: BackendKind,
    /// Write-through cache of the trading configuration. Disabled when unset.
    pub cache_path: Option<PathBuf>,
    /// Per-request timeout. `None` keeps the HTTP client's default.
    pub http_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            backend: BackendKind::Http,
            cache_path: None,
            http_timeout: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    /// Loads `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let defaults = Config::default();

        let backend = match optional_env("CONSOLE_BACKEND")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            None | Some("http") => BackendKind::Http,
            Some("paper") => BackendKind::Paper,
            Some(other) => panic!(
                "ERROR: CONSOLE_BACKEND must be 'http' or 'paper', got: '{other}'"
            ),
        };

        let http_timeout = optional_env("CONSOLE_HTTP_TIMEOUT_SECS").map(|v| {
            let secs = v.trim().parse::<u64>().unwrap_or_else(|_| {
                panic!("CONSOLE_HTTP_TIMEOUT_SECS must be a whole number of seconds, got: '{v}'")
            });
            Duration::from_secs(secs)
        });

        Config {
            api_url: optional_env("CONSOLE_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            backend,
            cache_path: optional_env("CONSOLE_CACHE_PATH").map(PathBuf::from),
            http_timeout,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
