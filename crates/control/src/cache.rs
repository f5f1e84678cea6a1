use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use common::{Error, Result, TradingConfig};

/// Local TOML copy of the last configuration loaded from or saved to the
/// engine. Credentials are never written.
///
/// ```toml
/// symbol = "BTC/USDT"
/// symbols = ["BTC/USDT"]
/// multi_pair_mode = false
/// risk = 1.0
/// ```
#[derive(Debug, Clone)]
pub struct ConfigCache {
    path: PathBuf,
}

impl ConfigCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached configuration. A missing file is `None`; an unreadable
    /// or corrupt one is logged and also `None`.
    pub fn read(&self) -> Option<TradingConfig> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No config cache yet");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Config cache unreadable: {e}");
                return None;
            }
        };
        match toml::from_str::<TradingConfig>(&content) {
            Ok(config) => Some(config.without_credentials()),
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring corrupt config cache: {e}");
                None
            }
        }
    }

    pub async fn write(&self, config: &TradingConfig) -> Result<()> {
        let body = toml::to_string_pretty(&config.without_credentials())
            .map_err(|e| Error::Cache(e.to_string()))?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.path, body).await?;
        debug!(path = %self.path.display(), "Config cache written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("algoconsole-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[tokio::test]
    async fn round_trips_without_credentials() {
        let cache = ConfigCache::new(scratch_path("config.toml"));
        let cfg = TradingConfig {
            symbol: "ETH/USDT".into(),
            symbols: vec!["ETH/USDT".into()],
            risk: 2.5,
            api_key: "key".into(),
            api_secret: "secret".into(),
            ..TradingConfig::default()
        };

        cache.write(&cfg).await.unwrap();

        let raw = std::fs::read_to_string(cache.path()).unwrap();
        assert!(!raw.contains("secret"));
        let back = cache.read().unwrap();
        assert_eq!(back.symbol, "ETH/USDT");
        assert_eq!(back.risk, 2.5);
        assert!(back.api_key.is_empty());
        assert!(back.api_secret.is_empty());
    }

    #[test]
    fn missing_file_reads_as_none() {
        assert!(ConfigCache::new(scratch_path("absent.toml")).read().is_none());
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let path = scratch_path("corrupt.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "symbol = [not toml").unwrap();
        assert!(ConfigCache::new(path).read().is_none());
    }
}
