use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{EngineBackend, Result, TradingConfig};

use crate::cache::ConfigCache;
use crate::mode::{invariant_violation, normalize, Mode, ModeController};
use crate::ConfigChange;

/// Result of refreshing the configuration from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The remote configuration was normalized and adopted.
    Loaded(TradingConfig),
    /// A local change landed while the fetch was in flight; the fetched
    /// value was discarded.
    Superseded,
    /// Local edits have not been saved yet; the fetched value was discarded.
    /// `save` or `reload` clears this.
    LocalPending,
    /// The fetch failed. The in-memory configuration is untouched.
    LoadFailed(String),
}

struct StoreState {
    config: TradingConfig,
    /// Bumped by every successful local change.
    revision: u64,
    /// Revision last saved to or loaded from the engine.
    saved_revision: u64,
}

/// Owner of the operator's trading configuration.
///
/// Cloning is cheap and every clone sees the same configuration.
#[derive(Clone)]
pub struct ConfigStore {
    state: Arc<RwLock<StoreState>>,
    backend: Arc<dyn EngineBackend>,
    cache: Option<ConfigCache>,
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn EngineBackend>) -> Self {
        Self::build(backend, None)
    }

    /// Seed from the cache file if it holds a usable configuration.
    pub fn with_cache(backend: Arc<dyn EngineBackend>, cache: ConfigCache) -> Self {
        Self::build(backend, Some(cache))
    }

    fn build(backend: Arc<dyn EngineBackend>, cache: Option<ConfigCache>) -> Self {
        let config = cache
            .as_ref()
            .and_then(ConfigCache::read)
            .map(normalize)
            .unwrap_or_else(|| normalize(TradingConfig::default()));
        Self {
            state: Arc::new(RwLock::new(StoreState {
                config,
                revision: 0,
                saved_revision: 0,
            })),
            backend,
            cache,
        }
    }

    pub async fn snapshot(&self) -> TradingConfig {
        self.state.read().await.config.clone()
    }

    pub async fn mode(&self) -> Mode {
        Mode::of(&self.state.read().await.config)
    }

    /// Refresh from the engine. Unsaved local edits are kept.
    pub async fn load(&self) -> LoadOutcome {
        self.fetch_and_adopt(false).await
    }

    /// Operator-requested load: adopt the engine's configuration even over
    /// unsaved local edits.
    pub async fn reload(&self) -> LoadOutcome {
        self.fetch_and_adopt(true).await
    }

    /// True while local edits have not reached the engine.
    pub async fn has_pending_edits(&self) -> bool {
        let state = self.state.read().await;
        state.revision != state.saved_revision
    }

    async fn fetch_and_adopt(&self, discard_local: bool) -> LoadOutcome {
        let started_at = self.state.read().await.revision;

        let fetched = match self.backend.fetch_config().await {
            Ok(c) => c,
            Err(e) => {
                warn!("Config load failed: {e}");
                return LoadOutcome::LoadFailed(e.to_string());
            }
        };

        let adopted = {
            let mut state = self.state.write().await;
            if state.revision != started_at {
                debug!(
                    started_at,
                    now = state.revision,
                    "Discarding config fetched before a local change"
                );
                return LoadOutcome::Superseded;
            }
            if !discard_local && state.revision != state.saved_revision {
                debug!(
                    revision = state.revision,
                    saved = state.saved_revision,
                    "Keeping unsaved local config over the engine's copy"
                );
                return LoadOutcome::LocalPending;
            }

            let mut fetched = fetched;
            // The engine may not echo credentials back.
            if fetched.api_key.is_empty() {
                fetched.api_key = state.config.api_key.clone();
            }
            if fetched.api_secret.is_empty() {
                fetched.api_secret = state.config.api_secret.clone();
            }
            if let Some(problem) = invariant_violation(&fetched) {
                debug!(problem, "Repairing remote config");
            }
            state.config = normalize(fetched);
            state.saved_revision = state.revision;
            state.config.clone()
        };

        info!(
            symbol = %adopted.symbol,
            pairs = adopted.symbols.len(),
            mode = %Mode::of(&adopted),
            "Config loaded"
        );
        self.write_cache(&adopted).await;
        LoadOutcome::Loaded(adopted)
    }

    /// Apply one edit. Rejected edits leave the configuration untouched.
    pub async fn change(&self, change: ConfigChange) -> Result<TradingConfig> {
        let mut state = self.state.write().await;
        let next = ModeController::apply(&state.config, &change)?;
        state.config = next.clone();
        state.revision += 1;
        debug!(field = change.field(), revision = state.revision, "Config changed");
        Ok(next)
    }

    /// Send the full configuration to the engine.
    pub async fn save(&self) -> Result<()> {
        let (config, revision) = {
            let state = self.state.read().await;
            (normalize(state.config.clone()), state.revision)
        };
        self.backend.save_config(&config).await?;
        {
            let mut state = self.state.write().await;
            state.saved_revision = state.saved_revision.max(revision);
        }
        info!(symbol = %config.symbol, mode = %Mode::of(&config), "Config saved");
        self.write_cache(&config).await;
        Ok(())
    }

    async fn write_cache(&self, config: &TradingConfig) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(config).await {
                warn!(path = %cache.path().display(), "Config cache write failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper::PaperBackend;
    use std::time::Duration;

    fn store_with(backend: &Arc<PaperBackend>) -> ConfigStore {
        ConfigStore::new(backend.clone())
    }

    #[tokio::test]
    async fn load_normalizes_remote_config() {
        let backend = Arc::new(PaperBackend::new());
        backend
            .set_config(TradingConfig {
                symbol: "".into(),
                symbols: vec!["ETH/USDT".into(), "ETH/USDT".into()],
                aggressive_mode: true,
                super_aggressive_mode: true,
                ..TradingConfig::default()
            })
            .await;
        let store = store_with(&backend);

        let outcome = store.load().await;

        let LoadOutcome::Loaded(cfg) = outcome else {
            panic!("expected Loaded, got {outcome:?}");
        };
        assert!(invariant_violation(&cfg).is_none(), "{cfg:?}");
        assert_eq!(cfg.symbol, "ETH/USDT");
        assert_eq!(store.snapshot().await, cfg);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_config() {
        let backend = Arc::new(PaperBackend::new());
        let store = store_with(&backend);
        store.change(ConfigChange::Risk(2.5)).await.unwrap();
        backend.fail_config(true);

        let outcome = store.load().await;

        assert!(matches!(outcome, LoadOutcome::LoadFailed(_)));
        assert_eq!(store.snapshot().await.risk, 2.5);
    }

    #[tokio::test]
    async fn change_during_load_wins() {
        let backend = Arc::new(PaperBackend::new());
        backend
            .set_config(TradingConfig {
                risk: 9.0,
                ..TradingConfig::default()
            })
            .await;
        backend.set_latency(Duration::from_millis(100));
        let store = store_with(&backend);

        let loader = {
            let store = store.clone();
            tokio::spawn(async move { store.load().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.change(ConfigChange::Risk(1.5)).await.unwrap();

        assert_eq!(loader.await.unwrap(), LoadOutcome::Superseded);
        assert_eq!(store.snapshot().await.risk, 1.5);
    }

    #[tokio::test]
    async fn rejected_change_leaves_config_untouched() {
        let backend = Arc::new(PaperBackend::new());
        let store = store_with(&backend);
        let before = store.snapshot().await;

        assert!(store.change(ConfigChange::StopLoss(-1.0)).await.is_err());
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn save_sends_full_config_and_surfaces_failure() {
        let backend = Arc::new(PaperBackend::new());
        let store = store_with(&backend);
        store
            .change(ConfigChange::SuperAggressiveMode(true))
            .await
            .unwrap();

        store.save().await.unwrap();
        let remote = backend.fetch_config().await.unwrap();
        assert!(remote.super_aggressive_mode);
        assert_eq!(remote.symbols.len(), 3);

        backend.fail_config(true);
        store.change(ConfigChange::Risk(4.0)).await.unwrap();
        let err = store.save().await.unwrap_err();
        assert!(err.is_transport());
        // local edits are not rolled back
        assert_eq!(store.snapshot().await.risk, 4.0);
    }

    #[tokio::test]
    async fn unsaved_edit_survives_refresh_after_failed_save() {
        let backend = Arc::new(PaperBackend::new());
        let store = store_with(&backend);
        store.change(ConfigChange::Risk(4.0)).await.unwrap();
        backend.fail_config(true);
        assert!(store.save().await.is_err());
        backend.fail_config(false);

        assert_eq!(store.load().await, LoadOutcome::LocalPending);
        assert_eq!(store.snapshot().await.risk, 4.0);
        assert!(store.has_pending_edits().await);

        // a successful save clears the pending state
        store.save().await.unwrap();
        assert!(!store.has_pending_edits().await);
        let LoadOutcome::Loaded(cfg) = store.load().await else {
            panic!("expected Loaded after save");
        };
        assert_eq!(cfg.risk, 4.0);
    }

    #[tokio::test]
    async fn reload_discards_unsaved_edits() {
        let backend = Arc::new(PaperBackend::new());
        let store = store_with(&backend);
        store.change(ConfigChange::Risk(4.0)).await.unwrap();

        let LoadOutcome::Loaded(cfg) = store.reload().await else {
            panic!("expected Loaded");
        };
        assert_eq!(cfg.risk, TradingConfig::default().risk);
        assert!(!store.has_pending_edits().await);
    }

    #[tokio::test]
    async fn load_keeps_local_credentials_when_engine_omits_them() {
        let backend = Arc::new(PaperBackend::new());
        let store = store_with(&backend);
        store.change(ConfigChange::ApiKey("k".into())).await.unwrap();
        store.change(ConfigChange::ApiSecret("s".into())).await.unwrap();

        let LoadOutcome::Loaded(cfg) = store.reload().await else {
            panic!("load failed");
        };
        assert!(cfg.has_credentials());
    }

    #[tokio::test]
    async fn cache_seeds_the_store_and_follows_saves() {
        let path = std::env::temp_dir()
            .join(format!("algoconsole-{}", uuid::Uuid::new_v4()))
            .join("config.toml");
        let backend = Arc::new(PaperBackend::new());

        let store = ConfigStore::with_cache(backend.clone(), ConfigCache::new(&path));
        store
            .change(ConfigChange::Symbol("SOL/USDT".into()))
            .await
            .unwrap();
        store.change(ConfigChange::ApiKey("k".into())).await.unwrap();
        store.save().await.unwrap();

        let reopened = ConfigStore::with_cache(backend, ConfigCache::new(&path));
        let cfg = reopened.snapshot().await;
        assert_eq!(cfg.symbol, "SOL/USDT");
        assert!(cfg.api_key.is_empty());
    }
}
