//! Composition root.
//!
//! Owns every piece of process-wide shared state (per-path locks, named limiters, the
//! shared HTTP session, the browser pool) and hands out references to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arcadia_types::AppConfig;
use tracing::{info, warn};

use crate::clients::{AiClient, ChatContexts, IgdbClient, RawgClient, SteamClient};
use crate::http::SharedHttpClient;
use crate::modules::data_manager::DataManager;
use crate::modules::storage::JsonStore;
use crate::pool::{BrowserManager, ResourcePool};
use crate::reliability::{GuardedCall, RateLimiterRegistry, RetryPolicy};

/// Optional limiter for RAWG; only used when configured.
pub const RAWG_LIMITER: &str = "rawg";
/// Optional limiter for the chat assistant's provider.
pub const AI_LIMITER: &str = "ai";

#[derive(Clone)]
pub struct Services {
    inner: Arc<ServicesInner>,
}

pub struct ServicesInner {
    pub config: AppConfig,
    pub store: JsonStore,
    pub limiters: RateLimiterRegistry,
    pub http: SharedHttpClient,
    pub browsers: ResourcePool<BrowserManager>,
    pub data: DataManager,
    pub steam: SteamClient,
    pub igdb: IgdbClient,
    pub rawg: RawgClient,
    pub ai: AiClient,
    pub chat: ChatContexts,
    shut_down: AtomicBool,
}

impl Services {
    /// Build everything from `config`. Nothing touches the network or disk yet.
    pub fn new(config: AppConfig) -> Self {
        let store = JsonStore::new();
        let limiters = RateLimiterRegistry::from_config(&config.rate_limits);
        let http = SharedHttpClient::new(config.http.clone());
        let policy = RetryPolicy::from(&config.retry);

        let plain = GuardedCall::new(http.clone(), policy);
        let steam = SteamClient::new(
            config.credentials.steam_api_key.clone(),
            plain.clone().with_limiter(limiters.steam()),
        );
        let igdb = IgdbClient::new(
            config.credentials.twitch_client_id.clone(),
            config.credentials.twitch_client_secret.clone(),
            plain.clone().with_limiter(limiters.igdb()),
            plain.clone(),
        );
        let rawg_call = match limiters.get(RAWG_LIMITER) {
            Some(limiter) => plain.clone().with_limiter(limiter),
            None => plain.clone(),
        };
        let rawg = RawgClient::new(config.credentials.rawg_api_key.clone(), rawg_call);
        let ai_call = match limiters.get(AI_LIMITER) {
            Some(limiter) => plain.with_limiter(limiter),
            None => plain,
        };
        let ai = AiClient::from_config(&config.ai, ai_call);

        let browsers =
            ResourcePool::new(BrowserManager::new(&config.browser_pool), config.browser_pool.clone());
        let data = DataManager::new(store.clone(), config.data_dir.clone());

        Self {
            inner: Arc::new(ServicesInner {
                config,
                store,
                limiters,
                http,
                browsers,
                data,
                steam,
                igdb,
                rawg,
                ai,
                chat: ChatContexts::new(),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Save data, close the browser pool and the shared session.
    ///
    /// Returns how many data files failed to save. Only the first call does any work.
    pub async fn shutdown(&self) -> usize {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return 0;
        }

        info!("Shutting down services");
        let failed = self.inner.data.save_all().await;
        if failed > 0 {
            warn!(failed, "Data files not saved during shutdown");
        }
        self.inner.browsers.close_all().await;
        self.inner.http.close().await;
        info!("Services stopped");
        failed
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }
}

impl std::ops::Deref for Services {
    type Target = ServicesInner;

    fn deref(&self) -> &ServicesInner {
        &self.inner
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::modules::data_manager::Document;

    fn config(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::new();
        config.data_dir = dir.to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_limiters_are_shared_with_clients() {
        let dir = tempfile::tempdir().unwrap();
        let services = Services::new(config(dir.path()));

        assert_eq!(services.limiters.names(), vec!["discord", "igdb", "steam"]);
        assert!(!services.steam.is_configured());
        assert!(!services.igdb.is_configured());
        assert!(!services.rawg.is_configured());
        assert!(!services.ai.is_configured());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let services = Services::new(config(dir.path()));
        services.data.mark_seen("post");
        services.http.get_session().await.unwrap();

        assert_eq!(services.shutdown().await, 0);
        assert_eq!(services.shutdown().await, 0);

        assert!(services.is_shut_down());
        assert!(!services.http.is_open().await);
        assert!(!services.browsers.stats().initialized);
        assert!(dir.path().join(Document::SeenRssPosts.file_name()).exists());
    }
}
