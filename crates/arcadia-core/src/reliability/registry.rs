use std::collections::HashMap;
use std::sync::Arc;

use arcadia_types::models::{DISCORD_LIMITER, IGDB_LIMITER, STEAM_LIMITER};
use arcadia_types::RateLimitConfig;
use dashmap::DashMap;
use tracing::debug;

use super::SlidingWindowLimiter;

/// One process-wide limiter per named external resource.
///
/// Owned by the composition root; API clients hold `Arc`s to the limiters they use.
#[derive(Debug, Default)]
pub struct RateLimiterRegistry {
    limiters: DashMap<String, Arc<SlidingWindowLimiter>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every limiter named in `limits`.
    pub fn from_config(limits: &HashMap<String, RateLimitConfig>) -> Self {
        let registry = Self::new();
        for (name, config) in limits {
            registry.get_or_insert(name, config);
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<Arc<SlidingWindowLimiter>> {
        self.limiters.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Existing limiter for `name`, or a new one built from `config`.
    pub fn get_or_insert(&self, name: &str, config: &RateLimitConfig) -> Arc<SlidingWindowLimiter> {
        // Fast path: read-only lookup
        if let Some(existing) = self.get(name) {
            return existing;
        }

        let entry = self.limiters.entry(name.to_string()).or_insert_with(|| {
            debug!(limiter = name, max_calls = config.max_calls, period_ms = config.period_ms, "Creating rate limiter");
            Arc::new(SlidingWindowLimiter::from_config(name, config))
        });
        Arc::clone(entry.value())
    }

    /// Steam Web API limiter (100 calls per minute unless configured).
    pub fn steam(&self) -> Arc<SlidingWindowLimiter> {
        self.get_or_insert(STEAM_LIMITER, &RateLimitConfig::steam())
    }

    /// IGDB limiter (4 calls per second unless configured).
    pub fn igdb(&self) -> Arc<SlidingWindowLimiter> {
        self.get_or_insert(IGDB_LIMITER, &RateLimitConfig::igdb())
    }

    /// Discord limiter (50 calls per second unless configured).
    pub fn discord(&self) -> Arc<SlidingWindowLimiter> {
        self.get_or_insert(DISCORD_LIMITER, &RateLimitConfig::discord())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.limiters.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn reset_all(&self) {
        for entry in &self.limiters {
            entry.value().reset();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_named_defaults() {
        let registry = RateLimiterRegistry::new();
        assert_eq!(registry.steam().max_calls(), 100);
        assert_eq!(registry.steam().period(), Duration::from_secs(60));
        assert_eq!(registry.igdb().max_calls(), 4);
        assert_eq!(registry.discord().max_calls(), 50);
        assert_eq!(registry.names(), vec!["discord", "igdb", "steam"]);
    }

    #[test]
    fn test_configured_limits_win() {
        let limits = HashMap::from([(STEAM_LIMITER.to_string(), RateLimitConfig::new(5, 1000))]);
        let registry = RateLimiterRegistry::from_config(&limits);

        assert_eq!(registry.steam().max_calls(), 5);
        assert!(registry.get("rawg").is_none());
    }

    #[test]
    fn test_same_instance_is_shared() {
        let registry = RateLimiterRegistry::new();
        let a = registry.igdb();
        let b = registry.get(IGDB_LIMITER).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        for _ in 0..4 {
            assert!(a.try_acquire());
        }
        assert!(!b.try_acquire());

        registry.reset_all();
        assert!(b.try_acquire());
    }
}
