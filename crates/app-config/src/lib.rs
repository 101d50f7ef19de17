//! `AppConfig::from_env()` (§10.3): one struct grouping the per-crate option
//! groups enumerated in §6, each defaulted and then selectively overridden
//! from the process environment — the same shape as
//! `trading-agent::config::AgentConfig::from_env`. `dotenvy::dotenv().ok()`
//! is deliberately not called here: it is the binary/test entry point's job
//! to load a `.env` file before this runs, never a library constructor's.

use std::env;

use anyhow::Result;
use cache_manager::CacheConfig;
use data_provider::DataProviderConfig;
use market_context::ContextConfig;
use regime_engine::RegimeEngineConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub data_provider: DataProviderConfig,
    pub regime_engine: RegimeEngineConfig,
    pub context: ContextConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut cache = CacheConfig::default();
        cache.enabled = env::var("CACHE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()?;
        cache.host = env::var("REDIS_HOST").unwrap_or_else(|_| cache.host.clone());
        cache.port = env::var("REDIS_PORT")
            .unwrap_or_else(|_| cache.port.to_string())
            .parse()?;
        cache.password = env::var("REDIS_PASSWORD").ok();
        cache.ttl_seconds = env::var("CACHE_TTL_SECONDS")
            .unwrap_or_else(|_| cache.ttl_seconds.to_string())
            .parse()?;

        let mut data_provider = DataProviderConfig::default();
        data_provider.max_data_points = env::var("MAX_DATA_POINTS")
            .unwrap_or_else(|_| data_provider.max_data_points.to_string())
            .parse()?;

        let mut regime_engine = RegimeEngineConfig::default();
        regime_engine.min_bars = env::var("REGIME_MIN_BARS")
            .unwrap_or_else(|_| regime_engine.min_bars.to_string())
            .parse()?;

        let mut context = ContextConfig::default();
        context.context_timeout_ms = env::var("CONTEXT_TIMEOUT_MS")
            .unwrap_or_else(|_| context.context_timeout_ms.to_string())
            .parse()?;

        Ok(AppConfig {
            cache,
            data_provider,
            regime_engine,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_falls_back_to_documented_defaults_when_unset() {
        for key in [
            "CACHE_ENABLED",
            "REDIS_HOST",
            "REDIS_PORT",
            "REDIS_PASSWORD",
            "CACHE_TTL_SECONDS",
            "MAX_DATA_POINTS",
            "REGIME_MIN_BARS",
            "CONTEXT_TIMEOUT_MS",
        ] {
            env::remove_var(key);
        }
        let config = AppConfig::from_env().unwrap();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.port, 6379);
        assert_eq!(config.regime_engine.min_bars, 60);
        assert_eq!(config.context.context_timeout_ms, 60_000);
    }

    #[test]
    fn from_env_overlays_process_environment() {
        env::set_var("REGIME_MIN_BARS", "80");
        env::set_var("CONTEXT_TIMEOUT_MS", "15000");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.regime_engine.min_bars, 80);
        assert_eq!(config.context.context_timeout_ms, 15_000);
        env::remove_var("REGIME_MIN_BARS");
        env::remove_var("CONTEXT_TIMEOUT_MS");
    }
}
