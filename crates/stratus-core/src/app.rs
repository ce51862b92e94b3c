use anyhow::Result;
use std::sync::Arc;

use stratus_weather::{
    DurableTier, MemoryDurableTier, SqliteDurableTier, SystemClock, TieredCache, WeatherProvider,
    WeatherService,
};

use crate::Config;

/// Main application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    weather: WeatherService,
}

impl App {
    /// Create a new application instance from the on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, _) = Config::load_validated()?;
        Self::from_config(config)
    }

    /// Wire the weather service from an already loaded configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let durable: Arc<dyn DurableTier> = if config.cache.durable {
            std::fs::create_dir_all(&config.config_dir)?;
            let path = config.cache_db_path();
            tracing::debug!("Opening durable cache at {}", path.display());
            Arc::new(SqliteDurableTier::open(&path)?)
        } else {
            tracing::debug!("Durable cache disabled, using in-process tier");
            Arc::new(MemoryDurableTier::new())
        };

        let cache = Arc::new(TieredCache::new(durable, Arc::new(SystemClock)));
        let provider = WeatherProvider::new(config.weather.provider_config())?;
        let weather = WeatherService::new(provider, cache)
            .with_ttl(config.cache.ttl())
            .with_hourly_window(config.weather.hourly_window)
            .with_daily_days(config.weather.daily_days);

        Ok(Self {
            config: Arc::new(config),
            weather,
        })
    }

    /// Drop expired durable rows. Failures are logged and otherwise ignored.
    pub async fn startup(&self) {
        match self.weather.cache().purge_expired().await {
            Ok(0) => {}
            Ok(n) => tracing::info!("Purged {} expired cache entries", n),
            Err(e) => tracing::warn!("Cache purge failed: {}", e),
        }
        tracing::info!("Application initialized successfully");
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn weather(&self) -> &WeatherService {
        &self.weather
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn config_in(dir: &std::path::Path, durable: bool) -> Config {
        let mut config = Config::default();
        config.config_dir = dir.join("stratus");
        config.weather.api_key = "k".to_string();
        config.cache.durable = durable;
        config
    }

    #[tokio::test]
    async fn test_durable_app_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::from_config(config_in(dir.path(), true)).unwrap();
        app.startup().await;

        assert!(app.config().cache_db_path().exists());
        assert_eq!(app.weather().cache().local_len(), 0);
    }

    #[tokio::test]
    async fn test_memory_app_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::from_config(config_in(dir.path(), false)).unwrap();
        app.startup().await;

        assert!(!app.config().cache_db_path().exists());
    }
}
