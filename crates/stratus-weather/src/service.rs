//! Read-only weather operations backed by the tiered cache.

use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::{self, DEFAULT_DAILY_DAYS, DEFAULT_HOURLY_WINDOW};
use crate::cache::{CacheKey, TieredCache, DEFAULT_TTL};
use crate::error::WeatherError;
use crate::provider::WeatherProvider;
use crate::types::{DailySummary, ForecastSample, Place, WeatherSample};

/// Search queries shorter than this return no results without a request.
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

/// Current weather, forecasts and city search for the UI layer.
pub struct WeatherService {
    provider: WeatherProvider,
    cache: Arc<TieredCache>,
    ttl: Duration,
    hourly_window: usize,
    daily_days: usize,
}

impl WeatherService {
    pub fn new(provider: WeatherProvider, cache: Arc<TieredCache>) -> Self {
        Self {
            provider,
            cache,
            ttl: DEFAULT_TTL,
            hourly_window: DEFAULT_HOURLY_WINDOW,
            daily_days: DEFAULT_DAILY_DAYS,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_hourly_window(mut self, len: usize) -> Self {
        self.hourly_window = len;
        self
    }

    pub fn with_daily_days(mut self, days: usize) -> Self {
        self.daily_days = days;
        self
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    /// Current conditions, cached under `current_<city>`.
    pub async fn current_weather(&self, city: &str) -> Result<WeatherSample, WeatherError> {
        let key = CacheKey::current(city);
        let sample = self
            .cache
            .get(&key, || self.provider.fetch_current(city), self.ttl)
            .await?;
        Ok(sample)
    }

    /// Full 3-hour forecast series, cached under `forecast_<city>`.
    pub async fn forecast(&self, city: &str) -> Result<Vec<ForecastSample>, WeatherError> {
        let key = CacheKey::forecast(city);
        let samples = self
            .cache
            .get(&key, || self.provider.fetch_forecast(city), self.ttl)
            .await?;
        Ok(samples)
    }

    /// The first samples of the forecast series, unmodified.
    pub async fn hourly_forecast(&self, city: &str) -> Result<Vec<ForecastSample>, WeatherError> {
        let samples = self.forecast(city).await?;
        Ok(aggregate::hourly_window(&samples, self.hourly_window).to_vec())
    }

    /// Daily summaries derived from the cached forecast series. Recomputed on
    /// every call; summaries themselves are never cached.
    pub async fn daily_forecast(&self, city: &str) -> Result<Vec<DailySummary>, WeatherError> {
        let samples = self.forecast(city).await?;
        Ok(aggregate::daily_summaries(&samples, self.daily_days))
    }

    /// Places matching `query`. Queries under two characters yield an empty
    /// list and make no request; anything longer is sent as given. Results
    /// are not cached.
    pub async fn search_cities(&self, query: &str) -> Result<Vec<Place>, WeatherError> {
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            tracing::debug!("Search query too short, skipping request");
            return Ok(Vec::new());
        }

        Ok(self.provider.search(query).await?)
    }
}
