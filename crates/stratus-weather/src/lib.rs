//! Weather service for Stratus
//!
//! Fetches current conditions and 3-hour forecasts from an
//! OpenWeatherMap-compatible API, keeps results in a two-tier cache
//! (process-local + durable SQLite), and derives daily summaries from the
//! forecast series.

pub mod aggregate;
pub mod cache;
pub mod clock;
pub mod durable;
pub mod error;
pub mod provider;
pub mod service;
pub mod types;

pub use aggregate::{daily_summaries, hourly_window, DEFAULT_DAILY_DAYS, DEFAULT_HOURLY_WINDOW};
pub use cache::{CacheKey, TieredCache, DEFAULT_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use durable::{DurableRecord, DurableTier, MemoryDurableTier, SqliteDurableTier};
pub use error::{DurableTierError, FetchError, WeatherError};
pub use provider::{ProviderConfig, WeatherProvider};
pub use service::{WeatherService, MIN_SEARCH_QUERY_LEN};
pub use types::*;
