//! OpenWeatherMap-compatible HTTP client.
//!
//! Normalizes the provider's JSON into [`WeatherSample`], [`ForecastSample`]
//! and [`Place`]. Non-2xx responses and undecodable bodies become
//! [`FetchError`]s; nothing here retries or caches.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{FetchError, WeatherError};
use crate::types::{Coordinates, ForecastSample, Place, WeatherSample};

pub const DEFAULT_API_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_GEO_BASE_URL: &str = "https://api.openweathermap.org/geo/1.0";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const SEARCH_LIMIT: u8 = 5;
const USER_AGENT: &str = concat!("stratus/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the upstream provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_base_url: String,
    pub geo_base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            geo_base_url: DEFAULT_GEO_BASE_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    config: ProviderConfig,
}

impl WeatherProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WeatherError::Client(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    /// Current conditions for a city.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(&self, city: &str) -> Result<WeatherSample, FetchError> {
        let url = format!(
            "{}/weather?q={}&units=metric&appid={}",
            self.config.api_base_url.trim_end_matches('/'),
            urlencoding::encode(city),
            urlencoding::encode(&self.config.api_key),
        );

        let response = self.client.get(&url).send().await?;
        let body: ApiCurrent = handle_response(response).await?;
        Ok(body.into_sample())
    }

    /// The provider's 3-hour forecast series for a city, in provider order.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastSample>, FetchError> {
        let url = format!(
            "{}/forecast?q={}&units=metric&appid={}",
            self.config.api_base_url.trim_end_matches('/'),
            urlencoding::encode(city),
            urlencoding::encode(&self.config.api_key),
        );

        let response = self.client.get(&url).send().await?;
        let body: ApiForecast = handle_response(response).await?;
        Ok(body.into_samples(city))
    }

    /// Places matching a free-text query. The query is forwarded as-is.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &str) -> Result<Vec<Place>, FetchError> {
        let url = format!(
            "{}/direct?q={}&limit={}&appid={}",
            self.config.geo_base_url.trim_end_matches('/'),
            urlencoding::encode(query),
            SEARCH_LIMIT,
            urlencoding::encode(&self.config.api_key),
        );

        let response = self.client.get(&url).send().await?;
        let places: Vec<ApiPlace> = handle_response(response).await?;
        Ok(places.into_iter().map(Place::from).collect())
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FetchError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        tracing::debug!("Provider returned status {}", status);
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct ApiCurrent {
    name: String,
    #[serde(default)]
    sys: ApiSys,
    main: ApiMain,
    #[serde(default)]
    wind: ApiWind,
    #[serde(default)]
    weather: Vec<ApiCondition>,
    dt: i64,
    coord: Option<ApiCoord>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct ApiMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ApiWind {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ApiCondition {
    #[serde(default)]
    id: u16,
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ApiCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct ApiForecast {
    list: Vec<ApiForecastItem>,
    city: Option<ApiCity>,
}

#[derive(Debug, Deserialize)]
struct ApiForecastItem {
    dt: i64,
    main: ApiMain,
    #[serde(default)]
    wind: ApiWind,
    #[serde(default)]
    weather: Vec<ApiCondition>,
    pop: Option<f64>,
    rain: Option<ApiRain>,
    dt_txt: String,
}

#[derive(Debug, Deserialize)]
struct ApiRain {
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiCity {
    name: String,
    #[serde(default)]
    country: String,
    coord: Option<ApiCoord>,
}

#[derive(Debug, Deserialize)]
struct ApiPlace {
    name: String,
    #[serde(default)]
    country: String,
    state: Option<String>,
    lat: f64,
    lon: f64,
}

/// Fields shared by current and forecast payloads.
struct SampleParts<'a> {
    city: String,
    country: String,
    main: &'a ApiMain,
    wind: &'a ApiWind,
    weather: &'a [ApiCondition],
    dt: i64,
}

impl SampleParts<'_> {
    fn build(self) -> WeatherSample {
        let condition = self.weather.first();
        WeatherSample {
            city: self.city,
            country: self.country,
            temp: self.main.temp,
            feels_like: self.main.feels_like,
            temp_min: self.main.temp_min,
            temp_max: self.main.temp_max,
            humidity: self.main.humidity.round().clamp(0.0, 100.0) as u8,
            pressure: self.main.pressure.round().max(0.0) as u32,
            wind_speed: self.wind.speed,
            wind_deg: self.wind.deg.round().rem_euclid(360.0) as u16,
            condition_code: condition.map(|c| c.id).unwrap_or_default(),
            condition_group: condition.map(|c| c.main.clone()).unwrap_or_default(),
            icon: condition.map(|c| c.icon.clone()).unwrap_or_default(),
            description: condition.map(|c| c.description.clone()).unwrap_or_default(),
            dt: self.dt,
            pop: None,
            rain: None,
            coordinates: None,
        }
    }
}

impl ApiCurrent {
    fn into_sample(self) -> WeatherSample {
        let mut sample = SampleParts {
            city: self.name.clone(),
            country: self.sys.country.clone(),
            main: &self.main,
            wind: &self.wind,
            weather: &self.weather,
            dt: self.dt,
        }
        .build();
        sample.coordinates = self.coord.map(|c| Coordinates { lat: c.lat, lon: c.lon });
        sample
    }
}

impl ApiForecast {
    fn into_samples(self, requested_city: &str) -> Vec<ForecastSample> {
        let (city, country, coordinates) = match &self.city {
            Some(c) => (
                c.name.clone(),
                c.country.clone(),
                c.coord.map(|c| Coordinates { lat: c.lat, lon: c.lon }),
            ),
            None => (requested_city.to_string(), String::new(), None),
        };

        self.list
            .into_iter()
            .map(|item| {
                let mut sample = SampleParts {
                    city: city.clone(),
                    country: country.clone(),
                    main: &item.main,
                    wind: &item.wind,
                    weather: &item.weather,
                    dt: item.dt,
                }
                .build();
                sample.pop = item.pop;
                sample.rain = item.rain.and_then(|r| r.three_hours);
                sample.coordinates = coordinates;
                ForecastSample {
                    sample,
                    date: item.dt_txt,
                }
            })
            .collect()
    }
}

impl From<ApiPlace> for Place {
    fn from(p: ApiPlace) -> Self {
        Self {
            name: p.name,
            country: p.country,
            state: p.state,
            lat: p.lat,
            lon: p.lon,
        }
    }
}
