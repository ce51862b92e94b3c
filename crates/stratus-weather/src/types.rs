use serde::{Deserialize, Serialize};

/// Temperature unit used for display. Stored values are always Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Celsius temperature into this unit.
    pub fn convert(self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

impl std::str::FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" | "celsius" | "metric" => Ok(Self::Celsius),
            "f" | "fahrenheit" | "imperial" => Ok(Self::Fahrenheit),
            other => Err(format!("unknown temperature unit: {}", other)),
        }
    }
}

/// Weather condition categories mapped from provider condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition id to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_code(code: u16) -> Self {
        match code {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            500..=504 => Self::Rain,
            511 => Self::Sleet, // Freezing rain
            520..=531 => Self::HeavyRain,
            600..=602 | 620..=622 => Self::Snow,
            611..=616 => Self::Sleet,
            701..=781 => Self::Fog,
            800 => Self::Clear,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    /// Short label for terminal output.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::PartlyCloudy => "some clouds",
            Self::Cloudy => "overcast",
            Self::Fog => "mist",
            Self::Drizzle => "drizzle",
            Self::Rain => "rain",
            Self::HeavyRain => "heavy rain",
            Self::Snow => "snow",
            Self::Sleet => "sleet",
            Self::Thunderstorm => "thunder",
        }
    }
}

/// Geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One point-in-time weather observation for a city.
///
/// Temperatures are Celsius; use [`TemperatureUnit::convert`] at display time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub city: String,
    pub country: String,
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Relative humidity, percent
    pub humidity: u8,
    /// Sea-level pressure, hPa
    pub pressure: u32,
    /// m/s
    pub wind_speed: f64,
    /// Meteorological degrees
    pub wind_deg: u16,
    /// Upstream condition id (e.g. 500 = light rain)
    pub condition_code: u16,
    /// Upstream condition group (e.g. "Rain")
    pub condition_group: String,
    pub icon: String,
    pub description: String,
    /// Seconds since the Unix epoch
    pub dt: i64,
    /// Probability of precipitation, 0..=1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop: Option<f64>,
    /// Rain volume for the sample interval, mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl WeatherSample {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_code(self.condition_code)
    }

    /// Temperature in the requested display unit
    pub fn temp_in(&self, unit: TemperatureUnit) -> f64 {
        unit.convert(self.temp)
    }

    pub fn feels_like_in(&self, unit: TemperatureUnit) -> f64 {
        unit.convert(self.feels_like)
    }
}

/// A forecast sample together with the provider's local date string
/// (`"YYYY-MM-DD HH:MM:SS"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    #[serde(flatten)]
    pub sample: WeatherSample,
    pub date: String,
}

impl ForecastSample {
    /// Date portion of [`Self::date`], i.e. everything before the time.
    pub fn day(&self) -> &str {
        self.date
            .split([' ', 'T'])
            .next()
            .unwrap_or(self.date.as_str())
    }
}

/// Aggregated view of one calendar day of forecast samples.
///
/// `representative` is the middle sample of the day with `temp` replaced by
/// the day's mean and `temp_min`/`temp_max` by the day's extremes. Because
/// the mean is taken over `temp` while the extremes come from the
/// per-sample `temp_min`/`temp_max`, `temp_min <= temp <= temp_max` is
/// usual but not guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    /// `YYYY-MM-DD`
    pub date: String,
    pub representative: WeatherSample,
}

impl DailySummary {
    pub fn temp(&self) -> f64 {
        self.representative.temp
    }

    pub fn temp_min(&self) -> f64 {
        self.representative.temp_min
    }

    pub fn temp_max(&self) -> f64 {
        self.representative.temp_max
    }

    pub fn condition(&self) -> WeatherCondition {
        self.representative.condition()
    }
}

/// A city search match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl Place {
    /// "Paris, FR" or "Portland, Oregon, US"
    pub fn label(&self) -> String {
        match &self.state {
            Some(state) if !state.is_empty() => {
                format!("{}, {}, {}", self.name, state, self.country)
            }
            _ => format!("{}, {}", self.name, self.country),
        }
    }
}
