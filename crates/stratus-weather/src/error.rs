//! Weather-specific error types.

use thiserror::Error;

/// Upstream fetch failures. Surfaced to callers unchanged; never cached.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed upstream payload: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Durable cache tier failures. The cache logs and swallows these.
#[derive(Error, Debug)]
pub enum DurableTierError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Errors returned by the weather service.
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl WeatherError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Fetch(FetchError::Status { status: 401, .. }) => {
                "Weather API key is invalid. Check settings.".to_string()
            }
            Self::Fetch(FetchError::Status { status: 404, .. }) => {
                "City not found. Check the name and try again.".to_string()
            }
            Self::Fetch(FetchError::Status { status: 429, .. }) => {
                "Too many weather requests. Please wait a moment.".to_string()
            }
            Self::Fetch(FetchError::Status { status, .. }) if *status >= 500 => {
                "Weather service unavailable. Please try again later.".to_string()
            }
            Self::Fetch(FetchError::Status { status, .. }) => {
                format!("Weather request failed ({}).", status)
            }
            Self::Fetch(FetchError::Network(_)) => {
                "Network error. Check your connection.".to_string()
            }
            Self::Fetch(FetchError::Decode(_)) => {
                "Received unexpected weather data.".to_string()
            }
            Self::Client(_) => "Weather service could not start.".to_string(),
        }
    }

    /// Whether a caller-side retry could plausibly succeed. The service
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(FetchError::Network(e)) => e.is_timeout() || e.is_connect(),
            Self::Fetch(FetchError::Status { status, .. }) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> WeatherError {
        WeatherError::Fetch(FetchError::Status {
            status,
            body: String::new(),
        })
    }

    #[test]
    fn test_error_user_messages() {
        assert!(status(401).user_message().contains("API key"));
        assert!(status(404).user_message().contains("not found"));
        assert!(status(503).user_message().contains("unavailable"));
        assert!(status(418).user_message().contains("418"));
    }

    #[test]
    fn test_client_error_message() {
        let err = WeatherError::Client("tls backend".into());
        assert_eq!(err.user_message(), "Weather service could not start.");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_is_retryable() {
        assert!(status(429).is_retryable());
        assert!(status(502).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!WeatherError::Fetch(FetchError::Decode("x".into())).is_retryable());
    }

    #[test]
    fn test_status_code() {
        let err = FetchError::Status {
            status: 404,
            body: "city not found".into(),
        };
        assert_eq!(err.status_code(), Some(404));
        assert!(err.to_string().contains("city not found"));
        assert_eq!(FetchError::Decode("bad".into()).status_code(), None);
    }
}
