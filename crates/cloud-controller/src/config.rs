//! Connection settings for [`crate::CloudControllerClient`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeout applied to every request unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Resources requested per page of a list endpoint.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// `User-Agent` header sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("routekeeper/", env!("CARGO_PKG_VERSION"));

/// Endpoint, credentials and transport limits.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `https://api.example.com`.
    pub api_url: String,

    /// OAuth access token sent as a bearer token.
    pub access_token: String,

    /// Per-request timeout.
    #[serde(
        default = "default_request_timeout",
        with = "duration_millis",
        rename = "request_timeout_ms"
    )]
    pub request_timeout: Duration,

    /// Page size for list endpoints; clamped to `1..=5000`.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// `User-Agent` header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ClientConfig {
    /// Settings for `api_url` with the default limits.
    pub fn new(api_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            access_token: access_token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

// The token never appears in logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("access_token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("page_size", &self.page_size)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_owned()
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_limits_take_their_defaults() {
        let config: ClientConfig = serde_json::from_str(
            r#"{ "api_url": "https://api.example.com", "access_token": "token" }"#,
        )
        .unwrap();

        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn request_timeout_is_read_in_milliseconds() {
        let config: ClientConfig = serde_json::from_str(
            r#"{ "api_url": "https://api.example.com", "access_token": "token", "request_timeout_ms": 1500 }"#,
        )
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn debug_output_hides_the_token() {
        let config = ClientConfig::new("https://api.example.com", "very-secret");

        let rendered = format!("{config:?}");

        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
