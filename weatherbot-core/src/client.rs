use anyhow::Context;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::WeatherQuery;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Upper bound on a single provider call, connection included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The two provider endpoints the bot talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Current,
    Forecast,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Current => "current",
            Endpoint::Forecast => "forecast",
        }
    }

    /// Path segment under the API root.
    fn path(&self) -> &'static str {
        match self {
            Endpoint::Current => "weather",
            Endpoint::Forecast => "forecast",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a provider call produced no usable response.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Nothing usable came back: connection refused, DNS failure, timeout.
    #[error("network failure: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP status {0}")]
    HttpStatus(u16),

    /// The body arrived but is not valid JSON.
    #[error("could not decode provider response: {0}")]
    Decode(String),
}

/// HTTP client for the weather provider.
///
/// Holds no mutable state; a single instance can serve any number of
/// concurrent calls.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client with a custom API root, used by tests to target a local mock.
    pub fn with_base_url(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for the weather provider")?;

        Ok(Self { http, base_url: base_url.into() })
    }

    /// Issue one GET against the given endpoint.
    ///
    /// The decoded body comes back as a raw JSON tree; schema checks happen
    /// later, when the report is built. Every failure mode is a
    /// [`FetchError`] value, never a panic.
    pub async fn fetch(
        &self,
        endpoint: Endpoint,
        query: &WeatherQuery,
    ) -> Result<Value, FetchError> {
        let url = format!("{}/{}", self.base_url, endpoint.path());

        debug!(%endpoint, city = %query.city, "requesting weather data");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", query.city.as_str()),
                ("appid", query.api_key.as_str()),
                ("units", query.units.as_str()),
                ("lang", query.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| FetchError::Network(e.to_string()))?;

        if !status.is_success() {
            debug!(%endpoint, %status, body = %truncate_body(&body), "provider rejected request");
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;

    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
