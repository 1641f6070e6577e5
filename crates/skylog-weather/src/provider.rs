//! Weather provider: one current-conditions lookup per call.
//!
//! `HttpWeatherProvider` talks either to the skylog proxy (which holds the API
//! key) or straight to WeatherAPI with a locally configured key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::types::{SearchParams, WeatherError, WeatherResult};

/// Default WeatherAPI base URL for direct requests.
pub const DEFAULT_API_BASE: &str = "https://api.weatherapi.com";
const USER_AGENT: &str = concat!("skylog/", env!("CARGO_PKG_VERSION"));

/// Source of current weather documents.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch current conditions for the given search.
    async fn current(&self, params: &SearchParams) -> Result<WeatherResult, WeatherError>;
}

/// Where `HttpWeatherProvider` sends its requests.
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// `GET {url}?q=…&type=…` on the skylog proxy.
    Proxy { url: String },
    /// `GET {base_url}/v1/current.json?key=…&q=…` on WeatherAPI.
    Direct { base_url: String, api_key: String },
}

impl Endpoint {
    fn request_url(&self, params: &SearchParams) -> Result<Url, WeatherError> {
        let query = params.query();
        let url = match self {
            Endpoint::Proxy { url } => {
                Url::parse_with_params(url, &[("q", query.as_str()), ("type", params.kind())])
            }
            Endpoint::Direct { base_url, api_key } => Url::parse_with_params(
                &format!("{}/v1/current.json", base_url.trim_end_matches('/')),
                &[("key", api_key.as_str()), ("q", query.as_str())],
            ),
        };
        url.map_err(|e| WeatherError::Endpoint(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct HttpWeatherProvider {
    client: Arc<Client>,
    endpoint: Endpoint,
}

impl HttpWeatherProvider {
    /// Create a provider with the given request timeout.
    ///
    /// # Errors
    /// Returns `WeatherError::Network` if the HTTP client cannot be built.
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl WeatherProvider for HttpWeatherProvider {
    async fn current(&self, params: &SearchParams) -> Result<WeatherResult, WeatherError> {
        let url = self.endpoint.request_url(params)?;
        tracing::debug!("Fetching weather for {:?} ({})", params.query(), params.kind());

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let status = status.as_u16();
            return Err(match provider_message(&body) {
                Some(message) => WeatherError::Provider { status, message },
                None => WeatherError::Status(status),
            });
        }

        let document: Value =
            serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))?;
        if !document.is_object() {
            return Err(WeatherError::Parse("expected a JSON object".into()));
        }

        tracing::info!("Weather fetched for {:?}", params.query());
        Ok(WeatherResult::new(document))
    }
}

/// Pull the provider's own message out of an error body.
///
/// Accepts WeatherAPI's `{"error": {"message": …}}` and the proxy's
/// `{"error": "…"}`.
fn provider_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = match value.get("error")? {
        Value::String(message) => message.as_str(),
        Value::Object(error) => error.get("message")?.as_str()?,
        _ => return None,
    };
    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}
