use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skylog_core::ProxyConfig;
use url::Url;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("skylog-proxy/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    /// WeatherAPI base URL
    pub upstream: String,
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(config: &ProxyConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            upstream: config.upstream_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WeatherQuery {
    q: Option<String>,
    /// Informational only; logged, not forwarded.
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    api_key: &'static str,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody::new(message))).into_response()
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/weather",
            get(weather)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .with_state(state)
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthData {
        status: "ok",
        api_key: if state.api_key.is_some() {
            "configured"
        } else {
            "missing"
        },
    })
}

async fn weather(State(state): State<AppState>, Query(query): Query<WeatherQuery>) -> Response {
    let Some(api_key) = state.api_key.as_deref() else {
        tracing::error!("weather request rejected: API key is not configured");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "API key is missing");
    };

    let q = match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q,
        _ => return error_response(StatusCode::BAD_REQUEST, "Missing required parameter: q"),
    };

    tracing::info!(q, kind = query.kind.as_deref().unwrap_or("-"), "proxying weather request");

    match forward(&state, api_key, q).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "weather proxy failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Send the lookup to WeatherAPI and translate its answer.
///
/// Success bodies go back untouched. Failures keep the upstream status and are
/// flattened to `{"error": message, "code": code}`.
async fn forward(state: &AppState, api_key: &str, q: &str) -> anyhow::Result<Response> {
    let url = Url::parse_with_params(
        &format!("{}/v1/current.json", state.upstream.trim_end_matches('/')),
        &[("key", api_key), ("q", q)],
    )?;

    let upstream = state.client.get(url).send().await?;
    let status = StatusCode::from_u16(upstream.status().as_u16())?;
    let text = upstream.text().await?;

    if status.is_success() {
        let data: Value = serde_json::from_str(&text)?;
        return Ok((status, Json(data)).into_response());
    }

    tracing::warn!(status = status.as_u16(), "upstream weather request failed");
    Ok((status, Json(upstream_error(&text))).into_response())
}

fn upstream_error(text: &str) -> ErrorBody {
    let parsed: Value = serde_json::from_str(text).unwrap_or(Value::Null);
    let error = &parsed["error"];

    let message = error["message"]
        .as_str()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("Failed to fetch weather data");
    let code = Some(error["code"].clone()).filter(|c| !c.is_null());

    ErrorBody {
        error: message.to_string(),
        code,
    }
}
