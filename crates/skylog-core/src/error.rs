//! Centralized error types for skylog.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the codebase
//! - Provides user-friendly messages suitable for terminal output
//! - Preserves full error context for debugging/logging

use skylog_weather::{LocationError, ParamsError};
use thiserror::Error;

/// Top-level application error type.
///
/// All errors in skylog should be convertible to this type.
/// Use `user_message()` to get a display-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherServiceError),

    #[error("Invalid search: {0}")]
    Search(#[from] ParamsError),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    ///
    /// These messages are designed to be actionable and non-technical.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Search(_) => {
                "Enter a city, or a latitude (-90 to 90) and longitude (-180 to 180)."
            }
        }
    }
}

impl From<skylog_weather::WeatherError> for AppError {
    fn from(err: skylog_weather::WeatherError) -> Self {
        use skylog_weather::WeatherError as E;

        match err {
            E::Params(e) => AppError::Search(e),
            E::Network(e) => AppError::Network(e.into_network_error()),
            E::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
            E::Endpoint(msg) => AppError::Config(ConfigError::Invalid(msg)),
            E::Location(e) => AppError::Weather(WeatherServiceError::LocationUnavailable(e)),
            E::Provider { status, message } => {
                AppError::Weather(WeatherServiceError::from_status(status, Some(message)))
            }
            E::Status(status) => AppError::Weather(WeatherServiceError::from_status(status, None)),
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Weather service errors.
#[derive(Debug, Error)]
pub enum WeatherServiceError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Weather API error: {0}")]
    ApiError(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Current location unavailable: {0}")]
    LocationUnavailable(LocationError),
}

impl WeatherServiceError {
    /// Classify a failed provider response.
    ///
    /// WeatherAPI reports unknown places with 400 and key problems with 401/403.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            400 | 404 => WeatherServiceError::LocationNotFound(
                message.unwrap_or_else(|| format!("HTTP {}", status)),
            ),
            401 | 403 => WeatherServiceError::InvalidApiKey,
            s if s >= 500 && message.is_none() => WeatherServiceError::ServiceUnavailable,
            _ => WeatherServiceError::ApiError(
                message.unwrap_or_else(|| format!("HTTP {}", status)),
            ),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherServiceError::LocationNotFound(_) => "Location not found. Check and try again.",
            WeatherServiceError::ApiError(_) => "Weather service error. Please try again.",
            WeatherServiceError::InvalidApiKey => "Weather API key is invalid. Check settings.",
            WeatherServiceError::ServiceUnavailable => {
                "Weather service unavailable. Please try again later."
            }
            WeatherServiceError::LocationUnavailable(_) => {
                "Your location is unavailable. Set [location] in the config or search by city."
            }
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
