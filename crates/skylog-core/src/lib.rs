pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{
    Config, EndpointMode, HistoryConfig, LocationConfig, ProxyConfig, UiConfig, ValidationResult,
    WeatherConfig,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt, WeatherServiceError};

use anyhow::Result;

/// Initialize logging for a skylog process
pub fn init() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("skylog core initialized");
    Ok(())
}
