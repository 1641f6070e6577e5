//! Location capability for autolocation searches.

use async_trait::async_trait;

use crate::types::{Location, LocationError};

/// Supplies the device's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<Location, LocationError>;
}

/// Location taken from configuration. Unavailable when none is set.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLocation {
    location: Option<Location>,
}

impl ConfiguredLocation {
    pub fn new(location: Option<Location>) -> Self {
        Self { location }
    }
}

#[async_trait]
impl LocationProvider for ConfiguredLocation {
    async fn current_location(&self) -> Result<Location, LocationError> {
        self.location
            .clone()
            .ok_or(LocationError::ServiceUnavailable)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_is_unavailable() {
        let provider = ConfiguredLocation::default();
        assert_eq!(
            provider.current_location().await,
            Err(LocationError::ServiceUnavailable)
        );
    }

    #[tokio::test]
    async fn test_configured_location() {
        let location = Location {
            latitude: 59.91,
            longitude: 10.75,
            accuracy_meters: Some(500.0),
            city_name: Some("Oslo".into()),
        };
        let provider = ConfiguredLocation::new(Some(location.clone()));
        assert_eq!(provider.current_location().await.unwrap(), location);
    }
}
