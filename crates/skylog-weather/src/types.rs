use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

/// How a pair of coordinates was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateSource {
    #[default]
    Manual,
    Autolocation,
}

/// Parameters of one weather search, as recorded in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SearchParamsRepr", into = "SearchParamsRepr")]
pub enum SearchParams {
    City {
        city: String,
    },
    Coordinates {
        latitude: f64,
        longitude: f64,
        source: CoordinateSource,
    },
}

impl SearchParams {
    pub fn city(name: impl Into<String>) -> Self {
        Self::City { city: name.into() }
    }

    pub fn coordinates(latitude: f64, longitude: f64, source: CoordinateSource) -> Self {
        Self::Coordinates {
            latitude,
            longitude,
            source,
        }
    }

    /// Query string understood by the weather provider: a city name or `"lat,lon"`.
    pub fn query(&self) -> String {
        match self {
            Self::City { city } => city.trim().to_string(),
            Self::Coordinates {
                latitude,
                longitude,
                ..
            } => format!("{},{}", latitude, longitude),
        }
    }

    /// Search type label, as stored in the log and forwarded to the proxy.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::City { .. } => "city",
            Self::Coordinates {
                source: CoordinateSource::Manual,
                ..
            } => "latitude and longitude",
            Self::Coordinates {
                source: CoordinateSource::Autolocation,
                ..
            } => "Autolocation",
        }
    }
}

impl std::fmt::Display for SearchParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::City { city } => write!(f, "{} - {}", self.kind(), city),
            Self::Coordinates {
                latitude,
                longitude,
                ..
            } => write!(f, "{} - {}, {}", self.kind(), latitude, longitude),
        }
    }
}

/// Wire shape of `SearchParams` in the persisted log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum SearchParamsRepr {
    #[serde(rename = "city")]
    City { city: String },
    #[serde(rename = "latitude and longitude")]
    Manual {
        #[serde(deserialize_with = "lenient_f64")]
        latitude: f64,
        #[serde(deserialize_with = "lenient_f64")]
        longitude: f64,
    },
    #[serde(rename = "Autolocation")]
    Autolocation {
        #[serde(deserialize_with = "lenient_f64")]
        latitude: f64,
        #[serde(deserialize_with = "lenient_f64")]
        longitude: f64,
    },
}

impl From<SearchParamsRepr> for SearchParams {
    fn from(repr: SearchParamsRepr) -> Self {
        match repr {
            SearchParamsRepr::City { city } => Self::City { city },
            SearchParamsRepr::Manual {
                latitude,
                longitude,
            } => Self::coordinates(latitude, longitude, CoordinateSource::Manual),
            SearchParamsRepr::Autolocation {
                latitude,
                longitude,
            } => Self::coordinates(latitude, longitude, CoordinateSource::Autolocation),
        }
    }
}

impl From<SearchParams> for SearchParamsRepr {
    fn from(params: SearchParams) -> Self {
        match params {
            SearchParams::City { city } => Self::City { city },
            SearchParams::Coordinates {
                latitude,
                longitude,
                source: CoordinateSource::Manual,
            } => Self::Manual {
                latitude,
                longitude,
            },
            SearchParams::Coordinates {
                latitude,
                longitude,
                source: CoordinateSource::Autolocation,
            } => Self::Autolocation {
                latitude,
                longitude,
            },
        }
    }
}

/// Older logs hold manually entered coordinates as strings.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid coordinate {:?}: {}", s, e))),
    }
}

/// Opaque weather document returned by the provider.
///
/// The shape is not validated; accessors return `None` for anything missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherResult(Value);

impl WeatherResult {
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    fn str_at(&self, pointer: &str) -> Option<&str> {
        self.0.pointer(pointer).and_then(Value::as_str)
    }

    fn number_at(&self, pointer: &str) -> Option<f64> {
        self.0.pointer(pointer).and_then(Value::as_f64)
    }

    pub fn location_name(&self) -> Option<&str> {
        self.str_at("/location/name")
    }

    pub fn country(&self) -> Option<&str> {
        self.str_at("/location/country")
    }

    /// "Name, Country" when both are known.
    pub fn place(&self) -> String {
        match (self.location_name(), self.country()) {
            (Some(name), Some(country)) => format!("{}, {}", name, country),
            (Some(name), None) => name.to_string(),
            (None, Some(country)) => country.to_string(),
            (None, None) => "Unknown location".to_string(),
        }
    }

    pub fn temperature(&self, unit: TemperatureUnit) -> Option<f64> {
        match unit {
            TemperatureUnit::Celsius => self.number_at("/current/temp_c"),
            TemperatureUnit::Fahrenheit => self.number_at("/current/temp_f"),
        }
    }

    pub fn humidity(&self) -> Option<f64> {
        self.number_at("/current/humidity")
    }

    pub fn wind_kph(&self) -> Option<f64> {
        self.number_at("/current/wind_kph")
    }

    pub fn visibility_km(&self) -> Option<f64> {
        self.number_at("/current/vis_km")
    }

    pub fn precipitation_mm(&self) -> Option<f64> {
        self.number_at("/current/precip_mm")
    }

    pub fn condition(&self) -> Option<&str> {
        self.str_at("/current/condition/text")
    }
}

impl From<Value> for WeatherResult {
    fn from(document: Value) -> Self {
        Self(document)
    }
}

/// One past search in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(rename = "data")]
    pub result: WeatherResult,
    #[serde(rename = "searchParams")]
    pub params: SearchParams,
    #[serde(rename = "timestamp")]
    pub captured_at: DateTime<Utc>,
}

/// Newest-first sequence of past searches.
pub type HistoryLog = Vec<HistoryEntry>;

/// Geographic location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub city_name: Option<String>,
}

/// Which search form the user is filling in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    City,
    Coordinates,
    Autolocation,
}

/// Raw search form state, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchInput {
    pub mode: SearchMode,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl SearchInput {
    pub fn city(name: impl Into<String>) -> Self {
        Self {
            mode: SearchMode::City,
            city: name.into(),
            ..Self::default()
        }
    }

    pub fn coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            mode: SearchMode::Coordinates,
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }

    /// Autolocation search; coordinates are filled in from a location provider.
    pub fn autolocation() -> Self {
        Self {
            mode: SearchMode::Autolocation,
            ..Self::default()
        }
    }

    pub fn with_location(mut self, location: &Location) -> Self {
        self.latitude = Some(location.latitude);
        self.longitude = Some(location.longitude);
        self
    }

    /// True when an autolocation search still has no coordinates.
    pub fn needs_location(&self) -> bool {
        self.mode == SearchMode::Autolocation
            && (self.latitude.is_none() || self.longitude.is_none())
    }

    /// Validate the form and build the search parameters.
    ///
    /// # Errors
    /// Returns `ParamsError` when a required field is missing or out of range.
    pub fn to_params(&self) -> Result<SearchParams, ParamsError> {
        let source = match self.mode {
            SearchMode::City => {
                let city = self.city.trim();
                if city.is_empty() {
                    return Err(ParamsError::MissingCity);
                }
                return Ok(SearchParams::city(city));
            }
            SearchMode::Coordinates => CoordinateSource::Manual,
            SearchMode::Autolocation => CoordinateSource::Autolocation,
        };

        let (latitude, longitude) = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Err(ParamsError::MissingCoordinates),
        };
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ParamsError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ParamsError::InvalidLongitude(longitude));
        }

        Ok(SearchParams::coordinates(latitude, longitude, source))
    }
}

/// Search form validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("Missing parameters: city name is required")]
    MissingCity,
    #[error("Missing parameters: latitude and longitude are required")]
    MissingCoordinates,
    #[error("Invalid latitude: {0} (expected -90 to 90)")]
    InvalidLatitude(f64),
    #[error("Invalid longitude: {0} (expected -180 to 180)")]
    InvalidLongitude(f64),
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    /// No position source is configured.
    #[error("Location service unavailable")]
    ServiceUnavailable,
}

/// Why a weather search did not produce a result
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// The search form was incomplete or out of range; nothing was sent.
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Location error: {0}")]
    Location(#[from] LocationError),
    /// Non-2xx response carrying the provider's own message.
    #[error("{message}")]
    Provider { status: u16, message: String },
    /// Non-2xx response without a usable message.
    #[error("Failed to fetch weather: HTTP {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid endpoint: {0}")]
    Endpoint(String),
}
