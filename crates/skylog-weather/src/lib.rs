//! Weather lookups and search history for skylog
//!
//! Fetches current conditions through an injected provider and keeps a
//! persistent, newest-first log of past searches.

pub mod clock;
pub mod fetch_state;
pub mod location;
pub mod orchestrator;
pub mod persistence;
pub mod provider;
pub mod storage;
pub mod store;
pub mod types;

pub use clock::{Clock, IdGenerator, SystemClock};
pub use fetch_state::FetchPhase;
pub use location::{ConfiguredLocation, LocationProvider};
pub use orchestrator::{FetchOrchestrator, SubmitOutcome, TriggerCounter};
pub use persistence::{HistoryPersistence, HISTORY_KEY};
pub use provider::{Endpoint, HttpWeatherProvider, WeatherProvider, DEFAULT_API_BASE};
pub use storage::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError};
pub use store::{HistoryStore, ListenerId, SharedStore, StoreEvent, StoreState};
pub use types::*;
