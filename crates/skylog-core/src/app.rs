use std::sync::Arc;

use skylog_weather::{
    ConfiguredLocation, FetchOrchestrator, HistoryPersistence, HistoryStore, HttpWeatherProvider,
    KeyValueStore, MemoryKeyValueStore, SearchInput, SharedStore, SqliteKeyValueStore, StoreEvent,
    SubmitOutcome, TriggerCounter,
};

use crate::{AppError, Config};

/// Main application state: the history store and the fetch pipeline wired from config
pub struct App {
    config: Arc<Config>,
    orchestrator: FetchOrchestrator,
    triggers: TriggerCounter,
}

impl App {
    /// Create an application backed by the SQLite history database in the config directory.
    ///
    /// If the database cannot be opened, history is kept in memory for this run only.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let backend = history_backend(&config);
        Self::with_storage(config, backend)
    }

    /// Create an application over an explicit key-value backend
    pub fn with_storage(config: Config, backend: Box<dyn KeyValueStore>) -> Result<Self, AppError> {
        let endpoint = config.weather.endpoint()?;
        let provider = HttpWeatherProvider::new(endpoint, config.weather.timeout())?;

        let mut store = HistoryStore::hydrate(HistoryPersistence::new(backend));
        store.subscribe(|state, event| log_event(state.history.len(), event));
        tracing::info!("Loaded {} history entries", store.history().len());

        let location = ConfiguredLocation::new(config.location.location());
        let orchestrator = FetchOrchestrator::new(store.into_shared(), Arc::new(provider))
            .with_location(Arc::new(location));

        Ok(Self {
            config: Arc::new(config),
            orchestrator,
            triggers: TriggerCounter::new(),
        })
    }

    /// Run one search under a fresh trigger
    pub async fn search(&self, input: SearchInput) -> SubmitOutcome {
        let trigger = self.triggers.next();
        tracing::debug!("Submitting search {:?} with trigger {}", input.mode, trigger);
        self.orchestrator.submit(trigger, input).await
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        self.orchestrator.store()
    }

    pub fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }
}

fn history_backend(config: &Config) -> Box<dyn KeyValueStore> {
    let db_path = config.history_db_path();
    tracing::debug!("Opening history database at {}", db_path.display());

    let opened = std::fs::create_dir_all(&config.config_dir)
        .map_err(|e| e.to_string())
        .and_then(|()| SqliteKeyValueStore::open(&db_path).map_err(|e| e.to_string()));

    match opened {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(
                "History database {} unavailable, history will not be saved: {}",
                db_path.display(),
                e
            );
            Box::new(MemoryKeyValueStore::new())
        }
    }
}

fn log_event(history_len: usize, event: &StoreEvent) {
    match event {
        StoreEvent::ErrorSet(message) => tracing::warn!("Search failed: {}", message),
        StoreEvent::HistoryItemRemoved { id, removed: false } => {
            tracing::debug!("No history entry with id {}", id)
        }
        other => tracing::debug!("Store event {:?} ({} history entries)", other, history_len),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::config::EndpointMode;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer, dir: &std::path::Path) -> Config {
        let mut config = Config {
            config_dir: dir.to_path_buf(),
            ..Config::default()
        };
        config.weather.proxy_url = format!("{}/api/weather", server.uri());
        config
    }

    fn oslo() -> serde_json::Value {
        serde_json::json!({
            "location": {"name": "Oslo", "country": "Norway"},
            "current": {"temp_c": 4, "condition": {"text": "Snow"}}
        })
    }

    #[tokio::test]
    async fn test_search_records_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Oslo"))
            .and(query_param("type", "city"))
            .respond_with(ResponseTemplate::new(200).set_body_json(oslo()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let backend = MemoryKeyValueStore::new();
        let app =
            App::with_storage(test_config(&server, dir.path()), Box::new(backend.clone())).unwrap();

        let outcome = app.search(SearchInput::city("Oslo")).await;
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
        assert_eq!(app.store().lock().history().len(), 1);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_autolocation_uses_configured_position() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "59.91,10.75"))
            .and(query_param("type", "Autolocation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(oslo()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&server, dir.path());
        config.location.latitude = Some(59.91);
        config.location.longitude = Some(10.75);

        let app = App::with_storage(config, Box::new(MemoryKeyValueStore::new())).unwrap();
        let outcome = app.search(SearchInput::autolocation()).await;
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn test_each_search_gets_new_trigger() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(oslo()))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let app = App::with_storage(
            test_config(&server, dir.path()),
            Box::new(MemoryKeyValueStore::new()),
        )
        .unwrap();

        app.search(SearchInput::city("Oslo")).await;
        app.search(SearchInput::city("Oslo")).await;
        assert_eq!(app.orchestrator().last_trigger(), 2);
        assert_eq!(app.store().lock().history().len(), 2);
    }

    #[test]
    fn test_direct_mode_without_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            config_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        config.weather.mode = EndpointMode::Direct;
        config.weather.api_key = None;

        // Only meaningful when the environment does not provide a key.
        if config.weather.effective_api_key().is_none() {
            let result = App::with_storage(config, Box::new(MemoryKeyValueStore::new()));
            assert!(matches!(
                result,
                Err(AppError::Config(crate::ConfigError::MissingSetting(_)))
            ));
        }
    }

    #[test]
    fn test_new_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            config_dir: dir.path().join("nested"),
            ..Config::default()
        };
        let app = App::new(config).unwrap();
        assert!(app.config().history_db_path().exists());
        assert!(app.store().lock().history().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_database_falls_back_to_memory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Oslo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(oslo()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server, dir.path());
        let garbage = "this is not a sqlite database\n".repeat(256);
        std::fs::write(config.history_db_path(), &garbage).unwrap();

        let app = App::new(config).unwrap();
        assert!(app.store().lock().history().is_empty());

        let outcome = app.search(SearchInput::city("Oslo")).await;
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
        assert_eq!(app.store().lock().history().len(), 1);

        let on_disk = std::fs::read_to_string(app.config().history_db_path()).unwrap();
        assert_eq!(on_disk, garbage);
    }

    #[test]
    fn test_unusable_config_dir_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let config = Config {
            config_dir: blocker.join("skylog"),
            ..Config::default()
        };
        let app = App::new(config).unwrap();
        assert!(app.store().lock().history().is_empty());
        app.store().lock().clear_history();
    }
}
