//! Fetch orchestration: one weather lookup per user-initiated submit.
//!
//! Each submit carries a trigger identifier from a [`TriggerCounter`]. A trigger
//! that is not newer than the last one processed is ignored, so re-delivering
//! the same submit never fetches twice. Fetches are not cancelled when a newer
//! trigger arrives; instead a resolution whose trigger is no longer the latest
//! is discarded without touching the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::fetch_state::FetchPhase;
use crate::location::LocationProvider;
use crate::provider::WeatherProvider;
use crate::store::SharedStore;
use crate::types::{SearchInput, SearchParams, WeatherError};

/// Hands out trigger identifiers, starting at 1.
#[derive(Debug, Default)]
pub struct TriggerCounter(AtomicU64);

impl TriggerCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier for a new user action.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Most recently issued identifier (0 before the first).
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a submit ended.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Trigger already processed; nothing was fetched.
    Duplicate,
    /// Input was incomplete or no location was available; nothing was fetched.
    /// The error's message was stored as the store error.
    Rejected(WeatherError),
    /// Weather stored and recorded under this history id.
    Completed { id: i64 },
    /// The fetch failed; the error's message was stored as the store error.
    Failed(WeatherError),
    /// A newer trigger started while this one was in flight; result dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct TriggerState {
    last: u64,
    phase: FetchPhase,
}

pub struct FetchOrchestrator {
    store: SharedStore,
    provider: Arc<dyn WeatherProvider>,
    location: Option<Arc<dyn LocationProvider>>,
    triggers: Mutex<TriggerState>,
}

impl FetchOrchestrator {
    pub fn new(store: SharedStore, provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            store,
            provider,
            location: None,
            triggers: Mutex::new(TriggerState::default()),
        }
    }

    /// Use `location` to fill in coordinates for autolocation searches.
    pub fn with_location(mut self, location: Arc<dyn LocationProvider>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn phase(&self) -> FetchPhase {
        self.triggers.lock().phase
    }

    pub fn last_trigger(&self) -> u64 {
        self.triggers.lock().last
    }

    /// Handle a submit for `trigger` with the current form input.
    pub async fn submit(&self, trigger: u64, input: SearchInput) -> SubmitOutcome {
        {
            let mut state = self.triggers.lock();
            if trigger <= state.last {
                tracing::debug!(
                    "Ignoring trigger {} (last processed {})",
                    trigger,
                    state.last
                );
                return SubmitOutcome::Duplicate;
            }
            state.last = trigger;
            state.phase = state.phase.start(trigger);
        }

        self.store.lock().set_loading(true);

        let params = match self.resolve(input).await {
            Ok(params) => params,
            Err(e) => {
                tracing::info!("Search rejected: {}", e);
                return self.finish_failure(trigger, e, SubmitOutcome::Rejected);
            }
        };

        let result = self.provider.current(&params).await;

        match result {
            Ok(weather) => {
                let mut state = self.triggers.lock();
                if state.last != trigger {
                    tracing::debug!("Discarding result of superseded trigger {}", trigger);
                    return SubmitOutcome::Superseded;
                }
                let id = self.store.lock().set_weather(weather, params);
                state.phase = state.phase.on_success(trigger);
                SubmitOutcome::Completed { id }
            }
            Err(e) => {
                tracing::warn!("Weather fetch failed: {}", e);
                self.finish_failure(trigger, e, SubmitOutcome::Failed)
            }
        }
    }

    /// Build search parameters, asking the location provider when needed.
    async fn resolve(&self, mut input: SearchInput) -> Result<SearchParams, WeatherError> {
        if input.needs_location() {
            if let Some(location) = &self.location {
                let found = location.current_location().await?;
                tracing::info!("Got location: {}, {}", found.latitude, found.longitude);
                input = input.with_location(&found);
            }
        }
        input.to_params().map_err(WeatherError::from)
    }

    fn finish_failure(
        &self,
        trigger: u64,
        error: WeatherError,
        outcome: fn(WeatherError) -> SubmitOutcome,
    ) -> SubmitOutcome {
        let mut state = self.triggers.lock();
        if state.last != trigger {
            tracing::debug!("Discarding failure of superseded trigger {}", trigger);
            return SubmitOutcome::Superseded;
        }
        self.store.lock().set_error(error.to_string());
        state.phase = state.phase.on_failure(trigger);
        outcome(error)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::location::ConfiguredLocation;
    use crate::persistence::HistoryPersistence;
    use crate::storage::MemoryKeyValueStore;
    use crate::store::HistoryStore;
    use crate::types::{CoordinateSource, Location, LocationError, ParamsError, WeatherResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Answers from a fixed table and counts calls. Queries listed in `gates`
    /// wait for their `Notify` before answering.
    #[derive(Default)]
    struct FakeProvider {
        calls: AtomicUsize,
        started: Notify,
        gates: HashMap<String, Arc<Notify>>,
    }

    impl FakeProvider {
        fn gated(query: &str, gate: Arc<Notify>) -> Self {
            let mut gates = HashMap::new();
            gates.insert(query.to_string(), gate);
            Self {
                gates,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn current(&self, params: &SearchParams) -> Result<WeatherResult, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            let query = params.query();
            if let Some(gate) = self.gates.get(&query) {
                gate.notified().await;
            }
            if query == "Atlantis" {
                return Err(WeatherError::Provider {
                    status: 400,
                    message: "No matching location found.".into(),
                });
            }
            Ok(WeatherResult::new(json!({"location": {"name": query}})))
        }
    }

    fn orchestrator(provider: Arc<FakeProvider>) -> FetchOrchestrator {
        let persistence = HistoryPersistence::new(Box::new(MemoryKeyValueStore::new()));
        FetchOrchestrator::new(HistoryStore::hydrate(persistence).into_shared(), provider)
    }

    #[test]
    fn test_trigger_counter() {
        let counter = TriggerCounter::new();
        assert_eq!(counter.current(), 0);
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        assert_eq!(counter.current(), 2);
    }

    #[tokio::test]
    async fn test_success_records_history() {
        let provider = Arc::new(FakeProvider::default());
        let orch = orchestrator(provider.clone());

        let outcome = orch.submit(1, SearchInput::city("Paris")).await;
        let store = orch.store().lock();
        let id = match outcome {
            SubmitOutcome::Completed { id } => id,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(store.history()[0].id, id);
        assert_eq!(store.history()[0].params, SearchParams::city("Paris"));
        assert!(!store.is_loading());
        assert_eq!(orch.phase(), FetchPhase::Succeeded { trigger: 1 });
    }

    #[tokio::test]
    async fn test_same_trigger_fetches_once() {
        let provider = Arc::new(FakeProvider::default());
        let orch = orchestrator(provider.clone());

        let first = orch.submit(1, SearchInput::city("Paris")).await;
        let second = orch.submit(1, SearchInput::city("Paris")).await;

        assert!(matches!(first, SubmitOutcome::Completed { .. }));
        assert!(matches!(second, SubmitOutcome::Duplicate));
        assert_eq!(provider.calls(), 1);
        assert_eq!(orch.store().lock().history().len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_submissions_with_new_triggers_fetch_again() {
        let provider = Arc::new(FakeProvider::default());
        let orch = orchestrator(provider.clone());
        let counter = TriggerCounter::new();

        orch.submit(counter.next(), SearchInput::city("Paris")).await;
        orch.submit(counter.next(), SearchInput::city("Paris")).await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(orch.store().lock().history().len(), 2);
    }

    #[tokio::test]
    async fn test_trigger_zero_never_fetches() {
        let provider = Arc::new(FakeProvider::default());
        let orch = orchestrator(provider.clone());

        assert!(matches!(
            orch.submit(0, SearchInput::city("Paris")).await,
            SubmitOutcome::Duplicate
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_parameters_skip_network() {
        let provider = Arc::new(FakeProvider::default());
        let orch = orchestrator(provider.clone());

        let outcome = orch.submit(1, SearchInput::city("  ")).await;
        match outcome {
            SubmitOutcome::Rejected(WeatherError::Params(e)) => {
                assert_eq!(e, ParamsError::MissingCity)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(provider.calls(), 0);

        let store = orch.store().lock();
        assert!(store.error().unwrap().starts_with("Missing parameters"));
        assert!(!store.is_loading());
        assert!(store.history().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_becomes_store_error() {
        let provider = Arc::new(FakeProvider::default());
        let orch = orchestrator(provider.clone());
        orch.submit(1, SearchInput::city("Paris")).await;

        let outcome = orch.submit(2, SearchInput::city("Atlantis")).await;
        match outcome {
            SubmitOutcome::Failed(WeatherError::Provider { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "No matching location found.");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let store = orch.store().lock();
        assert_eq!(store.error(), Some("No matching location found."));
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.current().unwrap().location_name(), Some("Paris"));
        assert_eq!(orch.phase(), FetchPhase::Failed { trigger: 2 });
    }

    #[tokio::test]
    async fn test_autolocation_uses_location_provider() {
        let provider = Arc::new(FakeProvider::default());
        let location = Location {
            latitude: 12.9,
            longitude: 77.6,
            accuracy_meters: None,
            city_name: None,
        };
        let orch = orchestrator(provider.clone())
            .with_location(Arc::new(ConfiguredLocation::new(Some(location))));

        let outcome = orch.submit(1, SearchInput::autolocation()).await;
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
        assert_eq!(
            orch.store().lock().history()[0].params,
            SearchParams::coordinates(12.9, 77.6, CoordinateSource::Autolocation)
        );
    }

    #[tokio::test]
    async fn test_autolocation_without_location_is_rejected() {
        let provider = Arc::new(FakeProvider::default());
        let orch = orchestrator(provider.clone())
            .with_location(Arc::new(ConfiguredLocation::default()));

        let outcome = orch.submit(1, SearchInput::autolocation()).await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Rejected(WeatherError::Location(LocationError::ServiceUnavailable))
        ));
        assert_eq!(provider.calls(), 0);
        assert_eq!(
            orch.store().lock().error(),
            Some("Location error: Location service unavailable")
        );
    }

    #[tokio::test]
    async fn test_stale_resolution_is_discarded() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(FakeProvider::gated("Slow", gate.clone()));
        let orch = Arc::new(orchestrator(provider.clone()));

        let slow = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.submit(1, SearchInput::city("Slow")).await })
        };
        provider.started.notified().await;

        let fast = orch.submit(2, SearchInput::city("Fast")).await;
        assert!(matches!(fast, SubmitOutcome::Completed { .. }));

        gate.notify_one();
        assert!(matches!(slow.await.unwrap(), SubmitOutcome::Superseded));

        let store = orch.store().lock();
        assert_eq!(store.current().unwrap().location_name(), Some("Fast"));
        assert_eq!(store.history().len(), 1);
        assert_eq!(provider.calls(), 2);
        assert_eq!(orch.phase(), FetchPhase::Succeeded { trigger: 2 });
    }
}
