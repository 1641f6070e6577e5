//! History store: the authoritative weather state and search history.
//!
//! Every mutation is a synchronous state transition followed by the store's own
//! post-mutation hook, which writes the history through `HistoryPersistence`
//! and then notifies registered listeners. Only the history is persisted;
//! `current`, `loading` and `error` live for the session.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::{Clock, IdGenerator, SystemClock};
use crate::persistence::HistoryPersistence;
use crate::types::{HistoryEntry, HistoryLog, SearchParams, WeatherResult};

/// Snapshot of everything the presentation layer reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub current: Option<WeatherResult>,
    pub history: HistoryLog,
    pub loading: bool,
    pub error: Option<String>,
}

/// What the last mutation did.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    WeatherSet { id: i64 },
    LoadingChanged(bool),
    ErrorSet(String),
    HistoryItemRemoved { id: i64, removed: bool },
    HistoryCleared,
    Replayed { id: i64 },
}

/// Handle returned by [`HistoryStore::subscribe`].
pub type ListenerId = u64;

/// Change listener. Called with the store locked, and during a submit also with the
/// orchestrator's trigger lock held. It must not call back into the store or the
/// orchestrator that owns it.
pub type Listener = Box<dyn Fn(&StoreState, &StoreEvent) + Send>;

/// Store shared between the orchestrator and the presentation layer.
pub type SharedStore = Arc<Mutex<HistoryStore>>;

pub struct HistoryStore {
    state: StoreState,
    persistence: HistoryPersistence,
    clock: Arc<dyn Clock>,
    ids: IdGenerator,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: ListenerId,
}

impl HistoryStore {
    /// Create the store, hydrating the history from persistence.
    pub fn hydrate(persistence: HistoryPersistence) -> Self {
        Self::with_clock(persistence, Arc::new(SystemClock))
    }

    pub fn with_clock(persistence: HistoryPersistence, clock: Arc<dyn Clock>) -> Self {
        let history = persistence.load();
        let last_id = history.iter().map(|e| e.id).max().unwrap_or(0);
        tracing::info!("History store ready with {} entries", history.len());

        Self {
            state: StoreState {
                history,
                ..StoreState::default()
            },
            persistence,
            clock,
            ids: IdGenerator::starting_after(last_id),
            listeners: Vec::new(),
            next_listener_id: 1,
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn current(&self) -> Option<&WeatherResult> {
        self.state.current.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.state.history
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn entry(&self, id: i64) -> Option<&HistoryEntry> {
        self.state.history.iter().find(|e| e.id == id)
    }

    /// Register a change listener.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&StoreState, &StoreEvent) + Send + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Show a fresh result and record it at the head of the history.
    pub fn set_weather(&mut self, result: WeatherResult, params: SearchParams) -> i64 {
        let captured_at = self.clock.now();
        let id = self.ids.next(captured_at);

        self.state.current = Some(result.clone());
        self.state.error = None;
        self.state.loading = false;
        self.state.history.insert(
            0,
            HistoryEntry {
                id,
                result,
                params,
                captured_at,
            },
        );

        tracing::debug!("Recorded history entry {}", id);
        self.commit(StoreEvent::WeatherSet { id });
        id
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.state.loading = loading;
        self.commit(StoreEvent::LoadingChanged(loading));
    }

    /// Record a failure. The displayed result and the history are kept.
    pub fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.state.error = Some(message.clone());
        self.state.loading = false;
        self.commit(StoreEvent::ErrorSet(message));
    }

    /// Remove one entry by id. Returns false (and changes nothing) if absent.
    pub fn remove_history_item(&mut self, id: i64) -> bool {
        let before = self.state.history.len();
        self.state.history.retain(|e| e.id != id);
        let removed = self.state.history.len() != before;
        if !removed {
            tracing::debug!("History entry {} not found", id);
        }
        self.commit(StoreEvent::HistoryItemRemoved { id, removed });
        removed
    }

    pub fn clear_history(&mut self) {
        self.state.history.clear();
        self.commit(StoreEvent::HistoryCleared);
    }

    /// Show a past entry again without adding it to the history.
    pub fn replay(&mut self, entry: &HistoryEntry) {
        self.state.current = Some(entry.result.clone());
        self.state.error = None;
        self.state.loading = false;
        self.commit(StoreEvent::Replayed { id: entry.id });
    }

    /// Replay the history entry with this id. Returns false if there is none.
    pub fn replay_by_id(&mut self, id: i64) -> bool {
        match self.entry(id).cloned() {
            Some(entry) => {
                self.replay(&entry);
                true
            }
            None => false,
        }
    }

    /// Post-mutation hook: persist the history, then notify listeners.
    fn commit(&mut self, event: StoreEvent) {
        self.persistence.save(&self.state.history);
        for (_, listener) in &self.listeners {
            listener(&self.state, &event);
        }
    }
}
