//! Single-document state store: load with fallback, persist on every
//! mutation, notify observers in registration order.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;

use crate::StateStorage;
use crate::config::EconomyConfig;
use crate::state::GameState;

/// How [`StateStore::load`] produced its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadSource {
    /// A valid saved document was found. Stale stage caches were recomputed.
    Restored { repaired_stages: usize },
    /// Nothing was saved under the key; a first-run state was created.
    Fresh,
    /// The saved document was unreadable or structurally invalid and was
    /// replaced with a first-run state.
    Recovered { reason: String },
}

impl LoadSource {
    #[must_use]
    pub const fn is_restored(&self) -> bool {
        matches!(self, Self::Restored { .. })
    }
}

/// Handle returned by [`StateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&GameState)>;

/// Parse and check a stored document without touching storage.
///
/// # Errors
///
/// Returns a human-readable reason when the JSON does not parse or the
/// document fails structural validation.
pub fn parse_document(document: &str) -> Result<(GameState, usize), String> {
    let mut state: GameState =
        serde_json::from_str(document).map_err(|err| format!("unparseable document: {err}"))?;
    state
        .validate()
        .map_err(|err| format!("invalid document: {err}"))?;
    let repaired = state.normalize();
    Ok((state, repaired))
}

/// Owns the game document and its observers.
pub struct StateStore<S: StateStorage> {
    storage: S,
    key: String,
    state: GameState,
    source: LoadSource,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl<S: StateStorage> fmt::Debug for StateStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("key", &self.key)
            .field("source", &self.source)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<S: StateStorage> StateStore<S> {
    /// Load the document stored under `key`, falling back to a first-run
    /// state. Never fails: read errors, parse errors and invalid documents
    /// all produce [`LoadSource::Recovered`]. Fallback states are persisted
    /// immediately.
    pub fn load(storage: S, key: impl Into<String>, now_ms: i64, economy: &EconomyConfig) -> Self {
        let key = key.into();
        let (state, source) = match storage.read(&key) {
            Ok(Some(document)) => match parse_document(&document) {
                Ok((state, repaired_stages)) => {
                    if repaired_stages > 0 {
                        log::debug!("repaired {repaired_stages} stale plot stages in '{key}'");
                    }
                    (state, LoadSource::Restored { repaired_stages })
                }
                Err(reason) => {
                    log::warn!("discarding saved state '{key}': {reason}");
                    (
                        GameState::fresh(now_ms, economy),
                        LoadSource::Recovered { reason },
                    )
                }
            },
            Ok(None) => (GameState::fresh(now_ms, economy), LoadSource::Fresh),
            Err(err) => {
                let reason = format!("storage read failed: {err}");
                log::warn!("discarding saved state '{key}': {reason}");
                (
                    GameState::fresh(now_ms, economy),
                    LoadSource::Recovered { reason },
                )
            }
        };

        let mut store = Self {
            storage,
            key,
            state,
            source,
            observers: Vec::new(),
            next_subscription: 0,
        };
        if !store.source.is_restored() {
            store.persist();
        }
        store
    }

    #[must_use]
    pub const fn snapshot(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn source(&self) -> &LoadSource {
        &self.source
    }

    /// Run `mutator`, persist the result, then notify every observer.
    ///
    /// There is no rollback; callers validate before mutating.
    pub fn apply<R>(&mut self, mutator: impl FnOnce(&mut GameState) -> R) -> R {
        let result = mutator(&mut self.state);
        self.persist();
        self.notify();
        result
    }

    /// Register an observer, called after every committed mutation.
    pub fn subscribe(&mut self, observer: impl FnMut(&GameState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Write the full document to storage. Failures are logged and leave the
    /// in-memory state authoritative.
    pub fn persist(&mut self) -> bool {
        let document = match serde_json::to_string(&self.state) {
            Ok(document) => document,
            Err(err) => {
                log::warn!("failed to serialize state '{}': {err}", self.key);
                return false;
            }
        };
        match self.storage.write(&self.key, &document) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("failed to persist state '{}': {err}", self.key);
                false
            }
        }
    }

    fn notify(&mut self) {
        let state = &self.state;
        for (_, observer) in &mut self.observers {
            observer(state);
        }
    }
}

/// In-memory storage. Clones share the same slots, so a test can keep a
/// handle to inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a slot, e.g. with a hand-written or corrupt document.
    #[must_use]
    pub fn with_document(self, key: &str, document: &str) -> Self {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), document.to_string());
        self
    }

    #[must_use]
    pub fn document(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }
}

impl StateStorage for MemoryStorage {
    type Error = Infallible;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, document: &str) -> Result<(), Self::Error> {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), document.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STORAGE_KEY;
    use crate::state::TeamId;
    use std::cell::Cell;

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct Broken;

    struct BrokenStorage;

    impl StateStorage for BrokenStorage {
        type Error = Broken;

        fn read(&self, _key: &str) -> Result<Option<String>, Self::Error> {
            Err(Broken)
        }

        fn write(&self, _key: &str, _document: &str) -> Result<(), Self::Error> {
            Err(Broken)
        }

        fn remove(&self, _key: &str) -> Result<(), Self::Error> {
            Err(Broken)
        }
    }

    fn load(storage: MemoryStorage, now: i64) -> StateStore<MemoryStorage> {
        StateStore::load(storage, STORAGE_KEY, now, &EconomyConfig::default())
    }

    #[test]
    fn missing_document_creates_and_persists_default() {
        let storage = MemoryStorage::new();
        let store = load(storage.clone(), 500);
        assert_eq!(store.source(), &LoadSource::Fresh);
        assert_eq!(store.snapshot().seeds, 50);
        assert!(storage.document(STORAGE_KEY).is_some());
    }

    #[test]
    fn loading_twice_is_idempotent() {
        let storage = MemoryStorage::new();
        let first = load(storage.clone(), 500).snapshot().clone();
        let second = load(storage.clone(), 9_999);
        assert!(second.source().is_restored());
        assert_eq!(second.snapshot(), &first);
        let third = load(storage, 12_345);
        assert_eq!(third.snapshot(), second.snapshot());
    }

    #[test]
    fn corrupt_document_is_replaced() {
        let storage = MemoryStorage::new().with_document(STORAGE_KEY, "{ definitely not json");
        let store = load(storage.clone(), 0);
        let LoadSource::Recovered { reason } = store.source() else {
            panic!("expected recovery, got {:?}", store.source());
        };
        assert!(reason.contains("unparseable"));
        assert_eq!(store.snapshot(), &GameState::fresh(0, &EconomyConfig::default()));
        let rewritten = storage.document(STORAGE_KEY).unwrap();
        assert!(parse_document(&rewritten).is_ok());
    }

    #[test]
    fn structurally_invalid_document_is_replaced() {
        let mut state = GameState::fresh(0, &EconomyConfig::default());
        state.gardens.remove(&TeamId::ALL[3]);
        let document = serde_json::to_string(&state).unwrap();
        let storage = MemoryStorage::new().with_document(STORAGE_KEY, &document);
        let store = load(storage, 0);
        assert!(matches!(
            store.source(),
            LoadSource::Recovered { reason } if reason.contains("missing")
        ));
        assert_eq!(store.snapshot().gardens.len(), 4);
    }

    #[test]
    fn bad_multiplier_is_structural_error() {
        let mut value =
            serde_json::to_value(GameState::fresh(0, &EconomyConfig::default())).unwrap();
        value["multiplier"] = serde_json::json!(7);
        let storage = MemoryStorage::new().with_document(STORAGE_KEY, &value.to_string());
        let store = load(storage, 0);
        assert!(!store.source().is_restored());
        assert_eq!(store.snapshot().multiplier.factor(), 1);
    }

    #[test]
    fn stale_stages_are_repaired_on_load() {
        let mut value =
            serde_json::to_value(GameState::fresh(0, &EconomyConfig::default())).unwrap();
        value["gardens"]["1"]["plots"][0] = serde_json::json!({ "xp": 1_200, "stage": 1 });
        let storage = MemoryStorage::new().with_document(STORAGE_KEY, &value.to_string());
        let store = load(storage, 0);
        assert_eq!(store.source(), &LoadSource::Restored { repaired_stages: 1 });
        let plot = store.snapshot().active_garden().unwrap().plot(0).unwrap();
        assert_eq!(plot.stage(), 4);
    }

    #[test]
    fn oversized_cached_stage_keeps_the_save() {
        let mut state = GameState::fresh(0, &EconomyConfig::default());
        state.seeds = 37;
        let mut value = serde_json::to_value(state).unwrap();
        value["gardens"]["1"]["plots"][3] = serde_json::json!({ "xp": 60, "stage": 300 });
        let storage = MemoryStorage::new().with_document(STORAGE_KEY, &value.to_string());
        let store = load(storage, 0);
        assert_eq!(store.source(), &LoadSource::Restored { repaired_stages: 1 });
        assert_eq!(store.snapshot().seeds, 37);
        let plot = store.snapshot().active_garden().unwrap().plot(3).unwrap();
        assert_eq!((plot.xp(), plot.stage()), (60, 1));
    }

    #[test]
    fn older_documents_without_counters_still_load() {
        let mut value =
            serde_json::to_value(GameState::fresh(0, &EconomyConfig::default())).unwrap();
        let object = value.as_object_mut().unwrap();
        for field in ["totalXP", "coins", "wins", "harvestCount", "goMultiplier", "haystackPoints"] {
            object.remove(field);
        }
        let storage = MemoryStorage::new().with_document(STORAGE_KEY, &value.to_string());
        let store = load(storage, 0);
        assert!(store.source().is_restored());
        assert_eq!(store.snapshot().haystack_points.len(), 4);
    }

    #[test]
    fn apply_persists_then_notifies_in_order() {
        let storage = MemoryStorage::new();
        let mut store = load(storage.clone(), 0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&log);
        store.subscribe(move |state| first.borrow_mut().push(("first", state.seeds)));
        let second = Rc::clone(&log);
        let second_id =
            store.subscribe(move |state| second.borrow_mut().push(("second", state.seeds)));

        store.apply(|state| state.seeds = 7);
        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
        let saved = parse_document(&storage.document(STORAGE_KEY).unwrap()).unwrap().0;
        assert_eq!(saved.seeds, 7);

        assert!(store.unsubscribe(second_id));
        assert!(!store.unsubscribe(second_id));
        store.apply(|state| state.seeds = 8);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn broken_storage_never_fails_outward() {
        let mut store = StateStore::load(BrokenStorage, STORAGE_KEY, 0, &EconomyConfig::default());
        assert!(matches!(store.source(), LoadSource::Recovered { .. }));
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        store.subscribe(move |_| seen.set(seen.get() + 1));
        store.apply(|state| state.seeds += 1);
        assert_eq!(store.snapshot().seeds, 51);
        assert_eq!(calls.get(), 1);
        assert!(!store.persist());
    }
}
