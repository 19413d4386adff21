//! Harvest Festival Game Engine
//!
//! Platform-agnostic progression and economy logic for the Harvest Festival
//! idle dice game. This crate owns the persisted game document and every rule
//! that changes it; rendering, audio and input live elsewhere and observe
//! state snapshots.

pub mod clock;
pub mod config;
pub mod constants;
pub mod dice;
pub mod economy;
pub mod engine;
pub mod garden;
pub mod growth;
pub mod harvest;
pub mod numbers;
pub mod rng;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ConfigError, DiceConfig, EconomyConfig, EngineConfig, GrowthConfig, HarvestConfig,
};
pub use dice::{DiceRoll, DieFace, PlotSet, RollEffect, RollOutcome, resolve_roll};
pub use economy::{
    GoBonus, TeammateTick, check_timer, collect_go_bonus, format_countdown, teammate_tick,
    timer_remaining,
};
pub use engine::{ActionError, EnginePhase, ProgressionEngine};
pub use garden::{Garden, Plot};
pub use growth::{StageProgress, progress_to_next_stage, stage_of};
pub use harvest::{HarvestReport, TeamHarvest, compute_harvest_points, settle_harvest};
pub use rng::{CountingRng, RngBundle};
pub use state::{GameState, Multiplier, StateError, TeamId, View};
pub use store::{LoadSource, MemoryStorage, StateStore, SubscriptionId, parse_document};

/// Key/value persistence for the game document.
/// Platform-specific implementations should provide this
pub trait StateStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the document stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Overwrite the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn write(&self, key: &str, document: &str) -> Result<(), Self::Error>;

    /// Delete the document stored under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the removal.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STORAGE_KEY;

    #[test]
    fn memory_storage_round_trips_documents() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read("slot").unwrap(), None);
        storage.write("slot", "{}").unwrap();
        assert_eq!(storage.read("slot").unwrap().as_deref(), Some("{}"));
        storage.remove("slot").unwrap();
        storage.remove("slot").unwrap();
        assert_eq!(storage.read("slot").unwrap(), None);
    }

    #[test]
    fn removed_document_starts_a_fresh_game() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::starting_at(0);
        let mut engine =
            ProgressionEngine::open(storage.clone(), clock.clone(), EngineConfig::default(), 3)
                .unwrap();
        engine.roll().unwrap();
        assert_eq!(engine.state().seeds, 49);

        storage.remove(STORAGE_KEY).unwrap();
        let engine = ProgressionEngine::open(storage, clock, EngineConfig::default(), 3).unwrap();
        assert_eq!(engine.load_source(), &LoadSource::Fresh);
        assert_eq!(engine.state().seeds, 50);
    }
}
