//! Progression engine: the single entry point UI actions go through.
//!
//! Every action validates first and only then mutates through the store, so
//! an `Err` always means the document is untouched and no observer ran.
use std::fmt;
use thiserror::Error;

use crate::StateStorage;
use crate::clock::Clock;
use crate::config::{ConfigError, EngineConfig};
use crate::constants::STORAGE_KEY;
use crate::dice::{self, DiceRoll, RollOutcome};
use crate::economy::{self, GoBonus, TeammateTick};
use crate::harvest::{self, HarvestReport};
use crate::rng::RngBundle;
use crate::state::{GameState, Multiplier, TeamId, View};
use crate::store::{LoadSource, StateStore, SubscriptionId};

/// What the engine is doing between a begin and a complete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnginePhase {
    #[default]
    Idle,
    /// Seeds are paid; the dice have not landed yet.
    Rolling { team: TeamId, multiplier: Multiplier },
    Harvesting,
}

impl EnginePhase {
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Rolling { .. } => f.write_str("rolling"),
            Self::Harvesting => f.write_str("harvesting"),
        }
    }
}

/// Why an action was rejected. The state is unchanged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("not enough seeds: need {required}, have {available}")]
    InsufficientSeeds { required: u32, available: u32 },
    #[error("engine is busy ({phase})")]
    Busy { phase: EnginePhase },
    #[error("garden {team} must be harvested before rolling again")]
    HarvestRequired { team: TeamId },
    #[error("no roll in progress")]
    NoRollInProgress,
    #[error("no harvest in progress")]
    NoHarvestInProgress,
    #[error("unknown team {0}")]
    UnknownTeam(u8),
}

/// Owns the state store, the RNG streams and the action phase.
pub struct ProgressionEngine<S: StateStorage, C: Clock> {
    config: EngineConfig,
    store: StateStore<S>,
    clock: C,
    rng: RngBundle,
    phase: EnginePhase,
}

impl<S: StateStorage, C: Clock> fmt::Debug for ProgressionEngine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressionEngine")
            .field("phase", &self.phase)
            .field("seed", &self.rng.seed())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<S: StateStorage, C: Clock> ProgressionEngine<S, C> {
    /// Load (or create) the saved document and apply any timer bonus that
    /// came due while the game was closed.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation. Storage problems never
    /// fail here; see [`LoadSource`].
    pub fn open(storage: S, clock: C, config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let now = clock.now_ms();
        let store = StateStore::load(storage, STORAGE_KEY, now, &config.economy);
        log::debug!("opened state ({:?}) with seed {seed}", store.source());
        let mut engine = Self {
            config,
            store,
            clock,
            rng: RngBundle::from_user_seed(seed),
            phase: EnginePhase::Idle,
        };
        engine.check_timer();
        Ok(engine)
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        self.store.snapshot()
    }

    #[must_use]
    pub const fn phase(&self) -> EnginePhase {
        self.phase
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn load_source(&self) -> &LoadSource {
        self.store.source()
    }

    #[must_use]
    pub const fn rng(&self) -> &RngBundle {
        &self.rng
    }

    #[must_use]
    pub const fn store(&self) -> &StateStore<S> {
        &self.store
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&GameState) + 'static) -> SubscriptionId {
        self.store.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// True when the active garden is waiting for a harvest.
    #[must_use]
    pub fn harvest_required(&self) -> bool {
        let state = self.state();
        state.needs_harvest
            || state
                .active_garden()
                .is_some_and(|garden| garden.is_full(self.config.growth.max_plot_xp))
    }

    #[must_use]
    pub fn can_roll(&self) -> bool {
        self.roll_precondition().is_ok()
    }

    #[must_use]
    pub const fn can_harvest(&self) -> bool {
        self.phase.is_idle()
    }

    #[must_use]
    pub fn can_collect_go_bonus(&self) -> bool {
        self.go_bonus_precondition().is_ok()
    }

    fn roll_precondition(&self) -> Result<u32, ActionError> {
        if !self.phase.is_idle() {
            return Err(ActionError::Busy { phase: self.phase });
        }
        let state = self.state();
        if self.harvest_required() {
            return Err(ActionError::HarvestRequired {
                team: state.selected_team,
            });
        }
        let cost = state.multiplier.factor();
        if state.seeds < cost {
            return Err(ActionError::InsufficientSeeds {
                required: cost,
                available: state.seeds,
            });
        }
        Ok(cost)
    }

    fn go_bonus_precondition(&self) -> Result<u32, ActionError> {
        let state = self.state();
        let cost = economy::go_bonus_cost(state, &self.config.economy);
        if state.seeds < cost {
            return Err(ActionError::InsufficientSeeds {
                required: cost,
                available: state.seeds,
            });
        }
        Ok(cost)
    }

    /// Pay for a roll and enter the `Rolling` phase. Returns the seeds paid.
    ///
    /// # Errors
    ///
    /// `Busy`, `HarvestRequired` or `InsufficientSeeds`.
    pub fn begin_roll(&mut self) -> Result<u32, ActionError> {
        let cost = self.roll_precondition()?;
        let (team, multiplier) = self.store.apply(|state| {
            state.seeds -= cost;
            (state.selected_team, state.multiplier)
        });
        self.phase = EnginePhase::Rolling { team, multiplier };
        log::debug!("roll started for {team} at {multiplier}, paid {cost} seeds");
        Ok(cost)
    }

    /// Land the dice for the roll in progress.
    ///
    /// # Errors
    ///
    /// `NoRollInProgress` unless [`Self::begin_roll`] succeeded first.
    pub fn resolve_roll(&mut self, dice: DiceRoll) -> Result<RollOutcome, ActionError> {
        let EnginePhase::Rolling { team, multiplier } = self.phase else {
            return Err(ActionError::NoRollInProgress);
        };
        let xp_per_plot = self
            .config
            .dice
            .xp_per_hit
            .saturating_mul(multiplier.factor());
        let ceiling = self.config.growth.max_plot_xp;
        let rng = self.rng.dice();
        let outcome = self.store.apply(|state| {
            let outcome = dice::resolve_roll(state, team, dice, xp_per_plot, ceiling, rng);
            if outcome.garden_full {
                state.needs_harvest = true;
            }
            outcome
        });
        self.phase = EnginePhase::Idle;
        log::debug!(
            "roll {dice} for {team}: {} ({} XP)",
            outcome.message,
            outcome.xp_granted()
        );
        Ok(outcome)
    }

    /// Pay, draw both dice from the dice stream and resolve.
    ///
    /// # Errors
    ///
    /// Same as [`Self::begin_roll`].
    pub fn roll(&mut self) -> Result<RollOutcome, ActionError> {
        self.begin_roll()?;
        let dice = DiceRoll::roll(self.rng.dice());
        self.resolve_roll(dice)
    }

    /// Enter the `Harvesting` phase. Returns the points the active garden
    /// is worth before any bonus.
    ///
    /// # Errors
    ///
    /// `Busy` unless the engine is idle.
    pub fn begin_harvest(&mut self) -> Result<u64, ActionError> {
        if !self.phase.is_idle() {
            return Err(ActionError::Busy { phase: self.phase });
        }
        self.phase = EnginePhase::Harvesting;
        Ok(self
            .state()
            .active_garden()
            .map_or(0, harvest::compute_harvest_points))
    }

    /// Settle the harvest in progress for every team.
    ///
    /// # Errors
    ///
    /// `NoHarvestInProgress` unless [`Self::begin_harvest`] succeeded first.
    pub fn complete_harvest(&mut self) -> Result<HarvestReport, ActionError> {
        if self.phase != EnginePhase::Harvesting {
            return Err(ActionError::NoHarvestInProgress);
        }
        let cfg = &self.config.harvest;
        let report = self
            .store
            .apply(|state| harvest::settle_harvest(state, cfg));
        self.phase = EnginePhase::Idle;
        log::info!(
            "harvested {} for {} points{}",
            report.team,
            report.player.awarded_points,
            if report.bonus_applied { " (bonus)" } else { "" }
        );
        Ok(report)
    }

    /// # Errors
    ///
    /// `Busy` unless the engine is idle.
    pub fn harvest(&mut self) -> Result<HarvestReport, ActionError> {
        self.begin_harvest()?;
        self.complete_harvest()
    }

    /// # Errors
    ///
    /// `InsufficientSeeds` when a configured stake cannot be paid.
    pub fn collect_go_bonus(&mut self) -> Result<GoBonus, ActionError> {
        self.go_bonus_precondition()?;
        let cfg = &self.config.economy;
        let rng = self.rng.bonus();
        let bonus = self
            .store
            .apply(|state| economy::collect_go_bonus(state, cfg, rng));
        log::debug!(
            "GO bonus: {} x{} = {} seeds",
            bonus.base_roll,
            bonus.multiplier,
            bonus.seeds_granted
        );
        Ok(bonus)
    }

    /// Advance the roll multiplier `1 → 3 → 5 → 10 → 1`. A roll already in
    /// progress keeps the multiplier it was paid at.
    pub fn cycle_roll_multiplier(&mut self) -> Multiplier {
        self.store.apply(|state| {
            state.multiplier = state.multiplier.next();
            state.multiplier
        })
    }

    pub fn cycle_go_multiplier(&mut self) -> Multiplier {
        self.store.apply(|state| {
            state.go_multiplier = state.go_multiplier.next();
            state.go_multiplier
        })
    }

    /// Make `team` the active team. `needsHarvest` follows the new garden.
    ///
    /// # Errors
    ///
    /// `UnknownTeam` for ids outside `1..=4`, `Busy` mid-action.
    pub fn select_team(&mut self, team: u8) -> Result<TeamId, ActionError> {
        let team = TeamId::new(team).ok_or(ActionError::UnknownTeam(team))?;
        if !self.phase.is_idle() {
            return Err(ActionError::Busy { phase: self.phase });
        }
        let ceiling = self.config.growth.max_plot_xp;
        self.store.apply(|state| {
            state.selected_team = team;
            state.needs_harvest = state
                .garden(team)
                .is_some_and(|garden| garden.is_full(ceiling));
        });
        Ok(team)
    }

    pub fn navigate(&mut self, view: View) {
        self.store.apply(|state| state.current_view = view);
    }

    /// Grant the periodic bonus if it is due. Observers only fire when it is.
    pub fn check_timer(&mut self) -> Option<u32> {
        let now = self.clock.now_ms();
        if now < self.state().timer_end {
            return None;
        }
        let cfg = &self.config.economy;
        let granted = self
            .store
            .apply(|state| economy::check_timer(state, now, cfg));
        if let Some(seeds) = granted {
            log::info!("timer bonus: +{seeds} seeds");
        }
        granted
    }

    /// Poll simulated teammates. Observers only fire when the tick lands.
    pub fn teammate_tick(&mut self) -> Option<TeammateTick> {
        if self.state().current_view != View::Garden {
            return None;
        }
        let mut next = self.state().clone();
        let tick = economy::teammate_tick(&mut next, &self.config.economy, self.rng.teammates())?;
        self.store.apply(|state| *state = next);
        log::debug!("teammates planted, +{} seeds", tick.seeds_granted);
        Some(tick)
    }

    #[must_use]
    pub fn timer_remaining(&self) -> i64 {
        economy::timer_remaining(self.state(), self.clock.now_ms())
    }

    #[must_use]
    pub fn countdown(&self) -> String {
        economy::format_countdown(self.timer_remaining())
    }
}
