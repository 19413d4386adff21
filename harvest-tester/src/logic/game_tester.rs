use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use harvest_game::constants::STORAGE_KEY;
use harvest_game::{
    ActionError, Clock, EngineConfig, GameState, LoadSource, ManualClock, MemoryStorage,
    ProgressionEngine, StateStorage, compute_harvest_points,
};

use crate::common::run_dir;
use crate::logic::policy::{GameplayStrategy, PlayAction, TableView};
use crate::storage::FileStorage;

/// Scripted sessions start from a fixed instant so runs are reproducible.
pub const SIM_EPOCH_MS: i64 = 1_700_000_000_000;
const DEFAULT_STEP_MS: i64 = 5 * 60 * 1000;
pub const DEFAULT_MAX_STEPS: usize = 200;

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub max_steps: usize,
    /// Simulated wall-clock time between steps.
    pub step_ms: i64,
    pub configure: Option<fn(&mut EngineConfig)>,
    /// Raw document placed in storage before the engine opens.
    pub preload: Option<&'static str>,
    pub verify_replay: bool,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            max_steps: DEFAULT_MAX_STEPS,
            step_ms: DEFAULT_STEP_MS,
            configure: None,
            preload: None,
            verify_replay: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub const fn with_step_ms(mut self, step_ms: i64) -> Self {
        self.step_ms = step_ms;
        self
    }

    #[must_use]
    pub fn with_config(mut self, configure: fn(&mut EngineConfig)) -> Self {
        self.configure = Some(configure);
        self
    }

    #[must_use]
    pub const fn with_preload(mut self, document: &'static str) -> Self {
        self.preload = Some(document);
        self
    }

    #[must_use]
    pub const fn with_replay_check(mut self) -> Self {
        self.verify_replay = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Counters gathered while a session plays out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub rolls: u32,
    pub jackpots: u32,
    pub redirects: u32,
    pub all_maxed_rolls: u32,
    pub seeds_spent_on_rolls: u64,
    pub harvests: u32,
    pub bonus_harvests: u32,
    pub points_awarded: u64,
    pub go_bonuses: u32,
    pub go_seeds: u64,
    pub timer_bonuses: u32,
    pub timer_seeds: u64,
    pub teammate_ticks: u32,
    pub teammate_seeds: u64,
    pub rejected_insufficient: u32,
    pub rejected_harvest_required: u32,
    pub rejected_other: u32,
    pub notifications: u32,
    pub min_seeds: u32,
    pub rng_draws: u64,
}

/// Result of one scripted step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: usize,
    pub action: PlayAction,
    pub detail: String,
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub policy_name: &'static str,
    pub load_source: LoadSource,
    pub steps: Vec<StepRecord>,
    /// Simulated milliseconds between steps.
    pub step_ms: i64,
    pub metrics: RunMetrics,
    pub initial_state: GameState,
    pub final_state: GameState,
    pub digest: u64,
    /// Digest of a second run with the same seed, when requested.
    pub replay_digest: Option<u64>,
    /// Whether reopening the saved document reproduced `final_state`.
    pub reload_matches: bool,
    pub state_dir: Option<PathBuf>,
    pub config: EngineConfig,
}

/// Headless deterministic runner for the core engine.
#[derive(Debug, Clone)]
pub struct GameTester {
    verbose: bool,
    config: EngineConfig,
    state_root: Option<PathBuf>,
}

impl GameTester {
    pub const fn new(config: EngineConfig, verbose: bool) -> Self {
        Self {
            verbose,
            config,
            state_root: None,
        }
    }

    /// Persist every run under `root` instead of in memory.
    #[must_use]
    pub fn with_state_root(mut self, root: Option<PathBuf>) -> Self {
        self.state_root = root;
        self
    }

    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    fn config_for(&self, plan: &SimulationPlan) -> EngineConfig {
        let mut config = self.config.clone();
        if let Some(configure) = plan.configure {
            configure(&mut config);
        }
        config
    }

    /// Play `plan` once with `seed`, plus a replay when the plan asks for it.
    ///
    /// # Errors
    ///
    /// Returns an error when the plan's configuration is invalid or a
    /// preloaded document cannot be written.
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64, label: &str) -> Result<SimulationSummary> {
        let config = self.config_for(plan);
        let mut summary = match &self.state_root {
            Some(root) => {
                let storage = FileStorage::new(run_dir(root, label, seed));
                let dir = storage.root().to_path_buf();
                let mut summary = self.run_with(storage, plan, &config, seed)?;
                summary.state_dir = Some(dir);
                summary
            }
            None => self.run_with(MemoryStorage::new(), plan, &config, seed)?,
        };
        if plan.verify_replay {
            let replay = self.run_with(MemoryStorage::new(), plan, &config, seed)?;
            summary.replay_digest = Some(replay.digest);
        }
        Ok(summary)
    }

    fn run_with<S>(
        &self,
        storage: S,
        plan: &SimulationPlan,
        config: &EngineConfig,
        seed: u64,
    ) -> Result<SimulationSummary>
    where
        S: StateStorage + Clone,
    {
        if let Some(document) = plan.preload {
            storage
                .write(STORAGE_KEY, document)
                .context("failed to preload state document")?;
        }

        let clock = ManualClock::starting_at(SIM_EPOCH_MS);
        let mut engine = ProgressionEngine::open(storage.clone(), clock.clone(), config.clone(), seed)
            .context("invalid engine configuration")?;
        let load_source = engine.load_source().clone();
        let initial_state = engine.state().clone();

        let notifications = Rc::new(Cell::new(0_u32));
        let counter = Rc::clone(&notifications);
        engine.subscribe(move |_| counter.set(counter.get() + 1));

        let mut policy = plan.strategy.create_policy(seed);
        let mut metrics = RunMetrics {
            min_seeds: initial_state.seeds,
            ..RunMetrics::default()
        };
        let mut steps = Vec::with_capacity(plan.max_steps);

        for step in 0..plan.max_steps {
            let harvest_value = engine
                .state()
                .active_garden()
                .map_or(0, compute_harvest_points);
            let action = {
                let view = TableView {
                    state: engine.state(),
                    step,
                    can_roll: engine.can_roll(),
                    harvest_required: engine.harvest_required(),
                    can_collect_go_bonus: engine.can_collect_go_bonus(),
                    harvest_value,
                };
                policy.next_action(&view)
            };

            let detail = match apply_action(&mut engine, action, &mut metrics) {
                Ok(detail) => detail,
                Err(err) => {
                    record_rejection(&err, &mut metrics);
                    format!("rejected: {err}")
                }
            };
            if self.verbose {
                println!(
                    "    {} step {step:>4} {:<12} {}",
                    policy.name().dimmed(),
                    action.label(),
                    detail
                );
            }
            steps.push(StepRecord {
                step,
                action,
                detail,
            });

            clock.advance_ms(plan.step_ms);
            if let Some(seeds) = engine.check_timer() {
                metrics.timer_bonuses += 1;
                metrics.timer_seeds += u64::from(seeds);
            }
            if let Some(tick) = engine.teammate_tick() {
                metrics.teammate_ticks += 1;
                metrics.teammate_seeds += u64::from(tick.seeds_granted);
            }
            metrics.min_seeds = metrics.min_seeds.min(engine.state().seeds);
        }

        metrics.notifications = notifications.get();
        metrics.rng_draws = engine.rng().total_draws();
        let final_state = engine.state().clone();
        log::debug!(
            "seed {seed} finished after {} steps at {}",
            steps.len(),
            clock.now_ms()
        );

        let reopened = ProgressionEngine::open(storage, clock, config.clone(), seed)
            .context("failed to reopen saved state")?;
        let reload_matches = reopened.load_source().is_restored() && reopened.state() == &final_state;

        Ok(SimulationSummary {
            seed,
            strategy: plan.strategy,
            policy_name: policy.name(),
            load_source,
            steps,
            step_ms: plan.step_ms,
            metrics,
            digest: final_state.digest(),
            initial_state,
            final_state,
            replay_digest: None,
            reload_matches,
            state_dir: None,
            config: config.clone(),
        })
    }
}

fn apply_action<S: StateStorage, C: Clock>(
    engine: &mut ProgressionEngine<S, C>,
    action: PlayAction,
    metrics: &mut RunMetrics,
) -> Result<String, ActionError> {
    let detail = match action {
        PlayAction::Roll => {
            let paid = engine.state().multiplier.factor();
            let outcome = engine.roll()?;
            metrics.rolls += 1;
            metrics.seeds_spent_on_rolls += u64::from(paid);
            if outcome.affected.len() == harvest_game::constants::PLOTS_PER_GARDEN {
                metrics.jackpots += 1;
            }
            if outcome.redirected_from.is_some() {
                metrics.redirects += 1;
            }
            if outcome.all_maxed {
                metrics.all_maxed_rolls += 1;
            }
            format!("{} {}", outcome.dice, outcome.message)
        }
        PlayAction::Harvest => {
            let report = engine.harvest()?;
            metrics.harvests += 1;
            metrics.points_awarded += report.total_awarded();
            if report.bonus_applied {
                metrics.bonus_harvests += 1;
            }
            format!(
                "{} +{} points{}",
                report.team,
                report.player.awarded_points,
                if report.bonus_applied { " (bonus)" } else { "" }
            )
        }
        PlayAction::CollectGoBonus => {
            let bonus = engine.collect_go_bonus()?;
            metrics.go_bonuses += 1;
            metrics.go_seeds += u64::from(bonus.seeds_granted);
            format!("+{} seeds", bonus.seeds_granted)
        }
        PlayAction::CycleRollMultiplier => format!("roll {}", engine.cycle_roll_multiplier()),
        PlayAction::CycleGoMultiplier => format!("go {}", engine.cycle_go_multiplier()),
        PlayAction::SelectTeam(team) => format!("team {}", engine.select_team(team)?),
        PlayAction::Navigate(view) => {
            engine.navigate(view);
            format!("view {view}")
        }
        PlayAction::Wait => String::from("-"),
    };
    Ok(detail)
}

fn record_rejection(err: &ActionError, metrics: &mut RunMetrics) {
    match err {
        ActionError::InsufficientSeeds { .. } => metrics.rejected_insufficient += 1,
        ActionError::HarvestRequired { .. } => metrics.rejected_harvest_required += 1,
        _ => metrics.rejected_other += 1,
    }
}
