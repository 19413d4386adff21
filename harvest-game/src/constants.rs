//! Centralized balance and tuning constants for Harvest Festival.
//!
//! These are the defaults that seed [`crate::config::EngineConfig`]. Anything
//! a balancing pass might want to move is exposed through the config; the
//! grid geometry and persistence key are fixed.

// Persistence --------------------------------------------------------------
pub const STORAGE_KEY: &str = "harvestFestival_state";

// Grid geometry ------------------------------------------------------------
pub const GRID_SIDE: usize = 4;
pub const PLOTS_PER_GARDEN: usize = GRID_SIDE * GRID_SIDE;
pub const TEAM_COUNT: u8 = 4;

// Starting balance ---------------------------------------------------------
pub(crate) const STARTING_SEEDS: u32 = 50;
pub(crate) const TIMER_DURATION_MS: i64 = 12 * 60 * 60 * 1000;
pub(crate) const TIMER_BONUS_SEEDS: u32 = 10;

// Growth -------------------------------------------------------------------
pub const STAGE_THRESHOLDS: [u32; 5] = [0, 50, 150, 400, 1000];
pub const MAX_STAGE: u8 = 4;
pub(crate) const OVERFLOW_PROGRESS_WINDOW: u32 = 2_000;
pub(crate) const DEFAULT_MAX_PLOT_XP: u32 = 1_000;

// Dice ---------------------------------------------------------------------
pub(crate) const XP_PER_HIT: u32 = 15;

// Harvest ------------------------------------------------------------------
pub const STAGE_POINTS: [u64; 5] = [0, 10, 25, 50, 100];
pub(crate) const HARVEST_CYCLE_LEN: u32 = 8;
pub(crate) const HARVEST_BONUS_FROM: u32 = 7;
pub(crate) const HARVEST_BONUS_FACTOR: u64 = 2;
pub(crate) const HAYSTACK_MIN_SIZE: f64 = 1.0;
pub(crate) const HAYSTACK_MAX_SIZE: f64 = 10.0;
pub(crate) const HAYSTACK_GROWTH_PER_HARVEST: f64 = 0.5;

// GO bonus -----------------------------------------------------------------
pub(crate) const GO_BONUS_MIN: u32 = 1;
pub(crate) const GO_BONUS_MAX: u32 = 3;
pub(crate) const GO_COST_PER_MULTIPLIER: u32 = 0;

// Teammate trickle ---------------------------------------------------------
pub(crate) const TEAMMATE_TICK_CHANCE: f64 = 0.3;
pub(crate) const TEAMMATE_SEEDS_MIN: u32 = 1;
pub(crate) const TEAMMATE_SEEDS_MAX: u32 = 2;
pub(crate) const TEAMMATE_PLOTS_MIN: u32 = 1;
pub(crate) const TEAMMATE_PLOTS_MAX: u32 = 3;
pub(crate) const TEAMMATE_XP_PER_PLOT: u32 = 15;
pub(crate) const TEAMMATE_LOW_BIAS: f64 = 0.7;
