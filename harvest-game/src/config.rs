//! Engine tuning configuration.
//!
//! Every field carries a serde default so partial JSON overrides are valid.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;
use crate::numbers;

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} range invalid (min {min} > max {max})")]
    InvertedRange {
        field: &'static str,
        min: u64,
        max: u64,
    },
    #[error("bonus harvest window starts at {bonus_from} but the cycle only has {cycle_len} harvests")]
    BonusOutsideCycle { bonus_from: u32, cycle_len: u32 },
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub growth: GrowthConfig,
    #[serde(default)]
    pub dice: DiceConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and any validation
    /// error raised by [`EngineConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.growth.validate()?;
        self.dice.validate()?;
        self.harvest.validate()?;
        self.economy.validate()?;
        Ok(())
    }
}

/// Plot growth ceiling.
///
/// With `max_plot_xp` set, a plot at or above it is "maxed": single-plot hits
/// redirect away from it and a garden of maxed plots must be harvested.
/// `None` disables the ceiling entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthConfig {
    #[serde(default = "GrowthConfig::default_max_plot_xp")]
    pub max_plot_xp: Option<u32>,
}

impl GrowthConfig {
    #[must_use]
    pub const fn default_max_plot_xp() -> Option<u32> {
        Some(constants::DEFAULT_MAX_PLOT_XP)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_plot_xp == Some(0) {
            return Err(ConfigError::MinViolation {
                field: "growth.max_plot_xp",
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            max_plot_xp: Self::default_max_plot_xp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceConfig {
    /// XP granted to each affected plot before the roll multiplier.
    #[serde(default = "DiceConfig::default_xp_per_hit")]
    pub xp_per_hit: u32,
}

impl DiceConfig {
    #[must_use]
    pub const fn default_xp_per_hit() -> u32 {
        constants::XP_PER_HIT
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.xp_per_hit == 0 {
            return Err(ConfigError::MinViolation {
                field: "dice.xp_per_hit",
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            xp_per_hit: Self::default_xp_per_hit(),
        }
    }
}

/// Harvest settlement tuning, including the bonus window at the tail of
/// every harvest cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default = "HarvestConfig::default_cycle_len")]
    pub cycle_len: u32,
    /// 1-indexed position in the cycle from which harvests pay the bonus.
    #[serde(default = "HarvestConfig::default_bonus_from")]
    pub bonus_from: u32,
    #[serde(default = "HarvestConfig::default_bonus_factor")]
    pub bonus_factor: u64,
    #[serde(default = "HarvestConfig::default_haystack_growth")]
    pub haystack_growth: f64,
}

impl HarvestConfig {
    #[must_use]
    pub const fn default_cycle_len() -> u32 {
        constants::HARVEST_CYCLE_LEN
    }

    #[must_use]
    pub const fn default_bonus_from() -> u32 {
        constants::HARVEST_BONUS_FROM
    }

    #[must_use]
    pub const fn default_bonus_factor() -> u64 {
        constants::HARVEST_BONUS_FACTOR
    }

    #[must_use]
    pub const fn default_haystack_growth() -> f64 {
        constants::HAYSTACK_GROWTH_PER_HARVEST
    }

    /// Whether the harvest following `harvest_count` settled harvests falls in
    /// the bonus window.
    #[must_use]
    pub const fn is_bonus_harvest(&self, harvest_count: u32) -> bool {
        if self.cycle_len == 0 {
            return false;
        }
        (harvest_count % self.cycle_len) + 1 >= self.bonus_from
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_len == 0 {
            return Err(ConfigError::MinViolation {
                field: "harvest.cycle_len",
                min: 1.0,
                value: 0.0,
            });
        }
        if self.bonus_from == 0 || self.bonus_from > self.cycle_len {
            return Err(ConfigError::BonusOutsideCycle {
                bonus_from: self.bonus_from,
                cycle_len: self.cycle_len,
            });
        }
        if self.bonus_factor == 0 {
            return Err(ConfigError::MinViolation {
                field: "harvest.bonus_factor",
                min: 1.0,
                value: 0.0,
            });
        }
        if !self.haystack_growth.is_finite() || self.haystack_growth < 0.0 {
            return Err(ConfigError::MinViolation {
                field: "harvest.haystack_growth",
                min: 0.0,
                value: self.haystack_growth,
            });
        }
        Ok(())
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            cycle_len: Self::default_cycle_len(),
            bonus_from: Self::default_bonus_from(),
            bonus_factor: Self::default_bonus_factor(),
            haystack_growth: Self::default_haystack_growth(),
        }
    }
}

/// Seed economy: starting balance, the recurring timer, the GO bonus and the
/// simulated teammate trickle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyConfig {
    #[serde(default = "EconomyConfig::default_starting_seeds")]
    pub starting_seeds: u32,
    #[serde(default = "EconomyConfig::default_timer_duration_ms")]
    pub timer_duration_ms: i64,
    #[serde(default = "EconomyConfig::default_timer_bonus_seeds")]
    pub timer_bonus_seeds: u32,
    #[serde(default = "EconomyConfig::default_go_bonus_min")]
    pub go_bonus_min: u32,
    #[serde(default = "EconomyConfig::default_go_bonus_max")]
    pub go_bonus_max: u32,
    #[serde(default = "EconomyConfig::default_go_cost_per_multiplier")]
    pub go_cost_per_multiplier: u32,
    #[serde(default = "EconomyConfig::default_teammate_tick_chance")]
    pub teammate_tick_chance: f64,
    #[serde(default = "EconomyConfig::default_teammate_seeds_min")]
    pub teammate_seeds_min: u32,
    #[serde(default = "EconomyConfig::default_teammate_seeds_max")]
    pub teammate_seeds_max: u32,
    #[serde(default = "EconomyConfig::default_teammate_plots_min")]
    pub teammate_plots_min: u32,
    #[serde(default = "EconomyConfig::default_teammate_plots_max")]
    pub teammate_plots_max: u32,
    #[serde(default = "EconomyConfig::default_teammate_xp_per_plot")]
    pub teammate_xp_per_plot: u32,
    /// Share of teammate growth picks drawn from the lower-XP half of a garden.
    #[serde(default = "EconomyConfig::default_teammate_low_bias")]
    pub teammate_low_bias: f64,
}

impl EconomyConfig {
    #[must_use]
    pub const fn default_starting_seeds() -> u32 {
        constants::STARTING_SEEDS
    }

    #[must_use]
    pub const fn default_timer_duration_ms() -> i64 {
        constants::TIMER_DURATION_MS
    }

    #[must_use]
    pub const fn default_timer_bonus_seeds() -> u32 {
        constants::TIMER_BONUS_SEEDS
    }

    #[must_use]
    pub const fn default_go_bonus_min() -> u32 {
        constants::GO_BONUS_MIN
    }

    #[must_use]
    pub const fn default_go_bonus_max() -> u32 {
        constants::GO_BONUS_MAX
    }

    #[must_use]
    pub const fn default_go_cost_per_multiplier() -> u32 {
        constants::GO_COST_PER_MULTIPLIER
    }

    #[must_use]
    pub const fn default_teammate_tick_chance() -> f64 {
        constants::TEAMMATE_TICK_CHANCE
    }

    #[must_use]
    pub const fn default_teammate_seeds_min() -> u32 {
        constants::TEAMMATE_SEEDS_MIN
    }

    #[must_use]
    pub const fn default_teammate_seeds_max() -> u32 {
        constants::TEAMMATE_SEEDS_MAX
    }

    #[must_use]
    pub const fn default_teammate_plots_min() -> u32 {
        constants::TEAMMATE_PLOTS_MIN
    }

    #[must_use]
    pub const fn default_teammate_plots_max() -> u32 {
        constants::TEAMMATE_PLOTS_MAX
    }

    #[must_use]
    pub const fn default_teammate_xp_per_plot() -> u32 {
        constants::TEAMMATE_XP_PER_PLOT
    }

    #[must_use]
    pub const fn default_teammate_low_bias() -> f64 {
        constants::TEAMMATE_LOW_BIAS
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timer_duration_ms <= 0 {
            return Err(ConfigError::MinViolation {
                field: "economy.timer_duration_ms",
                min: 1.0,
                value: numbers::i64_to_f64(self.timer_duration_ms),
            });
        }
        check_range("economy.go_bonus", self.go_bonus_min, self.go_bonus_max)?;
        check_range(
            "economy.teammate_seeds",
            self.teammate_seeds_min,
            self.teammate_seeds_max,
        )?;
        check_range(
            "economy.teammate_plots",
            self.teammate_plots_min,
            self.teammate_plots_max,
        )?;
        check_probability("economy.teammate_tick_chance", self.teammate_tick_chance)?;
        check_probability("economy.teammate_low_bias", self.teammate_low_bias)?;
        Ok(())
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_seeds: Self::default_starting_seeds(),
            timer_duration_ms: Self::default_timer_duration_ms(),
            timer_bonus_seeds: Self::default_timer_bonus_seeds(),
            go_bonus_min: Self::default_go_bonus_min(),
            go_bonus_max: Self::default_go_bonus_max(),
            go_cost_per_multiplier: Self::default_go_cost_per_multiplier(),
            teammate_tick_chance: Self::default_teammate_tick_chance(),
            teammate_seeds_min: Self::default_teammate_seeds_min(),
            teammate_seeds_max: Self::default_teammate_seeds_max(),
            teammate_plots_min: Self::default_teammate_plots_min(),
            teammate_plots_max: Self::default_teammate_plots_max(),
            teammate_xp_per_plot: Self::default_teammate_xp_per_plot(),
            teammate_low_bias: Self::default_teammate_low_bias(),
        }
    }
}

fn check_range(field: &'static str, min: u32, max: u32) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::InvertedRange {
            field,
            min: u64::from(min),
            max: u64::from(max),
        });
    }
    Ok(())
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::RangeViolation {
            field,
            min: 0.0,
            max: 1.0,
            value,
        });
    }
    Ok(())
}
