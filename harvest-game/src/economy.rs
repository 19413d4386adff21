//! Seed economy: the recurring timer bonus, the GO bonus and the simulated
//! teammate trickle.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::EconomyConfig;
use crate::dice::PlotSet;
use crate::state::{GameState, TeamId, View};

/// Grant the timer bonus if the deadline has passed.
///
/// Fires at most once per call no matter how many intervals were missed, and
/// reschedules relative to `now_ms` rather than the old deadline.
pub fn check_timer(state: &mut GameState, now_ms: i64, cfg: &EconomyConfig) -> Option<u32> {
    if now_ms < state.timer_end {
        return None;
    }
    state.seeds = state.seeds.saturating_add(cfg.timer_bonus_seeds);
    state.timer_end = now_ms.saturating_add(cfg.timer_duration_ms);
    Some(cfg.timer_bonus_seeds)
}

/// Milliseconds until the next timer bonus, never negative.
#[must_use]
pub fn timer_remaining(state: &GameState, now_ms: i64) -> i64 {
    state.timer_end.saturating_sub(now_ms).max(0)
}

/// `HH:MM:SS` countdown text. Hours are not wrapped at 24.
#[must_use]
pub fn format_countdown(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Seeds staked to collect a GO bonus at the current GO multiplier.
#[must_use]
pub fn go_bonus_cost(state: &GameState, cfg: &EconomyConfig) -> u32 {
    cfg.go_cost_per_multiplier
        .saturating_mul(state.go_multiplier.factor())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoBonus {
    pub base_roll: u32,
    pub multiplier: u32,
    pub cost: u32,
    pub seeds_granted: u32,
}

/// Pay the stake (if any) and grant `random(min..=max) × go_multiplier` seeds.
///
/// The caller checks affordability first; a stake above the balance is
/// clamped to the balance rather than underflowing.
pub fn collect_go_bonus<R: Rng + ?Sized>(
    state: &mut GameState,
    cfg: &EconomyConfig,
    rng: &mut R,
) -> GoBonus {
    let cost = go_bonus_cost(state, cfg).min(state.seeds);
    let base_roll = rng.gen_range(cfg.go_bonus_min..=cfg.go_bonus_max);
    let multiplier = state.go_multiplier.factor();
    let seeds_granted = base_roll.saturating_mul(multiplier);
    state.seeds -= cost;
    state.seeds = state.seeds.saturating_add(seeds_granted);
    GoBonus {
        base_roll,
        multiplier,
        cost,
        seeds_granted,
    }
}

/// Seeds and growth produced by one teammate tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeammateTick {
    pub seeds_granted: u32,
    pub growth: Vec<(TeamId, PlotSet)>,
    pub xp_per_plot: u32,
}

/// Simulated teammate activity, polled while the player watches a garden.
///
/// With probability `teammate_tick_chance` this grants a few seeds and grows
/// random plots in every other team's garden, favouring their weakest plots.
/// The selected team's garden is never touched and teammate XP does not
/// count toward `total_xp`.
pub fn teammate_tick<R: Rng + ?Sized>(
    state: &mut GameState,
    cfg: &EconomyConfig,
    rng: &mut R,
) -> Option<TeammateTick> {
    if state.current_view != View::Garden {
        return None;
    }
    if !rng.gen_bool(cfg.teammate_tick_chance) {
        return None;
    }

    let seeds_granted = rng.gen_range(cfg.teammate_seeds_min..=cfg.teammate_seeds_max);
    state.seeds = state.seeds.saturating_add(seeds_granted);

    let teammates: Vec<TeamId> = state.teammates().collect();
    let mut growth = Vec::with_capacity(teammates.len());
    for team in teammates {
        let Some(garden) = state.garden_mut(team) else {
            continue;
        };
        let mut ranked: Vec<usize> = (0..garden.plot_count()).collect();
        ranked.sort_by_key(|&idx| garden.plot(idx).map_or(0, |plot| plot.xp()));
        let lower_half = &ranked[..ranked.len().div_ceil(2)];

        let picks = rng.gen_range(cfg.teammate_plots_min..=cfg.teammate_plots_max);
        let mut touched = PlotSet::new();
        for _ in 0..picks {
            let pool = if rng.gen_bool(cfg.teammate_low_bias) {
                lower_half
            } else {
                ranked.as_slice()
            };
            if let Some(&idx) = pool.choose(rng) {
                garden.apply_xp(idx, cfg.teammate_xp_per_plot);
                touched.push(idx);
            }
        }
        growth.push((team, touched));
    }

    Some(TeammateTick {
        seeds_granted,
        growth,
        xp_per_plot: cfg.teammate_xp_per_plot,
    })
}
