//! Harvest settlement: convert garden stages into haystack points.
use serde::{Deserialize, Serialize};

use crate::config::HarvestConfig;
use crate::constants::{HAYSTACK_MAX_SIZE, HAYSTACK_MIN_SIZE};
use crate::garden::Garden;
use crate::numbers::{clamp_finite, u32_to_f64};
use crate::state::{GameState, TeamId};

/// Points a garden is worth right now. Scored by stage, not raw XP.
#[must_use]
pub fn compute_harvest_points(garden: &Garden) -> u64 {
    garden.harvest_points()
}

/// Points credited to one team by a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamHarvest {
    pub team: TeamId,
    pub base_points: u64,
    pub awarded_points: u64,
}

/// Result of settling a harvest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestReport {
    pub team: TeamId,
    /// 1-indexed position of this harvest within the bonus cycle.
    pub cycle_position: u32,
    pub bonus_applied: bool,
    pub player: TeamHarvest,
    pub teammates: Vec<TeamHarvest>,
    pub central_haystack_size: f64,
}

impl HarvestReport {
    #[must_use]
    pub fn total_awarded(&self) -> u64 {
        self.teammates
            .iter()
            .map(|entry| entry.awarded_points)
            .sum::<u64>()
            + self.player.awarded_points
    }
}

/// Settle the selected team's garden and, alongside it, every teammate
/// garden. The bonus factor only applies to the selected team.
pub fn settle_harvest(state: &mut GameState, cfg: &HarvestConfig) -> HarvestReport {
    let team = state.selected_team;
    let bonus_applied = cfg.is_bonus_harvest(state.harvest_count);
    let cycle_position = (state.harvest_count % cfg.cycle_len.max(1)) + 1;

    let base_points = state.garden(team).map_or(0, compute_harvest_points);
    let awarded_points = if bonus_applied {
        base_points.saturating_mul(cfg.bonus_factor)
    } else {
        base_points
    };
    credit(state, team, awarded_points);
    let player = TeamHarvest {
        team,
        base_points,
        awarded_points,
    };

    let teammates: Vec<TeamId> = state.teammates().collect();
    let teammates = teammates
        .into_iter()
        .map(|mate| {
            let points = state.garden(mate).map_or(0, compute_harvest_points);
            credit(state, mate, points);
            TeamHarvest {
                team: mate,
                base_points: points,
                awarded_points: points,
            }
        })
        .collect();

    state.needs_harvest = false;
    state.wins = state.wins.saturating_add(1);
    state.harvest_count = state.harvest_count.saturating_add(1);
    state.coins = state.coins.saturating_add(awarded_points);
    state.central_haystack_size = haystack_size_for(state.harvest_count, cfg.haystack_growth);

    HarvestReport {
        team,
        cycle_position,
        bonus_applied,
        player,
        teammates,
        central_haystack_size: state.central_haystack_size,
    }
}

/// Cosmetic haystack size after `harvest_count` harvests.
#[must_use]
pub fn haystack_size_for(harvest_count: u32, growth: f64) -> f64 {
    clamp_finite(
        HAYSTACK_MIN_SIZE + u32_to_f64(harvest_count) * growth,
        HAYSTACK_MIN_SIZE,
        HAYSTACK_MAX_SIZE,
    )
}

fn credit(state: &mut GameState, team: TeamId, points: u64) {
    let entry = state.haystack_points.entry(team).or_insert(0);
    *entry = entry.saturating_add(points);
    if let Some(garden) = state.garden_mut(team) {
        garden.reset();
    }
}
