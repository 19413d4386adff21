use std::fmt;

use harvest_game::{GameState, Multiplier, View};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// One UI action a scripted player can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAction {
    Roll,
    Harvest,
    CollectGoBonus,
    CycleRollMultiplier,
    CycleGoMultiplier,
    SelectTeam(u8),
    Navigate(View),
    Wait,
}

impl PlayAction {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Roll => "roll",
            Self::Harvest => "harvest",
            Self::CollectGoBonus => "go-bonus",
            Self::CycleRollMultiplier => "cycle-roll",
            Self::CycleGoMultiplier => "cycle-go",
            Self::SelectTeam(_) => "select-team",
            Self::Navigate(_) => "navigate",
            Self::Wait => "wait",
        }
    }
}

/// What a policy may look at before choosing.
#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    pub state: &'a GameState,
    pub step: usize,
    pub can_roll: bool,
    pub harvest_required: bool,
    pub can_collect_go_bonus: bool,
    /// Points the active garden would settle for right now, before bonus.
    pub harvest_value: u64,
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    fn next_action(&mut self, view: &TableView<'_>) -> PlayAction;
}

/// Built-in play strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    /// Rolls at x1 in the garden, harvests only when forced.
    Casual,
    /// Harvests early once the garden is worth enough, rotating teams.
    Grinder,
    /// Plays at x10 and waits for seeds between rolls.
    HighRoller,
    /// Never rolls; lives on the timer, GO bonus and teammates.
    Idler,
    /// Uniform random actions from a seeded stream.
    MonteCarlo,
}

impl GameplayStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Casual => "Casual",
            Self::Grinder => "Grinder",
            Self::HighRoller => "High Roller",
            Self::Idler => "Idler",
            Self::MonteCarlo => "Monte Carlo",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Casual => Box::new(CasualPolicy),
            Self::Grinder => Box::new(GrinderPolicy::default()),
            Self::HighRoller => Box::new(HighRollerPolicy),
            Self::Idler => Box::new(IdlerPolicy),
            Self::MonteCarlo => Box::new(MonteCarloPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const GO_BONUS_EVERY: usize = 12;
const GRINDER_HARVEST_AT: u64 = 400;

struct CasualPolicy;

impl PlayerPolicy for CasualPolicy {
    fn name(&self) -> &'static str {
        "casual"
    }

    fn next_action(&mut self, view: &TableView<'_>) -> PlayAction {
        if view.state.current_view != View::Garden {
            return PlayAction::Navigate(View::Garden);
        }
        if view.harvest_required {
            return PlayAction::Harvest;
        }
        if view.step % GO_BONUS_EVERY == 0 && view.can_collect_go_bonus {
            return PlayAction::CollectGoBonus;
        }
        if view.can_roll {
            PlayAction::Roll
        } else {
            PlayAction::Wait
        }
    }
}

#[derive(Default)]
struct GrinderPolicy {
    rotate_next: bool,
}

impl PlayerPolicy for GrinderPolicy {
    fn name(&self) -> &'static str {
        "grinder"
    }

    fn next_action(&mut self, view: &TableView<'_>) -> PlayAction {
        if self.rotate_next {
            self.rotate_next = false;
            let next = view.state.selected_team.get() % 4 + 1;
            return PlayAction::SelectTeam(next);
        }
        if view.harvest_required || view.harvest_value >= GRINDER_HARVEST_AT {
            self.rotate_next = true;
            return PlayAction::Harvest;
        }
        if view.can_roll {
            PlayAction::Roll
        } else if view.can_collect_go_bonus {
            PlayAction::CollectGoBonus
        } else {
            PlayAction::Wait
        }
    }
}

struct HighRollerPolicy;

impl PlayerPolicy for HighRollerPolicy {
    fn name(&self) -> &'static str {
        "high-roller"
    }

    fn next_action(&mut self, view: &TableView<'_>) -> PlayAction {
        if view.state.multiplier != Multiplier::X10 {
            return PlayAction::CycleRollMultiplier;
        }
        if view.state.go_multiplier != Multiplier::X10 {
            return PlayAction::CycleGoMultiplier;
        }
        if view.harvest_required {
            return PlayAction::Harvest;
        }
        if view.can_roll {
            PlayAction::Roll
        } else if view.can_collect_go_bonus {
            PlayAction::CollectGoBonus
        } else {
            PlayAction::Wait
        }
    }
}

struct IdlerPolicy;

impl PlayerPolicy for IdlerPolicy {
    fn name(&self) -> &'static str {
        "idler"
    }

    fn next_action(&mut self, view: &TableView<'_>) -> PlayAction {
        if view.state.current_view != View::Garden {
            PlayAction::Navigate(View::Garden)
        } else if view.step % GO_BONUS_EVERY == 0 && view.can_collect_go_bonus {
            PlayAction::CollectGoBonus
        } else {
            PlayAction::Wait
        }
    }
}

struct MonteCarloPolicy {
    rng: ChaCha20Rng,
}

impl MonteCarloPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0x4D43_504C),
        }
    }
}

impl PlayerPolicy for MonteCarloPolicy {
    fn name(&self) -> &'static str {
        "monte-carlo"
    }

    fn next_action(&mut self, _view: &TableView<'_>) -> PlayAction {
        match self.rng.gen_range(0..10) {
            0..=3 => PlayAction::Roll,
            4 => PlayAction::Harvest,
            5 => PlayAction::CollectGoBonus,
            6 => PlayAction::CycleRollMultiplier,
            7 => PlayAction::SelectTeam(self.rng.gen_range(1..=4)),
            8 => PlayAction::Navigate(if self.rng.gen_bool(0.5) {
                View::Garden
            } else {
                View::Board
            }),
            _ => PlayAction::Wait,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_game::EconomyConfig;

    fn view(state: &GameState) -> TableView<'_> {
        TableView {
            state,
            step: 1,
            can_roll: true,
            harvest_required: false,
            can_collect_go_bonus: true,
            harvest_value: 0,
        }
    }

    #[test]
    fn casual_moves_to_garden_then_rolls() {
        let mut state = GameState::fresh(0, &EconomyConfig::default());
        let mut policy = GameplayStrategy::Casual.create_policy(1);
        assert_eq!(
            policy.next_action(&view(&state)),
            PlayAction::Navigate(View::Garden)
        );
        state.current_view = View::Garden;
        assert_eq!(policy.next_action(&view(&state)), PlayAction::Roll);
        let forced = TableView {
            harvest_required: true,
            ..view(&state)
        };
        assert_eq!(policy.next_action(&forced), PlayAction::Harvest);
    }

    #[test]
    fn grinder_rotates_after_harvest() {
        let state = GameState::fresh(0, &EconomyConfig::default());
        let mut policy = GameplayStrategy::Grinder.create_policy(1);
        let ripe = TableView {
            harvest_value: 500,
            ..view(&state)
        };
        assert_eq!(policy.next_action(&ripe), PlayAction::Harvest);
        assert_eq!(policy.next_action(&ripe), PlayAction::SelectTeam(2));
    }

    #[test]
    fn high_roller_raises_stakes_first() {
        let state = GameState::fresh(0, &EconomyConfig::default());
        let mut policy = GameplayStrategy::HighRoller.create_policy(1);
        assert_eq!(
            policy.next_action(&view(&state)),
            PlayAction::CycleRollMultiplier
        );
    }

    #[test]
    fn monte_carlo_is_seeded() {
        let state = GameState::fresh(0, &EconomyConfig::default());
        let mut a = GameplayStrategy::MonteCarlo.create_policy(9);
        let mut b = GameplayStrategy::MonteCarlo.create_policy(9);
        for _ in 0..50 {
            assert_eq!(a.next_action(&view(&state)), b.next_action(&view(&state)));
        }
    }
}
