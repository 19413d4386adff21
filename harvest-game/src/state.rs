use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hasher;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::config::EconomyConfig;
use crate::constants::{HAYSTACK_MAX_SIZE, HAYSTACK_MIN_SIZE, PLOTS_PER_GARDEN, TEAM_COUNT};
use crate::garden::Garden;
use crate::numbers::clamp_finite;

/// One of the four teams, numbered 1 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TeamId(u8);

impl TeamId {
    pub const ALL: [Self; TEAM_COUNT as usize] = [Self(1), Self(2), Self(3), Self(4)];

    #[must_use]
    pub const fn new(id: u8) -> Option<Self> {
        if id >= 1 && id <= TEAM_COUNT {
            Some(Self(id))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for TeamId {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u8> for TeamId {
    type Error = StateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(StateError::InvalidTeam(value))
    }
}

impl From<TeamId> for u8 {
    fn from(value: TeamId) -> Self {
        value.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which screen the player is looking at. Persisted, otherwise presentational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Board,
    Garden,
}

impl View {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Garden => "garden",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cost/reward multiplier. Persisted as its numeric factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum Multiplier {
    #[default]
    X1,
    X3,
    X5,
    X10,
}

impl Multiplier {
    pub const ALL: [Self; 4] = [Self::X1, Self::X3, Self::X5, Self::X10];

    #[must_use]
    pub const fn factor(self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X3 => 3,
            Self::X5 => 5,
            Self::X10 => 10,
        }
    }

    /// Next value in the 1 → 3 → 5 → 10 → 1 cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::X1 => Self::X3,
            Self::X3 => Self::X5,
            Self::X5 => Self::X10,
            Self::X10 => Self::X1,
        }
    }
}

impl TryFrom<u32> for Multiplier {
    type Error = StateError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::X1),
            3 => Ok(Self::X3),
            5 => Ok(Self::X5),
            10 => Ok(Self::X10),
            other => Err(StateError::InvalidMultiplier(other)),
        }
    }
}

impl From<Multiplier> for u32 {
    fn from(value: Multiplier) -> Self {
        value.factor()
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.factor())
    }
}

/// Structural problems found in a persisted document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("team id {0} is outside 1..=4")]
    InvalidTeam(u8),
    #[error("multiplier {0} is not one of 1, 3, 5, 10")]
    InvalidMultiplier(u32),
    #[error("garden for team {0} is missing")]
    MissingGarden(TeamId),
    #[error("garden for team {team} has {found} plots, expected {expected}")]
    PlotCount {
        team: TeamId,
        found: usize,
        expected: usize,
    },
}

const fn default_haystack_size() -> f64 {
    HAYSTACK_MIN_SIZE
}

/// The single persisted game document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub seeds: u32,
    /// Epoch milliseconds at which the next periodic bonus is due.
    pub timer_end: i64,
    #[serde(default)]
    pub current_view: View,
    #[serde(default)]
    pub selected_team: TeamId,
    #[serde(default)]
    pub multiplier: Multiplier,
    #[serde(default)]
    pub go_multiplier: Multiplier,
    #[serde(default)]
    pub needs_harvest: bool,
    #[serde(default)]
    pub haystack_points: BTreeMap<TeamId, u64>,
    #[serde(default = "default_haystack_size")]
    pub central_haystack_size: f64,
    pub gardens: BTreeMap<TeamId, Garden>,
    #[serde(default, rename = "totalXP")]
    pub total_xp: u64,
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub harvest_count: u32,
}

impl GameState {
    /// Fresh first-run state with the timer due one interval from `now_ms`.
    #[must_use]
    pub fn fresh(now_ms: i64, economy: &EconomyConfig) -> Self {
        Self {
            seeds: economy.starting_seeds,
            timer_end: now_ms.saturating_add(economy.timer_duration_ms),
            current_view: View::Board,
            selected_team: TeamId::default(),
            multiplier: Multiplier::X1,
            go_multiplier: Multiplier::X1,
            needs_harvest: false,
            haystack_points: TeamId::ALL.iter().map(|&team| (team, 0)).collect(),
            central_haystack_size: HAYSTACK_MIN_SIZE,
            gardens: TeamId::ALL
                .iter()
                .map(|&team| (team, Garden::default()))
                .collect(),
            total_xp: 0,
            coins: 0,
            wins: 0,
            harvest_count: 0,
        }
    }

    #[must_use]
    pub fn garden(&self, team: TeamId) -> Option<&Garden> {
        self.gardens.get(&team)
    }

    pub(crate) fn garden_mut(&mut self, team: TeamId) -> Option<&mut Garden> {
        self.gardens.get_mut(&team)
    }

    /// Garden of the selected team.
    #[must_use]
    pub fn active_garden(&self) -> Option<&Garden> {
        self.garden(self.selected_team)
    }

    #[must_use]
    pub fn haystack(&self, team: TeamId) -> u64 {
        self.haystack_points.get(&team).copied().unwrap_or(0)
    }

    /// Teams other than the selected one, in id order.
    pub fn teammates(&self) -> impl Iterator<Item = TeamId> + '_ {
        TeamId::ALL
            .into_iter()
            .filter(move |&team| team != self.selected_team)
    }

    /// Apply XP to one plot of `team`'s garden and count it toward `total_xp`.
    pub fn apply_xp(&mut self, team: TeamId, plot: usize, amount: u32) -> u32 {
        let applied = self
            .garden_mut(team)
            .map_or(0, |garden| garden.apply_xp(plot, amount));
        self.total_xp = self.total_xp.saturating_add(u64::from(applied));
        applied
    }

    /// Check the structural invariants a persisted document must satisfy.
    ///
    /// # Errors
    ///
    /// Returns the first `StateError` found.
    pub fn validate(&self) -> Result<(), StateError> {
        for team in TeamId::ALL {
            let garden = self.garden(team).ok_or(StateError::MissingGarden(team))?;
            if garden.plot_count() != PLOTS_PER_GARDEN {
                return Err(StateError::PlotCount {
                    team,
                    found: garden.plot_count(),
                    expected: PLOTS_PER_GARDEN,
                });
            }
        }
        Ok(())
    }

    /// Repair derivable fields after loading: stage caches, missing haystack
    /// entries and the cosmetic haystack size. Returns how many plot stages
    /// were stale.
    pub fn normalize(&mut self) -> usize {
        let repaired = self.gardens.values_mut().map(Garden::repair_stages).sum();
        for team in TeamId::ALL {
            self.haystack_points.entry(team).or_insert(0);
        }
        self.central_haystack_size = clamp_finite(
            self.central_haystack_size,
            HAYSTACK_MIN_SIZE,
            HAYSTACK_MAX_SIZE,
        );
        repaired
    }

    /// Stable 64-bit fingerprint of the serialized document.
    #[must_use]
    pub fn digest(&self) -> u64 {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(&bytes);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_matches_first_run_contract() {
        let state = GameState::fresh(1_000, &EconomyConfig::default());
        assert_eq!(state.seeds, 50);
        assert_eq!(state.timer_end, 1_000 + 12 * 60 * 60 * 1000);
        assert_eq!(state.multiplier, Multiplier::X1);
        assert_eq!(state.gardens.len(), 4);
        assert!(state.validate().is_ok());
        assert!(state.gardens.values().all(Garden::is_fallow));
    }

    #[test]
    fn multiplier_cycles_and_rejects_unknown_factors() {
        let mut m = Multiplier::X1;
        let seen: Vec<u32> = (0..5)
            .map(|_| {
                let factor = m.factor();
                m = m.next();
                factor
            })
            .collect();
        assert_eq!(seen, vec![1, 3, 5, 10, 1]);
        assert_eq!(Multiplier::try_from(4), Err(StateError::InvalidMultiplier(4)));
    }

    #[test]
    fn team_ids_serialize_as_map_keys() {
        let state = GameState::fresh(0, &EconomyConfig::default());
        let json = serde_json::to_value(&state).unwrap();
        assert!(json["gardens"]["1"]["plots"].is_array());
        assert_eq!(json["haystackPoints"]["4"], 0);
        assert_eq!(json["currentView"], "board");
        assert_eq!(json["totalXP"], 0);

        let back: GameState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn out_of_range_team_key_fails_to_parse() {
        let state = GameState::fresh(0, &EconomyConfig::default());
        let mut json = serde_json::to_value(&state).unwrap();
        json["selectedTeam"] = serde_json::json!(9);
        assert!(serde_json::from_value::<GameState>(json).is_err());
    }

    #[test]
    fn validate_reports_missing_garden() {
        let mut state = GameState::fresh(0, &EconomyConfig::default());
        state.gardens.remove(&TeamId::ALL[2]);
        assert_eq!(
            state.validate(),
            Err(StateError::MissingGarden(TeamId::ALL[2]))
        );
    }

    #[test]
    fn normalize_clamps_haystack_size() {
        let mut state = GameState::fresh(0, &EconomyConfig::default());
        state.central_haystack_size = f64::NAN;
        assert!(state.validate().is_ok());
        state.normalize();
        assert!((state.central_haystack_size - HAYSTACK_MIN_SIZE).abs() < f64::EPSILON);
        state.central_haystack_size = HAYSTACK_MAX_SIZE * 4.0;
        state.normalize();
        assert!((state.central_haystack_size - HAYSTACK_MAX_SIZE).abs() < f64::EPSILON);
    }

    #[test]
    fn teammates_exclude_selected_team() {
        let mut state = GameState::fresh(0, &EconomyConfig::default());
        state.selected_team = TeamId::new(3).unwrap();
        let mates: Vec<u8> = state.teammates().map(TeamId::get).collect();
        assert_eq!(mates, vec![1, 2, 4]);
    }

    #[test]
    fn digest_tracks_content() {
        let state = GameState::fresh(0, &EconomyConfig::default());
        let mut other = state.clone();
        assert_eq!(state.digest(), other.digest());
        other.seeds += 1;
        assert_ne!(state.digest(), other.digest());
    }
}
