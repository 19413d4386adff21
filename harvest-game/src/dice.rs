//! Two-die roll resolution.
//!
//! Each die shows `1`-`4` or `DOUBLE`. Both doubles water the whole garden,
//! one double waters a full row or column, and two numbers water one plot.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::constants::{GRID_SIDE, PLOTS_PER_GARDEN};
use crate::garden::Garden;
use crate::state::{GameState, TeamId};

/// Plot indices touched by one roll.
pub type PlotSet = SmallVec<[usize; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DieFace {
    One,
    Two,
    Three,
    Four,
    Double,
}

impl DieFace {
    pub const ALL: [Self; 5] = [Self::One, Self::Two, Self::Three, Self::Four, Self::Double];

    /// Numeric value for ordinary faces, `None` for `Double`.
    #[must_use]
    pub const fn value(self) -> Option<u8> {
        match self {
            Self::One => Some(1),
            Self::Two => Some(2),
            Self::Three => Some(3),
            Self::Four => Some(4),
            Self::Double => None,
        }
    }

    #[must_use]
    pub const fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_double(self) -> bool {
        matches!(self, Self::Double)
    }

    /// Draw one face uniformly.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// 0-based grid line for ordinary faces.
    const fn line(self) -> Option<usize> {
        match self.value() {
            Some(value) => Some(value as usize - 1),
            None => None,
        }
    }
}

impl fmt::Display for DieFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("2x"),
        }
    }
}

/// Faces shown by die A and die B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiceRoll {
    pub a: DieFace,
    pub b: DieFace,
}

impl DiceRoll {
    #[must_use]
    pub const fn new(a: DieFace, b: DieFace) -> Self {
        Self { a, b }
    }

    /// Two independent uniform draws.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let a = DieFace::roll(rng);
        let b = DieFace::roll(rng);
        Self { a, b }
    }

    /// Classify the roll, in priority order: board, column, row, single.
    #[must_use]
    pub fn effect(self) -> RollEffect {
        match (self.a.line(), self.b.line()) {
            (None, None) => RollEffect::FullBoard,
            (None, Some(col)) => RollEffect::Column(col),
            (Some(row), None) => RollEffect::Row(row),
            (Some(row), Some(col)) => RollEffect::Single(Garden::index(row, col)),
        }
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.a, self.b)
    }
}

/// Which plots a roll targets, before any redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum RollEffect {
    FullBoard,
    Column(usize),
    Row(usize),
    Single(usize),
}

impl RollEffect {
    #[must_use]
    pub fn plots(self) -> PlotSet {
        match self {
            Self::FullBoard => (0..PLOTS_PER_GARDEN).collect(),
            Self::Column(col) => Garden::column(col).into_iter().collect(),
            Self::Row(row) => Garden::row(row).into_iter().collect(),
            Self::Single(idx) => std::iter::once(idx).collect(),
        }
    }
}

/// Everything a renderer needs to animate a resolved roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub team: TeamId,
    pub dice: DiceRoll,
    pub effect: RollEffect,
    pub affected: PlotSet,
    pub xp_per_plot: u32,
    /// Original single-plot target when it was maxed and the hit moved.
    pub redirected_from: Option<usize>,
    /// Set when a single hit found no open plot and granted nothing.
    pub all_maxed: bool,
    /// Whether the garden needs harvesting after this roll.
    pub garden_full: bool,
    pub message: String,
}

impl RollOutcome {
    #[must_use]
    pub fn xp_granted(&self) -> u64 {
        u64::from(self.xp_per_plot) * self.affected.len() as u64
    }
}

/// Apply `dice` to `team`'s garden.
///
/// Row, column and board effects always water every plot they cover. A
/// single hit on a maxed plot moves to a uniformly chosen open plot; when
/// none is left nothing is granted.
pub fn resolve_roll<R: Rng + ?Sized>(
    state: &mut GameState,
    team: TeamId,
    dice: DiceRoll,
    xp_per_plot: u32,
    ceiling: Option<u32>,
    rng: &mut R,
) -> RollOutcome {
    let mut effect = dice.effect();
    let mut redirected_from = None;
    let mut all_maxed = false;

    if let RollEffect::Single(target) = effect {
        let maxed = state
            .garden(team)
            .and_then(|garden| garden.plot(target))
            .is_some_and(|plot| plot.is_maxed(ceiling));
        if maxed {
            let open = state
                .garden(team)
                .map(|garden| garden.open_plots(ceiling))
                .unwrap_or_default();
            match open.choose(rng) {
                Some(&alternate) => {
                    redirected_from = Some(target);
                    effect = RollEffect::Single(alternate);
                }
                None => all_maxed = true,
            }
        }
    }

    let affected = if all_maxed {
        PlotSet::new()
    } else {
        effect.plots()
    };
    for &plot in &affected {
        state.apply_xp(team, plot, xp_per_plot);
    }

    let garden_full = state
        .garden(team)
        .is_some_and(|garden| garden.is_full(ceiling));
    let message = describe(dice, effect, redirected_from, all_maxed);

    RollOutcome {
        team,
        dice,
        effect,
        affected,
        xp_per_plot,
        redirected_from,
        all_maxed,
        garden_full,
        message,
    }
}

fn describe(
    dice: DiceRoll,
    effect: RollEffect,
    redirected_from: Option<usize>,
    all_maxed: bool,
) -> String {
    if all_maxed {
        return "All plots maxed! Time to harvest.".to_string();
    }
    match effect {
        RollEffect::FullBoard => "JACKPOT! XP to ALL plots!".to_string(),
        RollEffect::Column(col) => format!("Column {} planted!", col + 1),
        RollEffect::Row(row) => format!("Row {} planted!", row + 1),
        RollEffect::Single(idx) => {
            let (row, col) = (idx / GRID_SIDE + 1, idx % GRID_SIDE + 1);
            match redirected_from {
                Some(_) => format!("Plot {dice} is full, planted at ({row}, {col}) instead!"),
                None => format!("Planted at ({row}, {col})!"),
            }
        }
    }
}
