//! Plots and the 4x4 garden grid.
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{GRID_SIDE, MAX_STAGE, PLOTS_PER_GARDEN, STAGE_POINTS};
use crate::growth::stage_of;

/// A single grid cell. `stage` is a cache of [`stage_of`] for renderers and is
/// only ever written alongside `xp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Plot {
    xp: u32,
    #[serde(default, deserialize_with = "saturating_stage")]
    stage: u8,
}

/// Out-of-range cached stages load as stale rather than failing the document.
fn saturating_stage<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(u8::try_from(raw.clamp(0, i64::from(u8::MAX))).unwrap_or(u8::MAX))
}

impl Plot {
    #[must_use]
    pub fn with_xp(xp: u32) -> Self {
        Self {
            xp,
            stage: stage_of(xp),
        }
    }

    #[must_use]
    pub const fn xp(&self) -> u32 {
        self.xp
    }

    #[must_use]
    pub const fn stage(&self) -> u8 {
        self.stage
    }

    /// Whether the plot sits at or above `ceiling`. No ceiling means never.
    #[must_use]
    pub fn is_maxed(&self, ceiling: Option<u32>) -> bool {
        ceiling.is_some_and(|max| self.xp >= max)
    }

    /// Add XP without an upper clamp and refresh the cached stage.
    ///
    /// Returns the amount requested; saturation at `u32::MAX` is silent.
    pub fn apply_xp(&mut self, amount: u32) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        self.stage = stage_of(self.xp);
        amount
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Recompute the cached stage; returns true when it was stale.
    pub(crate) fn repair_stage(&mut self) -> bool {
        let expected = stage_of(self.xp);
        let stale = self.stage != expected;
        self.stage = expected;
        stale
    }
}

/// A team's garden: [`PLOTS_PER_GARDEN`] plots addressed `row * 4 + col`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Garden {
    plots: Vec<Plot>,
}

impl Default for Garden {
    fn default() -> Self {
        Self {
            plots: vec![Plot::default(); PLOTS_PER_GARDEN],
        }
    }
}

impl Garden {
    /// Plot index for a 0-based `(row, col)` pair.
    #[must_use]
    pub const fn index(row: usize, col: usize) -> usize {
        row * GRID_SIDE + col
    }

    /// Indices of every plot in column `col`.
    #[must_use]
    pub fn column(col: usize) -> [usize; GRID_SIDE] {
        std::array::from_fn(|row| Self::index(row, col))
    }

    /// Indices of every plot in row `row`.
    #[must_use]
    pub fn row(row: usize) -> [usize; GRID_SIDE] {
        std::array::from_fn(|col| Self::index(row, col))
    }

    #[must_use]
    pub fn plots(&self) -> &[Plot] {
        &self.plots
    }

    #[must_use]
    pub fn plot(&self, index: usize) -> Option<&Plot> {
        self.plots.get(index)
    }

    #[must_use]
    pub fn plot_count(&self) -> usize {
        self.plots.len()
    }

    /// True when no plot holds any XP.
    #[must_use]
    pub fn is_fallow(&self) -> bool {
        self.plots.iter().all(|plot| plot.xp() == 0)
    }

    /// Apply XP to one plot. Out-of-range indices grant nothing.
    pub fn apply_xp(&mut self, index: usize, amount: u32) -> u32 {
        self.plots
            .get_mut(index)
            .map_or(0, |plot| plot.apply_xp(amount))
    }

    /// Whether every plot has reached `ceiling`. Never full without a ceiling.
    #[must_use]
    pub fn is_full(&self, ceiling: Option<u32>) -> bool {
        ceiling.is_some() && self.plots.iter().all(|plot| plot.is_maxed(ceiling))
    }

    /// Indices of plots that are still below `ceiling`.
    #[must_use]
    pub fn open_plots(&self, ceiling: Option<u32>) -> Vec<usize> {
        self.plots
            .iter()
            .enumerate()
            .filter(|(_, plot)| !plot.is_maxed(ceiling))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Sum of per-stage harvest points across the garden.
    #[must_use]
    pub fn harvest_points(&self) -> u64 {
        self.plots
            .iter()
            .map(|plot| STAGE_POINTS[usize::from(plot.stage().min(MAX_STAGE))])
            .sum()
    }

    #[must_use]
    pub fn total_xp(&self) -> u64 {
        self.plots.iter().map(|plot| u64::from(plot.xp())).sum()
    }

    pub(crate) fn reset(&mut self) {
        self.plots.iter_mut().for_each(Plot::reset);
    }

    /// Repair stale stage caches; returns how many plots were fixed.
    pub(crate) fn repair_stages(&mut self) -> usize {
        self.plots
            .iter_mut()
            .map(Plot::repair_stage)
            .filter(|&stale| stale)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_xp_refreshes_stage_without_clamp() {
        let mut plot = Plot::default();
        plot.apply_xp(45);
        assert_eq!(plot.stage(), 0);
        plot.apply_xp(10);
        assert_eq!(plot.stage(), 1);
        plot.apply_xp(5_000);
        assert_eq!(plot.xp(), 5_055);
        assert_eq!(plot.stage(), 4);
    }

    #[test]
    fn out_of_range_stage_loads_as_stale() {
        let mut plot: Plot = serde_json::from_str(r#"{"xp": 120, "stage": 300}"#).unwrap();
        assert_eq!(plot.stage(), u8::MAX);
        assert!(plot.repair_stage());
        assert_eq!(plot.stage(), stage_of(120));

        let mut plot: Plot = serde_json::from_str(r#"{"xp": 0, "stage": -4}"#).unwrap();
        assert!(!plot.repair_stage());
        let plot: Plot = serde_json::from_str(r#"{"xp": 60}"#).unwrap();
        assert_eq!(plot.stage(), 0);
    }

    #[test]
    fn rows_and_columns_address_the_grid() {
        assert_eq!(Garden::column(2), [2, 6, 10, 14]);
        assert_eq!(Garden::row(1), [4, 5, 6, 7]);
        assert_eq!(Garden::index(3, 3), 15);
    }

    #[test]
    fn fullness_depends_on_ceiling() {
        let mut garden = Garden::default();
        for idx in 0..PLOTS_PER_GARDEN {
            garden.apply_xp(idx, 1_000);
        }
        assert!(garden.is_full(Some(1_000)));
        assert!(!garden.is_full(Some(1_001)));
        assert!(!garden.is_full(None));
        assert!(garden.open_plots(Some(1_000)).is_empty());
        assert_eq!(garden.open_plots(None).len(), PLOTS_PER_GARDEN);
    }

    #[test]
    fn repair_fixes_stale_stage_cache() {
        let mut json = String::from(r#"{"plots":[{"xp":400,"stage":0}"#);
        for _ in 1..PLOTS_PER_GARDEN {
            json.push_str(r#",{"xp":0,"stage":0}"#);
        }
        json.push_str("]}");
        let mut garden: Garden = serde_json::from_str(&json).unwrap();
        assert_eq!(garden.repair_stages(), 1);
        assert_eq!(garden.plot(0).unwrap().stage(), 3);
    }

    #[test]
    fn reset_clears_every_plot() {
        let mut garden = Garden::default();
        garden.apply_xp(0, 90);
        garden.apply_xp(15, 2_000);
        garden.reset();
        assert!(garden.is_fallow());
        assert!(garden.plots().iter().all(|plot| plot.stage() == 0));
    }
}
