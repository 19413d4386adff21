//! XP to stage conversion and progress-bar math.
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_STAGE, OVERFLOW_PROGRESS_WINDOW, STAGE_THRESHOLDS};
use crate::numbers::percent_of;

/// Growth stage for a given XP total.
///
/// Counts the thresholds not exceeding `xp` (the zero threshold is the
/// baseline), capped at [`MAX_STAGE`]. XP past the last threshold keeps
/// accumulating without a visual change.
#[must_use]
pub fn stage_of(xp: u32) -> u8 {
    let reached = STAGE_THRESHOLDS
        .iter()
        .skip(1)
        .take_while(|&&threshold| xp >= threshold)
        .count();
    u8::try_from(reached).map_or(MAX_STAGE, |stage| stage.min(MAX_STAGE))
}

/// Progress of a plot toward its next visual stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: u8,
    pub current_into_stage: u32,
    pub span_of_stage: u32,
    pub percent: f64,
}

/// Progress-bar data for `xp`.
///
/// Past the final stage the span becomes a repeating window of
/// `OVERFLOW_PROGRESS_WINDOW` XP, so the bar wraps instead of pinning at 100%.
#[must_use]
pub fn progress_to_next_stage(xp: u32) -> StageProgress {
    let stage = stage_of(xp);
    let floor = STAGE_THRESHOLDS[usize::from(stage)];
    let into = xp - floor;

    let (current_into_stage, span_of_stage) = if stage >= MAX_STAGE {
        (into % OVERFLOW_PROGRESS_WINDOW, OVERFLOW_PROGRESS_WINDOW)
    } else {
        let next = STAGE_THRESHOLDS[usize::from(stage) + 1];
        (into, next - floor)
    };

    StageProgress {
        stage,
        current_into_stage,
        span_of_stage,
        percent: percent_of(current_into_stage, span_of_stage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_boundaries() {
        assert_eq!(stage_of(0), 0);
        assert_eq!(stage_of(49), 0);
        assert_eq!(stage_of(50), 1);
        assert_eq!(stage_of(149), 1);
        assert_eq!(stage_of(150), 2);
        assert_eq!(stage_of(399), 2);
        assert_eq!(stage_of(400), 3);
        assert_eq!(stage_of(999), 3);
        assert_eq!(stage_of(1_000), 4);
        assert_eq!(stage_of(u32::MAX), 4);
    }

    #[test]
    fn progress_within_stage() {
        let progress = progress_to_next_stage(100);
        assert_eq!(progress.stage, 1);
        assert_eq!(progress.current_into_stage, 50);
        assert_eq!(progress.span_of_stage, 100);
        assert!((progress.percent - 50.0).abs() < f64::EPSILON);

        let fresh = progress_to_next_stage(0);
        assert_eq!(fresh.span_of_stage, 50);
        assert!(fresh.percent.abs() < f64::EPSILON);
    }

    #[test]
    fn progress_wraps_after_final_stage() {
        let at_cap = progress_to_next_stage(1_000);
        assert_eq!(at_cap.current_into_stage, 0);
        assert_eq!(at_cap.span_of_stage, 2_000);

        let mid = progress_to_next_stage(2_500);
        assert_eq!(mid.current_into_stage, 1_500);
        assert!((mid.percent - 75.0).abs() < f64::EPSILON);

        let wrapped = progress_to_next_stage(3_100);
        assert_eq!(wrapped.current_into_stage, 100);
        assert!(wrapped.percent < 100.0);
    }
}
