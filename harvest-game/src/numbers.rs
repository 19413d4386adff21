//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Convert u32 to f64.
#[must_use]
pub fn u32_to_f64(value: u32) -> f64 {
    f64::from(value)
}

/// Percentage of `part` within `whole`, 0.0 when `whole` is zero.
#[must_use]
pub fn percent_of(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    u32_to_f64(part) / u32_to_f64(whole) * 100.0
}

/// Clamp a f64 into `[min, max]`, returning `min` for non-finite values.
#[must_use]
pub fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_handles_zero_span() {
        assert!((percent_of(5, 0) - 0.0).abs() < f64::EPSILON);
        assert!((percent_of(25, 100) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clamp_handles_non_finite() {
        assert!((clamp_finite(f64::NAN, 1.0, 10.0) - 1.0).abs() < f64::EPSILON);
        assert!((clamp_finite(42.0, 1.0, 10.0) - 10.0).abs() < f64::EPSILON);
        assert!((clamp_finite(0.5, 1.0, 10.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn signed_millis_convert_exactly() {
        assert!((i64_to_f64(43_200_000) - 43_200_000.0).abs() < f64::EPSILON);
        assert!((i64_to_f64(-5) + 5.0).abs() < f64::EPSILON);
    }
}
