//! Order-statistic quantile estimation for bootstrap sample distributions.
//!
//! Quantiles use the positional rule `pos = p * (n + 1)` on the sorted
//! sample, interpolating linearly between the bracketing order statistics
//! and clamping to the extremes. Duration quantiles apply the same rule in
//! whole-second precision, truncating the interpolated value to whole
//! seconds.

use chrono::TimeDelta;

/// Computes the quantile at `probability` from samples sorted in ascending
/// order.
///
/// Returns NaN for an empty sample. Positions below the first order
/// statistic clamp to the minimum and positions at or beyond the last clamp
/// to the maximum.
pub fn quantile_sorted(sorted: &[f64], probability: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }

    let pos = probability * (n as f64 + 1.0);
    if pos < 1.0 {
        return sorted[0];
    }
    if pos >= n as f64 {
        return sorted[n - 1];
    }

    let lower_rank = pos.floor() as usize;
    let fraction = pos - pos.floor();
    let lower = sorted[lower_rank - 1];
    let upper = sorted[lower_rank];

    lower + fraction * (upper - lower)
}

/// Computes the quantile at `probability` from durations sorted in
/// ascending order, interpolating in whole seconds.
///
/// Returns `None` for an empty sample. A single-sample input is returned
/// unchanged, since no interpolation is possible.
pub fn duration_quantile_sorted(sorted: &[TimeDelta], probability: f64) -> Option<TimeDelta> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let pos = probability * (n as f64 + 1.0);
    if pos < 1.0 {
        return Some(sorted[0]);
    }
    if pos >= n as f64 {
        return Some(sorted[n - 1]);
    }

    let lower_rank = pos.floor() as usize;
    let fraction = pos - pos.floor();
    let lower = sorted[lower_rank - 1].num_seconds() as f64;
    let upper = sorted[lower_rank].num_seconds() as f64;

    // Truncate towards zero to whole seconds
    let interpolated = lower + fraction * (upper - lower);
    Some(TimeDelta::seconds(interpolated.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_of_five() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(quantile_sorted(&sorted, 0.5), 3.0);
    }

    #[test]
    fn test_reference_quantiles_of_one_to_ten() {
        let sorted: Vec<f64> = (1..=10).map(f64::from).collect();

        assert_relative_eq!(quantile_sorted(&sorted, 0.1), 1.1);
        assert_relative_eq!(quantile_sorted(&sorted, 0.5), 5.5);
        assert_relative_eq!(quantile_sorted(&sorted, 0.9), 9.9);
    }

    #[test]
    fn test_positions_clamp_to_extremes() {
        let sorted = [1.0, 2.0, 3.0];

        assert_relative_eq!(quantile_sorted(&sorted, 0.01), 1.0);
        assert_relative_eq!(quantile_sorted(&sorted, 0.99), 3.0);
    }

    #[test]
    fn test_quantiles_are_monotone() {
        let sorted: Vec<f64> = (1..=25).map(f64::from).collect();

        let mut last = f64::NEG_INFINITY;
        for p in [0.05, 0.1, 0.25, 0.5, 0.75, 0.9, 0.95] {
            let q = quantile_sorted(&sorted, p);
            assert!(q >= last, "quantile at {} regressed: {} < {}", p, q, last);
            last = q;
        }
    }

    #[test]
    fn test_empty_sample_is_nan() {
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_duration_median_with_exact_bracket() {
        let sorted = [
            TimeDelta::seconds(10),
            TimeDelta::seconds(20),
            TimeDelta::seconds(30),
        ];

        // pos = 0.5 * 4 = 2.0, an exact bracket
        assert_eq!(
            duration_quantile_sorted(&sorted, 0.5),
            Some(TimeDelta::seconds(20))
        );
    }

    #[test]
    fn test_single_duration_returned_unchanged() {
        let sorted = [TimeDelta::seconds(42)];

        for p in [0.01, 0.5, 0.99] {
            assert_eq!(
                duration_quantile_sorted(&sorted, p),
                Some(TimeDelta::seconds(42))
            );
        }
    }

    #[test]
    fn test_duration_reference_quantiles_of_hourly_sequence() {
        let sorted: Vec<TimeDelta> = (1..=10).map(TimeDelta::hours).collect();

        assert_eq!(
            duration_quantile_sorted(&sorted, 0.1),
            Some(TimeDelta::seconds(3960))
        );
        assert_eq!(
            duration_quantile_sorted(&sorted, 0.5),
            Some(TimeDelta::seconds(19800))
        );
        assert_eq!(
            duration_quantile_sorted(&sorted, 0.9),
            Some(TimeDelta::seconds(35640))
        );
    }

    #[test]
    fn test_empty_duration_sample_is_none() {
        assert_eq!(duration_quantile_sorted(&[], 0.5), None);
    }
}
