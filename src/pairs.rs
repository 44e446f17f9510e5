//! Cross-pairing of time-series collections.
//!
//! Bootstrap resampling assumes perfect statistical dependence across
//! sub-pools and across the main/baseline sides, which requires one common
//! series/event structure for everything. Cross-pairing aligns two
//! collections so that only mutually present series and events remain:
//! forecast series are matched by their reference times and non-forecast
//! series are matched pairwise in start-time order, then each matched pair
//! is reduced to the valid times present on both sides.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::time::TimeSeries;

/// The result of cross-pairing two collections of time series.
///
/// The two sides have identical series counts and per-pair event counts.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossPairs<T> {
    /// The cross-paired series from the first collection.
    pub first_pairs: Vec<TimeSeries<T>>,
    /// The cross-paired series from the second collection.
    pub second_pairs: Vec<TimeSeries<T>>,
}

/// Aligns two collections of time series into a common structure.
pub trait CrossPairer<T> {
    /// Cross-pairs `first` against `second`.
    fn apply(&self, first: &[TimeSeries<T>], second: &[TimeSeries<T>]) -> CrossPairs<T>;
}

/// Cross-pairs by exact matching: forecast series must share identical
/// reference times and events must share identical valid times.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactCrossPairer;

impl ExactCrossPairer {
    /// Restricts a series to the given valid times, preserving order.
    fn filter_events<T: Clone>(
        series: &TimeSeries<T>,
        valid_times: &BTreeSet<DateTime<Utc>>,
    ) -> TimeSeries<T> {
        let events = series
            .events()
            .iter()
            .filter(|e| valid_times.contains(&e.valid_time))
            .cloned()
            .collect();

        TimeSeries::new(series.metadata().clone(), series.reference_times().clone(), events)
    }

    /// Intersects the valid times of two series and rebuilds both. Returns
    /// `None` when no events are shared.
    fn pair<T: Clone>(
        first: &TimeSeries<T>,
        second: &TimeSeries<T>,
    ) -> Option<(TimeSeries<T>, TimeSeries<T>)> {
        let first_times: BTreeSet<_> = first.events().iter().map(|e| e.valid_time).collect();
        let second_times: BTreeSet<_> = second.events().iter().map(|e| e.valid_time).collect();
        let common: BTreeSet<_> = first_times.intersection(&second_times).copied().collect();

        if common.is_empty() {
            return None;
        }

        Some((
            Self::filter_events(first, &common),
            Self::filter_events(second, &common),
        ))
    }
}

impl<T: Clone> CrossPairer<T> for ExactCrossPairer {
    fn apply(&self, first: &[TimeSeries<T>], second: &[TimeSeries<T>]) -> CrossPairs<T> {
        // Index the second collection: forecasts by reference times,
        // non-forecasts in start-time order
        let mut second_forecasts: BTreeMap<BTreeSet<DateTime<Utc>>, &TimeSeries<T>> =
            BTreeMap::new();
        let mut second_non_forecasts: Vec<&TimeSeries<T>> = Vec::new();
        for series in second {
            if series.is_forecast() {
                second_forecasts.insert(series.reference_times().clone(), series);
            } else {
                second_non_forecasts.push(series);
            }
        }
        second_non_forecasts.sort_by_key(|s| s.first_valid_time());

        let mut first_non_forecasts: Vec<&TimeSeries<T>> =
            first.iter().filter(|s| !s.is_forecast()).collect();
        first_non_forecasts.sort_by_key(|s| s.first_valid_time());

        let mut first_pairs = Vec::new();
        let mut second_pairs = Vec::new();

        // Forecasts, in the order of the first collection
        for series in first.iter().filter(|s| s.is_forecast()) {
            if let Some(other) = second_forecasts.get(series.reference_times()) {
                if let Some((left, right)) = Self::pair(series, other) {
                    first_pairs.push(left);
                    second_pairs.push(right);
                }
            }
        }

        // Non-forecasts, pairwise in start-time order
        for (series, other) in first_non_forecasts.iter().zip(&second_non_forecasts) {
            if let Some((left, right)) = Self::pair(series, other) {
                first_pairs.push(left);
                second_pairs.push(right);
            }
        }

        CrossPairs {
            first_pairs,
            second_pairs,
        }
    }
}
