//! An indexed pool of candidate time series for bootstrap resampling.
//!
//! Index generation and resampling must traverse candidates in an identical
//! sequence: grouped by event count (ascending), then ordered by the valid
//! time of the first event within each group. The pool restructures a
//! mini-pool's series into a lookup keyed by minimum event count so that the
//! candidates for any resampling target are available in O(1) once built.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::TimeDelta;

use crate::error::{BootstrapError, Result};
use crate::pool::MiniPool;
use crate::time::{Event, TimeSeries};

/// An indexed, read-only view of one side (main or baseline) of a
/// mini-pool, built once at construction.
#[derive(Debug, Clone)]
pub struct BootstrapPool<T> {
    /// Series in candidate order: size-grouped, then start-time-ordered.
    ordered: Vec<TimeSeries<T>>,
    /// Candidate event lists by minimum event count. The candidates for a
    /// key are every series whose event count is at least that key, in
    /// candidate order.
    by_min_events: BTreeMap<usize, Vec<Arc<Vec<Event<T>>>>>,
    /// Gaps between the first valid times of size-adjacent series.
    offsets: BTreeSet<TimeDelta>,
    has_forecasts: bool,
}

impl<T: Clone> BootstrapPool<T> {
    /// Builds the index for the main side of a mini-pool.
    ///
    /// Fails with an argument error if the pool is empty, if the main and
    /// baseline series counts differ, or if any paired event counts differ.
    pub fn build(pool: &MiniPool<T>) -> Result<Self> {
        Self::validate(pool)?;
        Ok(Self::index(pool.main()))
    }

    /// Builds the index for the baseline side of a mini-pool.
    ///
    /// Fails with an argument error if the pool has no baseline or violates
    /// the structural invariants checked by [`BootstrapPool::build`].
    pub fn build_baseline(pool: &MiniPool<T>) -> Result<Self> {
        Self::validate(pool)?;
        let baseline = pool.baseline().ok_or_else(|| {
            BootstrapError::InvalidArgument(format!(
                "cannot build a baseline bootstrap pool because the pool has no baseline data: {}",
                pool.metadata()
            ))
        })?;

        Ok(Self::index(baseline))
    }

    fn validate(pool: &MiniPool<T>) -> Result<()> {
        if pool.main().is_empty() {
            return Err(BootstrapError::InvalidArgument(format!(
                "cannot build a bootstrap pool from an empty pool: {}",
                pool.metadata()
            )));
        }

        if let Some(baseline) = pool.baseline() {
            if baseline.len() != pool.main().len() {
                return Err(BootstrapError::InvalidArgument(format!(
                    "the main and baseline series counts must match to resample with a common \
                     sample structure, but found {} main and {} baseline series: {}",
                    pool.main().len(),
                    baseline.len(),
                    pool.metadata()
                )));
            }

            // Pair the sides in candidate order and compare event counts
            let main_order = candidate_order(pool.main());
            let baseline_order = candidate_order(baseline);
            for (main_series, baseline_series) in main_order.iter().zip(&baseline_order) {
                if main_series.len() != baseline_series.len() {
                    return Err(BootstrapError::InvalidArgument(format!(
                        "each paired main and baseline series must contain the same number of \
                         events to resample with a common sample structure, but found a main \
                         series with {} events paired with a baseline series with {} events: {}",
                        main_series.len(),
                        baseline_series.len(),
                        pool.metadata()
                    )));
                }
            }
        }

        Ok(())
    }

    fn index(series: &[TimeSeries<T>]) -> Self {
        let ordered: Vec<TimeSeries<T>> = candidate_order(series)
            .into_iter()
            .cloned()
            .collect();

        // Share one event list per series across every key it qualifies for
        let events: Vec<Arc<Vec<Event<T>>>> = ordered
            .iter()
            .map(|s| Arc::new(s.events().to_vec()))
            .collect();

        let sizes: BTreeSet<usize> = ordered.iter().map(TimeSeries::len).collect();
        let mut by_min_events = BTreeMap::new();
        for &size in &sizes {
            let candidates: Vec<Arc<Vec<Event<T>>>> = ordered
                .iter()
                .zip(&events)
                .filter(|(s, _)| s.len() >= size)
                .map(|(_, e)| e.clone())
                .collect();
            by_min_events.insert(size, candidates);
        }

        let offsets = ordered
            .windows(2)
            .filter_map(|pair| {
                let first = pair[0].first_valid_time()?;
                let second = pair[1].first_valid_time()?;
                Some((second - first).abs())
            })
            .collect();

        let has_forecasts = ordered.iter().any(TimeSeries::is_forecast);

        Self {
            ordered,
            by_min_events,
            offsets,
            has_forecasts,
        }
    }

    /// The candidate event lists for resampling a series with the given
    /// event count: every series with at least that many events, in
    /// candidate order.
    pub fn time_series_with_at_least(&self, events: usize) -> &[Arc<Vec<Event<T>>>] {
        self.by_min_events
            .range(events..)
            .next()
            .map(|(_, candidates)| candidates.as_slice())
            .unwrap_or(&[])
    }

    /// Every candidate event list, used for non-forecast resampling. Only
    /// meaningful when the pool holds exactly one non-forecast series
    /// structure.
    pub fn time_series_with_all_events(&self) -> &[Arc<Vec<Event<T>>>] {
        self.by_min_events
            .first_key_value()
            .map(|(_, candidates)| candidates.as_slice())
            .unwrap_or(&[])
    }

    /// The series in candidate order, which is the order index generation
    /// and resampling both traverse.
    pub fn ordered_series(&self) -> &[TimeSeries<T>] {
        &self.ordered
    }

    /// Whether any series is a forecast.
    pub fn has_forecasts(&self) -> bool {
        self.has_forecasts
    }

    /// The gaps between the first valid times of size-adjacent series, used
    /// to parameterize the series-transition probabilities.
    pub fn valid_time_offsets(&self) -> &BTreeSet<TimeDelta> {
        &self.offsets
    }
}

/// Orders series into candidate order: grouped by event count (ascending),
/// then by the valid time of the first event within each group.
fn candidate_order<T>(series: &[TimeSeries<T>]) -> Vec<&TimeSeries<T>> {
    let mut groups: BTreeMap<usize, Vec<&TimeSeries<T>>> = BTreeMap::new();
    for s in series {
        groups.entry(s.len()).or_default().push(s);
    }

    let mut ordered = Vec::with_capacity(series.len());
    for (_, mut group) in groups {
        group.sort_by_key(|s| s.first_valid_time());
        ordered.extend(group);
    }

    ordered
}
