//! Utilities to assist with bootstrap resampling of data pools.
//!
//! The optimal block size for a pool is the average of the optimal block
//! sizes across every sub-pool side with sufficient data, where each side
//! is consolidated over its distinct valid times before estimation.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{BootstrapError, Result};
use crate::pool::Pool;
use crate::statistics::optimal_block_size;
use crate::time::TimeSeries;

/// The optimal block size for a pool, together with the timestep the block
/// size is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSizeEstimate {
    /// The mean block size in timestep units.
    pub block_size: u64,
    /// The timestep, averaged over the modal timesteps of the estimated
    /// sides.
    pub timestep: TimeDelta,
}

/// Estimates the optimal block size for every sub-pool side (main and
/// baseline) with sufficient data and returns the ceiling of the mean block
/// size together with the mean modal timestep.
///
/// The `value` projection maps an event value to the sample the estimator
/// analyzes, e.g. the observed member of a pair.
///
/// # Errors
///
/// Returns an insufficient-data error when no side has more than one
/// distinct event from which to estimate.
pub fn optimal_block_size_for_pool<T, F>(pool: &Pool<T>, value: F) -> Result<BlockSizeEstimate>
where
    F: Fn(&T) -> f64,
{
    let mut estimates: Vec<(u64, TimeDelta)> = Vec::new();
    for mini in pool.mini_pools() {
        if has_sufficient_data(mini.main()) {
            estimates.push(estimate_side(mini.main(), &value)?);
        }

        if let Some(baseline) = mini.baseline() {
            if has_sufficient_data(baseline) {
                estimates.push(estimate_side(baseline, &value)?);
            }
        }
    }

    if estimates.is_empty() {
        return Err(BootstrapError::InsufficientData(format!(
            "insufficient data to calculate the optimal block size for the stationary bootstrap; \
             the pool metadata was: {}",
            pool.metadata()
        )));
    }

    let count = estimates.len() as f64;
    let total: f64 = estimates.iter().map(|(block, _)| *block as f64).sum();
    let total_milliseconds: i64 = estimates
        .iter()
        .map(|(_, timestep)| timestep.num_milliseconds())
        .sum();

    let block_size = (total / count).ceil() as u64;
    let timestep = TimeDelta::milliseconds(total_milliseconds / estimates.len() as i64);

    tracing::debug!(
        block_size,
        %timestep,
        sides = estimates.len(),
        "determined an optimal block size for the stationary bootstrap as an average across the \
         pool sides"
    );

    Ok(BlockSizeEstimate {
        block_size,
        timestep,
    })
}

/// Determines whether sufficient data is available for bootstrap
/// resampling: there must be more than one distinct event time across the
/// consolidated series.
pub fn has_sufficient_data<T>(series: &[TimeSeries<T>]) -> bool {
    let mut distinct: std::collections::BTreeSet<DateTime<Utc>> = std::collections::BTreeSet::new();
    for s in series {
        distinct.extend(s.events().iter().map(|e| e.valid_time));
    }

    distinct.len() > 1
}

/// Estimates the optimal block size and modal timestep for one side of a
/// sub-pool from its consolidated events.
fn estimate_side<T, F>(series: &[TimeSeries<T>], value: &F) -> Result<(u64, TimeDelta)>
where
    F: Fn(&T) -> f64,
{
    // Consolidate by valid time, first value wins
    let mut consolidated: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for s in series {
        for event in s.events() {
            consolidated
                .entry(event.valid_time)
                .or_insert_with(|| value(&event.value));
        }
    }

    let data: Vec<f64> = consolidated.values().copied().collect();
    let block_size = optimal_block_size(&data);

    // The corresponding timestep is the modal gap between consecutive
    // consolidated times
    let mut gap_counts: BTreeMap<TimeDelta, usize> = BTreeMap::new();
    let times: Vec<&DateTime<Utc>> = consolidated.keys().collect();
    for pair in times.windows(2) {
        *gap_counts.entry(*pair[1] - *pair[0]).or_default() += 1;
    }

    let modal = gap_counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(gap, _)| gap)
        .ok_or_else(|| {
            BootstrapError::InsufficientData(
                "insufficient data to calculate the optimal block size for the stationary \
                 bootstrap; fewer than two distinct events were found across the time series"
                    .to_string(),
            )
        })?;

    Ok((block_size, modal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{MiniPool, PoolMetadata};
    use crate::time::{Event, TimeSeriesMetadata};
    use chrono::TimeZone;

    fn observation(values: &[f64]) -> TimeSeries<f64> {
        let events = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                Event::new(
                    Utc.with_ymd_and_hms(2023, 3, 3, 0, 0, 0).unwrap()
                        + TimeDelta::hours(i as i64),
                    v,
                )
            })
            .collect();
        TimeSeries::of(TimeSeriesMetadata::default(), events)
    }

    #[test]
    fn test_single_event_is_insufficient() {
        assert!(!has_sufficient_data(&[observation(&[1.0])]));
        assert!(has_sufficient_data(&[observation(&[1.0, 2.0])]));
    }

    #[test]
    fn test_block_size_for_single_event_pool_is_an_error() {
        let pool = Pool::of_single(PoolMetadata::default(), vec![observation(&[1.0])]);

        let result = optimal_block_size_for_pool(&pool, |v| *v);

        assert!(matches!(result, Err(BootstrapError::InsufficientData(_))));
    }

    #[test]
    fn test_block_size_for_regular_pool() {
        let values: Vec<f64> = (0..200).map(|i| f64::from(i % 17)).collect();
        let pool = Pool::of_single(PoolMetadata::default(), vec![observation(&values)]);

        let estimate = optimal_block_size_for_pool(&pool, |v| *v).unwrap();

        assert!(estimate.block_size >= 1);
        assert_eq!(estimate.timestep, TimeDelta::hours(1));
    }

    #[test]
    fn test_block_size_averages_main_and_baseline() {
        let values: Vec<f64> = (0..100).map(|i| f64::from(i % 11)).collect();
        let mini = MiniPool::new(PoolMetadata::default(), vec![observation(&values)])
            .with_baseline(PoolMetadata::default(), vec![observation(&values)]);
        let pool = Pool::new(PoolMetadata::default(), vec![mini]);

        let single = Pool::of_single(PoolMetadata::default(), vec![observation(&values)]);

        // Identical sides average to the single-side estimate
        let with_baseline = optimal_block_size_for_pool(&pool, |v| *v).unwrap();
        let without = optimal_block_size_for_pool(&single, |v| *v).unwrap();

        assert_eq!(with_baseline.block_size, without.block_size);
        assert_eq!(with_baseline.timestep, without.timestep);
    }

    #[test]
    fn test_consolidation_dedups_shared_valid_times() {
        // Two series over the same times consolidate to one sample per time
        let first = observation(&[1.0, 2.0, 3.0, 4.0]);
        let second = observation(&[9.0, 9.0, 9.0, 9.0]);
        let pool = Pool::of_single(PoolMetadata::default(), vec![first, second]);

        let estimate = optimal_block_size_for_pool(&pool, |v| *v).unwrap();

        assert_eq!(estimate.timestep, TimeDelta::hours(1));
    }
}
