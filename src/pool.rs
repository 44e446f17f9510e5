//! Pools of time series to evaluate and resample.
//!
//! A pool is an immutable collection of main time series, optionally paired
//! with a parallel baseline collection, and decomposable into mini-pools,
//! for example one per geographic feature. The resampler applies one sample
//! structure across every mini-pool and across the main/baseline sides, so
//! the pool carries enough metadata to rebuild an identically shaped pool
//! from resampled series.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::time::TimeSeries;

/// Metadata describing the provenance of a pool, attached to diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolMetadata {
    /// The geographic feature or feature group.
    pub feature: String,
    /// The variable evaluated.
    pub variable: String,
}

impl fmt::Display for PoolMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature: {}, variable: {}", self.feature, self.variable)
    }
}

/// A climatological reference dataset, carried through resampling untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Climatology {
    /// The climatological values.
    pub values: Vec<f64>,
}

/// One structural subdivision of a pool, such as a single geographic
/// feature, holding main series and an optional baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct MiniPool<T> {
    metadata: PoolMetadata,
    main: Vec<TimeSeries<T>>,
    baseline: Option<Vec<TimeSeries<T>>>,
    baseline_metadata: Option<PoolMetadata>,
    climatology: Option<Arc<Climatology>>,
}

impl<T> MiniPool<T> {
    /// Creates a mini-pool from main series only.
    pub fn new(metadata: PoolMetadata, main: Vec<TimeSeries<T>>) -> Self {
        Self {
            metadata,
            main,
            baseline: None,
            baseline_metadata: None,
            climatology: None,
        }
    }

    /// Attaches baseline series.
    pub fn with_baseline(mut self, metadata: PoolMetadata, baseline: Vec<TimeSeries<T>>) -> Self {
        self.baseline_metadata = Some(metadata);
        self.baseline = Some(baseline);
        self
    }

    /// Attaches a climatology.
    pub fn with_climatology(mut self, climatology: Arc<Climatology>) -> Self {
        self.climatology = Some(climatology);
        self
    }

    /// The mini-pool metadata.
    pub fn metadata(&self) -> &PoolMetadata {
        &self.metadata
    }

    /// The main time series.
    pub fn main(&self) -> &[TimeSeries<T>] {
        &self.main
    }

    /// The baseline time series, if any.
    pub fn baseline(&self) -> Option<&[TimeSeries<T>]> {
        self.baseline.as_deref()
    }

    /// The baseline metadata, if any.
    pub fn baseline_metadata(&self) -> Option<&PoolMetadata> {
        self.baseline_metadata.as_ref()
    }

    /// The climatology, if any.
    pub fn climatology(&self) -> Option<&Arc<Climatology>> {
        self.climatology.as_ref()
    }

    /// Whether a baseline is present.
    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }
}

/// An immutable pool of time series composed of one or more mini-pools.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool<T> {
    metadata: PoolMetadata,
    mini_pools: Vec<MiniPool<T>>,
    climatology: Option<Arc<Climatology>>,
}

impl<T> Pool<T> {
    /// Creates a pool from mini-pools.
    pub fn new(metadata: PoolMetadata, mini_pools: Vec<MiniPool<T>>) -> Self {
        Self {
            metadata,
            mini_pools,
            climatology: None,
        }
    }

    /// Creates a pool with a single mini-pool holding the supplied series.
    pub fn of_single(metadata: PoolMetadata, main: Vec<TimeSeries<T>>) -> Self {
        let mini = MiniPool::new(metadata.clone(), main);
        Self::new(metadata, vec![mini])
    }

    /// Attaches a climatology to the overall pool.
    pub fn with_climatology(mut self, climatology: Arc<Climatology>) -> Self {
        self.climatology = Some(climatology);
        self
    }

    /// The overall pool metadata.
    pub fn metadata(&self) -> &PoolMetadata {
        &self.metadata
    }

    /// The mini-pools.
    pub fn mini_pools(&self) -> &[MiniPool<T>] {
        &self.mini_pools
    }

    /// All main time series across the mini-pools.
    pub fn main(&self) -> Vec<&TimeSeries<T>> {
        self.mini_pools.iter().flat_map(|m| m.main().iter()).collect()
    }

    /// All baseline time series across the mini-pools, if any are present.
    pub fn baseline(&self) -> Option<Vec<&TimeSeries<T>>> {
        if !self.has_baseline() {
            return None;
        }

        Some(
            self.mini_pools
                .iter()
                .filter_map(|m| m.baseline())
                .flat_map(|b| b.iter())
                .collect(),
        )
    }

    /// Whether any mini-pool has a baseline.
    pub fn has_baseline(&self) -> bool {
        self.mini_pools.iter().any(|m| m.has_baseline())
    }

    /// The climatology, if any.
    pub fn climatology(&self) -> Option<&Arc<Climatology>> {
        self.climatology.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Event, TimeSeriesMetadata};
    use chrono::{TimeZone, Utc};

    fn series(values: &[f64]) -> TimeSeries<f64> {
        let events = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                Event::new(
                    Utc.with_ymd_and_hms(2023, 3, 3, i as u32, 0, 0).unwrap(),
                    v,
                )
            })
            .collect();
        TimeSeries::of(TimeSeriesMetadata::default(), events)
    }

    #[test]
    fn test_pool_flattens_mini_pools() {
        let first = MiniPool::new(PoolMetadata::default(), vec![series(&[1.0, 2.0])]);
        let second = MiniPool::new(PoolMetadata::default(), vec![series(&[3.0, 4.0])]);
        let pool = Pool::new(PoolMetadata::default(), vec![first, second]);

        assert_eq!(pool.main().len(), 2);
        assert!(!pool.has_baseline());
        assert!(pool.baseline().is_none());
    }

    #[test]
    fn test_pool_exposes_baseline() {
        let mini = MiniPool::new(PoolMetadata::default(), vec![series(&[1.0, 2.0])])
            .with_baseline(PoolMetadata::default(), vec![series(&[5.0, 6.0])]);
        let pool = Pool::new(PoolMetadata::default(), vec![mini]);

        assert!(pool.has_baseline());
        assert_eq!(pool.baseline().map(|b| b.len()), Some(1));
    }
}
