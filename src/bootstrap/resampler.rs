//! Stationary block bootstrap resampling of time-series pools.
//!
//! Resamples a pool of time series supplied on construction using the
//! stationary block bootstrap, whose block size is geometrically distributed
//! with a probability of success `p` and a mean block size of `1/p`. See:
//!
//! Politis, D. N. and Romano, J. P. (1994). The Stationary Bootstrap.
//! Journal of the American Statistical Association, 89:428, 1303-1313.
//!
//! When the pool contains a baseline, the baseline series are assumed to be
//! perfectly statistically dependent on the main series: one sample
//! structure (block sizes and positions) drives both sides, and likewise
//! every mini-pool. Forecast series are unlikely to be stationary across
//! lead durations, so their candidate events are restricted to the same
//! event index in other series; only the series dimension is sampled.
//!
//! Regular time series are assumed. The gap between the first valid times
//! of consecutive series parameterizes a transition probability `q` for
//! sampling the next series: the mean number of blocks per gap is floored
//! at one and `q = 1 / blocks-per-gap`, so larger gaps increase the
//! probability of an unrelated (random) restart.
//!
//! As originally envisaged, the stationary bootstrap resamples a single
//! observation-like series. The generalization here to mini-pools,
//! main/baseline pairs and forecast lead times is based on unpublished
//! work and should be interpreted accordingly.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::TimeDelta;
use rand::distr::{Bernoulli, Distribution};
use rand::Rng;
use rayon::prelude::*;

use crate::bootstrap::pool::BootstrapPool;
use crate::bootstrap::utilities;
use crate::error::{BootstrapError, Result};
use crate::pairs::{CrossPairer, ExactCrossPairer};
use crate::pool::{MiniPool, Pool};
use crate::time::{Event, TimeSeries};

/// The resample indexes for one output series: an ordered list of
/// (candidate series, candidate event) pairs, one per output position,
/// referencing positions within a [`BootstrapPool`]'s candidate ordering.
///
/// Generated once per [`StationaryBootstrapResampler::resample`] call and
/// shared read-only across every mini-pool and the main/baseline sides.
#[derive(Debug, Clone)]
struct ResampleIndexes {
    indexes: Vec<(usize, usize)>,
}

/// The sampling policy for one output series, resolved once at
/// index-generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SamplingPolicy {
    /// Stationary only across series at a fixed lead index.
    Forecast,
    /// Stationary across the whole event sequence.
    NonForecast,
}

impl SamplingPolicy {
    fn for_series<T>(series: &TimeSeries<T>) -> Self {
        if series.is_forecast() {
            Self::Forecast
        } else {
            Self::NonForecast
        }
    }
}

/// Resamples a pool of time series using the stationary block bootstrap.
///
/// One instance is constructed per evaluation pool; each call to
/// [`resample`](Self::resample) produces an independent realization. The
/// per-series apply step runs on the injected thread pool.
#[derive(Debug)]
pub struct StationaryBootstrapResampler<T, R> {
    /// The cross-paired pool whose shape every realization reproduces.
    pool: Pool<T>,
    /// The indexed main side of each mini-pool.
    main: Vec<BootstrapPool<T>>,
    /// The indexed baseline side of each mini-pool with a baseline.
    baseline: Vec<BootstrapPool<T>>,
    /// Samples true with probability `p = 1 / mean block size`: restart at
    /// a random position rather than continuing the current block.
    p: Bernoulli,
    /// Per-gap probabilities of restarting when transitioning between
    /// series whose first valid times are separated by that gap.
    q: BTreeMap<TimeDelta, Bernoulli>,
    rng: R,
    executor: Arc<rayon::ThreadPool>,
}

impl<T, R> StationaryBootstrapResampler<T, R>
where
    T: Clone + Send + Sync,
    R: Rng,
{
    /// Creates a resampler.
    ///
    /// The mean block size is expressed in timestep units and the timestep
    /// is the nominal spacing between consecutive valid times.
    ///
    /// # Errors
    ///
    /// Returns an argument error when the block size or timestep is not
    /// positive or when the pool contains more than one non-forecast
    /// series, and an insufficient-data error when cross-pairing leaves any
    /// sub-pool side with fewer than two overlapping events.
    pub fn of(
        pool: Pool<T>,
        mean_block_size: u64,
        timestep: TimeDelta,
        rng: R,
        executor: Arc<rayon::ThreadPool>,
    ) -> Result<Self> {
        if mean_block_size == 0 {
            return Err(BootstrapError::InvalidArgument(format!(
                "the mean block size for the stationary bootstrap must be greater than zero but \
                 was: {mean_block_size}"
            )));
        }

        if timestep <= TimeDelta::zero() {
            return Err(BootstrapError::InvalidArgument(format!(
                "the timestep for the stationary bootstrap must be greater than zero but was: \
                 {timestep}"
            )));
        }

        if pool.main().is_empty() {
            return Err(BootstrapError::InvalidArgument(format!(
                "cannot resample an empty pool: {}",
                pool.metadata()
            )));
        }

        // Non-forecast series must be consolidated before resampling
        let non_forecast_count = pool.main().iter().filter(|s| !s.is_forecast()).count();
        if non_forecast_count > 1 {
            return Err(BootstrapError::InvalidArgument(
                "cannot resample a pool that contains more than one non-forecast time series; \
                 these time series should be consolidated prior to resampling"
                    .to_string(),
            ));
        }

        // Warn about irregular series, which undermine a constant
        // transition probability between adjacent times
        let mut timesteps: BTreeSet<TimeDelta> = BTreeSet::new();
        for series in pool.main() {
            timesteps.extend(series.timesteps());
        }
        if let Some(baseline) = pool.baseline() {
            for series in baseline {
                timesteps.extend(series.timesteps());
            }
        }
        if timesteps.len() > 1 {
            tracing::warn!(
                timesteps = ?timesteps,
                "discovered more than one timestep among the time series to resample, which may \
                 be caused by missing data or irregular series; the sampling uncertainty \
                 estimates may be unreliable"
            );
        }

        let pool = Self::cross_pair(pool)?;

        // The same events are resampled across every sub-pool and side, so
        // each must retain some overlap after cross-pairing
        for mini in pool.mini_pools() {
            if !utilities::has_sufficient_data(mini.main()) {
                return Err(BootstrapError::InsufficientData(format!(
                    "fewer than two overlapping events remained in the main data of a sub-pool \
                     after cross-pairing; ensure there are some common time-series events across \
                     the datasets that compose each pool or remove the sampling uncertainty \
                     assessment ({})",
                    mini.metadata()
                )));
            }

            if let Some(baseline) = mini.baseline() {
                if !utilities::has_sufficient_data(baseline) {
                    return Err(BootstrapError::InsufficientData(format!(
                        "fewer than two overlapping events remained in the baseline data of a \
                         sub-pool after cross-pairing; ensure there are some common time-series \
                         events across the datasets that compose each pool or remove the \
                         sampling uncertainty assessment ({})",
                        mini.metadata()
                    )));
                }
            }
        }

        let p_probability = 1.0 / mean_block_size as f64;
        let p = Bernoulli::new(p_probability).map_err(|error| {
            BootstrapError::InvalidArgument(format!(
                "failed to create a block transition probability of {p_probability}: {error}"
            ))
        })?;

        let mut main = Vec::with_capacity(pool.mini_pools().len());
        let mut baseline = Vec::new();
        let mut offsets: BTreeSet<TimeDelta> = BTreeSet::new();
        for mini in pool.mini_pools() {
            let next = BootstrapPool::build(mini)?;
            offsets.extend(next.valid_time_offsets().iter().copied());
            main.push(next);

            if mini.has_baseline() {
                let next_baseline = BootstrapPool::build_baseline(mini)?;
                offsets.extend(next_baseline.valid_time_offsets().iter().copied());
                baseline.push(next_baseline);
            }
        }

        let q = Self::transition_probabilities(timestep, &offsets, mean_block_size)?;

        tracing::debug!(
            mean_block_size,
            p = p_probability,
            transitions = q.len(),
            main_pools = main.len(),
            baseline_pools = baseline.len(),
            "created a stationary bootstrap resampler"
        );

        Ok(Self {
            pool,
            main,
            baseline,
            p,
            q,
            rng,
            executor,
        })
    }

    /// Generates one realization of the pool.
    ///
    /// A single set of resample indexes is generated and applied to every
    /// mini-pool and to both the main and baseline sides, enforcing the
    /// perfect-dependence assumption. Only event values are resampled; the
    /// output retains its own time structure.
    pub fn resample(&mut self) -> Result<Pool<T>> {
        let indexes = Self::generate_indexes(&self.main[0], &self.p, &self.q, &mut self.rng)?;

        let mut minis = Vec::with_capacity(self.main.len());
        let mut baseline_pools = self.baseline.iter();
        for (bootstrap, template) in self.main.iter().zip(self.pool.mini_pools()) {
            let main_series = self.apply(bootstrap, &indexes)?;
            let mut mini = MiniPool::new(template.metadata().clone(), main_series);
            if let Some(climatology) = template.climatology() {
                mini = mini.with_climatology(climatology.clone());
            }

            if template.has_baseline() {
                let baseline_pool = baseline_pools.next().ok_or_else(|| {
                    BootstrapError::Resampling(
                        "missing a baseline bootstrap pool for a sub-pool with baseline data"
                            .to_string(),
                    )
                })?;
                let baseline_series = self.apply(baseline_pool, &indexes)?;
                mini = mini.with_baseline(
                    template.baseline_metadata().cloned().unwrap_or_default(),
                    baseline_series,
                );
            }

            minis.push(mini);
        }

        let mut resampled = Pool::new(self.pool.metadata().clone(), minis);
        if let Some(climatology) = self.pool.climatology() {
            resampled = resampled.with_climatology(climatology.clone());
        }

        Ok(resampled)
    }

    /// The candidates a series samples from. Forecasts are restricted to
    /// series with at least as many events; non-forecasts sample across all
    /// events. Index generation and the apply step must both resolve
    /// candidates through this function so their orderings agree.
    fn candidates_for<'a>(
        pool: &'a BootstrapPool<T>,
        series: &TimeSeries<T>,
    ) -> &'a [Arc<Vec<Event<T>>>] {
        match SamplingPolicy::for_series(series) {
            SamplingPolicy::Forecast => pool.time_series_with_at_least(series.len()),
            SamplingPolicy::NonForecast => pool.time_series_with_all_events(),
        }
    }

    /// Generates the indexes for resampling, one [`ResampleIndexes`] per
    /// output series in candidate order.
    fn generate_indexes(
        pool: &BootstrapPool<T>,
        p: &Bernoulli,
        q: &BTreeMap<TimeDelta, Bernoulli>,
        rng: &mut R,
    ) -> Result<Vec<ResampleIndexes>> {
        let ordered = pool.ordered_series();
        let mut outer: Vec<ResampleIndexes> = Vec::with_capacity(ordered.len());

        // Traverse one size group at a time: transitions between series
        // only relate series within the same group, since candidates are
        // shared across a group
        let mut start = 0;
        while start < ordered.len() {
            let size = ordered[start].len();
            let end = start
                + ordered[start..]
                    .iter()
                    .take_while(|s| s.len() == size)
                    .count();

            let mut group: Vec<ResampleIndexes> = Vec::with_capacity(end - start);
            for (series_index, series) in ordered[start..end].iter().enumerate() {
                let candidates = Self::candidates_for(pool, series);
                let next = match SamplingPolicy::for_series(series) {
                    SamplingPolicy::Forecast => Self::generate_forecast_indexes(
                        series,
                        series_index,
                        candidates,
                        &group,
                        p,
                        q,
                        rng,
                    )?,
                    SamplingPolicy::NonForecast => {
                        Self::generate_non_forecast_indexes(series, candidates, p, q, rng)?
                    }
                };
                group.push(next);
            }

            outer.extend(group);
            start = end;
        }

        Ok(outer)
    }

    /// Generates indexes for a forecast series. Samples are only taken from
    /// the nominated event index, so the random sampling is with respect to
    /// series, never event positions.
    fn generate_forecast_indexes(
        series: &TimeSeries<T>,
        series_index: usize,
        candidates: &[Arc<Vec<Event<T>>>],
        group: &[ResampleIndexes],
        p: &Bernoulli,
        q: &BTreeMap<TimeDelta, Bernoulli>,
        rng: &mut R,
    ) -> Result<ResampleIndexes> {
        let events = series.len();
        let count = candidates.len();
        if count == 0 {
            return Err(BootstrapError::Resampling(format!(
                "no candidate series were available for resampling a forecast series with {events} \
                 events"
            )));
        }

        let mut indexes: Vec<(usize, usize)> = Vec::with_capacity(events);
        for event_index in 0..events {
            let next_series = if series_index == 0 && event_index == 0 {
                // The very first sample is always drawn uniformly
                rng.random_range(0..count)
            } else if event_index == 0 {
                // The first event of a later series depends on the prior
                // series via the gap-specific transition probability
                Self::transition_series(candidates, &group[series_index - 1], p, q, rng)?
            } else if p.sample(rng) {
                rng.random_range(0..count)
            } else {
                // Continue in the series used for the previous lead index
                indexes[event_index - 1].0
            };

            indexes.push((next_series, event_index));
        }

        Ok(ResampleIndexes { indexes })
    }

    /// Generates indexes for a non-forecast series. The candidate events
    /// are unconstrained across the supplied series, subject only to the
    /// dependence imposed by the bootstrap itself.
    fn generate_non_forecast_indexes(
        series: &TimeSeries<T>,
        candidates: &[Arc<Vec<Event<T>>>],
        p: &Bernoulli,
        q: &BTreeMap<TimeDelta, Bernoulli>,
        rng: &mut R,
    ) -> Result<ResampleIndexes> {
        let events = series.len();
        let count = candidates.len();
        if count == 0 {
            return Err(BootstrapError::Resampling(format!(
                "no candidate series were available for resampling a non-forecast series with \
                 {events} events"
            )));
        }

        let mut indexes: Vec<(usize, usize)> = Vec::with_capacity(events);
        for event_index in 0..events {
            let next = if event_index == 0 || p.sample(rng) {
                Self::random_event(candidates, rng)?
            } else {
                let (last_series, last_event) = indexes[event_index - 1];
                if last_event + 1 < candidates[last_series].len() {
                    (last_series, last_event + 1)
                } else if count == 1 {
                    // A single candidate series wraps to its first event
                    (last_series, 0)
                } else {
                    // The current series is exhausted: move to the next in
                    // start-time order or restart at random
                    let mut next_series = last_series + 1;
                    let sampler = if next_series >= count {
                        // Circular wrap to the first series uses the
                        // within-series probability, as in the
                        // single-series treatment
                        next_series = 0;
                        p
                    } else {
                        let gap = Self::first_valid_gap(candidates, last_series, next_series)?;
                        Self::lookup_transition(q, gap)?
                    };

                    if sampler.sample(rng) {
                        Self::random_event(candidates, rng)?
                    } else {
                        (next_series, 0)
                    }
                }
            };

            indexes.push(next);
        }

        Ok(ResampleIndexes { indexes })
    }

    /// Chooses the candidate series for the first event of a series that is
    /// not the first in its group: the series adjacent to the previous
    /// series' first sample, restarted at random with the gap-specific
    /// transition probability.
    fn transition_series(
        candidates: &[Arc<Vec<Event<T>>>],
        previous: &ResampleIndexes,
        p: &Bernoulli,
        q: &BTreeMap<TimeDelta, Bernoulli>,
        rng: &mut R,
    ) -> Result<usize> {
        let count = candidates.len();
        let last_series = previous.indexes.first().map(|&(s, _)| s).ok_or_else(|| {
            BootstrapError::Resampling(
                "the previous series has no resample indexes from which to transition".to_string(),
            )
        })?;

        let mut next_series = last_series + 1;
        let sampler = if next_series >= count {
            // Circular wrap to the first series uses the within-series
            // probability, as in the single-series treatment
            next_series = 0;
            p
        } else {
            let gap = Self::first_valid_gap(candidates, last_series, next_series)?;
            Self::lookup_transition(q, gap)?
        };

        if sampler.sample(rng) {
            next_series = rng.random_range(0..count);
        }

        Ok(next_series)
    }

    /// A uniformly random (series, event) position among the candidates.
    fn random_event(
        candidates: &[Arc<Vec<Event<T>>>],
        rng: &mut R,
    ) -> Result<(usize, usize)> {
        let series = rng.random_range(0..candidates.len());
        let events = candidates[series].len();
        if events == 0 {
            return Err(BootstrapError::Resampling(
                "encountered an empty candidate series while sampling a random event".to_string(),
            ));
        }

        Ok((series, rng.random_range(0..events)))
    }

    /// The absolute gap between the first valid times of two candidates.
    fn first_valid_gap(
        candidates: &[Arc<Vec<Event<T>>>],
        first: usize,
        second: usize,
    ) -> Result<TimeDelta> {
        let missing = || {
            BootstrapError::Resampling(
                "encountered an empty candidate series while computing a transition gap"
                    .to_string(),
            )
        };
        let first_time = candidates[first].first().ok_or_else(missing)?.valid_time;
        let second_time = candidates[second].first().ok_or_else(missing)?.valid_time;

        Ok((second_time - first_time).abs())
    }

    /// Finds the transition sampler for a gap, falling back to the
    /// zero-gap sampler when the exact gap is not registered.
    fn lookup_transition(
        q: &BTreeMap<TimeDelta, Bernoulli>,
        gap: TimeDelta,
    ) -> Result<&Bernoulli> {
        q.get(&gap)
            .or_else(|| q.get(&TimeDelta::zero()))
            .ok_or_else(|| {
                BootstrapError::Resampling(format!(
                    "failed to discover a sampler for a transition between time series separated \
                     by {gap}; samplers were available for the following durations: {:?}",
                    q.keys().collect::<Vec<_>>()
                ))
            })
    }

    /// Applies the indexes to one side of one mini-pool, resampling every
    /// series in parallel on the injected thread pool.
    fn apply(
        &self,
        pool: &BootstrapPool<T>,
        indexes: &[ResampleIndexes],
    ) -> Result<Vec<TimeSeries<T>>> {
        let ordered = pool.ordered_series();
        if ordered.len() != indexes.len() {
            return Err(BootstrapError::Resampling(format!(
                "expected resample indexes for {} series but found {}; the sub-pools do not share \
                 a common structure",
                ordered.len(),
                indexes.len()
            )));
        }

        self.executor.install(|| {
            ordered
                .par_iter()
                .enumerate()
                .map(|(i, series)| Self::resample_series(pool, series, &indexes[i]))
                .collect::<Result<Vec<_>>>()
        })
    }

    /// Resamples one series: each output event keeps its own valid time and
    /// takes the value at its mapped (series, event) candidate position.
    fn resample_series(
        pool: &BootstrapPool<T>,
        series: &TimeSeries<T>,
        indexes: &ResampleIndexes,
    ) -> Result<TimeSeries<T>> {
        let candidates = Self::candidates_for(pool, series);
        if indexes.indexes.len() != series.len() {
            return Err(BootstrapError::Resampling(format!(
                "expected {} resample indexes for a series with {} events but found {}",
                series.len(),
                series.len(),
                indexes.indexes.len()
            )));
        }

        let events = series
            .events()
            .iter()
            .zip(&indexes.indexes)
            .map(|(event, &(s, e))| {
                let sampled = candidates.get(s).and_then(|c| c.get(e)).ok_or_else(|| {
                    BootstrapError::Resampling(format!(
                        "resample index ({s}, {e}) lies outside the candidate structure for a \
                         series with {} events",
                        series.len()
                    ))
                })?;

                Ok(Event::new(event.valid_time, sampled.value.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TimeSeries::new(
            series.metadata().clone(),
            series.reference_times().clone(),
            events,
        ))
    }

    /// Cross-pairs all mini-pools and main/baseline series into one common
    /// structure.
    fn cross_pair(pool: Pool<T>) -> Result<Pool<T>> {
        if pool.mini_pools().len() == 1 && !pool.has_baseline() {
            tracing::debug!("no cross-pairing required for the pool to resample");
            return Ok(pool);
        }

        let pairer = ExactCrossPairer;
        let minis = pool.mini_pools();
        let (series_before, events_before) = Self::census(&pool);

        // Reduce the first mini-pool's main series against every other
        // main and baseline collection, then use the result to cross-pair
        // everything else
        let mut first: Vec<TimeSeries<T>> = minis[0].main().to_vec();
        for mini in &minis[1..] {
            first = pairer.apply(&first, mini.main()).first_pairs;
            if let Some(baseline) = mini.baseline() {
                first = pairer.apply(&first, baseline).first_pairs;
            }
        }

        let mut rebuilt = Vec::with_capacity(minis.len());

        let template = &minis[0];
        let mut mini = if let Some(baseline) = template.baseline() {
            let paired = pairer.apply(&first, baseline);
            first = paired.first_pairs.clone();
            MiniPool::new(template.metadata().clone(), paired.first_pairs).with_baseline(
                template.baseline_metadata().cloned().unwrap_or_default(),
                paired.second_pairs,
            )
        } else {
            MiniPool::new(template.metadata().clone(), first.clone())
        };
        if let Some(climatology) = template.climatology() {
            mini = mini.with_climatology(climatology.clone());
        }
        rebuilt.push(mini);

        for template in &minis[1..] {
            let main_paired = pairer.apply(template.main(), &first).first_pairs;
            let mut mini = MiniPool::new(template.metadata().clone(), main_paired);
            if let Some(baseline) = template.baseline() {
                let baseline_paired = pairer.apply(baseline, &first).first_pairs;
                mini = mini.with_baseline(
                    template.baseline_metadata().cloned().unwrap_or_default(),
                    baseline_paired,
                );
            }
            if let Some(climatology) = template.climatology() {
                mini = mini.with_climatology(climatology.clone());
            }
            rebuilt.push(mini);
        }

        let mut crossed = Pool::new(pool.metadata().clone(), rebuilt);
        if let Some(climatology) = pool.climatology() {
            crossed = crossed.with_climatology(climatology.clone());
        }

        let (series_after, events_after) = Self::census(&crossed);
        if series_after != series_before || events_after != events_before {
            tracing::debug!(
                series_before,
                series_after,
                events_before,
                events_after,
                "cross-pairing removed time series or events to obtain a common structure; when \
                 the datasets within a pool differ greatly, the sampling uncertainty estimates \
                 may not be very reliable"
            );
        }

        Ok(crossed)
    }

    /// Counts the series and events across both sides of a pool.
    fn census(pool: &Pool<T>) -> (usize, usize) {
        let mut series = 0;
        let mut events = 0;
        for s in pool.main() {
            series += 1;
            events += s.len();
        }
        if let Some(baseline) = pool.baseline() {
            for s in baseline {
                series += 1;
                events += s.len();
            }
        }

        (series, events)
    }

    /// Creates one transition sampler per distinct gap between the first
    /// valid times of size-adjacent series.
    fn transition_probabilities(
        timestep: TimeDelta,
        offsets: &BTreeSet<TimeDelta>,
        mean_block_size: u64,
    ) -> Result<BTreeMap<TimeDelta, Bernoulli>> {
        let mut samplers = BTreeMap::new();
        for &offset in offsets {
            let probability = Self::transition_probability(timestep, offset, mean_block_size);
            let sampler = Bernoulli::new(probability).map_err(|error| {
                BootstrapError::InvalidArgument(format!(
                    "failed to create a series transition probability of {probability} for a \
                     gap of {offset}: {error}"
                ))
            })?;
            samplers.insert(offset, sampler);
        }

        Ok(samplers)
    }

    /// The probability of restarting at random when transitioning between
    /// series separated by the given gap.
    ///
    /// Gaps smaller than one timestep use the within-series probability.
    /// Otherwise the number of mean blocks per gap is computed from the
    /// rounded timesteps-per-gap ratio and floored at one, so a block that
    /// cannot span even one gap always restarts at random.
    fn transition_probability(
        timestep: TimeDelta,
        offset: TimeDelta,
        mean_block_size: u64,
    ) -> f64 {
        if offset < timestep {
            return 1.0 / mean_block_size as f64;
        }

        let timestep_seconds = timestep.num_milliseconds() as f64 / 1000.0;
        let offset_seconds = offset.num_milliseconds() as f64 / 1000.0;

        // Round half up to whole timesteps per gap
        let timesteps_per_offset = (timestep_seconds / offset_seconds).round();

        let mut mean_blocks_per_offset = timesteps_per_offset * mean_block_size as f64;
        if mean_blocks_per_offset < 1.0 {
            mean_blocks_per_offset = 1.0;
        }

        1.0 / mean_blocks_per_offset
    }
}
