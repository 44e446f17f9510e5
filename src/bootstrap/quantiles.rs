//! Streaming quantile calculation over resampled statistics.
//!
//! A [`QuantileCalculator`] accepts one statistics sample per resample
//! iteration, possibly from many producer threads at once, and computes the
//! requested quantiles of the sampling distribution once every expected
//! sample has arrived. The calculator then becomes read only.
//!
//! Every sample slot is pre-allocated from the nominal statistics at
//! construction. A caller claims a slot with an atomic fetch-and-increment
//! and writes only to that slot, so the hot path needs no lock; a second
//! atomic counter elects exactly one completing thread to run the
//! sequential sort-and-quantile pass. The acquire-release increments of the
//! completion counter publish every slot write to the finalizing thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{BootstrapError, Result};
use crate::statistics::{duration_quantile_sorted, quantile_sorted, Statistics};

/// Marks a duration slot that never received a sample, e.g. because the
/// pairs were empty after slicing a realization by threshold.
const MISSING_SECONDS: i64 = i64::MIN;

/// The fully qualified name of a score whose sample quantiles are
/// estimated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScoreKey {
    metric: String,
    component: String,
}

/// The fully qualified name of a diagram component whose sample quantiles
/// are estimated. The qualifier distinguishes repeated component names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DiagramKey {
    metric: String,
    component: String,
    qualifier: String,
}

/// Accepts sample statistics as they are computed and, once all expected
/// samples have been received, calculates the quantiles of the sampling
/// distribution requested on construction.
///
/// The calculator moves through three states: accepting samples, finalizing
/// (exactly one thread) and ready. There is no transition back;
/// [`get`](Self::get) is only valid once ready.
#[derive(Debug)]
pub struct QuantileCalculator {
    /// The nominal statistics, which template every finalized quantile.
    nominal: Statistics,
    /// The expected sample count, including the nominal sample when added.
    sample_count: usize,
    /// The requested probabilities, ascending.
    probabilities: Vec<f64>,
    /// Claims sample slots.
    started: AtomicUsize,
    /// Counts fully written samples and elects the finalizing thread.
    completed: AtomicUsize,
    /// Scalar score samples as f64 bit patterns, one row per score name.
    scores: HashMap<ScoreKey, Vec<AtomicU64>>,
    /// Duration score samples in whole seconds.
    duration_scores: HashMap<ScoreKey, Vec<AtomicI64>>,
    /// Diagram samples, one row per position of each vector component.
    diagrams: HashMap<DiagramKey, Vec<Vec<AtomicU64>>>,
    /// Duration diagram samples keyed by time. The row registry is behind a
    /// lock because the times present can vary with each resample; the row
    /// cells themselves are written lock-free.
    duration_diagrams: HashMap<String, Mutex<HashMap<DateTime<Utc>, Arc<Vec<AtomicI64>>>>>,
    /// The finalized quantiles, one per probability.
    quantiles: OnceLock<Vec<Statistics>>,
}

impl QuantileCalculator {
    /// Creates a calculator that expects `sample_count` samples and
    /// computes one quantile per requested probability.
    ///
    /// When `add_nominal` is true, the capacity grows by one and the
    /// nominal statistics are immediately added as the first sample.
    ///
    /// # Errors
    ///
    /// Returns an argument error when `sample_count` is less than one, when
    /// no probabilities are supplied or when any probability lies outside
    /// the open interval (0, 1).
    pub fn of(
        nominal: Statistics,
        sample_count: usize,
        probabilities: &[f64],
        add_nominal: bool,
    ) -> Result<Self> {
        if sample_count < 1 {
            return Err(BootstrapError::InvalidArgument(format!(
                "at least one sample is required to compute quantiles: {sample_count}"
            )));
        }

        if probabilities.is_empty() {
            return Err(BootstrapError::InvalidArgument(
                "expected at least one probability for which to compute quantiles".to_string(),
            ));
        }

        if probabilities.iter().any(|p| !(*p > 0.0 && *p < 1.0)) {
            return Err(BootstrapError::InvalidArgument(format!(
                "one or more of the supplied probabilities is invalid; the probabilities must be \
                 greater than zero and less than one: {probabilities:?}"
            )));
        }

        let mut probabilities = probabilities.to_vec();
        probabilities.sort_by(|a, b| a.total_cmp(b));
        probabilities.dedup();

        // One more sample when the nominal statistics are stored too
        let sample_count = if add_nominal {
            sample_count + 1
        } else {
            sample_count
        };

        let calculator = Self {
            scores: Self::score_slots(&nominal, sample_count),
            duration_scores: Self::duration_score_slots(&nominal, sample_count),
            diagrams: Self::diagram_slots(&nominal, sample_count),
            duration_diagrams: Self::duration_diagram_slots(&nominal, sample_count),
            nominal,
            sample_count,
            probabilities,
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            quantiles: OnceLock::new(),
        };

        tracing::debug!(
            sample_count,
            probabilities = ?calculator.probabilities,
            scores = calculator.scores.len(),
            duration_scores = calculator.duration_scores.len(),
            diagrams = calculator.diagrams.len(),
            duration_diagrams = calculator.duration_diagrams.len(),
            "created a quantile calculator"
        );

        if add_nominal {
            let nominal = calculator.nominal.clone();
            calculator.add(&nominal)?;
        }

        Ok(calculator)
    }

    /// Adds a sample statistic to the internal store. Safe to call from
    /// many threads at once; each call writes to its own slot.
    ///
    /// The thread that completes the final expected sample computes the
    /// quantiles before returning.
    ///
    /// # Errors
    ///
    /// Returns an argument error when the calculator has already received
    /// its expected sample count, and a resampling error when the sample
    /// contains a statistic for which no slot was created.
    pub fn add(&self, statistics: &Statistics) -> Result<()> {
        let index = self.started.fetch_add(1, Ordering::Relaxed);
        if index >= self.sample_count {
            return Err(BootstrapError::InvalidArgument(format!(
                "already received the expected number of samples from which to compute quantiles \
                 and cannot accept any more: {}",
                self.sample_count
            )));
        }

        self.add_scores(statistics, index)?;
        self.add_duration_scores(statistics, index)?;
        self.add_diagrams(statistics, index)?;
        self.add_duration_diagrams(statistics, index)?;

        tracing::debug!(sample = index + 1, of = self.sample_count, "added sample statistics");

        // Only the thread that completes the final sample finalizes
        if self.completed.fetch_add(1, Ordering::AcqRel) == self.sample_count - 1 {
            self.finalize();
        }

        Ok(())
    }

    /// Returns one finalized statistics record per requested probability,
    /// in ascending probability order.
    ///
    /// # Errors
    ///
    /// Returns an argument error until every expected sample has been
    /// received and the quantiles computed.
    pub fn get(&self) -> Result<&[Statistics]> {
        self.quantiles.get().map(Vec::as_slice).ok_or_else(|| {
            BootstrapError::InvalidArgument(format!(
                "the sample quantiles have not yet been calculated; only {} of the expected {} \
                 samples have been registered with this quantile calculator",
                self.completed.load(Ordering::Acquire),
                self.sample_count
            ))
        })
    }

    fn add_scores(&self, statistics: &Statistics, index: usize) -> Result<()> {
        for score in &statistics.scores {
            for component in &score.components {
                let key = ScoreKey {
                    metric: score.metric.clone(),
                    component: component.name.clone(),
                };
                let row = self.scores.get(&key).ok_or_else(|| Self::missing_slot(&key))?;
                row[index].store(component.value.to_bits(), Ordering::Relaxed);
            }
        }

        Ok(())
    }

    fn add_duration_scores(&self, statistics: &Statistics, index: usize) -> Result<()> {
        for score in &statistics.duration_scores {
            for component in &score.components {
                let key = ScoreKey {
                    metric: score.metric.clone(),
                    component: component.name.clone(),
                };
                let row = self
                    .duration_scores
                    .get(&key)
                    .ok_or_else(|| Self::missing_slot(&key))?;
                let seconds = component
                    .value
                    .map_or(MISSING_SECONDS, |value| value.num_seconds());
                row[index].store(seconds, Ordering::Relaxed);
            }
        }

        Ok(())
    }

    fn add_diagrams(&self, statistics: &Statistics, index: usize) -> Result<()> {
        for diagram in &statistics.diagrams {
            for component in &diagram.components {
                let key = DiagramKey {
                    metric: diagram.metric.clone(),
                    component: component.name.clone(),
                    qualifier: component.qualifier.clone(),
                };
                let rows = self.diagrams.get(&key).ok_or_else(|| Self::missing_slot(&key))?;
                for (position, &value) in component.values.iter().enumerate() {
                    let row = rows.get(position).ok_or_else(|| Self::missing_slot(&key))?;
                    row[index].store(value.to_bits(), Ordering::Relaxed);
                }
            }
        }

        Ok(())
    }

    fn add_duration_diagrams(&self, statistics: &Statistics, index: usize) -> Result<()> {
        for diagram in &statistics.duration_diagrams {
            let registry = self
                .duration_diagrams
                .get(&diagram.metric)
                .ok_or_else(|| Self::missing_slot(&diagram.metric))?;

            for pair in &diagram.pairs {
                // The times present can vary with each resample, depending
                // on how thresholds slice the corresponding series, so new
                // rows may be registered here
                let row = {
                    let mut rows = registry
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    rows.entry(pair.time)
                        .or_insert_with(|| {
                            Arc::new(Self::duration_row(self.sample_count))
                        })
                        .clone()
                };

                row[index].store(pair.error.num_seconds(), Ordering::Relaxed);
            }
        }

        Ok(())
    }

    /// Calculates the quantiles once all expected samples are available.
    ///
    /// Each metric's samples are snapshotted and sorted exactly once,
    /// shared across every requested probability.
    fn finalize(&self) {
        let sorted_scores: HashMap<&ScoreKey, Vec<f64>> = self
            .scores
            .iter()
            .map(|(key, row)| {
                let mut samples: Vec<f64> = row
                    .iter()
                    .map(|cell| f64::from_bits(cell.load(Ordering::Relaxed)))
                    .collect();
                samples.sort_by(|a, b| a.total_cmp(b));
                (key, samples)
            })
            .collect();

        let sorted_durations: HashMap<&ScoreKey, Vec<TimeDelta>> = self
            .duration_scores
            .iter()
            .map(|(key, row)| (key, Self::sorted_duration_samples(row)))
            .collect();

        let sorted_diagrams: HashMap<&DiagramKey, Vec<Vec<f64>>> = self
            .diagrams
            .iter()
            .map(|(key, rows)| {
                let sorted: Vec<Vec<f64>> = rows
                    .iter()
                    .map(|row| {
                        let mut samples: Vec<f64> = row
                            .iter()
                            .map(|cell| f64::from_bits(cell.load(Ordering::Relaxed)))
                            .collect();
                        samples.sort_by(|a, b| a.total_cmp(b));
                        samples
                    })
                    .collect();
                (key, sorted)
            })
            .collect();

        let sorted_duration_diagrams: HashMap<&String, HashMap<DateTime<Utc>, Vec<TimeDelta>>> =
            self.duration_diagrams
                .iter()
                .map(|(metric, registry)| {
                    let rows = registry.lock().unwrap_or_else(PoisonError::into_inner);
                    let sorted = rows
                        .iter()
                        .map(|(time, row)| (*time, Self::sorted_duration_samples(row)))
                        .collect();
                    (metric, sorted)
                })
                .collect();

        let mut quantiles = Vec::with_capacity(self.probabilities.len());
        for &probability in &self.probabilities {
            let mut statistics = self.nominal.clone();
            statistics.sample_quantile = Some(probability);

            for score in &mut statistics.scores {
                for component in &mut score.components {
                    let key = ScoreKey {
                        metric: score.metric.clone(),
                        component: component.name.clone(),
                    };
                    if let Some(samples) = sorted_scores.get(&key) {
                        component.value = quantile_sorted(samples, probability);
                    }
                }
            }

            for score in &mut statistics.duration_scores {
                for component in &mut score.components {
                    let key = ScoreKey {
                        metric: score.metric.clone(),
                        component: component.name.clone(),
                    };
                    if let Some(samples) = sorted_durations.get(&key) {
                        component.value = duration_quantile_sorted(samples, probability);
                    }
                }
            }

            for diagram in &mut statistics.diagrams {
                for component in &mut diagram.components {
                    let key = DiagramKey {
                        metric: diagram.metric.clone(),
                        component: component.name.clone(),
                        qualifier: component.qualifier.clone(),
                    };
                    if let Some(rows) = sorted_diagrams.get(&key) {
                        for (position, value) in component.values.iter_mut().enumerate() {
                            if let Some(samples) = rows.get(position) {
                                *value = quantile_sorted(samples, probability);
                            }
                        }
                    }
                }
            }

            for diagram in &mut statistics.duration_diagrams {
                if let Some(rows) = sorted_duration_diagrams.get(&diagram.metric) {
                    for pair in &mut diagram.pairs {
                        if let Some(quantile) = rows
                            .get(&pair.time)
                            .and_then(|samples| duration_quantile_sorted(samples, probability))
                        {
                            pair.error = quantile;
                        }
                    }
                }
            }

            quantiles.push(statistics);
        }

        // A single finalizer is elected by the completion counter, so this
        // cannot already be set
        let _ = self.quantiles.set(quantiles);

        tracing::debug!("finished setting the quantiles; this calculator is now read only");
    }

    /// Snapshots a duration row, dropping missing samples, and sorts it.
    fn sorted_duration_samples(row: &[AtomicI64]) -> Vec<TimeDelta> {
        let mut samples: Vec<TimeDelta> = row
            .iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .filter(|&seconds| seconds != MISSING_SECONDS)
            .map(TimeDelta::seconds)
            .collect();
        samples.sort();
        samples
    }

    fn missing_slot(name: &dyn std::fmt::Debug) -> BootstrapError {
        BootstrapError::Resampling(format!(
            "encountered an internal error when conducting quantile estimation; could not find a \
             slot in the quantile calculator for a supplied statistic: {name:?}; this probably \
             occurred because the quantile calculator was not created with all required statistics"
        ))
    }

    fn score_row(sample_count: usize) -> Vec<AtomicU64> {
        (0..sample_count)
            .map(|_| AtomicU64::new(f64::NAN.to_bits()))
            .collect()
    }

    fn duration_row(sample_count: usize) -> Vec<AtomicI64> {
        (0..sample_count)
            .map(|_| AtomicI64::new(MISSING_SECONDS))
            .collect()
    }

    fn score_slots(nominal: &Statistics, sample_count: usize) -> HashMap<ScoreKey, Vec<AtomicU64>> {
        let mut slots = HashMap::new();
        for score in &nominal.scores {
            for component in &score.components {
                let key = ScoreKey {
                    metric: score.metric.clone(),
                    component: component.name.clone(),
                };
                slots.insert(key, Self::score_row(sample_count));
            }
        }

        slots
    }

    fn duration_score_slots(
        nominal: &Statistics,
        sample_count: usize,
    ) -> HashMap<ScoreKey, Vec<AtomicI64>> {
        let mut slots = HashMap::new();
        for score in &nominal.duration_scores {
            for component in &score.components {
                let key = ScoreKey {
                    metric: score.metric.clone(),
                    component: component.name.clone(),
                };
                slots.insert(key, Self::duration_row(sample_count));
            }
        }

        slots
    }

    fn diagram_slots(
        nominal: &Statistics,
        sample_count: usize,
    ) -> HashMap<DiagramKey, Vec<Vec<AtomicU64>>> {
        let mut slots = HashMap::new();
        for diagram in &nominal.diagrams {
            for component in &diagram.components {
                let key = DiagramKey {
                    metric: diagram.metric.clone(),
                    component: component.name.clone(),
                    qualifier: component.qualifier.clone(),
                };
                let rows = (0..component.values.len())
                    .map(|_| Self::score_row(sample_count))
                    .collect();
                slots.insert(key, rows);
            }
        }

        slots
    }

    fn duration_diagram_slots(
        nominal: &Statistics,
        sample_count: usize,
    ) -> HashMap<String, Mutex<HashMap<DateTime<Utc>, Arc<Vec<AtomicI64>>>>> {
        let mut slots = HashMap::new();
        for diagram in &nominal.duration_diagrams {
            let mut rows = HashMap::new();
            for pair in &diagram.pairs {
                rows.insert(
                    pair.time,
                    Arc::new(Self::duration_row(sample_count)),
                );
            }
            slots.insert(diagram.metric.clone(), Mutex::new(rows));
        }

        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::{
        DiagramComponent, DiagramStatistic, DurationDiagramStatistic, DurationScoreComponent,
        DurationScoreStatistic, ScoreComponent, ScoreStatistic, TimingErrorPair,
    };
    use chrono::TimeZone;

    fn score_statistics(value: f64) -> Statistics {
        Statistics {
            scores: vec![ScoreStatistic {
                metric: "BIAS_FRACTION".to_string(),
                components: vec![ScoreComponent {
                    name: "MAIN".to_string(),
                    value,
                }],
            }],
            ..Statistics::default()
        }
    }

    fn duration_statistics(value: TimeDelta) -> Statistics {
        Statistics {
            duration_scores: vec![DurationScoreStatistic {
                metric: "TIME_TO_PEAK_ERROR_STATISTIC".to_string(),
                components: vec![DurationScoreComponent {
                    name: "MEAN".to_string(),
                    value: Some(value),
                }],
            }],
            ..Statistics::default()
        }
    }

    fn score_value(statistics: &Statistics) -> f64 {
        statistics.scores[0].components[0].value
    }

    #[test]
    fn test_quantiles_for_scores() {
        let calculator =
            QuantileCalculator::of(score_statistics(0.5), 10, &[0.1, 0.5, 0.9], false).unwrap();

        for i in 1..=10 {
            calculator.add(&score_statistics(f64::from(i))).unwrap();
        }

        let quantiles = calculator.get().unwrap();

        assert_eq!(quantiles.len(), 3);
        approx::assert_relative_eq!(score_value(&quantiles[0]), 1.1);
        approx::assert_relative_eq!(score_value(&quantiles[1]), 5.5);
        approx::assert_relative_eq!(score_value(&quantiles[2]), 9.9);
        assert_eq!(quantiles[0].sample_quantile, Some(0.1));
        assert_eq!(quantiles[1].sample_quantile, Some(0.5));
        assert_eq!(quantiles[2].sample_quantile, Some(0.9));
    }

    #[test]
    fn test_quantiles_for_scores_when_adding_nominal_statistics() {
        let calculator = QuantileCalculator::of(score_statistics(0.0), 10, &[0.5], true).unwrap();

        for i in 1..=10 {
            calculator.add(&score_statistics(f64::from(i))).unwrap();
        }

        let quantiles = calculator.get().unwrap();

        assert_eq!(quantiles.len(), 1);
        approx::assert_relative_eq!(score_value(&quantiles[0]), 5.0);
    }

    #[test]
    fn test_quantiles_for_diagrams() {
        fn diagram(first: f64, second: f64) -> Statistics {
            Statistics {
                diagrams: vec![DiagramStatistic {
                    metric: "RELATIVE_OPERATING_CHARACTERISTIC_DIAGRAM".to_string(),
                    components: vec![
                        DiagramComponent {
                            name: "PROBABILITY_OF_DETECTION".to_string(),
                            qualifier: String::new(),
                            values: vec![first; 3],
                        },
                        DiagramComponent {
                            name: "PROBABILITY_OF_FALSE_DETECTION".to_string(),
                            qualifier: String::new(),
                            values: vec![second; 3],
                        },
                    ],
                }],
                ..Statistics::default()
            }
        }

        let calculator =
            QuantileCalculator::of(diagram(1.0, 1.0), 10, &[0.1, 0.5, 0.9], false).unwrap();

        for i in 1..=10 {
            calculator
                .add(&diagram(f64::from(i), f64::from(i) + 5.0))
                .unwrap();
        }

        let quantiles = calculator.get().unwrap();

        let first = &quantiles[0].diagrams[0];
        assert_eq!(first.components[0].values, vec![1.1; 3]);
        assert_eq!(first.components[1].values, vec![6.1; 3]);

        let second = &quantiles[1].diagrams[0];
        assert_eq!(second.components[0].values, vec![5.5; 3]);
        assert_eq!(second.components[1].values, vec![10.5; 3]);

        let third = &quantiles[2].diagrams[0];
        assert_eq!(third.components[0].values, vec![9.9; 3]);
        assert_eq!(third.components[1].values, vec![14.9; 3]);
    }

    #[test]
    fn test_quantiles_for_duration_scores() {
        let calculator =
            QuantileCalculator::of(duration_statistics(TimeDelta::seconds(50)), 10, &[0.1, 0.5, 0.9], false)
                .unwrap();

        for i in 1..=10 {
            calculator
                .add(&duration_statistics(TimeDelta::hours(i)))
                .unwrap();
        }

        let quantiles = calculator.get().unwrap();

        let values: Vec<_> = quantiles
            .iter()
            .map(|q| q.duration_scores[0].components[0].value)
            .collect();
        assert_eq!(
            values,
            vec![
                Some(TimeDelta::seconds(3960)),
                Some(TimeDelta::seconds(19800)),
                Some(TimeDelta::seconds(35640)),
            ]
        );
    }

    #[test]
    fn test_quantiles_for_duration_diagrams() {
        fn diagram(offset: i64) -> Statistics {
            let pairs = (0..3)
                .map(|i| TimingErrorPair {
                    time: Utc.with_ymd_and_hms(2023, 3, 3, i as u32, 0, 0).unwrap(),
                    error: TimeDelta::hours(offset + i),
                })
                .collect();
            Statistics {
                duration_diagrams: vec![DurationDiagramStatistic {
                    metric: "TIME_TO_PEAK_ERROR".to_string(),
                    pairs,
                }],
                ..Statistics::default()
            }
        }

        let calculator = QuantileCalculator::of(diagram(1), 10, &[0.1, 0.5, 0.9], false).unwrap();

        for i in 1..=10 {
            calculator.add(&diagram(i)).unwrap();
        }

        let quantiles = calculator.get().unwrap();

        let errors = |index: usize| -> Vec<TimeDelta> {
            quantiles[index].duration_diagrams[0]
                .pairs
                .iter()
                .map(|p| p.error)
                .collect()
        };

        assert_eq!(
            errors(0),
            vec![
                TimeDelta::seconds(3960),
                TimeDelta::seconds(7560),
                TimeDelta::seconds(11160)
            ]
        );
        assert_eq!(
            errors(1),
            vec![
                TimeDelta::seconds(19800),
                TimeDelta::seconds(23400),
                TimeDelta::seconds(27000)
            ]
        );
        assert_eq!(
            errors(2),
            vec![
                TimeDelta::seconds(35640),
                TimeDelta::seconds(39240),
                TimeDelta::seconds(42840)
            ]
        );
    }

    #[test]
    fn test_multithreaded_add_is_deterministic() {
        for _ in 0..50 {
            let calculator =
                QuantileCalculator::of(score_statistics(0.5), 10, &[0.1, 0.5, 0.9], false)
                    .unwrap();

            std::thread::scope(|scope| {
                for i in 1..=10 {
                    let calculator = &calculator;
                    scope.spawn(move || {
                        calculator.add(&score_statistics(f64::from(i))).unwrap();
                    });
                }
            });

            let quantiles = calculator.get().unwrap();
            approx::assert_relative_eq!(score_value(&quantiles[0]), 1.1);
            approx::assert_relative_eq!(score_value(&quantiles[1]), 5.5);
            approx::assert_relative_eq!(score_value(&quantiles[2]), 9.9);
        }
    }

    #[test]
    fn test_get_before_completion_is_an_error() {
        let calculator =
            QuantileCalculator::of(score_statistics(0.5), 2, &[0.5], false).unwrap();

        calculator.add(&score_statistics(1.0)).unwrap();

        assert!(matches!(
            calculator.get(),
            Err(BootstrapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_add_beyond_capacity_is_an_error() {
        let calculator =
            QuantileCalculator::of(score_statistics(0.5), 1, &[0.5], false).unwrap();

        calculator.add(&score_statistics(1.0)).unwrap();

        assert!(matches!(
            calculator.add(&score_statistics(2.0)),
            Err(BootstrapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_sample_count_is_rejected() {
        let result = QuantileCalculator::of(score_statistics(0.5), 0, &[0.5], false);

        assert!(matches!(result, Err(BootstrapError::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_probabilities_are_rejected() {
        let result = QuantileCalculator::of(score_statistics(0.5), 10, &[], false);

        assert!(matches!(result, Err(BootstrapError::InvalidArgument(_))));
    }

    #[test]
    fn test_out_of_range_probabilities_are_rejected() {
        for probability in [0.0, 1.0, -0.1, 1.1, f64::NAN] {
            let result = QuantileCalculator::of(score_statistics(0.5), 10, &[probability], false);
            assert!(
                matches!(result, Err(BootstrapError::InvalidArgument(_))),
                "probability {} should be rejected",
                probability
            );
        }
    }

    #[test]
    fn test_unknown_statistic_is_an_error() {
        let calculator =
            QuantileCalculator::of(score_statistics(0.5), 2, &[0.5], false).unwrap();

        let mut unknown = score_statistics(1.0);
        unknown.scores[0].metric = "MEAN_ERROR".to_string();

        assert!(matches!(
            calculator.add(&unknown),
            Err(BootstrapError::Resampling(_))
        ));
    }
}
