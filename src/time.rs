//! Time-series value types: events, series and their metadata.
//!
//! Time series are immutable once constructed. A series with one or more
//! reference times is a forecast; a series with none is observation-like.
//! This distinction drives the resampling policy: forecasts are only
//! stationary across series at a fixed lead index, whereas non-forecasts are
//! stationary across their whole event sequence.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// An immutable (valid time, value) pair within a time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event<T> {
    /// The time at which the value is valid.
    pub valid_time: DateTime<Utc>,
    /// The event value.
    pub value: T,
}

impl<T> Event<T> {
    /// Creates an event.
    pub fn new(valid_time: DateTime<Utc>, value: T) -> Self {
        Self { valid_time, value }
    }
}

/// A pair of left (observation-like) and right (prediction-like) values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pair<L, R> {
    /// The left value, conventionally the observation.
    pub left: L,
    /// The right value, conventionally the prediction.
    pub right: R,
}

impl<L, R> Pair<L, R> {
    /// Creates a pair.
    pub fn of(left: L, right: R) -> Self {
        Self { left, right }
    }
}

/// Descriptive metadata for a time series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSeriesMetadata {
    /// The variable name, e.g. streamflow.
    pub variable: String,
    /// The geographic feature the series belongs to.
    pub feature: String,
    /// The measurement unit.
    pub unit: String,
}

/// An ordered, immutable sequence of events plus zero or more forecast
/// reference times and metadata.
///
/// Events are ordered by valid time on construction and duplicate valid
/// times are removed, keeping the first occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries<T> {
    metadata: TimeSeriesMetadata,
    reference_times: BTreeSet<DateTime<Utc>>,
    events: Vec<Event<T>>,
}

impl<T> TimeSeries<T> {
    /// Creates a time series with the given reference times.
    pub fn new(
        metadata: TimeSeriesMetadata,
        reference_times: BTreeSet<DateTime<Utc>>,
        mut events: Vec<Event<T>>,
    ) -> Self {
        events.sort_by_key(|e| e.valid_time);
        events.dedup_by_key(|e| e.valid_time);

        Self {
            metadata,
            reference_times,
            events,
        }
    }

    /// Creates a non-forecast time series (no reference times).
    pub fn of(metadata: TimeSeriesMetadata, events: Vec<Event<T>>) -> Self {
        Self::new(metadata, BTreeSet::new(), events)
    }

    /// The events in valid-time order.
    pub fn events(&self) -> &[Event<T>] {
        &self.events
    }

    /// The series metadata.
    pub fn metadata(&self) -> &TimeSeriesMetadata {
        &self.metadata
    }

    /// The forecast reference times. Empty for a non-forecast series.
    pub fn reference_times(&self) -> &BTreeSet<DateTime<Utc>> {
        &self.reference_times
    }

    /// Whether this series is a forecast, i.e. has one or more reference
    /// times.
    pub fn is_forecast(&self) -> bool {
        !self.reference_times.is_empty()
    }

    /// The number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the series contains no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The valid time of the first event, if any.
    pub fn first_valid_time(&self) -> Option<DateTime<Utc>> {
        self.events.first().map(|e| e.valid_time)
    }

    /// The distinct gaps between consecutive valid times.
    ///
    /// A regular series has exactly one timestep; more than one indicates
    /// missing data or irregular spacing.
    pub fn timesteps(&self) -> BTreeSet<TimeDelta> {
        self.events
            .windows(2)
            .map(|pair| pair[1].valid_time - pair[0].valid_time)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn time(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 3, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_events_are_ordered_by_valid_time() {
        let series = TimeSeries::of(
            TimeSeriesMetadata::default(),
            vec![
                Event::new(time(2), 3.0),
                Event::new(time(0), 1.0),
                Event::new(time(1), 2.0),
            ],
        );

        let times: Vec<_> = series.events().iter().map(|e| e.valid_time).collect();
        assert_eq!(times, vec![time(0), time(1), time(2)]);
    }

    #[test]
    fn test_duplicate_valid_times_keep_first() {
        let series = TimeSeries::of(
            TimeSeriesMetadata::default(),
            vec![
                Event::new(time(0), 1.0),
                Event::new(time(0), 99.0),
                Event::new(time(1), 2.0),
            ],
        );

        assert_eq!(series.len(), 2);
        assert_eq!(series.events()[0].value, 1.0);
    }

    #[test]
    fn test_forecast_status_follows_reference_times() {
        let non_forecast = TimeSeries::of(TimeSeriesMetadata::default(), vec![Event::new(time(0), 1.0)]);
        assert!(!non_forecast.is_forecast());

        let forecast = TimeSeries::new(
            TimeSeriesMetadata::default(),
            BTreeSet::from([time(0)]),
            vec![Event::new(time(1), 1.0)],
        );
        assert!(forecast.is_forecast());
    }

    #[test]
    fn test_timesteps_of_regular_series() {
        let series = TimeSeries::of(
            TimeSeriesMetadata::default(),
            vec![
                Event::new(time(0), 1.0),
                Event::new(time(1), 2.0),
                Event::new(time(2), 3.0),
            ],
        );

        let timesteps = series.timesteps();
        assert_eq!(timesteps.len(), 1);
        assert!(timesteps.contains(&TimeDelta::hours(1)));
    }
}
