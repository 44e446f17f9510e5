//! Verification statistics exchanged with the statistics-computation layer.
//!
//! The resampler only shuffles pools; an external component turns each pool
//! into a [`Statistics`] record. The shape of that record, with every value
//! keyed by metric identity, is the contract the quantile calculator's
//! slot-allocation logic depends on: a new statistic kind requires a
//! corresponding slot-allocation and quantile-setting routine.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A scalar score component, e.g. the main component of the mean error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    /// The component name.
    pub name: String,
    /// The component value.
    pub value: f64,
}

/// A scalar score for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreStatistic {
    /// The metric name.
    pub metric: String,
    /// The score components.
    pub components: Vec<ScoreComponent>,
}

/// A duration-valued score component, e.g. the mean time-to-peak error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationScoreComponent {
    /// The component name.
    pub name: String,
    /// The component value. Absent when the underlying pairs were empty,
    /// for example after slicing a realization by threshold.
    #[serde(with = "optional_seconds")]
    pub value: Option<TimeDelta>,
}

/// A duration-valued score for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationScoreStatistic {
    /// The metric name.
    pub metric: String,
    /// The score components.
    pub components: Vec<DurationScoreComponent>,
}

/// One named, vector-valued component of a diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramComponent {
    /// The component name, e.g. an axis.
    pub name: String,
    /// Distinguishes repeated component names within one diagram.
    pub qualifier: String,
    /// The component values.
    pub values: Vec<f64>,
}

/// A diagram for one metric, e.g. a reliability diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramStatistic {
    /// The metric name.
    pub metric: String,
    /// The diagram components.
    pub components: Vec<DiagramComponent>,
}

/// A (time, signed duration) pairing within a duration diagram, e.g. one
/// time-to-peak error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingErrorPair {
    /// The time the error is associated with.
    pub time: DateTime<Utc>,
    /// The signed error.
    #[serde(with = "seconds")]
    pub error: TimeDelta,
}

/// A duration diagram for one metric: signed durations indexed by time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationDiagramStatistic {
    /// The metric name.
    pub metric: String,
    /// The time-indexed pairs.
    pub pairs: Vec<TimingErrorPair>,
}

/// A complete set of verification statistics for one pool or one resample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// The scalar scores.
    pub scores: Vec<ScoreStatistic>,
    /// The duration-valued scores.
    pub duration_scores: Vec<DurationScoreStatistic>,
    /// The diagrams.
    pub diagrams: Vec<DiagramStatistic>,
    /// The duration diagrams.
    pub duration_diagrams: Vec<DurationDiagramStatistic>,
    /// The probability of the sampling-distribution quantile this record
    /// represents, set when produced by a quantile calculator.
    pub sample_quantile: Option<f64>,
}

/// Serde support for signed durations as whole seconds.
mod seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        i64::deserialize(deserializer).map(TimeDelta::seconds)
    }
}

/// Serde support for optional signed durations as whole seconds.
mod optional_seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<TimeDelta>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(delta) => serializer.serialize_some(&delta.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TimeDelta>, D::Error> {
        Ok(Option::<i64>::deserialize(deserializer)?.map(TimeDelta::seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_round_trip_through_json() {
        let statistics = Statistics {
            scores: vec![ScoreStatistic {
                metric: "MEAN_ERROR".to_string(),
                components: vec![ScoreComponent {
                    name: "MAIN".to_string(),
                    value: 0.25,
                }],
            }],
            duration_scores: vec![DurationScoreStatistic {
                metric: "TIME_TO_PEAK_ERROR_STATISTIC".to_string(),
                components: vec![DurationScoreComponent {
                    name: "MEAN".to_string(),
                    value: Some(TimeDelta::seconds(-3600)),
                }],
            }],
            diagrams: Vec::new(),
            duration_diagrams: Vec::new(),
            sample_quantile: Some(0.5),
        };

        let json = serde_json::to_string(&statistics).unwrap();
        let decoded: Statistics = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, statistics);
    }
}
