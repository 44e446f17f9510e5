//! Statistical methods supporting sampling-uncertainty estimation.
//!
//! This module provides the numerical infrastructure for the bootstrap:
//! - Optimal block-size estimation using the Politis-White algorithm with
//!   an FFT-based autocorrelation function
//! - Order-statistic quantile estimation for scalar and duration samples
//! - The verification statistics record exchanged with the external
//!   statistics-computation layer

mod block_size;
mod quantile;
mod summary;

pub use block_size::optimal_block_size;
pub use quantile::{duration_quantile_sorted, quantile_sorted};
pub use summary::{
    DiagramComponent, DiagramStatistic, DurationDiagramStatistic, DurationScoreComponent,
    DurationScoreStatistic, ScoreComponent, ScoreStatistic, Statistics, TimingErrorPair,
};
