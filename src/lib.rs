//! # hydroboot
//!
//! Estimate sampling uncertainty for hydrological forecast-verification
//! statistics.
//!
//! This crate repeatedly resamples pools of paired time series using the
//! stationary block bootstrap (Politis & Romano, 1994) and aggregates the
//! resulting distribution of verification statistics into quantile
//! estimates, giving evaluators confidence bounds on performance metrics
//! computed over irregular, partly-forecast time series.
//!
//! The crate does not compute verification metrics itself: an external
//! statistics-computation layer turns each resampled pool into a
//! [`Statistics`](statistics::Statistics) record, which the
//! [`QuantileCalculator`](bootstrap::QuantileCalculator) accumulates.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use hydroboot::bootstrap::{utilities, QuantileCalculator, StationaryBootstrapResampler};
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256PlusPlus;
//!
//! // Estimate the optimal mean block size across the pool
//! let estimate = utilities::optimal_block_size_for_pool(&pool, |pair| pair.left)?;
//!
//! // One resampler per evaluation pool
//! let rng = Xoshiro256PlusPlus::seed_from_u64(42);
//! let executor = Arc::new(rayon::ThreadPoolBuilder::new().build()?);
//! let mut resampler = StationaryBootstrapResampler::of(
//!     pool,
//!     estimate.block_size,
//!     estimate.timestep,
//!     rng,
//!     executor,
//! )?;
//!
//! // Resample, score externally, accumulate
//! let calculator = QuantileCalculator::of(nominal, 1000, &[0.05, 0.5, 0.95], false)?;
//! for _ in 0..1000 {
//!     let realization = resampler.resample()?;
//!     calculator.add(&compute_statistics(&realization))?;
//! }
//!
//! // One finalized statistics record per probability
//! let quantiles = calculator.get()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod error;
mod pairs;
mod pool;
mod time;

// Functional modules
pub mod bootstrap;
pub mod statistics;

// Re-exports for the public API
pub use error::{BootstrapError, Result};
pub use pairs::{CrossPairer, CrossPairs, ExactCrossPairer};
pub use pool::{Climatology, MiniPool, Pool, PoolMetadata};
pub use time::{Event, Pair, TimeSeries, TimeSeriesMetadata};
