//! tempstats - histogram-based selectivity estimation for span, temporal and
//! spatiotemporal columns
//!
//! At analyze time the crate samples a column and builds equi-depth bound and
//! length histograms per span dimension, plus an N-dimensional grid histogram
//! for spatial boxes. At planning time the estimators read those immutable
//! statistics and return the fraction of rows a predicate is expected to keep.

pub mod config;
pub mod core;
pub mod selectivity;
pub mod stats;
pub mod utils;

pub use crate::config::Config;
pub use crate::core::{Operator, StatsError, StatsResult};
pub use crate::selectivity::{
    join_selectivity, restriction_selectivity, Constant, Predicate, SelectivityEstimator,
};
pub use crate::stats::{ColumnStatistics, MemoryStatisticsProvider, StatisticsProvider};
