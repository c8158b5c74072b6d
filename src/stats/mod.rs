//! 统计信息收集与存储
//!
//! 包含区间直方图、网格直方图、水库采样、ANALYZE 流程以及统计信息提供者。

pub mod analyze;
pub mod histogram;
pub mod nd_grid;
pub mod sampling;
pub mod statistics;

pub use analyze::{
    AnalyzeConfig, ColumnAnalyzer, ColumnSample, SampleRow, SampleValue, TableAnalyzer,
};
pub use histogram::{
    build_bound_histogram, build_length_histogram, build_span_histograms, BoundHistogram,
    LengthHistogram, SpanHistograms,
};
pub use nd_grid::{build_nd_grid, GridMode, NdGridBuilder, NdStats};
pub use sampling::{ReservoirSampler, Sample, ROWS_PER_TARGET};
pub use statistics::{
    ColumnKind, ColumnStatistics, MemoryStatisticsProvider, StatisticsProvider, TableStatistics,
    DEFAULT_NUM_DISTINCT,
};
