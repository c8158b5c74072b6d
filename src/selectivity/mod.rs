//! 选择性估计
//!
//! 单侧累积分布、区间限制与连接估计、网格直方图空间估计，
//! 以及按列类型组合各维度估计的门面。

pub mod defaults;
pub mod facade;
pub mod join;
pub mod restriction;
pub mod scalar;
pub mod spatial;

pub use defaults::{
    default_join_selectivity, default_restriction_selectivity, DEFAULT_ADJACENT_SEL,
    DEFAULT_CONTAIN_SEL, DEFAULT_EQ_SEL, DEFAULT_INEQ_SEL, DEFAULT_ND_JOINSEL, DEFAULT_ND_SEL,
    DEFAULT_OVERLAP_SEL, DEFAULT_TEMP_JOINSEL, DEFAULT_TEMP_SEL, FALLBACK_ND_JOINSEL,
    FALLBACK_ND_SEL,
};
pub use facade::{
    join_selectivity, join_selectivity_with_histograms, restriction_selectivity,
    restriction_selectivity_with_histogram, ColumnRef, Constant, DefaultEqualityEstimator,
    EqualityEstimator, JoinType, Operand, Predicate, SelectivityEstimator,
};
pub use join::{distinct_join_selectivity, scalar_join_selectivity, span_join_selectivity};
pub use restriction::span_restriction_selectivity;
pub use scalar::{length_hist_fraction, position, scalar_selectivity};
pub use spatial::{nd_join_selectivity, nd_restriction_selectivity};
