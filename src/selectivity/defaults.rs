//! 默认选择性
//!
//! 没有统计信息或无法使用统计信息时，按算子族返回的常量。

use crate::core::{Operator, OperatorFamily};

/// 通用标量不等式默认值
pub const DEFAULT_INEQ_SEL: f64 = 0.3333333333333333;
/// 等值类默认值
pub const DEFAULT_EQ_SEL: f64 = 0.001;
/// 重叠类默认值
pub const DEFAULT_OVERLAP_SEL: f64 = 0.005;
/// 包含类默认值
pub const DEFAULT_CONTAIN_SEL: f64 = 0.002;
/// 相邻默认值
pub const DEFAULT_ADJACENT_SEL: f64 = 0.001;
/// 其余算子的限制选择性默认值
pub const DEFAULT_TEMP_SEL: f64 = 0.0001;
/// 连接选择性默认值
pub const DEFAULT_TEMP_JOINSEL: f64 = 0.001;

/// 网格直方图估计失败时的限制选择性
pub const DEFAULT_ND_SEL: f64 = 0.0001;
/// 网格直方图估计失败时的连接选择性
pub const DEFAULT_ND_JOINSEL: f64 = 0.001;
/// 没有网格统计时的空间限制选择性
pub const FALLBACK_ND_SEL: f64 = 0.2;
/// 没有网格统计时的空间连接选择性
pub const FALLBACK_ND_JOINSEL: f64 = 0.3;

/// 限制选择性默认值
pub fn default_restriction_selectivity(op: Operator) -> f64 {
    match op.family() {
        OperatorFamily::Overlap => DEFAULT_OVERLAP_SEL,
        OperatorFamily::Containment => DEFAULT_CONTAIN_SEL,
        OperatorFamily::Same => DEFAULT_EQ_SEL,
        OperatorFamily::Adjacent => DEFAULT_ADJACENT_SEL,
        OperatorFamily::Comparison
        | OperatorFamily::ValuePosition
        | OperatorFamily::TimePosition
        | OperatorFamily::SpacePosition => DEFAULT_INEQ_SEL,
    }
}

/// 连接选择性默认值，所有算子族相同
pub fn default_join_selectivity(_op: Operator) -> f64 {
    DEFAULT_TEMP_JOINSEL
}
