//! 选择性估计门面
//!
//! 把谓词分解为值、时间、空间三个相互独立的分量，分别调用对应的
//! 直方图估计器，再把各分量的估计相乘并按空值比例修正。
//! 没有统计信息的分量使用算子族默认值。

use super::defaults::{
    default_join_selectivity, default_restriction_selectivity, DEFAULT_EQ_SEL, DEFAULT_INEQ_SEL,
    DEFAULT_TEMP_SEL,
};
use super::join::{distinct_join_selectivity, span_join_selectivity};
use super::restriction::span_restriction_selectivity;
use super::spatial::{nd_join_selectivity, nd_restriction_selectivity};
use crate::core::{
    BoundValue, FloatSpan, NdBox, Operator, OperatorFamily, Period, STBox, Span, StatsError,
    StatsResult, TBox,
};
use crate::stats::{ColumnKind, ColumnStatistics, SpanHistograms, StatisticsProvider};
use std::sync::Arc;

const FAMILY: &str = "组合估计";

/// 谓词中的常量
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    /// 数值区间，单个数值用单点区间表示
    Span(FloatSpan),
    Period(Period),
    TBox(TBox),
    STBox(STBox),
}

impl Constant {
    fn value(&self) -> Option<&FloatSpan> {
        match self {
            Constant::Span(span) => Some(span),
            Constant::TBox(tbox) => tbox.span.as_ref(),
            _ => None,
        }
    }

    fn period(&self) -> Option<&Period> {
        match self {
            Constant::Period(period) => Some(period),
            Constant::TBox(tbox) => tbox.period.as_ref(),
            Constant::STBox(stbox) => stbox.period.as_ref(),
            _ => None,
        }
    }

    fn space(&self) -> Option<&NdBox> {
        match self {
            Constant::STBox(stbox) => stbox.space.as_ref(),
            _ => None,
        }
    }
}

/// 列引用
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// 谓词操作数
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Const(Constant),
    /// 其他表达式（函数调用、运算等），无法使用统计信息
    Expr,
}

/// 二元谓词 `left OP right`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub op: Operator,
    pub left: Operand,
    pub right: Operand,
}

impl Predicate {
    pub fn new(op: Operator, left: Operand, right: Operand) -> Self {
        Self { op, left, right }
    }

    /// `列 OP 常量`
    pub fn column_const(op: Operator, column: ColumnRef, constant: Constant) -> Self {
        Self::new(op, Operand::Column(column), Operand::Const(constant))
    }

    /// `列 OP 列`
    pub fn column_column(op: Operator, left: ColumnRef, right: ColumnRef) -> Self {
        Self::new(op, Operand::Column(left), Operand::Column(right))
    }
}

/// 连接类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

/// 相等算子的估计协作者
///
/// SAME 在区间分量上等价于相等比较，由宿主的常用值统计负责。
pub trait EqualityEstimator: Send + Sync {
    /// `列 ~= 常量` 的选择性
    fn restriction_selectivity(&self, stats: &ColumnStatistics, constant: &Constant) -> f64;

    /// `列1 ~= 列2` 的选择性
    fn join_selectivity(&self, _stats1: &ColumnStatistics, _stats2: &ColumnStatistics) -> f64 {
        default_join_selectivity(Operator::Same)
    }
}

/// 总是返回相等默认值
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEqualityEstimator;

impl EqualityEstimator for DefaultEqualityEstimator {
    fn restriction_selectivity(&self, _stats: &ColumnStatistics, _constant: &Constant) -> f64 {
        DEFAULT_EQ_SEL
    }
}

/// 参与估计的维度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Dims {
    value: bool,
    time: bool,
    space: bool,
}

impl Dims {
    fn of(kind: ColumnKind) -> Self {
        Self {
            value: kind.has_value_dim(),
            time: kind.has_time_dim(),
            space: kind.has_space_dim(),
        }
    }

    fn intersect(self, other: Dims) -> Self {
        Self {
            value: self.value && other.value,
            time: self.time && other.time,
            space: self.space && other.space,
        }
    }

    fn is_empty(self) -> bool {
        !(self.value || self.time || self.space)
    }

    /// 算子在该列类型上作用的维度
    ///
    /// 位置算子只看一个维度：时序点上的 left/right 是空间 X 轴。
    /// 其余算子作用于所有维度。
    fn for_operator(op: Operator, available: Dims) -> StatsResult<Dims> {
        let dims = match op.family() {
            OperatorFamily::ValuePosition if available.value => Dims {
                value: true,
                ..Dims::default()
            },
            OperatorFamily::ValuePosition if available.space => Dims {
                space: true,
                ..Dims::default()
            },
            OperatorFamily::TimePosition if available.time => Dims {
                time: true,
                ..Dims::default()
            },
            OperatorFamily::SpacePosition if available.space => Dims {
                space: true,
                ..Dims::default()
            },
            OperatorFamily::ValuePosition
            | OperatorFamily::TimePosition
            | OperatorFamily::SpacePosition => Dims::default(),
            _ => available,
        };
        if dims.is_empty() {
            return Err(StatsError::unsupported(op, FAMILY));
        }
        Ok(dims)
    }
}

fn span_component<T: BoundValue>(
    hist: Option<&SpanHistograms<T>>,
    op: Operator,
    constant: &Span<T>,
) -> StatsResult<f64> {
    Ok(span_restriction_selectivity(hist, op, constant)?
        .unwrap_or_else(|| default_restriction_selectivity(op)))
}

fn space_component(stats: &ColumnStatistics, op: Operator, query: &NdBox) -> StatsResult<f64> {
    match op.family() {
        // 空间上没有序关系
        OperatorFamily::Comparison | OperatorFamily::Adjacent => {
            Ok(default_restriction_selectivity(op))
        }
        _ => Ok(nd_restriction_selectivity(stats.nd_stats.as_ref(), op, query)?
            .unwrap_or_else(|| default_restriction_selectivity(op))),
    }
}

fn estimate_restriction(
    stats: &ColumnStatistics,
    op: Operator,
    constant: &Constant,
    equality: &dyn EqualityEstimator,
) -> StatsResult<f64> {
    if matches!(constant, Constant::Null) {
        return Ok(0.0);
    }
    let dims = Dims::for_operator(op, Dims::of(stats.kind))?;

    let mut selec = 1.0;
    let mut estimated = false;
    // SAME 的值和时间分量合在一起交给协作者，每个谓词只问一次
    let mut equality_asked = false;
    if dims.value {
        if let Some(span) = constant.value() {
            if op == Operator::Same {
                selec *= equality.restriction_selectivity(stats, constant);
                equality_asked = true;
            } else {
                selec *= span_component(stats.value_histograms.as_ref(), op, span)?;
            }
            estimated = true;
        }
    }
    if dims.time {
        if let Some(period) = constant.period() {
            if op != Operator::Same {
                selec *= span_component(stats.time_histograms.as_ref(), op, period)?;
            } else if !equality_asked {
                selec *= equality.restriction_selectivity(stats, constant);
            }
            estimated = true;
        }
    }
    if dims.space {
        if let Some(query) = constant.space() {
            selec *= space_component(stats, op, query)?;
            estimated = true;
        }
    }
    if !estimated {
        // 常量缺少算子需要的维度
        selec = DEFAULT_TEMP_SEL;
    }

    selec *= 1.0 - stats.null_fraction;
    log::debug!(
        "限制选择性: {} {} -> {:.6}",
        stats.column_name,
        op,
        selec
    );
    Ok(selec.clamp(0.0, 1.0))
}

/// 连接中一个区间分量的估计结果
#[derive(Debug, Clone, Copy, PartialEq)]
enum JoinComponent {
    /// 来自直方图，还需要空值修正
    Histogram(f64),
    /// 任一侧缺少直方图，改用整个连接的不同值上界
    Distinct,
    /// 算子族默认值
    Default(f64),
}

fn span_join_component<T: BoundValue>(
    hist1: Option<&SpanHistograms<T>>,
    hist2: Option<&SpanHistograms<T>>,
    op: Operator,
) -> StatsResult<JoinComponent> {
    match span_join_selectivity(hist1, hist2, op)? {
        Some(selec) => Ok(JoinComponent::Histogram(selec)),
        None if hist1.is_none() || hist2.is_none() => Ok(JoinComponent::Distinct),
        None => Ok(JoinComponent::Default(default_join_selectivity(op))),
    }
}

fn estimate_join(
    stats1: &ColumnStatistics,
    stats2: &ColumnStatistics,
    op: Operator,
    row_counts: (f64, f64),
    equality: &dyn EqualityEstimator,
) -> StatsResult<f64> {
    let available = Dims::of(stats1.kind).intersect(Dims::of(stats2.kind));
    let dims = Dims::for_operator(op, available)?;

    let mut components = Vec::with_capacity(2);
    if dims.value {
        components.push(if op == Operator::Same {
            JoinComponent::Default(equality.join_selectivity(stats1, stats2))
        } else {
            span_join_component(
                stats1.value_histograms.as_ref(),
                stats2.value_histograms.as_ref(),
                op,
            )?
        });
    }
    if dims.time {
        components.push(if op == Operator::Same {
            JoinComponent::Default(default_join_selectivity(op))
        } else {
            span_join_component(
                stats1.time_histograms.as_ref(),
                stats2.time_histograms.as_ref(),
                op,
            )?
        });
    }

    let mut selec = 1.0;
    let mut needs_null_adjustment = false;
    let mut distinct_bound = false;
    for component in components {
        match component {
            JoinComponent::Histogram(s) => {
                selec *= s;
                needs_null_adjustment = true;
            }
            JoinComponent::Distinct => distinct_bound = true,
            JoinComponent::Default(s) => selec *= s,
        }
    }
    let mut grid_used = false;
    if dims.space {
        selec *= match (op.family(), &stats1.nd_stats, &stats2.nd_stats) {
            (_, Some(nd1), Some(nd2)) if op.is_bbox_op() => {
                grid_used = true;
                nd_join_selectivity(nd1, nd2)
            }
            (OperatorFamily::ValuePosition | OperatorFamily::SpacePosition, _, _) => {
                DEFAULT_INEQ_SEL
            }
            _ => default_join_selectivity(op),
        };
    }

    // 网格估计按非空行数计算，不再重复修正
    if needs_null_adjustment && !grid_used {
        selec *= (1.0 - stats1.null_fraction) * (1.0 - stats2.null_fraction);
    }
    // 不同值上界约束整个连接，只使用一次；它本身已包含空值修正
    if distinct_bound {
        let (nd1, _) = stats1.num_distinct(row_counts.0);
        let (nd2, _) = stats2.num_distinct(row_counts.1);
        let bound = distinct_join_selectivity(stats1.null_fraction, nd1, stats2.null_fraction, nd2);
        selec = selec.min(bound);
    }
    log::debug!(
        "连接选择性: {} {} {} -> {:.6}",
        stats1.column_name,
        op,
        stats2.column_name,
        selec
    );
    Ok(selec.clamp(0.0, 1.0))
}

/// 估计 `列 OP 常量` 的选择性
///
/// # 参数
/// - `stats`: 列的统计信息
/// - `op`: 算子
/// - `constant`: 常量
///
/// # 返回
/// `[0, 1]` 内的选择性；算子不适用于该列类型时返回错误
pub fn restriction_selectivity(
    stats: &ColumnStatistics,
    op: Operator,
    constant: &Constant,
) -> StatsResult<f64> {
    estimate_restriction(stats, op, constant, &DefaultEqualityEstimator)
}

/// 估计 `列1 OP 列2` 的内连接选择性
///
/// 两表行数未知时，按比例记录的不同值数量使用默认值。
pub fn join_selectivity(
    stats1: &ColumnStatistics,
    stats2: &ColumnStatistics,
    op: Operator,
) -> StatsResult<f64> {
    estimate_join(stats1, stats2, op, (0.0, 0.0), &DefaultEqualityEstimator)
}

/// 直接用给定的区间直方图估计限制选择性，不经过统计信息目录
pub fn restriction_selectivity_with_histogram<T: BoundValue>(
    hist: &SpanHistograms<T>,
    op: Operator,
    constant: &Span<T>,
) -> StatsResult<f64> {
    Ok(span_component(Some(hist), op, constant)?.clamp(0.0, 1.0))
}

/// 直接用给定的两个区间直方图估计连接选择性，不经过统计信息目录
pub fn join_selectivity_with_histograms<T: BoundValue>(
    hist1: &SpanHistograms<T>,
    hist2: &SpanHistograms<T>,
    op: Operator,
) -> StatsResult<f64> {
    Ok(span_join_selectivity(Some(hist1), Some(hist2), op)?
        .unwrap_or_else(|| default_join_selectivity(op)))
}

/// 选择性估计器
///
/// 从统计信息提供者读取列统计信息，对谓词做形状分类后分派到组合估计。
pub struct SelectivityEstimator<P: StatisticsProvider> {
    provider: Arc<P>,
    equality: Box<dyn EqualityEstimator>,
}

impl<P: StatisticsProvider> SelectivityEstimator<P> {
    /// 创建新的选择性估计器
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            equality: Box::new(DefaultEqualityEstimator),
        }
    }

    /// 替换相等算子的估计协作者
    pub fn with_equality_estimator(mut self, equality: impl EqualityEstimator + 'static) -> Self {
        self.equality = Box::new(equality);
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// 估计限制谓词的选择性
    ///
    /// 支持 `列 OP 常量` 和 `常量 OP 列`，后者用交换算子改写；
    /// 没有交换算子、操作数不是列和常量，或没有统计信息时返回算子族默认值。
    pub fn restriction_selectivity(&self, predicate: &Predicate) -> StatsResult<f64> {
        let op = predicate.op;
        let (column, constant, op) = match (&predicate.left, &predicate.right) {
            (Operand::Column(column), Operand::Const(constant)) => (column, constant, op),
            (Operand::Const(constant), Operand::Column(column)) => match op.commutator() {
                Some(commuted) => (column, constant, commuted),
                None => return Ok(default_restriction_selectivity(op)),
            },
            _ => return Ok(default_restriction_selectivity(op)),
        };
        if matches!(constant, Constant::Null) {
            return Ok(0.0);
        }

        match self.provider.get_column_stats(&column.table, &column.column) {
            Some(stats) => estimate_restriction(&stats, op, constant, self.equality.as_ref()),
            None => {
                log::debug!("列 {}.{} 没有统计信息", column.table, column.column);
                Ok(default_restriction_selectivity(op))
            }
        }
    }

    /// 估计连接谓词的选择性
    ///
    /// 只估计内连接上的 `列 OP 列`；外连接返回算子族的连接默认值。
    pub fn join_selectivity(&self, predicate: &Predicate, join_type: JoinType) -> StatsResult<f64> {
        let op = predicate.op;
        if join_type != JoinType::Inner {
            return Ok(default_join_selectivity(op));
        }
        let (Operand::Column(left), Operand::Column(right)) = (&predicate.left, &predicate.right)
        else {
            return Ok(default_join_selectivity(op));
        };

        let stats1 = self.provider.get_column_stats(&left.table, &left.column);
        let stats2 = self.provider.get_column_stats(&right.table, &right.column);
        let (Some(stats1), Some(stats2)) = (stats1, stats2) else {
            log::debug!(
                "连接 {}.{} {} {}.{} 缺少统计信息",
                left.table,
                left.column,
                op,
                right.table,
                right.column
            );
            return Ok(default_join_selectivity(op));
        };

        let row_counts = (
            self.provider.get_row_count(&left.table).unwrap_or(0.0),
            self.provider.get_row_count(&right.table).unwrap_or(0.0),
        );
        estimate_join(&stats1, &stats2, op, row_counts, self.equality.as_ref())
    }

    /// 估计过滤后的行数
    pub fn estimate_rows(&self, table: &str, selectivity: f64) -> Option<u64> {
        let rows = self.provider.get_row_count(table)?;
        Some((rows * selectivity.clamp(0.0, 1.0)) as u64)
    }

    /// 估计两个表连接后的行数
    pub fn estimate_join_rows(&self, left: &str, right: &str, selectivity: f64) -> Option<u64> {
        let left_rows = self.provider.get_row_count(left)?;
        let right_rows = self.provider.get_row_count(right)?;
        // 笛卡尔积 × 连接选择性
        Some((left_rows * right_rows * selectivity.clamp(0.0, 1.0)) as u64)
    }
}
