//! 区间列上 `列 OP 常量` 的选择性
//!
//! 比较算子只看下界直方图；位置算子取相反一侧的端点；
//! 包含类算子沿下界直方图向前积分长度直方图。

use super::scalar::{bound_bsearch, length_hist_fraction, position, scalar_selectivity};
use crate::core::{Bound, BoundValue, Operator, Span, StatsError, StatsResult};
use crate::stats::{LengthHistogram, SpanHistograms};

const FAMILY: &str = "区间直方图";

/// 区间直方图是否能估计该算子
pub fn supports_operator(op: Operator) -> bool {
    use Operator::*;
    matches!(
        op,
        Lt | Le
            | Gt
            | Ge
            | Left
            | Right
            | OverLeft
            | OverRight
            | Before
            | After
            | OverBefore
            | OverAfter
            | Overlaps
            | Contains
            | Contained
            | Adjacent
    )
}

/// 估计 `列 OP constant` 的选择性
///
/// # 参数
/// - `hist`: 列的区间直方图，None 表示没有统计信息
/// - `op`: 算子
/// - `constant`: 常量区间
///
/// # 返回
/// 没有可用统计信息时返回 `Ok(None)`，由调用方换成默认值；
/// 算子不适用于区间直方图时返回错误
pub fn span_restriction_selectivity<T: BoundValue>(
    hist: Option<&SpanHistograms<T>>,
    op: Operator,
    constant: &Span<T>,
) -> StatsResult<Option<f64>> {
    if !supports_operator(op) {
        return Err(StatsError::unsupported(op, FAMILY));
    }
    let hist = match hist {
        Some(hist) if hist.bounds.len() >= 2 => hist,
        _ => return Ok(None),
    };

    let hist_lower = hist.bounds.lowers();
    let hist_upper = hist.bounds.uppers();
    let (const_lower, const_upper) = constant.bounds();

    let selec = match op {
        // 忽略上界的并列比较
        Operator::Lt => scalar_selectivity(&const_lower, hist_lower, false),
        Operator::Le => scalar_selectivity(&const_lower, hist_lower, true),
        Operator::Gt => 1.0 - scalar_selectivity(&const_lower, hist_lower, false),
        Operator::Ge => 1.0 - scalar_selectivity(&const_lower, hist_lower, true),

        Operator::Left | Operator::Before => {
            scalar_selectivity(&const_lower, hist_upper, false)
        }
        Operator::OverLeft | Operator::OverBefore => {
            scalar_selectivity(&const_upper, hist_upper, true)
        }
        Operator::Right | Operator::After => {
            1.0 - scalar_selectivity(&const_upper, hist_lower, true)
        }
        Operator::OverRight | Operator::OverAfter => {
            1.0 - scalar_selectivity(&const_lower, hist_lower, false)
        }

        Operator::Overlaps => overlaps_selectivity(&const_lower, &const_upper, hist_lower, hist_upper),
        Operator::Adjacent => adjacent_selectivity(&const_lower, &const_upper, hist_lower, hist_upper),

        Operator::Contained => {
            let Some(lengths) = &hist.lengths else {
                return Ok(None);
            };
            if !const_lower.is_finite() {
                // 下界不再起作用，只需上界不超过常量上界
                scalar_selectivity(&const_upper, hist_upper, true)
            } else if !const_upper.is_finite() {
                1.0 - scalar_selectivity(&const_lower, hist_lower, false)
            } else {
                contained_selectivity(&const_lower, &const_upper, hist_lower, lengths)
            }
        }
        Operator::Contains => {
            let Some(lengths) = &hist.lengths else {
                return Ok(None);
            };
            contains_selectivity(&const_lower, &const_upper, hist_lower, lengths)
        }

        _ => return Err(StatsError::unsupported(op, FAMILY)),
    };

    log::debug!("区间限制选择性: {} -> {:.6}", op, selec);
    Ok(Some(selec.clamp(0.0, 1.0)))
}

/// `not (列 << 常量 or 列 >> 常量)`
fn overlaps_selectivity<T: BoundValue>(
    const_lower: &Bound<T>,
    const_upper: &Bound<T>,
    hist_lower: &[Bound<T>],
    hist_upper: &[Bound<T>],
) -> f64 {
    let nhist = hist_lower.len();
    if const_lower.value > hist_upper[nhist - 1].value || hist_lower[0].value > const_upper.value {
        return 0.0;
    }
    1.0 - (scalar_selectivity(const_lower, hist_upper, false)
        + (1.0 - scalar_selectivity(const_upper, hist_lower, true)))
}

/// 常量下界所在上界桶中位于其前的部分，加上常量上界所在下界桶中位于其后的部分
fn adjacent_selectivity<T: BoundValue>(
    const_lower: &Bound<T>,
    const_upper: &Bound<T>,
    hist_lower: &[Bound<T>],
    hist_upper: &[Bound<T>],
) -> f64 {
    let nhist = hist_lower.len();
    let bins = (nhist - 1) as f64;
    let mut selec = 0.0;

    if let Some(i) = bound_bsearch(const_lower, hist_upper, true) {
        if i < nhist - 1 {
            selec += position(const_lower, &hist_upper[i], &hist_upper[i + 1]) / bins;
        }
    }
    if let Some(i) = bound_bsearch(const_upper, hist_lower, true) {
        if i < nhist - 1 {
            selec += (1.0 - position(const_upper, &hist_lower[i], &hist_lower[i + 1])) / bins;
        }
    }
    selec
}

/// `列 <@ 常量`
///
/// 从常量上界所在的下界桶往前走，累加每个桶中长度不超过
/// “桶下界到常量上界距离”的比例，走到含常量下界的桶为止。
pub(crate) fn contained_selectivity<T: BoundValue>(
    const_lower: &Bound<T>,
    const_upper: &Bound<T>,
    hist_lower: &[Bound<T>],
    length_hist: &LengthHistogram,
) -> f64 {
    let nhist = hist_lower.len();
    let bins = (nhist - 1) as f64;
    let lengths = length_hist.lengths();

    // 把常量上界当作下界来查找：下界大于常量上界的区间不可能匹配
    let upper = Bound {
        value: const_upper.value.clone(),
        inclusive: !const_upper.inclusive,
        lower: true,
    };
    let Some(upper_index) = bound_bsearch(&upper, hist_lower, false) else {
        return 0.0;
    };
    // 超出直方图上限时按落在最后一个桶处理，position 会截断到 1
    let upper_index = upper_index.min(nhist - 2);

    let mut bin_width = position(&upper, &hist_lower[upper_index], &hist_lower[upper_index + 1]);
    let mut prev_dist = 0.0;
    let mut sum_frac = 0.0;

    for i in (0..=upper_index).rev() {
        let mut final_bin = false;
        let dist = if hist_lower[i].compare(const_lower).is_lt() {
            bin_width -= position(const_lower, &hist_lower[i], &hist_lower[i + 1]);
            bin_width = bin_width.max(0.0);
            final_bin = true;
            const_lower.distance(&upper)
        } else {
            hist_lower[i].distance(&upper)
        };

        let length_frac = length_hist_fraction(lengths, prev_dist, dist, true);
        sum_frac += length_frac * bin_width / bins;

        if final_bin {
            break;
        }
        bin_width = 1.0;
        prev_dist = dist;
    }
    sum_frac
}

/// `列 @> 常量`
///
/// 从常量下界所在的下界桶往前走，累加每个桶中长度足以覆盖到常量上界的比例。
pub(crate) fn contains_selectivity<T: BoundValue>(
    const_lower: &Bound<T>,
    const_upper: &Bound<T>,
    hist_lower: &[Bound<T>],
    length_hist: &LengthHistogram,
) -> f64 {
    let nhist = hist_lower.len();
    let bins = (nhist - 1) as f64;
    let lengths = length_hist.lengths();

    let Some(lower_index) = bound_bsearch(const_lower, hist_lower, true) else {
        return 0.0;
    };
    let lower_index = lower_index.min(nhist - 2);

    let mut bin_width = position(const_lower, &hist_lower[lower_index], &hist_lower[lower_index + 1]);
    let mut prev_dist = const_lower.distance(const_upper);
    let mut sum_frac = 0.0;

    for i in (0..=lower_index).rev() {
        let dist = hist_lower[i].distance(const_upper);
        let length_frac = 1.0 - length_hist_fraction(lengths, prev_dist, dist, false);
        sum_frac += length_frac * bin_width / bins;
        bin_width = 1.0;
        prev_dist = dist;
    }
    sum_frac
}
