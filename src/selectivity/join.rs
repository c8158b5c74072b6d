//! 区间列之间 `列 OP 列` 的连接选择性
//!
//! 把两列的某一侧边界看作随机变量 X、Y，`P(X < Y)` 等于
//! `F_X(y) * f_Y(y)` 的积分。X 的累积分布是分段线性的，Y 的密度是分段常量的，
//! 乘积在两个直方图边界并集的相邻点之间是线性的，于是积分可以用一次同步归并求出。

use super::restriction::{contained_selectivity, contains_selectivity};
use super::scalar::scalar_selectivity;
use crate::core::{Bound, BoundValue, Operator, StatsError, StatsResult};
use crate::stats::SpanHistograms;
use std::cmp::Ordering;

const FAMILY: &str = "区间连接";

/// 区间直方图连接是否能估计该算子
pub fn supports_operator(op: Operator) -> bool {
    super::restriction::supports_operator(op)
}

/// 估计 `P(X < Y)`，X、Y 分别服从 hist1、hist2
///
/// # 参数
/// - `hist1`: X 的边界直方图一侧，至少 2 个值
/// - `hist2`: Y 的边界直方图一侧，至少 2 个值
pub fn scalar_join_selectivity<T: BoundValue>(hist1: &[Bound<T>], hist2: &[Bound<T>]) -> f64 {
    let nhist1 = hist1.len();
    let nhist2 = hist2.len();
    if nhist1 < 2 || nhist2 < 2 {
        return 0.0;
    }

    // 跳过对方直方图起点之前的部分，那里另一侧的累积概率为 0
    let mut i = hist1.partition_point(|b| b.compare(&hist2[0]).is_lt());
    let mut j = hist2.partition_point(|b| b.compare(&hist1[0]).is_lt());

    let mut selec = 0.0;
    let mut prev: Option<(f64, f64)> = None;
    while i < nhist1 && j < nhist2 {
        let cur_sync = match hist1[i].compare(&hist2[j]) {
            Ordering::Less => {
                i += 1;
                &hist1[i - 1]
            }
            Ordering::Greater => {
                j += 1;
                &hist2[j - 1]
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
                &hist1[i - 1]
            }
        };
        let cur_sel1 = scalar_selectivity(cur_sync, hist1, false);
        let cur_sel2 = scalar_selectivity(cur_sync, hist2, false);

        if let Some((prev_sel1, prev_sel2)) = prev {
            selec += (prev_sel1 + cur_sel1) * (cur_sel2 - prev_sel2);
        }
        prev = Some((cur_sel1, cur_sel2));
    }
    selec /= 2.0;

    // X 已经耗尽，Y 剩下的部分都大于 X
    if j < nhist2 {
        let prev_sel2 = prev.map_or(0.0, |(_, sel2)| sel2);
        selec += 1.0 - prev_sel2;
    }
    selec
}

/// 估计 `列1 OP 列2` 的连接选择性
///
/// # 参数
/// - `hist1`: 左侧列的区间直方图
/// - `hist2`: 右侧列的区间直方图；包含类算子需要它的长度直方图
/// - `op`: 算子
///
/// # 返回
/// 任一侧没有边界直方图、包含类算子缺少长度直方图，或算子为相邻时返回 `Ok(None)`
pub fn span_join_selectivity<T: BoundValue>(
    hist1: Option<&SpanHistograms<T>>,
    hist2: Option<&SpanHistograms<T>>,
    op: Operator,
) -> StatsResult<Option<f64>> {
    if !supports_operator(op) {
        return Err(StatsError::unsupported(op, FAMILY));
    }
    let (hist1, hist2) = match (hist1, hist2) {
        (Some(h1), Some(h2)) if h1.bounds.len() >= 2 && h2.bounds.len() >= 2 => (h1, h2),
        _ => return Ok(None),
    };

    let lower1 = hist1.bounds.lowers();
    let upper1 = hist1.bounds.uppers();
    let lower2 = hist2.bounds.lowers();
    let upper2 = hist2.bounds.uppers();

    let selec = match op {
        // 只比较下界
        Operator::Lt | Operator::Le => scalar_join_selectivity(lower1, lower2),
        Operator::Gt | Operator::Ge => 1.0 - scalar_join_selectivity(lower1, lower2),

        // upper(列1) < lower(列2)
        Operator::Left | Operator::Before => scalar_join_selectivity(upper1, lower2),
        // upper(列1) <= upper(列2)
        Operator::OverLeft | Operator::OverBefore => scalar_join_selectivity(upper1, upper2),
        // upper(列2) < lower(列1)
        Operator::Right | Operator::After => scalar_join_selectivity(upper2, lower1),
        // lower(列1) >= lower(列2)
        Operator::OverRight | Operator::OverAfter => 1.0 - scalar_join_selectivity(lower1, lower2),

        Operator::Overlaps | Operator::Contains | Operator::Contained => {
            if disjoint(lower1, upper1, lower2, upper2) {
                0.0
            } else if op == Operator::Overlaps {
                1.0 - scalar_join_selectivity(upper1, lower2) - scalar_join_selectivity(upper2, lower1)
            } else {
                let Some(lengths2) = &hist2.lengths else {
                    return Ok(None);
                };
                // 把列1 的每个桶当作常量区间，对列2 做限制估计后取平均
                let bins1 = lower1.len() - 1;
                let total: f64 = (0..bins1)
                    .map(|i| {
                        if op == Operator::Contains {
                            // 列1 @> 列2 即 列2 <@ 常量
                            contained_selectivity(&lower1[i], &upper1[i], lower2, lengths2)
                        } else {
                            contains_selectivity(&lower1[i], &upper1[i], lower2, lengths2)
                        }
                    })
                    .sum();
                total / bins1 as f64
            }
        }

        Operator::Adjacent => return Ok(None),

        _ => return Err(StatsError::unsupported(op, FAMILY)),
    };

    log::debug!("区间连接选择性: {} -> {:.6}", op, selec);
    Ok(Some(selec.clamp(0.0, 1.0)))
}

fn disjoint<T: BoundValue>(
    lower1: &[Bound<T>],
    upper1: &[Bound<T>],
    lower2: &[Bound<T>],
    upper2: &[Bound<T>],
) -> bool {
    lower1[0].compare(&upper2[upper2.len() - 1]).is_gt()
        || lower2[0].compare(&upper1[upper1.len() - 1]).is_gt()
}

/// 缺少直方图时的连接选择性上界
///
/// `(1 - nullfrac1) * (1 - nullfrac2) / max(nd1, nd2)`：
/// 算子严格且非空值大致均匀分布时，一行最多连接到对侧 `N2 * (1 - nullfrac2) / nd2` 行。
pub fn distinct_join_selectivity(
    null_fraction1: f64,
    num_distinct1: f64,
    null_fraction2: f64,
    num_distinct2: f64,
) -> f64 {
    let selec = (1.0 - null_fraction1) * (1.0 - null_fraction2);
    let nd = num_distinct1.max(num_distinct2);
    if nd > 0.0 {
        selec / nd
    } else {
        selec
    }
}
