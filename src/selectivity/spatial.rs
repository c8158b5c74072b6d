//! 网格直方图上的空间选择性
//!
//! 限制估计遍历查询框覆盖的格子（位置算子则遍历一侧的全部格子），
//! 按覆盖比例累加格子权重；连接估计以格子少的一侧驱动，累加两侧格子权重之积。

use super::defaults::{DEFAULT_ND_JOINSEL, DEFAULT_ND_SEL, FALLBACK_ND_JOINSEL, FALLBACK_ND_SEL};
use crate::core::nd_box::{ND_DIMS, X_DIM, Y_DIM, Z_DIM};
use crate::core::{NdBox, NdIBox, Operator, StatsError, StatsResult};
use crate::stats::NdStats;

const FAMILY: &str = "网格直方图";

/// 位置算子的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// 严格位于低侧（left / below / front）
    Below,
    /// 不越过高侧（overleft / overbelow / overfront）
    NotAbove,
    /// 严格位于高侧（right / above / back）
    Above,
    /// 不越过低侧（overright / overabove / overback）
    NotBelow,
}

fn position_axis(op: Operator) -> Option<(usize, Side)> {
    use Operator::*;
    let res = match op {
        Left => (X_DIM, Side::Below),
        OverLeft => (X_DIM, Side::NotAbove),
        Right => (X_DIM, Side::Above),
        OverRight => (X_DIM, Side::NotBelow),
        Below => (Y_DIM, Side::Below),
        OverBelow => (Y_DIM, Side::NotAbove),
        Above => (Y_DIM, Side::Above),
        OverAbove => (Y_DIM, Side::NotBelow),
        Front => (Z_DIM, Side::Below),
        OverFront => (Z_DIM, Side::NotAbove),
        Back => (Z_DIM, Side::Above),
        OverBack => (Z_DIM, Side::NotBelow),
        _ => return None,
    };
    Some(res)
}

/// 网格直方图是否能估计该算子
pub fn supports_operator(op: Operator) -> bool {
    op.is_bbox_op() || position_axis(op).is_some()
}

/// 估计 `列 OP 查询框` 的空间选择性
///
/// # 参数
/// - `stats`: 网格直方图，None 表示没有统计信息
/// - `op`: 边界框算子或空间位置算子
/// - `query`: 查询框
///
/// # 返回
/// 没有统计信息时返回 `Ok(None)`
pub fn nd_restriction_selectivity(
    stats: Option<&NdStats>,
    op: Operator,
    query: &NdBox,
) -> StatsResult<Option<f64>> {
    if !supports_operator(op) {
        return Err(StatsError::unsupported(op, FAMILY));
    }
    let Some(stats) = stats else {
        return Ok(None);
    };
    if !query.is_valid() {
        log::warn!("查询框含非有限坐标，使用回退选择性");
        return Ok(Some(FALLBACK_ND_SEL));
    }

    let bboxop = op.is_bbox_op();
    let position = position_axis(op);
    let ndims = stats.ndims.min(if query.ndims() >= 3 { 3 } else { 2 });
    let extent = &stats.extent;

    // 整个直方图范围与查询框的关系已经决定结果
    if bboxop {
        if !extent.intersects(query, ndims) {
            return Ok(Some(0.0));
        }
        if query.contains(extent, ndims) {
            return Ok(Some(1.0));
        }
    } else if let Some((axis, side)) = position {
        if axis >= ndims {
            // 查询框没有这一维
            return Ok(None);
        }
        let (never, always) = match side {
            Side::Below => (extent.not_below_on(query, axis), extent.strictly_below_on(query, axis)),
            Side::NotAbove => (extent.strictly_above_on(query, axis), extent.not_above_on(query, axis)),
            Side::Above => (extent.not_above_on(query, axis), extent.strictly_above_on(query, axis)),
            Side::NotBelow => (extent.strictly_below_on(query, axis), extent.not_below_on(query, axis)),
        };
        if never {
            return Ok(Some(0.0));
        }
        if always {
            return Ok(Some(1.0));
        }
    }

    let overlap = stats.overlapping_cells(query);
    let mut search = NdIBox::full(&stats.size, stats.ndims);
    if bboxop {
        for d in 0..ndims {
            search.min[d] = overlap.min[d];
            search.max[d] = overlap.max[d];
        }
    } else if let Some((axis, side)) = position {
        match side {
            Side::Below => search.max[axis] = overlap.min[axis],
            Side::NotAbove => search.max[axis] = overlap.max[axis],
            Side::Above => search.min[axis] = overlap.max[axis],
            Side::NotBelow => search.min[axis] = overlap.min[axis],
        }
    }

    let mut total_count = 0.0;
    for at in search.cells(stats.ndims) {
        let Some(cell_count) = stats.weight_at(&at) else {
            continue;
        };
        if cell_count == 0.0 {
            continue;
        }
        let cell = stats.cell_box(&at);
        let ratio = match position {
            None => query.ratio_overlaps(&cell, ndims),
            Some((axis, Side::Below)) => query.ratio_below_on(&cell, axis),
            Some((axis, Side::NotAbove)) => query.ratio_not_above_on(&cell, axis),
            Some((axis, Side::Above)) => query.ratio_above_on(&cell, axis),
            Some((axis, Side::NotBelow)) => query.ratio_not_below_on(&cell, axis),
        };
        total_count += cell_count * ratio;
    }

    let selec = total_count / stats.histogram_features;
    if selec.is_nan() {
        return Ok(Some(DEFAULT_ND_SEL));
    }
    log::debug!(
        "网格限制选择性: {} 累计 {:.3} / {} -> {:.6}",
        op,
        total_count,
        stats.histogram_features,
        selec
    );
    Ok(Some(selec.clamp(0.0, 1.0)))
}

/// 估计两列边界框相交的连接选择性
///
/// 连接选择性 = 估计的连接行数 / 无约束连接的行数。遍历格子较少一侧中
/// 与另一侧范围相交的格子，对每个格子累加 `权重1 * 权重2 * 覆盖比例`。
pub fn nd_join_selectivity(s1: &NdStats, s2: &NdStats) -> f64 {
    // 格子少的一侧驱动循环
    let (s1, s2) = if s1.histogram_cells > s2.histogram_cells {
        (s2, s1)
    } else {
        (s1, s2)
    };

    if !(s1.sample_features > 0.0 && s2.sample_features > 0.0) {
        return FALLBACK_ND_JOINSEL;
    }

    // 两侧非空行数之积是最大可能的连接行数
    let ntuples_not_null1 = s1.table_features * (s1.not_null_features / s1.sample_features);
    let ntuples_not_null2 = s2.table_features * (s2.not_null_features / s2.sample_features);
    let ntuples_max = ntuples_not_null1 * ntuples_not_null2;

    // 二维与三维网格只在共有的轴上比较
    let ndims = s1.ndims.min(s2.ndims);
    if !s1.extent.intersects(&s2.extent, ndims) {
        return 0.0;
    }

    let mut val = 0.0;
    let probe1 = widen_beyond(&s2.extent, ndims, &s1.extent);
    for at1 in s1.overlapping_cells(&probe1).cells(s1.ndims) {
        let Some(val1) = s1.weight_at(&at1) else {
            continue;
        };
        if val1 == 0.0 {
            continue;
        }
        let cell1 = s1.cell_box(&at1);
        let probe2 = widen_beyond(&cell1, ndims, &s2.extent);
        for at2 in s2.overlapping_cells(&probe2).cells(s2.ndims) {
            let Some(val2) = s2.weight_at(&at2) else {
                continue;
            };
            let cell2 = s2.cell_box(&at2);
            val += val1 * val2 * cell1.ratio_overlaps(&cell2, ndims);
        }
    }

    // 从样本外推到全表
    val *= s1.table_features / s1.sample_features;
    val *= s2.table_features / s2.sample_features;

    let selec = val / ntuples_max;
    log::debug!("网格连接选择性: 估计 {:.3} / 最大 {:.3} -> {:.6}", val, ntuples_max, selec);

    if selec.is_nan() || !selec.is_finite() || selec < 0.0 {
        DEFAULT_ND_JOINSEL
    } else {
        selec.min(1.0)
    }
}

/// 第 `ndims` 维之后的轴取 target 的范围，使另一侧多出的轴不参与筛选
fn widen_beyond(query: &NdBox, ndims: usize, target: &NdBox) -> NdBox {
    let mut widened = *query;
    for d in ndims..ND_DIMS {
        widened.min[d] = target.min[d];
        widened.max[d] = target.max[d];
    }
    widened
}
