//! N 维网格直方图
//!
//! 从样本边界框构建自适应网格：先用均值 ± 3.25 倍标准差裁掉离群框，
//! 再按各维的分布离散度分配格子数，最后把每个框按体积比例摊到覆盖的格子上。
//! 所有格子权重之和约等于参与统计的要素数。

use crate::core::nd_box::{cell_box, cell_index, NdIBox};
use crate::core::{NdBox, StatsError, StatsResult, ND_DIMS};
use serde::{Deserialize, Serialize};

/// 裁剪范围使用的标准差倍数
pub const SDFACTOR: f64 = 3.25;
/// 计算分布离散度时使用的探测桶数
pub const NUM_BINS: usize = 50;
/// 宽度小于此值的维度不计算分布
pub const MIN_DIMENSION_WIDTH: f64 = 0.000000001;
/// 宽度大于此值的维度不计算分布
pub const MAX_DIMENSION_WIDTH: f64 = 1.0E+20;

/// 网格模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GridMode {
    /// 使用样本中出现的全部维度
    #[default]
    Nd,
    /// 只使用 X/Y 两维
    #[serde(rename = "2d")]
    TwoD,
}

/// 网格直方图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdStats {
    pub ndims: usize,
    pub extent: NdBox,
    pub size: [usize; ND_DIMS],
    /// 按混合进制展开的格子权重
    pub cell_weight: Vec<f32>,
    /// 样本行数（含空值）
    pub sample_features: f64,
    /// 表的总行数
    pub table_features: f64,
    /// 样本中非空且合法的行数
    pub not_null_features: f64,
    /// 实际落入直方图的要素数
    pub histogram_features: f64,
    pub histogram_cells: usize,
    /// 所有要素摊到格子上的比例之和
    pub cells_covered: f64,
}

impl NdStats {
    /// 检查格子数组与网格尺寸是否一致
    pub fn validate(&self) -> StatsResult<()> {
        if self.ndims == 0 || self.ndims > ND_DIMS {
            return Err(StatsError::InvalidHistogram(format!(
                "网格维数 {} 不合法",
                self.ndims
            )));
        }
        if self.size[..self.ndims].iter().any(|&s| s == 0) {
            return Err(StatsError::InvalidHistogram("网格某一维尺寸为 0".to_string()));
        }
        let cells: usize = self.size[..self.ndims].iter().product();
        if cells != self.cell_weight.len() {
            return Err(StatsError::InvalidHistogram(format!(
                "格子数 {} 与网格尺寸之积 {} 不一致",
                self.cell_weight.len(),
                cells
            )));
        }
        if !(self.histogram_features > 0.0) {
            return Err(StatsError::InvalidHistogram("直方图要素数为 0".to_string()));
        }
        Ok(())
    }

    /// 格子 `at` 的权重，越界时返回 None
    pub fn weight_at(&self, at: &[usize; ND_DIMS]) -> Option<f64> {
        cell_index(at, &self.size, self.ndims).map(|i| f64::from(self.cell_weight[i]))
    }

    /// 格子 `at` 的空间范围
    pub fn cell_box(&self, at: &[usize; ND_DIMS]) -> NdBox {
        cell_box(&self.extent, &self.size, self.ndims, at)
    }

    /// nd_box 覆盖的格子下标范围
    pub fn overlapping_cells(&self, nd_box: &NdBox) -> NdIBox {
        NdIBox::overlapping(&self.extent, &self.size, self.ndims, nd_box)
    }

    /// 用给定的范围和网格尺寸直接填充，不做离群裁剪和尺寸自适应
    pub fn with_grid(
        extent: NdBox,
        size: [usize; ND_DIMS],
        boxes: &[NdBox],
        total_rows: f64,
    ) -> Option<NdStats> {
        let ndims = extent.ndims();
        let refs: Vec<&NdBox> = boxes.iter().collect();
        fill_grid(
            ndims,
            extent,
            size,
            &refs,
            boxes.len() as f64,
            boxes.len() as f64,
            total_rows,
        )
    }
}

/// 网格直方图构建器
#[derive(Debug, Clone)]
pub struct NdGridBuilder {
    stats_target: usize,
    total_rows: f64,
    mode: GridMode,
}

impl NdGridBuilder {
    pub fn new(stats_target: usize) -> Self {
        Self {
            stats_target,
            total_rows: 0.0,
            mode: GridMode::Nd,
        }
    }

    pub fn total_rows(mut self, total_rows: f64) -> Self {
        self.total_rows = total_rows;
        self
    }

    pub fn mode(mut self, mode: GridMode) -> Self {
        self.mode = mode;
        self
    }

    /// 从可能含空值的样本构建
    ///
    /// 没有任何要素落入直方图时返回 None，调用方应把统计标记为无效。
    pub fn build(&self, sample: &[Option<NdBox>]) -> Option<NdStats> {
        // 第一遍：读取合法框，求维数、样本范围和坐标和
        let mut ndims = 2;
        let mut boxes: Vec<NdBox> = Vec::with_capacity(sample.len());
        for nd_box in sample.iter().flatten() {
            let nd_box = match self.mode {
                GridMode::TwoD => nd_box.with_ndims(2),
                GridMode::Nd => *nd_box,
            };
            if !nd_box.is_valid() {
                continue;
            }
            if self.mode == GridMode::Nd {
                ndims = ndims.max(nd_box.ndims());
            }
            boxes.push(nd_box);
        }

        if boxes.is_empty() {
            log::warn!("样本中没有合法的边界框，跳过网格直方图");
            return None;
        }

        let count = boxes.len() as f64;
        let mut sample_extent = NdBox::empty(ndims);
        for b in &boxes {
            sample_extent.merge(b);
        }

        let cells_target = (self.stats_target as f64)
            .powi(ndims as i32)
            .min((ndims * 10000) as f64)
            .min((self.total_rows / 5.0).floor());

        // 第二遍：均值 ± SDFACTOR 倍标准差确定直方图范围
        let mut histo_extent = NdBox::empty(ndims);
        for d in 0..ndims {
            let avg_min = boxes.iter().map(|b| b.min[d]).sum::<f64>() / count;
            let avg_max = boxes.iter().map(|b| b.max[d]).sum::<f64>() / count;
            let sd_min = (boxes.iter().map(|b| (b.min[d] - avg_min).powi(2)).sum::<f64>()
                / count)
                .sqrt();
            let sd_max = (boxes.iter().map(|b| (b.max[d] - avg_max).powi(2)).sum::<f64>()
                / count)
                .sqrt();
            histo_extent.min[d] = (avg_min - SDFACTOR * sd_min).max(sample_extent.min[d]);
            histo_extent.max[d] = (avg_max + SDFACTOR * sd_max).min(sample_extent.max[d]);
        }

        // 第三遍：丢弃完全落在范围外的框，重新计算范围并扩展 1%
        let survivors: Vec<&NdBox> = boxes
            .iter()
            .filter(|b| histo_extent.intersects(b, ndims))
            .collect();
        let mut extent = NdBox::empty(ndims);
        for b in &survivors {
            extent.merge(b);
        }
        extent.expand(0.01);

        let distribution = box_distribution(&survivors, &extent, ndims);
        let size = grid_size(&distribution, ndims, cells_target);

        log::debug!(
            "网格直方图: 维数 {}, 目标格子数 {}, 尺寸 {:?}, 分布 {:?}",
            ndims,
            cells_target,
            &size[..ndims],
            &distribution[..ndims]
        );

        fill_grid(
            ndims,
            extent,
            size,
            &survivors,
            sample.len() as f64,
            count,
            self.total_rows,
        )
    }
}

/// 构建网格直方图，样本中不含空值
pub fn build_nd_grid(sample: &[NdBox], stats_target: usize, total_rows: f64) -> Option<NdStats> {
    let rows: Vec<Option<NdBox>> = sample.iter().copied().map(Some).collect();
    NdGridBuilder::new(stats_target)
        .total_rows(total_rows)
        .build(&rows)
}

/// 四分位距：排序后第 4/5 与第 1/5 位置的差
fn range_quintile(counts: &mut [u32]) -> u32 {
    counts.sort_unstable();
    let n = counts.len();
    counts[4 * n / 5] - counts[n / 5]
}

/// 各维的分布离散度
///
/// 把范围等分成 `NUM_BINS` 个桶，统计每个桶被多少个框覆盖，
/// 再取覆盖数的五分位距。均匀分布得分低，需要的格子少。
fn box_distribution(boxes: &[&NdBox], extent: &NdBox, ndims: usize) -> [f64; ND_DIMS] {
    let mut distribution = [0.0; ND_DIMS];

    for d in 0..ndims {
        let smin = extent.min[d];
        let swidth = extent.max[d] - smin;
        if swidth < MIN_DIMENSION_WIDTH || swidth > MAX_DIMENSION_WIDTH {
            continue;
        }

        let mut counts = [0u32; NUM_BINS];
        for b in boxes {
            let minoffset = b.min[d] - smin;
            let maxoffset = b.max[d] - smin;
            if minoffset < 0.0 || minoffset > swidth || maxoffset < 0.0 || maxoffset > swidth {
                continue;
            }
            let bmin = (NUM_BINS as f64 * minoffset / swidth).floor() as usize;
            let bmax = ((NUM_BINS as f64 * maxoffset / swidth).floor() as usize).min(NUM_BINS - 1);
            for count in &mut counts[bmin.min(NUM_BINS - 1)..=bmax] {
                *count += 1;
            }
        }

        distribution[d] = f64::from(range_quintile(&mut counts));
    }
    distribution
}

/// 按分布离散度分配每维的格子数
fn grid_size(distribution: &[f64; ND_DIMS], ndims: usize, cells_target: f64) -> [usize; ND_DIMS] {
    let mut size = [1usize; ND_DIMS];
    let histo_ndims = distribution[..ndims].iter().filter(|&&s| s > 0.0).count();

    if histo_ndims == 0 {
        // 所有维度都近似均匀分布，平均分配
        let per_dim = cells_target.max(0.0).powf(1.0 / ndims as f64) as usize;
        for s in size.iter_mut().take(ndims) {
            *s = per_dim.max(1);
        }
        return size;
    }

    let total: f64 = distribution[..ndims].iter().sum();
    for d in 0..ndims {
        if distribution[d] == 0.0 {
            continue;
        }
        let edge_ratio = distribution[d] / total;
        let cells = (cells_target * histo_ndims as f64 * edge_ratio)
            .max(0.0)
            .powf(1.0 / histo_ndims as f64) as usize;
        size[d] = cells.max(1);
    }
    size
}

/// 第四遍：把每个框按覆盖比例摊到格子上
fn fill_grid(
    ndims: usize,
    extent: NdBox,
    size: [usize; ND_DIMS],
    boxes: &[&NdBox],
    sample_rows: f64,
    not_null: f64,
    total_rows: f64,
) -> Option<NdStats> {
    let histogram_cells: usize = size[..ndims].iter().product();
    let mut stats = NdStats {
        ndims,
        extent,
        size,
        cell_weight: vec![0.0; histogram_cells],
        sample_features: sample_rows,
        table_features: total_rows,
        not_null_features: not_null,
        histogram_features: 0.0,
        histogram_cells,
        cells_covered: 0.0,
    };

    let mut total_volume = 0.0;
    for nd_box in boxes {
        let ibox = stats.overlapping_cells(nd_box);
        total_volume += (0..ndims).map(|d| nd_box.width(d)).product::<f64>();

        for at in ibox.cells(ndims) {
            let cell = stats.cell_box(&at);
            let ratio = cell.ratio_overlaps(nd_box, ndims);
            if let Some(idx) = cell_index(&at, &stats.size, ndims) {
                stats.cell_weight[idx] += ratio as f32;
                stats.cells_covered += ratio;
            }
        }
        stats.histogram_features += 1.0;
    }

    if stats.histogram_features == 0.0 {
        log::warn!("没有要素落入网格直方图，统计信息无效");
        return None;
    }

    log::debug!(
        "网格直方图填充完成: 要素 {}, 格子 {}, 覆盖比例和 {:.3}, 样本体积 {:.3}",
        stats.histogram_features,
        stats.histogram_cells,
        stats.cells_covered,
        total_volume
    );
    Some(stats)
}
