//! N 维边界框
//!
//! 网格直方图和空间估计器共用的几何原语：边界框、格子下标范围、
//! 遍历格子的计数器迭代器，以及各种位置谓词和覆盖比例。

use super::error::{StatsError, StatsResult};
use serde::{Deserialize, Serialize};

/// 支持的最大维数
pub const ND_DIMS: usize = 4;

pub const X_DIM: usize = 0;
pub const Y_DIM: usize = 1;
pub const Z_DIM: usize = 2;

/// 轴对齐的 N 维边界框，`ndims` 之外的维度不参与任何计算
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NdBox {
    ndims: usize,
    pub min: [f64; ND_DIMS],
    pub max: [f64; ND_DIMS],
}

impl NdBox {
    /// 从每维的最小值和最大值创建
    pub fn new(min: &[f64], max: &[f64]) -> StatsResult<Self> {
        if min.len() != max.len() {
            return Err(StatsError::InvalidBox(format!(
                "最小值维数 {} 与最大值维数 {} 不一致",
                min.len(),
                max.len()
            )));
        }
        if min.len() < 1 || min.len() > ND_DIMS {
            return Err(StatsError::InvalidBox(format!(
                "维数 {} 超出范围 1..={}",
                min.len(),
                ND_DIMS
            )));
        }

        let mut nd_box = Self {
            ndims: min.len(),
            min: [0.0; ND_DIMS],
            max: [0.0; ND_DIMS],
        };
        for d in 0..min.len() {
            if min[d] > max[d] {
                return Err(StatsError::InvalidBox(format!(
                    "第 {} 维最小值 {} 大于最大值 {}",
                    d, min[d], max[d]
                )));
            }
            nd_box.min[d] = min[d];
            nd_box.max[d] = max[d];
        }
        Ok(nd_box)
    }

    pub fn new_2d(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            ndims: 2,
            min: [xmin, ymin, 0.0, 0.0],
            max: [xmax, ymax, 0.0, 0.0],
        }
    }

    pub fn new_3d(xmin: f64, ymin: f64, zmin: f64, xmax: f64, ymax: f64, zmax: f64) -> Self {
        Self {
            ndims: 3,
            min: [xmin, ymin, zmin, 0.0],
            max: [xmax, ymax, zmax, 0.0],
        }
    }

    /// 用于累积合并的空框：最小值为 +MAX，最大值为 -MAX
    pub fn empty(ndims: usize) -> Self {
        Self {
            ndims: ndims.clamp(1, ND_DIMS),
            min: [f64::MAX; ND_DIMS],
            max: [-f64::MAX; ND_DIMS],
        }
    }

    pub fn ndims(&self) -> usize {
        self.ndims
    }

    /// 截取前 `ndims` 维
    pub fn with_ndims(mut self, ndims: usize) -> Self {
        let ndims = ndims.clamp(1, ND_DIMS);
        for d in ndims..ND_DIMS {
            self.min[d] = 0.0;
            self.max[d] = 0.0;
        }
        self.ndims = ndims;
        self
    }

    /// 所有坐标都是有限值
    pub fn is_valid(&self) -> bool {
        (0..self.ndims).all(|d| self.min[d].is_finite() && self.max[d].is_finite())
    }

    /// 扩展 self 使其包含 other
    ///
    /// 所有轴都参与合并，未使用的轴因此落在 `[0, 0]` 而不是残留 `±MAX`。
    pub fn merge(&mut self, other: &NdBox) {
        for d in 0..ND_DIMS {
            self.min[d] = self.min[d].min(other.min[d]);
            self.max[d] = self.max[d].max(other.max[d]);
        }
        self.ndims = self.ndims.max(other.ndims);
    }

    /// 每维向两侧各扩展 `width * fraction / 2`，宽度为 0 的维度不变
    pub fn expand(&mut self, fraction: f64) {
        for d in 0..self.ndims {
            let width = self.max[d] - self.min[d];
            if width <= 0.0 {
                continue;
            }
            self.min[d] -= width * fraction / 2.0;
            self.max[d] += width * fraction / 2.0;
        }
    }

    pub fn width(&self, d: usize) -> f64 {
        self.max[d] - self.min[d]
    }

    /// 在前 `ndims` 维上是否相交（边界接触也算）
    pub fn intersects(&self, other: &NdBox, ndims: usize) -> bool {
        (0..ndims).all(|d| !(self.min[d] > other.max[d] || self.max[d] < other.min[d]))
    }

    /// 在前 `ndims` 维上是否严格包含 other
    pub fn contains(&self, other: &NdBox, ndims: usize) -> bool {
        (0..ndims).all(|d| self.min[d] < other.min[d] && self.max[d] > other.max[d])
    }

    /// b2 被 self 覆盖的体积比例
    pub fn ratio_overlaps(&self, b2: &NdBox, ndims: usize) -> f64 {
        let mut covered = true;
        for d in 0..ndims {
            if self.max[d] <= b2.min[d] || self.min[d] >= b2.max[d] {
                return 0.0;
            }
            if self.min[d] > b2.min[d] || self.max[d] < b2.max[d] {
                covered = false;
            }
        }
        if covered {
            return 1.0;
        }

        let mut ivol = 1.0;
        let mut vol2 = 1.0;
        for d in 0..ndims {
            vol2 *= b2.max[d] - b2.min[d];
            let iwidth = self.max[d].min(b2.max[d]) - self.min[d].max(b2.min[d]);
            ivol *= iwidth.max(0.0);
        }

        if vol2 == 0.0 {
            return 0.0;
        }
        ivol / vol2
    }

    // 位置谓词，axis 取 X_DIM / Y_DIM / Z_DIM

    /// self 严格位于 other 的低侧
    pub fn strictly_below_on(&self, other: &NdBox, axis: usize) -> bool {
        self.max[axis] < other.min[axis]
    }

    /// self 不越过 other 的高侧
    pub fn not_above_on(&self, other: &NdBox, axis: usize) -> bool {
        self.max[axis] <= other.max[axis]
    }

    /// self 严格位于 other 的高侧
    pub fn strictly_above_on(&self, other: &NdBox, axis: usize) -> bool {
        self.min[axis] > other.max[axis]
    }

    /// self 不越过 other 的低侧
    pub fn not_below_on(&self, other: &NdBox, axis: usize) -> bool {
        self.min[axis] >= other.min[axis]
    }

    /// cell 中严格位于 self 低侧的比例
    pub fn ratio_below_on(&self, cell: &NdBox, axis: usize) -> f64 {
        if cell.not_below_on(self, axis) {
            0.0
        } else if cell.strictly_below_on(self, axis) {
            1.0
        } else {
            (self.min[axis] - cell.min[axis]) / cell.width(axis)
        }
    }

    /// cell 中不越过 self 高侧的比例
    pub fn ratio_not_above_on(&self, cell: &NdBox, axis: usize) -> f64 {
        if cell.strictly_above_on(self, axis) {
            0.0
        } else if cell.not_above_on(self, axis) {
            1.0
        } else {
            (self.max[axis] - cell.min[axis]) / cell.width(axis)
        }
    }

    /// cell 中严格位于 self 高侧的比例
    pub fn ratio_above_on(&self, cell: &NdBox, axis: usize) -> f64 {
        if cell.not_above_on(self, axis) {
            0.0
        } else if cell.strictly_above_on(self, axis) {
            1.0
        } else {
            (cell.max[axis] - self.max[axis]) / cell.width(axis)
        }
    }

    /// cell 中不越过 self 低侧的比例
    pub fn ratio_not_below_on(&self, cell: &NdBox, axis: usize) -> f64 {
        if cell.strictly_below_on(self, axis) {
            0.0
        } else if cell.not_below_on(self, axis) {
            1.0
        } else {
            (cell.max[axis] - self.min[axis]) / cell.width(axis)
        }
    }
}

/// 网格中的格子下标范围（两端都包含）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NdIBox {
    pub min: [usize; ND_DIMS],
    pub max: [usize; ND_DIMS],
}

impl NdIBox {
    /// 覆盖整个网格
    pub fn full(size: &[usize; ND_DIMS], ndims: usize) -> Self {
        let mut ibox = Self::default();
        for d in 0..ndims {
            ibox.max[d] = size[d].saturating_sub(1);
        }
        ibox
    }

    /// 计算 nd_box 覆盖的格子范围，越界的下标被压回网格内
    pub fn overlapping(
        extent: &NdBox,
        size: &[usize; ND_DIMS],
        ndims: usize,
        nd_box: &NdBox,
    ) -> Self {
        let mut ibox = Self::default();
        for d in 0..ndims {
            let smin = extent.min[d];
            let width = extent.max[d] - smin;
            if !(width > 0.0) || size[d] == 0 {
                continue;
            }
            let cells = size[d] as f64;
            let last = (size[d] - 1) as i64;
            let lo = (cells * (nd_box.min[d] - smin) / width).floor() as i64;
            let hi = (cells * (nd_box.max[d] - smin) / width).floor() as i64;
            ibox.min[d] = lo.clamp(0, last) as usize;
            ibox.max[d] = hi.clamp(0, last) as usize;
        }
        ibox
    }

    /// 遍历范围内的全部格子
    pub fn cells(&self, ndims: usize) -> CellIter {
        CellIter::new(*self, ndims)
    }
}

/// 按第 0 维变化最快的顺序遍历格子下标
#[derive(Debug, Clone)]
pub struct CellIter {
    ibox: NdIBox,
    ndims: usize,
    current: Option<[usize; ND_DIMS]>,
}

impl CellIter {
    pub fn new(ibox: NdIBox, ndims: usize) -> Self {
        let ndims = ndims.min(ND_DIMS);
        let empty = (0..ndims).any(|d| ibox.min[d] > ibox.max[d]);
        Self {
            ibox,
            ndims,
            current: if empty { None } else { Some(ibox.min) },
        }
    }

    /// 回到范围起点重新遍历
    pub fn reset(&mut self) {
        *self = Self::new(self.ibox, self.ndims);
    }
}

impl Iterator for CellIter {
    type Item = [usize; ND_DIMS];

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.current?;

        let mut next = at;
        let mut d = 0;
        while d < self.ndims {
            if next[d] < self.ibox.max[d] {
                next[d] += 1;
                break;
            }
            next[d] = self.ibox.min[d];
            d += 1;
        }
        self.current = if d == self.ndims { None } else { Some(next) };

        Some(at)
    }
}

/// 多维下标到一维数组位置的混合进制编码，越界时返回 None
pub fn cell_index(at: &[usize; ND_DIMS], size: &[usize; ND_DIMS], ndims: usize) -> Option<usize> {
    let mut accum = 1usize;
    let mut vdx = 0usize;
    for d in 0..ndims {
        if at[d] >= size[d] {
            return None;
        }
        vdx += at[d] * accum;
        accum *= size[d];
    }
    Some(vdx)
}

/// 格子 `at` 对应的空间范围
pub fn cell_box(extent: &NdBox, size: &[usize; ND_DIMS], ndims: usize, at: &[usize; ND_DIMS]) -> NdBox {
    let mut cell = NdBox {
        ndims,
        min: [0.0; ND_DIMS],
        max: [0.0; ND_DIMS],
    };
    for d in 0..ndims {
        let cell_size = (extent.max[d] - extent.min[d]) / size[d].max(1) as f64;
        cell.min[d] = extent.min[d] + at[d] as f64 * cell_size;
        cell.max[d] = extent.min[d] + (at[d] + 1) as f64 * cell_size;
    }
    cell
}
