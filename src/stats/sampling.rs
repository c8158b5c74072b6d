//! 样本采集
//!
//! 单遍水库采样（Algorithm R）：行按流到达，常量内存，
//! 每一行进入样本的概率相同。样本量通常取 `300 * 统计目标`。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 每个统计目标单位对应的最少样本行数
pub const ROWS_PER_TARGET: usize = 300;

/// 水库采样器
#[derive(Debug)]
pub struct ReservoirSampler<T> {
    capacity: usize,
    seen: u64,
    reservoir: Vec<T>,
    rng: StdRng,
}

impl<T> ReservoirSampler<T> {
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// 固定随机种子，测试时得到确定的样本
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        Self {
            capacity,
            seen: 0,
            reservoir: Vec::with_capacity(capacity.min(64 * 1024)),
            rng,
        }
    }

    /// 送入一行
    pub fn offer(&mut self, row: T) {
        self.seen += 1;
        if self.reservoir.len() < self.capacity {
            self.reservoir.push(row);
            return;
        }
        let j = self.rng.gen_range(0..self.seen);
        if (j as usize) < self.capacity {
            self.reservoir[j as usize] = row;
        }
    }

    /// 已经看到的总行数
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.reservoir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservoir.is_empty()
    }

    /// 结束采样，返回样本和总行数
    pub fn finish(self) -> Sample<T> {
        Sample {
            total_rows: self.seen as f64,
            rows: self.reservoir,
        }
    }
}

impl<T> Extend<T> for ReservoirSampler<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for row in iter {
            self.offer(row);
        }
    }
}

/// 一次采样的结果
#[derive(Debug, Clone)]
pub struct Sample<T> {
    pub rows: Vec<T>,
    /// 被采样的表总行数
    pub total_rows: f64,
}
