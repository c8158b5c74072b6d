//! 统计信息模块
//!
//! 列级统计信息包含空值比例、不同值估计、平均宽度，以及按列类型
//! 附带的值维直方图、时间维直方图和网格直方图。统计信息构建后不可变，
//! 重新分析时整体替换。

use super::histogram::SpanHistograms;
use super::nd_grid::NdStats;
use crate::core::{Float, StatsResult, Timestamp};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// 不同值数量未知时的默认值
pub const DEFAULT_NUM_DISTINCT: f64 = 200.0;

/// 列类型，决定有哪些维度参与估计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// 数值区间列
    ValueSpan,
    /// 时间段列
    TimeSpan,
    /// 只有时间维的时序列（时序布尔、时序文本）
    Temporal,
    /// 时序数值：值维 + 时间维
    TNumber,
    /// 时序点：空间维 + 时间维
    TPoint,
}

impl ColumnKind {
    pub fn has_value_dim(self) -> bool {
        matches!(self, ColumnKind::ValueSpan | ColumnKind::TNumber)
    }

    pub fn has_time_dim(self) -> bool {
        matches!(
            self,
            ColumnKind::TimeSpan | ColumnKind::Temporal | ColumnKind::TNumber | ColumnKind::TPoint
        )
    }

    pub fn has_space_dim(self) -> bool {
        matches!(self, ColumnKind::TPoint)
    }
}

/// 列级统计信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// 列名
    pub column_name: String,
    pub kind: ColumnKind,
    /// 空值比例（0.0 - 1.0）
    pub null_fraction: f64,
    /// 不同值估计；负数表示占总行数的比例，0 表示未知
    pub distinct: f64,
    /// 平均宽度（字节）
    pub avg_width: u64,
    pub value_histograms: Option<SpanHistograms<Float>>,
    pub time_histograms: Option<SpanHistograms<Timestamp>>,
    pub nd_stats: Option<NdStats>,
}

impl ColumnStatistics {
    pub fn new(column_name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            column_name: column_name.into(),
            kind,
            null_fraction: 0.0,
            distinct: 0.0,
            avg_width: 0,
            value_histograms: None,
            time_histograms: None,
            nd_stats: None,
        }
    }

    /// 不同值数量
    ///
    /// # 返回
    /// (估计值, 是否为默认值)
    pub fn num_distinct(&self, row_count: f64) -> (f64, bool) {
        if self.distinct > 0.0 {
            (self.distinct, false)
        } else if self.distinct < 0.0 && row_count > 0.0 {
            ((-self.distinct * row_count).max(1.0), false)
        } else {
            (DEFAULT_NUM_DISTINCT, true)
        }
    }

    /// 检查所有直方图的结构不变式
    pub fn validate(&self) -> StatsResult<()> {
        if let Some(hist) = &self.value_histograms {
            hist.validate()?;
        }
        if let Some(hist) = &self.time_histograms {
            hist.validate()?;
        }
        if let Some(nd_stats) = &self.nd_stats {
            nd_stats.validate()?;
        }
        Ok(())
    }

    /// 序列化为 JSON，供宿主持久化
    pub fn to_json(&self) -> StatsResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 从 JSON 恢复并校验
    pub fn from_json(json: &str) -> StatsResult<Self> {
        let stats: ColumnStatistics = serde_json::from_str(json)?;
        stats.validate()?;
        Ok(stats)
    }
}

/// 表级统计信息
#[derive(Debug, Clone, Default)]
pub struct TableStatistics {
    /// 表名
    pub table_name: String,
    /// 估计行数
    pub row_count: f64,
    /// 最后分析时间
    pub last_analyzed: Option<DateTime<Utc>>,
    /// 列级统计信息
    pub column_stats: HashMap<String, Arc<ColumnStatistics>>,
}

impl TableStatistics {
    pub fn new(table_name: impl Into<String>, row_count: f64) -> Self {
        Self {
            table_name: table_name.into(),
            row_count,
            ..Default::default()
        }
    }

    pub fn with_column(mut self, stats: ColumnStatistics) -> Self {
        self.add_column(stats);
        self
    }

    pub fn add_column(&mut self, stats: ColumnStatistics) {
        self.column_stats
            .insert(stats.column_name.clone(), Arc::new(stats));
    }
}

/// 统计信息提供者 trait
///
/// 估计器通过它读取统计信息，返回的快照在整个估计过程中保持不变
pub trait StatisticsProvider: Send + Sync {
    /// 获取列的统计信息
    ///
    /// # 参数
    /// - `table_name`: 表名
    /// - `column_name`: 列名
    ///
    /// # 返回
    /// 列的统计信息，如果不存在则返回 None
    fn get_column_stats(&self, table_name: &str, column_name: &str) -> Option<Arc<ColumnStatistics>>;

    /// 获取表的估计行数
    fn get_row_count(&self, table_name: &str) -> Option<f64>;

    /// 获取表的最后分析时间
    fn get_last_analyzed(&self, table_name: &str) -> Option<DateTime<Utc>>;
}

/// 内存统计信息提供者
///
/// 发布新统计信息时整表替换，正在进行的估计仍持有旧快照
#[derive(Debug, Default)]
pub struct MemoryStatisticsProvider {
    tables: RwLock<HashMap<String, Arc<TableStatistics>>>,
}

impl MemoryStatisticsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布表统计信息，替换旧版本
    pub fn publish(&self, stats: TableStatistics) {
        log::info!(
            "发布表统计信息: {} ({} 列, {} 行)",
            stats.table_name,
            stats.column_stats.len(),
            stats.row_count
        );
        self.tables
            .write()
            .insert(stats.table_name.clone(), Arc::new(stats));
    }

    /// 删除表统计信息
    pub fn remove(&self, table_name: &str) -> bool {
        self.tables.write().remove(table_name).is_some()
    }

    /// 获取整表快照
    pub fn get_table_stats(&self, table_name: &str) -> Option<Arc<TableStatistics>> {
        self.tables.read().get(table_name).cloned()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }
}

impl StatisticsProvider for MemoryStatisticsProvider {
    fn get_column_stats(&self, table_name: &str, column_name: &str) -> Option<Arc<ColumnStatistics>> {
        self.tables
            .read()
            .get(table_name)
            .and_then(|table| table.column_stats.get(column_name).cloned())
    }

    fn get_row_count(&self, table_name: &str) -> Option<f64> {
        self.tables.read().get(table_name).map(|t| t.row_count)
    }

    fn get_last_analyzed(&self, table_name: &str) -> Option<DateTime<Utc>> {
        self.tables
            .read()
            .get(table_name)
            .and_then(|t| t.last_analyzed)
    }
}
