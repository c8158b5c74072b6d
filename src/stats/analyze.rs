//! 统计信息收集器
//!
//! 实现 ANALYZE 功能：从样本行计算列的空值比例、宽度、不同值估计，
//! 以及各维度的直方图。列类型等上下文通过参数显式传入，没有全局状态。

use super::histogram::build_span_histograms;
use super::nd_grid::{GridMode, NdGridBuilder};
use super::sampling::{ReservoirSampler, ROWS_PER_TARGET};
use super::statistics::{ColumnKind, ColumnStatistics, TableStatistics};
use crate::config::Config;
use crate::core::{FloatSpan, NdBox, Period, STBox, StatsError, StatsResult, TBox};
use rayon::prelude::*;

/// 分析配置
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// 统计目标，决定直方图桶数和网格格子数，默认 100
    pub stats_target: usize,
    /// 网格直方图模式
    pub grid_mode: GridMode,
    /// 每个统计目标单位对应的样本行数
    pub rows_per_target: usize,
    /// 采样器随机种子，None 时使用系统熵
    pub seed: Option<u64>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            stats_target: 100,
            grid_mode: GridMode::Nd,
            rows_per_target: ROWS_PER_TARGET,
            seed: None,
        }
    }
}

impl AnalyzeConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stats_target: config.statistics.target,
            grid_mode: config.statistics.grid_mode,
            rows_per_target: config.statistics.rows_per_target,
            seed: config.statistics.seed,
        }
    }

    /// 最少样本行数
    pub fn min_sample_rows(&self) -> usize {
        self.rows_per_target.max(1).saturating_mul(self.stats_target.max(1))
    }
}

/// 样本值
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    /// 数值区间
    Span(FloatSpan),
    /// 时间段，也用于只有时间维的时序值的边界时间段
    Period(Period),
    /// 时序数值的边界框
    TBox(TBox),
    /// 时序点的边界框
    STBox(STBox),
}

/// 一行非空样本
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub value: SampleValue,
    /// 编码后的字节数
    pub width: u64,
}

impl SampleRow {
    /// 用区间结构体大小作为宽度
    pub fn new(value: SampleValue) -> Self {
        let width = match &value {
            SampleValue::Span(_) => std::mem::size_of::<FloatSpan>(),
            SampleValue::Period(_) => std::mem::size_of::<Period>(),
            SampleValue::TBox(_) => std::mem::size_of::<TBox>(),
            SampleValue::STBox(_) => std::mem::size_of::<STBox>(),
        } as u64;
        Self { value, width }
    }

    pub fn with_width(value: SampleValue, width: u64) -> Self {
        Self { value, width }
    }
}

/// 一列的全部样本
#[derive(Debug, Clone)]
pub struct ColumnSample {
    pub column_name: String,
    pub kind: ColumnKind,
    pub rows: Vec<Option<SampleRow>>,
}

/// 按列类型拆出的各维度样本
#[derive(Default)]
struct Components {
    values: Vec<FloatSpan>,
    periods: Vec<Period>,
    boxes: Vec<Option<NdBox>>,
}

impl Components {
    fn push(&mut self, kind: ColumnKind, value: &SampleValue) -> StatsResult<()> {
        match (kind, value) {
            (ColumnKind::ValueSpan, SampleValue::Span(span)) => self.values.push(span.clone()),
            (ColumnKind::TimeSpan | ColumnKind::Temporal, SampleValue::Period(period)) => {
                self.periods.push(period.clone())
            }
            (ColumnKind::TNumber, SampleValue::TBox(tbox)) => match (&tbox.span, &tbox.period) {
                (Some(span), Some(period)) => {
                    self.values.push(span.clone());
                    self.periods.push(period.clone());
                }
                _ => {
                    return Err(StatsError::Sampling(
                        "时序数值的边界框必须同时有值维和时间维".to_string(),
                    ))
                }
            },
            (ColumnKind::TPoint, SampleValue::STBox(stbox)) => {
                let period = stbox.period.as_ref().ok_or_else(|| {
                    StatsError::Sampling("时序点的边界框缺少时间维".to_string())
                })?;
                self.periods.push(period.clone());
                self.boxes.push(stbox.space);
            }
            (kind, value) => {
                return Err(StatsError::Sampling(format!(
                    "列类型 {:?} 不接受样本值 {:?}",
                    kind, value
                )))
            }
        }
        Ok(())
    }
}

/// 列分析器
#[derive(Debug, Clone, Default)]
pub struct ColumnAnalyzer {
    config: AnalyzeConfig,
}

impl ColumnAnalyzer {
    pub fn new(config: AnalyzeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzeConfig {
        &self.config
    }

    /// 分析一列样本
    ///
    /// # 参数
    /// - `sample`: 列样本，None 表示空值
    /// - `total_rows`: 表的总行数，用于网格直方图
    ///
    /// # 返回
    /// 列统计信息；样本为空或样本值与列类型不符时返回错误
    pub fn analyze(&self, sample: &ColumnSample, total_rows: f64) -> StatsResult<ColumnStatistics> {
        let kind = sample.kind;
        let mut stats = ColumnStatistics::new(sample.column_name.clone(), kind);

        let mut null_cnt = 0usize;
        let mut non_null_cnt = 0usize;
        let mut total_width = 0u64;
        let mut components = Components::default();

        for row in &sample.rows {
            match row {
                None => null_cnt += 1,
                Some(row) => {
                    components.push(kind, &row.value)?;
                    total_width += row.width;
                    non_null_cnt += 1;
                }
            }
        }

        let sample_rows = sample.rows.len();
        if non_null_cnt == 0 {
            if null_cnt == 0 {
                return Err(StatsError::Sampling(format!(
                    "列 {} 的样本为空",
                    sample.column_name
                )));
            }
            // 只看到空值，认为整列为空
            stats.null_fraction = 1.0;
            stats.avg_width = 0;
            stats.distinct = 0.0;
            log::info!("列 {} 的样本全部为空", sample.column_name);
            return Ok(stats);
        }

        stats.null_fraction = null_cnt as f64 / sample_rows as f64;
        stats.avg_width = total_width / non_null_cnt as u64;
        // 假设非空值互不相同
        stats.distinct = -(1.0 - stats.null_fraction);

        let target = self.config.stats_target;
        if kind.has_value_dim() {
            stats.value_histograms = build_span_histograms(&components.values, target);
        }
        if kind.has_time_dim() {
            stats.time_histograms = build_span_histograms(&components.periods, target);
        }
        if kind.has_space_dim() {
            // 空间维缺失的样本按空值计入样本行数
            let mut rows: Vec<Option<NdBox>> = components.boxes;
            rows.extend(std::iter::repeat(None).take(null_cnt));
            stats.nd_stats = NdGridBuilder::new(target)
                .total_rows(total_rows)
                .mode(self.config.grid_mode)
                .build(&rows);
        }

        log::info!(
            "分析列 {} 完成: 样本 {} 行, 空值比例 {:.4}, 平均宽度 {}, 值直方图 {}, 时间直方图 {}, 网格 {}",
            sample.column_name,
            sample_rows,
            stats.null_fraction,
            stats.avg_width,
            stats.value_histograms.as_ref().map_or(0, |h| h.bounds.len()),
            stats.time_histograms.as_ref().map_or(0, |h| h.bounds.len()),
            stats.nd_stats.as_ref().map_or(0, |s| s.histogram_cells)
        );
        Ok(stats)
    }

    /// 从行流中水库采样后分析，总行数取流的长度
    pub fn analyze_stream<I>(
        &self,
        column_name: impl Into<String>,
        kind: ColumnKind,
        rows: I,
    ) -> StatsResult<ColumnStatistics>
    where
        I: IntoIterator<Item = Option<SampleRow>>,
    {
        let capacity = self.config.min_sample_rows();
        let mut sampler = match self.config.seed {
            Some(seed) => ReservoirSampler::with_seed(capacity, seed),
            None => ReservoirSampler::new(capacity),
        };
        sampler.extend(rows);
        let sample = sampler.finish();

        let column = ColumnSample {
            column_name: column_name.into(),
            kind,
            rows: sample.rows,
        };
        self.analyze(&column, sample.total_rows)
    }
}

/// 表分析器，多列并行分析
#[derive(Debug, Clone, Default)]
pub struct TableAnalyzer {
    analyzer: ColumnAnalyzer,
}

impl TableAnalyzer {
    pub fn new(config: AnalyzeConfig) -> Self {
        Self {
            analyzer: ColumnAnalyzer::new(config),
        }
    }

    /// 分析表的多列
    ///
    /// # 参数
    /// - `table_name`: 表名
    /// - `total_rows`: 表的总行数
    /// - `columns`: 各列的样本
    ///
    /// # 返回
    /// 表统计信息，任一列失败时返回该错误
    pub fn analyze_table(
        &self,
        table_name: &str,
        total_rows: f64,
        columns: &[ColumnSample],
    ) -> StatsResult<TableStatistics> {
        let column_stats: Vec<ColumnStatistics> = columns
            .par_iter()
            .map(|column| self.analyzer.analyze(column, total_rows))
            .collect::<StatsResult<Vec<_>>>()?;

        let mut table = TableStatistics::new(table_name, total_rows);
        table.last_analyzed = Some(chrono::Utc::now());
        for stats in column_stats {
            table.add_column(stats);
        }

        log::info!("分析表 {} 完成: {} 列", table_name, table.column_stats.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Float, Span, Timestamp};

    fn float_span(l: f64, u: f64) -> FloatSpan {
        Span::closed_open(Float(l), Float(u)).unwrap()
    }

    fn period(l: i64, u: i64) -> Period {
        Span::closed_open(
            Timestamp::from_unix_seconds(l).unwrap(),
            Timestamp::from_unix_seconds(u).unwrap(),
        )
        .unwrap()
    }

    fn span_column(rows: Vec<Option<SampleRow>>) -> ColumnSample {
        ColumnSample {
            column_name: "fare".to_string(),
            kind: ColumnKind::ValueSpan,
            rows,
        }
    }

    #[test]
    fn test_min_sample_rows() {
        assert_eq!(AnalyzeConfig::default().min_sample_rows(), 30_000);
        let config = AnalyzeConfig {
            stats_target: 0,
            ..AnalyzeConfig::default()
        };
        assert_eq!(config.min_sample_rows(), 300);
        let config = AnalyzeConfig {
            stats_target: usize::MAX,
            ..AnalyzeConfig::default()
        };
        assert_eq!(config.min_sample_rows(), usize::MAX);
    }

    #[test]
    fn test_null_fraction_width_and_distinct() {
        let mut rows: Vec<Option<SampleRow>> = (0..8)
            .map(|i| {
                Some(SampleRow::with_width(
                    SampleValue::Span(float_span(i as f64, i as f64 + 1.0)),
                    10,
                ))
            })
            .collect();
        rows.push(None);
        rows.push(None);

        let stats = ColumnAnalyzer::default()
            .analyze(&span_column(rows), 1000.0)
            .unwrap();
        assert!((stats.null_fraction - 0.2).abs() < 1e-12);
        assert_eq!(stats.avg_width, 10);
        assert!((stats.distinct + 0.8).abs() < 1e-12);
        assert_eq!(stats.value_histograms.unwrap().bounds.len(), 8);
        assert!(stats.time_histograms.is_none());
    }

    #[test]
    fn test_only_nulls() {
        let stats = ColumnAnalyzer::default()
            .analyze(&span_column(vec![None, None]), 10.0)
            .unwrap();
        assert_eq!(stats.null_fraction, 1.0);
        assert_eq!(stats.distinct, 0.0);
        assert!(stats.value_histograms.is_none());
    }

    #[test]
    fn test_single_value_has_no_histogram() {
        let rows = vec![Some(SampleRow::new(SampleValue::Span(float_span(0.0, 1.0))))];
        let stats = ColumnAnalyzer::default()
            .analyze(&span_column(rows), 10.0)
            .unwrap();
        assert_eq!(stats.null_fraction, 0.0);
        assert!(stats.value_histograms.is_none());
    }

    #[test]
    fn test_empty_and_mismatched_samples_fail() {
        let analyzer = ColumnAnalyzer::default();
        assert!(analyzer.analyze(&span_column(vec![]), 0.0).is_err());

        let rows = vec![Some(SampleRow::new(SampleValue::Period(period(0, 10))))];
        assert!(analyzer.analyze(&span_column(rows), 10.0).is_err());
    }

    #[test]
    fn test_tnumber_builds_both_dimensions() {
        let rows: Vec<Option<SampleRow>> = (0..20)
            .map(|i| {
                let tbox = TBox::new(
                    Some(float_span(i as f64, i as f64 + 5.0)),
                    Some(period(i * 60, i * 60 + 600)),
                )
                .unwrap();
                Some(SampleRow::new(SampleValue::TBox(tbox)))
            })
            .collect();
        let column = ColumnSample {
            column_name: "speed".to_string(),
            kind: ColumnKind::TNumber,
            rows,
        };
        let stats = ColumnAnalyzer::default().analyze(&column, 20.0).unwrap();
        assert!(stats.value_histograms.is_some());
        let time = stats.time_histograms.unwrap();
        assert_eq!(time.lengths.unwrap().lengths()[0], 600.0);
        assert!(stats.nd_stats.is_none());
    }

    #[test]
    fn test_tpoint_builds_grid() {
        let rows: Vec<Option<SampleRow>> = (0..50)
            .map(|i| {
                let x = (i % 10) as f64;
                let y = (i / 10) as f64;
                let stbox = STBox::new(
                    Some(NdBox::new_2d(x, y, x + 1.0, y + 1.0)),
                    Some(period(i * 10, i * 10 + 100)),
                )
                .unwrap();
                Some(SampleRow::new(SampleValue::STBox(stbox)))
            })
            .chain(std::iter::once(None))
            .collect();
        let column = ColumnSample {
            column_name: "trip".to_string(),
            kind: ColumnKind::TPoint,
            rows,
        };
        let stats = ColumnAnalyzer::default().analyze(&column, 5_000.0).unwrap();
        let grid = stats.nd_stats.unwrap();
        assert_eq!(grid.sample_features, 51.0);
        assert_eq!(grid.not_null_features, 50.0);
        assert_eq!(grid.histogram_features, 50.0);
        assert!(stats.time_histograms.is_some());
    }

    #[test]
    fn test_analyze_stream_samples_rows() {
        let config = AnalyzeConfig {
            stats_target: 1,
            seed: Some(5),
            ..Default::default()
        };
        let rows = (0..1_000).map(|i| {
            Some(SampleRow::new(SampleValue::Span(float_span(i as f64, i as f64 + 1.0))))
        });
        let stats = ColumnAnalyzer::new(config)
            .analyze_stream("fare", ColumnKind::ValueSpan, rows)
            .unwrap();
        // 统计目标为 1 时只有 2 个边界
        assert_eq!(stats.value_histograms.unwrap().bounds.len(), 2);
    }

    #[test]
    fn test_analyze_table_in_parallel() {
        let columns: Vec<ColumnSample> = (0..4)
            .map(|c| ColumnSample {
                column_name: format!("c{}", c),
                kind: ColumnKind::ValueSpan,
                rows: (0..10)
                    .map(|i| {
                        Some(SampleRow::new(SampleValue::Span(float_span(
                            (i * c) as f64,
                            (i * c) as f64 + 1.0,
                        ))))
                    })
                    .collect(),
            })
            .collect();
        let table = TableAnalyzer::default()
            .analyze_table("t", 10.0, &columns)
            .unwrap();
        assert_eq!(table.column_stats.len(), 4);
        assert!(table.last_analyzed.is_some());

        let mut bad = columns.clone();
        bad[2].rows = vec![];
        assert!(TableAnalyzer::default().analyze_table("t", 10.0, &bad).is_err());
    }
}
