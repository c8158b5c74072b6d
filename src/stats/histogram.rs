//! 边界直方图与长度直方图
//!
//! 从样本区间构建等深直方图：下界和上界各自独立排序后，
//! 按均匀间隔取顺序统计量组成合成区间。长度直方图用同样的取样规则。
//! 非空样本少于 2 个时不构建直方图（视为没有统计信息）。

use crate::core::{Bound, BoundValue, Span, StatsError, StatsResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 边界直方图
///
/// `lowers` 与 `uppers` 长度相同且至少为 2，桶数为 `len - 1`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundHistogram<T> {
    lowers: Vec<Bound<T>>,
    uppers: Vec<Bound<T>>,
}

impl<T: BoundValue> BoundHistogram<T> {
    /// 用已经排好序的边界构造，检查结构不变式
    pub fn from_parts(lowers: Vec<Bound<T>>, uppers: Vec<Bound<T>>) -> StatsResult<Self> {
        let hist = Self { lowers, uppers };
        hist.validate()?;
        Ok(hist)
    }

    /// 从区间列表构造，区间必须已按下界和上界分别有序
    pub fn from_spans(spans: &[Span<T>]) -> StatsResult<Self> {
        let (lowers, uppers) = spans.iter().map(|s| s.bounds()).unzip();
        Self::from_parts(lowers, uppers)
    }

    /// 检查长度和单调性，反序列化之后调用
    pub fn validate(&self) -> StatsResult<()> {
        if self.lowers.len() != self.uppers.len() {
            return Err(StatsError::InvalidHistogram(format!(
                "下界数 {} 与上界数 {} 不一致",
                self.lowers.len(),
                self.uppers.len()
            )));
        }
        if self.lowers.len() < 2 {
            return Err(StatsError::InvalidHistogram(format!(
                "边界数 {} 少于 2",
                self.lowers.len()
            )));
        }
        for (name, side) in [("下界", &self.lowers), ("上界", &self.uppers)] {
            if side
                .windows(2)
                .any(|w| w[0].compare(&w[1]) == Ordering::Greater)
            {
                return Err(StatsError::InvalidHistogram(format!("{}序列不是非递减的", name)));
            }
        }
        Ok(())
    }

    pub fn lowers(&self) -> &[Bound<T>] {
        &self.lowers
    }

    pub fn uppers(&self) -> &[Bound<T>] {
        &self.uppers
    }

    /// 边界个数，比桶数多 1
    pub fn len(&self) -> usize {
        self.lowers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lowers.is_empty()
    }

    pub fn num_bins(&self) -> usize {
        self.lowers.len() - 1
    }
}

/// 区间长度直方图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthHistogram {
    lengths: Vec<f64>,
}

impl LengthHistogram {
    pub fn from_parts(lengths: Vec<f64>) -> StatsResult<Self> {
        let hist = Self { lengths };
        hist.validate()?;
        Ok(hist)
    }

    pub fn validate(&self) -> StatsResult<()> {
        if self.lengths.len() < 2 {
            return Err(StatsError::InvalidHistogram(format!(
                "长度直方图只有 {} 个值",
                self.lengths.len()
            )));
        }
        if self.lengths.iter().any(|l| l.is_nan() || *l < 0.0) {
            return Err(StatsError::InvalidHistogram("长度必须是非负数".to_string()));
        }
        if self.lengths.windows(2).any(|w| w[0] > w[1]) {
            return Err(StatsError::InvalidHistogram("长度序列不是非递减的".to_string()));
        }
        Ok(())
    }

    pub fn lengths(&self) -> &[f64] {
        &self.lengths
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

/// 一个维度（值或时间）上的全部区间直方图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanHistograms<T> {
    pub bounds: BoundHistogram<T>,
    pub lengths: Option<LengthHistogram>,
}

impl<T: BoundValue> SpanHistograms<T> {
    pub fn new(bounds: BoundHistogram<T>, lengths: Option<LengthHistogram>) -> Self {
        Self { bounds, lengths }
    }

    pub fn validate(&self) -> StatsResult<()> {
        self.bounds.validate()?;
        if let Some(lengths) = &self.lengths {
            lengths.validate()?;
        }
        Ok(())
    }
}

/// 从 `count` 个有序值中均匀选出 `num_hist` 个位置
///
/// 整数步长加小数进位，避免大统计目标下 `i * (count - 1)` 溢出。
/// 首尾位置总是 0 和 `count - 1`。
pub(crate) fn equi_depth_positions(count: usize, num_hist: usize) -> Vec<usize> {
    debug_assert!(count >= 2 && num_hist >= 2 && num_hist <= count);

    let delta = (count - 1) / (num_hist - 1);
    let deltafrac = (count - 1) % (num_hist - 1);
    let mut pos = 0;
    let mut posfrac = 0;
    let mut positions = Vec::with_capacity(num_hist);

    for _ in 0..num_hist {
        positions.push(pos);
        pos += delta;
        posfrac += deltafrac;
        if posfrac >= num_hist - 1 {
            pos += 1;
            posfrac -= num_hist - 1;
        }
    }
    positions
}

fn histogram_size(count: usize, target_bins: usize) -> Option<usize> {
    if count < 2 {
        return None;
    }
    Some(count.min(target_bins.max(1).saturating_add(1)))
}

/// 构建边界直方图
///
/// # 参数
/// - `sample`: 样本区间的 (下界, 上界)
/// - `target_bins`: 目标桶数，通常等于统计目标
///
/// # 返回
/// 样本少于 2 个时返回 None
pub fn build_bound_histogram<T: BoundValue>(
    sample: &[(Bound<T>, Bound<T>)],
    target_bins: usize,
) -> Option<BoundHistogram<T>> {
    let num_hist = histogram_size(sample.len(), target_bins)?;

    let mut lowers: Vec<Bound<T>> = sample.iter().map(|(l, _)| l.clone()).collect();
    let mut uppers: Vec<Bound<T>> = sample.iter().map(|(_, u)| u.clone()).collect();
    lowers.sort_by(|a, b| a.compare(b));
    uppers.sort_by(|a, b| a.compare(b));

    let positions = equi_depth_positions(sample.len(), num_hist);
    let hist = BoundHistogram {
        lowers: positions.iter().map(|&p| lowers[p].clone()).collect(),
        uppers: positions.iter().map(|&p| uppers[p].clone()).collect(),
    };

    log::debug!(
        "构建边界直方图: 样本数 {}, 边界数 {}",
        sample.len(),
        hist.len()
    );
    Some(hist)
}

/// 构建长度直方图，NaN 长度被忽略
pub fn build_length_histogram(sample: &[f64], target_bins: usize) -> Option<LengthHistogram> {
    let mut lengths: Vec<f64> = sample.iter().copied().filter(|l| !l.is_nan()).collect();
    let num_hist = histogram_size(lengths.len(), target_bins)?;
    lengths.sort_by(|a, b| a.total_cmp(b));

    let positions = equi_depth_positions(lengths.len(), num_hist);
    Some(LengthHistogram {
        lengths: positions.iter().map(|&p| lengths[p]).collect(),
    })
}

/// 从样本区间同时构建边界直方图和长度直方图
pub fn build_span_histograms<T: BoundValue>(
    spans: &[Span<T>],
    target_bins: usize,
) -> Option<SpanHistograms<T>> {
    let bounds: Vec<_> = spans.iter().map(|s| s.bounds()).collect();
    let widths: Vec<f64> = spans.iter().map(|s| s.width()).collect();

    let bound_hist = build_bound_histogram(&bounds, target_bins)?;
    let length_hist = build_length_histogram(&widths, target_bins);
    Some(SpanHistograms::new(bound_hist, length_hist))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Float;

    fn span(l: f64, u: f64) -> Span<Float> {
        Span::closed_open(Float(l), Float(u)).unwrap()
    }

    #[test]
    fn test_equi_depth_positions() {
        assert_eq!(equi_depth_positions(5, 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(equi_depth_positions(10, 4), vec![0, 3, 6, 9]);
        // 9 / 3 不整除时靠小数进位补齐
        assert_eq!(equi_depth_positions(11, 4), vec![0, 3, 6, 10]);
        let positions = equi_depth_positions(1000, 101);
        assert_eq!(positions.len(), 101);
        assert_eq!(*positions.last().unwrap(), 999);
    }

    #[test]
    fn test_build_requires_two_values() {
        let single = vec![span(0.0, 1.0).bounds()];
        assert!(build_bound_histogram(&single, 10).is_none());
        assert!(build_length_histogram(&[1.0], 10).is_none());
        assert!(build_span_histograms::<Float>(&[], 10).is_none());
    }

    #[test]
    fn test_sides_sorted_independently() {
        // 下界最小的区间并不是上界最小的
        let spans = vec![span(0.0, 100.0), span(10.0, 20.0), span(5.0, 6.0)];
        let hist = build_span_histograms(&spans, 10).unwrap();
        let lowers: Vec<f64> = hist.bounds.lowers().iter().map(|b| b.value.0).collect();
        let uppers: Vec<f64> = hist.bounds.uppers().iter().map(|b| b.value.0).collect();
        assert_eq!(lowers, vec![0.0, 5.0, 10.0]);
        assert_eq!(uppers, vec![6.0, 20.0, 100.0]);
        assert_eq!(hist.lengths.unwrap().lengths(), &[1.0, 10.0, 100.0]);
    }

    #[test]
    fn test_target_limits_size() {
        let spans: Vec<_> = (0..50).map(|i| span(i as f64, i as f64 + 3.0)).collect();
        let hist = build_span_histograms(&spans, 4).unwrap();
        assert_eq!(hist.bounds.len(), 5);
        assert_eq!(hist.bounds.num_bins(), 4);
        assert_eq!(hist.bounds.lowers()[0].value, Float(0.0));
        assert_eq!(hist.bounds.lowers()[4].value, Float(49.0));
    }

    #[test]
    fn test_lower_never_exceeds_upper_at_same_index() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(17);
        let spans: Vec<_> = (0..2_000)
            .map(|_| {
                let lower = rng.gen::<f64>() * 1_000.0 - 500.0;
                let length = rng.gen::<f64>().powi(3) * 200.0 + 0.01;
                span(lower, lower + length)
            })
            .collect();

        for target in [1, 7, 100, 5_000] {
            let hist = build_span_histograms(&spans, target).unwrap();
            let (lowers, uppers) = (hist.bounds.lowers(), hist.bounds.uppers());
            assert_eq!(lowers.len(), uppers.len());
            for (lower, upper) in lowers.iter().zip(uppers) {
                assert!(lower.value <= upper.value, "{:?} > {:?}", lower, upper);
                assert_ne!(lower.compare(upper), Ordering::Greater);
            }
        }
    }

    #[test]
    fn test_huge_target_keeps_every_value() {
        let spans: Vec<_> = (0..20).map(|i| span(i as f64, i as f64 + 1.0)).collect();
        let hist = build_span_histograms(&spans, usize::MAX).unwrap();
        assert_eq!(hist.bounds.len(), 20);
        assert_eq!(histogram_size(20, usize::MAX), Some(20));
    }

    #[test]
    fn test_from_parts_validation() {
        let ok = BoundHistogram::from_spans(&[span(0.0, 5.0), span(10.0, 15.0)]);
        assert!(ok.is_ok());

        let unsorted = BoundHistogram::from_spans(&[span(10.0, 15.0), span(0.0, 5.0)]);
        assert!(unsorted.is_err());

        assert!(LengthHistogram::from_parts(vec![1.0]).is_err());
        assert!(LengthHistogram::from_parts(vec![2.0, 1.0]).is_err());
        assert!(LengthHistogram::from_parts(vec![1.0, f64::INFINITY]).is_ok());
    }

    #[test]
    fn test_length_histogram_ignores_nan() {
        let hist = build_length_histogram(&[3.0, f64::NAN, 1.0, 2.0], 10).unwrap();
        assert_eq!(hist.lengths(), &[1.0, 2.0, 3.0]);
    }
}
