//! 单侧直方图上的累积分布估计
//!
//! 二分查找定位桶，再在桶内线性插值。所有区间估计器都建立在这几个函数之上。

use crate::core::{Bound, BoundValue};
use std::cmp::Ordering;

/// 查找最大的 i 使 `hist[i] < value`（`equal` 时为 `<=`）
///
/// 没有这样的 i 时返回 None。
pub fn bound_bsearch<T: BoundValue>(value: &Bound<T>, hist: &[Bound<T>], equal: bool) -> Option<usize> {
    let count = hist.partition_point(|h| match h.compare(value) {
        Ordering::Less => true,
        Ordering::Equal => equal,
        Ordering::Greater => false,
    });
    count.checked_sub(1)
}

/// value 在桶 `[h1, h2]` 中的相对位置，范围 `[0, 1]`
///
/// 零宽度的桶返回 0.5。
pub fn position<T: BoundValue>(value: &Bound<T>, h1: &Bound<T>, h2: &Bound<T>) -> f64 {
    match (h1.is_finite(), h2.is_finite()) {
        (true, true) => {
            let bin_width = h1.distance(h2);
            if !(bin_width > 0.0) || h2.value < h1.value {
                return 0.5;
            }
            if value.value <= h1.value {
                return 0.0;
            }
            if value.value >= h2.value {
                return 1.0;
            }
            (h1.distance(value) / bin_width).clamp(0.0, 1.0)
        }
        // 桶下端为 -∞：除非 value 也是 -∞，否则离下端无穷远
        (false, true) => {
            if value.value == h1.value {
                0.0
            } else {
                1.0
            }
        }
        // 桶上端为 +∞：除非 value 也是 +∞，否则离上端无穷远
        (true, false) => {
            if value.value == h2.value {
                1.0
            } else {
                0.0
            }
        }
        (false, false) => 0.5,
    }
}

/// 边界直方图一侧上 `P(side < value)`（`equal` 时为 `<=`）
pub fn scalar_selectivity<T: BoundValue>(value: &Bound<T>, hist: &[Bound<T>], equal: bool) -> f64 {
    let nhist = hist.len();
    if nhist < 2 {
        return 0.0;
    }
    let bins = (nhist - 1) as f64;

    match bound_bsearch(value, hist, equal) {
        None => 0.0,
        Some(index) => {
            let mut selec = index as f64 / bins;
            if index < nhist - 1 {
                selec += position(value, &hist[index], &hist[index + 1]) / bins;
            }
            selec
        }
    }
}

/// 长度直方图上的二分查找，语义同 [`bound_bsearch`]
pub fn length_hist_bsearch(hist: &[f64], value: f64, equal: bool) -> Option<usize> {
    let count = hist.partition_point(|&h| h < value || (equal && h <= value));
    count.checked_sub(1)
}

/// 长度 value 在桶 `[h1, h2]` 中的相对位置
pub fn length_position(value: f64, h1: f64, h2: f64) -> f64 {
    match (h1.is_infinite(), h2.is_infinite()) {
        (false, false) => {
            if value.is_infinite() || h2 == h1 {
                return 0.5;
            }
            1.0 - (h2 - value) / (h2 - h1)
        }
        // 下端有限上端无穷：value 离上端无穷远
        (false, true) => 0.0,
        (true, false) => 1.0,
        (true, true) => 0.5,
    }
}

/// 梯形面积，零高度的梯形面积为 0，即使宽度是无穷
fn trapezoid(pa: f64, pb: f64, a: f64, b: f64) -> f64 {
    if pa > 0.0 || pb > 0.0 {
        let area = 0.5 * (pb + pa) * (b - a);
        if area.is_nan() {
            0.0
        } else {
            area
        }
    } else {
        0.0
    }
}

/// 长度在 `[length1, length2]` 上 `P(length < x)` 的平均值（`equal` 时为 `<=`）
///
/// 即长度直方图隐含的分段线性累积分布曲线下的面积除以区间宽度。
/// `length1 == length2` 时直接返回该点的累积概率。
pub fn length_hist_fraction(hist: &[f64], length1: f64, length2: f64, equal: bool) -> f64 {
    let nhist = hist.len();
    if length2 < 0.0 || nhist < 2 {
        return 0.0;
    }
    if length2.is_infinite() && equal {
        return 1.0;
    }
    let last = nhist - 1;
    let bins = last as f64;

    let (mut i, pos) = match length_hist_bsearch(hist, length1, equal) {
        Some(i) if i >= last => return 1.0,
        Some(i) => (i, length_position(length1, hist[i], hist[i + 1])),
        None => (0, 0.0),
    };

    let mut pb = (i as f64 + pos) / bins;
    let mut b = length1;
    if length2 == length1 {
        return pb;
    }

    let mut area = 0.0;
    while i < last {
        let bin_upper = hist[i + 1];
        if !(bin_upper < length2 || (equal && bin_upper <= length2)) {
            break;
        }
        let (a, pa) = (b, pb);
        b = bin_upper;
        pb = i as f64 / bins;
        area += trapezoid(pa, pb, a, b);
        i += 1;
    }

    // 最后一个桶结束于 length2
    let (a, pa) = (b, pb);
    b = length2;
    let pos = if i >= last || hist[i] == hist[i + 1] {
        0.0
    } else {
        length_position(length2, hist[i], hist[i + 1])
    };
    pb = (i as f64 + pos) / bins;
    area += trapezoid(pa, pb, a, b);

    if area.is_infinite() && length2.is_infinite() {
        0.5
    } else {
        area / (length2 - length1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Float;

    fn lowers(values: &[f64]) -> Vec<Bound<Float>> {
        values.iter().map(|&v| Bound::lower(Float(v), true)).collect()
    }

    fn probe(v: f64) -> Bound<Float> {
        Bound::lower(Float(v), true)
    }

    #[test]
    fn test_bsearch() {
        let hist = lowers(&[0.0, 10.0, 20.0, 30.0]);
        assert_eq!(bound_bsearch(&probe(-1.0), &hist, false), None);
        assert_eq!(bound_bsearch(&probe(0.0), &hist, false), None);
        assert_eq!(bound_bsearch(&probe(0.0), &hist, true), Some(0));
        assert_eq!(bound_bsearch(&probe(15.0), &hist, false), Some(1));
        assert_eq!(bound_bsearch(&probe(30.0), &hist, true), Some(3));
        assert_eq!(bound_bsearch(&probe(99.0), &hist, false), Some(3));
    }

    #[test]
    fn test_bsearch_respects_bound_kind() {
        let hist = lowers(&[0.0, 10.0, 20.0]);
        // 开下界 (10 排在闭下界 [10 之后
        let exclusive = Bound::lower(Float(10.0), false);
        assert_eq!(bound_bsearch(&exclusive, &hist, false), Some(1));
        // 开上界 10) 排在 [10 之前
        let upper = Bound::upper(Float(10.0), false);
        assert_eq!(bound_bsearch(&upper, &hist, true), Some(0));
    }

    #[test]
    fn test_position() {
        assert_eq!(position(&probe(5.0), &probe(0.0), &probe(10.0)), 0.5);
        assert_eq!(position(&probe(2.5), &probe(0.0), &probe(10.0)), 0.25);
        assert_eq!(position(&probe(-5.0), &probe(0.0), &probe(10.0)), 0.0);
        assert_eq!(position(&probe(50.0), &probe(0.0), &probe(10.0)), 1.0);
    }

    #[test]
    fn test_position_degenerate_bin() {
        let p = position(&probe(10.0), &probe(10.0), &probe(10.0));
        assert_eq!(p, 0.5);
        assert!(!p.is_nan());
    }

    #[test]
    fn test_position_infinite_bins() {
        let neg = probe(f64::NEG_INFINITY);
        let pos_inf = probe(f64::INFINITY);
        assert_eq!(position(&probe(3.0), &neg, &probe(10.0)), 1.0);
        assert_eq!(position(&neg, &neg, &probe(10.0)), 0.0);
        assert_eq!(position(&probe(3.0), &probe(0.0), &pos_inf), 0.0);
        assert_eq!(position(&pos_inf, &probe(0.0), &pos_inf), 1.0);
        assert_eq!(position(&probe(3.0), &neg, &pos_inf), 0.5);
    }

    #[test]
    fn test_scalar_selectivity() {
        let hist = lowers(&[0.0, 10.0, 20.0, 30.0, 40.0]);
        assert_eq!(scalar_selectivity(&probe(0.0), &hist, false), 0.0);
        assert_eq!(scalar_selectivity(&probe(20.0), &hist, false), 0.5);
        assert_eq!(scalar_selectivity(&probe(25.0), &hist, false), 0.625);
        assert_eq!(scalar_selectivity(&probe(40.0), &hist, true), 1.0);
        assert_eq!(scalar_selectivity(&probe(100.0), &hist, false), 1.0);
    }

    #[test]
    fn test_scalar_selectivity_with_duplicates() {
        let hist = lowers(&[0.0, 10.0, 10.0, 20.0]);
        let sel = scalar_selectivity(&probe(10.0), &hist, true);
        assert!(!sel.is_nan());
        assert!((0.0..=1.0).contains(&sel));
    }

    #[test]
    fn test_length_position() {
        assert_eq!(length_position(5.0, 0.0, 10.0), 0.5);
        assert_eq!(length_position(5.0, 5.0, 5.0), 0.5);
        assert_eq!(length_position(5.0, 0.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_length_fraction_short_circuits() {
        let hist = [1.0, 2.0, 3.0];
        assert_eq!(length_hist_fraction(&hist, 0.0, -1.0, false), 0.0);
        assert_eq!(length_hist_fraction(&hist, 0.0, f64::INFINITY, true), 1.0);
        assert_eq!(length_hist_fraction(&hist, 5.0, 6.0, false), 1.0);
        // 起止相同时取该点的累积概率
        assert_eq!(length_hist_fraction(&hist, 1.5, 1.5, false), 0.25);
    }

    #[test]
    fn test_length_fraction_constant_lengths() {
        // 所有长度都是 5
        let hist = [5.0; 5];
        assert_eq!(length_hist_fraction(&hist, 0.0, 4.0, false), 0.0);
        assert_eq!(length_hist_fraction(&hist, 6.0, 8.0, false), 1.0);
    }

    #[test]
    fn test_length_fraction_in_range() {
        let hist = [0.0, 1.0, 2.0, 4.0, 8.0];
        for (l1, l2) in [(0.0, 1.0), (0.5, 3.0), (1.0, 7.0), (0.0, 20.0)] {
            for equal in [false, true] {
                let frac = length_hist_fraction(&hist, l1, l2, equal);
                assert!((0.0..=1.0).contains(&frac), "({}, {}) -> {}", l1, l2, frac);
            }
        }
    }

    #[test]
    fn test_length_fraction_infinite_upper() {
        let hist = [0.0, 1.0, 2.0];
        assert_eq!(length_hist_fraction(&hist, 0.5, f64::INFINITY, false), 0.5);
    }
}
