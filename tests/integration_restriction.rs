//! 区间限制选择性集成测试
//!
//! 测试范围:
//! - 固定直方图上的比较、包含、重叠估计
//! - 单调性与边界探测
//! - 缺少长度直方图与不支持的算子

mod common;

use common::*;
use tempstats::core::{Bound, Float, Operator};
use tempstats::selectivity::restriction::supports_operator;
use tempstats::selectivity::{position, restriction_selectivity_with_histogram, DEFAULT_CONTAIN_SEL};
use tempstats::stats::{BoundHistogram, SpanHistograms};

#[test]
fn test_lt_at_bin_boundary() {
    let hist = five_bin_histograms();
    let selec = assert_ok(restriction_selectivity_with_histogram(
        &hist,
        Operator::Lt,
        &float_span(20.0, 25.0),
    ));
    assert_close(selec, 0.5, 1e-12);
}

#[test]
fn test_contains_is_stricter_than_overlaps() {
    let hist = five_bin_histograms();

    let constant = float_span(12.0, 14.0);
    let contains = assert_ok(restriction_selectivity_with_histogram(&hist, Operator::Contains, &constant));
    let overlaps = assert_ok(restriction_selectivity_with_histogram(&hist, Operator::Overlaps, &constant));
    assert!(contains > 0.0);
    assert!(contains < overlaps, "contains {} overlaps {}", contains, overlaps);

    // 常量比所有样本都长，没有区间能包含它
    let constant = closed_span(12.0, 18.0);
    let contains = assert_ok(restriction_selectivity_with_histogram(&hist, Operator::Contains, &constant));
    let overlaps = assert_ok(restriction_selectivity_with_histogram(&hist, Operator::Overlaps, &constant));
    assert!(contains >= 0.0 && contains <= overlaps);
}

#[test]
fn test_lt_is_monotonic() {
    let hist = five_bin_histograms();
    let mut prev = 0.0;
    for c in -5..=60 {
        let c = c as f64;
        let selec = assert_ok(restriction_selectivity_with_histogram(
            &hist,
            Operator::Lt,
            &float_span(c, c + 1.0),
        ));
        assert!(selec >= prev, "LT({}) = {} < {}", c, selec, prev);
        prev = selec;
    }
    assert_eq!(prev, 1.0);
}

#[test]
fn test_probe_at_histogram_edges() {
    let spans: Vec<_> = (0..4).map(|i| float_span(i as f64 * 10.0, i as f64 * 10.0 + 5.0)).collect();
    let bounds = assert_ok(BoundHistogram::from_spans(&spans));
    let hist = SpanHistograms::new(bounds, None);

    let lt = assert_ok(restriction_selectivity_with_histogram(&hist, Operator::Lt, &float_span(0.0, 1.0)));
    assert_eq!(lt, 0.0);
    let ge = assert_ok(restriction_selectivity_with_histogram(&hist, Operator::Ge, &float_span(0.0, 1.0)));
    assert_eq!(ge, 1.0);
    let le = assert_ok(restriction_selectivity_with_histogram(&hist, Operator::Le, &float_span(30.0, 31.0)));
    assert_eq!(le, 1.0);
}

#[test]
fn test_degenerate_bin_position() {
    let b = Bound::lower(Float(10.0), true);
    let p = position(&Bound::lower(Float(10.0), true), &b, &b);
    assert_eq!(p, 0.5);
}

#[test]
fn test_every_supported_operator_is_a_probability() {
    let hist = five_bin_histograms();
    let constants = [
        float_span(-10.0, -5.0),
        float_span(0.0, 45.0),
        float_span(12.0, 14.0),
        closed_span(12.0, 18.0),
        float_span(44.0, 100.0),
        closed_span(f64::NEG_INFINITY, 20.0),
        closed_span(20.0, f64::INFINITY),
    ];
    for op in Operator::ALL.into_iter().filter(|op| supports_operator(*op)) {
        for constant in &constants {
            let selec = assert_ok(restriction_selectivity_with_histogram(&hist, op, constant));
            assert_probability(selec);
        }
    }
}

#[test]
fn test_position_operators_partition() {
    let hist = five_bin_histograms();
    let constant = float_span(18.0, 22.0);
    let left = assert_ok(restriction_selectivity_with_histogram(&hist, Operator::Left, &constant));
    let right = assert_ok(restriction_selectivity_with_histogram(&hist, Operator::Right, &constant));
    let overlaps = assert_ok(restriction_selectivity_with_histogram(&hist, Operator::Overlaps, &constant));
    assert_close(left + right + overlaps, 1.0, 1e-9);
}

#[test]
fn test_missing_length_histogram_uses_default() {
    let hist = five_bin_histograms();
    let without_lengths = SpanHistograms::new(hist.bounds.clone(), None);
    let selec = assert_ok(restriction_selectivity_with_histogram(
        &without_lengths,
        Operator::Contains,
        &float_span(12.0, 14.0),
    ));
    assert_eq!(selec, DEFAULT_CONTAIN_SEL);
}

#[test]
fn test_unsupported_operator_is_an_error() {
    let hist = five_bin_histograms();
    assert_err_with(
        restriction_selectivity_with_histogram(&hist, Operator::Above, &float_span(0.0, 1.0)),
        "不支持的算子",
    );
}
