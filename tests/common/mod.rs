//! 集成测试共享工具模块
//!
//! 提供测试数据生成函数和常用断言

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempstats::core::{Bound, Float, FloatSpan, NdBox, Period, STBox, Span, TBox, Timestamp};
use tempstats::stats::{
    BoundHistogram, ColumnKind, ColumnSample, LengthHistogram, NdStats, SampleRow, SampleValue,
    SpanHistograms,
};

/// 断言结果成功，返回内部值
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
    result.expect("操作应该成功")
}

/// 断言结果失败并匹配错误消息
pub fn assert_err_with<T: std::fmt::Debug, E: std::fmt::Display>(result: Result<T, E>, expected_msg: &str) {
    let err = result.expect_err("操作应该失败");
    let err_str = err.to_string();
    assert!(
        err_str.contains(expected_msg),
        "错误消息应包含 '{}', 实际是 '{}'",
        expected_msg,
        err_str
    );
}

/// 断言值是合法概率
pub fn assert_probability(value: f64) {
    assert!(
        (0.0..=1.0).contains(&value),
        "选择性应在 [0, 1] 内, 实际是 {}",
        value
    );
}

/// 断言两个浮点数近似相等
pub fn assert_close(actual: f64, expected: f64, eps: f64) {
    assert!(
        (actual - expected).abs() <= eps,
        "期望 {} ± {}, 实际是 {}",
        expected,
        eps,
        actual
    );
}

/// 左闭右开的数值区间
pub fn float_span(lower: f64, upper: f64) -> FloatSpan {
    Span::closed_open(Float(lower), Float(upper)).expect("区间应该合法")
}

/// 闭区间
pub fn closed_span(lower: f64, upper: f64) -> FloatSpan {
    Span::closed(Float(lower), Float(upper)).expect("区间应该合法")
}

/// 以 Unix 秒表示的左闭右开时间段
pub fn period(lower: i64, upper: i64) -> Period {
    Span::closed_open(
        Timestamp::from_unix_seconds(lower).expect("时间戳应该合法"),
        Timestamp::from_unix_seconds(upper).expect("时间戳应该合法"),
    )
    .expect("时间段应该合法")
}

/// 下界 [0,10,20,30,40]，上界 [5,15,25,35,45)，长度全为 5
pub fn five_bin_histograms() -> SpanHistograms<Float> {
    let lowers = (0..5)
        .map(|i| Bound::lower(Float(i as f64 * 10.0), true))
        .collect();
    let uppers = (0..5)
        .map(|i| Bound::upper(Float(i as f64 * 10.0 + 5.0), false))
        .collect();
    let bounds = BoundHistogram::from_parts(lowers, uppers).expect("直方图应该合法");
    let lengths = LengthHistogram::from_parts(vec![5.0; 5]).expect("长度直方图应该合法");
    SpanHistograms::new(bounds, Some(lengths))
}

/// 4 个单位正方形铺满 [0,2]x[0,2]，网格 2x2
pub fn unit_tiles() -> NdStats {
    let boxes = vec![
        NdBox::new_2d(0.0, 0.0, 1.0, 1.0),
        NdBox::new_2d(1.0, 0.0, 2.0, 1.0),
        NdBox::new_2d(0.0, 1.0, 1.0, 2.0),
        NdBox::new_2d(1.0, 1.0, 2.0, 2.0),
    ];
    NdStats::with_grid(NdBox::new_2d(0.0, 0.0, 2.0, 2.0), [2, 2, 1, 1], &boxes, 4.0)
        .expect("网格应该构建成功")
}

/// 固定种子的随机数生成器，测试数据可重现
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// 数值区间列样本：下界在 [0, 100) 上，长度在 [0, 10) 上，每 `null_every` 行一个空值
pub fn fare_sample(rows: usize, null_every: usize) -> ColumnSample {
    let mut rng = seeded_rng(42);
    let rows = (0..rows)
        .map(|i| {
            let lower = rng.gen::<f64>() * 100.0;
            let length = rng.gen::<f64>() * 10.0;
            if null_every > 0 && i % null_every == 0 {
                None
            } else {
                Some(SampleRow::new(SampleValue::Span(float_span(lower, lower + length))))
            }
        })
        .collect();
    ColumnSample {
        column_name: "fare".to_string(),
        kind: ColumnKind::ValueSpan,
        rows,
    }
}

/// 时序数值列样本：值域 [0, 50)，时间段在 [0, 86400) 内
pub fn speed_sample(rows: usize) -> ColumnSample {
    let mut rng = seeded_rng(7);
    let rows = (0..rows)
        .map(|_| {
            let v = rng.gen::<f64>() * 40.0;
            let t = (rng.gen::<f64>() * 80000.0) as i64;
            let tbox = TBox::new(Some(float_span(v, v + 10.0)), Some(period(t, t + 3600)))
                .expect("边界框应该合法");
            Some(SampleRow::new(SampleValue::TBox(tbox)))
        })
        .collect();
    ColumnSample {
        column_name: "speed".to_string(),
        kind: ColumnKind::TNumber,
        rows,
    }
}

/// 时序点列样本：轨迹边界框散布在 [0, 100]x[0, 100]
pub fn route_sample(rows: usize) -> ColumnSample {
    let mut rng = seeded_rng(99);
    let rows = (0..rows)
        .map(|_| {
            let x = rng.gen::<f64>() * 95.0;
            let y = rng.gen::<f64>() * 95.0;
            let t = (rng.gen::<f64>() * 80000.0) as i64;
            let stbox = STBox::new(
                Some(NdBox::new_2d(x, y, x + 5.0, y + 5.0)),
                Some(period(t, t + 600)),
            )
            .expect("边界框应该合法");
            Some(SampleRow::new(SampleValue::STBox(stbox)))
        })
        .collect();
    ColumnSample {
        column_name: "route".to_string(),
        kind: ColumnKind::TPoint,
        rows,
    }
}
