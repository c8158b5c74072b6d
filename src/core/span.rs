//! 区间与复合边界框
//!
//! `Span` 是数值区间或时间段；`TBox` 是时序数值的边界框（值维 + 时间维），
//! `STBox` 是时空点的边界框（空间维 + 时间维）。两种复合框的每一维都可以缺失。

use super::bound::{Bound, BoundValue, Float, Timestamp};
use super::error::{StatsError, StatsResult};
use super::nd_box::NdBox;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 区间
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span<T> {
    pub lower: T,
    pub upper: T,
    pub lower_inc: bool,
    pub upper_inc: bool,
}

/// 数值区间
pub type FloatSpan = Span<Float>;
/// 时间段
pub type Period = Span<Timestamp>;

impl<T: BoundValue> Span<T> {
    /// 创建区间，下界大于上界或空区间时报错
    pub fn new(lower: T, upper: T, lower_inc: bool, upper_inc: bool) -> StatsResult<Self> {
        match lower.cmp(&upper) {
            Ordering::Greater => Err(StatsError::InvalidSpan(format!(
                "下界 {:?} 大于上界 {:?}",
                lower, upper
            ))),
            Ordering::Equal if !(lower_inc && upper_inc) => Err(StatsError::InvalidSpan(
                format!("空区间 {:?}", lower),
            )),
            _ => Ok(Self {
                lower,
                upper,
                lower_inc,
                upper_inc,
            }),
        }
    }

    /// 左闭右开区间
    pub fn closed_open(lower: T, upper: T) -> StatsResult<Self> {
        Self::new(lower, upper, true, false)
    }

    /// 闭区间
    pub fn closed(lower: T, upper: T) -> StatsResult<Self> {
        Self::new(lower, upper, true, true)
    }

    /// 单点区间 `[v, v]`
    pub fn singleton(value: T) -> Self {
        Self {
            lower: value.clone(),
            upper: value,
            lower_inc: true,
            upper_inc: true,
        }
    }

    pub fn lower_bound(&self) -> Bound<T> {
        Bound::lower(self.lower.clone(), self.lower_inc)
    }

    pub fn upper_bound(&self) -> Bound<T> {
        Bound::upper(self.upper.clone(), self.upper_inc)
    }

    /// 拆成下界和上界
    pub fn bounds(&self) -> (Bound<T>, Bound<T>) {
        (self.lower_bound(), self.upper_bound())
    }

    /// 区间长度，用于长度直方图
    pub fn width(&self) -> f64 {
        self.lower.distance(&self.upper)
    }
}

/// 时序数值边界框
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TBox {
    pub span: Option<FloatSpan>,
    pub period: Option<Period>,
}

impl TBox {
    pub fn new(span: Option<FloatSpan>, period: Option<Period>) -> StatsResult<Self> {
        if span.is_none() && period.is_none() {
            return Err(StatsError::InvalidBox("TBox 至少需要一维".to_string()));
        }
        Ok(Self { span, period })
    }
}

/// 时空边界框
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct STBox {
    pub space: Option<NdBox>,
    pub has_z: bool,
    pub period: Option<Period>,
}

impl STBox {
    pub fn new(space: Option<NdBox>, period: Option<Period>) -> StatsResult<Self> {
        if space.is_none() && period.is_none() {
            return Err(StatsError::InvalidBox("STBox 至少需要一维".to_string()));
        }
        let has_z = space.as_ref().map(|b| b.ndims() >= 3).unwrap_or(false);
        Ok(Self {
            space,
            has_z,
            period,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_validation() {
        assert!(Span::new(Float(2.0), Float(1.0), true, true).is_err());
        assert!(Span::new(Float(1.0), Float(1.0), true, false).is_err());
        assert!(Span::closed(Float(1.0), Float(1.0)).is_ok());
    }

    #[test]
    fn test_span_bounds_and_width() {
        let span = Span::closed_open(10i64, 25i64).unwrap();
        let (lower, upper) = span.bounds();
        assert!(lower.lower && lower.inclusive);
        assert!(!upper.lower && !upper.inclusive);
        assert_eq!(span.width(), 15.0);
    }

    #[test]
    fn test_boxes_require_a_dimension() {
        assert!(TBox::new(None, None).is_err());
        assert!(STBox::new(None, None).is_err());

        let space = NdBox::new_2d(0.0, 0.0, 1.0, 1.0);
        let stbox = STBox::new(Some(space), None).unwrap();
        assert!(!stbox.has_z);
    }
}
