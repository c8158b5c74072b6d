//! 区间边界与值域
//!
//! 直方图构建和查询共用同一个边界比较器 [`Bound::compare`]，
//! 两侧必须保持一致，否则二分查找会落在错误的桶里。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// 可作为区间边界的值域
///
/// 除全序外只需要一个单调的距离函数，这是估计器唯一接触值域语义的地方。
pub trait BoundValue: Ord + Clone + fmt::Debug {
    /// 两个值之间的距离，总是非负
    fn distance(&self, other: &Self) -> f64;

    /// 无穷边界返回 false
    fn is_finite(&self) -> bool {
        true
    }
}

impl BoundValue for i32 {
    fn distance(&self, other: &Self) -> f64 {
        (f64::from(*other) - f64::from(*self)).abs()
    }
}

impl BoundValue for i64 {
    fn distance(&self, other: &Self) -> f64 {
        (*other as f64 - *self as f64).abs()
    }
}

/// 按 `total_cmp` 定序的浮点数，允许 ±∞ 作为边界
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Float(pub f64);

impl Float {
    pub const INFINITY: Float = Float(f64::INFINITY);
    pub const NEG_INFINITY: Float = Float(f64::NEG_INFINITY);

    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Float {}

impl PartialOrd for Float {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Float {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for Float {
    fn from(v: f64) -> Self {
        Float(v)
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BoundValue for Float {
    fn distance(&self, other: &Self) -> f64 {
        (other.0 - self.0).abs()
    }

    fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

/// UTC 时间戳，距离单位为秒
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// 从 Unix 秒数构造，超出 chrono 表示范围时返回 None
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(Timestamp)
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl BoundValue for Timestamp {
    fn distance(&self, other: &Self) -> f64 {
        let delta = other.0.signed_duration_since(self.0);
        let secs = match delta.num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => delta.num_milliseconds() as f64 / 1_000.0,
        };
        secs.abs()
    }
}

/// 区间的一个端点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bound<T> {
    pub value: T,
    pub inclusive: bool,
    pub lower: bool,
}

impl<T: BoundValue> Bound<T> {
    pub fn lower(value: T, inclusive: bool) -> Self {
        Self {
            value,
            inclusive,
            lower: true,
        }
    }

    pub fn upper(value: T, inclusive: bool) -> Self {
        Self {
            value,
            inclusive,
            lower: false,
        }
    }

    /// 比较两个边界
    ///
    /// 值相等时：开下界排在该点之后，开上界排在该点之前，
    /// 闭边界之间视为相等。
    pub fn compare(&self, other: &Self) -> Ordering {
        let cmp = self.value.cmp(&other.value);
        if cmp != Ordering::Equal {
            return cmp;
        }

        match (self.inclusive, other.inclusive) {
            (false, false) if self.lower == other.lower => Ordering::Equal,
            (false, _) => {
                if self.lower {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (true, false) => {
                if other.lower {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (true, true) => Ordering::Equal,
        }
    }

    /// 边界值之间的距离
    pub fn distance(&self, other: &Self) -> f64 {
        self.value.distance(&other.value)
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite()
    }
}
