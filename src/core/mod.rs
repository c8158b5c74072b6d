//! 核心类型
//!
//! 边界、区间、N 维边界框、算子和错误类型

pub mod bound;
pub mod error;
pub mod nd_box;
pub mod operator;
pub mod span;

pub use bound::{Bound, BoundValue, Float, Timestamp};
pub use error::{StatsError, StatsResult};
pub use nd_box::{CellIter, NdBox, NdIBox, ND_DIMS};
pub use operator::{Operator, OperatorFamily};
pub use span::{FloatSpan, Period, STBox, Span, TBox};
